//! Messaging channel types: inbound classification, outbound messages, and the session client seam.
//!
//! The adapter crate converts wire messages into [`InboundMessage`] and implements [`MessagingClient`];
//! everything in this crate works only against these types.

mod client;
mod inbound;
pub mod jid;
mod outbound;

pub use client::{ClientError, MessagingClient};
pub use inbound::{InboundMessage, MediaPart, MediaSource, MessageKey, Payload, ViewOnceMedia};
pub use outbound::{MediaKind, OutboundMessage, OutboundPayload, QuotedRef};
