//! Session client: the calls the router and handlers make back into the live messaging session.

use crate::channels::inbound::MediaSource;
use crate::channels::outbound::{MediaKind, OutboundMessage};
use async_trait::async_trait;

/// Error from a collaborator call (send, download, metadata lookup).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid jid {0}")]
    InvalidJid(String),
    #[error("media download failed: {0}")]
    Download(String),
    #[error("group metadata lookup for {jid} failed: {reason}")]
    GroupMetadata { jid: String, reason: String },
    #[error("send to {to} failed: {reason}")]
    Send { to: String, reason: String },
}

/// Handle to a live session. Implemented by the WhatsApp adapter and by test fakes.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Send one message (text, media with caption, or quoted reply). Returns the new message id.
    async fn send(&self, message: OutboundMessage) -> Result<String, ClientError>;

    /// Resolve and decrypt the media bytes behind a view-once item.
    async fn download_media(
        &self,
        kind: MediaKind,
        source: &MediaSource,
    ) -> Result<Vec<u8>, ClientError>;

    /// Display name (subject) of a group chat.
    async fn group_subject(&self, group_jid: &str) -> Result<String, ClientError>;
}
