//! onceover core library: message classification, the view-once relay, the keyword responder,
//! and the supervisor that keeps a messaging session alive. Used by the CLI and the WhatsApp adapter.

pub mod channels;
pub mod config;
pub mod credentials;
pub mod error_log;
pub mod handlers;
pub mod init;
pub mod routing;
pub mod session;
pub mod supervisor;
