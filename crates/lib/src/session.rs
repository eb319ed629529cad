//! Messaging session seam: what a connector hands back and the lifecycle events it emits.

use crate::channels::{InboundMessage, MessagingClient};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Why the session closed. Only a logout is distinguished; everything else is opaque and recoverable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    LoggedOut,
    Other(String),
}

impl DisconnectReason {
    pub fn is_logged_out(&self) -> bool {
        matches!(self, DisconnectReason::LoggedOut)
    }
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisconnectReason::LoggedOut => f.write_str("logged out"),
            DisconnectReason::Other(reason) => f.write_str(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed(DisconnectReason),
}

/// Event emitted by a live session, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// New opaque credential blob; must be persisted before the next event is handled.
    CredentialsUpdated(Vec<u8>),
    Connection(ConnectionState),
    /// A batch of received messages.
    Messages(Vec<InboundMessage>),
}

/// A live session: client for outbound calls plus the event stream.
pub struct Session {
    pub client: Arc<dyn MessagingClient>,
    pub events: mpsc::Receiver<SessionEvent>,
}

/// Opens sessions against the messaging backend.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a session. `credentials` is the last persisted blob, `None` on first run (pairing required).
    async fn connect(&self, credentials: Option<Vec<u8>>) -> anyhow::Result<Session>;
}
