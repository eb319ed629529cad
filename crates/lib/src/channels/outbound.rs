//! Outbound message built by a handler and sent once through the session client.

/// Kind of media being relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to an earlier message so clients render the reply as threaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotedRef {
    pub remote_jid: String,
    pub id: String,
    pub participant: Option<String>,
    /// Body shown in the quote preview; always empty for status replies.
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundPayload {
    Text(String),
    Media {
        kind: MediaKind,
        bytes: Vec<u8>,
        caption: String,
    },
}

/// Message to send to one chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: String,
    pub payload: OutboundPayload,
    pub quoted: Option<QuotedRef>,
}

impl OutboundMessage {
    pub fn text(to: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            payload: OutboundPayload::Text(text.into()),
            quoted: None,
        }
    }

    pub fn media(
        to: impl Into<String>,
        kind: MediaKind,
        bytes: Vec<u8>,
        caption: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            payload: OutboundPayload::Media {
                kind,
                bytes,
                caption: caption.into(),
            },
            quoted: None,
        }
    }

    /// Attach a quote of the given message.
    pub fn quoting(mut self, quoted: QuotedRef) -> Self {
        self.quoted = Some(quoted);
        self
    }
}
