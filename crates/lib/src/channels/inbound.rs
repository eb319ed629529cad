//! Inbound message from the messaging session: classified once, handed to the router, then dropped.

/// Identity of a received message (WhatsApp "message key").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageKey {
    /// Message id assigned by the sender's client.
    pub id: String,
    /// Chat the message arrived in (user JID for direct chats, `…@g.us` for groups).
    pub remote_jid: String,
    /// Author within a group chat. `None` for direct chats.
    pub participant: Option<String>,
    /// True when the message was sent by this account (from another linked device or by us).
    pub from_me: bool,
}

/// Where to fetch encrypted media from. Transport neutral; the adapter turns it back into a download request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaSource {
    pub direct_path: Option<String>,
    pub url: Option<String>,
    pub media_key: Option<Vec<u8>>,
    pub file_enc_sha256: Option<Vec<u8>>,
    pub file_sha256: Option<Vec<u8>>,
    pub file_length: Option<u64>,
    pub mimetype: Option<String>,
}

/// One media item inside a view-once wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPart {
    pub caption: Option<String>,
    pub source: MediaSource,
}

/// Contents of a view-once wrapper. Both fields empty means the wrapper was malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewOnceMedia {
    pub image: Option<MediaPart>,
    pub video: Option<MediaPart>,
}

/// Message payload, decided once when the adapter converts the wire message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Plain conversation text or the text of an extended (quoted/linked) text message.
    PlainText(String),
    /// Media wrapped in any of the view-once envelopes.
    ViewOnce(ViewOnceMedia),
    /// Anything else (stickers, reactions, protocol messages, ...).
    Other,
}

/// A received message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub key: MessageKey,
    /// Display name the sender set for themselves. May be empty.
    pub push_name: String,
    pub payload: Payload,
}

impl InboundMessage {
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Payload::PlainText(t) => Some(t),
            _ => None,
        }
    }

    pub fn view_once(&self) -> Option<&ViewOnceMedia> {
        match &self.payload {
            Payload::ViewOnce(v) => Some(v),
            _ => None,
        }
    }
}
