//! View-once relay: download the media behind a view-once wrapper and re-send it to the dump chat.

use crate::channels::jid::phone_digits;
use crate::channels::{ClientError, InboundMessage, MediaKind, MessagingClient, OutboundMessage};

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The wrapper had neither an image nor a video inside.
    #[error("view-once message {0} carries no image or video")]
    NoMedia(String),
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Chat context the router derived for one message.
#[derive(Debug, Clone, Copy)]
pub struct RelayContext<'a> {
    pub is_group: bool,
    /// Group subject; `None` for direct chats or when the lookup failed.
    pub group_name: Option<&'a str>,
    pub sender_name: &'a str,
}

/// Build the caption sent alongside relayed media.
///
/// Group: `GC: <name>`, `Phone: <digits>`, then `Caption: <caption>` if non-empty.
/// Direct: `Phone: <digits>`, then `Caption: <caption>` if non-empty.
pub fn compose_caption(
    is_group: bool,
    group_name: Option<&str>,
    author_jid: &str,
    caption: &str,
) -> String {
    let mut lines = Vec::with_capacity(3);
    if is_group {
        lines.push(format!("GC: {}", group_name.unwrap_or("")));
    }
    lines.push(format!("Phone: {}", phone_digits(author_jid)));
    if !caption.is_empty() {
        lines.push(format!("Caption: {}", caption));
    }
    lines.join("\n")
}

pub struct ViewOnceRelay {
    dump_jid: String,
}

impl ViewOnceRelay {
    pub fn new(dump_jid: impl Into<String>) -> Self {
        Self {
            dump_jid: dump_jid.into(),
        }
    }

    /// Relay a view-once message. Returns `Ok(false)` when the payload is not view-once.
    pub async fn relay(
        &self,
        client: &dyn MessagingClient,
        message: &InboundMessage,
        ctx: RelayContext<'_>,
    ) -> Result<bool, RelayError> {
        let Some(view_once) = message.view_once() else {
            return Ok(false);
        };
        let (kind, part) = match (&view_once.image, &view_once.video) {
            (Some(image), _) => (MediaKind::Image, image),
            (None, Some(video)) => (MediaKind::Video, video),
            (None, None) => return Err(RelayError::NoMedia(message.key.id.clone())),
        };

        let bytes = client.download_media(kind, &part.source).await?;
        log::debug!(
            "relay: downloaded {} bytes of view-once {} from {}",
            bytes.len(),
            kind,
            ctx.sender_name
        );

        let author = if ctx.is_group {
            match message.key.participant.as_deref() {
                Some(participant) => participant,
                None => {
                    log::warn!(
                        "relay: group message {} has no participant, sender phone left empty",
                        message.key.id
                    );
                    ""
                }
            }
        } else {
            message.key.remote_jid.as_str()
        };
        let caption = compose_caption(
            ctx.is_group,
            ctx.group_name,
            author,
            part.caption.as_deref().unwrap_or(""),
        );

        let outbound = OutboundMessage::media(self.dump_jid.as_str(), kind, bytes, caption);
        match client.send(outbound).await {
            Ok(id) => {
                log::info!("relay: view-once {} sent to dump chat (id {})", kind, id);
                Ok(true)
            }
            Err(e) => {
                log::warn!("relay: view-once {} not sent: {}", kind, e);
                Err(e.into())
            }
        }
    }
}
