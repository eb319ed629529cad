//! WhatsApp Web adapter for onceover, built on `whatsapp-rust`.
//!
//! [`WhatsAppConnector`] opens a bot against a SQLite device store inside the auth directory and
//! turns its events into [`SessionEvent`]s; [`WhatsAppClient`] implements the outbound calls.
//! Reconnecting is left to the onceover supervisor, so a disconnect stops the bot task.

use anyhow::anyhow;
use async_trait::async_trait;
use onceover::channels::{
    ClientError, InboundMessage, MediaKind, MediaPart, MediaSource, MessageKey, MessagingClient,
    OutboundMessage, OutboundPayload, Payload, QuotedRef, ViewOnceMedia,
};
use onceover::session::{ConnectionState, Connector, DisconnectReason, Session, SessionEvent};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use wacore::types::events::Event;
use wacore::types::message::MessageInfo;
use wacore_binary::jid::Jid;
use waproto::whatsapp as wa;
use whatsapp_rust::bot::Bot;
use whatsapp_rust::client::Client;
use whatsapp_rust::download::MediaType;
use whatsapp_rust::store::sqlite_store::SqliteStore;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

const EVENT_BUFFER: usize = 64;

/// Opens WhatsApp Web sessions. The device store lives at `db_path`.
pub struct WhatsAppConnector {
    db_path: PathBuf,
}

impl WhatsAppConnector {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }
}

#[async_trait]
impl Connector for WhatsAppConnector {
    async fn connect(&self, credentials: Option<Vec<u8>>) -> anyhow::Result<Session> {
        match credentials.as_deref().map(String::from_utf8_lossy) {
            Some(paired) => log::info!("whatsapp: resuming paired device {}", paired),
            None => log::info!("whatsapp: no paired device yet, a QR code will be printed"),
        }
        if let Some(dir) = self.db_path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let db_path = self.db_path.to_string_lossy().into_owned();
        let backend = Arc::new(
            SqliteStore::new(&db_path)
                .await
                .map_err(|e| anyhow!("opening device store {}: {}", db_path, e))?,
        );

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let _ = tx.try_send(SessionEvent::Connection(ConnectionState::Connecting));

        let abort: Arc<Mutex<Option<AbortHandle>>> = Arc::new(Mutex::new(None));
        let events_tx = tx.clone();
        let abort_on_close = abort.clone();
        let mut bot = Bot::builder()
            .with_backend(backend)
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .on_event(move |event, _client| {
                let tx = events_tx.clone();
                let abort = abort_on_close.clone();
                async move {
                    let Some(ev) = convert_event(event) else {
                        return;
                    };
                    let closing = matches!(ev, SessionEvent::Connection(ConnectionState::Closed(_)));
                    if tx.send(ev).await.is_err() {
                        log::debug!("whatsapp: session receiver dropped");
                    }
                    if closing {
                        if let Ok(mut g) = abort.lock() {
                            if let Some(h) = g.take() {
                                h.abort();
                            }
                        }
                    }
                }
            })
            .build()
            .await
            .map_err(|e| anyhow!("building whatsapp bot: {}", e))?;

        let client = bot.client();
        let handle = bot
            .run()
            .await
            .map_err(|e| anyhow!("starting whatsapp bot: {}", e))?;
        if let Ok(mut g) = abort.lock() {
            *g = Some(handle.abort_handle());
        }

        tokio::spawn(async move {
            let reason = match handle.await {
                Ok(()) => "client stopped".to_string(),
                Err(e) if e.is_cancelled() => return,
                Err(e) => format!("client task failed: {}", e),
            };
            let _ = tx
                .send(SessionEvent::Connection(ConnectionState::Closed(
                    DisconnectReason::Other(reason),
                )))
                .await;
        });

        Ok(Session {
            client: Arc::new(WhatsAppClient { client }),
            events: rx,
        })
    }
}

fn convert_event(event: Event) -> Option<SessionEvent> {
    match event {
        Event::PairingQrCode { code, timeout } => {
            log::info!(
                "whatsapp: scan this QR code in WhatsApp > Linked Devices (valid for {}s)",
                timeout.as_secs()
            );
            println!("\n{}\n", code);
            None
        }
        Event::PairSuccess(ps) => {
            log::info!("whatsapp: paired as {}", ps.id);
            Some(SessionEvent::CredentialsUpdated(ps.id.to_string().into_bytes()))
        }
        Event::Connected(_) => Some(SessionEvent::Connection(ConnectionState::Open)),
        Event::Disconnected(_) => Some(SessionEvent::Connection(ConnectionState::Closed(
            DisconnectReason::Other("disconnected".to_string()),
        ))),
        Event::LoggedOut(info) => {
            log::warn!("whatsapp: logged out: {:?}", info.reason);
            Some(SessionEvent::Connection(ConnectionState::Closed(
                DisconnectReason::LoggedOut,
            )))
        }
        Event::StreamError(e) => {
            log::warn!("whatsapp: stream error: {:?}", e);
            None
        }
        Event::Message(msg, info) => Some(SessionEvent::Messages(vec![convert_message(&msg, &info)])),
        _ => None,
    }
}

/// Convert a decrypted wire message into the classified inbound form.
pub fn convert_message(msg: &wa::Message, info: &MessageInfo) -> InboundMessage {
    let participant = if info.source.is_group {
        Some(info.source.sender.to_string())
    } else {
        None
    };
    InboundMessage {
        key: MessageKey {
            id: info.id.clone(),
            remote_jid: info.source.chat.to_string(),
            participant,
            from_me: info.source.is_from_me,
        },
        push_name: info.push_name.clone(),
        payload: classify(msg),
    }
}

fn classify(msg: &wa::Message) -> Payload {
    let wrapper = msg
        .view_once_message
        .as_ref()
        .or(msg.view_once_message_v2.as_ref())
        .or(msg.view_once_message_v2_extension.as_ref());
    if let Some(wrapper) = wrapper {
        let inner = wrapper.message.as_deref();
        return Payload::ViewOnce(ViewOnceMedia {
            image: inner
                .and_then(|m| m.image_message.as_deref())
                .map(image_part),
            video: inner
                .and_then(|m| m.video_message.as_deref())
                .map(video_part),
        });
    }
    if let Some(text) = msg.conversation.as_deref() {
        return Payload::PlainText(text.to_string());
    }
    if let Some(text) = msg
        .extended_text_message
        .as_ref()
        .and_then(|e| e.text.as_deref())
    {
        return Payload::PlainText(text.to_string());
    }
    Payload::Other
}

fn image_part(m: &wa::message::ImageMessage) -> MediaPart {
    MediaPart {
        caption: m.caption.clone(),
        source: MediaSource {
            direct_path: m.direct_path.clone(),
            url: m.url.clone(),
            media_key: m.media_key.clone(),
            file_enc_sha256: m.file_enc_sha256.clone(),
            file_sha256: m.file_sha256.clone(),
            file_length: m.file_length,
            mimetype: m.mimetype.clone(),
        },
    }
}

fn video_part(m: &wa::message::VideoMessage) -> MediaPart {
    MediaPart {
        caption: m.caption.clone(),
        source: MediaSource {
            direct_path: m.direct_path.clone(),
            url: m.url.clone(),
            media_key: m.media_key.clone(),
            file_enc_sha256: m.file_enc_sha256.clone(),
            file_sha256: m.file_sha256.clone(),
            file_length: m.file_length,
            mimetype: m.mimetype.clone(),
        },
    }
}

fn parse_jid(s: &str) -> Result<Jid, ClientError> {
    s.parse::<Jid>()
        .map_err(|_| ClientError::InvalidJid(s.to_string()))
}

/// Outbound side of a live whatsapp-rust session.
pub struct WhatsAppClient {
    client: Arc<Client>,
}

impl WhatsAppClient {
    async fn media_message(
        &self,
        to: &str,
        kind: MediaKind,
        bytes: Vec<u8>,
        caption: String,
    ) -> Result<wa::Message, ClientError> {
        let send_err = |reason: String| ClientError::Send {
            to: to.to_string(),
            reason,
        };
        let media_type = match kind {
            MediaKind::Image => MediaType::Image,
            MediaKind::Video => MediaType::Video,
        };
        let upload = self
            .client
            .upload(bytes, media_type)
            .await
            .map_err(|e| send_err(format!("upload: {}", e)))?;
        let caption = Some(caption).filter(|c| !c.is_empty());
        let msg = match kind {
            MediaKind::Image => wa::Message {
                image_message: Some(Box::new(wa::message::ImageMessage {
                    caption,
                    mimetype: Some("image/jpeg".to_string()),
                    url: Some(upload.url),
                    direct_path: Some(upload.direct_path),
                    media_key: Some(upload.media_key),
                    file_enc_sha256: Some(upload.file_enc_sha256),
                    file_sha256: Some(upload.file_sha256),
                    file_length: Some(upload.file_length),
                    ..Default::default()
                })),
                ..Default::default()
            },
            MediaKind::Video => wa::Message {
                video_message: Some(Box::new(wa::message::VideoMessage {
                    caption,
                    mimetype: Some("video/mp4".to_string()),
                    url: Some(upload.url),
                    direct_path: Some(upload.direct_path),
                    media_key: Some(upload.media_key),
                    file_enc_sha256: Some(upload.file_enc_sha256),
                    file_sha256: Some(upload.file_sha256),
                    file_length: Some(upload.file_length),
                    ..Default::default()
                })),
                ..Default::default()
            },
        };
        Ok(msg)
    }
}

fn text_message(text: String, quoted: Option<QuotedRef>) -> wa::Message {
    match quoted {
        None => wa::Message {
            conversation: Some(text),
            ..Default::default()
        },
        Some(q) => wa::Message {
            extended_text_message: Some(Box::new(wa::message::ExtendedTextMessage {
                text: Some(text),
                context_info: Some(Box::new(wa::ContextInfo {
                    stanza_id: Some(q.id),
                    participant: q.participant,
                    remote_jid: Some(q.remote_jid),
                    quoted_message: Some(Box::new(wa::Message {
                        conversation: Some(q.body),
                        ..Default::default()
                    })),
                    ..Default::default()
                })),
                ..Default::default()
            })),
            ..Default::default()
        },
    }
}

#[async_trait]
impl MessagingClient for WhatsAppClient {
    async fn send(&self, message: OutboundMessage) -> Result<String, ClientError> {
        let OutboundMessage { to, payload, quoted } = message;
        let jid = parse_jid(&to)?;
        let msg = match payload {
            OutboundPayload::Text(text) => text_message(text, quoted),
            OutboundPayload::Media {
                kind,
                bytes,
                caption,
            } => self.media_message(&to, kind, bytes, caption).await?,
        };
        self.client
            .send_message(jid, msg)
            .await
            .map_err(|e| ClientError::Send {
                to,
                reason: e.to_string(),
            })
    }

    async fn download_media(
        &self,
        kind: MediaKind,
        source: &MediaSource,
    ) -> Result<Vec<u8>, ClientError> {
        let result = match kind {
            MediaKind::Image => {
                let m = wa::message::ImageMessage {
                    direct_path: source.direct_path.clone(),
                    url: source.url.clone(),
                    media_key: source.media_key.clone(),
                    file_enc_sha256: source.file_enc_sha256.clone(),
                    file_sha256: source.file_sha256.clone(),
                    file_length: source.file_length,
                    mimetype: source.mimetype.clone(),
                    ..Default::default()
                };
                self.client.download(&m).await
            }
            MediaKind::Video => {
                let m = wa::message::VideoMessage {
                    direct_path: source.direct_path.clone(),
                    url: source.url.clone(),
                    media_key: source.media_key.clone(),
                    file_enc_sha256: source.file_enc_sha256.clone(),
                    file_sha256: source.file_sha256.clone(),
                    file_length: source.file_length,
                    mimetype: source.mimetype.clone(),
                    ..Default::default()
                };
                self.client.download(&m).await
            }
        };
        result.map_err(|e| ClientError::Download(e.to_string()))
    }

    async fn group_subject(&self, group_jid: &str) -> Result<String, ClientError> {
        let jid = parse_jid(group_jid)?;
        self.client
            .groups()
            .get_metadata(&jid)
            .await
            .map(|meta| meta.subject)
            .map_err(|e| ClientError::GroupMetadata {
                jid: group_jid.to_string(),
                reason: e.to_string(),
            })
    }
}
