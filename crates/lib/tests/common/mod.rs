//! In-memory fakes of the session client and connector shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use onceover::channels::{
    ClientError, InboundMessage, MediaKind, MediaPart, MediaSource, MessageKey, MessagingClient,
    OutboundMessage, Payload, ViewOnceMedia,
};
use onceover::config::Settings;
use onceover::session::{Connector, Session, SessionEvent};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub const DUMP: &str = "120363262638672611@g.us";
pub const GROUP: &str = "120363000000000001@g.us";
pub const ALICE: &str = "6281234567890@s.whatsapp.net";
pub const BOB: &str = "6289876543210@s.whatsapp.net";

#[derive(Default)]
pub struct FakeClient {
    pub sent: Mutex<Vec<OutboundMessage>>,
    pub groups: HashMap<String, String>,
    pub media: Vec<u8>,
    pub fail_download: bool,
    pub fail_send: bool,
}

impl FakeClient {
    pub fn new() -> Self {
        let mut groups = HashMap::new();
        groups.insert(GROUP.to_string(), "Family".to_string());
        Self {
            groups,
            media: b"\xff\xd8jpeg".to_vec(),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingClient for FakeClient {
    async fn send(&self, message: OutboundMessage) -> Result<String, ClientError> {
        if self.fail_send {
            return Err(ClientError::Send {
                to: message.to,
                reason: "socket closed".to_string(),
            });
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(message);
        Ok(format!("OUT{}", sent.len()))
    }

    async fn download_media(
        &self,
        _kind: MediaKind,
        _source: &MediaSource,
    ) -> Result<Vec<u8>, ClientError> {
        if self.fail_download {
            return Err(ClientError::Download("media error or time out".to_string()));
        }
        Ok(self.media.clone())
    }

    async fn group_subject(&self, group_jid: &str) -> Result<String, ClientError> {
        self.groups
            .get(group_jid)
            .cloned()
            .ok_or_else(|| ClientError::GroupMetadata {
                jid: group_jid.to_string(),
                reason: "item-not-found".to_string(),
            })
    }
}

pub fn temp_dir(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()))
}

pub fn settings(dir: &std::path::Path) -> Settings {
    let config: onceover::config::Config = serde_json::from_value(serde_json::json!({
        "timezone": "Asia/Jakarta",
        "groupDumper": DUMP,
        "errorLogDir": dir.join("errorlog"),
        "authDir": dir.join("auth"),
        "reconnect": { "initialDelayMs": 0, "maxDelayMs": 0 }
    }))
    .expect("config json");
    config.validate(&dir.join("config.json")).expect("valid settings")
}

pub fn error_log_entries(dir: &std::path::Path) -> Vec<String> {
    let Ok(rd) = std::fs::read_dir(dir.join("errorlog")) else {
        return Vec::new();
    };
    let mut lines = Vec::new();
    for entry in rd.flatten() {
        let s = std::fs::read_to_string(entry.path()).unwrap_or_default();
        lines.extend(s.lines().map(str::to_string));
    }
    lines
}

pub fn text(id: &str, chat: &str, participant: Option<&str>, body: &str) -> InboundMessage {
    InboundMessage {
        key: MessageKey {
            id: id.to_string(),
            remote_jid: chat.to_string(),
            participant: participant.map(str::to_string),
            from_me: false,
        },
        push_name: "Alice".to_string(),
        payload: Payload::PlainText(body.to_string()),
    }
}

pub fn view_once_image(
    id: &str,
    chat: &str,
    participant: Option<&str>,
    caption: Option<&str>,
) -> InboundMessage {
    InboundMessage {
        key: MessageKey {
            id: id.to_string(),
            remote_jid: chat.to_string(),
            participant: participant.map(str::to_string),
            from_me: false,
        },
        push_name: "Alice".to_string(),
        payload: Payload::ViewOnce(ViewOnceMedia {
            image: Some(MediaPart {
                caption: caption.map(str::to_string),
                source: MediaSource::default(),
            }),
            video: None,
        }),
    }
}

pub fn from_me(mut message: InboundMessage) -> InboundMessage {
    message.key.from_me = true;
    message
}

/// Connector that replays one scripted event list per connect call and fails once the script runs out.
#[derive(Clone)]
pub struct ScriptedConnector {
    pub client: Arc<FakeClient>,
    scripts: Arc<Mutex<VecDeque<Vec<SessionEvent>>>>,
    connects: Arc<Mutex<Vec<Option<Vec<u8>>>>>,
}

impl ScriptedConnector {
    pub fn new(client: Arc<FakeClient>, scripts: Vec<Vec<SessionEvent>>) -> Self {
        Self {
            client,
            scripts: Arc::new(Mutex::new(scripts.into())),
            connects: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().unwrap().len()
    }

    /// Credentials passed to each connect call, in order.
    pub fn credentials_seen(&self) -> Vec<Option<Vec<u8>>> {
        self.connects.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, credentials: Option<Vec<u8>>) -> anyhow::Result<Session> {
        self.connects.lock().unwrap().push(credentials);
        let next = self.scripts.lock().unwrap().pop_front();
        let script = next.ok_or_else(|| anyhow::anyhow!("backend unreachable"))?;
        let (tx, rx) = mpsc::channel(script.len().max(1));
        for ev in script {
            tx.try_send(ev).expect("buffer sized to script");
        }
        Ok(Session {
            client: self.client.clone(),
            events: rx,
        })
    }
}
