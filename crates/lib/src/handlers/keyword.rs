//! Keyword responder: answer plain-text messages containing the trigger, at most once per message id.

use crate::channels::{ClientError, InboundMessage, MessagingClient, OutboundMessage, QuotedRef};
use std::collections::{HashSet, VecDeque};
use tokio::sync::Mutex;

/// Message ids already answered in this process. Bounded; oldest ids are evicted first.
pub struct RepliedMessages {
    capacity: usize,
    inner: Mutex<RepliedInner>,
}

#[derive(Default)]
struct RepliedInner {
    ids: HashSet<String>,
    order: VecDeque<String>,
}

impl RepliedMessages {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(RepliedInner::default()),
        }
    }

    /// Record `id`. Returns false if it was already recorded.
    pub async fn insert(&self, id: &str) -> bool {
        let mut g = self.inner.lock().await;
        if g.ids.contains(id) {
            return false;
        }
        while g.order.len() >= self.capacity {
            if let Some(old) = g.order.pop_front() {
                g.ids.remove(&old);
            }
        }
        g.ids.insert(id.to_string());
        g.order.push_back(id.to_string());
        true
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.inner.lock().await.ids.contains(id)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.order.len()
    }
}

pub struct KeywordResponder {
    trigger: String,
    reply_text: String,
    replied: RepliedMessages,
}

impl KeywordResponder {
    pub fn new(
        trigger: impl Into<String>,
        reply_text: impl Into<String>,
        replied_capacity: usize,
    ) -> Self {
        Self {
            trigger: trigger.into(),
            reply_text: reply_text.into(),
            replied: RepliedMessages::new(replied_capacity),
        }
    }

    pub fn replied(&self) -> &RepliedMessages {
        &self.replied
    }

    /// True if `text` contains the trigger (case-sensitive substring).
    pub fn matches(&self, text: &str) -> bool {
        text.contains(&self.trigger)
    }

    /// Reply to `message` if it is plain text containing the trigger and has not been answered yet.
    /// Returns whether a reply was sent. In groups the reply quotes the original message.
    pub async fn respond(
        &self,
        client: &dyn MessagingClient,
        message: &InboundMessage,
        is_group: bool,
    ) -> Result<bool, ClientError> {
        let Some(text) = message.text() else {
            return Ok(false);
        };
        let id = &message.key.id;
        if self.replied.contains(id).await {
            log::debug!("keyword: {} already answered, skipping", id);
            return Ok(false);
        }
        if !self.matches(text) {
            return Ok(false);
        }
        // insert() is the authoritative check when redeliveries race.
        if !self.replied.insert(id).await {
            return Ok(false);
        }

        let sender = message.key.remote_jid.as_str();
        let mut reply = OutboundMessage::text(sender, self.reply_text.as_str());
        if is_group {
            reply = reply.quoting(QuotedRef {
                remote_jid: sender.to_string(),
                id: id.clone(),
                participant: message.key.participant.clone(),
                body: String::new(),
            });
        }
        client.send(reply).await?;
        log::info!("keyword: answered {} in {}", id, sender);
        Ok(true)
    }
}
