//! Message router: classify one inbound message and hand it to the view-once relay and the keyword responder.
//!
//! Only the first message of a batch is processed. Self-sent messages are skipped before either handler
//! runs. A handler failure is logged, written to the error log, and ends processing of that message.

use crate::channels::jid::{is_group, phone_digits};
use crate::channels::{InboundMessage, MessagingClient};
use crate::config::Settings;
use crate::error_log::ErrorLog;
use crate::handlers::{KeywordResponder, RelayContext, ViewOnceRelay};

/// What the router did with a message. Returned for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteOutcome {
    pub skipped_self: bool,
    pub relayed: bool,
    pub replied: bool,
    pub failed: bool,
}

pub struct MessageRouter {
    relay: ViewOnceRelay,
    responder: KeywordResponder,
    error_log: ErrorLog,
}

impl MessageRouter {
    pub fn new(relay: ViewOnceRelay, responder: KeywordResponder, error_log: ErrorLog) -> Self {
        Self {
            relay,
            responder,
            error_log,
        }
    }

    /// Build handlers from validated settings. The responder (and its replied-id set) lives as long as the router.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            ViewOnceRelay::new(settings.group_dumper.clone()),
            KeywordResponder::new(
                settings.trigger.clone(),
                settings.reply_text.clone(),
                settings.replied_capacity,
            ),
            ErrorLog::new(settings.error_log_dir.clone(), settings.timezone),
        )
    }

    pub fn responder(&self) -> &KeywordResponder {
        &self.responder
    }

    /// Process a received batch. Only the first message is looked at.
    pub async fn route(
        &self,
        client: &dyn MessagingClient,
        batch: Vec<InboundMessage>,
    ) -> Option<RouteOutcome> {
        let extra = batch.len().saturating_sub(1);
        let message = batch.into_iter().next()?;
        if extra > 0 {
            log::debug!("router: ignoring {} further message(s) in batch", extra);
        }
        Some(self.route_message(client, &message).await)
    }

    pub async fn route_message(
        &self,
        client: &dyn MessagingClient,
        message: &InboundMessage,
    ) -> RouteOutcome {
        let mut outcome = RouteOutcome::default();

        let group = is_group(&message.key.remote_jid);
        if message.key.from_me {
            log::debug!("router: skipping self-sent message {}", message.key.id);
            outcome.skipped_self = true;
            return outcome;
        }

        let group_name = if group {
            match client.group_subject(&message.key.remote_jid).await {
                Ok(subject) => Some(subject),
                Err(e) => {
                    log::warn!(
                        "router: group name for {} unavailable: {}",
                        message.key.remote_jid,
                        e
                    );
                    self.error_log.record(&e).await;
                    None
                }
            }
        } else {
            None
        };

        let sender_name = if message.push_name.is_empty() {
            phone_digits(
                message
                    .key
                    .participant
                    .as_deref()
                    .unwrap_or(&message.key.remote_jid),
            )
        } else {
            message.push_name.clone()
        };

        let ctx = RelayContext {
            is_group: group,
            group_name: group_name.as_deref(),
            sender_name: &sender_name,
        };
        match self.relay.relay(client, message, ctx).await {
            Ok(relayed) => outcome.relayed = relayed,
            Err(e) => {
                log::error!("router: view-once relay for {} failed: {}", message.key.id, e);
                self.error_log.record(&e).await;
                outcome.failed = true;
                return outcome;
            }
        }

        match self.responder.respond(client, message, group).await {
            Ok(replied) => outcome.replied = replied,
            Err(e) => {
                log::error!("router: keyword reply for {} failed: {}", message.key.id, e);
                self.error_log.record(&e).await;
                outcome.failed = true;
            }
        }
        outcome
    }
}
