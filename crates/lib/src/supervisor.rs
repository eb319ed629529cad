//! Connection supervisor: open a session, persist credential updates, feed message batches to the router,
//! and reconnect after any close that is not a logout.
//!
//! Reconnects run in a loop with exponential backoff (reset once a session opens). A failure to establish
//! a session is returned to the caller.

use crate::credentials::CredentialStore;
use crate::routing::MessageRouter;
use crate::session::{ConnectionState, Connector, Session, SessionEvent};
use anyhow::{Context, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Why [`Supervisor::run_until`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorExit {
    /// The backend logged this device out; credentials are no longer valid.
    LoggedOut,
    /// The shutdown future resolved.
    Shutdown,
}

/// Exponential backoff: `initial`, doubling up to `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    next: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
            next: initial,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let d = self.next;
        self.next = self.next.saturating_mul(2).min(self.max);
        d
    }

    pub fn reset(&mut self) {
        self.next = self.initial;
    }
}

enum SessionEnd {
    Reconnect,
    Exit(SupervisorExit),
}

pub struct Supervisor<C> {
    connector: C,
    router: Arc<MessageRouter>,
    credentials: CredentialStore,
    backoff: Backoff,
}

impl<C: Connector> Supervisor<C> {
    pub fn new(
        connector: C,
        router: Arc<MessageRouter>,
        credentials: CredentialStore,
        backoff: Backoff,
    ) -> Self {
        Self {
            connector,
            router,
            credentials,
            backoff,
        }
    }

    /// Supervise until logout.
    pub async fn run(&self) -> Result<SupervisorExit> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Supervise until logout or until `shutdown` resolves. In-flight message tasks are awaited before returning.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<SupervisorExit>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut tasks = JoinSet::new();
        let result = self.supervise(&mut shutdown, &mut tasks).await;
        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                log::error!("supervisor: message task failed: {}", e);
            }
        }
        result
    }

    async fn supervise<F>(
        &self,
        shutdown: &mut Pin<&mut F>,
        tasks: &mut JoinSet<()>,
    ) -> Result<SupervisorExit>
    where
        F: Future<Output = ()>,
    {
        let mut backoff = self.backoff.clone();
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            let creds = self
                .credentials
                .load()
                .context("loading persisted credentials")?;
            log::info!(
                "supervisor: connecting (attempt {}, {})",
                attempt,
                if creds.is_some() { "saved credentials" } else { "new pairing" }
            );
            let session = tokio::select! {
                s = self.connector.connect(creds) => s.context("establishing session")?,
                _ = shutdown.as_mut() => return Ok(SupervisorExit::Shutdown),
            };

            match self.drive(session, shutdown, tasks, &mut backoff).await {
                SessionEnd::Exit(exit) => return Ok(exit),
                SessionEnd::Reconnect => {
                    let delay = backoff.next_delay();
                    if !delay.is_zero() {
                        log::info!("supervisor: reconnecting in {:?}", delay);
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = shutdown.as_mut() => return Ok(SupervisorExit::Shutdown),
                        }
                    }
                }
            }
        }
    }

    async fn drive<F>(
        &self,
        session: Session,
        shutdown: &mut Pin<&mut F>,
        tasks: &mut JoinSet<()>,
        backoff: &mut Backoff,
    ) -> SessionEnd
    where
        F: Future<Output = ()>,
    {
        let Session { client, mut events } = session;
        loop {
            let event = tokio::select! {
                ev = events.recv() => ev,
                Some(res) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = res {
                        log::error!("supervisor: message task failed: {}", e);
                    }
                    continue;
                }
                _ = shutdown.as_mut() => {
                    log::info!("supervisor: shutdown requested");
                    return SessionEnd::Exit(SupervisorExit::Shutdown);
                }
            };
            let Some(event) = event else {
                log::warn!("supervisor: session event stream ended, reconnecting");
                return SessionEnd::Reconnect;
            };
            match event {
                SessionEvent::CredentialsUpdated(blob) => {
                    if let Err(e) = self.credentials.save(&blob) {
                        log::error!("supervisor: persisting credentials failed: {}", e);
                    }
                }
                SessionEvent::Connection(ConnectionState::Connecting) => {
                    log::debug!("supervisor: connecting");
                }
                SessionEvent::Connection(ConnectionState::Open) => {
                    log::info!("supervisor: connection opened");
                    backoff.reset();
                }
                SessionEvent::Connection(ConnectionState::Closed(reason)) => {
                    if reason.is_logged_out() {
                        log::error!(
                            "supervisor: session logged out; delete {} and pair again",
                            self.credentials.dir().display()
                        );
                        return SessionEnd::Exit(SupervisorExit::LoggedOut);
                    }
                    log::warn!("supervisor: connection closed ({}), reconnecting", reason);
                    return SessionEnd::Reconnect;
                }
                SessionEvent::Messages(batch) => {
                    let router = self.router.clone();
                    let client = client.clone();
                    tasks.spawn(async move {
                        router.route(client.as_ref(), batch).await;
                    });
                }
            }
        }
    }
}
