//! Live session state for one access token.
//!
//! DESIGN
//! ======
//! Two producers feed one state-owning loop over an mpsc channel:
//! - a fetch task asks the provider for the session once at spawn (and again
//!   on every `check_session`);
//! - a change task forwards the provider's auth events.
//!
//! The loop is the only writer of `SessionState` and publishes snapshots on a
//! `watch` channel. Every applied change event bumps an epoch. A fetch that
//! started before the current epoch is stale: it may clear `is_loading` and
//! record an error, but it never overwrites the user set by a newer event.
//!
//! The loop also keeps the expiry of the session it holds. Reaching it is a
//! sign-out like any change event, so a cached cell never outlives the
//! provider's session.
//!
//! TEARDOWN
//! ========
//! Dropping the `SessionCell` aborts the loop and the change task. The loop
//! owns the watch sender and the in-flight fetches, so both go with it and
//! observers see the channel close instead of further updates.

pub mod registry;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, warn};

use time::OffsetDateTime;

use crate::auth::{AuthEvent, AuthEventKind, AuthProvider, Identity, Session};

const UPDATE_QUEUE_CAPACITY: usize = 32;

/// What a consumer of the session sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub user: Option<Identity>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl SessionState {
    /// State of a cell whose initial fetch has not resolved yet.
    #[must_use]
    pub fn loading() -> Self {
        Self { user: None, is_loading: true, error: None }
    }

    /// Settled state with no session (no token presented, or token rejected).
    #[must_use]
    pub fn signed_out() -> Self {
        Self { user: None, is_loading: false, error: None }
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}

enum Update {
    Fetched {
        started_epoch: u64,
        result: Result<Option<Session>, String>,
        reply: Option<oneshot::Sender<SessionState>>,
    },
    Changed(AuthEvent),
    Check(oneshot::Sender<SessionState>),
}

/// Handle to a running session cell.
pub struct SessionCell {
    state: watch::Receiver<SessionState>,
    updates: mpsc::Sender<Update>,
    driver: JoinHandle<()>,
    forwarder: JoinHandle<()>,
}

impl SessionCell {
    /// Start tracking the session behind `token`. Must be called inside a Tokio runtime.
    pub fn spawn(provider: Arc<dyn AuthProvider>, token: impl Into<String>) -> Self {
        // Subscribe before the first fetch so no event can slip between them.
        let events = provider.subscribe();
        let (updates_tx, updates_rx) = mpsc::channel(UPDATE_QUEUE_CAPACITY);
        let (publish, state) = watch::channel(SessionState::loading());

        let forwarder = tokio::spawn(forward_events(events, updates_tx.clone()));
        let driver = CellLoop {
            token: token.into(),
            state: SessionState::loading(),
            epoch: 0,
            expires_at: None,
            provider,
            publish,
            updates: updates_tx.clone(),
            fetches: JoinSet::new(),
        };
        let driver = tokio::spawn(driver.run(updates_rx));

        Self { state, updates: updates_tx, driver, forwarder }
    }

    /// Latest published state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// A receiver that observes every published state change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Wait until the initial fetch has resolved.
    pub async fn settled(&self) -> SessionState {
        let mut rx = self.state.clone();
        // A closed channel means the cell was torn down; report the last state.
        let _ = rx.wait_for(|state| !state.is_loading).await;
        let state = rx.borrow().clone();
        state
    }

    /// Re-fetch the session and return the state after it has been applied.
    pub async fn check_session(&self) -> SessionState {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.updates.send(Update::Check(reply_tx)).await.is_err() {
            return self.snapshot();
        }
        reply_rx.await.unwrap_or_else(|_| self.snapshot())
    }

    /// Stop both producers and the state loop. Equivalent to dropping the cell.
    pub fn unmount(self) {}
}

impl Drop for SessionCell {
    fn drop(&mut self) {
        self.forwarder.abort();
        self.driver.abort();
    }
}

struct CellLoop {
    token: String,
    state: SessionState,
    /// Number of change events applied so far.
    epoch: u64,
    /// Expiry of the held session, if the provider reported one.
    expires_at: Option<OffsetDateTime>,
    provider: Arc<dyn AuthProvider>,
    publish: watch::Sender<SessionState>,
    updates: mpsc::Sender<Update>,
    fetches: JoinSet<()>,
}

impl CellLoop {
    async fn run(mut self, mut rx: mpsc::Receiver<Update>) {
        self.spawn_fetch(None);
        loop {
            let deadline = self.expiry_deadline();
            tokio::select! {
                update = rx.recv() => {
                    let Some(update) = update else { break };
                    match update {
                        Update::Fetched { started_epoch, result, reply } => {
                            self.apply_fetched(started_epoch, result);
                            if let Some(reply) = reply {
                                let _ = reply.send(self.state.clone());
                            }
                        }
                        Update::Changed(event) => self.apply_changed(event),
                        Update::Check(reply) => self.spawn_fetch(Some(reply)),
                    }
                }
                () = wait_until(deadline) => self.apply_expired(),
            }
            while self.fetches.try_join_next().is_some() {}
        }
    }

    /// When the held session runs out; `None` while signed out or when the
    /// provider gave no expiry.
    fn expiry_deadline(&self) -> Option<Instant> {
        if self.state.user.is_none() {
            return None;
        }
        let remaining = self.expires_at? - OffsetDateTime::now_utc();
        Some(Instant::now() + Duration::try_from(remaining).unwrap_or(Duration::ZERO))
    }

    fn apply_expired(&mut self) {
        debug!("session expired");
        // Counts as a change, so an in-flight fetch cannot bring the user back.
        self.epoch += 1;
        self.expires_at = None;
        let mut next = self.state.clone();
        next.user = None;
        self.set(next);
    }

    fn spawn_fetch(&mut self, reply: Option<oneshot::Sender<SessionState>>) {
        let provider = Arc::clone(&self.provider);
        let token = self.token.clone();
        let updates = self.updates.clone();
        let started_epoch = self.epoch;
        self.fetches.spawn(async move {
            let result = provider
                .get_session(&token)
                .await
                .map_err(|e| e.to_string());
            let _ = updates
                .send(Update::Fetched { started_epoch, result, reply })
                .await;
        });
    }

    fn apply_fetched(&mut self, started_epoch: u64, result: Result<Option<Session>, String>) {
        let stale = started_epoch != self.epoch;
        let mut next = self.state.clone();
        match result {
            Ok(session) => {
                if !stale {
                    self.expires_at = session.as_ref().and_then(|s| s.expires_at);
                    next.user = session.map(|s| s.user);
                }
                next.error = None;
            }
            Err(message) => {
                warn!(error = %message, "session fetch failed");
                if !stale {
                    next.user = None;
                }
                next.error = Some(message);
            }
        }
        next.is_loading = false;
        self.set(next);
    }

    fn apply_changed(&mut self, event: AuthEvent) {
        if event.token != self.token {
            return;
        }
        debug!(kind = ?event.kind, "session change applied");
        self.epoch += 1;
        if let Some(renewed) = event.renewed_token {
            self.token = renewed;
        }
        // A profile update says nothing about the session's lifetime.
        if event.kind != AuthEventKind::UserUpdated {
            self.expires_at = event.expires_at;
        }
        let mut next = self.state.clone();
        next.user = event.user;
        self.set(next);
    }

    fn set(&mut self, next: SessionState) {
        if next == self.state {
            return;
        }
        self.state = next.clone();
        self.publish.send_replace(next);
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn forward_events(mut events: broadcast::Receiver<AuthEvent>, updates: mpsc::Sender<Update>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if updates.send(Update::Changed(event)).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "session cell lagged behind auth events");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
