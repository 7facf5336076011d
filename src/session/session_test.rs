use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;
use tokio::time::{Duration, timeout};
use uuid::Uuid;

use super::*;
use crate::auth::AuthError;
use crate::auth::memory::MemoryAuthProvider;

/// Provider whose `get_session` answers from a queue and can be held open.
struct MockProvider {
    events: broadcast::Sender<AuthEvent>,
    responses: Mutex<VecDeque<Result<Option<Session>, AuthError>>>,
    gate: Semaphore,
    fetches: AtomicUsize,
}

impl MockProvider {
    fn new(responses: Vec<Result<Option<Session>, AuthError>>) -> Arc<Self> {
        Self::build(responses, Semaphore::MAX_PERMITS)
    }

    /// `get_session` blocks until `release` is called.
    fn gated(responses: Vec<Result<Option<Session>, AuthError>>) -> Arc<Self> {
        Self::build(responses, 0)
    }

    fn build(responses: Vec<Result<Option<Session>, AuthError>>, permits: usize) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            events,
            responses: Mutex::new(responses.into()),
            gate: Semaphore::new(permits),
            fetches: AtomicUsize::new(0),
        })
    }

    fn release(&self) {
        self.gate.add_permits(1);
    }

    fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait::async_trait]
impl AuthProvider for MockProvider {
    async fn sign_up(&self, _: &str, _: &str, _: Option<&str>) -> Result<Option<Session>, AuthError> {
        unimplemented!("not used by session tests")
    }

    async fn sign_in(&self, _: &str, _: &str) -> Result<Session, AuthError> {
        unimplemented!("not used by session tests")
    }

    async fn sign_out(&self, _: &str) -> Result<(), AuthError> {
        unimplemented!("not used by session tests")
    }

    async fn get_session(&self, _access_token: &str) -> Result<Option<Session>, AuthError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        self.responses
            .lock()
            .expect("mock mutex should lock")
            .pop_front()
            .unwrap_or(Ok(None))
    }

    async fn refresh_session(&self, _: &str, _: &str) -> Result<Session, AuthError> {
        unimplemented!("not used by session tests")
    }

    async fn update_password(&self, _: &str, _: &str) -> Result<Identity, AuthError> {
        unimplemented!("not used by session tests")
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

fn identity(email: &str) -> Identity {
    Identity { id: Uuid::new_v4(), email: email.into(), display_name: None }
}

fn session(token: &str, user: &Identity) -> Session {
    Session { access_token: token.into(), refresh_token: Some(format!("{token}-refresh")), expires_at: None, user: user.clone() }
}

async fn wait_for_state<F>(cell: &SessionCell, predicate: F) -> SessionState
where
    F: FnMut(&SessionState) -> bool,
{
    let mut rx = cell.watch();
    let state = timeout(Duration::from_millis(500), rx.wait_for(predicate))
        .await
        .expect("state wait timed out")
        .expect("session cell closed")
        .clone();
    state
}

async fn assert_no_further_change(rx: &mut watch::Receiver<SessionState>) {
    assert!(
        timeout(Duration::from_millis(80), rx.changed()).await.is_err(),
        "expected no further state change"
    );
}

// =============================================================================
// initial fetch
// =============================================================================

#[tokio::test]
async fn starts_loading_without_user() {
    let provider = MockProvider::gated(vec![]);
    let cell = SessionCell::spawn(provider, "tok");
    assert_eq!(cell.snapshot(), SessionState::loading());
}

#[tokio::test]
async fn successful_fetch_settles_exactly_once_with_user() {
    let nurse = identity("nurse@mercy.org");
    let provider = MockProvider::new(vec![Ok(Some(session("tok", &nurse)))]);
    let cell = SessionCell::spawn(provider.clone(), "tok");
    let mut rx = cell.watch();
    assert!(rx.borrow_and_update().is_loading);

    let settled = cell.settled().await;
    assert!(!settled.is_loading);
    assert_eq!(settled.user, Some(nurse));
    assert!(settled.error.is_none());

    rx.borrow_and_update();
    assert_no_further_change(&mut rx).await;
    assert!(!rx.borrow().is_loading);
    assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_fetch_sets_error_and_leaves_user_empty() {
    let provider = MockProvider::new(vec![Err(AuthError::Transport("connection refused".into()))]);
    let cell = SessionCell::spawn(provider, "tok");

    let settled = cell.settled().await;
    assert!(!settled.is_loading);
    assert!(settled.user.is_none());
    assert_eq!(settled.error.as_deref(), Some("auth provider unreachable: connection refused"));
}

#[tokio::test]
async fn unknown_token_settles_signed_out() {
    let provider = MockProvider::new(vec![Ok(None)]);
    let cell = SessionCell::spawn(provider, "tok");
    assert_eq!(cell.settled().await, SessionState::signed_out());
}

// =============================================================================
// change stream
// =============================================================================

#[tokio::test]
async fn sign_out_event_during_fetch_wins_over_late_fetch() {
    let clerk = identity("clerk@mercy.org");
    let provider = MockProvider::gated(vec![Ok(Some(session("tok", &clerk)))]);
    let cell = SessionCell::spawn(provider.clone(), "tok");

    provider.emit(AuthEvent::user_updated("tok", &clerk));
    let state = wait_for_state(&cell, |s| s.user.is_some()).await;
    assert!(state.is_loading, "events do not settle the initial fetch");

    provider.emit(AuthEvent::signed_out("tok"));
    let state = wait_for_state(&cell, |s| s.user.is_none()).await;
    assert!(state.is_loading);

    provider.release();
    let settled = cell.settled().await;
    assert!(settled.user.is_none(), "stale fetch must not resurrect the user");
    assert!(settled.error.is_none());
}

#[tokio::test]
async fn sign_out_event_after_settle_clears_user() {
    let clerk = identity("clerk@mercy.org");
    let provider = MockProvider::new(vec![Ok(Some(session("tok", &clerk)))]);
    let cell = SessionCell::spawn(provider.clone(), "tok");
    assert!(cell.settled().await.is_signed_in());

    provider.emit(AuthEvent::signed_out("tok"));
    let state = wait_for_state(&cell, |s| s.user.is_none()).await;
    assert!(!state.is_loading);
}

#[tokio::test]
async fn events_for_other_tokens_are_ignored() {
    let clerk = identity("clerk@mercy.org");
    let provider = MockProvider::new(vec![Ok(Some(session("tok", &clerk)))]);
    let cell = SessionCell::spawn(provider.clone(), "tok");
    cell.settled().await;
    let mut rx = cell.watch();
    rx.borrow_and_update();

    provider.emit(AuthEvent::signed_out("someone-else"));
    assert_no_further_change(&mut rx).await;
    assert_eq!(rx.borrow().user, Some(clerk));
}

#[tokio::test]
async fn token_refresh_rekeys_the_cell() {
    let clerk = identity("clerk@mercy.org");
    let provider = MockProvider::new(vec![Ok(Some(session("tok-1", &clerk)))]);
    let cell = SessionCell::spawn(provider.clone(), "tok-1");
    cell.settled().await;

    let renamed = Identity { display_name: Some("Night Clerk".into()), ..clerk.clone() };
    provider.emit(AuthEvent::token_refreshed("tok-1", &session("tok-2", &renamed)));
    let state = wait_for_state(&cell, |s| s.user.as_ref().is_some_and(|u| u.display_name.is_some())).await;
    assert_eq!(state.user, Some(renamed));

    provider.emit(AuthEvent::signed_out("tok-2"));
    wait_for_state(&cell, |s| s.user.is_none()).await;
}

// =============================================================================
// check_session
// =============================================================================

#[tokio::test]
async fn check_session_refetches_without_reentering_loading() {
    let clerk = identity("clerk@mercy.org");
    let provider = MockProvider::new(vec![Ok(None), Ok(Some(session("tok", &clerk)))]);
    let cell = SessionCell::spawn(provider.clone(), "tok");
    assert!(!cell.settled().await.is_signed_in());

    let checked = cell.check_session().await;
    assert_eq!(checked.user, Some(clerk));
    assert!(!checked.is_loading);
    assert_eq!(provider.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn check_session_failure_surfaces_message() {
    let clerk = identity("clerk@mercy.org");
    let provider = MockProvider::new(vec![
        Ok(Some(session("tok", &clerk))),
        Err(AuthError::Rejected("service paused".into())),
    ]);
    let cell = SessionCell::spawn(provider, "tok");
    cell.settled().await;

    let checked = cell.check_session().await;
    assert_eq!(checked.error.as_deref(), Some("service paused"));
    assert!(checked.user.is_none());
}

// =============================================================================
// teardown
// =============================================================================

#[tokio::test]
async fn unmount_stops_all_updates() {
    let clerk = identity("clerk@mercy.org");
    let provider = MockProvider::new(vec![Ok(Some(session("tok", &clerk)))]);
    let cell = SessionCell::spawn(provider.clone(), "tok");
    cell.settled().await;

    let mut rx = cell.watch();
    rx.borrow_and_update();
    cell.unmount();

    provider.emit(AuthEvent::signed_out("tok"));
    let result = timeout(Duration::from_millis(200), rx.changed()).await;
    assert!(matches!(result, Ok(Err(_))), "channel should close rather than update");
    assert_eq!(rx.borrow().user, Some(clerk));
}

#[tokio::test]
async fn unmount_during_fetch_never_settles() {
    let provider = MockProvider::gated(vec![Ok(None)]);
    let cell = SessionCell::spawn(provider.clone(), "tok");
    let mut rx = cell.watch();
    rx.borrow_and_update();
    drop(cell);

    provider.release();
    let result = timeout(Duration::from_millis(200), rx.changed()).await;
    assert!(matches!(result, Ok(Err(_))));
    assert!(rx.borrow().is_loading);
}

// =============================================================================
// with the in-memory provider
// =============================================================================

#[tokio::test]
async fn tracks_memory_provider_sign_out() {
    let provider = Arc::new(MemoryAuthProvider::new());
    let session = provider
        .sign_up("charge.nurse@mercy.org", "hunter22", None)
        .await
        .unwrap()
        .unwrap();

    let cell = SessionCell::spawn(provider.clone(), session.access_token.clone());
    assert_eq!(cell.settled().await.user, Some(session.user.clone()));

    provider.sign_out(&session.access_token).await.unwrap();
    wait_for_state(&cell, |s| s.user.is_none()).await;
}

// =============================================================================
// expiry
// =============================================================================

fn expiring(token: &str, user: &Identity, in_ms: i64) -> Session {
    Session {
        expires_at: Some(time::OffsetDateTime::now_utc() + time::Duration::milliseconds(in_ms)),
        ..session(token, user)
    }
}

#[tokio::test]
async fn reaching_expiry_signs_the_cell_out() {
    let clerk = identity("clerk@mercy.org");
    let provider = MockProvider::new(vec![Ok(Some(expiring("tok-1", &clerk, 80)))]);
    let cell = SessionCell::spawn(provider.clone(), "tok-1");
    assert_eq!(cell.settled().await.user, Some(clerk));

    let state = wait_for_state(&cell, |s| s.user.is_none()).await;
    assert!(!state.is_loading);
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn already_expired_session_settles_signed_out() {
    let clerk = identity("clerk@mercy.org");
    let provider = MockProvider::new(vec![Ok(Some(expiring("tok-1", &clerk, -1_000)))]);
    let cell = SessionCell::spawn(provider, "tok-1");
    wait_for_state(&cell, |s| !s.is_loading && s.user.is_none()).await;
}

#[tokio::test]
async fn refresh_event_extends_expiry() {
    let clerk = identity("clerk@mercy.org");
    let provider = MockProvider::new(vec![Ok(Some(expiring("tok-1", &clerk, 60)))]);
    let cell = SessionCell::spawn(provider.clone(), "tok-1");
    cell.settled().await;

    provider.emit(AuthEvent::token_refreshed("tok-1", &expiring("tok-2", &clerk, 60_000)));
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(cell.snapshot().user, Some(clerk));
}

#[tokio::test]
async fn profile_update_keeps_the_original_expiry() {
    let clerk = identity("clerk@mercy.org");
    let provider = MockProvider::new(vec![Ok(Some(expiring("tok-1", &clerk, 80)))]);
    let cell = SessionCell::spawn(provider.clone(), "tok-1");
    cell.settled().await;

    let renamed = Identity { display_name: Some("Night Clerk".into()), ..clerk };
    provider.emit(AuthEvent::user_updated("tok-1", &renamed));
    wait_for_state(&cell, |s| s.user.is_none()).await;
}

#[tokio::test]
async fn memory_provider_ttl_ends_the_cached_session() {
    let provider = Arc::new(MemoryAuthProvider::with_session_ttl(time::Duration::milliseconds(100)));
    let session = provider
        .sign_up("charge.nurse@mercy.org", "hunter22", None)
        .await
        .unwrap()
        .unwrap();

    let cell = SessionCell::spawn(provider.clone(), session.access_token.clone());
    assert!(cell.settled().await.is_signed_in());
    wait_for_state(&cell, |s| s.user.is_none()).await;
    assert_eq!(provider.get_session(&session.access_token).await.unwrap(), None);
}
