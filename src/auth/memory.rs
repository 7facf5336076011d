//! In-process auth provider for local development and tests.
//!
//! Accounts live in a mutex-guarded map keyed by normalized email. Passwords
//! are stored as salted SHA-256 digests; access and refresh tokens are random
//! hex strings. Nothing survives a restart.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Mutex, PoisonError};

use rand::Rng;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{AUTH_EVENT_CAPACITY, AuthError, AuthEvent, AuthProvider, Identity, Session, normalize_email};

pub const MIN_PASSWORD_LEN: usize = 6;
const DEFAULT_SESSION_TTL_SECS: i64 = 3600;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

#[must_use]
pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    bytes_to_hex(&hasher.finalize())
}

struct Account {
    identity: Identity,
    salt: String,
    password_hash: String,
}

struct StoredSession {
    email: String,
    refresh_token: String,
    expires_at: OffsetDateTime,
}

#[derive(Default)]
struct Inner {
    /// Accounts keyed by normalized email.
    accounts: HashMap<String, Account>,
    /// Live sessions keyed by access token.
    sessions: HashMap<String, StoredSession>,
    /// Refresh token -> access token.
    refresh: HashMap<String, String>,
}

pub struct MemoryAuthProvider {
    inner: Mutex<Inner>,
    events: broadcast::Sender<AuthEvent>,
    session_ttl: Duration,
}

impl MemoryAuthProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::with_session_ttl(Duration::seconds(DEFAULT_SESSION_TTL_SECS))
    }

    #[must_use]
    pub fn with_session_ttl(session_ttl: Duration) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self { inner: Mutex::new(Inner::default()), events, session_ttl }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }

    fn issue_session(&self, inner: &mut Inner, identity: &Identity) -> Session {
        let access_token = generate_token();
        let refresh_token = generate_token();
        let expires_at = OffsetDateTime::now_utc() + self.session_ttl;
        inner.sessions.insert(
            access_token.clone(),
            StoredSession { email: identity.email.clone(), refresh_token: refresh_token.clone(), expires_at },
        );
        inner.refresh.insert(refresh_token.clone(), access_token.clone());
        Session {
            access_token,
            refresh_token: Some(refresh_token),
            expires_at: Some(expires_at),
            user: identity.clone(),
        }
    }

    fn drop_session(inner: &mut Inner, access_token: &str) -> Option<StoredSession> {
        let stored = inner.sessions.remove(access_token)?;
        inner.refresh.remove(&stored.refresh_token);
        Some(stored)
    }
}

impl Default for MemoryAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn check_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Rejected(format!(
            "Password should be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[async_trait::async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Option<Session>, AuthError> {
        let email = normalize_email(email).ok_or_else(|| AuthError::Rejected("Unable to validate email address".into()))?;
        check_password(password)?;

        let session = {
            let mut inner = self.lock();
            if inner.accounts.contains_key(&email) {
                return Err(AuthError::Rejected("User already registered".into()));
            }
            let identity = Identity {
                id: Uuid::new_v4(),
                email: email.clone(),
                display_name: display_name.map(str::trim).filter(|n| !n.is_empty()).map(ToOwned::to_owned),
            };
            let salt = generate_token();
            let password_hash = hash_password(&salt, password);
            inner
                .accounts
                .insert(email, Account { identity: identity.clone(), salt, password_hash });
            self.issue_session(&mut inner, &identity)
        };

        self.emit(AuthEvent::signed_in(&session));
        Ok(Some(session))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email).ok_or(AuthError::InvalidCredentials)?;
        let session = {
            let mut inner = self.lock();
            let identity = match inner.accounts.get(&email) {
                Some(account) if hash_password(&account.salt, password) == account.password_hash => {
                    account.identity.clone()
                }
                _ => return Err(AuthError::InvalidCredentials),
            };
            self.issue_session(&mut inner, &identity)
        };

        self.emit(AuthEvent::signed_in(&session));
        Ok(session)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let removed = Self::drop_session(&mut self.lock(), access_token);
        if removed.is_some() {
            self.emit(AuthEvent::signed_out(access_token));
        }
        Ok(())
    }

    async fn get_session(&self, access_token: &str) -> Result<Option<Session>, AuthError> {
        let mut inner = self.lock();
        let Some(stored) = inner.sessions.get(access_token) else {
            return Ok(None);
        };
        if stored.expires_at <= OffsetDateTime::now_utc() {
            Self::drop_session(&mut inner, access_token);
            return Ok(None);
        }
        let Some(account) = inner.accounts.get(&stored.email) else {
            return Ok(None);
        };
        Ok(Some(Session {
            access_token: access_token.to_owned(),
            refresh_token: Some(stored.refresh_token.clone()),
            expires_at: Some(stored.expires_at),
            user: account.identity.clone(),
        }))
    }

    async fn refresh_session(&self, access_token: &str, refresh_token: &str) -> Result<Session, AuthError> {
        let session = {
            let mut inner = self.lock();
            let Some(previous) = inner.refresh.get(refresh_token).cloned() else {
                return Err(AuthError::Rejected("Invalid Refresh Token: Refresh Token Not Found".into()));
            };
            let Some(stored) = Self::drop_session(&mut inner, &previous) else {
                return Err(AuthError::Rejected("Invalid Refresh Token: Refresh Token Not Found".into()));
            };
            let Some(identity) = inner.accounts.get(&stored.email).map(|a| a.identity.clone()) else {
                return Err(AuthError::NotSignedIn);
            };
            self.issue_session(&mut inner, &identity)
        };

        self.emit(AuthEvent::token_refreshed(access_token, &session));
        Ok(session)
    }

    async fn update_password(&self, access_token: &str, password: &str) -> Result<Identity, AuthError> {
        check_password(password)?;
        let identity = {
            let mut inner = self.lock();
            let email = match inner.sessions.get(access_token) {
                Some(stored) if stored.expires_at > OffsetDateTime::now_utc() => stored.email.clone(),
                _ => return Err(AuthError::NotSignedIn),
            };
            let Some(account) = inner.accounts.get_mut(&email) else {
                return Err(AuthError::NotSignedIn);
            };
            account.salt = generate_token();
            account.password_hash = hash_password(&account.salt, password);
            account.identity.clone()
        };

        self.emit(AuthEvent::user_updated(access_token, &identity));
        Ok(identity)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
