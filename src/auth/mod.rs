//! Auth provider seam.
//!
//! ARCHITECTURE
//! ============
//! Authentication is owned by an external provider. `AuthProvider` is the one
//! seam the rest of the service talks to: route handlers call it for the
//! credential flows, and session cells subscribe to its change stream.
//!
//! Every successful state-changing call emits an `AuthEvent` on the
//! provider's broadcast channel. Events name the access token they concern so
//! a cell can ignore traffic for other sessions.

pub mod gotrue;
pub mod memory;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::AuthBackend;

/// Buffered auth events per subscriber before the slowest one starts lagging.
pub const AUTH_EVENT_CAPACITY: usize = 256;

/// Identity claims for a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
}

impl Identity {
    /// Display name, falling back to the local part of the email.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.email.split('@').next().unwrap_or(&self.email))
    }
}

/// Authenticated-user context returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub access_token: String,
    /// Present on sessions minted by sign-in, sign-up, or refresh; absent on
    /// sessions recovered from an access token alone.
    pub refresh_token: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    pub user: Identity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    /// Access token the event concerns. For a refresh, the token being replaced.
    pub token: String,
    /// Replacement access token after a refresh.
    pub renewed_token: Option<String>,
    /// User of the event's session; `None` when the session ended.
    pub user: Option<Identity>,
    /// Expiry of the session the event carries, when the provider reports one.
    pub expires_at: Option<OffsetDateTime>,
}

impl AuthEvent {
    #[must_use]
    pub fn signed_in(session: &Session) -> Self {
        Self {
            kind: AuthEventKind::SignedIn,
            token: session.access_token.clone(),
            renewed_token: None,
            user: Some(session.user.clone()),
            expires_at: session.expires_at,
        }
    }

    #[must_use]
    pub fn signed_out(token: &str) -> Self {
        Self {
            kind: AuthEventKind::SignedOut,
            token: token.to_owned(),
            renewed_token: None,
            user: None,
            expires_at: None,
        }
    }

    #[must_use]
    pub fn token_refreshed(previous_token: &str, session: &Session) -> Self {
        Self {
            kind: AuthEventKind::TokenRefreshed,
            token: previous_token.to_owned(),
            renewed_token: Some(session.access_token.clone()),
            user: Some(session.user.clone()),
            expires_at: session.expires_at,
        }
    }

    #[must_use]
    pub fn user_updated(token: &str, user: &Identity) -> Self {
        Self {
            kind: AuthEventKind::UserUpdated,
            token: token.to_owned(),
            renewed_token: None,
            user: Some(user.clone()),
            expires_at: None,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid login credentials")]
    InvalidCredentials,
    #[error("not signed in")]
    NotSignedIn,
    /// The provider refused the request; carries its message verbatim.
    #[error("{0}")]
    Rejected(String),
    #[error("auth provider unreachable: {0}")]
    Transport(String),
    #[error("unexpected auth provider response: {0}")]
    Decode(String),
}

/// Operations the service needs from the external auth provider.
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    /// Register an account. Returns `None` when the provider requires email
    /// confirmation before issuing a session.
    async fn sign_up(&self, email: &str, password: &str, display_name: Option<&str>)
    -> Result<Option<Session>, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    /// Resolve the session behind an access token. `Ok(None)` means the token
    /// is unknown or expired.
    async fn get_session(&self, access_token: &str) -> Result<Option<Session>, AuthError>;

    /// Exchange a refresh token for a new session. `access_token` is the token
    /// being replaced and only keys the emitted event.
    async fn refresh_session(&self, access_token: &str, refresh_token: &str) -> Result<Session, AuthError>;

    async fn update_password(&self, access_token: &str, password: &str) -> Result<Identity, AuthError>;

    /// Subscribe to auth-state change notifications.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Construct the configured provider.
///
/// # Errors
///
/// Returns an error if the HTTP client for a remote provider cannot be built.
pub fn build_provider(backend: &AuthBackend) -> Result<Arc<dyn AuthProvider>, AuthError> {
    match backend {
        AuthBackend::GoTrue(config) => Ok(Arc::new(gotrue::GoTrueProvider::new(config)?)),
        AuthBackend::Memory => Ok(Arc::new(memory::MemoryAuthProvider::new())),
    }
}

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let mut parts = normalized.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    Some(normalized)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
