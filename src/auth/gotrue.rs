//! GoTrue-compatible HTTP auth provider.
//!
//! Talks to the managed backend's `/auth/v1` API with the project `apikey`
//! header. The remote service has no push channel we consume, so change
//! events are emitted locally after each successful call.

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use super::{AUTH_EVENT_CAPACITY, AuthError, AuthEvent, AuthProvider, Identity, Session};
use crate::config::GoTrueConfig;

pub struct GoTrueProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    events: broadcast::Sender<AuthEvent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: UserResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserResponse {
    id: Uuid,
    email: Option<String>,
    #[serde(default)]
    user_metadata: serde_json::Value,
}

impl GoTrueProvider {
    /// Build a provider for the configured project.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &GoTrueConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Ok(Self { http, base_url: config.url.trim_end_matches('/').to_owned(), api_key: config.api_key.clone(), events })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.endpoint(path))
            .header("apikey", &self.api_key)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, AuthError> {
        let resp = builder
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(error_from_response(status, &body))
    }

    fn emit(&self, event: AuthEvent) {
        debug!(kind = ?event.kind, "auth event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[async_trait::async_trait]
impl AuthProvider for GoTrueProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Option<Session>, AuthError> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "data": { "display_name": display_name },
        });
        let resp = self
            .send(self.request(reqwest::Method::POST, "signup").json(&body))
            .await?;
        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AuthError::Decode(e.to_string()))?;

        // Projects with email confirmation enabled answer with a bare user.
        if value.get("access_token").is_none() {
            return Ok(None);
        }
        let token: TokenResponse = serde_json::from_value(value).map_err(|e| AuthError::Decode(e.to_string()))?;
        let session = session_from_token(token, OffsetDateTime::now_utc());
        self.emit(AuthEvent::signed_in(&session));
        Ok(Some(session))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let resp = self
            .send(
                self.request(reqwest::Method::POST, "token")
                    .query(&[("grant_type", "password")])
                    .json(&body),
            )
            .await?;
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::Decode(e.to_string()))?;
        let session = session_from_token(token, OffsetDateTime::now_utc());
        self.emit(AuthEvent::signed_in(&session));
        Ok(session)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.send(self.request(reqwest::Method::POST, "logout").bearer_auth(access_token))
            .await?;
        self.emit(AuthEvent::signed_out(access_token));
        Ok(())
    }

    async fn get_session(&self, access_token: &str) -> Result<Option<Session>, AuthError> {
        let result = self
            .send(self.request(reqwest::Method::GET, "user").bearer_auth(access_token))
            .await;
        let resp = match result {
            Ok(resp) => resp,
            Err(AuthError::NotSignedIn | AuthError::InvalidCredentials) => return Ok(None),
            Err(e) => return Err(e),
        };
        let user: UserResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::Decode(e.to_string()))?;
        Ok(Some(Session {
            access_token: access_token.to_owned(),
            refresh_token: None,
            expires_at: None,
            user: identity_from_user(user),
        }))
    }

    async fn refresh_session(&self, access_token: &str, refresh_token: &str) -> Result<Session, AuthError> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        let resp = self
            .send(
                self.request(reqwest::Method::POST, "token")
                    .query(&[("grant_type", "refresh_token")])
                    .json(&body),
            )
            .await?;
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::Decode(e.to_string()))?;
        let session = session_from_token(token, OffsetDateTime::now_utc());
        self.emit(AuthEvent::token_refreshed(access_token, &session));
        Ok(session)
    }

    async fn update_password(&self, access_token: &str, password: &str) -> Result<Identity, AuthError> {
        let body = serde_json::json!({ "password": password });
        let resp = self
            .send(
                self.request(reqwest::Method::PUT, "user")
                    .bearer_auth(access_token)
                    .json(&body),
            )
            .await?;
        let user: UserResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::Decode(e.to_string()))?;
        let identity = identity_from_user(user);
        self.emit(AuthEvent::user_updated(access_token, &identity));
        Ok(identity)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

pub(crate) fn identity_from_user(user: UserResponse) -> Identity {
    let display_name = user
        .user_metadata
        .get("display_name")
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned);
    Identity { id: user.id, email: user.email.unwrap_or_default(), display_name }
}

pub(crate) fn session_from_token(token: TokenResponse, now: OffsetDateTime) -> Session {
    let expires_at = token
        .expires_at
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
        .or_else(|| token.expires_in.map(|secs| now + time::Duration::seconds(secs)));
    Session {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        expires_at,
        user: identity_from_user(token.user),
    }
}

/// Map a non-2xx provider response to an `AuthError`, keeping the provider's message.
pub(crate) fn error_from_response(status: StatusCode, body: &str) -> AuthError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(serde_json::Value::as_str).map(ToOwned::to_owned))
        });

    match (status, message) {
        (status, message) if status.is_server_error() => {
            AuthError::Transport(message.unwrap_or_else(|| format!("{status}: {body}")))
        }
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => AuthError::NotSignedIn,
        (StatusCode::BAD_REQUEST, Some(msg)) if msg.to_ascii_lowercase().contains("invalid login credentials") => {
            AuthError::InvalidCredentials
        }
        (_, Some(msg)) => AuthError::Rejected(msg),
        (_, None) => AuthError::Rejected(format!("{status}: {body}")),
    }
}

#[cfg(test)]
#[path = "gotrue_test.rs"]
mod tests;
