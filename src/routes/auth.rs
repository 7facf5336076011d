//! Auth routes: credential flows, session lookup, and the `AuthUser` extractor.

use axum::extract::{FromRef, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::{info, warn};

use super::ApiError;
use crate::auth::{Identity, Session, normalize_email};
use crate::guard::{self, SESSION_COOKIE};
use crate::services::admins;
use crate::session::SessionState;
use crate::state::AppState;

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated user resolved from the session cookie or bearer token.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: Identity,
    pub token: String,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = guard::access_token(&parts.headers).ok_or_else(ApiError::unauthorized)?;
        let app_state = AppState::from_ref(state);
        let session = app_state.sessions.resolve(&token).await;
        user_from_session(session).map(|user| Self { user, token })
    }
}

fn user_from_session(session: SessionState) -> Result<Identity, ApiError> {
    if session.is_loading {
        return Err(ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "session check timed out"));
    }
    if let Some(message) = session.error {
        return Err(ApiError::new(StatusCode::SERVICE_UNAVAILABLE, message));
    }
    session.user.ok_or_else(ApiError::unauthorized)
}

// =============================================================================
// COOKIES
// =============================================================================

pub(crate) fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

pub(crate) fn cleared_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::ZERO)
        .build()
}

/// Create or refresh the staff profile after sign-in. Failures are logged only.
async fn record_profile(state: &AppState, user: &Identity) {
    let bootstrap = state.is_bootstrap_admin(&user.email);
    if let Err(e) = admins::ensure_profile(&state.pool, user, bootstrap).await {
        warn!(error = %e, user_id = %user.id, "profile upsert failed");
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct SignUpBody {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Deserialize)]
pub struct SignInBody {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshBody {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct PasswordBody {
    pub password: String,
}

/// `POST /api/auth/sign-up`
///
/// Register; signs in when the provider issues a session.
pub async fn sign_up(State(state): State<AppState>, Json(body): Json<SignUpBody>) -> Result<Response, ApiError> {
    let email = normalize_email(&body.email).ok_or_else(|| ApiError::unprocessable("a valid email is required"))?;
    let display_name = body.display_name.as_deref().map(str::trim).filter(|n| !n.is_empty());

    let Some(session) = state.auth.sign_up(&email, &body.password, display_name).await? else {
        info!("sign-up awaiting email confirmation");
        let body = serde_json::json!({ "confirmation_required": true });
        return Ok((StatusCode::ACCEPTED, Json(body)).into_response());
    };

    info!(user_id = %session.user.id, "user signed up");
    record_profile(&state, &session.user).await;
    let jar = CookieJar::new().add(session_cookie(session.access_token.clone(), state.cookie_secure));
    Ok((StatusCode::CREATED, jar, Json(session)).into_response())
}

/// `POST /api/auth/sign-in`
///
/// Password sign-in, rate limited per email and globally.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(body): Json<SignInBody>,
) -> Result<(CookieJar, Json<Session>), ApiError> {
    let email = normalize_email(&body.email).ok_or_else(|| ApiError::unprocessable("a valid email is required"))?;
    state.sign_in_limiter.check_and_record(&email)?;

    let session = state.auth.sign_in(&email, &body.password).await?;
    info!(user_id = %session.user.id, "user signed in");
    record_profile(&state, &session.user).await;

    let jar = CookieJar::new().add(session_cookie(session.access_token.clone(), state.cookie_secure));
    Ok((jar, Json(session)))
}

/// `POST /api/auth/sign-out`
///
/// End the provider session and clear the cookie.
///
/// Always succeeds locally, even if the provider call fails.
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = guard::access_token(&headers) {
        if let Err(e) = state.auth.sign_out(&token).await {
            warn!(error = %e, "provider sign-out failed");
        }
        state.sessions.forget(&token).await;
    }
    let jar = CookieJar::new().add(cleared_session_cookie(state.cookie_secure));
    (jar, StatusCode::NO_CONTENT)
}

/// `POST /api/auth/refresh`
///
/// Exchange a refresh token for a new session.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RefreshBody>,
) -> Result<(CookieJar, Json<Session>), ApiError> {
    let previous = guard::access_token(&headers).unwrap_or_default();
    let session = state.auth.refresh_session(&previous, &body.refresh_token).await?;
    if !previous.is_empty() {
        state.sessions.forget(&previous).await;
    }

    let jar = CookieJar::new().add(session_cookie(session.access_token.clone(), state.cookie_secure));
    Ok((jar, Json(session)))
}

/// `GET /api/auth/session`
///
/// The settled session state for the caller.
pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> Json<SessionState> {
    Json(guard::session_for(&state, &headers).await)
}

/// `PUT /api/auth/password`
///
/// Change the signed-in user's password.
pub async fn update_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<PasswordBody>,
) -> Result<Json<Identity>, ApiError> {
    let identity = state.auth.update_password(&auth.token, &body.password).await?;
    info!(user_id = %identity.id, "password updated");
    Ok(Json(identity))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
