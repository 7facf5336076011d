//! Route guards for page routes.
//!
//! Two symmetric guards share one decision function. `Protected` pages need a
//! signed-in session; `PublicOnly` pages (sign-in, sign-up) bounce signed-in
//! sessions to the dashboard. Both wait for the session to settle first,
//! render nothing while it is still loading, and show the session error inline
//! when the check failed.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::debug;

use crate::routes::pages;
use crate::session::SessionState;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "session_token";
pub const SIGN_IN_PATH: &str = "/sign-in";
pub const HOME_PATH: &str = "/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    Protected,
    PublicOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still loading; render nothing.
    Pending,
    Render,
    Redirect(&'static str),
    /// Session check failed; render the message in place of the page.
    Error(String),
}

#[must_use]
pub fn decide(kind: GuardKind, state: &SessionState) -> GuardDecision {
    if state.is_loading {
        return GuardDecision::Pending;
    }
    if let Some(message) = &state.error {
        return GuardDecision::Error(message.clone());
    }
    match (kind, state.is_signed_in()) {
        (GuardKind::Protected, true) | (GuardKind::PublicOnly, false) => GuardDecision::Render,
        (GuardKind::Protected, false) => GuardDecision::Redirect(SIGN_IN_PATH),
        (GuardKind::PublicOnly, true) => GuardDecision::Redirect(HOME_PATH),
    }
}

/// Access token from the session cookie, falling back to a bearer header.
#[must_use]
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(token) = jar.get(SESSION_COOKIE).map(Cookie::value).filter(|v| !v.is_empty()) {
        return Some(token.to_owned());
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Settled session for the request; signed out when no token was presented.
pub async fn session_for(state: &AppState, headers: &HeaderMap) -> SessionState {
    match access_token(headers) {
        Some(token) => state.sessions.resolve(&token).await,
        None => SessionState::signed_out(),
    }
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

/// Guard for pages that need a signed-in user.
pub async fn require_session(State(state): State<AppState>, req: Request, next: Next) -> Response {
    guard(GuardKind::Protected, &state, req, next).await
}

/// Guard for sign-in and sign-up pages.
pub async fn redirect_if_signed_in(State(state): State<AppState>, req: Request, next: Next) -> Response {
    guard(GuardKind::PublicOnly, &state, req, next).await
}

async fn guard(kind: GuardKind, state: &AppState, mut req: Request, next: Next) -> Response {
    let session = session_for(state, req.headers()).await;
    let decision = decide(kind, &session);
    debug!(path = %req.uri().path(), ?kind, ?decision, "page guard");
    match decision {
        GuardDecision::Pending => (StatusCode::OK, Html(String::new())).into_response(),
        GuardDecision::Render => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        GuardDecision::Redirect(path) => Redirect::temporary(path).into_response(),
        GuardDecision::Error(message) => {
            (StatusCode::SERVICE_UNAVAILABLE, Html(pages::render_error(&message))).into_response()
        }
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
