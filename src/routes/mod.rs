//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router serves three surfaces: the JSON API under `/api`, the
//! guarded HTML page shells, and `/healthz`. Page routes sit behind the
//! session guards; API routes authenticate per handler with `AuthUser`.

pub mod admins;
pub mod admissions;
pub mod appointments;
pub mod auth;
pub mod exams;
pub mod facilities;
pub mod pages;
pub mod patients;
pub mod physicians;
pub mod reports;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum::routing::{get, patch, post, put};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::auth::AuthError;
use crate::guard::{self, HOME_PATH};
use crate::rate_limit::RateLimitError;
use crate::services::StoreError;
use crate::state::AppState;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes())
        .merge(protected_pages(state.clone()))
        .merge(public_pages(state.clone()))
        .route("/", get(redirect_root))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/sign-up", post(auth::sign_up))
        .route("/api/auth/sign-in", post(auth::sign_in))
        .route("/api/auth/sign-out", post(auth::sign_out))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/session", get(auth::session))
        .route("/api/auth/password", put(auth::update_password))
        .route("/api/patients", get(patients::list).post(patients::create))
        .route(
            "/api/patients/{id}",
            get(patients::get).patch(patients::update).delete(patients::delete),
        )
        .route("/api/physicians", get(physicians::list).post(physicians::create))
        .route(
            "/api/physicians/{id}",
            get(physicians::get).patch(physicians::update).delete(physicians::delete),
        )
        .route("/api/appointments", get(appointments::list).post(appointments::create))
        .route(
            "/api/appointments/{id}",
            get(appointments::get).patch(appointments::update).delete(appointments::delete),
        )
        .route("/api/admissions", get(admissions::list).post(admissions::admit))
        .route(
            "/api/admissions/{id}",
            get(admissions::get).patch(admissions::update).delete(admissions::delete),
        )
        .route("/api/admissions/{id}/discharge", post(admissions::discharge))
        .route("/api/exams", get(exams::list).post(exams::create))
        .route("/api/exams/{id}", get(exams::get).patch(exams::update).delete(exams::delete))
        .route("/api/facilities", get(facilities::list).post(facilities::create))
        .route(
            "/api/facilities/{id}",
            get(facilities::get).patch(facilities::update).delete(facilities::delete),
        )
        .route(
            "/api/facilities/{id}/units",
            get(facilities::list_units).post(facilities::create_unit),
        )
        .route(
            "/api/units/{id}",
            get(facilities::get_unit)
                .patch(facilities::update_unit)
                .delete(facilities::delete_unit),
        )
        .route("/api/admins", get(admins::list))
        .route("/api/admins/{id}", get(admins::get).delete(admins::delete))
        .route("/api/admins/{id}/role", patch(admins::set_role))
        .route("/api/reports/summary", get(reports::summary))
        .route("/api/reports/occupancy", get(reports::occupancy))
        .route("/api/reports/appointments", get(reports::appointments))
}

fn protected_pages(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(pages::dashboard))
        .route("/patients", get(pages::patients))
        .route("/physicians", get(pages::physicians))
        .route("/appointments", get(pages::appointments))
        .route("/admissions", get(pages::admissions))
        .route("/exams", get(pages::exams))
        .route("/facilities", get(pages::facilities))
        .route("/admins", get(pages::admins))
        .route("/reports", get(pages::reports))
        .route("/account", get(pages::account))
        .route_layer(middleware::from_fn_with_state(state, guard::require_session))
}

fn public_pages(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/sign-in", get(pages::sign_in))
        .route("/sign-up", get(pages::sign_up))
        .route_layer(middleware::from_fn_with_state(state, guard::redirect_if_signed_in))
}

async fn redirect_root() -> Redirect {
    Redirect::temporary(HOME_PATH)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error response rendered as `{"error": "<message>"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "not signed in")
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

pub(crate) fn store_error_to_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::Conflict(_) => StatusCode::CONFLICT,
        StoreError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn auth_error_to_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials | AuthError::NotSignedIn => StatusCode::UNAUTHORIZED,
        AuthError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AuthError::Transport(_) | AuthError::Decode(_) => StatusCode::BAD_GATEWAY,
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = store_error_to_status(&err);
        if let StoreError::Database(inner) = &err {
            error!(error = %inner, "store call failed");
            return Self::new(status, "database error");
        }
        Self::new(status, err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = auth_error_to_status(&err);
        if status == StatusCode::BAD_GATEWAY {
            error!(error = %err, "auth provider call failed");
        }
        Self::new(status, err.to_string())
    }
}

impl From<RateLimitError> for ApiError {
    fn from(err: RateLimitError) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, err.to_string())
    }
}

/// Reject blank required text fields before they reach the store.
pub(crate) fn require_text(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::unprocessable(format!("{field} is required")));
    }
    Ok(())
}

// =============================================================================
// TEST SUPPORT
// =============================================================================


#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
