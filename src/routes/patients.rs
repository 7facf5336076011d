//! `/api/patients` handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use tracing::info;
use uuid::Uuid;

use super::auth::AuthUser;
use super::{ApiError, require_text};
use crate::listing::{self, ListParams};
use crate::services::patients::{self, NewPatient, Patient, PatientUpdate};
use crate::state::AppState;

/// `GET /api/patients`
pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let rows = patients::list(&state.pool).await?;
    Ok(Json(listing::apply(rows, &params)))
}

/// `GET /api/patients/{id}`
pub async fn get(State(state): State<AppState>, _auth: AuthUser, Path(id): Path<Uuid>) -> Result<Json<Patient>, ApiError> {
    Ok(Json(patients::get(&state.pool, id).await?))
}

/// `POST /api/patients`
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewPatient>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    require_text("first_name", &body.first_name)?;
    require_text("last_name", &body.last_name)?;
    let patient = patients::create(&state.pool, &body).await?;
    info!(user_id = %auth.user.id, patient_id = %patient.id, "patient created");
    Ok((StatusCode::CREATED, Json(patient)))
}

/// `PATCH /api/patients/{id}`
pub async fn update(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<PatientUpdate>,
) -> Result<Json<Patient>, ApiError> {
    Ok(Json(patients::update(&state.pool, id, &body).await?))
}

/// `DELETE /api/patients/{id}`
pub async fn delete(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    patients::delete(&state.pool, id).await?;
    info!(user_id = %auth.user.id, patient_id = %id, "patient deleted");
    Ok(StatusCode::NO_CONTENT)
}
