//! `/api/admissions` handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use tracing::info;
use uuid::Uuid;

use super::auth::AuthUser;
use super::{ApiError, require_text};
use crate::listing::{self, ListParams};
use crate::services::admissions::{self, Admission, AdmissionFilter, AdmissionUpdate, Discharge, NewAdmission};
use crate::state::AppState;

/// `GET /api/admissions?patient_id=&facility_unit_id=&active=`
pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(filter): Query<AdmissionFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Admission>>, ApiError> {
    let rows = admissions::list(&state.pool, &filter).await?;
    Ok(Json(listing::apply(rows, &params)))
}

/// `GET /api/admissions/{id}`
pub async fn get(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Admission>, ApiError> {
    Ok(Json(admissions::get(&state.pool, id).await?))
}

/// `POST /api/admissions`
pub async fn admit(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewAdmission>,
) -> Result<(StatusCode, Json<Admission>), ApiError> {
    require_text("reason", &body.reason)?;
    let admission = admissions::admit(&state.pool, &body).await?;
    info!(
        user_id = %auth.user.id,
        admission_id = %admission.id,
        unit_id = %admission.facility_unit_id,
        "patient admitted"
    );
    Ok((StatusCode::CREATED, Json(admission)))
}

/// `PATCH /api/admissions/{id}`
pub async fn update(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AdmissionUpdate>,
) -> Result<Json<Admission>, ApiError> {
    Ok(Json(admissions::update(&state.pool, id, &body).await?))
}

/// `POST /api/admissions/{id}/discharge`
///
/// Body optional.
pub async fn discharge(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    body: Option<Json<Discharge>>,
) -> Result<Json<Admission>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let admission = admissions::discharge(&state.pool, id, &body).await?;
    info!(user_id = %auth.user.id, admission_id = %id, "patient discharged");
    Ok(Json(admission))
}

/// `DELETE /api/admissions/{id}`
pub async fn delete(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    admissions::delete(&state.pool, id).await?;
    info!(user_id = %auth.user.id, admission_id = %id, "admission deleted");
    Ok(StatusCode::NO_CONTENT)
}
