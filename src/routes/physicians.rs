//! `/api/physicians` handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use tracing::info;
use uuid::Uuid;

use super::auth::AuthUser;
use super::{ApiError, require_text};
use crate::listing::{self, ListParams};
use crate::services::physicians::{self, NewPhysician, Physician, PhysicianFilter, PhysicianUpdate};
use crate::state::AppState;

/// `GET /api/physicians?facility_id=&is_active=`
pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(filter): Query<PhysicianFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Physician>>, ApiError> {
    let rows = physicians::list(&state.pool, &filter).await?;
    Ok(Json(listing::apply(rows, &params)))
}

/// `GET /api/physicians/{id}`
pub async fn get(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Physician>, ApiError> {
    Ok(Json(physicians::get(&state.pool, id).await?))
}

/// `POST /api/physicians`
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewPhysician>,
) -> Result<(StatusCode, Json<Physician>), ApiError> {
    require_text("first_name", &body.first_name)?;
    require_text("last_name", &body.last_name)?;
    require_text("license_number", &body.license_number)?;
    let physician = physicians::create(&state.pool, &body).await?;
    info!(user_id = %auth.user.id, physician_id = %physician.id, "physician created");
    Ok((StatusCode::CREATED, Json(physician)))
}

/// `PATCH /api/physicians/{id}`
pub async fn update(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<PhysicianUpdate>,
) -> Result<Json<Physician>, ApiError> {
    Ok(Json(physicians::update(&state.pool, id, &body).await?))
}

/// `DELETE /api/physicians/{id}`
pub async fn delete(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    physicians::delete(&state.pool, id).await?;
    info!(user_id = %auth.user.id, physician_id = %id, "physician deleted");
    Ok(StatusCode::NO_CONTENT)
}
