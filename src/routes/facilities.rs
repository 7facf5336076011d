//! `/api/facilities` and `/api/units` handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use tracing::info;
use uuid::Uuid;

use super::auth::AuthUser;
use super::{ApiError, require_text};
use crate::listing::{self, ListParams};
use crate::services::facilities::{self, Facility, FacilityUnit, FacilityUpdate, NewFacility, NewUnit, UnitUpdate};
use crate::state::AppState;

/// `GET /api/facilities`
pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Facility>>, ApiError> {
    let rows = facilities::list(&state.pool).await?;
    Ok(Json(listing::apply(rows, &params)))
}

/// `GET /api/facilities/{id}`
pub async fn get(State(state): State<AppState>, _auth: AuthUser, Path(id): Path<Uuid>) -> Result<Json<Facility>, ApiError> {
    Ok(Json(facilities::get(&state.pool, id).await?))
}

/// `POST /api/facilities`
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewFacility>,
) -> Result<(StatusCode, Json<Facility>), ApiError> {
    require_text("name", &body.name)?;
    require_text("facility_type", &body.facility_type)?;
    let facility = facilities::create(&state.pool, &body).await?;
    info!(user_id = %auth.user.id, facility_id = %facility.id, "facility created");
    Ok((StatusCode::CREATED, Json(facility)))
}

/// `PATCH /api/facilities/{id}`
pub async fn update(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<FacilityUpdate>,
) -> Result<Json<Facility>, ApiError> {
    Ok(Json(facilities::update(&state.pool, id, &body).await?))
}

/// `DELETE /api/facilities/{id}`
///
/// Cascades to its units.
pub async fn delete(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    facilities::delete(&state.pool, id).await?;
    info!(user_id = %auth.user.id, facility_id = %id, "facility deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// UNITS
// =============================================================================

/// `GET /api/facilities/{id}/units`
///
/// 404s on an unknown facility rather than answering with an empty list.
pub async fn list_units(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(facility_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<FacilityUnit>>, ApiError> {
    facilities::get(&state.pool, facility_id).await?;
    let rows = facilities::list_units(&state.pool, facility_id).await?;
    Ok(Json(listing::apply(rows, &params)))
}

/// `POST /api/facilities/{id}/units`
pub async fn create_unit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(facility_id): Path<Uuid>,
    Json(body): Json<NewUnit>,
) -> Result<(StatusCode, Json<FacilityUnit>), ApiError> {
    require_text("name", &body.name)?;
    require_text("unit_type", &body.unit_type)?;
    if body.total_beds < 0 {
        return Err(ApiError::unprocessable("total_beds must not be negative"));
    }
    let unit = facilities::create_unit(&state.pool, facility_id, &body).await?;
    info!(user_id = %auth.user.id, facility_id = %facility_id, unit_id = %unit.id, "unit created");
    Ok((StatusCode::CREATED, Json(unit)))
}

/// `GET /api/units/{id}`
pub async fn get_unit(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<FacilityUnit>, ApiError> {
    Ok(Json(facilities::get_unit(&state.pool, id).await?))
}

/// `PATCH /api/units/{id}`
pub async fn update_unit(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UnitUpdate>,
) -> Result<Json<FacilityUnit>, ApiError> {
    if body.total_beds.is_some_and(|beds| beds < 0) {
        return Err(ApiError::unprocessable("total_beds must not be negative"));
    }
    Ok(Json(facilities::update_unit(&state.pool, id, &body).await?))
}

/// `DELETE /api/units/{id}`
pub async fn delete_unit(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    facilities::delete_unit(&state.pool, id).await?;
    info!(user_id = %auth.user.id, unit_id = %id, "unit deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "facilities_test.rs"]
mod tests;
