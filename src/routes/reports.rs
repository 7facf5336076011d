//! `/api/reports` handlers: dashboard counts, bed occupancy, appointment mix.

use axum::extract::{Query, State};
use axum::response::Json;

use super::ApiError;
use super::auth::AuthUser;
use crate::listing::{self, ListParams};
use crate::services::reports::{self, OccupancyFilter, StatusCount, Summary, UnitOccupancy, Window};
use crate::state::AppState;

/// `GET /api/reports/summary`
pub async fn summary(State(state): State<AppState>, _auth: AuthUser) -> Result<Json<Summary>, ApiError> {
    Ok(Json(reports::summary(&state.pool).await?))
}

/// `GET /api/reports/occupancy?facility_id=`
pub async fn occupancy(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(filter): Query<OccupancyFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<UnitOccupancy>>, ApiError> {
    let rows = reports::occupancy(&state.pool, &filter).await?;
    Ok(Json(listing::apply(rows, &params)))
}

/// `GET /api/reports/appointments?from=&to=`
pub async fn appointments(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(window): Query<Window>,
) -> Result<Json<Vec<StatusCount>>, ApiError> {
    if let (Some(from), Some(to)) = (window.from, window.to) {
        if to <= from {
            return Err(ApiError::unprocessable("`to` must be after `from`"));
        }
    }
    Ok(Json(reports::appointment_status_counts(&state.pool, &window).await?))
}

#[cfg(test)]
#[path = "reports_test.rs"]
mod tests;
