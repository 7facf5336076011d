//! `/api/appointments` handlers, including the calendar window query.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use tracing::info;
use uuid::Uuid;

use super::auth::AuthUser;
use super::{ApiError, require_text};
use crate::listing::{self, ListParams};
use crate::services::appointments::{self, Appointment, AppointmentFilter, AppointmentUpdate, NewAppointment};
use crate::state::AppState;

/// `GET /api/appointments?patient_id=&physician_id=&status=&from=&to=`
pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(filter): Query<AppointmentFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if to <= from {
            return Err(ApiError::unprocessable("`to` must be after `from`"));
        }
    }
    let rows = appointments::list(&state.pool, &filter).await?;
    Ok(Json(listing::apply(rows, &params)))
}

/// `GET /api/appointments/{id}`
pub async fn get(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, ApiError> {
    Ok(Json(appointments::get(&state.pool, id).await?))
}

/// `POST /api/appointments`
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewAppointment>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    require_text("reason", &body.reason)?;
    let appointment = appointments::create(&state.pool, &body).await?;
    info!(
        user_id = %auth.user.id,
        appointment_id = %appointment.id,
        scheduled_at = %appointment.scheduled_at,
        "appointment created"
    );
    Ok((StatusCode::CREATED, Json(appointment)))
}

/// `PATCH /api/appointments/{id}`
pub async fn update(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AppointmentUpdate>,
) -> Result<Json<Appointment>, ApiError> {
    Ok(Json(appointments::update(&state.pool, id, &body).await?))
}

/// `DELETE /api/appointments/{id}`
pub async fn delete(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    appointments::delete(&state.pool, id).await?;
    info!(user_id = %auth.user.id, appointment_id = %id, "appointment deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "appointments_test.rs"]
mod tests;
