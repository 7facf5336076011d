//! `/api/exams` handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use tracing::info;
use uuid::Uuid;

use super::auth::AuthUser;
use super::{ApiError, require_text};
use crate::listing::{self, ListParams};
use crate::services::exams::{self, Exam, ExamFilter, ExamUpdate, NewExam};
use crate::state::AppState;

/// `GET /api/exams?patient_id=&admission_id=&status=`
pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(filter): Query<ExamFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Exam>>, ApiError> {
    let rows = exams::list(&state.pool, &filter).await?;
    Ok(Json(listing::apply(rows, &params)))
}

/// `GET /api/exams/{id}`
pub async fn get(State(state): State<AppState>, _auth: AuthUser, Path(id): Path<Uuid>) -> Result<Json<Exam>, ApiError> {
    Ok(Json(exams::get(&state.pool, id).await?))
}

/// `POST /api/exams`
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewExam>,
) -> Result<(StatusCode, Json<Exam>), ApiError> {
    require_text("exam_type", &body.exam_type)?;
    let exam = exams::create(&state.pool, &body).await?;
    info!(user_id = %auth.user.id, exam_id = %exam.id, status = %exam.status, "exam ordered");
    Ok((StatusCode::CREATED, Json(exam)))
}

/// `PATCH /api/exams/{id}`
pub async fn update(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ExamUpdate>,
) -> Result<Json<Exam>, ApiError> {
    Ok(Json(exams::update(&state.pool, id, &body).await?))
}

/// `DELETE /api/exams/{id}`
pub async fn delete(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    exams::delete(&state.pool, id).await?;
    info!(user_id = %auth.user.id, exam_id = %id, "exam deleted");
    Ok(StatusCode::NO_CONTENT)
}
