//! `/api/admins` handlers. Reads are open to any signed-in user; role
//! changes and deletes need the caller to be an admin.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use tracing::{info, warn};
use uuid::Uuid;

use super::ApiError;
use super::auth::AuthUser;
use crate::listing::{self, ListParams};
use crate::services::admins::{self, AdminUser, RoleChange};
use crate::state::AppState;

async fn require_admin(state: &AppState, auth: &AuthUser) -> Result<(), ApiError> {
    if admins::is_admin(&state.pool, auth.user.id).await? {
        return Ok(());
    }
    warn!(user_id = %auth.user.id, "admin action refused");
    Err(ApiError::new(StatusCode::FORBIDDEN, "admin role required"))
}

/// `GET /api/admins`
pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<AdminUser>>, ApiError> {
    let rows = admins::list(&state.pool).await?;
    Ok(Json(listing::apply(rows, &params)))
}

/// `GET /api/admins/{id}`
pub async fn get(State(state): State<AppState>, _auth: AuthUser, Path(id): Path<Uuid>) -> Result<Json<AdminUser>, ApiError> {
    Ok(Json(admins::get(&state.pool, id).await?))
}

/// `PATCH /api/admins/{id}/role`
pub async fn set_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<RoleChange>,
) -> Result<Json<AdminUser>, ApiError> {
    require_admin(&state, &auth).await?;
    if id == auth.user.id && !body.is_admin {
        return Err(ApiError::unprocessable("cannot revoke your own admin role"));
    }
    let user = admins::set_admin_role(&state.pool, id, body.is_admin).await?;
    info!(user_id = %auth.user.id, target_id = %id, is_admin = body.is_admin, "admin role changed");
    Ok(Json(user))
}

/// `DELETE /api/admins/{id}`
///
/// Removes the profile row only.
pub async fn delete(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    require_admin(&state, &auth).await?;
    if id == auth.user.id {
        return Err(ApiError::unprocessable("cannot delete your own profile"));
    }
    admins::delete(&state.pool, id).await?;
    info!(user_id = %auth.user.id, target_id = %id, "admin profile deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "admins_test.rs"]
mod tests;
