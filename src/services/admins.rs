//! Staff profiles and the admin role.
//!
//! Profiles are keyed by the auth provider's user id. A profile is created on
//! first sign-in; the admin flag only ever changes through `set_admin_role`
//! or the bootstrap list applied at profile creation.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{StoreError, deleted, found};
use crate::auth::Identity;
use crate::listing::{Listable, SortValue};

const ENTITY: &str = "admin user";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct AdminUser {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub is_admin: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RoleChange {
    pub is_admin: bool,
}

impl Listable for AdminUser {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.email.as_str(), self.display_name.as_str()]
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        Some(match key {
            "email" => (&self.email).into(),
            "display_name" => (&self.display_name).into(),
            "is_admin" => self.is_admin.into(),
            "created_at" => self.created_at.into(),
            _ => return None,
        })
    }
}

/// # Errors
///
/// Returns a store error if the query fails.
pub async fn list(pool: &PgPool) -> Result<Vec<AdminUser>, StoreError> {
    let rows = sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users ORDER BY email")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns `NotFound` if no profile has `id`.
pub async fn get(pool: &PgPool, id: Uuid) -> Result<AdminUser, StoreError> {
    let row = sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    found(row, ENTITY, id)
}

/// Create the signed-in user's profile, or refresh its email and name.
///
/// `bootstrap_admin` grants the admin role; an existing grant is never revoked here.
///
/// # Errors
///
/// Returns `Conflict` if another profile already holds the email.
pub async fn ensure_profile(pool: &PgPool, identity: &Identity, bootstrap_admin: bool) -> Result<AdminUser, StoreError> {
    let row = sqlx::query_as::<_, AdminUser>(
        "INSERT INTO admin_users (id, email, display_name, is_admin)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (id) DO UPDATE SET
            email = EXCLUDED.email,
            display_name = EXCLUDED.display_name,
            is_admin = admin_users.is_admin OR EXCLUDED.is_admin
         RETURNING *",
    )
    .bind(identity.id)
    .bind(&identity.email)
    .bind(identity.label())
    .bind(bootstrap_admin)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Grant or revoke the admin role.
///
/// # Errors
///
/// Returns `NotFound` if no profile has `id`.
pub async fn set_admin_role(pool: &PgPool, id: Uuid, is_admin: bool) -> Result<AdminUser, StoreError> {
    let row = sqlx::query_as::<_, AdminUser>("UPDATE admin_users SET is_admin = $2 WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(is_admin)
        .fetch_optional(pool)
        .await?;
    found(row, ENTITY, id)
}

/// Whether `id` holds the admin role. Users without a profile do not.
///
/// # Errors
///
/// Returns a store error if the query fails.
pub async fn is_admin(pool: &PgPool, id: Uuid) -> Result<bool, StoreError> {
    let flag = sqlx::query_scalar::<_, bool>("SELECT is_admin FROM admin_users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(flag.unwrap_or(false))
}

/// # Errors
///
/// Returns `NotFound` if no profile has `id`.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM admin_users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    deleted(result.rows_affected(), ENTITY, id)
}

#[cfg(test)]
#[path = "admins_test.rs"]
mod tests;
