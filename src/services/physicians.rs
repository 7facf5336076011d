//! Physician roster.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{StoreError, deleted, found};
use crate::listing::{Listable, SortValue};

const ENTITY: &str = "physician";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Physician {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub specialty: String,
    pub license_number: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub facility_id: Option<Uuid>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPhysician {
    pub first_name: String,
    pub last_name: String,
    pub specialty: String,
    pub license_number: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub facility_id: Option<Uuid>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhysicianUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub facility_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

/// Equality filters for the roster.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhysicianFilter {
    pub facility_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

impl Listable for Physician {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.specialty.as_str(),
            self.license_number.as_str(),
        ];
        fields.extend(self.email.as_deref());
        fields
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        Some(match key {
            "first_name" => (&self.first_name).into(),
            "last_name" => (&self.last_name).into(),
            "specialty" => (&self.specialty).into(),
            "license_number" => (&self.license_number).into(),
            "is_active" => self.is_active.into(),
            "created_at" => self.created_at.into(),
            _ => return None,
        })
    }
}

/// # Errors
///
/// Returns a store error if the query fails.
pub async fn list(pool: &PgPool, filter: &PhysicianFilter) -> Result<Vec<Physician>, StoreError> {
    let rows = sqlx::query_as::<_, Physician>(
        "SELECT * FROM physicians
         WHERE ($1::uuid IS NULL OR facility_id = $1)
           AND ($2::boolean IS NULL OR is_active = $2)
         ORDER BY last_name, first_name",
    )
    .bind(filter.facility_id)
    .bind(filter.is_active)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns `NotFound` if no physician has `id`.
pub async fn get(pool: &PgPool, id: Uuid) -> Result<Physician, StoreError> {
    let row = sqlx::query_as::<_, Physician>("SELECT * FROM physicians WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    found(row, ENTITY, id)
}

/// # Errors
///
/// Returns `Conflict` if the license number is already on file.
pub async fn create(pool: &PgPool, new: &NewPhysician) -> Result<Physician, StoreError> {
    let row = sqlx::query_as::<_, Physician>(
        "INSERT INTO physicians
            (id, first_name, last_name, specialty, license_number, phone, email, facility_id, is_active)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(&new.specialty)
    .bind(&new.license_number)
    .bind(&new.phone)
    .bind(&new.email)
    .bind(new.facility_id)
    .bind(new.is_active)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns `NotFound` if no physician has `id`, `Conflict` on a duplicate license.
pub async fn update(pool: &PgPool, id: Uuid, patch: &PhysicianUpdate) -> Result<Physician, StoreError> {
    let row = sqlx::query_as::<_, Physician>(
        "UPDATE physicians SET
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            specialty = COALESCE($4, specialty),
            license_number = COALESCE($5, license_number),
            phone = COALESCE($6, phone),
            email = COALESCE($7, email),
            facility_id = COALESCE($8, facility_id),
            is_active = COALESCE($9, is_active)
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(&patch.first_name)
    .bind(&patch.last_name)
    .bind(&patch.specialty)
    .bind(&patch.license_number)
    .bind(&patch.phone)
    .bind(&patch.email)
    .bind(patch.facility_id)
    .bind(patch.is_active)
    .fetch_optional(pool)
    .await?;
    found(row, ENTITY, id)
}

/// # Errors
///
/// Returns `NotFound` if no physician has `id`.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM physicians WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    deleted(result.rows_affected(), ENTITY, id)
}

#[cfg(test)]
#[path = "physicians_test.rs"]
mod tests;
