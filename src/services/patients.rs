//! Patient records.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::{StoreError, deleted, found};
use crate::listing::{Listable, SortValue};

const ENTITY: &str = "patient";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Date,
    pub gender: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Date,
    pub gender: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
}

impl Listable for Patient {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.first_name.as_str(), self.last_name.as_str()];
        fields.extend(self.email.as_deref());
        fields.extend(self.phone.as_deref());
        fields
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        Some(match key {
            "first_name" => (&self.first_name).into(),
            "last_name" => (&self.last_name).into(),
            "date_of_birth" => self.date_of_birth.into(),
            "gender" => (&self.gender).into(),
            "blood_type" => self.blood_type.as_deref().into(),
            "created_at" => self.created_at.into(),
            _ => return None,
        })
    }
}

/// List every patient, newest first.
///
/// # Errors
///
/// Returns a store error if the query fails.
pub async fn list(pool: &PgPool) -> Result<Vec<Patient>, StoreError> {
    let rows = sqlx::query_as::<_, Patient>("SELECT * FROM patients ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns `NotFound` if no patient has `id`.
pub async fn get(pool: &PgPool, id: Uuid) -> Result<Patient, StoreError> {
    let row = sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    found(row, ENTITY, id)
}

/// # Errors
///
/// Returns a store error if the insert is rejected.
pub async fn create(pool: &PgPool, new: &NewPatient) -> Result<Patient, StoreError> {
    let row = sqlx::query_as::<_, Patient>(
        "INSERT INTO patients
            (id, first_name, last_name, date_of_birth, gender, phone, email, address, blood_type)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(new.date_of_birth)
    .bind(&new.gender)
    .bind(&new.phone)
    .bind(&new.email)
    .bind(&new.address)
    .bind(&new.blood_type)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns `NotFound` if no patient has `id`.
pub async fn update(pool: &PgPool, id: Uuid, patch: &PatientUpdate) -> Result<Patient, StoreError> {
    let row = sqlx::query_as::<_, Patient>(
        "UPDATE patients SET
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            date_of_birth = COALESCE($4, date_of_birth),
            gender = COALESCE($5, gender),
            phone = COALESCE($6, phone),
            email = COALESCE($7, email),
            address = COALESCE($8, address),
            blood_type = COALESCE($9, blood_type)
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(&patch.first_name)
    .bind(&patch.last_name)
    .bind(patch.date_of_birth)
    .bind(&patch.gender)
    .bind(&patch.phone)
    .bind(&patch.email)
    .bind(&patch.address)
    .bind(&patch.blood_type)
    .fetch_optional(pool)
    .await?;
    found(row, ENTITY, id)
}

/// # Errors
///
/// Returns `NotFound` if no patient has `id`.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM patients WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    deleted(result.rows_affected(), ENTITY, id)
}

#[cfg(test)]
#[path = "patients_test.rs"]
mod tests;
