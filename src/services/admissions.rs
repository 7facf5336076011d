//! Inpatient admissions.
//!
//! An admission is active until `discharged_at` is set. Discharge is a single
//! conditional update, so discharging twice reports `NotFound` the second time.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{StoreError, deleted, found};
use crate::listing::{Listable, SortValue};

const ENTITY: &str = "admission";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Admission {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub facility_unit_id: Uuid,
    pub attending_physician_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub admitted_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub discharged_at: Option<OffsetDateTime>,
    pub reason: String,
    pub bed_number: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Admission {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.discharged_at.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAdmission {
    pub patient_id: Uuid,
    pub facility_unit_id: Uuid,
    pub attending_physician_id: Option<Uuid>,
    /// Defaults to now.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub admitted_at: Option<OffsetDateTime>,
    pub reason: String,
    pub bed_number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdmissionUpdate {
    pub facility_unit_id: Option<Uuid>,
    pub attending_physician_id: Option<Uuid>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub admitted_at: Option<OffsetDateTime>,
    pub reason: Option<String>,
    pub bed_number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Discharge {
    /// Defaults to now.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub discharged_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdmissionFilter {
    pub patient_id: Option<Uuid>,
    pub facility_unit_id: Option<Uuid>,
    /// Only admissions that have not been discharged.
    #[serde(default)]
    pub active: bool,
}

impl Listable for Admission {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.reason.as_str()];
        fields.extend(self.bed_number.as_deref());
        fields
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        Some(match key {
            "admitted_at" => self.admitted_at.into(),
            "discharged_at" => self.discharged_at.into(),
            "reason" => (&self.reason).into(),
            "bed_number" => self.bed_number.as_deref().into(),
            "created_at" => self.created_at.into(),
            _ => return None,
        })
    }
}

/// List admissions, most recent first.
///
/// # Errors
///
/// Returns a store error if the query fails.
pub async fn list(pool: &PgPool, filter: &AdmissionFilter) -> Result<Vec<Admission>, StoreError> {
    let rows = sqlx::query_as::<_, Admission>(
        "SELECT * FROM admissions
         WHERE ($1::uuid IS NULL OR patient_id = $1)
           AND ($2::uuid IS NULL OR facility_unit_id = $2)
           AND (NOT $3 OR discharged_at IS NULL)
         ORDER BY admitted_at DESC",
    )
    .bind(filter.patient_id)
    .bind(filter.facility_unit_id)
    .bind(filter.active)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns `NotFound` if no admission has `id`.
pub async fn get(pool: &PgPool, id: Uuid) -> Result<Admission, StoreError> {
    let row = sqlx::query_as::<_, Admission>("SELECT * FROM admissions WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    found(row, ENTITY, id)
}

/// Admit a patient to a unit.
///
/// # Errors
///
/// Returns `Rejected` if the patient, unit, or physician does not exist.
pub async fn admit(pool: &PgPool, new: &NewAdmission) -> Result<Admission, StoreError> {
    let row = sqlx::query_as::<_, Admission>(
        "INSERT INTO admissions
            (id, patient_id, facility_unit_id, attending_physician_id, admitted_at, reason, bed_number)
         VALUES ($1, $2, $3, $4, COALESCE($5, now()), $6, $7)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(new.patient_id)
    .bind(new.facility_unit_id)
    .bind(new.attending_physician_id)
    .bind(new.admitted_at)
    .bind(&new.reason)
    .bind(&new.bed_number)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns `NotFound` if no admission has `id`.
pub async fn update(pool: &PgPool, id: Uuid, patch: &AdmissionUpdate) -> Result<Admission, StoreError> {
    let row = sqlx::query_as::<_, Admission>(
        "UPDATE admissions SET
            facility_unit_id = COALESCE($2, facility_unit_id),
            attending_physician_id = COALESCE($3, attending_physician_id),
            admitted_at = COALESCE($4, admitted_at),
            reason = COALESCE($5, reason),
            bed_number = COALESCE($6, bed_number)
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(patch.facility_unit_id)
    .bind(patch.attending_physician_id)
    .bind(patch.admitted_at)
    .bind(&patch.reason)
    .bind(&patch.bed_number)
    .fetch_optional(pool)
    .await?;
    found(row, ENTITY, id)
}

/// Set `discharged_at` on an active admission.
///
/// # Errors
///
/// Returns `NotFound` if no active admission has `id`.
pub async fn discharge(pool: &PgPool, id: Uuid, discharge: &Discharge) -> Result<Admission, StoreError> {
    let row = sqlx::query_as::<_, Admission>(
        "UPDATE admissions SET discharged_at = COALESCE($2, now())
         WHERE id = $1 AND discharged_at IS NULL
         RETURNING *",
    )
    .bind(id)
    .bind(discharge.discharged_at)
    .fetch_optional(pool)
    .await?;
    found(row, ENTITY, id)
}

/// # Errors
///
/// Returns `NotFound` if no admission has `id`.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM admissions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    deleted(result.rows_affected(), ENTITY, id)
}

#[cfg(test)]
#[path = "admissions_test.rs"]
mod tests;
