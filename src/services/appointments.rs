//! Appointments and the calendar range query.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{StoreError, UnknownStatus, deleted, found};
use crate::listing::{Listable, SortValue};

const ENTITY: &str = "appointment";
const DEFAULT_DURATION_MINUTES: i32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [Self; 4] = [Self::Scheduled, Self::Completed, Self::Cancelled, Self::NoShow];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus { kind: ENTITY, value: s.to_owned() })
    }
}

impl TryFrom<String> for AppointmentStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub physician_id: Uuid,
    pub facility_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_at: OffsetDateTime,
    pub duration_minutes: i32,
    pub reason: String,
    #[sqlx(try_from = "String")]
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub physician_id: Uuid,
    pub facility_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_at: OffsetDateTime,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    pub reason: String,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

fn default_duration() -> i32 {
    DEFAULT_DURATION_MINUTES
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentUpdate {
    pub patient_id: Option<Uuid>,
    pub physician_id: Option<Uuid>,
    pub facility_id: Option<Uuid>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
    pub duration_minutes: Option<i32>,
    pub reason: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

/// Equality filters plus a half-open `[from, to)` window on `scheduled_at`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentFilter {
    pub patient_id: Option<Uuid>,
    pub physician_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub from: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub to: Option<OffsetDateTime>,
}

impl Listable for Appointment {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.reason.as_str(), self.status.as_str()];
        fields.extend(self.notes.as_deref());
        fields
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        Some(match key {
            "scheduled_at" => self.scheduled_at.into(),
            "duration_minutes" => self.duration_minutes.into(),
            "reason" => (&self.reason).into(),
            "status" => self.status.as_str().into(),
            "created_at" => self.created_at.into(),
            _ => return None,
        })
    }
}

/// List appointments in calendar order.
///
/// # Errors
///
/// Returns a store error if the query fails.
pub async fn list(pool: &PgPool, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
    let rows = sqlx::query_as::<_, Appointment>(
        "SELECT * FROM appointments
         WHERE ($1::uuid IS NULL OR patient_id = $1)
           AND ($2::uuid IS NULL OR physician_id = $2)
           AND ($3::text IS NULL OR status = $3)
           AND ($4::timestamptz IS NULL OR scheduled_at >= $4)
           AND ($5::timestamptz IS NULL OR scheduled_at < $5)
         ORDER BY scheduled_at",
    )
    .bind(filter.patient_id)
    .bind(filter.physician_id)
    .bind(filter.status.map(AppointmentStatus::as_str))
    .bind(filter.from)
    .bind(filter.to)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns `NotFound` if no appointment has `id`.
pub async fn get(pool: &PgPool, id: Uuid) -> Result<Appointment, StoreError> {
    let row = sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    found(row, ENTITY, id)
}

/// # Errors
///
/// Returns `Rejected` if the patient or physician does not exist.
pub async fn create(pool: &PgPool, new: &NewAppointment) -> Result<Appointment, StoreError> {
    let status = new.status.unwrap_or(AppointmentStatus::Scheduled);
    let row = sqlx::query_as::<_, Appointment>(
        "INSERT INTO appointments
            (id, patient_id, physician_id, facility_id, scheduled_at, duration_minutes, reason, status, notes)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(new.patient_id)
    .bind(new.physician_id)
    .bind(new.facility_id)
    .bind(new.scheduled_at)
    .bind(new.duration_minutes)
    .bind(&new.reason)
    .bind(status.as_str())
    .bind(&new.notes)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns `NotFound` if no appointment has `id`.
pub async fn update(pool: &PgPool, id: Uuid, patch: &AppointmentUpdate) -> Result<Appointment, StoreError> {
    let row = sqlx::query_as::<_, Appointment>(
        "UPDATE appointments SET
            patient_id = COALESCE($2, patient_id),
            physician_id = COALESCE($3, physician_id),
            facility_id = COALESCE($4, facility_id),
            scheduled_at = COALESCE($5, scheduled_at),
            duration_minutes = COALESCE($6, duration_minutes),
            reason = COALESCE($7, reason),
            status = COALESCE($8, status),
            notes = COALESCE($9, notes)
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(patch.patient_id)
    .bind(patch.physician_id)
    .bind(patch.facility_id)
    .bind(patch.scheduled_at)
    .bind(patch.duration_minutes)
    .bind(&patch.reason)
    .bind(patch.status.map(AppointmentStatus::as_str))
    .bind(&patch.notes)
    .fetch_optional(pool)
    .await?;
    found(row, ENTITY, id)
}

/// # Errors
///
/// Returns `NotFound` if no appointment has `id`.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    deleted(result.rows_affected(), ENTITY, id)
}

#[cfg(test)]
#[path = "appointments_test.rs"]
mod tests;
