//! Diagnostic exams ordered for patients.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{StoreError, UnknownStatus, deleted, found};
use crate::listing::{Listable, SortValue};

const ENTITY: &str = "exam";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamStatus {
    Ordered,
    InProgress,
    Completed,
    Cancelled,
}

impl ExamStatus {
    pub const ALL: [Self; 4] = [Self::Ordered, Self::InProgress, Self::Completed, Self::Cancelled];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ordered => "ordered",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Still waiting on a result.
    #[must_use]
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Ordered | Self::InProgress)
    }
}

impl fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExamStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus { kind: ENTITY, value: s.to_owned() })
    }
}

impl TryFrom<String> for ExamStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Exam {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub physician_id: Option<Uuid>,
    pub admission_id: Option<Uuid>,
    pub exam_type: String,
    #[sqlx(try_from = "String")]
    pub status: ExamStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub ordered_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub performed_at: Option<OffsetDateTime>,
    pub result: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewExam {
    pub patient_id: Uuid,
    pub physician_id: Option<Uuid>,
    pub admission_id: Option<Uuid>,
    pub exam_type: String,
    pub status: Option<ExamStatus>,
    /// Defaults to now.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub ordered_at: Option<OffsetDateTime>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExamUpdate {
    pub physician_id: Option<Uuid>,
    pub admission_id: Option<Uuid>,
    pub exam_type: Option<String>,
    pub status: Option<ExamStatus>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub performed_at: Option<OffsetDateTime>,
    pub result: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExamFilter {
    pub patient_id: Option<Uuid>,
    pub admission_id: Option<Uuid>,
    pub status: Option<ExamStatus>,
}

impl Listable for Exam {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.exam_type.as_str(), self.status.as_str()];
        fields.extend(self.result.as_deref());
        fields.extend(self.notes.as_deref());
        fields
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        Some(match key {
            "exam_type" => (&self.exam_type).into(),
            "status" => self.status.as_str().into(),
            "ordered_at" => self.ordered_at.into(),
            "performed_at" => self.performed_at.into(),
            _ => return None,
        })
    }
}

/// # Errors
///
/// Returns a store error if the query fails.
pub async fn list(pool: &PgPool, filter: &ExamFilter) -> Result<Vec<Exam>, StoreError> {
    let rows = sqlx::query_as::<_, Exam>(
        "SELECT * FROM exams
         WHERE ($1::uuid IS NULL OR patient_id = $1)
           AND ($2::uuid IS NULL OR admission_id = $2)
           AND ($3::text IS NULL OR status = $3)
         ORDER BY ordered_at DESC",
    )
    .bind(filter.patient_id)
    .bind(filter.admission_id)
    .bind(filter.status.map(ExamStatus::as_str))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns `NotFound` if no exam has `id`.
pub async fn get(pool: &PgPool, id: Uuid) -> Result<Exam, StoreError> {
    let row = sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    found(row, ENTITY, id)
}

/// # Errors
///
/// Returns `Rejected` if a referenced patient, physician, or admission does not exist.
pub async fn create(pool: &PgPool, new: &NewExam) -> Result<Exam, StoreError> {
    let status = new.status.unwrap_or(ExamStatus::Ordered);
    let row = sqlx::query_as::<_, Exam>(
        "INSERT INTO exams
            (id, patient_id, physician_id, admission_id, exam_type, status, ordered_at, notes)
         VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, now()), $8)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(new.patient_id)
    .bind(new.physician_id)
    .bind(new.admission_id)
    .bind(&new.exam_type)
    .bind(status.as_str())
    .bind(new.ordered_at)
    .bind(&new.notes)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns `NotFound` if no exam has `id`.
pub async fn update(pool: &PgPool, id: Uuid, patch: &ExamUpdate) -> Result<Exam, StoreError> {
    let row = sqlx::query_as::<_, Exam>(
        "UPDATE exams SET
            physician_id = COALESCE($2, physician_id),
            admission_id = COALESCE($3, admission_id),
            exam_type = COALESCE($4, exam_type),
            status = COALESCE($5, status),
            performed_at = COALESCE($6, performed_at),
            result = COALESCE($7, result),
            notes = COALESCE($8, notes)
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(patch.physician_id)
    .bind(patch.admission_id)
    .bind(&patch.exam_type)
    .bind(patch.status.map(ExamStatus::as_str))
    .bind(patch.performed_at)
    .bind(&patch.result)
    .bind(&patch.notes)
    .fetch_optional(pool)
    .await?;
    found(row, ENTITY, id)
}

/// # Errors
///
/// Returns `NotFound` if no exam has `id`.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM exams WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    deleted(result.rows_affected(), ENTITY, id)
}

#[cfg(test)]
#[path = "exams_test.rs"]
mod tests;
