//! Data-access wrappers over the managed store.
//!
//! ARCHITECTURE
//! ============
//! One module per entity. Every function issues exactly one statement and
//! maps the row into a plain record; there is no caching, batching, or retry.
//! Optional filters are bound as nullable parameters so the statement text
//! stays fixed. Partial updates use `COALESCE`, so an absent field keeps its
//! stored value.

pub mod admins;
pub mod admissions;
pub mod appointments;
pub mod exams;
pub mod facilities;
pub mod patients;
pub mod physicians;
pub mod reports;

use sqlx::error::ErrorKind;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },
    /// Unique constraint violated; carries the store's message.
    #[error("{0}")]
    Conflict(String),
    /// Foreign-key, not-null, or check constraint violated.
    #[error("{0}")]
    Rejected(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let message = db.message().to_owned();
            match db.kind() {
                ErrorKind::UniqueViolation => return Self::Conflict(message),
                ErrorKind::ForeignKeyViolation | ErrorKind::NotNullViolation | ErrorKind::CheckViolation => {
                    return Self::Rejected(message);
                }
                _ => {}
            }
        }
        Self::Database(err)
    }
}

/// Turn an optional row into `NotFound` for `entity`.
pub(crate) fn found<T>(row: Option<T>, entity: &'static str, id: Uuid) -> Result<T, StoreError> {
    row.ok_or(StoreError::NotFound { entity, id })
}

/// Map a delete's affected-row count to `NotFound` when nothing matched.
pub(crate) fn deleted(rows_affected: u64, entity: &'static str, id: Uuid) -> Result<(), StoreError> {
    if rows_affected == 0 {
        return Err(StoreError::NotFound { entity, id });
    }
    Ok(())
}

/// Status values stored as text and validated at the edge.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown {kind} status: {value:?}")]
pub struct UnknownStatus {
    pub kind: &'static str,
    pub value: String,
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
