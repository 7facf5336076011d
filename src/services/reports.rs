//! Aggregate queries behind the reporting views.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::StoreError;
use super::appointments::AppointmentStatus;
use crate::listing::{Listable, SortValue};

/// Headline counts for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Summary {
    pub patients: i64,
    pub active_physicians: i64,
    pub active_admissions: i64,
    pub upcoming_appointments: i64,
    pub pending_exams: i64,
    pub facilities: i64,
}

/// Beds against active admissions for one unit. Serializes with the derived
/// `available_beds` and `occupancy_percent` alongside the stored columns.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UnitOccupancy {
    pub unit_id: Uuid,
    pub unit_name: String,
    pub facility_id: Uuid,
    pub facility_name: String,
    pub total_beds: i32,
    pub occupied_beds: i64,
}

impl UnitOccupancy {
    /// Beds not taken by an active admission; negative when over capacity.
    #[must_use]
    pub fn available_beds(&self) -> i64 {
        i64::from(self.total_beds) - self.occupied_beds
    }

    /// Occupied share of beds in whole percent, `None` for a unit without beds.
    #[must_use]
    pub fn occupancy_percent(&self) -> Option<i64> {
        (self.total_beds > 0).then(|| self.occupied_beds * 100 / i64::from(self.total_beds))
    }
}

impl Serialize for UnitOccupancy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut row = serializer.serialize_struct("UnitOccupancy", 8)?;
        row.serialize_field("unit_id", &self.unit_id)?;
        row.serialize_field("unit_name", &self.unit_name)?;
        row.serialize_field("facility_id", &self.facility_id)?;
        row.serialize_field("facility_name", &self.facility_name)?;
        row.serialize_field("total_beds", &self.total_beds)?;
        row.serialize_field("occupied_beds", &self.occupied_beds)?;
        row.serialize_field("available_beds", &self.available_beds())?;
        row.serialize_field("occupancy_percent", &self.occupancy_percent())?;
        row.end()
    }
}

impl Listable for UnitOccupancy {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.unit_name.as_str(), self.facility_name.as_str()]
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        Some(match key {
            "unit_name" => (&self.unit_name).into(),
            "facility_name" => (&self.facility_name).into(),
            "total_beds" => self.total_beds.into(),
            "occupied_beds" => self.occupied_beds.into(),
            "available_beds" => self.available_beds().into(),
            "occupancy_percent" => self.occupancy_percent().into(),
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OccupancyFilter {
    pub facility_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    #[sqlx(try_from = "String")]
    pub status: AppointmentStatus,
    pub count: i64,
}

/// Optional `[from, to)` window on `scheduled_at`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Window {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub from: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub to: Option<OffsetDateTime>,
}

/// # Errors
///
/// Returns a store error if the query fails.
pub async fn summary(pool: &PgPool) -> Result<Summary, StoreError> {
    let row = sqlx::query_as::<_, Summary>(
        "SELECT
            (SELECT count(*) FROM patients) AS patients,
            (SELECT count(*) FROM physicians WHERE is_active) AS active_physicians,
            (SELECT count(*) FROM admissions WHERE discharged_at IS NULL) AS active_admissions,
            (SELECT count(*) FROM appointments
              WHERE status = 'scheduled' AND scheduled_at >= now()) AS upcoming_appointments,
            (SELECT count(*) FROM exams WHERE status IN ('ordered', 'in_progress')) AS pending_exams,
            (SELECT count(*) FROM facilities) AS facilities",
    )
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns a store error if the query fails.
pub async fn occupancy(pool: &PgPool, filter: &OccupancyFilter) -> Result<Vec<UnitOccupancy>, StoreError> {
    let rows = sqlx::query_as::<_, UnitOccupancy>(
        "SELECT u.id AS unit_id, u.name AS unit_name, f.id AS facility_id, f.name AS facility_name,
                u.total_beds, count(a.id) AS occupied_beds
         FROM facility_units u
         JOIN facilities f ON f.id = u.facility_id
         LEFT JOIN admissions a ON a.facility_unit_id = u.id AND a.discharged_at IS NULL
         WHERE ($1::uuid IS NULL OR u.facility_id = $1)
         GROUP BY u.id, f.id
         ORDER BY f.name, u.name",
    )
    .bind(filter.facility_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Appointment counts per status; statuses with no appointments are omitted.
///
/// # Errors
///
/// Returns a store error if the query fails.
pub async fn appointment_status_counts(pool: &PgPool, window: &Window) -> Result<Vec<StatusCount>, StoreError> {
    let rows = sqlx::query_as::<_, StatusCount>(
        "SELECT status, count(*) AS count
         FROM appointments
         WHERE ($1::timestamptz IS NULL OR scheduled_at >= $1)
           AND ($2::timestamptz IS NULL OR scheduled_at < $2)
         GROUP BY status
         ORDER BY status",
    )
    .bind(window.from)
    .bind(window.to)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
#[path = "reports_test.rs"]
mod tests;
