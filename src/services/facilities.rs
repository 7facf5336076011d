//! Facilities and their units.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{StoreError, deleted, found};
use crate::listing::{Listable, SortValue};

const FACILITY: &str = "facility";
const UNIT: &str = "facility unit";

// =============================================================================
// FACILITIES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Facility {
    pub id: Uuid,
    pub name: String,
    pub facility_type: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFacility {
    pub name: String,
    pub facility_type: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacilityUpdate {
    pub name: Option<String>,
    pub facility_type: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl Listable for Facility {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str(), self.facility_type.as_str()];
        fields.extend(self.address.as_deref());
        fields
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        Some(match key {
            "name" => (&self.name).into(),
            "facility_type" => (&self.facility_type).into(),
            "created_at" => self.created_at.into(),
            _ => return None,
        })
    }
}

/// # Errors
///
/// Returns a store error if the query fails.
pub async fn list(pool: &PgPool) -> Result<Vec<Facility>, StoreError> {
    let rows = sqlx::query_as::<_, Facility>("SELECT * FROM facilities ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns `NotFound` if no facility has `id`.
pub async fn get(pool: &PgPool, id: Uuid) -> Result<Facility, StoreError> {
    let row = sqlx::query_as::<_, Facility>("SELECT * FROM facilities WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    found(row, FACILITY, id)
}

/// # Errors
///
/// Returns a store error if the insert is rejected.
pub async fn create(pool: &PgPool, new: &NewFacility) -> Result<Facility, StoreError> {
    let row = sqlx::query_as::<_, Facility>(
        "INSERT INTO facilities (id, name, facility_type, address, phone)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&new.name)
    .bind(&new.facility_type)
    .bind(&new.address)
    .bind(&new.phone)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns `NotFound` if no facility has `id`.
pub async fn update(pool: &PgPool, id: Uuid, patch: &FacilityUpdate) -> Result<Facility, StoreError> {
    let row = sqlx::query_as::<_, Facility>(
        "UPDATE facilities SET
            name = COALESCE($2, name),
            facility_type = COALESCE($3, facility_type),
            address = COALESCE($4, address),
            phone = COALESCE($5, phone)
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(&patch.name)
    .bind(&patch.facility_type)
    .bind(&patch.address)
    .bind(&patch.phone)
    .fetch_optional(pool)
    .await?;
    found(row, FACILITY, id)
}

/// Delete a facility; its units go with it.
///
/// # Errors
///
/// Returns `NotFound` if no facility has `id`.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM facilities WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    deleted(result.rows_affected(), FACILITY, id)
}

// =============================================================================
// UNITS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct FacilityUnit {
    pub id: Uuid,
    pub facility_id: Uuid,
    pub name: String,
    pub unit_type: String,
    pub total_beds: i32,
    pub floor: Option<i32>,
    pub phone: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUnit {
    pub name: String,
    pub unit_type: String,
    #[serde(default)]
    pub total_beds: i32,
    pub floor: Option<i32>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitUpdate {
    pub name: Option<String>,
    pub unit_type: Option<String>,
    pub total_beds: Option<i32>,
    pub floor: Option<i32>,
    pub phone: Option<String>,
}

impl Listable for FacilityUnit {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.unit_type.as_str()]
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        Some(match key {
            "name" => (&self.name).into(),
            "unit_type" => (&self.unit_type).into(),
            "total_beds" => self.total_beds.into(),
            "floor" => self.floor.into(),
            "created_at" => self.created_at.into(),
            _ => return None,
        })
    }
}

/// List the units of one facility.
///
/// # Errors
///
/// Returns a store error if the query fails.
pub async fn list_units(pool: &PgPool, facility_id: Uuid) -> Result<Vec<FacilityUnit>, StoreError> {
    let rows = sqlx::query_as::<_, FacilityUnit>(
        "SELECT * FROM facility_units WHERE facility_id = $1 ORDER BY floor NULLS LAST, name",
    )
    .bind(facility_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns `NotFound` if no unit has `id`.
pub async fn get_unit(pool: &PgPool, id: Uuid) -> Result<FacilityUnit, StoreError> {
    let row = sqlx::query_as::<_, FacilityUnit>("SELECT * FROM facility_units WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    found(row, UNIT, id)
}

/// # Errors
///
/// Returns `Rejected` if the facility does not exist or `total_beds` is negative.
pub async fn create_unit(pool: &PgPool, facility_id: Uuid, new: &NewUnit) -> Result<FacilityUnit, StoreError> {
    let row = sqlx::query_as::<_, FacilityUnit>(
        "INSERT INTO facility_units (id, facility_id, name, unit_type, total_beds, floor, phone)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(facility_id)
    .bind(&new.name)
    .bind(&new.unit_type)
    .bind(new.total_beds)
    .bind(new.floor)
    .bind(&new.phone)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns `NotFound` if no unit has `id`.
pub async fn update_unit(pool: &PgPool, id: Uuid, patch: &UnitUpdate) -> Result<FacilityUnit, StoreError> {
    let row = sqlx::query_as::<_, FacilityUnit>(
        "UPDATE facility_units SET
            name = COALESCE($2, name),
            unit_type = COALESCE($3, unit_type),
            total_beds = COALESCE($4, total_beds),
            floor = COALESCE($5, floor),
            phone = COALESCE($6, phone)
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(&patch.name)
    .bind(&patch.unit_type)
    .bind(patch.total_beds)
    .bind(patch.floor)
    .bind(&patch.phone)
    .fetch_optional(pool)
    .await?;
    found(row, UNIT, id)
}

/// # Errors
///
/// Returns `NotFound` if no unit has `id`.
pub async fn delete_unit(pool: &PgPool, id: Uuid) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM facility_units WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    deleted(result.rows_affected(), UNIT, id)
}

#[cfg(test)]
#[path = "facilities_test.rs"]
mod tests;
