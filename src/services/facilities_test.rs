use time::macros::datetime;

use super::*;
use crate::listing::{ListParams, SortDirection, apply};

fn unit(name: &str, beds: i32, floor: Option<i32>) -> FacilityUnit {
    FacilityUnit {
        id: Uuid::new_v4(),
        facility_id: Uuid::nil(),
        name: name.into(),
        unit_type: "medical".into(),
        total_beds: beds,
        floor,
        phone: None,
        created_at: datetime!(2023-09-01 0:00 UTC),
    }
}

#[test]
fn new_unit_defaults_to_zero_beds() {
    let new: NewUnit = serde_json::from_str(r#"{"name":"ICU","unit_type":"critical care"}"#).unwrap();
    assert_eq!(new.total_beds, 0);
    assert!(new.floor.is_none());
}

#[test]
fn units_sort_by_beds_descending() {
    let rows = vec![unit("4 West", 20, Some(4)), unit("ICU", 12, Some(2)), unit("Annex", 32, None)];
    let params = ListParams { sort: Some("total_beds".into()), dir: SortDirection::Desc, ..ListParams::default() };
    let names: Vec<_> = apply(rows, &params).into_iter().map(|u| u.name).collect();
    assert_eq!(names, vec!["Annex", "4 West", "ICU"]);
}

#[test]
fn units_without_floor_sort_first_ascending() {
    let rows = vec![unit("4 West", 20, Some(4)), unit("Annex", 32, None)];
    let params = ListParams { sort: Some("floor".into()), ..ListParams::default() };
    assert_eq!(apply(rows, &params)[0].name, "Annex");
}

#[test]
fn facility_search_covers_address() {
    let rows = vec![Facility {
        id: Uuid::new_v4(),
        name: "Mercy General".into(),
        facility_type: "hospital".into(),
        address: Some("12 Harbor Rd".into()),
        phone: None,
        created_at: datetime!(2023-09-01 0:00 UTC),
    }];
    let params = ListParams { q: Some("harbor".into()), ..ListParams::default() };
    assert_eq!(apply(rows, &params).len(), 1);
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
async fn negative_beds_are_rejected_by_the_store() {
    let pool = crate::state::test_helpers::live_pool().await;
    let facility = create(
        &pool,
        &NewFacility { name: "Bayside Clinic".into(), facility_type: "clinic".into(), address: None, phone: None },
    )
    .await
    .unwrap();

    let bad = NewUnit { name: "Broken".into(), unit_type: "x".into(), total_beds: -1, floor: None, phone: None };
    assert!(matches!(create_unit(&pool, facility.id, &bad).await, Err(StoreError::Rejected(_))));

    let good = NewUnit { name: "Ward A".into(), unit_type: "medical".into(), total_beds: 8, floor: Some(1), phone: None };
    let unit = create_unit(&pool, facility.id, &good).await.unwrap();
    assert_eq!(list_units(&pool, facility.id).await.unwrap(), vec![unit.clone()]);

    delete(&pool, facility.id).await.unwrap();
    assert!(matches!(get_unit(&pool, unit.id).await, Err(StoreError::NotFound { .. })));
}
