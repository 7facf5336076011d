use time::macros::datetime;

use super::*;
use crate::listing::{ListParams, SortDirection, apply};

fn record(reason: &str, at: OffsetDateTime, status: AppointmentStatus) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        physician_id: Uuid::new_v4(),
        facility_id: None,
        scheduled_at: at,
        duration_minutes: 45,
        reason: reason.into(),
        status,
        notes: None,
        created_at: datetime!(2024-01-01 0:00 UTC),
    }
}

// =============================================================================
// status vocabulary
// =============================================================================

#[test]
fn status_round_trips_through_text() {
    for status in AppointmentStatus::ALL {
        assert_eq!(status.as_str().parse::<AppointmentStatus>().unwrap(), status);
        assert_eq!(AppointmentStatus::try_from(status.to_string()).unwrap(), status);
    }
}

#[test]
fn unknown_status_is_rejected() {
    let err = "rescheduled".parse::<AppointmentStatus>().unwrap_err();
    assert_eq!(err, UnknownStatus { kind: "appointment", value: "rescheduled".into() });
    assert!("Scheduled".parse::<AppointmentStatus>().is_err(), "matching is exact");
}

#[test]
fn status_serializes_snake_case() {
    assert_eq!(serde_json::to_value(AppointmentStatus::NoShow).unwrap(), "no_show");
    let parsed: AppointmentStatus = serde_json::from_str(r#""cancelled""#).unwrap();
    assert_eq!(parsed, AppointmentStatus::Cancelled);
}

// =============================================================================
// request bodies
// =============================================================================

#[test]
fn new_appointment_defaults_duration_and_status() {
    let new: NewAppointment = serde_json::from_value(serde_json::json!({
        "patient_id": Uuid::nil(),
        "physician_id": Uuid::nil(),
        "scheduled_at": "2024-05-01T09:30:00Z",
        "reason": "follow-up",
    }))
    .unwrap();
    assert_eq!(new.duration_minutes, 30);
    assert!(new.status.is_none());
    assert_eq!(new.scheduled_at, datetime!(2024-05-01 9:30 UTC));
}

#[test]
fn filter_accepts_calendar_window() {
    let filter: AppointmentFilter = serde_json::from_value(serde_json::json!({
        "status": "scheduled",
        "from": "2024-05-01T00:00:00Z",
        "to": "2024-05-08T00:00:00Z",
    }))
    .unwrap();
    assert_eq!(filter.status, Some(AppointmentStatus::Scheduled));
    assert_eq!(filter.from, Some(datetime!(2024-05-01 0:00 UTC)));
    assert_eq!(filter.to, Some(datetime!(2024-05-08 0:00 UTC)));
}

#[test]
fn filter_rejects_unknown_status() {
    let parsed = serde_json::from_value::<AppointmentFilter>(serde_json::json!({ "status": "lost" }));
    assert!(parsed.is_err());
}

// =============================================================================
// listing
// =============================================================================

#[test]
fn sort_by_time_descending() {
    let rows = vec![
        record("early", datetime!(2024-05-01 8:00 UTC), AppointmentStatus::Completed),
        record("late", datetime!(2024-05-01 16:00 UTC), AppointmentStatus::Scheduled),
    ];
    let params = ListParams { sort: Some("scheduled_at".into()), dir: SortDirection::Desc, ..ListParams::default() };
    assert_eq!(apply(rows, &params)[0].reason, "late");
}

#[test]
fn search_matches_status_text() {
    let rows = vec![
        record("early", datetime!(2024-05-01 8:00 UTC), AppointmentStatus::NoShow),
        record("late", datetime!(2024-05-01 16:00 UTC), AppointmentStatus::Scheduled),
    ];
    let params = ListParams { q: Some("no_show".into()), ..ListParams::default() };
    assert_eq!(apply(rows, &params)[0].reason, "early");
}

// =============================================================================
// live database
// =============================================================================

#[cfg(feature = "live-db-tests")]
#[tokio::test]
async fn appointment_for_missing_patient_is_rejected() {
    let pool = crate::state::test_helpers::live_pool().await;
    let new = NewAppointment {
        patient_id: Uuid::new_v4(),
        physician_id: Uuid::new_v4(),
        facility_id: None,
        scheduled_at: datetime!(2024-05-01 9:30 UTC),
        duration_minutes: 30,
        reason: "intake".into(),
        status: None,
        notes: None,
    };
    assert!(matches!(create(&pool, &new).await, Err(StoreError::Rejected(_))));
}
