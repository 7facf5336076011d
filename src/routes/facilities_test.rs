use reqwest::StatusCode as HttpStatus;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::routes::test_support::{client, spawn_app};
use crate::state::test_helpers;

#[tokio::test]
async fn negative_bed_count_is_rejected() {
    let (state, provider) = test_helpers::test_app_state();
    let token = test_helpers::signed_in_token(&provider, "ops@mercy.org").await;
    let base = spawn_app(state).await;
    let http = client();

    let resp = http
        .post(format!("{base}/api/facilities/{}/units", Uuid::new_v4()))
        .bearer_auth(&token)
        .json(&json!({ "name": "4 West", "unit_type": "medical", "total_beds": -1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), HttpStatus::UNPROCESSABLE_ENTITY);

    let resp = http
        .patch(format!("{base}/api/units/{}", Uuid::new_v4()))
        .bearer_auth(&token)
        .json(&json!({ "total_beds": -4 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), HttpStatus::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "total_beds must not be negative");
}

#[tokio::test]
async fn blank_facility_name_is_rejected() {
    let (state, provider) = test_helpers::test_app_state();
    let token = test_helpers::signed_in_token(&provider, "ops@mercy.org").await;
    let base = spawn_app(state).await;

    let resp = client()
        .post(format!("{base}/api/facilities"))
        .bearer_auth(&token)
        .json(&json!({ "name": "", "facility_type": "hospital" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), HttpStatus::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "name is required");
}

#[tokio::test]
async fn malformed_id_is_a_bad_request() {
    let (state, provider) = test_helpers::test_app_state();
    let token = test_helpers::signed_in_token(&provider, "ops@mercy.org").await;
    let base = spawn_app(state).await;

    let resp = client()
        .get(format!("{base}/api/facilities/not-a-uuid"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), HttpStatus::BAD_REQUEST);
}
