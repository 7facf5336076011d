use reqwest::StatusCode as HttpStatus;

use crate::routes::test_support::{client, spawn_app};
use crate::state::test_helpers;

#[tokio::test]
async fn appointment_mix_rejects_inverted_window() {
    let (state, provider) = test_helpers::test_app_state();
    let token = test_helpers::signed_in_token(&provider, "chief@mercy.org").await;
    let base = spawn_app(state).await;

    let resp = client()
        .get(format!("{base}/api/reports/appointments?from=2026-03-01T00:00:00Z&to=2026-03-01T00:00:00Z"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), HttpStatus::UNPROCESSABLE_ENTITY);
}
