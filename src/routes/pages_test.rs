use reqwest::StatusCode as HttpStatus;
use uuid::Uuid;

use super::*;
use crate::auth::Identity;
use crate::routes::test_support::{client, spawn_app};
use crate::state::test_helpers;

fn signed_in(display_name: Option<&str>) -> SessionState {
    SessionState {
        user: Some(Identity {
            id: Uuid::new_v4(),
            email: "rn.shaw@mercy.org".into(),
            display_name: display_name.map(str::to_owned),
        }),
        is_loading: false,
        error: None,
    }
}

// =============================================================================
// rendering
// =============================================================================

#[test]
fn escape_covers_markup_characters() {
    assert_eq!(escape(r#"<b>"Tom" & 'Jerry'</b>"#), "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;");
    assert_eq!(escape("plain"), "plain");
}

#[test]
fn screen_shows_user_label_and_endpoint() {
    let html = render_screen(&SCREENS[1], &signed_in(None));
    assert!(html.contains("<title>Patients · Wardboard</title>"));
    assert!(html.contains("rn.shaw"));
    assert!(html.contains(r#"data-endpoint="/api/patients""#));
    assert!(html.contains(r#"<a href="/patients" class="active">Patients</a>"#));
    assert!(!html.contains("{{"));
}

#[test]
fn user_label_is_escaped() {
    let html = render_screen(&SCREENS[0], &signed_in(Some("<script>")));
    assert!(html.contains("&lt;script&gt;"));
    assert!(!html.contains("<div><script>"));
}

#[test]
fn error_page_escapes_message() {
    let html = render_error("provider said <no>");
    assert!(html.contains("provider said &lt;no&gt;"));
}

#[test]
fn every_screen_has_a_unique_path() {
    let mut paths: Vec<_> = SCREENS.iter().map(|s| s.path).collect();
    paths.sort_unstable();
    paths.dedup();
    assert_eq!(paths.len(), SCREENS.len());
}

// =============================================================================
// guarded routes
// =============================================================================

#[tokio::test]
async fn protected_page_redirects_without_session() {
    let (state, _) = test_helpers::test_app_state();
    let base = spawn_app(state).await;

    for path in ["/dashboard", "/patients", "/account"] {
        let resp = client().get(format!("{base}{path}")).send().await.unwrap();
        assert_eq!(resp.status(), HttpStatus::TEMPORARY_REDIRECT, "{path}");
        assert_eq!(resp.headers()["location"], "/sign-in", "{path}");
    }
}

#[tokio::test]
async fn protected_page_renders_for_signed_in_cookie() {
    let (state, provider) = test_helpers::test_app_state();
    let token = test_helpers::signed_in_token(&provider, "rn.shaw@mercy.org").await;
    let base = spawn_app(state).await;

    let resp = client()
        .get(format!("{base}/patients"))
        .header("cookie", format!("session_token={token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), HttpStatus::OK);
    let html = resp.text().await.unwrap();
    assert!(html.contains("rn.shaw"));
}

#[tokio::test]
async fn sign_in_page_redirects_signed_in_session() {
    let (state, provider) = test_helpers::test_app_state();
    let token = test_helpers::signed_in_token(&provider, "rn.shaw@mercy.org").await;
    let base = spawn_app(state).await;

    let resp = client()
        .get(format!("{base}/sign-in"))
        .header("cookie", format!("session_token={token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), HttpStatus::TEMPORARY_REDIRECT);
    assert_eq!(resp.headers()["location"], "/dashboard");
}

#[tokio::test]
async fn sign_up_page_renders_when_signed_out() {
    let (state, _) = test_helpers::test_app_state();
    let base = spawn_app(state).await;

    let resp = client().get(format!("{base}/sign-up")).send().await.unwrap();
    assert_eq!(resp.status(), HttpStatus::OK);
    let html = resp.text().await.unwrap();
    assert!(html.contains(r#"data-endpoint="/api/auth/sign-up""#));
    assert!(html.contains(r#"href="/sign-in""#));
}

#[tokio::test]
async fn stale_cookie_is_treated_as_signed_out() {
    let (state, _) = test_helpers::test_app_state();
    let base = spawn_app(state).await;

    let resp = client()
        .get(format!("{base}/sign-in"))
        .header("cookie", "session_token=expired")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), HttpStatus::OK);
}
