use super::*;

#[tokio::test]
async fn new_state_starts_with_no_session_cells() {
    let (state, _) = test_helpers::test_app_state();
    assert_eq!(state.sessions.len().await, 0);
    assert!(!state.cookie_secure);
}

#[tokio::test]
async fn bootstrap_admin_match_ignores_case_and_whitespace() {
    let (state, _) = test_helpers::test_app_state();
    assert!(state.is_bootstrap_admin("chief@mercy.org"));
    assert!(state.is_bootstrap_admin(" Chief@Mercy.org "));
    assert!(!state.is_bootstrap_admin("intern@mercy.org"));
}

#[tokio::test]
async fn clones_share_the_session_registry() {
    let (state, provider) = test_helpers::test_app_state();
    let token = test_helpers::signed_in_token(&provider, "desk@mercy.org").await;

    let other = state.clone();
    assert!(state.sessions.resolve(&token).await.is_signed_in());
    assert_eq!(other.sessions.len().await, 1);
}
