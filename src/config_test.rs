use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

// =============================================================================
// parse_bool
// =============================================================================

#[test]
fn parse_bool_true_variants() {
    for val in ["1", "true", "yes", "on", "TRUE", "  On "] {
        assert_eq!(parse_bool(val), Some(true), "expected true for {val:?}");
    }
}

#[test]
fn parse_bool_false_variants() {
    for val in ["0", "false", "no", "off", "False"] {
        assert_eq!(parse_bool(val), Some(false), "expected false for {val:?}");
    }
}

#[test]
fn parse_bool_rejects_garbage() {
    assert_eq!(parse_bool("maybe"), None);
    assert_eq!(parse_bool(""), None);
}

// =============================================================================
// Config::from_lookup
// =============================================================================

#[test]
fn database_url_is_required() {
    let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
    assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
}

#[test]
fn defaults_to_memory_auth_without_auth_url() {
    let config = Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/ward")])).unwrap();
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
    assert_eq!(config.auth, AuthBackend::Memory);
    assert!(!config.cookie_secure);
    assert_eq!(config.sign_in_limits, SignInLimits::default());
    assert!(config.admin_emails.is_empty());
}

#[test]
fn auth_url_selects_gotrue_and_requires_api_key() {
    let err = Config::from_lookup(lookup_from(&[
        ("DATABASE_URL", "postgres://localhost/ward"),
        ("AUTH_URL", "https://project.example.co/"),
    ]))
    .unwrap_err();
    assert_eq!(err, ConfigError::Missing("AUTH_API_KEY"));

    let config = Config::from_lookup(lookup_from(&[
        ("DATABASE_URL", "postgres://localhost/ward"),
        ("AUTH_URL", "https://project.example.co/"),
        ("AUTH_API_KEY", "anon-key"),
    ]))
    .unwrap();
    let AuthBackend::GoTrue(gotrue) = &config.auth else {
        panic!("expected gotrue backend");
    };
    assert_eq!(gotrue.url, "https://project.example.co");
    assert_eq!(gotrue.api_key, "anon-key");
    assert_eq!(gotrue.timeout_secs, DEFAULT_AUTH_TIMEOUT_SECS);
    assert!(config.cookie_secure, "https auth url should imply secure cookies");
}

#[test]
fn explicit_memory_provider_wins_over_auth_url() {
    let config = Config::from_lookup(lookup_from(&[
        ("DATABASE_URL", "postgres://localhost/ward"),
        ("AUTH_URL", "http://localhost:9999"),
        ("AUTH_PROVIDER", "Memory"),
    ]))
    .unwrap();
    assert_eq!(config.auth, AuthBackend::Memory);
}

#[test]
fn unknown_provider_is_rejected() {
    let err = Config::from_lookup(lookup_from(&[
        ("DATABASE_URL", "postgres://localhost/ward"),
        ("AUTH_PROVIDER", "ldap"),
    ]))
    .unwrap_err();
    assert_eq!(err, ConfigError::UnknownAuthProvider("ldap".into()));
}

#[test]
fn invalid_number_reports_key_and_value() {
    let err = Config::from_lookup(lookup_from(&[
        ("DATABASE_URL", "postgres://localhost/ward"),
        ("PORT", "eighty"),
    ]))
    .unwrap_err();
    assert_eq!(err, ConfigError::Invalid { key: "PORT", value: "eighty".into() });
}

#[test]
fn cookie_secure_override_and_timeouts() {
    let config = Config::from_lookup(lookup_from(&[
        ("DATABASE_URL", "postgres://localhost/ward"),
        ("COOKIE_SECURE", "yes"),
        ("SESSION_SETTLE_TIMEOUT_MS", "250"),
        ("SESSION_CELL_MAX_AGE_SECS", "30"),
        ("SIGN_IN_RATE_LIMIT", "3"),
    ]))
    .unwrap();
    assert!(config.cookie_secure);
    assert_eq!(config.sessions.settle_timeout, Duration::from_millis(250));
    assert_eq!(config.sessions.cell_max_age, Duration::from_secs(30));
    assert_eq!(config.sign_in_limits.per_email_limit, 3);
}

#[test]
fn admin_emails_are_split_and_normalized() {
    let config = Config::from_lookup(lookup_from(&[
        ("DATABASE_URL", "postgres://localhost/ward"),
        ("ADMIN_EMAILS", " Chief@Hospital.org, ,ops@hospital.org "),
    ]))
    .unwrap();
    assert_eq!(config.admin_emails, vec!["chief@hospital.org".to_owned(), "ops@hospital.org".to_owned()]);
}
