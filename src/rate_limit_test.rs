use super::*;

fn limits(per_email: usize, global: usize) -> SignInLimits {
    SignInLimits {
        per_email_limit: per_email,
        per_email_window: Duration::from_secs(60),
        global_limit: global,
        global_window: Duration::from_secs(60),
    }
}

#[test]
fn per_email_allows_up_to_limit() {
    let rl = SignInLimiter::new(limits(3, 100));
    let now = Instant::now();

    for i in 0..3 {
        assert!(rl.check_and_record_at("a@mercy.org", now).is_ok(), "attempt {i} should succeed");
    }
    assert_eq!(
        rl.check_and_record_at("a@mercy.org", now),
        Err(RateLimitError::PerEmailExceeded { limit: 3, window_secs: 60 })
    );
    assert!(rl.check_and_record_at("b@mercy.org", now).is_ok(), "other emails are unaffected");
}

#[test]
fn global_allows_up_to_limit() {
    let rl = SignInLimiter::new(limits(10, 4));
    let now = Instant::now();

    for i in 0..4 {
        assert!(rl.check_and_record_at(&format!("user{i}@mercy.org"), now).is_ok());
    }
    assert!(matches!(
        rl.check_and_record_at("late@mercy.org", now),
        Err(RateLimitError::GlobalExceeded { limit: 4, .. })
    ));
}

#[test]
fn window_expiry_allows_new_attempts() {
    let rl = SignInLimiter::new(limits(2, 100));
    let start = Instant::now();

    rl.check_and_record_at("a@mercy.org", start).unwrap();
    rl.check_and_record_at("a@mercy.org", start).unwrap();
    assert!(rl.check_and_record_at("a@mercy.org", start).is_err());

    let later = start + Duration::from_secs(61);
    assert!(rl.check_and_record_at("a@mercy.org", later).is_ok());
}

#[test]
fn rejected_attempts_are_not_recorded() {
    let rl = SignInLimiter::new(limits(1, 100));
    let start = Instant::now();

    rl.check_and_record_at("a@mercy.org", start).unwrap();
    for _ in 0..5 {
        assert!(rl.check_and_record_at("a@mercy.org", start).is_err());
    }
    // Only the first attempt occupies the window.
    assert!(rl.check_and_record_at("a@mercy.org", start + Duration::from_secs(61)).is_ok());
}

#[test]
fn idle_emails_are_evicted() {
    let rl = SignInLimiter::new(limits(5, 100));
    let start = Instant::now();
    rl.check_and_record_at("once@mercy.org", start).unwrap();

    rl.check_and_record_at("later@mercy.org", start + Duration::from_secs(120)).unwrap();
    let inner = rl.inner.lock().unwrap();
    assert!(!inner.by_email.contains_key("once@mercy.org"));
    assert!(inner.by_email.contains_key("later@mercy.org"));
}

#[test]
fn clones_share_counters() {
    let rl = SignInLimiter::new(limits(1, 100));
    let other = rl.clone();
    let now = Instant::now();

    rl.check_and_record_at("a@mercy.org", now).unwrap();
    assert!(other.check_and_record_at("a@mercy.org", now).is_err());
}
