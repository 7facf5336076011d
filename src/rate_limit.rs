//! In-memory rate limiting for sign-in attempts.
//!
//! DESIGN
//! ======
//! Sliding-window counters backed by `HashMap<String, VecDeque<Instant>>`.
//! Two limits are enforced, both configured through `SignInLimits`:
//! - Per-email: attempts for one normalized email address
//! - Global: attempts across all addresses
//!
//! Attempts are recorded before the provider is called, so failed and
//! successful sign-ins count the same.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::SignInLimits;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("too many sign-in attempts for this account (max {limit} per {window_secs}s)")]
    PerEmailExceeded { limit: usize, window_secs: u64 },
    #[error("too many sign-in attempts (max {limit} per {window_secs}s)")]
    GlobalExceeded { limit: usize, window_secs: u64 },
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct SignInLimiter {
    inner: Arc<Mutex<LimiterInner>>,
    limits: SignInLimits,
}

#[derive(Default)]
struct LimiterInner {
    by_email: HashMap<String, VecDeque<Instant>>,
    global: VecDeque<Instant>,
}

impl SignInLimiter {
    #[must_use]
    pub fn new(limits: SignInLimits) -> Self {
        Self { inner: Arc::new(Mutex::new(LimiterInner::default())), limits }
    }

    /// Check both limits for `email`, then record the attempt.
    ///
    /// # Errors
    ///
    /// Returns which limit was hit; the attempt is not recorded in that case.
    pub fn check_and_record(&self, email: &str) -> Result<(), RateLimitError> {
        self.check_and_record_at(email, Instant::now())
    }

    pub(crate) fn check_and_record_at(&self, email: &str, now: Instant) -> Result<(), RateLimitError> {
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let inner = &mut *guard;
        let limits = self.limits;

        prune_window(&mut inner.global, now, limits.global_window);
        if inner.global.len() >= limits.global_limit {
            return Err(RateLimitError::GlobalExceeded {
                limit: limits.global_limit,
                window_secs: limits.global_window.as_secs(),
            });
        }

        let attempts = inner.by_email.entry(email.to_owned()).or_default();
        prune_window(attempts, now, limits.per_email_window);
        if attempts.len() >= limits.per_email_limit {
            return Err(RateLimitError::PerEmailExceeded {
                limit: limits.per_email_limit,
                window_secs: limits.per_email_window.as_secs(),
            });
        }

        attempts.push_back(now);
        inner.global.push_back(now);
        // Keep the map from growing with one-off addresses.
        let window = limits.per_email_window;
        inner
            .by_email
            .retain(|_, attempts| attempts.back().is_some_and(|&last| now.duration_since(last) <= window));
        Ok(())
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) > window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
