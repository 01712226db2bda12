//! Bundle freshness window and the clock it is measured against.
//!
//! A bundle is fresh when its generation time lies within
//! [`FRESHNESS_WINDOW_SECS`] of the current time in either direction,
//! boundaries included. Stale bundles read as not found.

use std::sync::atomic::{AtomicI64, Ordering};

/// Two hours.
pub const FRESHNESS_WINDOW_SECS: i64 = 2 * 60 * 60;

/// Whether a record generated at `generated_at` is fresh at `now`.
///
/// Both arguments are Unix seconds.
#[must_use]
pub fn is_fresh(generated_at: i64, now: i64) -> bool {
    let earliest = now.saturating_sub(FRESHNESS_WINDOW_SECS);
    let latest = now.saturating_add(FRESHNESS_WINDOW_SECS);
    (earliest..=latest).contains(&generated_at)
}

/// A source of the current time in Unix seconds.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A settable clock for tests and local tooling.
#[derive(Debug, Default)]
pub struct FixedClock(AtomicI64);

impl FixedClock {
    #[must_use]
    pub fn new(now: i64) -> Self {
        Self(AtomicI64::new(now))
    }

    pub fn set(&self, now: i64) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}
