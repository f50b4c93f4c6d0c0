//! # Time Source
//!
//! The item layer only ever needs a monotonic, coarse-grained "now" to
//! compare against `exptime`. Wrapping it behind a trait keeps expiry tests
//! deterministic instead of racing the wall clock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

/// Monotonic relative-time source, expressed in whole seconds.
///
/// `exptime == 0` means "never expires" everywhere this is consumed, so
/// implementations are not required to guarantee `now() > 0`.
pub trait Clock: Send + Sync {
    /// Returns the current relative time in seconds.
    fn now(&self) -> u32;
}

/// Real clock backed by `Instant`, relative to process start.
pub struct MonotonicClock {
    started_at: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            started_at: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        MonotonicClock::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> u32 {
        self.started_at.elapsed().as_secs() as u32
    }
}

/// Test double that returns a caller-controlled time.
///
/// Used by the item-layer tests to exercise lazy expiry (S2, S7) without
/// sleeping.
pub struct ManualClock {
    seconds: AtomicU32,
}

impl ManualClock {
    pub fn new(seconds: u32) -> Self {
        ManualClock {
            seconds: AtomicU32::new(seconds),
        }
    }

    /// Advances (or rewinds) the clock to an absolute value.
    pub fn set(&self, seconds: u32) {
        self.seconds.store(seconds, Ordering::Relaxed);
    }

    /// Advances the clock by a relative amount.
    pub fn advance(&self, delta: u32) {
        self.seconds.fetch_add(delta, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u32 {
        self.seconds.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now(), 100);
        clock.advance(2);
        assert_eq!(clock.now(), 102);
        clock.set(0);
        assert_eq!(clock.now(), 0);
    }
}
