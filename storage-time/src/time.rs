//! Time source and slot-window arithmetic.
//!
//! Timestamps are milliseconds since the Unix epoch; slot lengths and
//! delay tolerances are whole seconds. Window checks truncate milliseconds
//! to seconds before comparing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Wall-clock capability.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// [`Clock`] reading the system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    /// On error (system clock before epoch) this falls back to 0.
    fn now_ms(&self) -> u64 {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| Duration::from_secs(0));
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Manually driven [`Clock`] for simulations and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(now_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.now_ms
            .fetch_add(secs.saturating_mul(1000), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Truncates a millisecond timestamp to whole seconds.
pub fn ms_to_secs(ms: u64) -> u64 {
    ms / 1000
}

/// Checks `submit ∈ [t_start, t_start + t_slot + max_delay]`, in seconds.
pub fn is_time_valid(t_start_ms: u64, t_slot_secs: u32, submit_ms: u64, max_delay_secs: u32) -> bool {
    let start = ms_to_secs(t_start_ms);
    let submit = ms_to_secs(submit_ms);
    let deadline = start
        .saturating_add(u64::from(t_slot_secs))
        .saturating_add(u64::from(max_delay_secs));
    submit >= start && submit <= deadline
}
