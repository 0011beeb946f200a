//! Shared health state for the /health endpoint.
//! Updated by the dispatcher, read by the status server.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

/// Dispatcher progress counters. Written on the dispatch path, read by API.
#[derive(Default)]
pub struct HealthState {
    /// True while the dispatch loop runs.
    running: AtomicBool,
    /// Unix milliseconds of the last successful poll (0 = none yet).
    last_poll_at_ms: AtomicU64,
    active_contests: AtomicUsize,
    balloons_dispatched: AtomicU64,
    print_failures: AtomicU64,
    mark_failures: AtomicU64,
    /// Consecutive iterations that hit a transient error.
    consecutive_failures: AtomicU64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub running: bool,
    pub last_poll_at_ms: Option<u64>,
    pub active_contests: usize,
    pub balloons_dispatched: u64,
    pub print_failures: u64,
    pub mark_failures: u64,
    pub consecutive_failures: u64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_running(&self, v: bool) {
        self.running.store(v, Ordering::Relaxed);
    }

    pub fn record_poll(&self, at_ms: u64, active_contests: usize) {
        self.last_poll_at_ms.store(at_ms, Ordering::Relaxed);
        self.active_contests.store(active_contests, Ordering::Relaxed);
    }

    pub fn inc_dispatched(&self) {
        self.balloons_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_print_failures(&self) {
        self.print_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_mark_failures(&self) {
        self.mark_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_consecutive_failures(&self, n: u64) {
        self.consecutive_failures.store(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let last = self.last_poll_at_ms.load(Ordering::Relaxed);
        HealthSnapshot {
            running: self.running.load(Ordering::Relaxed),
            last_poll_at_ms: (last > 0).then_some(last),
            active_contests: self.active_contests.load(Ordering::Relaxed),
            balloons_dispatched: self.balloons_dispatched.load(Ordering::Relaxed),
            print_failures: self.print_failures.load(Ordering::Relaxed),
            mark_failures: self.mark_failures.load(Ordering::Relaxed),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
        }
    }
}
