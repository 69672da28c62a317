//! Common test utilities for agent-quota
//!
//! Shared fixtures and helpers used across the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use agent_quota::{
    usage::ManualClock, Meter, QuotaConfig, Session, SharedTokenCounter, UsageTracker,
};

/// Test constants
pub mod constants {
    /// Model used for token counting in tests
    pub const TEST_MODEL: &str = "gpt-4";
    /// Poll interval long enough that only input drives the meter
    pub const SLOW_POLL_MS: u64 = 60_000;
}

/// A tracker together with the clock that drives it
pub struct ClockedTracker {
    pub tracker: UsageTracker,
    pub clock: Arc<ManualClock>,
}

impl ClockedTracker {
    pub fn new(config: QuotaConfig) -> Self {
        let clock = Arc::new(ManualClock::new());
        Self {
            tracker: UsageTracker::with_clock(config, clock.clone()),
            clock,
        }
    }

    pub fn advance_secs(&self, secs: u64) {
        self.clock.advance(Duration::from_secs(secs));
    }
}

/// A session on a manual clock
pub fn clocked_session(config: QuotaConfig) -> (Session, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    (Session::with_clock(config, clock.clone()), clock)
}

/// A meter that only re-checks quotas after each record
pub fn slow_meter() -> Meter {
    Meter::new(
        SharedTokenCounter::new(),
        constants::TEST_MODEL,
        Duration::from_millis(constants::SLOW_POLL_MS),
    )
}

/// A meter that re-checks quotas every few milliseconds
pub fn fast_meter() -> Meter {
    Meter::new(
        SharedTokenCounter::new(),
        constants::TEST_MODEL,
        Duration::from_millis(10),
    )
}

/// Join JSON values into newline-delimited input
pub fn ndjson(records: &[serde_json::Value]) -> Vec<u8> {
    let mut out = Vec::new();
    for record in records {
        out.extend_from_slice(record.to_string().as_bytes());
        out.push(b'\n');
    }
    out
}
