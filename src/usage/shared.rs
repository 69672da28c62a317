//! Thread-safe usage tracker wrapper
//!
//! `UsageTracker` has no internal locking. When several tasks or threads
//! feed the same session, they share a `SharedUsageTracker` instead, which
//! serializes every operation behind a mutex.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    error::AppResult,
    quota::{QuotaConfig, QuotaStatus},
};

use super::{report::UsageReport, tracker::UsageDelta, tracker::UsageTracker};

/// Cloneable handle to one tracker guarded by a mutex
#[derive(Debug, Clone)]
pub struct SharedUsageTracker {
    inner: Arc<Mutex<UsageTracker>>,
}

impl SharedUsageTracker {
    /// Create a shared tracker with the system clock
    pub fn new(config: QuotaConfig) -> Self {
        Self::from_tracker(UsageTracker::new(config))
    }

    /// Share an existing tracker
    pub fn from_tracker(tracker: UsageTracker) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tracker)),
        }
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, UsageTracker>> {
        self.inner
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to acquire usage tracker lock: {}", e).into())
    }

    /// Record consumption
    pub fn update_usage(&self, tokens_input: u64, tokens_output: u64, cycles: u64) -> AppResult<()> {
        self.lock()?.update_usage(tokens_input, tokens_output, cycles);
        Ok(())
    }

    /// Record a `UsageDelta`
    pub fn record(&self, delta: &UsageDelta) -> AppResult<()> {
        self.lock()?.record(delta);
        Ok(())
    }

    /// Check usage against the ceilings
    pub fn check_quotas(&self) -> AppResult<QuotaStatus> {
        Ok(self.lock()?.check_quotas())
    }

    /// Snapshot of the tracker
    pub fn report(&self) -> AppResult<UsageReport> {
        Ok(self.lock()?.report())
    }
}
