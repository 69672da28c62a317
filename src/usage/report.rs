//! Usage reports
//!
//! Read-only snapshots of a tracker, derived on demand.

use serde::Serialize;

use crate::quota::QuotaConfig;

/// Snapshot of a tracker's counters, elapsed time and latch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageReport {
    pub tokens_input: u64,
    pub tokens_output: u64,
    pub total_tokens: u64,
    pub cycles: u64,
    /// Seconds since the tracker was created
    pub elapsed_seconds: f64,
    /// Set once a quota check has found a violation; never cleared
    pub is_interrupted: bool,
    /// Reason recorded with the first violation
    pub interrupt_reason: Option<String>,
    pub limits: QuotaConfig,
    pub remaining: RemainingBudget,
}

/// Headroom left per dimension
///
/// `None` means the dimension is unconstrained. Values saturate at zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemainingBudget {
    pub tokens: Option<u64>,
    pub time_seconds: Option<f64>,
    pub cycles: Option<u64>,
}

impl RemainingBudget {
    pub(crate) fn compute(
        limits: &QuotaConfig,
        total_tokens: u64,
        elapsed_seconds: f64,
        cycles: u64,
    ) -> Self {
        Self {
            tokens: limits.max_tokens().map(|max| max.saturating_sub(total_tokens)),
            time_seconds: limits
                .max_time_seconds()
                .map(|max| (max as f64 - elapsed_seconds).max(0.0)),
            cycles: limits.max_cycles().map(|max| max.saturating_sub(cycles)),
        }
    }
}
