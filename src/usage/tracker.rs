//! Usage tracker implementation
//!
//! Accumulates tokens, cycles and elapsed time for one session and checks
//! them against a `QuotaConfig`. The tracker is a plain value: no locking,
//! no I/O, and every operation is O(1). Wrap it in a `SharedUsageTracker`
//! to share it across threads.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::metrics;
use crate::quota::{QuotaConfig, QuotaStatus, QuotaViolation};

use super::clock::{Clock, SystemClock};
use super::report::{RemainingBudget, UsageReport};

/// Usage consumed by one unit of work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UsageDelta {
    #[serde(default)]
    pub tokens_input: u64,
    #[serde(default)]
    pub tokens_output: u64,
    #[serde(default)]
    pub cycles: u64,
}

impl UsageDelta {
    /// Tokens for one LLM round-trip, without a cycle
    pub fn tokens(tokens_input: u64, tokens_output: u64) -> Self {
        Self {
            tokens_input,
            tokens_output,
            cycles: 0,
        }
    }

    /// A single processing cycle with no tokens
    pub fn cycle() -> Self {
        Self {
            cycles: 1,
            ..Self::default()
        }
    }

    /// Set the cycles for this delta
    pub fn with_cycles(mut self, cycles: u64) -> Self {
        self.cycles = cycles;
        self
    }

    pub fn total_tokens(&self) -> u64 {
        self.tokens_input.saturating_add(self.tokens_output)
    }

    /// True when recording this delta would change nothing
    pub fn is_empty(&self) -> bool {
        self.tokens_input == 0 && self.tokens_output == 0 && self.cycles == 0
    }
}

/// Running counters for a session
///
/// Counters only ever grow. The start instant is fixed at construction and
/// elapsed time is always derived from it.
#[derive(Debug, Clone)]
pub struct UsageState {
    tokens_input: u64,
    tokens_output: u64,
    cycles: u64,
    started: Instant,
}

impl UsageState {
    fn new(started: Instant) -> Self {
        Self {
            tokens_input: 0,
            tokens_output: 0,
            cycles: 0,
            started,
        }
    }

    pub fn tokens_input(&self) -> u64 {
        self.tokens_input
    }

    pub fn tokens_output(&self) -> u64 {
        self.tokens_output
    }

    pub fn total_tokens(&self) -> u64 {
        self.tokens_input.saturating_add(self.tokens_output)
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn started(&self) -> Instant {
        self.started
    }
}

/// Usage tracker for a single session
///
/// Records consumption after each unit of work and answers whether any
/// ceiling has been reached. The first violation found by `check_quotas`
/// is latched: `is_interrupted` stays true for the rest of the session.
#[derive(Debug)]
pub struct UsageTracker {
    config: QuotaConfig,
    state: UsageState,
    clock: Arc<dyn Clock>,
    interrupted: Option<QuotaViolation>,
}

impl UsageTracker {
    /// Create a tracker that starts its clock now
    pub fn new(config: QuotaConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a tracker reading time from `clock`
    pub fn with_clock(config: QuotaConfig, clock: Arc<dyn Clock>) -> Self {
        let state = UsageState::new(clock.now());
        Self {
            config,
            state,
            clock,
            interrupted: None,
        }
    }

    pub fn config(&self) -> &QuotaConfig {
        &self.config
    }

    pub fn state(&self) -> &UsageState {
        &self.state
    }

    /// Record consumption for one unit of work
    pub fn update_usage(&mut self, tokens_input: u64, tokens_output: u64, cycles: u64) {
        self.state.tokens_input = self.state.tokens_input.saturating_add(tokens_input);
        self.state.tokens_output = self.state.tokens_output.saturating_add(tokens_output);
        self.state.cycles = self.state.cycles.saturating_add(cycles);

        metrics::record_usage(tokens_input, tokens_output, cycles);

        tracing::debug!(
            tokens_input = tokens_input,
            tokens_output = tokens_output,
            cycles = cycles,
            total_tokens = self.state.total_tokens(),
            total_cycles = self.state.cycles,
            "Recorded usage"
        );
    }

    /// Record a `UsageDelta`
    pub fn record(&mut self, delta: &UsageDelta) {
        self.update_usage(delta.tokens_input, delta.tokens_output, delta.cycles);
    }

    /// Time since the tracker was created, read fresh from the clock
    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.state.started)
    }

    /// Check usage against the configured ceilings
    ///
    /// Dimensions are checked in order tokens, time, cycles, each with `>=`.
    /// Only the first violation is reported.
    pub fn check_quotas(&mut self) -> QuotaStatus {
        match self.first_violation() {
            None => QuotaStatus::WithinBudget,
            Some(violation) => {
                if self.interrupted.is_none() {
                    tracing::warn!(
                        dimension = %violation.dimension(),
                        used = violation.used(),
                        limit = violation.limit(),
                        "{}",
                        violation
                    );
                    metrics::record_violation(violation.dimension());
                    self.interrupted = Some(violation.clone());
                }
                QuotaStatus::Exceeded(violation)
            }
        }
    }

    fn first_violation(&self) -> Option<QuotaViolation> {
        if let Some(limit) = self.config.max_tokens() {
            let used = self.state.total_tokens();
            if used >= limit {
                return Some(QuotaViolation::Tokens { used, limit });
            }
        }

        if let Some(limit_seconds) = self.config.max_time_seconds() {
            let elapsed = self.elapsed();
            if elapsed >= Duration::from_secs(limit_seconds) {
                return Some(QuotaViolation::Time {
                    elapsed,
                    limit_seconds,
                });
            }
        }

        if let Some(limit) = self.config.max_cycles() {
            let used = self.state.cycles;
            if used >= limit {
                return Some(QuotaViolation::Cycles { used, limit });
            }
        }

        None
    }

    /// Whether a quota check has ever found a violation
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.is_some()
    }

    /// The first violation recorded by `check_quotas`
    pub fn interrupt_reason(&self) -> Option<String> {
        self.interrupted.as_ref().map(QuotaViolation::reason)
    }

    /// Snapshot of counters, elapsed time and the interrupt latch
    pub fn report(&self) -> UsageReport {
        let total_tokens = self.state.total_tokens();
        let elapsed_seconds = self.elapsed().as_secs_f64();

        UsageReport {
            tokens_input: self.state.tokens_input,
            tokens_output: self.state.tokens_output,
            total_tokens,
            cycles: self.state.cycles,
            elapsed_seconds,
            is_interrupted: self.is_interrupted(),
            interrupt_reason: self.interrupt_reason(),
            limits: self.config,
            remaining: RemainingBudget::compute(
                &self.config,
                total_tokens,
                elapsed_seconds,
                self.state.cycles,
            ),
        }
    }
}
