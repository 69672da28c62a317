//! Session ownership of a usage tracker
//!
//! A `Session` is one logical unit of work (one agent invocation). It owns
//! exactly one `UsageTracker`, records usage after each step, and turns a
//! quota violation into `AppError::QuotaExceeded` so the caller can abort.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{
    error::AppResult,
    quota::{QuotaConfig, QuotaStatus},
    tokens::{ChatMessage, SharedTokenCounter},
    usage::{Clock, UsageDelta, UsageReport, UsageTracker},
};

/// Session report: identity plus the tracker snapshot
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub usage: UsageReport,
}

/// One session and its usage tracker
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    tracker: UsageTracker,
}

impl Session {
    /// Start a session under `config`
    pub fn new(config: QuotaConfig) -> Self {
        Self::with_tracker(UsageTracker::new(config))
    }

    /// Start a session whose tracker reads time from `clock`
    pub fn with_clock(config: QuotaConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_tracker(UsageTracker::with_clock(config, clock))
    }

    /// Start a session around an existing tracker
    pub fn with_tracker(tracker: UsageTracker) -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            tracker,
        };
        info!(
            session_id = %session.id,
            limits = ?session.tracker.config(),
            "Session started"
        );
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn tracker(&self) -> &UsageTracker {
        &self.tracker
    }

    /// Record usage for a finished step
    pub fn record(&mut self, delta: &UsageDelta) {
        self.tracker.record(delta);
    }

    /// Count an LLM round-trip and record it as one cycle
    ///
    /// Prompt tokens are charged as input, completion tokens as output.
    pub fn record_exchange(
        &mut self,
        counter: &SharedTokenCounter,
        model: &str,
        messages: &[ChatMessage],
        completion: &str,
    ) -> AppResult<UsageDelta> {
        let delta = UsageDelta {
            tokens_input: counter.count_chat_tokens(model, messages)?,
            tokens_output: counter.count_tokens(model, completion)?,
            cycles: 1,
        };
        self.tracker.record(&delta);
        debug!(
            session_id = %self.id,
            model = %model,
            tokens_input = delta.tokens_input,
            tokens_output = delta.tokens_output,
            "Recorded exchange"
        );
        Ok(delta)
    }

    /// Check quotas without failing
    pub fn check_quotas(&mut self) -> QuotaStatus {
        self.tracker.check_quotas()
    }

    /// Fail with `QuotaExceeded` once any ceiling is reached
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn ensure_within_budget(&mut self) -> AppResult<()> {
        match self.tracker.check_quotas() {
            QuotaStatus::WithinBudget => Ok(()),
            QuotaStatus::Exceeded(violation) => Err(violation.into()),
        }
    }

    /// Run one step if the budget allows, then record what it used
    ///
    /// The step returns its value together with the usage it consumed.
    /// Usage is recorded only when the step succeeds.
    pub fn run_step<T, F>(&mut self, step: F) -> AppResult<T>
    where
        F: FnOnce() -> AppResult<(T, UsageDelta)>,
    {
        self.ensure_within_budget()?;
        let (value, delta) = step()?;
        self.tracker.record(&delta);
        Ok(value)
    }

    /// Snapshot of the session
    pub fn report(&self) -> SessionReport {
        SessionReport {
            session_id: self.id,
            started_at: self.started_at,
            usage: self.tracker.report(),
        }
    }
}
