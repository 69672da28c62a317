//! Streaming usage meter
//!
//! Reads newline-delimited JSON usage records, feeds them to a session and
//! stops as soon as a ceiling is reached. Records are either explicit
//! counts (`{"tokens_input": 50, "tokens_output": 40, "cycles": 1}`) or an
//! exchange whose tokens are counted here
//! (`{"model": "gpt-4", "messages": [...], "completion": "..."}`).
//!
//! Quotas are also checked on a fixed tick so a time ceiling trips while
//! the input is idle.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::{AppError, AppResult},
    quota::{QuotaStatus, QuotaViolation},
    session::Session,
    tokens::{ChatMessage, SharedTokenCounter},
    usage::UsageDelta,
};

/// Smallest poll interval a meter will tick at
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// An LLM round-trip whose tokens still have to be counted
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExchangeRecord {
    #[serde(default)]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub completion: String,
    #[serde(default = "default_exchange_cycles")]
    pub cycles: u64,
}

/// One input line
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UsageRecord {
    Exchange(ExchangeRecord),
    Counts(UsageDelta),
}

fn default_exchange_cycles() -> u64 {
    1
}

impl UsageRecord {
    /// Parse one line; `line` is 1-based and only used for the error
    pub fn parse(line: usize, text: &str) -> AppResult<Self> {
        serde_json::from_str(text).map_err(|e| AppError::InvalidUsageRecord {
            line,
            message: e.to_string(),
        })
    }
}

/// Why the meter stopped
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    EndOfInput,
    QuotaExceeded(QuotaViolation),
    /// The shutdown future resolved first
    Cancelled,
}

/// Result of a meter run
#[derive(Debug, Clone, PartialEq)]
pub struct MeterSummary {
    /// Records applied to the session
    pub records: usize,
    /// Lines that could not be parsed or counted
    pub skipped: usize,
    pub stop: StopReason,
}

/// Applies usage records from a reader to a session
#[derive(Clone)]
pub struct Meter {
    counter: SharedTokenCounter,
    default_model: String,
    poll_interval: Duration,
}

impl Meter {
    /// Intervals below `MIN_POLL_INTERVAL` are raised to it.
    pub fn new(
        counter: SharedTokenCounter,
        default_model: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        if poll_interval < MIN_POLL_INTERVAL {
            warn!(
                requested_ms = poll_interval.as_millis() as u64,
                "Poll interval too small, using {:?}",
                MIN_POLL_INTERVAL
            );
        }
        Self {
            counter,
            default_model: default_model.into(),
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Build a meter from application config
    pub fn from_config(config: &Config, counter: SharedTokenCounter) -> Self {
        Self::new(
            counter,
            config.tokenizer_model.clone(),
            config.poll_interval,
        )
    }

    /// Turn a record into the usage it represents
    pub fn measure(&self, record: &UsageRecord) -> AppResult<UsageDelta> {
        match record {
            UsageRecord::Counts(delta) => Ok(*delta),
            UsageRecord::Exchange(exchange) => {
                let model = exchange.model.as_deref().unwrap_or(&self.default_model);
                Ok(UsageDelta {
                    tokens_input: self.counter.count_chat_tokens(model, &exchange.messages)?,
                    tokens_output: self.counter.count_tokens(model, &exchange.completion)?,
                    cycles: exchange.cycles,
                })
            }
        }
    }

    /// Read records until end of input or the first quota violation
    ///
    /// Lines after the violating record are left unread.
    pub async fn run<R>(&self, reader: R, session: &mut Session) -> AppResult<MeterSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        self.run_until(reader, session, std::future::pending()).await
    }

    /// Like `run`, but also stops with `StopReason::Cancelled` once
    /// `shutdown` resolves. The summary keeps the counts seen so far.
    pub async fn run_until<R, S>(
        &self,
        reader: R,
        session: &mut Session,
        shutdown: S,
    ) -> AppResult<MeterSummary>
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut lines = reader.lines();
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut line_no = 0;
        let mut records = 0;
        let mut skipped = 0;

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!(
                        session_id = %session.id(),
                        records = records,
                        skipped = skipped,
                        "Meter cancelled"
                    );
                    return Ok(MeterSummary { records, skipped, stop: StopReason::Cancelled });
                }
                line = lines.next_line() => {
                    let Some(text) = line? else {
                        info!(
                            session_id = %session.id(),
                            records = records,
                            skipped = skipped,
                            "End of usage input"
                        );
                        return Ok(MeterSummary { records, skipped, stop: StopReason::EndOfInput });
                    };
                    line_no += 1;

                    let text = text.trim();
                    if text.is_empty() {
                        continue;
                    }

                    match UsageRecord::parse(line_no, text).and_then(|record| self.measure(&record)) {
                        Ok(delta) => {
                            session.record(&delta);
                            records += 1;
                        }
                        Err(e) => {
                            warn!(session_id = %session.id(), error = %e, "Skipping usage record");
                            skipped += 1;
                        }
                    }
                }
                _ = ticker.tick() => {
                    debug!(session_id = %session.id(), "Quota poll");
                }
            }

            if let QuotaStatus::Exceeded(violation) = session.check_quotas() {
                return Ok(MeterSummary {
                    records,
                    skipped,
                    stop: StopReason::QuotaExceeded(violation),
                });
            }
        }
    }
}
