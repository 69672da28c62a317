//! agent-quota - per-session usage accounting for LLM agents
//!
//! A session owns one `UsageTracker` that accumulates tokens, cycles and
//! elapsed time against optional ceilings and reports the first one that
//! is reached. Around it the crate provides token counting, a streaming
//! meter for newline-delimited usage records, configuration and metrics.

pub mod config;
pub mod error;
pub mod meter;
pub mod metrics;
pub mod quota;
pub mod session;
pub mod tokens;
pub mod usage;

pub use crate::config::{Config, LogFormat};
pub use crate::error::{AppError, AppResult};
pub use crate::meter::{ExchangeRecord, Meter, MeterSummary, StopReason, UsageRecord};
pub use crate::quota::{QuotaConfig, QuotaDimension, QuotaStatus, QuotaViolation};
pub use crate::session::{Session, SessionReport};
pub use crate::tokens::{ChatMessage, SharedTokenCounter, TokenCounter};
pub use crate::usage::{SharedUsageTracker, UsageDelta, UsageReport, UsageTracker};
