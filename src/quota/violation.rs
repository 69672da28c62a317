//! Quota violations
//!
//! The result of a quota check: either within budget, or the first
//! dimension found at or over its ceiling.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A usage dimension that can carry a ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaDimension {
    Tokens,
    Time,
    Cycles,
}

impl QuotaDimension {
    /// Label used in metrics and error details
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tokens => "tokens",
            Self::Time => "time",
            Self::Cycles => "cycles",
        }
    }
}

impl fmt::Display for QuotaDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ceiling that has been reached or passed
#[derive(Debug, Clone, PartialEq)]
pub enum QuotaViolation {
    /// Input + output tokens reached `limit`
    Tokens { used: u64, limit: u64 },
    /// Elapsed time reached `limit_seconds`
    Time { elapsed: Duration, limit_seconds: u64 },
    /// Recorded cycles reached `limit`
    Cycles { used: u64, limit: u64 },
}

impl QuotaViolation {
    pub fn dimension(&self) -> QuotaDimension {
        match self {
            Self::Tokens { .. } => QuotaDimension::Tokens,
            Self::Time { .. } => QuotaDimension::Time,
            Self::Cycles { .. } => QuotaDimension::Cycles,
        }
    }

    /// Configured ceiling (seconds for time)
    pub fn limit(&self) -> u64 {
        match self {
            Self::Tokens { limit, .. } | Self::Cycles { limit, .. } => *limit,
            Self::Time { limit_seconds, .. } => *limit_seconds,
        }
    }

    /// Observed usage, with time truncated to whole seconds
    pub fn used(&self) -> u64 {
        match self {
            Self::Tokens { used, .. } | Self::Cycles { used, .. } => *used,
            Self::Time { elapsed, .. } => elapsed.as_secs(),
        }
    }

    /// Human readable reason, e.g. `Token quota exceeded (110 >= 100)`
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for QuotaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tokens { used, limit } => {
                write!(f, "Token quota exceeded ({} >= {})", used, limit)
            }
            Self::Time {
                elapsed,
                limit_seconds,
            } => write!(
                f,
                "Time quota exceeded ({:.1}s >= {}s)",
                elapsed.as_secs_f64(),
                limit_seconds
            ),
            Self::Cycles { used, limit } => {
                write!(f, "Cycle quota exceeded ({} >= {})", used, limit)
            }
        }
    }
}

/// Outcome of `UsageTracker::check_quotas`
#[derive(Debug, Clone, PartialEq)]
pub enum QuotaStatus {
    WithinBudget,
    Exceeded(QuotaViolation),
}

impl QuotaStatus {
    pub fn is_exceeded(&self) -> bool {
        matches!(self, Self::Exceeded(_))
    }

    /// Reason for the violation, `None` when within budget
    pub fn reason(&self) -> Option<String> {
        self.violation().map(QuotaViolation::reason)
    }

    pub fn violation(&self) -> Option<&QuotaViolation> {
        match self {
            Self::WithinBudget => None,
            Self::Exceeded(violation) => Some(violation),
        }
    }

    /// The `(exceeded, reason)` pair
    pub fn into_parts(self) -> (bool, Option<String>) {
        let exceeded = self.is_exceeded();
        (exceeded, self.reason())
    }
}
