//! Quota ceilings
//!
//! A `QuotaConfig` is a snapshot of the ceilings a session runs under.
//! An unset ceiling leaves that dimension unconstrained.

use serde::{Deserialize, Serialize};

/// Ceilings for tokens, elapsed seconds and cycles
///
/// Fields are private so a config cannot change once a tracker holds it.
/// Use the consuming `with_*` builders to construct one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaConfig {
    max_tokens: Option<u64>,
    max_time_seconds: Option<u64>,
    max_cycles: Option<u64>,
}

impl QuotaConfig {
    /// Create a config from explicit ceilings
    pub fn new(
        max_tokens: Option<u64>,
        max_time_seconds: Option<u64>,
        max_cycles: Option<u64>,
    ) -> Self {
        Self {
            max_tokens,
            max_time_seconds,
            max_cycles,
        }
    }

    /// A config with no ceilings at all
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_max_time_seconds(mut self, max_time_seconds: u64) -> Self {
        self.max_time_seconds = Some(max_time_seconds);
        self
    }

    pub fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    /// Ceiling on input + output tokens
    pub fn max_tokens(&self) -> Option<u64> {
        self.max_tokens
    }

    /// Ceiling on wall-clock seconds since the tracker was created
    pub fn max_time_seconds(&self) -> Option<u64> {
        self.max_time_seconds
    }

    /// Ceiling on recorded cycles
    pub fn max_cycles(&self) -> Option<u64> {
        self.max_cycles
    }

    /// True when no dimension has a ceiling
    pub fn is_unlimited(&self) -> bool {
        self.max_tokens.is_none() && self.max_time_seconds.is_none() && self.max_cycles.is_none()
    }
}
