//! Configuration management for agent-quota
//!
//! Configuration is loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::quota::QuotaConfig;
use crate::tokens::FALLBACK_MODEL;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => bail!("unknown log format '{}', expected 'pretty' or 'json'", other),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Ceilings applied to every session
    pub quota: QuotaConfig,

    /// Model whose encoder counts tokens for exchange records without one
    pub tokenizer_model: String,
    /// How often the meter re-checks quotas while input is idle
    pub poll_interval: Duration,

    pub log_format: LogFormat,
    /// Install the Prometheus recorder and dump it at exit
    pub metrics_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Empty values are treated the same as missing ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let quota = QuotaConfig::new(
            parse_optional(&get, "AGENT_QUOTA_MAX_TOKENS")?,
            parse_optional(&get, "AGENT_QUOTA_MAX_TIME_SECONDS")?,
            parse_optional(&get, "AGENT_QUOTA_MAX_CYCLES")?,
        );

        let poll_interval_ms: u64 = parse_optional(&get, "AGENT_QUOTA_POLL_INTERVAL_MS")?
            .unwrap_or(1000);
        if poll_interval_ms == 0 {
            bail!("AGENT_QUOTA_POLL_INTERVAL_MS must be greater than zero");
        }

        Ok(Self {
            quota,
            tokenizer_model: get("AGENT_QUOTA_TOKENIZER_MODEL")
                .unwrap_or_else(|| FALLBACK_MODEL.to_string()),
            poll_interval: Duration::from_millis(poll_interval_ms),
            log_format: get("AGENT_QUOTA_LOG_FORMAT")
                .map(|v| v.parse::<LogFormat>())
                .transpose()
                .context("Invalid AGENT_QUOTA_LOG_FORMAT")?
                .unwrap_or(LogFormat::Pretty),
            metrics_enabled: get("AGENT_QUOTA_METRICS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }
}

fn parse_optional<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    get(key)
        .map(|v| v.trim().parse::<T>())
        .transpose()
        .with_context(|| format!("Invalid {}", key))
}
