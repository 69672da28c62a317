//! Usage metrics
//!
//! Counters for consumed usage and quota violations. Recording is a no-op
//! until `init_metrics` installs the Prometheus recorder.

use ::metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::error::AppResult;
use crate::quota::QuotaDimension;

/// Global Prometheus handle, set once by `init_metrics`
static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder (safe to call more than once)
pub fn init_metrics() -> AppResult<()> {
    PROMETHEUS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;
        register_metrics();
        Ok::<_, anyhow::Error>(handle)
    })?;
    Ok(())
}

fn register_metrics() {
    describe_counter!(
        "agent_quota_tokens_total",
        "Total tokens recorded against session quotas"
    );
    describe_counter!(
        "agent_quota_cycles_total",
        "Total processing cycles recorded against session quotas"
    );
    describe_counter!(
        "agent_quota_violations_total",
        "Sessions that reached a quota ceiling"
    );
}

/// Render current metrics in Prometheus text format
///
/// Returns `None` when `init_metrics` has not been called.
pub fn render() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(PrometheusHandle::render)
}

/// Record usage added to a tracker
pub fn record_usage(tokens_input: u64, tokens_output: u64, cycles: u64) {
    if tokens_input > 0 {
        counter!("agent_quota_tokens_total", "type" => "input").increment(tokens_input);
    }
    if tokens_output > 0 {
        counter!("agent_quota_tokens_total", "type" => "output").increment(tokens_output);
    }
    if cycles > 0 {
        counter!("agent_quota_cycles_total").increment(cycles);
    }
}

/// Record the first violation of a session
pub fn record_violation(dimension: QuotaDimension) {
    counter!("agent_quota_violations_total", "dimension" => dimension.as_str()).increment(1);
}
