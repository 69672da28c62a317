//! agent-quota - usage meter for LLM agent sessions
//!
//! Reads newline-delimited usage records from stdin into a single session
//! and prints a JSON summary when the input ends, a quota is exceeded, or
//! the process is asked to stop.

use std::process::ExitCode;

use anyhow::Result;
use serde::Serialize;
use tokio::io::BufReader;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use agent_quota::{
    error::ErrorBody, metrics, AppError, Config, LogFormat, Meter, MeterSummary, Session,
    SessionReport, SharedTokenCounter, StopReason,
};

/// Exit status when the input ends within budget
const EXIT_COMPLETED: u8 = 0;
/// Exit status when a quota stops the session
const EXIT_QUOTA_EXCEEDED: u8 = 2;
/// Exit status after Ctrl+C / SIGTERM
const EXIT_CANCELLED: u8 = 130;

/// Summary printed to stdout at exit
#[derive(Debug, Serialize)]
struct RunSummary {
    outcome: &'static str,
    records: usize,
    skipped: usize,
    session: SessionReport,
    error: Option<ErrorBody>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(config.log_format);
    info!(limits = ?config.quota, "Configuration loaded successfully");

    if config.metrics_enabled {
        metrics::init_metrics()?;
        info!("Metrics initialized");
    }

    let meter = Meter::from_config(&config, SharedTokenCounter::new());
    let mut session = Session::new(config.quota);

    let stdin = BufReader::new(tokio::io::stdin());
    let run = meter
        .run_until(stdin, &mut session, shutdown_signal())
        .await?;

    let (summary, status) = summarize(run, &session);
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(rendered) = metrics::render() {
        eprintln!("{}", rendered);
    }

    info!(outcome = summary.outcome, "agent-quota finished");
    Ok(ExitCode::from(status))
}

/// Map a finished meter run to the printed summary and the exit status
fn summarize(run: MeterSummary, session: &Session) -> (RunSummary, u8) {
    let (outcome, error, status) = match run.stop {
        StopReason::EndOfInput => ("completed", None, EXIT_COMPLETED),
        StopReason::QuotaExceeded(violation) => (
            "interrupted",
            Some(AppError::from(violation).body()),
            EXIT_QUOTA_EXCEEDED,
        ),
        StopReason::Cancelled => ("cancelled", None, EXIT_CANCELLED),
    };

    let summary = RunSummary {
        outcome,
        records: run.records,
        skipped: run.skipped,
        session: session.report(),
        error,
    };
    (summary, status)
}

/// Initialize tracing on stderr so stdout carries only the summary
fn init_tracing(format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "agent_quota=info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(true);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Handle graceful shutdown signals
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, stopping meter");
        }
        _ = terminate => {
            warn!("Received SIGTERM, stopping meter");
        }
    }
}
