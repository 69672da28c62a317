//! Meter streaming tests
//!
//! Feed newline-delimited records through the meter the same way the
//! binary does with stdin.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::io::{AsyncWriteExt, BufReader};

use agent_quota::{QuotaConfig, QuotaViolation, StopReason};

use crate::common::{clocked_session, fast_meter, ndjson, slow_meter};

#[tokio::test]
async fn test_token_scenario_over_stream() {
    let input = ndjson(&[
        json!({"tokens_input": 50, "tokens_output": 40}),
        json!({"tokens_output": 20}),
        json!({"tokens_output": 1}),
    ]);
    let (mut session, _clock) = clocked_session(QuotaConfig::unlimited().with_max_tokens(100));

    let summary = slow_meter().run(&input[..], &mut session).await.unwrap();

    assert_eq!(summary.records, 2);
    assert_eq!(
        summary.stop,
        StopReason::QuotaExceeded(QuotaViolation::Tokens {
            used: 110,
            limit: 100
        })
    );
    assert_eq!(
        session.report().usage.interrupt_reason.as_deref(),
        Some("Token quota exceeded (110 >= 100)")
    );
}

#[tokio::test]
async fn test_mixed_records_complete() {
    let input = ndjson(&[
        json!({"cycles": 1}),
        json!({
            "model": "gpt-4",
            "messages": [{"role": "user", "content": "Ping?"}],
            "completion": "Pong."
        }),
        json!({"unexpected": true}),
        json!({"tokens_input": 7, "cycles": 1}),
    ]);
    let (mut session, _clock) = clocked_session(QuotaConfig::unlimited());

    let summary = slow_meter().run(&input[..], &mut session).await.unwrap();

    assert_eq!(summary.stop, StopReason::EndOfInput);
    assert_eq!(summary.records, 3);
    assert_eq!(summary.skipped, 1);

    let usage = session.report().usage;
    assert_eq!(usage.cycles, 3);
    assert!(usage.tokens_input > 7);
    assert!(usage.tokens_output > 0);
}

#[tokio::test]
async fn test_cycle_ceiling_over_stream() {
    let input = ndjson(&[json!({"cycles": 1}), json!({"cycles": 1}), json!({"cycles": 1})]);
    let (mut session, _clock) = clocked_session(QuotaConfig::unlimited().with_max_cycles(3));

    let summary = slow_meter().run(&input[..], &mut session).await.unwrap();

    assert_eq!(summary.records, 3);
    assert_eq!(
        summary.stop,
        StopReason::QuotaExceeded(QuotaViolation::Cycles { used: 3, limit: 3 })
    );
}

#[tokio::test]
async fn test_time_ceiling_trips_while_writer_is_idle() {
    let (mut session, clock) =
        clocked_session(QuotaConfig::unlimited().with_max_time_seconds(10));
    let (mut writer, reader) = tokio::io::duplex(256);

    writer
        .write_all(b"{\"tokens_input\": 5}\n")
        .await
        .unwrap();

    let meter = fast_meter();
    let run = meter.run(BufReader::new(reader), &mut session);
    let advance = async {
        // Give the meter time to consume the first record, then let time pass
        tokio::time::sleep(Duration::from_millis(50)).await;
        clock.advance(Duration::from_secs(10));
    };

    let (summary, ()) = tokio::join!(run, advance);
    let summary = summary.unwrap();

    assert_eq!(summary.records, 1);
    assert!(matches!(
        summary.stop,
        StopReason::QuotaExceeded(QuotaViolation::Time { limit_seconds: 10, .. })
    ));
    drop(writer);
}

#[tokio::test]
async fn test_shutdown_mid_stream_reports_counts() {
    let (mut session, _clock) = clocked_session(QuotaConfig::unlimited());
    let (mut writer, reader) = tokio::io::duplex(256);

    writer
        .write_all(&ndjson(&[
            json!({"tokens_input": 10, "tokens_output": 5, "cycles": 1}),
            json!({"messages": [], "completion": "x", "tokens_input": 500}),
            json!({"cycles": 1}),
        ]))
        .await
        .unwrap();

    let meter = fast_meter();
    let run = meter.run_until(
        BufReader::new(reader),
        &mut session,
        tokio::time::sleep(Duration::from_millis(100)),
    );
    let summary = run.await.unwrap();

    assert_eq!(summary.stop, StopReason::Cancelled);
    assert_eq!(summary.records, 2);
    assert_eq!(summary.skipped, 1);

    let usage = session.report().usage;
    assert_eq!(usage.total_tokens, 15);
    assert_eq!(usage.cycles, 2);
    drop(writer);
}
