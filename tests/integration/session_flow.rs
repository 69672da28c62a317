//! Session flow tests
//!
//! A session owner runs units of work until a ceiling stops it.

use std::time::Duration;

use pretty_assertions::assert_eq;

use agent_quota::{
    AppError, ChatMessage, QuotaConfig, QuotaDimension, SharedTokenCounter, UsageDelta,
};

use crate::common::{clocked_session, constants};

#[test]
fn test_agent_loop_stops_on_token_ceiling() {
    let (mut session, _clock) = clocked_session(QuotaConfig::unlimited().with_max_tokens(500));
    let mut completed = 0;

    let err = loop {
        match session.run_step(|| Ok((completed, UsageDelta::tokens(80, 40).with_cycles(1)))) {
            Ok(_) => completed += 1,
            Err(e) => break e,
        }
    };

    // 5 steps of 120 tokens: the fifth crosses 500, the sixth is refused
    assert_eq!(completed, 5);
    match err {
        AppError::QuotaExceeded {
            dimension, used, limit, ..
        } => {
            assert_eq!(dimension, QuotaDimension::Tokens);
            assert_eq!(used, 600);
            assert_eq!(limit, 500);
        }
        other => panic!("expected QuotaExceeded, got {:?}", other),
    }
}

#[test]
fn test_time_ceiling_refuses_next_step() {
    let (mut session, clock) =
        clocked_session(QuotaConfig::unlimited().with_max_time_seconds(30));

    session
        .run_step(|| Ok(((), UsageDelta::cycle())))
        .unwrap();
    clock.advance(Duration::from_secs(31));

    let mut ran = false;
    let result = session.run_step(|| {
        ran = true;
        Ok(((), UsageDelta::cycle()))
    });

    assert!(!ran);
    assert_eq!(result.unwrap_err().code(), "QUOTA_EXCEEDED");
    assert_eq!(session.report().usage.cycles, 1);
}

#[test]
fn test_exchanges_feed_token_ceiling() {
    let counter = SharedTokenCounter::new();
    let (mut session, _clock) = clocked_session(QuotaConfig::unlimited().with_max_tokens(60));
    let messages = vec![
        ChatMessage::new("system", "You are a concise research assistant."),
        ChatMessage::new("user", "List three uses of a quota tracker."),
    ];

    let mut exchanges = 0;
    while session.ensure_within_budget().is_ok() {
        session
            .record_exchange(
                &counter,
                constants::TEST_MODEL,
                &messages,
                "Budgeting, throttling and reporting.",
            )
            .unwrap();
        exchanges += 1;
        assert!(exchanges < 100, "token ceiling never reached");
    }

    let usage = session.report().usage;
    assert!(usage.total_tokens >= 60);
    assert_eq!(usage.cycles, exchanges);
    assert!(usage.is_interrupted);
}

#[test]
fn test_session_report_json_shape() {
    let (mut session, clock) = clocked_session(QuotaConfig::new(Some(100), Some(10), None));
    session.record(&UsageDelta::tokens(10, 5));
    clock.advance(Duration::from_secs(4));

    let json = serde_json::to_value(session.report()).unwrap();
    assert_eq!(json["session_id"], session.id().to_string());
    assert_eq!(json["usage"]["tokens_input"], 10);
    assert_eq!(json["usage"]["tokens_output"], 5);
    assert_eq!(json["usage"]["elapsed_seconds"], 4.0);
    assert_eq!(json["usage"]["remaining"]["tokens"], 85);
    assert_eq!(json["usage"]["remaining"]["time_seconds"], 6.0);
    assert!(json["usage"]["remaining"]["cycles"].is_null());
    assert_eq!(json["usage"]["interrupt_reason"], serde_json::Value::Null);
}
