use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use natal_insight::{
    insight::{
        ConversationTurn, InsightTelemetryEvent, NoopTelemetrySink, PlanTier,
        error::{ProviderError, ProviderErrorKind},
        types::TierModels,
    },
    usage::InMemoryUsageLedger,
};

use crate::support::{
    BrokenLedger, RecordingTelemetry, ScriptedProvider, Step, config, engine, reply, transient,
};

const SYSTEM: &str = "You are an astrologer.";

fn turns() -> Vec<ConversationTurn> {
    vec![ConversationTurn::user("<birth_chart_details>...</birth_chart_details>")]
}

#[tokio::test]
async fn given_premium_plan_and_one_transient_failure_when_generating_then_economical_model_answers_with_two_ledger_records()
 {
    let provider = ScriptedProvider::new(vec![
        transient("upstream 503"),
        reply("Your Sun in Cancer...", Some(900), Some(300)),
    ]);
    let ledger = Arc::new(InMemoryUsageLedger::new());
    let telemetry = Arc::new(RecordingTelemetry::default());
    let engine = engine(&config(2), provider.clone(), ledger.clone(), telemetry.clone());

    let result = engine
        .generate(SYSTEM, &turns(), PlanTier::Premium, Some("user-7"))
        .await
        .expect("fallback succeeds");

    assert_eq!(result.model, "gpt-4o-mini");
    assert_eq!(result.attempts, 2);
    assert!(result.success);
    assert_eq!(provider.models(), vec!["gpt-4o", "gpt-4o-mini"]);

    let records = ledger.records().await;
    assert_eq!(records.len(), 2);
    assert!(!records[0].success);
    assert_eq!(records[0].endpoint, "gpt-4o");
    assert_eq!(records[0].output_tokens, 0);
    assert!(records[0].input_tokens > 0);
    assert!(records[0].cost > 0.0);
    assert!(
        records[0]
            .error_message
            .as_deref()
            .unwrap_or_default()
            .contains("upstream 503")
    );
    assert!(records[1].success);
    assert_eq!(records[1].endpoint, "gpt-4o-mini");
    assert_eq!(records[1].input_tokens, 900);
    assert_eq!(records[1].output_tokens, 300);
    assert!(records.iter().all(|record| record.caller_id.as_deref() == Some("user-7")));
    assert!(records.iter().all(|record| record.service_name == "insight"));

    assert!(telemetry.events().iter().any(|event| matches!(
        event,
        InsightTelemetryEvent::ModelDowngraded { from, to, .. }
            if from == "gpt-4o" && to == "gpt-4o-mini"
    )));
}

#[tokio::test]
async fn given_premium_plan_and_unknown_model_error_when_generating_then_economical_model_still_answers()
 {
    let provider = ScriptedProvider::new(vec![
        Step::Fail(
            ProviderError::new(ProviderErrorKind::InvalidRequest, "model not found")
                .with_retryable(false),
        ),
        reply("Your Moon in Cancer...", Some(800), Some(200)),
    ]);
    let ledger = Arc::new(InMemoryUsageLedger::new());
    let telemetry = Arc::new(RecordingTelemetry::default());
    let engine = engine(&config(2), provider.clone(), ledger.clone(), telemetry.clone());

    let result = engine
        .generate(SYSTEM, &turns(), PlanTier::Premium, None)
        .await
        .expect("economical model answers");

    assert_eq!(result.model, "gpt-4o-mini");
    assert_eq!(result.attempts, 2);
    assert_eq!(provider.models(), vec!["gpt-4o", "gpt-4o-mini"]);
    let records = ledger.records().await;
    assert_eq!(records.len(), 2);
    assert!(!records[0].success);
    assert_eq!(records[0].endpoint, "gpt-4o");
    assert!(records[1].success);
    assert!(
        telemetry
            .events()
            .iter()
            .any(|event| matches!(event, InsightTelemetryEvent::ModelDowngraded { .. }))
    );
}

#[tokio::test]
async fn given_free_plan_and_authentication_errors_when_generating_then_two_attempts_are_recorded()
 {
    let auth = || {
        Step::Fail(
            ProviderError::new(ProviderErrorKind::Authentication, "bad key").with_retryable(false),
        )
    };
    let provider = ScriptedProvider::new(vec![auth(), auth()]);
    let ledger = Arc::new(InMemoryUsageLedger::new());
    let engine = engine(
        &config(2),
        provider.clone(),
        ledger.clone(),
        Arc::new(NoopTelemetrySink),
    );

    let err = engine
        .generate(SYSTEM, &turns(), PlanTier::Free, None)
        .await
        .expect_err("both attempts are rejected");

    assert_eq!(err.attempts, 2);
    assert_eq!(err.last_error.kind, ProviderErrorKind::Authentication);
    assert_eq!(provider.calls(), 2);
    assert_eq!(ledger.len().await, 2);
}

#[tokio::test]
async fn given_free_plan_and_persistent_transient_failures_when_generating_then_economical_model_is_retried_once_after_backoff()
 {
    let provider = ScriptedProvider::new(vec![
        transient("overloaded"),
        transient("still overloaded"),
        transient("never reached"),
    ]);
    let ledger = Arc::new(InMemoryUsageLedger::new());
    let mut config = config(3);
    config.reliability.backoff_base_ms = 40;
    config.reliability.backoff_max_ms = 40;
    let engine = engine(
        &config,
        provider.clone(),
        ledger.clone(),
        Arc::new(NoopTelemetrySink),
    );

    let started = Instant::now();
    let err = engine
        .generate(SYSTEM, &turns(), PlanTier::Free, None)
        .await
        .expect_err("every attempt fails");

    assert!(started.elapsed() >= Duration::from_millis(30));
    assert_eq!(err.attempts, 2);
    assert_eq!(err.model, "gpt-4o-mini");
    assert_eq!(err.last_error.message, "still overloaded");
    assert_eq!(provider.models(), vec!["gpt-4o-mini"; 2]);
    let records = ledger.records().await;
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|record| !record.success));
}

#[tokio::test]
async fn given_reported_usage_when_generating_then_cost_comes_from_price_table() {
    let provider = ScriptedProvider::new(vec![reply("text", Some(1_000), Some(500))]);
    let engine = engine(
        &config(1),
        provider,
        Arc::new(InMemoryUsageLedger::new()),
        Arc::new(NoopTelemetrySink),
    );

    let result = engine
        .generate(SYSTEM, &turns(), PlanTier::Basic, None)
        .await
        .expect("success");

    assert!(!result.usage.estimated);
    // 1000 * 0.15 / 1e6 + 500 * 0.60 / 1e6
    assert!((result.cost - 0.000_45).abs() < 1e-12, "cost {}", result.cost);
}

#[tokio::test]
async fn given_provider_omits_usage_when_generating_then_tokens_are_estimated_from_characters() {
    let provider = ScriptedProvider::new(vec![reply("abcdefgh", None, None)]);
    let engine = engine(
        &config(1),
        provider,
        Arc::new(InMemoryUsageLedger::new()),
        Arc::new(NoopTelemetrySink),
    );

    let result = engine
        .generate("abcd", &[ConversationTurn::user("efgh")], PlanTier::Free, None)
        .await
        .expect("success");

    assert!(result.usage.estimated);
    assert_eq!(result.usage.input_tokens, 2);
    assert_eq!(result.usage.output_tokens, 2);
}

#[tokio::test]
async fn given_model_without_price_when_generating_then_cost_is_zero() {
    let mut config = config(1);
    config.models = TierModels {
        high_capability: "house-model-large".to_string(),
        economical: "house-model-small".to_string(),
    };
    let provider = ScriptedProvider::new(vec![reply("text", Some(10), Some(10))]);
    let engine = engine(
        &config,
        provider.clone(),
        Arc::new(InMemoryUsageLedger::new()),
        Arc::new(NoopTelemetrySink),
    );

    let result = engine
        .generate(SYSTEM, &turns(), PlanTier::Free, None)
        .await
        .expect("success");

    assert_eq!(result.model, "house-model-small");
    assert_eq!(result.cost, 0.0);
    assert_eq!(provider.models(), vec!["house-model-small"]);
}

#[tokio::test]
async fn given_stalled_provider_when_attempt_deadline_passes_then_timeout_error_is_reported() {
    let provider = ScriptedProvider::new(vec![Step::Stall(Duration::from_secs(5))]);
    let ledger = Arc::new(InMemoryUsageLedger::new());
    let engine = engine(
        &config(1),
        provider,
        ledger.clone(),
        Arc::new(NoopTelemetrySink),
    );

    let err = engine
        .generate(SYSTEM, &turns(), PlanTier::Free, None)
        .await
        .expect_err("attempt exceeds the 1s deadline");

    assert_eq!(err.last_error.kind, ProviderErrorKind::Timeout);
    assert!(err.last_error.retryable);
    let records = ledger.records().await;
    assert_eq!(records.len(), 1);
    assert!(!records[0].success);
}

#[tokio::test]
async fn given_ledger_write_failure_when_generating_then_result_is_still_returned() {
    let ledger = Arc::new(BrokenLedger {
        attempts: AtomicUsize::new(0),
    });
    let engine = engine(
        &config(2),
        ScriptedProvider::new(vec![reply("fine", Some(5), Some(5))]),
        ledger.clone(),
        Arc::new(NoopTelemetrySink),
    );

    let result = engine
        .generate(SYSTEM, &turns(), PlanTier::Free, None)
        .await
        .expect("metering failures do not fail generation");

    assert_eq!(result.text, "fine");
    assert_eq!(ledger.attempts.load(Ordering::SeqCst), 1);
}
