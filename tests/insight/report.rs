use std::sync::Arc;

use chrono::NaiveDate;
use natal_insight::{
    insight::{
        AnalysisKind, ChartSubjects, InsightError, NoopTelemetrySink, PlanTier, ProviderError,
        ProviderErrorKind,
    },
    report::{InMemoryCreditGate, ReportError, ReportOrchestrator, ReportRequest},
    usage::InMemoryUsageLedger,
};

use crate::support::{ScriptedProvider, Step, assembler, chart, config, engine, reply};

fn orchestrator(
    provider: Arc<ScriptedProvider>,
    ledger: Arc<InMemoryUsageLedger>,
    credits: Arc<InMemoryCreditGate>,
) -> ReportOrchestrator {
    let engine = engine(&config(2), provider, ledger, Arc::new(NoopTelemetrySink));
    ReportOrchestrator::new(engine, assembler(), credits)
}

fn natal_request(caller_id: Option<&str>) -> ReportRequest {
    ReportRequest {
        kind: AnalysisKind::BirthChartAnalysis,
        charts: ChartSubjects::Single(chart("Ada", "1990-07-21")),
        transit: None,
        transit_date: None,
        history: Vec::new(),
        question: None,
        plan: PlanTier::Free,
        caller_id: caller_id.map(str::to_string),
    }
}

fn invalid_request(message: &str) -> Step {
    Step::Fail(ProviderError::new(ProviderErrorKind::InvalidRequest, message))
}

#[tokio::test]
async fn given_caller_without_credit_when_report_requested_then_provider_is_never_called() {
    let provider = ScriptedProvider::new(Vec::new());
    let ledger = Arc::new(InMemoryUsageLedger::new());
    let credits = Arc::new(InMemoryCreditGate::new());
    let orchestrator = orchestrator(provider.clone(), ledger.clone(), credits);

    let err = orchestrator
        .run(natal_request(Some("user-0")))
        .await
        .expect_err("no credits granted");

    assert!(matches!(err, ReportError::InsufficientCredits(ref caller) if caller == "user-0"));
    assert_eq!(provider.calls(), 0);
    assert!(ledger.is_empty().await);
}

#[tokio::test]
async fn given_caller_with_credit_when_report_succeeds_then_one_credit_is_consumed() {
    let provider = ScriptedProvider::new(vec![reply("Your chart...", Some(500), Some(200))]);
    let ledger = Arc::new(InMemoryUsageLedger::new());
    let credits = Arc::new(InMemoryCreditGate::new());
    credits.grant("user-1", 3).await;
    let orchestrator = orchestrator(provider.clone(), ledger.clone(), credits.clone());

    let result = orchestrator
        .run(natal_request(Some("user-1")))
        .await
        .expect("report should succeed");

    assert_eq!(result.text, "Your chart...");
    assert_eq!(credits.balance("user-1").await, 2);
    assert_eq!(provider.calls(), 1);
    let records = ledger.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].caller_id.as_deref(), Some("user-1"));
}

#[tokio::test]
async fn given_generation_failure_when_report_requested_then_credit_is_left_untouched() {
    let provider = ScriptedProvider::new(vec![
        invalid_request("prompt rejected"),
        invalid_request("prompt rejected"),
    ]);
    let ledger = Arc::new(InMemoryUsageLedger::new());
    let credits = Arc::new(InMemoryCreditGate::new());
    credits.grant("user-2", 1).await;
    let orchestrator = orchestrator(provider.clone(), ledger.clone(), credits.clone());

    let err = orchestrator
        .run(natal_request(Some("user-2")))
        .await
        .expect_err("provider rejects the request");

    assert!(matches!(
        err,
        ReportError::Insight(InsightError::Generation(ref failure)) if failure.attempts == 2
    ));
    assert_eq!(credits.balance("user-2").await, 1);
    assert_eq!(ledger.len().await, 2);
}

#[tokio::test]
async fn given_anonymous_request_when_report_runs_then_credits_are_not_consulted() {
    let provider = ScriptedProvider::new(Vec::new());
    let ledger = Arc::new(InMemoryUsageLedger::new());
    let credits = Arc::new(InMemoryCreditGate::new());
    let orchestrator = orchestrator(provider.clone(), ledger, credits);

    let result = orchestrator
        .run(natal_request(None))
        .await
        .expect("unmetered request succeeds");

    assert_eq!(result.text, "ok");
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn given_predictions_without_transit_when_report_runs_then_transits_for_the_requested_day_are_sent()
 {
    let provider = ScriptedProvider::new(Vec::new());
    let ledger = Arc::new(InMemoryUsageLedger::new());
    let credits = Arc::new(InMemoryCreditGate::new());
    let orchestrator = orchestrator(provider.clone(), ledger, credits);

    let mut request = natal_request(None);
    request.kind = AnalysisKind::PredictionsTransits;
    request.transit_date = NaiveDate::from_ymd_opt(2026, 10, 19);
    orchestrator
        .run(request)
        .await
        .expect("predictions succeed");

    let sent = provider.requests();
    let first_turn = &sent[0].turns[0].content;
    assert!(first_turn.contains("<birth_chart_details>"));
    assert!(first_turn.contains("<transit_details>"));
    assert!(first_turn.contains("<transit_date>2026-10-19</transit_date>"));
    assert!(sent[0].system_prompt.contains("current transits"));
}

#[tokio::test]
async fn given_compatibility_pair_when_report_runs_then_both_charts_reach_the_model() {
    let provider = ScriptedProvider::new(Vec::new());
    let ledger = Arc::new(InMemoryUsageLedger::new());
    let credits = Arc::new(InMemoryCreditGate::new());
    let orchestrator = orchestrator(provider.clone(), ledger, credits);

    let mut request = natal_request(None);
    request.kind = AnalysisKind::CompatibilityAnalysis;
    request.charts = ChartSubjects::Pair {
        primary: chart("Ada", "1990-07-21"),
        partner: chart("Ben", "1988-03-02"),
    };
    orchestrator
        .run(request)
        .await
        .expect("compatibility succeeds");

    let sent = provider.requests();
    assert_eq!(sent[0].turns[0].content.matches("<birth_chart_details>").count(), 2);
    assert!(!sent[0].turns[0].content.contains("<transit_details>"));
}

#[tokio::test]
async fn given_compatibility_with_single_chart_when_report_runs_then_no_credit_or_call_is_spent() {
    let provider = ScriptedProvider::new(Vec::new());
    let ledger = Arc::new(InMemoryUsageLedger::new());
    let credits = Arc::new(InMemoryCreditGate::new());
    credits.grant("user-3", 1).await;
    let orchestrator = orchestrator(provider.clone(), ledger, credits.clone());

    let mut request = natal_request(Some("user-3"));
    request.kind = AnalysisKind::CompatibilityAnalysis;
    let err = orchestrator
        .run(request)
        .await
        .expect_err("synastry needs a partner");

    assert!(matches!(err, ReportError::Insight(InsightError::InvalidRequest(_))));
    assert_eq!(provider.calls(), 0);
    assert_eq!(credits.balance("user-3").await, 1);
}
