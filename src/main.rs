use std::sync::Arc;

use anyhow::{Context, Result};
use natal_insight::{
    chart::{AnalyticOracle, Ayanamsa, ChartAssembler, HouseSystem, StructuredText},
    cli::{CliArgs, ReportRequestFile},
    config::Config,
    insight::{
        AnalysisKind, ChartSubjects, InsightEngine, PlanTier, TracingTelemetrySink,
        adapters::build_provider, credentials::EnvCredentialProvider,
    },
    logging::init_tracing,
    report::{ReportOrchestrator, ReportRequest, UnmeteredCredits},
    usage::JsonLinesUsageLedger,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::from_env()?;
    let config = Config::load(&args.config_path)
        .with_context(|| format!("failed to load config from {}", args.config_path.display()))?;
    let _logging = init_tracing(&config.logging).context("failed to initialize logging")?;
    let request = ReportRequestFile::load(&args.request_path)?;

    let house_system = match request.house_system.as_deref() {
        Some(code) => code.parse::<HouseSystem>()?,
        None => config.chart.default_house_system,
    };
    let ayanamsa = match request.ayanamsa.as_deref() {
        Some(name) => Some(name.parse::<Ayanamsa>()?),
        None => config.chart.default_ayanamsa,
    };

    let assembler = ChartAssembler::new(Arc::new(AnalyticOracle::new()));
    let chart = assembler
        .assemble(&request.birth, &request.geo, house_system, ayanamsa)
        .with_context(|| format!("failed to assemble chart for {}", request.birth.name))?;
    println!("{}", chart.to_structured_text());

    let Some(kind) = request.analysis.as_deref() else {
        return Ok(());
    };
    let kind: AnalysisKind = kind.parse()?;
    let plan = match request.plan.as_deref() {
        Some(plan) => plan.parse::<PlanTier>()?,
        None => PlanTier::Free,
    };
    let charts = match &request.partner {
        Some(partner) => ChartSubjects::Pair {
            primary: chart,
            partner: assembler
                .assemble(&partner.birth, &partner.geo, house_system, ayanamsa)
                .with_context(|| {
                    format!("failed to assemble chart for {}", partner.birth.name)
                })?,
        },
        None => ChartSubjects::Single(chart),
    };

    let provider = build_provider(&config.insight.provider, Arc::new(EnvCredentialProvider))
        .context("failed to build model provider")?;
    let engine = InsightEngine::new(
        &config.insight,
        provider,
        Arc::new(JsonLinesUsageLedger::new(config.usage_ledger.path.clone())),
        Arc::new(TracingTelemetrySink),
    );
    let orchestrator = ReportOrchestrator::new(engine, assembler, Arc::new(UnmeteredCredits));

    let result = orchestrator
        .run(ReportRequest {
            kind,
            charts,
            transit: None,
            transit_date: request.transit_date,
            history: request.history,
            question: request.question,
            plan,
            caller_id: request.caller_id,
        })
        .await
        .with_context(|| format!("failed to generate {}", kind))?;

    println!("\n{}", result.text);
    eprintln!(
        "model={} attempts={} input_tokens={} output_tokens={} cost_usd={:.6}",
        result.model,
        result.attempts,
        result.usage.input_tokens,
        result.usage.output_tokens,
        result.cost
    );
    Ok(())
}
