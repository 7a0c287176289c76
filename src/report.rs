use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::{
    chart::{ChartAssembler, ChartAssemblyError, ChartSnapshot, TransitSnapshot},
    insight::{
        AnalysisKind, ChartSubjects, ConversationTurn, InsightEngine, InsightError,
        InsightRequest, InsightResult, PlanTier,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreditError {
    #[error("caller '{0}' has no credits left")]
    Exhausted(String),
    #[error("credit store unavailable: {0}")]
    Unavailable(String),
}

/// Per-caller credit balance. Consulted before generation, decremented after success.
#[async_trait]
pub trait CreditGate: Send + Sync {
    async fn has_credit(&self, caller_id: &str) -> Result<bool, CreditError>;

    async fn consume(&self, caller_id: &str) -> Result<(), CreditError>;
}

/// Every caller has unlimited credit.
#[derive(Default)]
pub struct UnmeteredCredits;

#[async_trait]
impl CreditGate for UnmeteredCredits {
    async fn has_credit(&self, _caller_id: &str) -> Result<bool, CreditError> {
        Ok(true)
    }

    async fn consume(&self, _caller_id: &str) -> Result<(), CreditError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCreditGate {
    balances: Mutex<BTreeMap<String, u64>>,
}

impl InMemoryCreditGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn grant(&self, caller_id: impl Into<String>, credits: u64) {
        *self.balances.lock().await.entry(caller_id.into()).or_insert(0) += credits;
    }

    pub async fn balance(&self, caller_id: &str) -> u64 {
        self.balances
            .lock()
            .await
            .get(caller_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl CreditGate for InMemoryCreditGate {
    async fn has_credit(&self, caller_id: &str) -> Result<bool, CreditError> {
        Ok(self.balance(caller_id).await > 0)
    }

    async fn consume(&self, caller_id: &str) -> Result<(), CreditError> {
        let mut balances = self.balances.lock().await;
        match balances.get_mut(caller_id) {
            Some(balance) if *balance > 0 => {
                *balance -= 1;
                Ok(())
            }
            _ => Err(CreditError::Exhausted(caller_id.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("caller '{0}' has insufficient credits")]
    InsufficientCredits(String),
    #[error(transparent)]
    Chart(#[from] ChartAssemblyError),
    #[error(transparent)]
    Insight(#[from] InsightError),
    #[error(transparent)]
    Credit(#[from] CreditError),
}

#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub kind: AnalysisKind,
    pub charts: ChartSubjects,
    /// Used as-is for predictions when present.
    pub transit: Option<TransitSnapshot>,
    /// Day to compute transits for when `transit` is absent. Defaults to today (UTC).
    pub transit_date: Option<NaiveDate>,
    pub history: Vec<ConversationTurn>,
    pub question: Option<String>,
    pub plan: PlanTier,
    pub caller_id: Option<String>,
}

/// Credit check, transit completion, generation, then the credit decrement.
///
/// Requests without a caller id are not metered against credits.
#[derive(Clone)]
pub struct ReportOrchestrator {
    engine: InsightEngine,
    assembler: ChartAssembler,
    credits: Arc<dyn CreditGate>,
}

impl ReportOrchestrator {
    pub fn new(
        engine: InsightEngine,
        assembler: ChartAssembler,
        credits: Arc<dyn CreditGate>,
    ) -> Self {
        Self {
            engine,
            assembler,
            credits,
        }
    }

    pub async fn run(&self, request: ReportRequest) -> Result<InsightResult, ReportError> {
        let caller_id = request.caller_id.clone();
        if let Some(caller) = caller_id.as_deref()
            && !self.credits.has_credit(caller).await?
        {
            tracing::info!(
                target: "report",
                caller_id = caller,
                kind = %request.kind,
                "credits_exhausted"
            );
            return Err(ReportError::InsufficientCredits(caller.to_string()));
        }

        let insight_request = self.complete_request(request)?;
        let result = self.engine.analyze(&insight_request).await?;

        if let Some(caller) = caller_id.as_deref() {
            // Generation already succeeded; a failed decrement is logged, not surfaced.
            if let Err(err) = self.credits.consume(caller).await {
                tracing::error!(
                    target: "report",
                    caller_id = caller,
                    error = %err,
                    "credit_decrement_failed"
                );
            }
        }
        tracing::info!(
            target: "report",
            kind = %insight_request.kind,
            model = %result.model,
            attempts = result.attempts,
            cost = result.cost,
            "report_generated"
        );
        Ok(result)
    }

    fn complete_request(&self, request: ReportRequest) -> Result<InsightRequest, ReportError> {
        let transit = match (request.kind, request.transit) {
            (AnalysisKind::PredictionsTransits, None) => {
                let date = request
                    .transit_date
                    .unwrap_or_else(|| Utc::now().date_naive());
                let ayanamsa = primary_chart(&request.charts)
                    .ayanamsa()
                    .map(|resolved| resolved.name);
                Some(self.assembler.assemble_transit(date, ayanamsa)?)
            }
            (_, transit) => transit,
        };

        Ok(InsightRequest {
            kind: request.kind,
            charts: request.charts,
            transit,
            history: request.history,
            question: request.question,
            plan: request.plan,
            caller_id: request.caller_id,
        })
    }
}

fn primary_chart(charts: &ChartSubjects) -> &ChartSnapshot {
    match charts {
        ChartSubjects::Single(chart) => chart,
        ChartSubjects::Pair { primary, .. } => primary,
    }
}
