use std::{collections::BTreeMap, fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    chart::types::{ChartSnapshot, TransitSnapshot},
    insight::error::InsightError,
};

pub type ModelId = String;
pub type RequestId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisKind {
    BirthChartAnalysis,
    PredictionsTransits,
    CompatibilityAnalysis,
    RemedialMeasures,
}

impl AnalysisKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisKind::BirthChartAnalysis => "BIRTH_CHART_ANALYSIS",
            AnalysisKind::PredictionsTransits => "PREDICTIONS_TRANSITS",
            AnalysisKind::CompatibilityAnalysis => "COMPATIBILITY_ANALYSIS",
            AnalysisKind::RemedialMeasures => "REMEDIAL_MEASURES",
        }
    }

    pub fn requires_partner_chart(self) -> bool {
        matches!(self, AnalysisKind::CompatibilityAnalysis)
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisKind {
    type Err = InsightError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "BIRTH_CHART_ANALYSIS" => Ok(AnalysisKind::BirthChartAnalysis),
            "PREDICTIONS_TRANSITS" => Ok(AnalysisKind::PredictionsTransits),
            "COMPATIBILITY_ANALYSIS" => Ok(AnalysisKind::CompatibilityAnalysis),
            "REMEDIAL_MEASURES" => Ok(AnalysisKind::RemedialMeasures),
            other => Err(InsightError::UnknownAnalysisKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    Basic,
    Premium,
}

impl PlanTier {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Basic => "basic",
            PlanTier::Premium => "premium",
        }
    }
}

impl FromStr for PlanTier {
    type Err = InsightError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(PlanTier::Free),
            "basic" => Ok(PlanTier::Basic),
            "premium" => Ok(PlanTier::Premium),
            _ => Err(InsightError::InvalidRequest(format!(
                "unknown plan tier '{}'",
                raw
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    HighCapability,
    Economical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartSubjects {
    Single(ChartSnapshot),
    Pair {
        primary: ChartSnapshot,
        partner: ChartSnapshot,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsightRequest {
    pub kind: AnalysisKind,
    pub charts: ChartSubjects,
    pub transit: Option<TransitSnapshot>,
    pub history: Vec<ConversationTurn>,
    pub question: Option<String>,
    pub plan: PlanTier,
    pub caller_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// True when at least one count came from the character estimate.
    pub estimated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightResult {
    pub text: String,
    pub model: ModelId,
    pub usage: TokenUsage,
    pub cost: f64,
    pub success: bool,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub request_id: RequestId,
    pub model: ModelId,
    pub system_prompt: String,
    pub turns: Vec<ConversationTurn>,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    pub text: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialRef {
    Env { var: String },
    InlineToken { token: String },
    None,
}

#[derive(Debug, Clone)]
pub struct ResolvedCredential {
    pub auth_header: Option<String>,
}

impl ResolvedCredential {
    pub fn none() -> Self {
        Self { auth_header: None }
    }

    pub fn bearer(token: &str) -> Self {
        Self {
            auth_header: Some(format!("Bearer {}", token)),
        }
    }
}

fn default_provider_id() -> String {
    "openai".to_string()
}

fn default_provider_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_credential() -> CredentialRef {
    CredentialRef::Env {
        var: "OPENAI_API_KEY".to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_id")]
    pub id: String,
    #[serde(default = "default_provider_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_credential")]
    pub credential: CredentialRef,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            id: default_provider_id(),
            endpoint: default_provider_endpoint(),
            credential: default_credential(),
        }
    }
}

fn default_high_capability_model() -> ModelId {
    "gpt-4o".to_string()
}

fn default_economical_model() -> ModelId {
    "gpt-4o-mini".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierModels {
    #[serde(default = "default_high_capability_model")]
    pub high_capability: ModelId,
    #[serde(default = "default_economical_model")]
    pub economical: ModelId,
}

impl Default for TierModels {
    fn default() -> Self {
        Self {
            high_capability: default_high_capability_model(),
            economical: default_economical_model(),
        }
    }
}

impl TierModels {
    pub fn tier_for(&self, plan: PlanTier) -> ModelTier {
        match plan {
            PlanTier::Premium => ModelTier::HighCapability,
            PlanTier::Free | PlanTier::Basic => ModelTier::Economical,
        }
    }

    pub fn model(&self, tier: ModelTier) -> &ModelId {
        match tier {
            ModelTier::HighCapability => &self.high_capability,
            ModelTier::Economical => &self.economical,
        }
    }
}

/// USD per one million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

pub fn default_price_table() -> BTreeMap<ModelId, ModelPrice> {
    BTreeMap::from([
        (
            default_high_capability_model(),
            ModelPrice {
                input_per_million: 2.50,
                output_per_million: 10.00,
            },
        ),
        (
            default_economical_model(),
            ModelPrice {
                input_per_million: 0.15,
                output_per_million: 0.60,
            },
        ),
    ])
}

fn default_max_attempts() -> u32 {
    2
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    4_000
}

fn default_attempt_timeout_ms() -> u64 {
    45_000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
        }
    }
}

impl ReliabilityConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms.clamp(1_000, 600_000))
    }
}

fn default_max_output_tokens() -> u32 {
    4_096
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub models: TierModels,
    #[serde(default = "default_price_table")]
    pub pricing: BTreeMap<ModelId, ModelPrice>,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default)]
    pub reliability: ReliabilityConfig,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            models: TierModels::default(),
            pricing: default_price_table(),
            max_output_tokens: default_max_output_tokens(),
            reliability: ReliabilityConfig::default(),
        }
    }
}
