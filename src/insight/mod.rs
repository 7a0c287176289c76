pub mod adapters;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod pricing;
pub mod prompts;
pub mod reliability;
pub mod telemetry;
pub mod types;

pub use engine::InsightEngine;
pub use error::{InsightError, InsightGenerationError, ProviderError, ProviderErrorKind};
pub use telemetry::{InsightTelemetryEvent, NoopTelemetrySink, TelemetrySink, TracingTelemetrySink};
pub use types::{
    AnalysisKind, ChartSubjects, ConversationTurn, InsightConfig, InsightRequest, InsightResult,
    ModelTier, PlanTier, TokenUsage,
};
