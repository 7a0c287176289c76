use crate::insight::{
    error::ProviderErrorKind,
    types::{ModelId, RequestId, TokenUsage},
};

#[derive(Debug, Clone)]
pub enum InsightTelemetryEvent {
    RequestStarted {
        request_id: RequestId,
        model: ModelId,
        caller_id: Option<String>,
    },
    AttemptStarted {
        request_id: RequestId,
        attempt: u32,
        model: ModelId,
    },
    AttemptFailed {
        request_id: RequestId,
        attempt: u32,
        model: ModelId,
        kind: ProviderErrorKind,
        retryable: bool,
    },
    ModelDowngraded {
        request_id: RequestId,
        from: ModelId,
        to: ModelId,
    },
    RequestCompleted {
        request_id: RequestId,
        attempts: u32,
        model: ModelId,
        usage: TokenUsage,
        cost: f64,
        caller_id: Option<String>,
    },
    RequestFailed {
        request_id: RequestId,
        attempts: u32,
        error_kind: ProviderErrorKind,
        caller_id: Option<String>,
    },
}

pub trait TelemetrySink: Send + Sync {
    fn on_event(&self, event: InsightTelemetryEvent);
}

#[derive(Default)]
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    fn on_event(&self, _event: InsightTelemetryEvent) {}
}

/// Writes each event as a structured `tracing` record under the `insight` target.
#[derive(Default)]
pub struct TracingTelemetrySink;

impl TelemetrySink for TracingTelemetrySink {
    fn on_event(&self, event: InsightTelemetryEvent) {
        match event {
            InsightTelemetryEvent::RequestStarted {
                request_id,
                model,
                caller_id,
            } => {
                tracing::info!(
                    target: "insight",
                    request_id = %request_id,
                    model = %model,
                    caller_id = caller_id.as_deref().unwrap_or("-"),
                    "request_started"
                );
            }
            InsightTelemetryEvent::AttemptStarted {
                request_id,
                attempt,
                model,
            } => {
                tracing::debug!(
                    target: "insight",
                    request_id = %request_id,
                    attempt,
                    model = %model,
                    "attempt_started"
                );
            }
            InsightTelemetryEvent::AttemptFailed {
                request_id,
                attempt,
                model,
                kind,
                retryable,
            } => {
                tracing::warn!(
                    target: "insight",
                    request_id = %request_id,
                    attempt,
                    model = %model,
                    kind = kind.as_str(),
                    retryable,
                    "attempt_failed"
                );
            }
            InsightTelemetryEvent::ModelDowngraded {
                request_id,
                from,
                to,
            } => {
                tracing::warn!(
                    target: "insight",
                    request_id = %request_id,
                    from = %from,
                    to = %to,
                    "model_downgraded"
                );
            }
            InsightTelemetryEvent::RequestCompleted {
                request_id,
                attempts,
                model,
                usage,
                cost,
                caller_id,
            } => {
                tracing::info!(
                    target: "insight",
                    request_id = %request_id,
                    attempts,
                    model = %model,
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    estimated = usage.estimated,
                    cost,
                    caller_id = caller_id.as_deref().unwrap_or("-"),
                    "request_completed"
                );
            }
            InsightTelemetryEvent::RequestFailed {
                request_id,
                attempts,
                error_kind,
                caller_id,
            } => {
                tracing::error!(
                    target: "insight",
                    request_id = %request_id,
                    attempts,
                    error_kind = error_kind.as_str(),
                    caller_id = caller_id.as_deref().unwrap_or("-"),
                    "request_failed"
                );
            }
        }
    }
}
