use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{
    insight::{
        adapters::ModelProvider,
        error::{InsightError, InsightGenerationError, ProviderError, ProviderErrorKind, timeout},
        pricing::{PriceTable, estimate_tokens},
        prompts,
        reliability::{AttemptOutcome, ReliabilityLayer, RetryState},
        telemetry::{InsightTelemetryEvent, TelemetrySink},
        types::{
            CompletionRequest, CompletionResponse, ConversationTurn, InsightConfig,
            InsightRequest, InsightResult, ModelId, ModelTier, PlanTier, TierModels, TokenUsage,
        },
    },
    usage::{UsageLedger, UsageRecord, types::INSIGHT_SERVICE_NAME},
};

/// Tiered model dispatch with retry, downgrade and per-attempt metering.
///
/// The engine never touches credits; that post-condition belongs to the caller.
#[derive(Clone)]
pub struct InsightEngine {
    provider: Arc<dyn ModelProvider>,
    ledger: Arc<dyn UsageLedger>,
    telemetry: Arc<dyn TelemetrySink>,
    models: TierModels,
    pricing: PriceTable,
    reliability: ReliabilityLayer,
    max_output_tokens: u32,
}

struct AttemptRecord<'a> {
    request_id: &'a str,
    attempt: u32,
    model: &'a str,
    caller_id: Option<&'a str>,
    request: &'a CompletionRequest,
}

impl InsightEngine {
    pub fn new(
        config: &InsightConfig,
        provider: Arc<dyn ModelProvider>,
        ledger: Arc<dyn UsageLedger>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            provider,
            ledger,
            telemetry,
            models: config.models.clone(),
            pricing: PriceTable::new(config.pricing.clone()),
            reliability: ReliabilityLayer::new(config.reliability.clone()),
            max_output_tokens: config.max_output_tokens,
        }
    }

    pub fn models(&self) -> &TierModels {
        &self.models
    }

    /// Builds the prompt for `request` and generates.
    pub async fn analyze(&self, request: &InsightRequest) -> Result<InsightResult, InsightError> {
        let (system_prompt, turns) = prompts::build_conversation(request)?;
        Ok(self
            .generate(
                &system_prompt,
                &turns,
                request.plan,
                request.caller_id.as_deref(),
            )
            .await?)
    }

    pub async fn generate(
        &self,
        system_prompt: &str,
        turns: &[ConversationTurn],
        plan: PlanTier,
        caller_id: Option<&str>,
    ) -> Result<InsightResult, InsightGenerationError> {
        let request_id = Uuid::now_v7().to_string();
        let primary = self.models.tier_for(plan);
        let max_attempts = self.reliability.max_attempts();
        self.telemetry.on_event(InsightTelemetryEvent::RequestStarted {
            request_id: request_id.clone(),
            model: self.models.model(primary).clone(),
            caller_id: caller_id.map(str::to_string),
        });

        let mut state = RetryState::initial();
        let mut last_failure: Option<(ModelId, ProviderError)> = None;

        while let (Some(attempt), Some(tier)) = (state.attempt(), state.tier(primary)) {
            let model = self.models.model(tier).clone();
            self.telemetry.on_event(InsightTelemetryEvent::AttemptStarted {
                request_id: request_id.clone(),
                attempt,
                model: model.clone(),
            });

            let request = CompletionRequest {
                request_id: request_id.clone(),
                model: model.clone(),
                system_prompt: system_prompt.to_string(),
                turns: turns.to_vec(),
                max_output_tokens: self.max_output_tokens,
            };
            let record = AttemptRecord {
                request_id: &request_id,
                attempt,
                model: &model,
                caller_id,
                request: &request,
            };

            let outcome = match tokio::time::timeout(
                self.reliability.attempt_timeout(),
                self.provider.complete(request.clone()),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(timeout(format!(
                    "attempt exceeded {} ms",
                    self.reliability.attempt_timeout().as_millis()
                ))
                .with_provider_id(self.provider.provider_id())
                .with_model(model.clone())),
            };

            match outcome {
                Ok(response) => {
                    let (usage, cost) = self.record_success(&record, &response).await;
                    let attempts = match state
                        .advance(AttemptOutcome::Succeeded, primary, max_attempts)
                        .next
                    {
                        RetryState::Succeeded { attempts } => attempts,
                        _ => attempt,
                    };
                    self.telemetry
                        .on_event(InsightTelemetryEvent::RequestCompleted {
                            request_id: request_id.clone(),
                            attempts,
                            model: model.clone(),
                            usage,
                            cost,
                            caller_id: caller_id.map(str::to_string),
                        });
                    return Ok(InsightResult {
                        text: response.text,
                        model,
                        usage,
                        cost,
                        success: true,
                        attempts,
                    });
                }
                Err(err) => {
                    self.record_failure(&record, &err).await;
                    self.telemetry.on_event(InsightTelemetryEvent::AttemptFailed {
                        request_id: request_id.clone(),
                        attempt,
                        model: model.clone(),
                        kind: err.kind,
                        retryable: err.retryable,
                    });

                    let transition = state.advance(AttemptOutcome::Failed, primary, max_attempts);
                    if let RetryState::TryFallback { .. } = transition.next
                        && tier == ModelTier::HighCapability
                    {
                        self.telemetry
                            .on_event(InsightTelemetryEvent::ModelDowngraded {
                                request_id: request_id.clone(),
                                from: model.clone(),
                                to: self.models.economical.clone(),
                            });
                    }
                    if transition.backoff {
                        tokio::time::sleep(self.reliability.backoff_delay(attempt)).await;
                    }
                    last_failure = Some((model, err));
                    state = transition.next;
                }
            }
        }

        let attempts = match state {
            RetryState::Failed { attempts } | RetryState::Succeeded { attempts } => attempts,
            RetryState::TryPrimary { attempt } | RetryState::TryFallback { attempt } => attempt,
        };
        let (model, last_error) = last_failure.unwrap_or_else(|| {
            (
                self.models.model(primary).clone(),
                ProviderError::new(
                    ProviderErrorKind::Internal,
                    "retry loop ended without an attempt",
                ),
            )
        });
        self.telemetry.on_event(InsightTelemetryEvent::RequestFailed {
            request_id,
            attempts,
            error_kind: last_error.kind,
            caller_id: caller_id.map(str::to_string),
        });
        Err(InsightGenerationError {
            attempts,
            model,
            last_error,
        })
    }

    async fn record_success(
        &self,
        record: &AttemptRecord<'_>,
        response: &CompletionResponse,
    ) -> (TokenUsage, f64) {
        let estimated_input = estimate_request_tokens(record.request);
        let usage = TokenUsage {
            input_tokens: response.input_tokens.unwrap_or(estimated_input),
            output_tokens: response
                .output_tokens
                .unwrap_or_else(|| estimate_tokens(&response.text)),
            estimated: response.input_tokens.is_none() || response.output_tokens.is_none(),
        };
        let cost = self.pricing.cost(record.model, &usage);
        self.write_record(
            record,
            usage,
            cost,
            None,
            json!({
                "text": response.text,
                "input_tokens": response.input_tokens,
                "output_tokens": response.output_tokens,
            }),
        )
        .await;
        (usage, cost)
    }

    async fn record_failure(&self, record: &AttemptRecord<'_>, err: &ProviderError) {
        let usage = TokenUsage {
            input_tokens: estimate_request_tokens(record.request),
            output_tokens: 0,
            estimated: true,
        };
        let cost = self.pricing.cost(record.model, &usage);
        self.write_record(
            record,
            usage,
            cost,
            Some(err.to_string()),
            json!({
                "error_kind": err.kind.as_str(),
                "retryable": err.retryable,
                "http_status": err.provider_http_status,
            }),
        )
        .await;
    }

    async fn write_record(
        &self,
        record: &AttemptRecord<'_>,
        usage: TokenUsage,
        cost: f64,
        error_message: Option<String>,
        response_payload: serde_json::Value,
    ) {
        let entry = UsageRecord {
            caller_id: record.caller_id.map(str::to_string),
            service_name: INSIGHT_SERVICE_NAME.to_string(),
            endpoint: record.model.to_string(),
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            cost,
            success: error_message.is_none(),
            error_message,
            request_payload: json!({
                "request_id": record.request_id,
                "attempt": record.attempt,
                "model": record.model,
                "system_prompt": record.request.system_prompt,
                "turns": record.request.turns,
                "max_output_tokens": record.request.max_output_tokens,
            }),
            response_payload,
            timestamp: Utc::now(),
        };

        if let Err(err) = self.ledger.record(entry).await {
            tracing::error!(
                target: "usage",
                request_id = %record.request_id,
                attempt = record.attempt,
                error = %err,
                "usage_record_failed"
            );
        }
    }
}

fn estimate_request_tokens(request: &CompletionRequest) -> u64 {
    estimate_tokens(&request.system_prompt)
        + request
            .turns
            .iter()
            .map(|turn| estimate_tokens(&turn.content))
            .sum::<u64>()
}
