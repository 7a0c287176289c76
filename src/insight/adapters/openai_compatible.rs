use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::{Value, json};

use crate::insight::{
    adapters::{ModelProvider, http_common},
    credentials::CredentialProvider,
    error::{ProviderError, ProviderErrorKind, protocol_violation},
    types::{CompletionRequest, CompletionResponse, ProviderConfig},
};

/// Chat-completions client for OpenAI and API-compatible endpoints.
#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: ProviderConfig,
    credentials: Arc<dyn CredentialProvider>,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        config: ProviderConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, ProviderError> {
        if config.endpoint.trim().is_empty() {
            return Err(ProviderError::new(
                ProviderErrorKind::InvalidRequest,
                "openai-compatible provider requires endpoint",
            )
            .with_retryable(false)
            .with_provider_id(config.id.clone()));
        }

        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| {
                ProviderError::new(
                    ProviderErrorKind::Internal,
                    format!("failed to build http client: {}", err),
                )
                .with_retryable(false)
                .with_provider_id(config.id.clone())
            })?;

        Ok(Self {
            client,
            config,
            credentials,
        })
    }
}

#[async_trait]
impl ModelProvider for OpenAiCompatibleProvider {
    fn provider_id(&self) -> &str {
        &self.config.id
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let provider_id = self.config.id.as_str();
        let credential = self
            .credentials
            .resolve(&self.config.credential, provider_id)
            .await?;

        let url = format!(
            "{}/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        );
        let body = json!({
            "model": request.model,
            "messages": http_common::turns_to_openai(&request.system_prompt, &request.turns),
            "max_tokens": request.max_output_tokens,
            "stream": false,
        });

        let mut req_builder = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-request-id", request.request_id.as_str())
            .json(&body);
        if let Some(auth_header) = credential.auth_header {
            req_builder = req_builder.header(header::AUTHORIZATION, auth_header);
        }

        let response = req_builder.send().await.map_err(|err| {
            let kind = if err.is_timeout() {
                ProviderErrorKind::Timeout
            } else {
                ProviderErrorKind::ProviderTransient
            };
            ProviderError::new(kind, format!("openai-compatible request failed: {}", err))
                .with_retryable(true)
                .with_provider_id(provider_id)
                .with_model(request.model.clone())
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(http_common::map_http_error(status, provider_id, &body)
                .with_model(request.model.clone()));
        }

        let payload: Value = response.json().await.map_err(|err| {
            protocol_violation(format!(
                "failed to decode openai-compatible response: {}",
                err
            ))
            .with_provider_id(provider_id)
            .with_model(request.model.clone())
        })?;

        parse_completion(&payload)
            .map_err(|err| err.with_provider_id(provider_id).with_model(request.model))
    }
}

pub fn parse_completion(payload: &Value) -> Result<CompletionResponse, ProviderError> {
    let choice = payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| protocol_violation("openai-compatible response missing choices"))?;

    let text = choice
        .get("message")
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if text.trim().is_empty() {
        return Err(ProviderError::new(
            ProviderErrorKind::ProviderTransient,
            "openai-compatible response carried no text",
        )
        .with_retryable(true));
    }

    let usage = payload.get("usage");
    Ok(CompletionResponse {
        text,
        input_tokens: usage.and_then(|usage| {
            usage
                .get("prompt_tokens")
                .and_then(Value::as_u64)
                .or_else(|| usage.get("input_tokens").and_then(Value::as_u64))
        }),
        output_tokens: usage.and_then(|usage| {
            usage
                .get("completion_tokens")
                .and_then(Value::as_u64)
                .or_else(|| usage.get("output_tokens").and_then(Value::as_u64))
        }),
    })
}
