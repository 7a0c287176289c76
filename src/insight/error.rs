use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::insight::types::ModelId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    InvalidRequest,
    Authentication,
    Authorization,
    RateLimited,
    Timeout,
    ProviderTransient,
    ProviderPermanent,
    ProtocolViolation,
    Internal,
}

impl ProviderErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderErrorKind::InvalidRequest => "invalid_request",
            ProviderErrorKind::Authentication => "authentication",
            ProviderErrorKind::Authorization => "authorization",
            ProviderErrorKind::RateLimited => "rate_limited",
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::ProviderTransient => "provider_transient",
            ProviderErrorKind::ProviderPermanent => "provider_permanent",
            ProviderErrorKind::ProtocolViolation => "protocol_violation",
            ProviderErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub retryable: bool,
    pub provider_id: Option<String>,
    pub model: Option<ModelId>,
    pub provider_http_status: Option<u16>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: matches!(
                kind,
                ProviderErrorKind::RateLimited
                    | ProviderErrorKind::Timeout
                    | ProviderErrorKind::ProviderTransient
            ),
            provider_id: None,
            model: None,
            provider_http_status: None,
        }
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<ModelId>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_provider_http_status(mut self, status: u16) -> Self {
        self.provider_http_status = Some(status);
        self
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.provider_id, &self.model) {
            (Some(provider_id), Some(model)) => {
                write!(
                    f,
                    "{} (provider={}, model={})",
                    self.message, provider_id, model
                )
            }
            (Some(provider_id), None) => write!(f, "{} (provider={})", self.message, provider_id),
            (None, Some(model)) => write!(f, "{} (model={})", self.message, model),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

pub fn invalid_request(message: impl Into<String>) -> ProviderError {
    ProviderError::new(ProviderErrorKind::InvalidRequest, message).with_retryable(false)
}

pub fn timeout(message: impl Into<String>) -> ProviderError {
    ProviderError::new(ProviderErrorKind::Timeout, message).with_retryable(true)
}

pub fn protocol_violation(message: impl Into<String>) -> ProviderError {
    ProviderError::new(ProviderErrorKind::ProtocolViolation, message).with_retryable(false)
}

/// Every attempt failed; `last_error` is what the final attempt saw.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("insight generation failed after {attempts} attempt(s) on {model}: {last_error}")]
pub struct InsightGenerationError {
    pub attempts: u32,
    pub model: ModelId,
    #[source]
    pub last_error: ProviderError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsightError {
    #[error("unknown analysis kind '{0}'")]
    UnknownAnalysisKind(String),
    #[error("invalid insight request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Generation(#[from] InsightGenerationError),
}
