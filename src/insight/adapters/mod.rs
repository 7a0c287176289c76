use std::sync::Arc;

use async_trait::async_trait;

use crate::insight::{
    credentials::CredentialProvider,
    error::ProviderError,
    types::{CompletionRequest, CompletionResponse, ProviderConfig},
};

pub mod http_common;
pub mod openai_compatible;

/// One non-streaming chat completion against a model provider.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn provider_id(&self) -> &str;

    async fn complete(&self, request: CompletionRequest)
    -> Result<CompletionResponse, ProviderError>;
}

pub fn build_provider(
    config: &ProviderConfig,
    credentials: Arc<dyn CredentialProvider>,
) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    let provider = openai_compatible::OpenAiCompatibleProvider::new(config.clone(), credentials)?;
    Ok(Arc::new(provider))
}
