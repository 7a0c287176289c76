use std::env;

use async_trait::async_trait;

use crate::insight::{
    error::{ProviderError, ProviderErrorKind, invalid_request},
    types::{CredentialRef, ResolvedCredential},
};

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn resolve(
        &self,
        reference: &CredentialRef,
        provider_id: &str,
    ) -> Result<ResolvedCredential, ProviderError>;
}

#[derive(Default)]
pub struct EnvCredentialProvider;

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn resolve(
        &self,
        reference: &CredentialRef,
        provider_id: &str,
    ) -> Result<ResolvedCredential, ProviderError> {
        match reference {
            CredentialRef::Env { var } => {
                let token = env::var(var).map_err(|_| {
                    ProviderError::new(
                        ProviderErrorKind::Authentication,
                        format!(
                            "missing credential environment variable {} for provider {}",
                            var, provider_id
                        ),
                    )
                    .with_retryable(false)
                    .with_provider_id(provider_id)
                })?;
                if token.trim().is_empty() {
                    return Err(ProviderError::new(
                        ProviderErrorKind::Authentication,
                        format!("credential environment variable {} is empty", var),
                    )
                    .with_retryable(false)
                    .with_provider_id(provider_id));
                }
                Ok(ResolvedCredential::bearer(token.trim()))
            }
            CredentialRef::InlineToken { token } => {
                if token.trim().is_empty() {
                    return Err(invalid_request("inline credential token cannot be empty")
                        .with_provider_id(provider_id));
                }
                Ok(ResolvedCredential::bearer(token.trim()))
            }
            CredentialRef::None => Ok(ResolvedCredential::none()),
        }
    }
}
