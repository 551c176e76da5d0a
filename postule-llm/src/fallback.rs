use crate::traits::{LlmClient, LlmError, LlmResponse, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Two-provider client: every call goes to the primary; the secondary is
/// consulted only when the primary reports a rate limit. Other failures
/// propagate unchanged so misconfiguration stays visible.
pub struct FallbackClient {
    primary: Arc<dyn LlmClient>,
    secondary: Arc<dyn LlmClient>,
}

impl FallbackClient {
    pub fn new(primary: Arc<dyn LlmClient>, secondary: Arc<dyn LlmClient>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl LlmClient for FallbackClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        match self
            .primary
            .generate(prompt, system_prompt, max_tokens, temperature)
            .await
        {
            Err(LlmError::RateLimit) => {
                warn!(
                    primary = self.primary.model_name(),
                    secondary = self.secondary.model_name(),
                    "primary rate-limited; retrying on secondary"
                );
                self.secondary
                    .generate(prompt, system_prompt, max_tokens, temperature)
                    .await
            }
            other => other,
        }
    }

    async fn health_check(&self) -> Result<bool> {
        if self.primary.health_check().await.unwrap_or(false) {
            return Ok(true);
        }
        self.secondary.health_check().await
    }

    fn model_name(&self) -> &str {
        self.primary.model_name()
    }
}
