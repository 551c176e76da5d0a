//! Provider-agnostic reasoning-service integration.
//!
//! Exposes a common [`traits::LlmClient`] interface with form-answering
//! helpers, concrete Gemini and Groq implementations, a rate-limit fallback
//! wrapper, and a readiness factory that builds the configured client.
//!
//! The engine treats every call here as best-effort: failures degrade to an
//! unresolved answer at the resolver boundary, never to a fabricated one.
//!
//! # Examples
//! ```no_run
//! use postule_config::LlmConfig;
//! use postule_llm::ensure_llm_ready;
//!
//! # #[tokio::main]
//! # async fn main() -> postule_common::Result<()> {
//! let client = ensure_llm_ready(&LlmConfig::None).await?;
//! assert!(client.is_none()); // no provider configured: document stage is skipped
//! # Ok(())
//! # }
//! ```

pub mod fallback;
#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "groq")]
pub mod groq;
pub mod traits;

use postule_common::PostuleError;
use postule_config::LlmConfig;
use std::sync::Arc;
use tracing::{info, warn};

use fallback::FallbackClient;
use traits::LlmClient;

/// Build the configured reasoning client and probe its health once.
///
/// `Ok(None)` means no provider is configured, which is a valid setup: the
/// document-grounded resolver stage is simply skipped. An unhealthy probe
/// logs a warning but does not fail startup; transient provider trouble
/// should not keep the whole run from starting.
pub async fn ensure_llm_ready(
    config: &LlmConfig,
) -> postule_common::Result<Option<Arc<dyn LlmClient>>> {
    let client: Arc<dyn LlmClient> = match config {
        LlmConfig::None => return Ok(None),
        #[cfg(feature = "gemini")]
        LlmConfig::Gemini {
            api_key,
            model,
            fallback,
        } => {
            let primary = gemini::GeminiClient::new(api_key.clone(), model.clone())
                .map_err(|e| PostuleError::Config(e.to_string()))?;
            match fallback {
                #[cfg(feature = "groq")]
                Some(fb) => {
                    let secondary = groq::GroqClient::new(fb.api_key.clone(), fb.model.clone())
                        .map_err(|e| PostuleError::Config(e.to_string()))?;
                    Arc::new(FallbackClient::new(Arc::new(primary), Arc::new(secondary)))
                }
                #[cfg(not(feature = "groq"))]
                Some(_) => {
                    return Err(PostuleError::Config(
                        "groq fallback configured but the groq feature is disabled".to_string(),
                    ))
                }
                None => Arc::new(primary),
            }
        }
        #[cfg(feature = "groq")]
        LlmConfig::Groq { api_key, model } => Arc::new(
            groq::GroqClient::new(api_key.clone(), model.clone())
                .map_err(|e| PostuleError::Config(e.to_string()))?,
        ),
        #[allow(unreachable_patterns)]
        _ => {
            return Err(PostuleError::Config(
                "configured LLM provider is not enabled in this build".to_string(),
            ))
        }
    };

    match client.health_check().await {
        Ok(true) => info!(model = client.model_name(), "reasoning service ready"),
        _ => warn!(
            model = client.model_name(),
            "reasoning service health check failed; document-grounded answers may degrade"
        ),
    }
    Ok(Some(client))
}
