use crate::traits::{LlmClient, LlmError, LlmResponse, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiResponseContent,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiUsageMetadata {
    #[serde(rename = "totalTokenCount")]
    total_token_count: Option<u32>,
}

/// Google Gemini API client. Primary provider for document-grounded answers.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Self::with_base_url(GEMINI_BASE_URL.to_string(), api_key, model)
    }

    /// Point the client at an alternative endpoint (HTTP test doubles).
    pub fn with_base_url(base_url: String, api_key: String, model: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| LlmError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let generation_config = if max_tokens.is_some() || temperature.is_some() {
            Some(GeminiGenerationConfig {
                temperature,
                max_output_tokens: max_tokens,
            })
        } else {
            None
        };

        let system_instruction = system_prompt.map(|sys_prompt| GeminiSystemInstruction {
            parts: vec![GeminiPart {
                text: sys_prompt.to_string(),
            }],
        });

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config,
            system_instruction,
        };

        tracing::debug!(model = %self.model, "sending Gemini request");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                429 => LlmError::RateLimit,
                401 => LlmError::Config("invalid API key".to_string()),
                403 => LlmError::Config("API access forbidden".to_string()),
                _ => LlmError::Api(format!("Gemini API error ({status}): {error_text}")),
            });
        }

        let gemini_response: GeminiResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Api(format!("failed to parse Gemini response: {e}")))?;

        let candidate = gemini_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Api("no candidates returned from Gemini".to_string()))?;

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(LlmError::Api(
                "content blocked by Gemini safety filters".to_string(),
            ));
        }

        let text = candidate
            .content
            .parts
            .into_iter()
            .next()
            .map(|p| p.text)
            .ok_or_else(|| LlmError::Api("no content parts in Gemini response".to_string()))?;

        Ok(LlmResponse {
            text,
            model: Some(self.model.clone()),
            tokens_used: gemini_response
                .usage_metadata
                .and_then(|u| u.total_token_count),
            confidence: None,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        match self
            .generate("Respond with just 'OK'", None, Some(5), Some(0.1))
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Gemini health check failed: {e}");
                Ok(false)
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::with_base_url(server.uri(), "test-key".into(), "gemini-2.0-flash".into())
            .unwrap()
    }

    #[tokio::test]
    async fn parses_text_and_token_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"parts": [{"text": "3"}]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {"totalTokenCount": 42}
            })))
            .mount(&server)
            .await;

        let response = client_for(&server)
            .generate("Years with React?", None, Some(10), Some(0.1))
            .await
            .unwrap();
        assert_eq!(response.text, "3");
        assert_eq!(response.tokens_used, Some(42));
    }

    #[tokio::test]
    async fn quota_exhaustion_maps_to_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("RESOURCE_EXHAUSTED"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate("q", None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::RateLimit));
    }

    #[tokio::test]
    async fn bad_key_maps_to_config_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate("q", None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Config(_)));
    }

    // Live smoke test; run with --ignored and GEMINI_API_KEY set.
    #[tokio::test]
    #[ignore]
    async fn live_generate_smoke() {
        let Ok(api_key) = std::env::var("GEMINI_API_KEY") else {
            return;
        };
        let client = GeminiClient::new(api_key, "gemini-2.0-flash".into()).unwrap();
        let response = client
            .generate("Respond with just 'OK'", None, Some(5), Some(0.0))
            .await
            .unwrap();
        assert!(!response.text.trim().is_empty());
    }

    #[tokio::test]
    async fn empty_candidate_list_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate("q", None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Api(_)));
    }
}
