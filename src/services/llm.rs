//! Hosted language model client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, LlmError};
use crate::models::LlmConfig;

/// Generates an answer for a fully assembled prompt.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Google Generative Language API (`models/{model}:generateContent`).
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
}

impl GeminiClient {
    /// Build a client, reading the API key from the configured environment variable.
    pub fn new(config: &LlmConfig) -> Result<Self, ConfigError> {
        let api_key = config.api_key()?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &LlmConfig, api_key: String) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::ValidationError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        tracing::debug!(model = %self.model, prompt_chars = prompt.chars().count(), "calling LLM");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        extract_text(parsed)
    }
}

/// Concatenated text of the first candidate.
fn extract_text(response: GenerateResponse) -> Result<String, LlmError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(LlmError::Refused(reason));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(LlmError::Refused(
            candidate
                .finish_reason
                .unwrap_or_else(|| "empty response".to_string()),
        ));
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<String, LlmError> {
        extract_text(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_request_body_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: "hello" }],
            }],
            generation_config: GenerationConfig { temperature: 1.0 },
        };
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["generationConfig"]["temperature"], 1.0);
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let text = parse(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Spray "},{"text":"propiconazole."}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(text, "Spray propiconazole.");
    }

    #[test]
    fn test_blocked_prompt_is_refused() {
        let err = parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap_err();
        assert!(matches!(err, LlmError::Refused(ref r) if r == "SAFETY"));
    }

    #[test]
    fn test_empty_candidate_is_refused() {
        let err = parse(r#"{"candidates":[{"finishReason":"RECITATION"}]}"#).unwrap_err();
        assert!(matches!(err, LlmError::Refused(ref r) if r == "RECITATION"));
    }

    #[test]
    fn test_endpoint() {
        let config = LlmConfig {
            base_url: "https://example.test/v1beta/".to_string(),
            ..Default::default()
        };
        let client = GeminiClient::with_api_key(&config, "key".to_string()).unwrap();
        assert_eq!(
            client.endpoint(),
            format!(
                "https://example.test/v1beta/models/{}:generateContent",
                config.model
            )
        );
    }

    #[test]
    fn test_missing_api_key() {
        let config = LlmConfig {
            api_key_env: "CROPSENSE_TEST_UNSET_API_KEY".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            GeminiClient::new(&config),
            Err(ConfigError::MissingApiKey(_))
        ));
    }
}
