use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use testloom_core::{GenerationError, TextGenerator};

use crate::{decode_error, request_error, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini `generateContent` backend
///
/// The key travels in the `x-goog-api-key` header, never in the URL.
#[derive(Clone)]
pub struct GeminiClient {
    pub name: String,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            name: format!("Gemini {}", model),
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_string(),
            model,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a preconfigured HTTP client (proxy, TLS or timeout settings)
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = http_client;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request(&self, prompt: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f64,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiContent,
}

impl GeminiResponse {
    /// Text of every part of the first candidate
    fn into_fragments(self) -> Vec<String> {
        self.candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<Vec<String>, GenerationError> {
        let response = self
            .http_client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(client = %self.name, %status, "Gemini API error");
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: GeminiResponse = response.json().await.map_err(decode_error)?;
        Ok(completion.into_fragments())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let client = GeminiClient::new("k", "gemini-1.5-flash")
            .with_temperature(0.7)
            .with_max_tokens(64);
        let body = serde_json::to_value(client.build_request("hello")).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["temperature"], 0.7);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 64);
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new("secret", "gemini-pro").with_base_url("http://localhost:9/v1/");
        assert_eq!(
            client.endpoint(),
            "http://localhost:9/v1/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = GeminiClient::new("SUPERSECRETKEY", "gemini-pro");
        let debug = format!("{:?}", client);
        assert!(debug.contains("gemini-pro"));
        assert!(!debug.contains("SUPERSECRETKEY"));
    }

    #[test]
    fn test_fragments_from_first_candidate() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates": [
                {"content": {"role": "model", "parts": [{"text": "Test Case "}, {"text": "Description"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(response.into_fragments(), vec!["Test Case ", "Description"]);
    }

    #[test]
    fn test_blocked_response_has_no_fragments() {
        let response: GeminiResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert!(response.into_fragments().is_empty());

        let response: GeminiResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).unwrap();
        assert!(response.into_fragments().is_empty());
    }
}
