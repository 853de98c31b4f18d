use serde::Serialize;

use crate::error::ProviderError;
use crate::models::SourceProvider;
use crate::services::prompt::PromptStyle;
use crate::services::provider::{
    decode_json, read_success_body, GenerationOptions, ProviderResponse, TextProvider,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

pub struct GeminiService {
    api_key: String,
    model: String,
    base_url: String,
    name: String,
    client: reqwest::Client,
}

impl GeminiService {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            name: format!("gemini/{}", model),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait::async_trait]
impl TextProvider for GeminiService {
    fn tag(&self) -> SourceProvider {
        SourceProvider::Gemini
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn prompt_style(&self) -> PromptStyle {
        PromptStyle::Detailed
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<ProviderResponse, ProviderError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: options.temperature,
                top_k: 40,
                top_p: 0.95,
                max_output_tokens: options.max_output_tokens,
            },
        };

        log::info!("🤖 Sending request to Gemini with model: {}", self.model);
        log::debug!("📤 Prompt size: {} chars", prompt.len());

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(&self.name, e))?;

        let body = read_success_body(&self.name, response).await?;
        let reply = decode_json(&self.name, &body)?;
        log::debug!("✅ Parsed Gemini response successfully");

        Ok(ProviderResponse::Gemini(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(base_url: String) -> GeminiService {
        GeminiService::new(
            "test_key_that_is_long_enough".to_string(),
            DEFAULT_MODEL.to_string(),
            base_url,
        )
    }

    #[tokio::test]
    async fn test_generate_returns_candidate_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "POST",
                "/v1beta/models/gemini-1.5-flash-latest:generateContent",
            )
            .match_header("x-goog-api-key", "test_key_that_is_long_enough")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"generationConfig":{"topK":40,"maxOutputTokens":2048}}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"PREP_TIME: 40"}]}}]}"#)
            .create_async()
            .await;

        let response = service(server.url())
            .generate("prompt", &GenerationOptions::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.into_text(), "PREP_TIME: 40");
    }

    #[tokio::test]
    async fn test_rate_limit_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "POST",
                "/v1beta/models/gemini-1.5-flash-latest:generateContent",
            )
            .with_status(429)
            .with_body(r#"{"error":{"message":"quota"}}"#)
            .create_async()
            .await;

        let err = service(server.url())
            .generate("prompt", &GenerationOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::RateLimited { status: 429, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_undecodable_body_is_unreachable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "POST",
                "/v1beta/models/gemini-1.5-flash-latest:generateContent",
            )
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let err = service(server.url())
            .generate("prompt", &GenerationOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Unreachable { status: None, .. }));
    }
}
