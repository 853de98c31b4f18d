use base64::{engine::general_purpose, Engine};
use serde::Deserialize;

use crate::error::ProviderError;
use crate::models::{GeneratedImage, SourceProvider};
use crate::services::prompt::{ImageStyle, PromptStyle};

#[derive(Debug, Clone, Copy)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_output_tokens: 2048,
        }
    }
}

/// A backend that can produce text completions.
#[async_trait::async_trait]
pub trait TextProvider: Send + Sync {
    /// Tag recorded as `sourceProvider` when this provider's answer is accepted.
    fn tag(&self) -> SourceProvider;

    /// Human-readable name for logs, e.g. `hugging-face/google/flan-t5-base`.
    fn name(&self) -> &str;

    fn prompt_style(&self) -> PromptStyle;

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<ProviderResponse, ProviderError>;
}

/// A backend that can produce an illustration.
#[async_trait::async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;

    fn image_style(&self) -> ImageStyle;

    async fn generate_image(&self, prompt: &str) -> Result<ProviderResponse, ProviderError>;
}

// Vendor reply shapes. Only the fields we read are declared.

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiReply {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiCandidate {
    pub content: Option<GeminiContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiContent {
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiPart {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HuggingFaceReply {
    Batch(Vec<HuggingFaceGeneration>),
    Single(HuggingFaceGeneration),
}

#[derive(Debug, Clone, Deserialize)]
pub struct HuggingFaceGeneration {
    pub generated_text: Option<String>,
    pub summary_text: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiImagesReply {
    #[serde(default)]
    pub data: Vec<OpenAiImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiImage {
    pub url: Option<String>,
    pub b64_json: Option<String>,
}

/// Raw answer of one provider call, one variant per vendor shape.
#[derive(Debug, Clone)]
pub enum ProviderResponse {
    Gemini(GeminiReply),
    HuggingFaceText(HuggingFaceReply),
    HuggingFaceImage {
        model: String,
        content_type: String,
        bytes: Vec<u8>,
    },
    OpenAiImage {
        model: String,
        reply: OpenAiImagesReply,
    },
}

impl ProviderResponse {
    /// Canonical completion text. A reply without text is empty, not an error: the parser
    /// reports it as incomplete.
    pub fn into_text(self) -> String {
        match self {
            ProviderResponse::Gemini(reply) => reply
                .candidates
                .into_iter()
                .next()
                .and_then(|c| c.content)
                .and_then(|content| content.parts.into_iter().find_map(|p| p.text))
                .unwrap_or_default(),
            ProviderResponse::HuggingFaceText(reply) => {
                let first = match reply {
                    HuggingFaceReply::Batch(items) => items.into_iter().next(),
                    HuggingFaceReply::Single(item) => Some(item),
                };
                first
                    .and_then(|g| {
                        if let Some(error) = &g.error {
                            log::warn!("⚠️ Hugging Face reported an error: {}", error);
                        }
                        g.generated_text.or(g.summary_text)
                    })
                    .unwrap_or_default()
            }
            ProviderResponse::HuggingFaceImage { .. } | ProviderResponse::OpenAiImage { .. } => {
                String::new()
            }
        }
    }

    /// Canonical image handle, `None` when the reply carries no picture.
    pub fn into_image(self) -> Option<GeneratedImage> {
        match self {
            ProviderResponse::HuggingFaceImage {
                model,
                content_type,
                bytes,
            } => {
                if bytes.is_empty() || !content_type.starts_with("image/") {
                    return None;
                }
                Some(GeneratedImage {
                    uri: format!(
                        "data:{};base64,{}",
                        content_type,
                        general_purpose::STANDARD.encode(&bytes)
                    ),
                    provider: format!("hugging-face/{}", model),
                })
            }
            ProviderResponse::OpenAiImage { model, reply } => {
                let image = reply.data.into_iter().next()?;
                let uri = match (image.url, image.b64_json) {
                    (Some(url), _) => url,
                    (None, Some(b64)) => format!("data:image/png;base64,{}", b64),
                    (None, None) => return None,
                };
                Some(GeneratedImage {
                    uri,
                    provider: format!("openai/{}", model),
                })
            }
            ProviderResponse::Gemini(_) | ProviderResponse::HuggingFaceText(_) => None,
        }
    }
}

/// Read a response body, turning non-2xx into the matching `ProviderError`.
pub(crate) async fn read_success_body(
    provider: &str,
    response: reqwest::Response,
) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, e))?;

    log::debug!("📥 {} response status: {} ({} bytes)", provider, status, body.len());

    if !status.is_success() {
        log::error!("❌ {} API error ({}): {}", provider, status, body);
        return Err(ProviderError::from_status(provider, status.as_u16(), &body));
    }

    Ok(body)
}

pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(
    provider: &str,
    body: &str,
) -> Result<T, ProviderError> {
    serde_json::from_str(body)
        .map_err(|e| ProviderError::unreachable(provider, format!("undecodable reply: {}", e)))
}
