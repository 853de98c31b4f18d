use serde::Serialize;

use crate::error::ProviderError;
use crate::models::SourceProvider;
use crate::services::prompt::{ImageStyle, PromptStyle};
use crate::services::provider::{
    decode_json, read_success_body, GenerationOptions, ImageProvider, ProviderResponse,
    TextProvider,
};

pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

pub const DEFAULT_TEXT_MODELS: &[&str] = &[
    "google/flan-t5-base",
    "facebook/blenderbot-400M-distill",
    "microsoft/DialoGPT-small",
];

pub const DEFAULT_IMAGE_MODELS: &[&str] = &[
    "stabilityai/stable-diffusion-2-1",
    "runwayml/stable-diffusion-v1-5",
    "CompVis/stable-diffusion-v1-4",
];

/// Hosted models are small; a long completion only adds noise.
const TEXT_MAX_NEW_TOKENS: u32 = 500;

#[derive(Debug, Serialize)]
struct InferenceRequest<'a, P: Serialize> {
    inputs: &'a str,
    parameters: P,
    options: InferenceOptions,
}

#[derive(Debug, Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

#[derive(Debug, Serialize)]
struct TextParameters {
    max_new_tokens: u32,
    temperature: f32,
    do_sample: bool,
    return_full_text: bool,
}

#[derive(Debug, Serialize)]
struct ImageParameters {
    guidance_scale: f32,
    num_inference_steps: u32,
}

/// Shared transport for one hosted model.
struct ModelEndpoint {
    api_key: String,
    model: String,
    base_url: String,
    name: String,
    client: reqwest::Client,
}

impl ModelEndpoint {
    fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            name: format!("hugging-face/{}", model),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn post<B: Serialize + Sync>(&self, body: &B) -> Result<reqwest::Response, ProviderError> {
        self.client
            .post(format!("{}/models/{}", self.base_url, self.model))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(&self.name, e))
    }
}

pub struct HuggingFaceTextService {
    endpoint: ModelEndpoint,
}

impl HuggingFaceTextService {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            endpoint: ModelEndpoint::new(api_key, model, base_url),
        }
    }
}

#[async_trait::async_trait]
impl TextProvider for HuggingFaceTextService {
    fn tag(&self) -> SourceProvider {
        SourceProvider::HuggingFace
    }

    fn name(&self) -> &str {
        &self.endpoint.name
    }

    fn prompt_style(&self) -> PromptStyle {
        PromptStyle::Compact
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<ProviderResponse, ProviderError> {
        let request = InferenceRequest {
            inputs: prompt,
            parameters: TextParameters {
                max_new_tokens: options.max_output_tokens.min(TEXT_MAX_NEW_TOKENS),
                temperature: options.temperature,
                do_sample: true,
                return_full_text: false,
            },
            options: InferenceOptions {
                wait_for_model: true,
            },
        };

        log::info!("🤗 Trying Hugging Face text model: {}", self.endpoint.model);

        let response = self.endpoint.post(&request).await?;
        let body = read_success_body(&self.endpoint.name, response).await?;
        let reply = decode_json(&self.endpoint.name, &body)?;

        Ok(ProviderResponse::HuggingFaceText(reply))
    }
}

pub struct HuggingFaceImageService {
    endpoint: ModelEndpoint,
}

impl HuggingFaceImageService {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            endpoint: ModelEndpoint::new(api_key, model, base_url),
        }
    }
}

#[async_trait::async_trait]
impl ImageProvider for HuggingFaceImageService {
    fn name(&self) -> &str {
        &self.endpoint.name
    }

    fn image_style(&self) -> ImageStyle {
        ImageStyle::Diffusion
    }

    async fn generate_image(&self, prompt: &str) -> Result<ProviderResponse, ProviderError> {
        let request = InferenceRequest {
            inputs: prompt,
            parameters: ImageParameters {
                guidance_scale: 7.5,
                num_inference_steps: 50,
            },
            options: InferenceOptions {
                wait_for_model: true,
            },
        };

        log::info!("🎨 Trying Hugging Face image model: {}", self.endpoint.model);

        let response = self.endpoint.post(&request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("❌ {} API error ({}): {}", self.endpoint.name, status, body);
            return Err(ProviderError::from_status(
                &self.endpoint.name,
                status.as_u16(),
                &body,
            ));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::from_reqwest(&self.endpoint.name, e))?;

        log::debug!("🖼️ Received {} bytes of {}", bytes.len(), content_type);

        Ok(ProviderResponse::HuggingFaceImage {
            model: self.endpoint.model.clone(),
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}
