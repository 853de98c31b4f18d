use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::error::ConfigError;
use crate::services::retry::RetryPolicy;
use crate::services::{gemini, huggingface, openai};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,

    pub hf_api_key: Option<String>,
    pub hf_base_url: String,
    pub hf_text_models: Vec<String>,
    pub hf_image_models: Vec<String>,

    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_image_model: String,

    pub retry: RetryPolicy,
    pub bind_addr: SocketAddr,
    pub recipe_data_path: PathBuf,
    pub cors_allow_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        // Keys are also accepted under the front-end build names.
        let key = |name: &'static str| var(name).or_else(|| var(&format!("VITE_{}", name)));

        let gemini_api_key = accept_key("GEMINI_API_KEY", key("GEMINI_API_KEY"), validate_plain_key);
        let hf_api_key = accept_key("HF_API_KEY", key("HF_API_KEY"), validate_hf_key);
        let openai_api_key = accept_key("OPENAI_API_KEY", key("OPENAI_API_KEY"), validate_plain_key);

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: parse_or("PROVIDER_MAX_ATTEMPTS", var("PROVIDER_MAX_ATTEMPTS"), defaults.max_attempts),
            call_timeout: Duration::from_secs(parse_or(
                "PROVIDER_TIMEOUT_SECS",
                var("PROVIDER_TIMEOUT_SECS"),
                defaults.call_timeout.as_secs(),
            )),
            ..defaults
        };

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be a socket address such as 0.0.0.0:8080")?;

        Ok(Self {
            gemini_api_key,
            gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string()),
            gemini_base_url: var("GEMINI_BASE_URL")
                .unwrap_or_else(|| gemini::DEFAULT_BASE_URL.to_string()),

            hf_api_key,
            hf_base_url: var("HF_BASE_URL")
                .unwrap_or_else(|| huggingface::DEFAULT_BASE_URL.to_string()),
            hf_text_models: model_list(var("HF_TEXT_MODELS"), huggingface::DEFAULT_TEXT_MODELS),
            hf_image_models: model_list(var("HF_IMAGE_MODELS"), huggingface::DEFAULT_IMAGE_MODELS),

            openai_api_key,
            openai_base_url: var("OPENAI_BASE_URL")
                .unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_string()),
            openai_image_model: var("OPENAI_IMAGE_MODEL")
                .unwrap_or_else(|| openai::DEFAULT_IMAGE_MODEL.to_string()),

            retry,
            bind_addr,
            recipe_data_path: var("RECIPE_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/recipes.json")),
            cors_allow_origin: var("CORS_ALLOW_ORIGIN"),
        })
    }

    /// Fails with `ConfigurationMissing` when no text provider can be built.
    pub fn require_text_provider(&self) -> Result<(), ConfigError> {
        let has_hf_models = self.hf_api_key.is_some() && !self.hf_text_models.is_empty();
        if self.gemini_api_key.is_some() || has_hf_models {
            Ok(())
        } else {
            Err(ConfigError::ConfigurationMissing)
        }
    }
}

pub fn validate_plain_key(variable: &'static str, key: &str) -> Result<(), ConfigError> {
    if key.len() > 20 {
        Ok(())
    } else {
        Err(ConfigError::InvalidKey {
            variable,
            reason: "must be longer than 20 characters",
        })
    }
}

pub fn validate_hf_key(variable: &'static str, key: &str) -> Result<(), ConfigError> {
    if !key.starts_with("hf_") {
        return Err(ConfigError::InvalidKey {
            variable,
            reason: "must start with hf_",
        });
    }
    validate_plain_key(variable, key)
}

fn accept_key(
    variable: &'static str,
    value: Option<String>,
    validate: fn(&'static str, &str) -> Result<(), ConfigError>,
) -> Option<String> {
    let value = value?;
    match validate(variable, &value) {
        Ok(()) => Some(value),
        Err(e) => {
            log::warn!("⚠️ Ignoring {}", e);
            None
        }
    }
}

fn parse_or<T: std::str::FromStr + Copy + std::fmt::Display>(
    variable: &str,
    value: Option<String>,
    default: T,
) -> T {
    match value {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("⚠️ {}={} is not a number, using {}", variable, raw, default);
            default
        }),
    }
}

fn model_list(value: Option<String>, defaults: &[&str]) -> Vec<String> {
    match value {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from)
            .collect(),
        None => defaults.iter().map(|m| m.to_string()).collect(),
    }
}
