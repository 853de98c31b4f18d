use std::time::Duration;

/// Failure of a single provider round-trip.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} unreachable: {reason}")]
    Unreachable {
        provider: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("{provider} rate limited (HTTP {status})")]
    RateLimited { provider: String, status: u16 },
}

impl ProviderError {
    pub fn unreachable(provider: &str, reason: impl Into<String>) -> Self {
        Self::Unreachable {
            provider: provider.to_string(),
            status: None,
            reason: reason.into(),
        }
    }

    pub fn timed_out(provider: &str, after: Duration) -> Self {
        Self::unreachable(provider, format!("timed out after {:?}", after))
    }

    /// Map a non-2xx response. 429 and 503 mean the vendor is throttling us.
    pub fn from_status(provider: &str, status: u16, body: &str) -> Self {
        match status {
            429 | 503 => Self::RateLimited {
                provider: provider.to_string(),
                status,
            },
            _ => Self::Unreachable {
                provider: provider.to_string(),
                status: Some(status),
                reason: format!("HTTP {}: {}", status, truncate(body, 200)),
            },
        }
    }

    pub fn from_reqwest(provider: &str, err: reqwest::Error) -> Self {
        Self::Unreachable {
            provider: provider.to_string(),
            status: err.status().map(|s| s.as_u16()),
            reason: err.to_string(),
        }
    }

    /// Throttling, transport failures and 5xx may succeed on another attempt; 4xx will not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Unreachable { status: None, .. } => true,
            Self::Unreachable {
                status: Some(code), ..
            } => *code >= 500,
        }
    }
}

/// Why the orchestrator moved past a provider.
#[derive(Debug, thiserror::Error)]
pub enum AttemptFailure {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("{provider} answered without a usable result")]
    ParseIncomplete { provider: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no usable API key for any text provider")]
    ConfigurationMissing,

    #[error("{variable} is set but invalid: {reason}")]
    InvalidKey {
        variable: &'static str,
        reason: &'static str,
    },
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
