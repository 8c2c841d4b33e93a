use thiserror::Error;

/// Why a raw credential could not be turned into a usable key.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationError {
    #[error("credential is empty or a placeholder")]
    Placeholder,

    #[error("credential does not look like a provider key")]
    BadFormat,
}

/// Failure talking to the provider's HTTP API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Rate limited by provider (retry after {retry_after_seconds:?}s)")]
    RateLimited { retry_after_seconds: Option<u64> },

    #[error("Failed to decode provider response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompletionError {
    #[error("AI provider is not authenticated")]
    NotAuthenticated,

    #[error("Provider returned an empty completion")]
    EmptyResponse,

    #[error("Provider error: {0}")]
    Provider(#[from] TransportError),

    #[error("Completion call was cancelled")]
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("AI provider is not authenticated")]
    NotAuthenticated,

    #[error("Signal response is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("Signal field `{field}` has invalid value {value}")]
    SchemaViolation {
        field: String,
        value: serde_json::Value,
    },

    #[error("Completion failed: {0}")]
    Completion(CompletionError),
}

impl SignalError {
    pub fn violation(field: &str, value: serde_json::Value) -> Self {
        SignalError::SchemaViolation {
            field: field.to_string(),
            value,
        }
    }
}

impl From<CompletionError> for SignalError {
    fn from(e: CompletionError) -> Self {
        match e {
            CompletionError::NotAuthenticated => SignalError::NotAuthenticated,
            other => SignalError::Completion(other),
        }
    }
}
