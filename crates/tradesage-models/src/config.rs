use serde::{Deserialize, Serialize};

/// Top-level configuration for TradeSage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TradesageConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub completion: CompletionDefaults,
    #[serde(default)]
    pub signal: SignalConfig,
}

/// How strictly a credential's length is checked during normalization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrictness {
    /// Key must be longer than 40 characters.
    #[default]
    Strict,
    /// Key must be longer than 20 characters.
    Lenient,
}

impl KeyStrictness {
    /// Length the normalized key must exceed.
    pub fn min_length(&self) -> usize {
        match self {
            KeyStrictness::Strict => 40,
            KeyStrictness::Lenient => 20,
        }
    }
}

/// Connection settings for the completion provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// Environment variable holding the raw credential.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// API root, without a trailing slash (e.g. `https://api.openai.com/v1`).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request transport timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default)]
    pub key_strictness: KeyStrictness,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout(),
            key_strictness: KeyStrictness::default(),
        }
    }
}

/// Values applied to free-form completions when the caller omits them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionDefaults {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for CompletionDefaults {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Completion settings used for structured trading signals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalConfig {
    #[serde(default = "default_signal_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_signal_temperature")]
    pub temperature: f32,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: default_signal_max_output_tokens(),
            temperature: default_signal_temperature(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_request_timeout() -> u64 {
    60
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_max_output_tokens() -> u32 {
    1000
}
fn default_temperature() -> f32 {
    0.7
}
fn default_signal_max_output_tokens() -> u32 {
    500
}
fn default_signal_temperature() -> f32 {
    0.3
}
