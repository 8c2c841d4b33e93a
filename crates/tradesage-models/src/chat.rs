use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::CompletionDefaults;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged message in a chat completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Output constraint requested from the provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    #[default]
    Text,
    /// Provider must emit a single valid JSON object.
    JsonObject,
}

/// Caller-supplied overrides for one completion call.
///
/// Every field is optional; `None` falls back to [`CompletionDefaults`].
/// Unrecognized fields are rejected when deserializing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CompletionOptions {
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub response_format: Option<ResponseFormat>,
    /// Model override. Falls back to `CompletionDefaults::model`.
    pub model: Option<String>,
}

impl CompletionOptions {
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// A fully resolved completion request. Built once per call and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionRequest {
    pub request_id: Uuid,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub response_format: ResponseFormat,
}

impl CompletionRequest {
    /// Merge caller options over the configured defaults.
    pub fn resolve(
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
        defaults: &CompletionDefaults,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            model: options
                .model
                .clone()
                .unwrap_or_else(|| defaults.model.clone()),
            messages,
            max_output_tokens: options
                .max_output_tokens
                .unwrap_or(defaults.max_output_tokens),
            temperature: options.temperature.unwrap_or(defaults.temperature),
            response_format: options.response_format.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_applies_defaults() {
        let request = CompletionRequest::resolve(
            vec![ChatMessage::user("ping")],
            &CompletionOptions::default(),
            &CompletionDefaults::default(),
        );

        assert_eq!(request.max_output_tokens, 1000);
        assert_eq!(request.temperature, 0.7);
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.response_format, ResponseFormat::Text);
    }

    #[test]
    fn resolve_prefers_caller_values() {
        let options = CompletionOptions::default()
            .with_max_output_tokens(250)
            .with_temperature(0.0)
            .with_response_format(ResponseFormat::JsonObject)
            .with_model("gpt-4o");

        let request = CompletionRequest::resolve(
            vec![ChatMessage::user("ping")],
            &options,
            &CompletionDefaults::default(),
        );

        assert_eq!(request.max_output_tokens, 250);
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.response_format, ResponseFormat::JsonObject);
    }

    #[test]
    fn options_reject_unknown_fields() {
        let result: Result<CompletionOptions, _> =
            serde_json::from_str(r#"{"temperature": 0.2, "top_p": 0.9}"#);
        assert!(result.is_err());

        let parsed: CompletionOptions =
            serde_json::from_str(r#"{"temperature": 0.2, "response_format": "json_object"}"#)
                .unwrap();
        assert_eq!(parsed.temperature, Some(0.2));
        assert_eq!(parsed.response_format, Some(ResponseFormat::JsonObject));
    }

    #[test]
    fn role_serialization() {
        let message = ChatMessage::system("be terse");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "system");
    }
}
