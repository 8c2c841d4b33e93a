//! HTTP boundary to the completion provider.
//!
//! Only two endpoints are consumed: `GET /models` for the authentication
//! probe and `POST /chat/completions` for everything else.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tradesage_models::{ChatMessage, CompletionRequest, ProviderConfig, ResponseFormat};

use crate::credential::NormalizedKey;
use crate::error::TransportError;

/// One entry of the provider's model listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelRecord {
    pub id: String,
    #[serde(default)]
    pub owned_by: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelRecord>,
}

/// Request body for `POST /chat/completions`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatCompletionBody {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormatBody>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResponseFormatBody {
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<&CompletionRequest> for ChatCompletionBody {
    fn from(request: &CompletionRequest) -> Self {
        let response_format = match request.response_format {
            ResponseFormat::Text => None,
            ResponseFormat::JsonObject => Some(ResponseFormatBody {
                kind: "json_object".to_string(),
            }),
        };

        Self {
            model: request.model.clone(),
            messages: request.messages.clone(),
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
            response_format,
        }
    }
}

/// Response body of `POST /chat/completions`, reduced to what is read.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Convenience constructor for a single-choice reply.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                message: ChoiceMessage {
                    content: Some(text.into()),
                },
                finish_reason: Some("stop".to_string()),
            }],
        }
    }

    /// Text of the first choice, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

/// The provider operations the client depends on. Mockable for testing.
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    async fn list_models(&self, key: &NormalizedKey) -> Result<Vec<ModelRecord>, TransportError>;

    async fn create_chat_completion(
        &self,
        key: &NormalizedKey,
        body: &ChatCompletionBody,
    ) -> Result<ChatCompletionResponse, TransportError>;
}

/// [`ProviderTransport`] over an OpenAI-compatible HTTP API.
pub struct HttpTransport {
    http: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| TransportError::Http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, TransportError> {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.request_timeout_seconds),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map non-success statuses to a [`TransportError`].
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_seconds = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            warn!(?retry_after_seconds, "Rate limited by provider");
            return Err(TransportError::RateLimited {
                retry_after_seconds,
            });
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = %status, "Provider request failed");
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ProviderTransport for HttpTransport {
    async fn list_models(&self, key: &NormalizedKey) -> Result<Vec<ModelRecord>, TransportError> {
        debug!(base_url = %self.base_url, "Listing provider models");
        let response = self
            .http
            .get(self.url("/models"))
            .bearer_auth(key.expose())
            .send()
            .await?;

        let list: ModelList = Self::check_status(response).await?.json().await?;
        Ok(list.data)
    }

    async fn create_chat_completion(
        &self,
        key: &NormalizedKey,
        body: &ChatCompletionBody,
    ) -> Result<ChatCompletionResponse, TransportError> {
        debug!(model = %body.model, messages = body.messages.len(), "Creating chat completion");
        let response = self
            .http
            .post(self.url("/chat/completions"))
            .bearer_auth(key.expose())
            .json(body)
            .send()
            .await?;

        Ok(Self::check_status(response).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradesage_models::{CompletionDefaults, CompletionOptions};

    #[test]
    fn body_omits_response_format_for_text() {
        let request = CompletionRequest::resolve(
            vec![ChatMessage::user("ping")],
            &CompletionOptions::default(),
            &CompletionDefaults::default(),
        );
        let json = serde_json::to_value(ChatCompletionBody::from(&request)).unwrap();

        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 1000);
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn body_requests_json_object() {
        let options = CompletionOptions::default().with_response_format(ResponseFormat::JsonObject);
        let request = CompletionRequest::resolve(
            vec![ChatMessage::user("ping")],
            &options,
            &CompletionDefaults::default(),
        );
        let json = serde_json::to_value(ChatCompletionBody::from(&request)).unwrap();

        assert_eq!(json["response_format"]["type"], "json_object");
    }

    #[test]
    fn response_first_text() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "pong"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
        }"#;
        let response: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.first_text(), Some("pong"));

        let empty: ChatCompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert_eq!(empty.first_text(), None);

        let null_content: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert_eq!(null_content.first_text(), None);
    }

    #[test]
    fn model_list_parses_records() {
        let raw = r#"{"object": "list", "data": [{"id": "gpt-4o-mini", "object": "model", "owned_by": "system"}]}"#;
        let list: ModelList = serde_json::from_str(raw).unwrap();
        assert_eq!(list.data.len(), 1);
        assert_eq!(list.data[0].id, "gpt-4o-mini");
    }

    #[test]
    fn trailing_slash_is_dropped_from_base_url() {
        let transport =
            HttpTransport::new("http://localhost:9999/v1/", Duration::from_secs(1)).unwrap();
        assert_eq!(transport.url("/models"), "http://localhost:9999/v1/models");
    }
}
