use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tradesage_models::{ChatMessage, CompletionDefaults, CompletionOptions, CompletionRequest};

use crate::client::AuthenticatedClient;
use crate::error::CompletionError;
use crate::transport::ChatCompletionBody;

/// Issues chat completions through the shared [`AuthenticatedClient`].
///
/// Calls are independent of each other and may run in parallel. There are no
/// retries here; callers decide whether a failure is worth repeating.
pub struct CompletionInvoker {
    client: Arc<AuthenticatedClient>,
    defaults: CompletionDefaults,
}

impl CompletionInvoker {
    pub fn new(client: Arc<AuthenticatedClient>, defaults: CompletionDefaults) -> Self {
        Self { client, defaults }
    }

    pub fn client(&self) -> &Arc<AuthenticatedClient> {
        &self.client
    }

    /// Run one completion and return the first choice's text unmodified.
    pub async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        self.complete_with_cancel(messages, options, &CancellationToken::new())
            .await
    }

    /// Like [`complete`](Self::complete), aborting with
    /// [`CompletionError::Cancelled`] once `cancel` fires.
    ///
    /// Cancelling only abandons this call; the client's status is untouched.
    pub async fn complete_with_cancel(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
        cancel: &CancellationToken,
    ) -> Result<String, CompletionError> {
        let request = CompletionRequest::resolve(messages, options, &self.defaults);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(request_id = %request.request_id, "Completion cancelled by caller");
                Err(CompletionError::Cancelled)
            }
            result = self.send(&request) => result,
        }
    }

    async fn send(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let session = self.client.session().await;
        let key = session.authorized_key().ok_or_else(|| {
            debug!(
                request_id = %request.request_id,
                status = %session.client_status,
                "Completion refused: not authenticated"
            );
            CompletionError::NotAuthenticated
        })?;

        debug!(
            request_id = %request.request_id,
            model = %request.model,
            max_tokens = request.max_output_tokens,
            temperature = request.temperature,
            "Sending completion"
        );

        let start = Instant::now();
        let body = ChatCompletionBody::from(request);
        let response = self
            .client
            .transport()
            .create_chat_completion(key, &body)
            .await
            .map_err(|e| {
                warn!(
                    request_id = %request.request_id,
                    error = %e,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Completion failed"
                );
                CompletionError::Provider(e)
            })?;

        match response.first_text() {
            Some(text) if !text.trim().is_empty() => {
                debug!(
                    request_id = %request.request_id,
                    length = text.len(),
                    elapsed_ms = start.elapsed().as_millis(),
                    "Completion received"
                );
                Ok(text.to_string())
            }
            _ => {
                warn!(request_id = %request.request_id, "Provider returned an empty completion");
                Err(CompletionError::EmptyResponse)
            }
        }
    }
}
