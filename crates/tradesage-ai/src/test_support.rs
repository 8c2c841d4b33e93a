//! Test support: a scripted provider transport and a rotatable credential.
//!
//! `MockTransport` answers the probe with a configurable model list and pops
//! completion replies from a queue, recording every call so tests can assert
//! on probe counts and request bodies without network access.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex as StdMutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::client::CredentialSource;
use crate::credential::NormalizedKey;
use crate::error::TransportError;
use crate::transport::{ChatCompletionBody, ChatCompletionResponse, ModelRecord, ProviderTransport};

/// A well-formed key that passes strict normalization.
pub fn test_key() -> String {
    format!("sk-{}", "x".repeat(45))
}

type Reply = Result<ChatCompletionResponse, TransportError>;

pub struct MockTransport {
    models: Result<Vec<ModelRecord>, TransportError>,
    replies: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    probe_delay: Duration,
    completion_delay: Duration,
    probe_calls: AtomicUsize,
    completion_calls: AtomicUsize,
    probe_keys: Mutex<Vec<String>>,
    completion_keys: Mutex<Vec<String>>,
    last_body: Mutex<Option<ChatCompletionBody>>,
}

impl MockTransport {
    fn with_probe_result(models: Result<Vec<ModelRecord>, TransportError>) -> Self {
        Self {
            models,
            replies: Mutex::new(VecDeque::new()),
            fallback: Err(TransportError::Http("no scripted reply".to_string())),
            probe_delay: Duration::ZERO,
            completion_delay: Duration::ZERO,
            probe_calls: AtomicUsize::new(0),
            completion_calls: AtomicUsize::new(0),
            probe_keys: Mutex::new(Vec::new()),
            completion_keys: Mutex::new(Vec::new()),
            last_body: Mutex::new(None),
        }
    }

    /// Probe succeeds with one model record.
    pub fn accepting() -> Self {
        Self::with_probe_result(Ok(vec![ModelRecord {
            id: "gpt-4o-mini".to_string(),
            owned_by: Some("system".to_string()),
        }]))
    }

    /// Probe fails with `error`.
    pub fn rejecting(error: TransportError) -> Self {
        Self::with_probe_result(Err(error))
    }

    pub fn with_models(mut self, models: Vec<ModelRecord>) -> Self {
        self.models = Ok(models);
        self
    }

    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = delay;
        self
    }

    pub fn with_completion_delay(mut self, delay: Duration) -> Self {
        self.completion_delay = delay;
        self
    }

    /// Queue one reply.
    pub fn reply(mut self, reply: Reply) -> Self {
        self.replies.get_mut().push_back(reply);
        self
    }

    /// Queue one single-choice text reply.
    pub fn reply_text(self, text: impl Into<String>) -> Self {
        self.reply(Ok(ChatCompletionResponse::with_text(text)))
    }

    /// Reply with `text` whenever the queue is empty.
    pub fn always_reply_text(mut self, text: impl Into<String>) -> Self {
        self.fallback = Ok(ChatCompletionResponse::with_text(text));
        self
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn completion_calls(&self) -> usize {
        self.completion_calls.load(Ordering::SeqCst)
    }

    pub async fn probe_keys(&self) -> Vec<String> {
        self.probe_keys.lock().await.clone()
    }

    pub async fn completion_keys(&self) -> Vec<String> {
        self.completion_keys.lock().await.clone()
    }

    pub async fn last_body(&self) -> Option<ChatCompletionBody> {
        self.last_body.lock().await.clone()
    }
}

#[async_trait]
impl ProviderTransport for MockTransport {
    async fn list_models(&self, key: &NormalizedKey) -> Result<Vec<ModelRecord>, TransportError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.probe_keys.lock().await.push(key.expose().to_string());
        if !self.probe_delay.is_zero() {
            tokio::time::sleep(self.probe_delay).await;
        }
        self.models.clone()
    }

    async fn create_chat_completion(
        &self,
        key: &NormalizedKey,
        body: &ChatCompletionBody,
    ) -> Result<ChatCompletionResponse, TransportError> {
        self.completion_calls.fetch_add(1, Ordering::SeqCst);
        self.completion_keys.lock().await.push(key.expose().to_string());
        *self.last_body.lock().await = Some(body.clone());
        if !self.completion_delay.is_zero() {
            tokio::time::sleep(self.completion_delay).await;
        }
        let queued = self.replies.lock().await.pop_front();
        queued.unwrap_or_else(|| self.fallback.clone())
    }
}

/// A credential whose value can be swapped mid-test.
pub struct RotatingCredential {
    value: StdMutex<Option<String>>,
}

impl RotatingCredential {
    pub fn new(value: Option<String>) -> Self {
        Self {
            value: StdMutex::new(value),
        }
    }

    pub fn set(&self, value: Option<String>) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }
}

impl CredentialSource for RotatingCredential {
    fn read(&self) -> Option<String> {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
