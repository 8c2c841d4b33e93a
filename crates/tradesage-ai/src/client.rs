//! The process-wide authenticated provider client.
//!
//! One [`AuthenticatedClient`] is built at start-up and shared as an `Arc`.
//! Authentication (normalization plus one `list_models` probe) runs lazily on
//! first access. Each credential generation owns a `OnceCell`, so concurrent
//! first accesses wait on a single probe. [`AuthenticatedClient::reset`] starts
//! a new generation.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tradesage_models::{AuthenticationStatus, ClientStatus, KeyStrictness};

use crate::credential::{normalize, NormalizedKey};
use crate::transport::ProviderTransport;

/// Where the raw credential comes from.
pub trait CredentialSource: Send + Sync {
    fn read(&self) -> Option<String>;
}

/// Reads the credential from an environment variable on every access.
#[derive(Debug, Clone)]
pub struct EnvCredential {
    pub var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialSource for EnvCredential {
    fn read(&self) -> Option<String> {
        std::env::var(&self.var).ok()
    }
}

/// A fixed credential value.
#[derive(Clone)]
pub struct StaticCredential(pub Option<String>);

impl CredentialSource for StaticCredential {
    fn read(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Settled authentication state of one credential generation.
#[derive(Debug, Clone)]
pub struct Session {
    pub generation: u64,
    pub status: AuthenticationStatus,
    pub client_status: ClientStatus,
    /// When the probe succeeded. `None` unless `status` is `Valid`.
    pub validated_at: Option<DateTime<Utc>>,
    key: Option<NormalizedKey>,
}

impl Session {
    fn no_key(generation: u64) -> Self {
        Self {
            generation,
            status: AuthenticationStatus::Invalid,
            client_status: ClientStatus::NoKey,
            validated_at: None,
            key: None,
        }
    }

    fn rejected(generation: u64, key: NormalizedKey) -> Self {
        Self {
            generation,
            status: AuthenticationStatus::Invalid,
            client_status: ClientStatus::KeyInvalid,
            validated_at: None,
            key: Some(key),
        }
    }

    fn accepted(generation: u64, key: NormalizedKey) -> Self {
        Self {
            generation,
            status: AuthenticationStatus::Valid,
            client_status: ClientStatus::Authenticated,
            validated_at: Some(Utc::now()),
            key: Some(key),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == AuthenticationStatus::Valid
    }

    /// The key, only when the provider accepted it.
    pub fn authorized_key(&self) -> Option<&NormalizedKey> {
        if self.is_valid() {
            self.key.as_ref()
        } else {
            None
        }
    }

    /// Redacted key preview for diagnostics.
    pub fn key_preview(&self) -> Option<String> {
        self.key.as_ref().map(NormalizedKey::preview)
    }
}

struct Generation {
    id: u64,
    session: OnceCell<Session>,
}

impl Generation {
    fn new(id: u64) -> Arc<Self> {
        Arc::new(Self {
            id,
            session: OnceCell::new(),
        })
    }
}

pub struct AuthenticatedClient {
    source: Arc<dyn CredentialSource>,
    transport: Arc<dyn ProviderTransport>,
    strictness: KeyStrictness,
    current: RwLock<Arc<Generation>>,
}

impl AuthenticatedClient {
    pub fn new(
        source: Arc<dyn CredentialSource>,
        transport: Arc<dyn ProviderTransport>,
        strictness: KeyStrictness,
    ) -> Self {
        Self {
            source,
            transport,
            strictness,
            current: RwLock::new(Generation::new(0)),
        }
    }

    fn current(&self) -> Arc<Generation> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Settled session for the current generation, authenticating first if needed.
    pub async fn session(&self) -> Session {
        let generation = self.current();
        generation
            .session
            .get_or_init(|| self.authenticate(generation.id))
            .await
            .clone()
    }

    /// Non-blocking view of the status. `Unknown` until the probe settles.
    pub fn authentication_status(&self) -> AuthenticationStatus {
        self.current()
            .session
            .get()
            .map(|s| s.status)
            .unwrap_or_default()
    }

    /// True iff the current generation has settled as `Valid`.
    pub fn is_ready(&self) -> bool {
        self.authentication_status() == AuthenticationStatus::Valid
    }

    /// Dashboard-facing status. Waits for authentication to settle.
    pub async fn client_status(&self) -> ClientStatus {
        self.session().await.client_status
    }

    /// Authenticate in the background so start-up does not wait on the probe.
    pub fn warm_up(self: &Arc<Self>) -> JoinHandle<ClientStatus> {
        let client = Arc::clone(self);
        tokio::spawn(async move { client.client_status().await })
    }

    /// Forget the cached key and status. The next access re-reads the
    /// credential, normalizes it again and re-probes.
    pub fn reset(&self) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let next = current.id + 1;
        *current = Generation::new(next);
        info!(generation = next, "AI provider credential reset");
    }

    pub(crate) fn transport(&self) -> &Arc<dyn ProviderTransport> {
        &self.transport
    }

    async fn authenticate(&self, generation: u64) -> Session {
        let Some(raw) = self.source.read() else {
            warn!(generation, "No AI provider credential configured");
            return Session::no_key(generation);
        };

        let key = match normalize(&raw, self.strictness) {
            Ok(key) => key,
            Err(e) => {
                warn!(generation, error = %e, "AI provider credential unusable");
                return Session::no_key(generation);
            }
        };

        match self.transport.list_models(&key).await {
            Ok(models) if !models.is_empty() => {
                info!(
                    generation,
                    key = %key,
                    models = models.len(),
                    "AI provider authenticated"
                );
                Session::accepted(generation, key)
            }
            Ok(_) => {
                warn!(generation, key = %key, "Probe returned no models; treating key as invalid");
                Session::rejected(generation, key)
            }
            Err(e) => {
                warn!(generation, key = %key, error = %e, "AI provider probe failed");
                Session::rejected(generation, key)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::test_support::{test_key, MockTransport, RotatingCredential};
    use std::time::Duration;

    fn client_with(key: Option<String>, transport: Arc<MockTransport>) -> Arc<AuthenticatedClient> {
        Arc::new(AuthenticatedClient::new(
            Arc::new(StaticCredential(key)),
            transport,
            KeyStrictness::Strict,
        ))
    }

    #[tokio::test]
    async fn missing_credential_is_no_key_without_probe() {
        let transport = Arc::new(MockTransport::accepting());
        let client = client_with(None, Arc::clone(&transport));

        assert_eq!(client.client_status().await, ClientStatus::NoKey);
        assert_eq!(client.authentication_status(), AuthenticationStatus::Invalid);
        assert!(!client.is_ready());
        assert_eq!(transport.probe_calls(), 0);
    }

    #[tokio::test]
    async fn placeholder_credential_is_no_key_without_probe() {
        let transport = Arc::new(MockTransport::accepting());
        let client = client_with(Some("<token>".to_string()), Arc::clone(&transport));

        assert_eq!(client.client_status().await, ClientStatus::NoKey);
        assert_eq!(transport.probe_calls(), 0);
    }

    #[tokio::test]
    async fn status_is_unknown_before_first_access() {
        let transport = Arc::new(MockTransport::accepting());
        let client = client_with(Some(test_key()), Arc::clone(&transport));

        assert_eq!(client.authentication_status(), AuthenticationStatus::Unknown);
        assert!(!client.is_ready());
        assert_eq!(transport.probe_calls(), 0);
    }

    #[tokio::test]
    async fn accepted_probe_marks_valid() {
        let transport = Arc::new(MockTransport::accepting());
        let client = client_with(Some(format!("Bearer {}", test_key())), Arc::clone(&transport));

        let session = client.session().await;
        assert!(session.is_valid());
        assert!(session.validated_at.is_some());
        assert_eq!(session.authorized_key().map(|k| k.expose().to_string()), Some(test_key()));
        assert!(client.is_ready());
        assert_eq!(transport.probe_calls(), 1);
        assert_eq!(transport.probe_keys().await, vec![test_key()]);
    }

    #[tokio::test]
    async fn empty_model_list_marks_invalid() {
        let transport = Arc::new(MockTransport::accepting().with_models(vec![]));
        let client = client_with(Some(test_key()), Arc::clone(&transport));

        let session = client.session().await;
        assert_eq!(session.status, AuthenticationStatus::Invalid);
        assert_eq!(session.client_status, ClientStatus::KeyInvalid);
        assert!(session.authorized_key().is_none());
        assert!(session.key_preview().is_some());
    }

    #[tokio::test]
    async fn probe_error_marks_invalid() {
        let transport = Arc::new(MockTransport::rejecting(TransportError::Status {
            status: 401,
            body: "invalid_api_key".to_string(),
        }));
        let client = client_with(Some(test_key()), Arc::clone(&transport));

        assert_eq!(client.client_status().await, ClientStatus::KeyInvalid);
        assert!(!client.is_ready());
    }

    #[tokio::test]
    async fn status_is_stable_after_settling() {
        let transport = Arc::new(MockTransport::accepting());
        let client = client_with(Some(test_key()), Arc::clone(&transport));

        for _ in 0..5 {
            assert_eq!(client.client_status().await, ClientStatus::Authenticated);
        }
        assert_eq!(transport.probe_calls(), 1);
    }

    #[tokio::test]
    async fn concurrent_first_access_probes_once() {
        let transport = Arc::new(
            MockTransport::accepting().with_probe_delay(Duration::from_millis(50)),
        );
        let client = client_with(Some(test_key()), Arc::clone(&transport));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let client = Arc::clone(&client);
            handles.push(tokio::spawn(async move { client.client_status().await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), ClientStatus::Authenticated);
        }

        assert_eq!(transport.probe_calls(), 1);
    }

    #[tokio::test]
    async fn abandoned_first_access_leaves_next_caller_to_probe() {
        let transport = Arc::new(
            MockTransport::accepting().with_probe_delay(Duration::from_millis(200)),
        );
        let client = client_with(Some(test_key()), Arc::clone(&transport));

        let abandoned =
            tokio::time::timeout(Duration::from_millis(20), client.client_status()).await;
        assert!(abandoned.is_err());
        assert_eq!(client.authentication_status(), AuthenticationStatus::Unknown);
        assert!(!client.is_ready());

        assert_eq!(client.client_status().await, ClientStatus::Authenticated);
        assert!(client.is_ready());
        assert_eq!(transport.probe_calls(), 2);
    }

    #[tokio::test]
    async fn reset_reprobes_with_unchanged_credential() {
        let transport = Arc::new(MockTransport::accepting());
        let client = client_with(Some(test_key()), Arc::clone(&transport));

        let first = client.session().await;
        client.reset();
        assert_eq!(client.authentication_status(), AuthenticationStatus::Unknown);

        let second = client.session().await;
        assert!(second.is_valid());
        assert_eq!(second.generation, first.generation + 1);
        assert_eq!(transport.probe_calls(), 2);
    }

    #[tokio::test]
    async fn reset_picks_up_rotated_credential() {
        let transport = Arc::new(MockTransport::accepting());
        let source = Arc::new(RotatingCredential::new(Some("token".to_string())));
        let client = AuthenticatedClient::new(
            Arc::clone(&source) as Arc<dyn CredentialSource>,
            Arc::clone(&transport) as Arc<dyn ProviderTransport>,
            KeyStrictness::Strict,
        );

        assert_eq!(client.client_status().await, ClientStatus::NoKey);

        source.set(Some(test_key()));
        // Without a reset the settled status does not change.
        assert_eq!(client.client_status().await, ClientStatus::NoKey);

        client.reset();
        assert_eq!(client.client_status().await, ClientStatus::Authenticated);
        assert_eq!(transport.probe_calls(), 1);
    }

    #[tokio::test]
    async fn warm_up_settles_in_background() {
        let transport = Arc::new(MockTransport::accepting());
        let client = client_with(Some(test_key()), Arc::clone(&transport));

        let status = client.warm_up().await.unwrap();
        assert_eq!(status, ClientStatus::Authenticated);
        assert!(client.is_ready());
        assert_eq!(transport.probe_calls(), 1);
    }
}
