//! TradeSage - AI provider boundary for the trading dashboard
//!
//! Owns the one authenticated connection to the completion provider and
//! exposes the small contract dashboard pages and orchestration features use:
//! readiness, status, free-form analysis and structured trading signals.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use tradesage::models::{CompletionOptions, TradesageConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let service = tradesage::build_service(&TradesageConfig::default())?;
//! let text = service
//!     .generate_analysis("Summarize AAPL's trend", &CompletionOptions::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub use tradesage_ai as ai;
pub use tradesage_models as models;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tradesage_ai::prompts::analysis_system_prompt;
use tradesage_ai::{
    AuthenticatedClient, CompletionError, CompletionInvoker, EnvCredential, HttpTransport,
    SignalError, SignalGenerator,
};
use tradesage_models::{ChatMessage, ClientStatus, CompletionOptions, TradesageConfig, TradingSignal};

/// The application-wide AI service. Build once, share by reference or `Arc`.
pub struct AdvisorService {
    client: Arc<AuthenticatedClient>,
    invoker: Arc<CompletionInvoker>,
    signals: SignalGenerator,
}

impl AdvisorService {
    pub fn new(client: Arc<AuthenticatedClient>, config: &TradesageConfig) -> Self {
        let invoker = Arc::new(CompletionInvoker::new(
            Arc::clone(&client),
            config.completion.clone(),
        ));
        let signals = SignalGenerator::new(Arc::clone(&invoker), config.signal.clone());
        Self {
            client,
            invoker,
            signals,
        }
    }

    pub fn client(&self) -> &Arc<AuthenticatedClient> {
        &self.client
    }

    /// True once the credential has been accepted by the provider.
    pub fn is_ready(&self) -> bool {
        self.client.is_ready()
    }

    /// `authenticated`, `key_invalid` or `no_key`. Authenticates on first call.
    pub async fn status(&self) -> ClientStatus {
        self.client.client_status().await
    }

    /// Start authentication in the background.
    pub fn warm_up(&self) -> JoinHandle<ClientStatus> {
        self.client.warm_up()
    }

    /// Re-read and re-validate the credential on next use.
    pub fn reset(&self) {
        self.client.reset();
    }

    pub async fn generate_analysis(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        self.generate_analysis_with_cancel(prompt, options, &CancellationToken::new())
            .await
    }

    pub async fn generate_analysis_with_cancel(
        &self,
        prompt: &str,
        options: &CompletionOptions,
        cancel: &CancellationToken,
    ) -> Result<String, CompletionError> {
        let messages = vec![
            ChatMessage::system(analysis_system_prompt()),
            ChatMessage::user(prompt),
        ];
        self.invoker
            .complete_with_cancel(messages, options, cancel)
            .await
    }

    pub async fn generate_trading_signal(
        &self,
        stock_data: &serde_json::Value,
    ) -> Result<TradingSignal, SignalError> {
        self.signals.generate(stock_data).await
    }

    pub async fn generate_trading_signal_with_cancel(
        &self,
        stock_data: &serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<TradingSignal, SignalError> {
        self.signals.generate_with_cancel(stock_data, cancel).await
    }
}

/// Build the service from configuration, reading the credential from the
/// configured environment variable.
pub fn build_service(config: &TradesageConfig) -> Result<AdvisorService, anyhow::Error> {
    info!(
        base_url = %config.provider.base_url,
        key_env = %config.provider.api_key_env,
        strictness = ?config.provider.key_strictness,
        "Building AI service"
    );
    let transport = HttpTransport::from_config(&config.provider)?;
    let client = Arc::new(AuthenticatedClient::new(
        Arc::new(EnvCredential::new(config.provider.api_key_env.clone())),
        Arc::new(transport),
        config.provider.key_strictness,
    ));
    Ok(AdvisorService::new(client, config))
}
