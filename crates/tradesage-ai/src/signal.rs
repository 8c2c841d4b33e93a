use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tradesage_models::{ChatMessage, CompletionOptions, ResponseFormat, SignalConfig, TradingSignal};

use crate::error::SignalError;
use crate::invoker::CompletionInvoker;
use crate::parser::parse_trading_signal;
use crate::prompts::trading_signal_prompt;

/// Produces schema-validated [`TradingSignal`]s from raw stock data.
///
/// The only success path is a completion that parses and validates; failures
/// are never replaced with a synthetic signal.
pub struct SignalGenerator {
    invoker: Arc<CompletionInvoker>,
    config: SignalConfig,
}

impl SignalGenerator {
    pub fn new(invoker: Arc<CompletionInvoker>, config: SignalConfig) -> Self {
        Self { invoker, config }
    }

    /// Completion options for signal calls: JSON-only output, low temperature
    /// and a smaller token budget than free-form analysis.
    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions::default()
            .with_response_format(ResponseFormat::JsonObject)
            .with_temperature(self.config.temperature)
            .with_max_output_tokens(self.config.max_output_tokens)
    }

    pub async fn generate(&self, stock_data: &serde_json::Value) -> Result<TradingSignal, SignalError> {
        self.generate_with_cancel(stock_data, &CancellationToken::new())
            .await
    }

    pub async fn generate_with_cancel(
        &self,
        stock_data: &serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<TradingSignal, SignalError> {
        let messages = vec![ChatMessage::user(trading_signal_prompt(stock_data))];
        let raw = self
            .invoker
            .complete_with_cancel(messages, &self.completion_options(), cancel)
            .await?;

        let signal = parse_trading_signal(&raw).inspect_err(|e| {
            warn!(error = %e, length = raw.len(), "Rejected trading signal");
        })?;

        info!(
            grade = %signal.grade,
            action = %signal.action,
            confidence = signal.confidence,
            "Trading signal generated"
        );
        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AuthenticatedClient, StaticCredential};
    use crate::error::{CompletionError, TransportError};
    use crate::test_support::{test_key, MockTransport};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use tradesage_models::{CompletionDefaults, Grade, KeyStrictness, SignalAction};

    fn generator_with(key: Option<String>, transport: Arc<MockTransport>) -> SignalGenerator {
        let client = Arc::new(AuthenticatedClient::new(
            Arc::new(StaticCredential(key)),
            transport,
            KeyStrictness::Strict,
        ));
        let invoker = Arc::new(CompletionInvoker::new(client, CompletionDefaults::default()));
        SignalGenerator::new(invoker, SignalConfig::default())
    }

    fn stock_data() -> serde_json::Value {
        json!({"symbol": "MSFT", "price": 415.2, "change_pct": 1.4, "volume": 21_300_000})
    }

    #[tokio::test]
    async fn generates_validated_signal() {
        let reply = json!({
            "grade": "B+",
            "confidence": 68,
            "action": "HOLD",
            "target": 430,
            "stop": 398.5,
            "reasoning": "Consolidating under 420 resistance."
        });
        let transport = Arc::new(MockTransport::accepting().reply_text(reply.to_string()));
        let generator = generator_with(Some(test_key()), Arc::clone(&transport));

        let signal = generator.generate(&stock_data()).await.unwrap();
        assert_eq!(signal.grade, Grade::BPlus);
        assert_eq!(signal.action, SignalAction::Hold);
        assert_eq!(signal.target, dec!(430));
        assert_eq!(signal.stop, dec!(398.5));
    }

    #[tokio::test]
    async fn requests_json_mode_with_signal_limits() {
        let transport = Arc::new(MockTransport::accepting().reply_text("not json"));
        let generator = generator_with(Some(test_key()), Arc::clone(&transport));

        let _ = generator.generate(&stock_data()).await;

        let body = transport.last_body().await.unwrap();
        assert_eq!(body.temperature, 0.3);
        assert_eq!(body.max_tokens, 500);
        assert_eq!(body.response_format.unwrap().kind, "json_object");
        assert_eq!(body.messages.len(), 1);
        assert!(body.messages[0].content.contains("\"symbol\": \"MSFT\""));
    }

    #[tokio::test]
    async fn not_authenticated_is_signal_error() {
        let transport = Arc::new(MockTransport::accepting().reply_text("{}"));
        let generator = generator_with(Some("sk-short".to_string()), Arc::clone(&transport));

        let result = generator.generate(&stock_data()).await;
        assert_eq!(result, Err(SignalError::NotAuthenticated));
        assert_eq!(transport.completion_calls(), 0);
    }

    #[tokio::test]
    async fn out_of_range_confidence_fails() {
        let reply = json!({
            "grade": "A",
            "confidence": 150,
            "action": "BUY",
            "target": 440,
            "stop": 405,
            "reasoning": "Strong momentum."
        });
        let transport = Arc::new(MockTransport::accepting().reply_text(reply.to_string()));
        let generator = generator_with(Some(test_key()), transport);

        let result = generator.generate(&stock_data()).await;
        assert_eq!(
            result,
            Err(SignalError::violation("confidence", json!(150)))
        );
    }

    #[tokio::test]
    async fn non_json_reply_is_malformed_with_raw_text() {
        let reply = "MSFT looks like a buy to me.";
        let transport = Arc::new(MockTransport::accepting().reply_text(reply));
        let generator = generator_with(Some(test_key()), transport);

        let result = generator.generate(&stock_data()).await;
        assert_eq!(result, Err(SignalError::MalformedJson(reply.to_string())));
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let transport = Arc::new(MockTransport::accepting().reply(Err(TransportError::Status {
            status: 500,
            body: "upstream".to_string(),
        })));
        let generator = generator_with(Some(test_key()), transport);

        let result = generator.generate(&stock_data()).await;
        assert!(matches!(
            result,
            Err(SignalError::Completion(CompletionError::Provider(
                TransportError::Status { status: 500, .. }
            )))
        ));
    }
}
