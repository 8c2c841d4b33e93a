pub mod chat;
pub mod config;
pub mod signal;
pub mod status;

pub use chat::{ChatMessage, CompletionOptions, CompletionRequest, ResponseFormat, Role};
pub use config::{CompletionDefaults, KeyStrictness, ProviderConfig, SignalConfig, TradesageConfig};
pub use signal::{Grade, SignalAction, TradingSignal};
pub use status::{AuthenticationStatus, ClientStatus};
