pub mod client;
pub mod credential;
pub mod error;
pub mod invoker;
pub mod parser;
pub mod prompts;
pub mod signal;
pub mod transport;

pub mod test_support;

pub use client::{AuthenticatedClient, CredentialSource, EnvCredential, Session, StaticCredential};
pub use credential::{normalize, NormalizedKey};
pub use error::{CompletionError, NormalizationError, SignalError, TransportError};
pub use invoker::CompletionInvoker;
pub use signal::SignalGenerator;
pub use transport::{HttpTransport, ProviderTransport};
