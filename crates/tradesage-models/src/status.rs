use serde::{Deserialize, Serialize};

/// Validation state of the provider credential for the current generation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationStatus {
    #[default]
    Unknown,
    Valid,
    Invalid,
}

/// Status reported to dashboard collaborators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    /// Credential accepted by the provider.
    Authenticated,
    /// Credential well-formed but rejected, or the probe failed.
    KeyInvalid,
    /// Credential missing or unusable; no network call was attempted.
    NoKey,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Authenticated => "authenticated",
            ClientStatus::KeyInvalid => "key_invalid",
            ClientStatus::NoKey => "no_key",
        }
    }
}

impl std::fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
