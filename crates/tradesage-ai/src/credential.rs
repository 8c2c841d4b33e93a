//! Credential hygiene for the provider API key.
//!
//! Environment values arrive in many shapes: pasted HTTP headers
//! (`Authorization: Bearer sk-...`), quoted strings, values with stray
//! newlines, or template placeholders such as `<token>`. [`normalize`]
//! reduces all of these to a bare key or explains why it cannot.

use std::fmt;

use tracing::debug;
use tradesage_models::KeyStrictness;

use crate::error::NormalizationError;

/// Every provider key starts with this.
pub const KEY_PREFIX: &str = "sk-";

/// Values shorter than this without the key prefix are treated as placeholders.
const PLACEHOLDER_MAX_LENGTH: usize = 20;

const PLACEHOLDERS: [&str; 2] = ["<token>", "token"];

const AUTHORIZATION_MARKER: &str = "authorization:";
const BEARER_MARKER: &str = "bearer";

/// Characters visible in the preview used for logging.
const PREVIEW_CHARS: usize = 6;

/// A cleaned provider key. `Debug` and `Display` only ever show a short prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    /// The full key, for building the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Leading characters of the key followed by an ellipsis.
    pub fn preview(&self) -> String {
        let head: String = self.0.chars().take(PREVIEW_CHARS).collect();
        format!("{head}…")
    }
}

impl fmt::Debug for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NormalizedKey({}, len={})", self.preview(), self.len())
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.preview())
    }
}

/// Turn a raw credential string into a [`NormalizedKey`].
///
/// Steps, in order:
/// 1. trim surrounding whitespace
/// 2. unwrap an `Authorization:` / `Bearer` header if present
/// 3. drop quotes, angle brackets and all whitespace
/// 4. reject empty values and placeholders ([`NormalizationError::Placeholder`])
/// 5. require the `sk-` prefix and a length above the strictness threshold
///    ([`NormalizationError::BadFormat`])
///
/// Pure; never touches the network. Re-normalizing a key yields the same key.
pub fn normalize(raw: &str, strictness: KeyStrictness) -> Result<NormalizedKey, NormalizationError> {
    let trimmed = raw.trim();
    let unwrapped = unwrap_authorization(trimmed);
    let cleaned: String = unwrapped
        .chars()
        .filter(|c| !matches!(c, '\'' | '"' | '<' | '>') && !c.is_whitespace())
        .collect();

    if is_placeholder(&cleaned) {
        debug!(length = cleaned.len(), "Credential is empty or a placeholder");
        return Err(NormalizationError::Placeholder);
    }

    if !cleaned.starts_with(KEY_PREFIX) || cleaned.len() <= strictness.min_length() {
        debug!(
            length = cleaned.len(),
            has_prefix = cleaned.starts_with(KEY_PREFIX),
            min_length = strictness.min_length(),
            "Credential has bad format"
        );
        return Err(NormalizationError::BadFormat);
    }

    let key = NormalizedKey(cleaned);
    debug!(length = key.len(), prefix = %key.preview(), "Credential normalized");
    Ok(key)
}

fn is_placeholder(cleaned: &str) -> bool {
    cleaned.is_empty()
        || PLACEHOLDERS.iter().any(|p| cleaned.eq_ignore_ascii_case(p))
        || (cleaned.len() < PLACEHOLDER_MAX_LENGTH && !cleaned.starts_with(KEY_PREFIX))
}

/// Pull the token out of `Authorization: Bearer <token>` style input.
///
/// When a marker is present but nothing follows `Bearer`, the marker text is
/// removed and whatever remains is returned.
fn unwrap_authorization(text: &str) -> String {
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let lower = text.to_ascii_lowercase();
    let bearers = bearer_marks(&lower);

    if !lower.contains(AUTHORIZATION_MARKER) && bearers.is_empty() {
        return text.to_string();
    }

    if let Some(&at) = bearers.first() {
        if let Some(token) = text[at + BEARER_MARKER.len()..].split_whitespace().next() {
            return token.to_string();
        }
    }

    let mut spans: Vec<(usize, usize)> = lower
        .match_indices(AUTHORIZATION_MARKER)
        .map(|(at, _)| (at, AUTHORIZATION_MARKER.len()))
        .chain(bearers.iter().map(|&at| (at, BEARER_MARKER.len())))
        .collect();
    spans.sort_unstable();
    remove_spans(text, &spans)
}

/// Offsets where `bearer` stands as its own word rather than inside a key body.
fn bearer_marks(lower: &str) -> Vec<usize> {
    lower
        .match_indices(BEARER_MARKER)
        .map(|(at, _)| at)
        .filter(|&at| {
            let before = lower[..at].chars().next_back();
            let after = lower[at + BEARER_MARKER.len()..].chars().next();
            before.map_or(true, |c| c.is_whitespace() || matches!(c, ':' | '\'' | '"' | '<'))
                && after.map_or(true, |c| c.is_whitespace() || matches!(c, '\'' | '"' | '>'))
        })
        .collect()
}

/// Cut sorted, non-overlapping `(start, len)` byte spans out of `text`.
fn remove_spans(text: &str, spans: &[(usize, usize)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = 0;
    for &(at, len) in spans {
        if at < rest {
            continue;
        }
        out.push_str(&text[rest..at]);
        rest = at + len;
    }
    out.push_str(&text[rest..]);
    out
}
