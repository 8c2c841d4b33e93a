use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tradesage_models::{Grade, SignalAction, TradingSignal};

use crate::error::SignalError;

/// The JSON body of a reply: the trimmed text, or the inside of a reply
/// that is exactly one fenced code block (```json ... ```).
///
/// Prose around an object is never looked into.
fn reply_body(text: &str) -> &str {
    let trimmed = text.trim();
    let fenced = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
        .filter(|inner| !inner.contains("```"));

    match fenced {
        Some(inner) => {
            let inner = inner.strip_prefix("json").unwrap_or(inner);
            inner.trim()
        }
        None => trimmed,
    }
}

/// Parse and validate a trading signal from raw completion text.
///
/// Unparseable text yields [`SignalError::MalformedJson`] carrying `raw`
/// unchanged. Out-of-range or mistyped fields yield
/// [`SignalError::SchemaViolation`]; nothing is clamped or defaulted.
pub fn parse_trading_signal(raw: &str) -> Result<TradingSignal, SignalError> {
    let malformed = || SignalError::MalformedJson(raw.to_string());

    let value: Value = serde_json::from_str(reply_body(raw)).map_err(|_| malformed())?;
    let object = value.as_object().ok_or_else(malformed)?;

    validate_signal(object)
}

fn field<'a>(object: &'a Map<String, Value>, name: &str) -> &'a Value {
    object.get(name).unwrap_or(&Value::Null)
}

fn validate_signal(object: &Map<String, Value>) -> Result<TradingSignal, SignalError> {
    let grade_value = field(object, "grade");
    let grade = grade_value
        .as_str()
        .and_then(Grade::from_label)
        .ok_or_else(|| SignalError::violation("grade", grade_value.clone()))?;

    let confidence_value = field(object, "confidence");
    let confidence = confidence_value
        .as_u64()
        .filter(|c| *c <= 100)
        .and_then(|c| u8::try_from(c).ok())
        .ok_or_else(|| SignalError::violation("confidence", confidence_value.clone()))?;

    let action_value = field(object, "action");
    let action = action_value
        .as_str()
        .and_then(SignalAction::from_label)
        .ok_or_else(|| SignalError::violation("action", action_value.clone()))?;

    let target = positive_decimal(object, "target")?;
    let stop = positive_decimal(object, "stop")?;

    let reasoning_value = field(object, "reasoning");
    let reasoning = reasoning_value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SignalError::violation("reasoning", reasoning_value.clone()))?;

    Ok(TradingSignal {
        grade,
        confidence,
        action,
        target,
        stop,
        reasoning,
    })
}

/// A JSON number strictly greater than zero, read without going through f64.
fn positive_decimal(object: &Map<String, Value>, name: &str) -> Result<Decimal, SignalError> {
    let value = field(object, name);
    let digits = match value {
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };
    digits
        .and_then(|s| Decimal::from_str(&s).or_else(|_| Decimal::from_scientific(&s)).ok())
        .filter(|d| d.is_sign_positive() && !d.is_zero())
        .ok_or_else(|| SignalError::violation(name, value.clone()))
}
