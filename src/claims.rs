//! Expiry introspection for the bearer tokens issued by the geo login endpoint.
//!
//! Tokens are three dot-separated segments; the middle one is an unpadded
//! base64url JSON object carrying an `exp` Unix timestamp.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::Value;

#[derive(thiserror::Error, Debug)]
pub enum ClaimsError {
    #[error("invalid token format")]
    InvalidFormat,
    #[error("failed to decode token payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to parse token claims: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no exp claim in token")]
    MissingExp,
    #[error("unexpected type for exp claim: {0}")]
    InvalidExpType(String),
}

/// Extracts the `exp` claim of `token` as an absolute timestamp
pub fn decode_expiry(token: &str) -> Result<DateTime<Utc>, ClaimsError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(ClaimsError::InvalidFormat);
    }

    let payload = URL_SAFE_NO_PAD.decode(parts[1])?;
    let claims: serde_json::Map<String, Value> = serde_json::from_slice(&payload)?;

    let exp = claims.get("exp").ok_or(ClaimsError::MissingExp)?;
    let seconds = match exp {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(|| ClaimsError::InvalidExpType(n.to_string()))?,
        other => return Err(ClaimsError::InvalidExpType(json_type_name(other).to_string())),
    };

    DateTime::from_timestamp(seconds, 0).ok_or_else(|| ClaimsError::InvalidExpType(seconds.to_string()))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
