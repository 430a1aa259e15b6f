//! Minimal JWT inspection. Signatures are not verified; the server does that.

use base64::Engine as _;
use chrono::{DateTime, Utc};

/// Error type for token inspection
#[derive(Debug)]
pub enum AuthError {
    InvalidToken(String),
    DecodeError(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidToken(msg) => write!(f, "Invalid token: {}", msg),
            AuthError::DecodeError(msg) => write!(f, "Decode error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

/// Decodes the payload segment of a JWT
pub fn decode_payload(token: &str) -> Result<serde_json::Value, AuthError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::InvalidToken(format!(
            "expected 3 parts, got {}",
            parts.len()
        )));
    }

    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| AuthError::DecodeError(format!("payload is not base64url: {}", e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::DecodeError(format!("payload is not JSON: {}", e)))
}

/// True when `exp` is in the past. Tokens without `exp` never expire;
/// tokens that cannot be decoded count as expired.
pub fn is_expired(token: &str, now: DateTime<Utc>) -> bool {
    match decode_payload(token) {
        Ok(payload) => match payload.get("exp").and_then(|v| v.as_i64()) {
            Some(exp) => now.timestamp() >= exp,
            None => false,
        },
        Err(e) => {
            log::debug!("Treating undecodable token as expired: {}", e);
            true
        }
    }
}

/// The `sub` claim (user id)
pub fn subject(token: &str) -> Option<String> {
    decode_payload(token)
        .ok()?
        .get("sub")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
pub(crate) fn make_token(payload: serde_json::Value) -> String {
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    format!(
        "{}.{}.signature",
        engine.encode(br#"{"alg":"HS256","typ":"JWT"}"#),
        engine.encode(payload.to_string())
    )
}
