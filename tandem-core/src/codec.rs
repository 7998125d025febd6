//! Transport-safe encoding for handshake payloads.
//!
//! Values are serialised to JSON and then to padded standard base64.
//! Decoding also accepts the URL-safe alphabet with or without padding,
//! which is what survives being pasted through links and chat apps.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to serialise payload: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("encoded payload has impossible length {0}")]
    Length(usize),
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("decoded payload is not valid JSON for the expected type: {0}")]
    Json(#[source] serde_json::Error),
}

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, CodecError> {
    let json = serde_json::to_vec(value).map_err(CodecError::Serialize)?;
    Ok(STANDARD.encode(json))
}

/// Decodes `encoded`, reporting a diagnostic and returning `None` on any
/// malformed input.
pub fn decode<T: DeserializeOwned>(encoded: &str) -> Option<T> {
    match try_decode(encoded) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, len = encoded.len(), "discarding undecodable payload");
            None
        }
    }
}

pub fn try_decode<T: DeserializeOwned>(encoded: &str) -> Result<T, CodecError> {
    let normalized = normalize(encoded)?;
    let bytes = STANDARD.decode(normalized)?;
    serde_json::from_slice(&bytes).map_err(CodecError::Json)
}

fn normalize(encoded: &str) -> Result<String, CodecError> {
    let mut s: String = encoded
        .trim()
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    match s.len() % 4 {
        0 => {}
        1 => return Err(CodecError::Length(s.len())),
        rem => s.extend(std::iter::repeat_n('=', 4 - rem)),
    }
    Ok(s)
}
