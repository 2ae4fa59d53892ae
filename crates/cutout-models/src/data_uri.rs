//! Data-URI decoding and encoding for image payloads.
//!
//! Clients submit images as base64 strings, optionally prefixed with a
//! `data:<mime>;base64,` scheme marker. Responses are always PNG data-URIs.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

/// PNG file signature.
pub const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

/// Errors produced while decoding an image payload.
#[derive(Debug, Error)]
pub enum DataUriError {
    #[error("Payload is empty")]
    Empty,

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Decode a base64 image payload, stripping an optional data-URI prefix.
pub fn decode_image(input: &str) -> Result<Vec<u8>, DataUriError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DataUriError::Empty);
    }

    // `data:image/png;base64,<payload>` -> keep only the payload part
    let payload = match input.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => input,
    };

    Ok(BASE64.decode(payload.as_bytes())?)
}

/// Encode binary image data as a PNG data-URI.
pub fn encode_png(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(bytes))
}

/// Check whether a byte buffer starts with the PNG signature.
pub fn is_png(bytes: &[u8]) -> bool {
    bytes.starts_with(PNG_SIGNATURE)
}
