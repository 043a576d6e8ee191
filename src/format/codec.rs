//! Binary-to-text encoding for envelopes.

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::error::Result;

/// Encodes bytes as standard padded base64.
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes standard padded base64.
///
/// # Errors
///
/// Returns [`crate::Error::MalformedEncoding`] on characters outside the
/// alphabet, bad padding, or truncated input.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(text)?)
}
