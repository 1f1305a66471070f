use std::fmt::Display;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use crate::error::{CodecError, CodecResult};

/// Render a value through its `Display` implementation.
pub fn to_text<T: Display + ?Sized>(value: &T) -> String {
    value.to_string()
}

/// Parse a value through its `FromStr` implementation.
///
/// Returns `None` (and logs at `debug`) if the text does not parse.
pub fn from_text<T>(text: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    match text.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(text, error = %e, "text decode failed");
            None
        }
    }
}

/// Encode raw bytes as standard-alphabet base64.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard-alphabet base64 into raw bytes.
pub fn decode_base64(text: &str) -> CodecResult<Vec<u8>> {
    STANDARD
        .decode(text.trim())
        .map_err(|e| CodecError::Base64(e.to_string()))
}
