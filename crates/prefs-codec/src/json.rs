use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{CodecError, CodecResult};

/// Serialize a value as compact JSON text.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> CodecResult<String> {
    serde_json::to_string(value).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Serialize a value as indented, human-readable JSON text.
pub fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> CodecResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Parse JSON text into a value.
pub fn from_json<T: DeserializeOwned>(text: &str) -> CodecResult<T> {
    serde_json::from_str(text).map_err(|e| CodecError::Decode(e.to_string()))
}

/// Convert a value into a structured JSON tree.
pub fn to_json_value<T: Serialize + ?Sized>(value: &T) -> CodecResult<Value> {
    serde_json::to_value(value).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Convert a structured JSON tree into a typed value.
pub fn from_json_value<T: DeserializeOwned>(value: Value) -> CodecResult<T> {
    serde_json::from_value(value).map_err(|e| CodecError::Decode(e.to_string()))
}

/// Parse JSON text, returning `fallback` if the text does not decode.
pub fn decode_or<T: DeserializeOwned>(text: &str, fallback: T) -> T {
    decode_or_else(text, || fallback)
}

/// Parse JSON text, returning `T::default()` if the text does not decode.
pub fn decode_or_default<T: DeserializeOwned + Default>(text: &str) -> T {
    decode_or_else(text, T::default)
}

/// Parse JSON text, computing a fallback if the text does not decode.
pub fn decode_or_else<T, F>(text: &str, fallback: F) -> T
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match from_json(text) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "json decode failed; using fallback");
            fallback()
        }
    }
}

/// Serialize a value as JSON, returning `fallback` text if encoding fails.
pub fn encode_or<T: Serialize + ?Sized>(value: &T, fallback: &str) -> String {
    match to_json(value) {
        Ok(text) => text,
        Err(e) => {
            debug!(error = %e, "json encode failed; using fallback");
            fallback.to_string()
        }
    }
}
