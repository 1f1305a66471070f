use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CodecError, CodecResult};

/// Serialize a value with bincode.
pub fn to_bincode<T: Serialize + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Deserialize a bincode-encoded value.
pub fn from_bincode<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}
