//! Codec utilities for typed preferences.
//!
//! Every value that crosses the persisted boundary passes through one of the
//! helpers in this crate. They come in two flavours:
//!
//! - **Strict** helpers ([`to_json`], [`from_json`], [`to_bincode`],
//!   [`decode_base64`], ...) return a [`CodecResult`] and let the caller
//!   decide what a failure means.
//! - **Safe** helpers ([`decode_or`], [`decode_or_default`], [`encode_or`],
//!   [`from_text`]) never fail. A value that cannot be converted is replaced
//!   by a caller-supplied fallback and the failure is logged at `debug`.
//!
//! JSON-text fields read through [`decode_or`], so undecodable text falls
//! back to the field default instead of failing the read.

pub mod binary;
pub mod error;
pub mod json;
pub mod text;

pub use binary::{from_bincode, to_bincode};
pub use error::{CodecError, CodecResult};
pub use json::{
    decode_or, decode_or_default, decode_or_else, encode_or, from_json, from_json_value, to_json,
    to_json_pretty, to_json_value,
};
pub use text::{decode_base64, encode_base64, from_text, to_text};
