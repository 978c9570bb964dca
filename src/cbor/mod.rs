//! Streaming CBOR decoder.
//!
//! Decodes a single well-formed CBOR value from a byte source, either in one
//! shot from a complete buffer ([`decode`]) or incrementally from chunks
//! arriving over time ([`Decoder`]). Every composite and string node in the
//! decoded tree carries the byte span it was read from, which is what makes
//! the decoder useful for inspecting on-chain payloads (UTxO datums, script
//! references) where provenance matters.

mod decoder;
mod error;
mod value;

pub use decoder::{Decoder, decode};
pub use error::{DecodeError, Result};
pub use value::{ByteSpan, Value};
