//! Error types for CBOR decoding.

use thiserror::Error;

/// Result type alias for CBOR decoding operations.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Errors that can occur while decoding CBOR.
///
/// All decode errors are fatal for the value being decoded: a failed decode
/// abandons the entire top-level value.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The input buffer ended before the encoding was complete.
    #[error("Truncated input: needed {needed} more byte(s), {available} available")]
    TruncatedInput { needed: usize, available: usize },

    /// Bytes remained after the top-level value was fully decoded.
    #[error("Trailing data: {remaining} byte(s) after end of value")]
    TrailingData { remaining: usize },

    /// Malformed additional-information value in a head byte (28-30).
    #[error("Invalid length encoding: additional information {info}")]
    InvalidLengthEncoding { info: u8 },

    /// Indefinite length used on a major type that does not allow it (0, 1, 6, 7).
    #[error("Invalid indefinite length on major type {major}")]
    InvalidIndefiniteLength { major: u8 },

    /// A chunk inside an indefinite-length string had the wrong major type
    /// or was itself indefinite.
    #[error("Invalid chunk inside indefinite-length string of major type {major}")]
    InvalidChunk { major: u8 },

    /// A text string contained invalid UTF-8.
    #[error("Invalid UTF-8 in text string")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The byte stream ended while the decoder still expected input.
    #[error("Unexpected end of input")]
    UnexpectedEndOfInput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DecodeError::TruncatedInput {
            needed: 4,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "Truncated input: needed 4 more byte(s), 2 available"
        );

        let err = DecodeError::InvalidLengthEncoding { info: 28 };
        assert_eq!(err.to_string(), "Invalid length encoding: additional information 28");
    }
}
