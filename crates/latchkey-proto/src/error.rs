// ABOUTME: Error types for the latchkey protocol core using thiserror.
// ABOUTME: Covers buffer underflow, unsupported algorithms, and malformed key material.

use thiserror::Error;

/// Errors that can occur while decoding or encoding protocol data.
#[derive(Error, Debug)]
pub enum ProtoError {
    /// A length-prefixed field declared more bytes than the buffer holds.
    #[error("declared length of {needed} bytes exceeds available data of {available} bytes")]
    Underflow { needed: usize, available: usize },

    /// An SSH algorithm tag this implementation does not know.
    #[error("unsupported key type {0}")]
    UnsupportedKeyType(String),

    /// A key line or key blob that does not follow the expected layout.
    #[error("malformed key: {0}")]
    MalformedKey(String),

    /// Base64 text that could not be decoded.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Result type alias using ProtoError.
pub type Result<T> = std::result::Result<T, ProtoError>;
