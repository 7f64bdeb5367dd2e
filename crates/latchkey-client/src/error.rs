// ABOUTME: Error types for the latchkey client using thiserror.
// ABOUTME: Typed authentication failures plus wrapped protocol and transport errors.

use latchkey_proto::ProtoError;
use thiserror::Error;

/// Errors surfaced by the authentication engine.
///
/// Display strings are safe to show to a user; service-provided failure
/// messages are passed through verbatim.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The principal has no registered keys at all.
    #[error("{0} has no registered authenticator keys")]
    NotRegistered(String),

    /// The principal has keys, but none decodes, passes the algorithm
    /// filter, and yields a usable signature.
    #[error("no suitable key found for {0}")]
    NoSuitableKey(String),

    /// The remote service reported a failure.
    #[error("{0}")]
    Service(String),

    /// Protocol-level decode or encode failure.
    #[error(transparent)]
    Proto(#[from] ProtoError),

    /// The HTTP transport failed.
    #[error("request to authenticator service failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl From<base64::DecodeError> for AuthError {
    fn from(err: base64::DecodeError) -> Self {
        AuthError::Proto(ProtoError::from(err))
    }
}

/// Result type alias using AuthError.
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_message_passes_through_verbatim() {
        let err = AuthError::Service("It's all gone a bit Pete Tong".to_string());
        assert_eq!(format!("{}", err), "It's all gone a bit Pete Tong");
    }

    #[test]
    fn test_not_registered_names_the_principal() {
        let err = AuthError::NotRegistered("test@test.com".to_string());
        assert!(format!("{}", err).contains("test@test.com"));
    }

    #[test]
    fn test_proto_error_is_transparent() {
        let err = AuthError::from(ProtoError::Underflow {
            needed: 4,
            available: 0,
        });
        assert!(format!("{}", err).contains("4 bytes"));
    }
}
