// ABOUTME: Collaborator contracts for the authentication engine.
// ABOUTME: Key listing, remote signing, and random bytes are injected capabilities.

use crate::error::Result;
use async_trait::async_trait;
use rand::RngCore;

/// One authentication attempt as presented to the signing service.
#[derive(Debug, Clone)]
pub struct SignatureRequest {
    /// The identity being authenticated, typically an email address.
    pub principal: String,
    /// Fingerprint of the selected registered key.
    pub fingerprint: String,
    /// Name the remote end displays for this relying party.
    pub remote_name: String,
    /// Fully substituted prompt shown to the user.
    pub text: String,
    /// Label for the approval button.
    pub button_text: String,
    /// base64url encoding of the payload to sign.
    pub encoded_payload: String,
    /// Signature parameter flags; selects the RSA digest.
    pub flags: u32,
}

/// Supplies the raw authorized_keys lines registered for a principal.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn list_keys(&self, principal: &str) -> Result<Vec<String>>;
}

/// Obtains a signature over a payload from the remote service.
#[async_trait]
pub trait SignatureService: Send + Sync {
    /// Returns the raw signature bytes, or a service error carrying a
    /// human-readable message.
    async fn request_signature(&self, request: &SignatureRequest) -> Result<Vec<u8>>;
}

/// Provides random bytes for payloads, nonces, and noise padding.
///
/// Injected so tests can substitute deterministic sequences; production
/// code must use a cryptographically secure source.
pub trait RandomSource: Send + Sync {
    fn fill_bytes(&self, buf: &mut [u8]);
}

/// Default random source backed by the thread-local CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRandom;

impl RandomSource for SystemRandom {
    fn fill_bytes(&self, buf: &mut [u8]) {
        rand::thread_rng().fill_bytes(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_random_fills_whole_buffer() {
        // A 32-byte buffer staying all zero has probability 2^-256.
        let mut buf = [0u8; 32];
        SystemRandom.fill_bytes(&mut buf);
        assert_ne!(buf, [0u8; 32]);
    }

    #[test]
    fn test_system_random_sequences_differ() {
        let mut a = [0u8; 16];
        let mut b = [0u8; 16];
        SystemRandom.fill_bytes(&mut a);
        SystemRandom.fill_bytes(&mut b);
        assert_ne!(a, b);
    }
}
