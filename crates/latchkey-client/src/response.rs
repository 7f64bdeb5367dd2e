// ABOUTME: Terminal artifact of a completed authentication attempt.
// ABOUTME: Pairs the signed payload with the key and exposes verification.

use latchkey_proto::{verify_signature, PublicKey};

/// The outcome of an authentication attempt, ready for verification.
///
/// Created once a signature is obtained, directly or via the redirect
/// callback, and never mutated.
#[derive(Debug, Clone)]
pub struct AuthenticatorResponse {
    key: PublicKey,
    payload: Vec<u8>,
    signature: Vec<u8>,
    flags: u32,
}

impl AuthenticatorResponse {
    pub fn new(key: PublicKey, payload: Vec<u8>, signature: Vec<u8>, flags: u32) -> Self {
        Self {
            key,
            payload,
            signature,
            flags,
        }
    }

    /// Check the signature over the payload with the response's key and
    /// flags. Pure and deterministic.
    pub fn verify(&self) -> bool {
        verify_signature(&self.key, &self.payload, &self.signature, self.flags)
    }

    pub fn key(&self) -> &PublicKey {
        &self.key
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }
}
