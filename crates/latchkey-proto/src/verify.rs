// ABOUTME: Signature verification against a decoded public key.
// ABOUTME: RSA digest selection is driven by protocol flags; Ed25519 is pure EdDSA.

use crate::key::PublicKey;
use rsa::pkcs1v15;
use rsa::signature::Verifier;
use rsa::{BigUint, RsaPublicKey};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

/// RSA signatures were produced over a SHA-512 digest.
pub const FLAG_RSA_SHA512: u32 = 4;

/// RSA signatures were produced over a SHA-256 digest.
pub const FLAG_RSA_SHA256: u32 = 2;

/// Check a signature over a payload.
///
/// For RSA keys the `flags` value selects the digest: 4 means SHA-512,
/// 2 means SHA-256, and any other value falls back to SHA-1, all with
/// PKCS#1 v1.5 padding. Flags carry no meaning for Ed25519.
///
/// This is a pure function; malformed keys or signatures simply verify
/// as false.
pub fn verify_signature(key: &PublicKey, payload: &[u8], signature: &[u8], flags: u32) -> bool {
    match key {
        PublicKey::Rsa { exponent, modulus } => {
            verify_rsa(exponent, modulus, payload, signature, flags)
        }
        PublicKey::Ed25519(key) => verify_ed25519(key, payload, signature),
    }
}

fn verify_rsa(exponent: &BigUint, modulus: &BigUint, payload: &[u8], signature: &[u8], flags: u32) -> bool {
    let Ok(key) = RsaPublicKey::new(modulus.clone(), exponent.clone()) else {
        return false;
    };
    let Ok(signature) = pkcs1v15::Signature::try_from(signature) else {
        return false;
    };
    match flags {
        FLAG_RSA_SHA512 => pkcs1v15::VerifyingKey::<Sha512>::new(key)
            .verify(payload, &signature)
            .is_ok(),
        FLAG_RSA_SHA256 => pkcs1v15::VerifyingKey::<Sha256>::new(key)
            .verify(payload, &signature)
            .is_ok(),
        _ => pkcs1v15::VerifyingKey::<Sha1>::new(key)
            .verify(payload, &signature)
            .is_ok(),
    }
}

fn verify_ed25519(key: &ed25519_dalek::VerifyingKey, payload: &[u8], signature: &[u8]) -> bool {
    let Ok(signature) = ed25519_dalek::Signature::from_slice(signature) else {
        return false;
    };
    ed25519_dalek::Verifier::verify(key, payload, &signature).is_ok()
}
