// ABOUTME: Public key fingerprint computation for the latchkey protocol.
// ABOUTME: SHA256 over the canonical SSH wire encoding, base64 without padding.

use crate::key::PublicKey;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Compute the textual fingerprint of a public key.
///
/// The digest is SHA-256 over the key's canonical SSH wire encoding, never
/// over the base64 text as received, so independent decodes of the same key
/// agree. The result is `SHA256:` followed by the unpadded standard-base64
/// digest, the same form `ssh-keygen -lf` prints.
///
/// Two keys are considered the same registered key iff their fingerprints
/// are equal.
pub fn fingerprint(key: &PublicKey) -> String {
    let digest = Sha256::digest(key.to_wire());
    format!("SHA256:{}", STANDARD_NO_PAD.encode(digest))
}
