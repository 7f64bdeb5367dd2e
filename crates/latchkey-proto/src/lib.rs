// ABOUTME: Protocol core for latchkey challenge-response authentication.
// ABOUTME: Pure wire codec, SSH key transcoding, fingerprints, and signature checks.

mod error;
mod fingerprint;
mod key;
mod verify;
mod wire;

pub use error::{ProtoError, Result};
pub use fingerprint::fingerprint;
pub use key::{PublicKey, ED25519_SPKI_PREFIX, SSH_ED25519, SSH_RSA};
pub use verify::{verify_signature, FLAG_RSA_SHA256, FLAG_RSA_SHA512};
pub use wire::{ByteReader, ByteWriter};
