// ABOUTME: SSH public key transcoding between authorized_keys text and wire form.
// ABOUTME: Supports ssh-rsa and ssh-ed25519; the wire blob is the canonical encoding.

use crate::error::{ProtoError, Result};
use crate::wire::{ByteReader, ByteWriter};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::pkcs8::DecodePublicKey;
use ed25519_dalek::VerifyingKey;
use rsa::BigUint;

/// SSH algorithm tag for RSA keys.
pub const SSH_RSA: &str = "ssh-rsa";

/// SSH algorithm tag for Ed25519 keys.
pub const SSH_ED25519: &str = "ssh-ed25519";

/// ASN.1 SubjectPublicKeyInfo header for an Ed25519 key. Prepending this to
/// the raw 32-byte public key yields the DER encoding.
pub const ED25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

/// A public key registered with the authenticator directory.
///
/// Immutable once decoded. The closed set of variants keeps algorithm
/// dispatch exhaustive at every use site: transcoding, fingerprinting,
/// flag selection, and verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Rsa { exponent: BigUint, modulus: BigUint },
    Ed25519(VerifyingKey),
}

impl PublicKey {
    /// The SSH algorithm tag for this key.
    pub fn algorithm(&self) -> &'static str {
        match self {
            PublicKey::Rsa { .. } => SSH_RSA,
            PublicKey::Ed25519(_) => SSH_ED25519,
        }
    }

    /// Decode one authorized_keys line: `algorithm base64 comment`.
    ///
    /// The leading algorithm token is informational only; the tag embedded
    /// in the decoded wire blob is authoritative.
    pub fn from_authorized_key(line: &str) -> Result<Self> {
        let mut parts = line.trim().splitn(3, char::is_whitespace);
        let _algorithm = parts
            .next()
            .filter(|field| !field.is_empty())
            .ok_or_else(|| ProtoError::MalformedKey("missing algorithm field".to_string()))?;
        let blob = parts
            .next()
            .ok_or_else(|| ProtoError::MalformedKey("missing key data field".to_string()))?;
        let _comment = parts
            .next()
            .ok_or_else(|| ProtoError::MalformedKey("missing comment field".to_string()))?;

        Self::from_wire(&STANDARD.decode(blob)?)
    }

    /// Decode a key from its SSH wire encoding.
    pub fn from_wire(data: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let algorithm = reader.read_string()?;
        match algorithm.as_str() {
            SSH_RSA => {
                let exponent = reader.read_big_integer()?;
                let modulus = reader.read_big_integer()?;
                Ok(PublicKey::Rsa { exponent, modulus })
            }
            SSH_ED25519 => {
                let raw = reader.read_binary_string()?;
                let mut der = Vec::with_capacity(ED25519_SPKI_PREFIX.len() + raw.len());
                der.extend_from_slice(&ED25519_SPKI_PREFIX);
                der.extend_from_slice(&raw);
                let key = VerifyingKey::from_public_key_der(&der)
                    .map_err(|e| ProtoError::MalformedKey(format!("invalid ed25519 key: {e}")))?;
                Ok(PublicKey::Ed25519(key))
            }
            other => Err(ProtoError::UnsupportedKeyType(other.to_string())),
        }
    }

    /// Encode this key in SSH wire form.
    ///
    /// This is the canonical encoding that fingerprints are computed over.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.write_string(self.algorithm());
        match self {
            PublicKey::Rsa { exponent, modulus } => {
                writer.write_big_integer(exponent);
                writer.write_big_integer(modulus);
            }
            PublicKey::Ed25519(key) => {
                writer.write_binary_string(key.as_bytes());
            }
        }
        writer.into_bytes()
    }

    /// Render this key as an authorized_keys line with the given comment.
    pub fn to_authorized_key(&self, comment: &str) -> String {
        format!(
            "{} {} {}",
            self.algorithm(),
            STANDARD.encode(self.to_wire()),
            comment
        )
    }
}
