// ABOUTME: Client SDK for latchkey challenge-response authentication.
// ABOUTME: Drives the direct and redirect flows against a remote authenticator service.

mod client;
mod error;
mod http;
mod request;
mod response;
mod service;

pub use client::AuthenticatorClient;
pub use error::{AuthError, Result};
pub use http::{DefaultKeySource, DefaultSignatureService, SignatureResponse};
pub use request::AuthenticatorRequest;
pub use response::AuthenticatorResponse;
pub use service::{KeySource, RandomSource, SignatureRequest, SignatureService, SystemRandom};

// The protocol core types callers need alongside the engine.
pub use latchkey_proto::{fingerprint, ProtoError, PublicKey, SSH_ED25519, SSH_RSA};
