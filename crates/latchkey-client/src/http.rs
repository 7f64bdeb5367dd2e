// ABOUTME: Default HTTP adapters for the authenticator service endpoints.
// ABOUTME: Key listing over GET and signature requests over a form POST with a JSON envelope.

use crate::error::{AuthError, Result};
use crate::service::{KeySource, SignatureRequest, SignatureService};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use latchkey_proto::ByteReader;
use serde::Deserialize;
use tracing::debug;

/// Key source backed by the service's authorized-keys endpoint.
///
/// `GET https://host:port/app/api/authenticator/keys/{principal}` returns
/// an authorized_keys listing whose first line must begin `# Authorized`.
pub struct DefaultKeySource {
    hostname: String,
    port: u16,
    http: reqwest::Client,
}

impl DefaultKeySource {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            http: reqwest::Client::new(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

#[async_trait]
impl KeySource for DefaultKeySource {
    async fn list_keys(&self, principal: &str) -> Result<Vec<String>> {
        let url = format!(
            "https://{}:{}/app/api/authenticator/keys/{}",
            self.hostname, self.port, principal
        );
        let body = self.http.get(&url).send().await?.text().await?;
        debug!(host = %self.hostname, "received authorized keys listing");

        let mut lines = body.lines();
        match lines.next() {
            Some(first) if first.starts_with("# Authorized") => {}
            _ => {
                return Err(AuthError::Service(format!(
                    "unable to list authorized keys from {}",
                    self.hostname
                )))
            }
        }

        Ok(lines
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(String::from)
            .collect())
    }
}

/// JSON envelope the signing endpoint responds with.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct SignatureResponse {
    pub success: bool,
    pub message: String,
    pub signature: String,
    pub response: String,
}

/// Signature service backed by the service's signing endpoint.
pub struct DefaultSignatureService {
    hostname: String,
    port: u16,
    http: reqwest::Client,
}

impl DefaultSignatureService {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            http: reqwest::Client::new(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

#[async_trait]
impl SignatureService for DefaultSignatureService {
    async fn request_signature(&self, request: &SignatureRequest) -> Result<Vec<u8>> {
        let url = format!(
            "https://{}:{}/app/api/authenticator/signPayload",
            self.hostname, self.port
        );
        let flags = request.flags.to_string();
        let form = [
            ("username", request.principal.as_str()),
            ("fingerprint", request.fingerprint.as_str()),
            ("remoteName", request.remote_name.as_str()),
            ("text", request.text.as_str()),
            ("authorizeText", request.button_text.as_str()),
            ("flags", flags.as_str()),
            ("payload", request.encoded_payload.as_str()),
        ];

        let response = self.http.post(&url).form(&form).send().await?;
        debug!(status = %response.status(), "received signing response");
        let envelope: SignatureResponse = response.json().await?;

        if !envelope.success {
            return Err(AuthError::Service(envelope.message));
        }

        if envelope.signature.is_empty() {
            // No signature, so the embedded binary envelope carries the
            // real outcome; a failure there has the displayable message.
            let raw = URL_SAFE.decode(&envelope.response)?;
            let mut reader = ByteReader::new(&raw);
            if !reader.read_boolean().map_err(AuthError::from)? {
                return Err(AuthError::Service(
                    reader.read_string().map_err(AuthError::from)?,
                ));
            }
            return Err(AuthError::Service(
                "the server did not respond with a valid signature".to_string(),
            ));
        }

        Ok(URL_SAFE.decode(&envelope.signature)?)
    }
}
