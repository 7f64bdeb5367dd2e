// ABOUTME: The authentication protocol engine.
// ABOUTME: Selects a registered key, drives the direct or redirect flow, and builds responses.

use crate::error::{AuthError, Result};
use crate::http::{DefaultKeySource, DefaultSignatureService};
use crate::request::AuthenticatorRequest;
use crate::response::AuthenticatorResponse;
use crate::service::{KeySource, RandomSource, SignatureRequest, SignatureService, SystemRandom};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use latchkey_proto::{fingerprint, ByteReader, ByteWriter, PublicKey, FLAG_RSA_SHA512, SSH_RSA};
use std::sync::Arc;
use tracing::{debug, warn};

const DEFAULT_PROMPT: &str =
    "{username} wants to authenticate from {remoteName} using your {hostname} credentials.";

/// Client for the challenge-response authentication service.
///
/// The engine holds no per-attempt state: each call constructs fresh
/// buffers and requests, and the redirect flow round-trips everything it
/// needs inside the encoded payload. Collaborators are injected traits so
/// the engine can be exercised without network I/O.
pub struct AuthenticatorClient {
    hostname: String,
    port: u16,
    remote_name: String,
    prompt_text: String,
    authorize_text: String,
    supported_algorithms: Option<Vec<String>>,
    key_source: Option<Arc<dyn KeySource>>,
    signature_service: Option<Arc<dyn SignatureService>>,
    random: Arc<dyn RandomSource>,
}

impl AuthenticatorClient {
    /// Create a client for the service at `hostname` on the default
    /// HTTPS port.
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            port: 443,
            remote_name: "Authenticator API".to_string(),
            prompt_text: DEFAULT_PROMPT.to_string(),
            authorize_text: "Authorize".to_string(),
            supported_algorithms: None,
            key_source: None,
            signature_service: None,
            random: Arc::new(SystemRandom),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_remote_name(mut self, remote_name: impl Into<String>) -> Self {
        self.remote_name = remote_name.into();
        self
    }

    /// Set the prompt template. `{username}`, `{remoteName}`, and
    /// `{hostname}` placeholders are substituted per attempt.
    pub fn with_prompt_text(mut self, prompt_text: impl Into<String>) -> Self {
        self.prompt_text = prompt_text.into();
        self
    }

    pub fn with_authorize_text(mut self, authorize_text: impl Into<String>) -> Self {
        self.authorize_text = authorize_text.into();
        self
    }

    /// Restrict key selection to the given SSH algorithm tags. Unset
    /// means every known algorithm is accepted.
    pub fn with_supported_algorithms<I, S>(mut self, algorithms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_algorithms = Some(algorithms.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_key_source(mut self, key_source: Arc<dyn KeySource>) -> Self {
        self.key_source = Some(key_source);
        self
    }

    pub fn with_signature_service(mut self, signature_service: Arc<dyn SignatureService>) -> Self {
        self.signature_service = Some(signature_service);
        self
    }

    pub fn with_random_source(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    pub fn prompt_text(&self) -> &str {
        &self.prompt_text
    }

    pub fn authorize_text(&self) -> &str {
        &self.authorize_text
    }

    /// Authenticate a principal with a freshly generated 128-byte random
    /// payload.
    pub async fn authenticate(&self, principal: &str) -> Result<AuthenticatorResponse> {
        let mut payload = [0u8; 128];
        self.random.fill_bytes(&mut payload);
        self.authenticate_with_payload(principal, &payload).await
    }

    /// Authenticate a principal over a caller-supplied payload.
    ///
    /// Candidate keys are tried strictly in listing order. Keys that fail
    /// to decode or are excluded by the algorithm filter are skipped; the
    /// first qualifying key is sent for signing. Signing failures
    /// propagate rather than falling through to the next key.
    pub async fn authenticate_with_payload(
        &self,
        principal: &str,
        payload: &[u8],
    ) -> Result<AuthenticatorResponse> {
        for line in self.list_keys(principal).await {
            let key = match PublicKey::from_authorized_key(&line) {
                Ok(key) => key,
                Err(e) => {
                    warn!(error = %e, "skipping key that failed to decode");
                    continue;
                }
            };
            debug!(algorithm = key.algorithm(), "decoded public key");

            if !self.is_supported(&key) {
                debug!(
                    algorithm = key.algorithm(),
                    "key excluded by supported algorithm filter"
                );
                continue;
            }

            return self.sign_payload(principal, key, payload).await;
        }

        Err(AuthError::NoSuitableKey(principal.to_string()))
    }

    /// Every decodable key registered for a principal, in listing order.
    ///
    /// Per-key failures are logged and skipped so one bad directory entry
    /// never hides the rest.
    pub async fn get_user_keys(&self, principal: &str) -> Vec<PublicKey> {
        let mut keys = Vec::new();
        for line in self.list_keys(principal).await {
            match PublicKey::from_authorized_key(&line) {
                Ok(key) => {
                    debug!(algorithm = key.algorithm(), "decoded public key");
                    keys.push(key);
                }
                Err(e) => warn!(error = %e, "skipping key that failed to decode"),
            }
        }
        keys
    }

    /// Look up a principal's key by fingerprint against the current
    /// directory listing. The match must be exact.
    pub async fn get_user_key(&self, username: &str, fingerprint_text: &str) -> Result<PublicKey> {
        for key in self.get_user_keys(username).await {
            if fingerprint(&key) == fingerprint_text {
                return Ok(key);
            }
        }
        Err(AuthError::NoSuitableKey(username.to_string()))
    }

    /// The principal's default key: the first non-RSA key in listing
    /// order, or the first key overall when every key is RSA.
    pub async fn get_default_key(&self, email: &str) -> Result<PublicKey> {
        let keys = self.get_user_keys(email).await;
        if keys.is_empty() {
            return Err(AuthError::NotRegistered(email.to_string()));
        }
        Ok(keys
            .iter()
            .find(|key| key.algorithm() != SSH_RSA)
            .unwrap_or(&keys[0])
            .clone())
    }

    /// Signature flags for a key: RSA keys request a SHA-512 signature,
    /// everything else uses the default of zero.
    pub fn get_flags(&self, key: &PublicKey) -> u32 {
        match key {
            PublicKey::Rsa { .. } => FLAG_RSA_SHA512,
            PublicKey::Ed25519(_) => 0,
        }
    }

    /// Build a redirect-flow request for the principal's default key.
    ///
    /// The returned request carries a base64url payload holding everything
    /// needed to resume the attempt later; the engine keeps no state. The
    /// nonce and trailing noise bytes only make the encoding unpredictable
    /// and are never read back.
    pub async fn generate_request(
        &self,
        email: &str,
        redirect_url: &str,
    ) -> Result<AuthenticatorRequest<'_>> {
        let key = self.get_default_key(email).await?;
        let fingerprint = fingerprint(&key);
        let flags = self.get_flags(&key);

        let mut nonce = [0u8; 4];
        self.random.fill_bytes(&mut nonce);
        let mut noise = [0u8; 16];
        self.random.fill_bytes(&mut noise);

        let mut writer = ByteWriter::new();
        writer.write_string(email);
        writer.write_string(&fingerprint);
        writer.write_string(&self.remote_name);
        writer.write_string(&self.prompt_text);
        writer.write_string(&self.authorize_text);
        writer.write_int(flags);
        writer.write_raw(&nonce);
        writer.write_string(redirect_url);
        writer.write_raw(&noise);

        Ok(AuthenticatorRequest::new(
            self,
            URL_SAFE.encode(writer.into_bytes()),
        ))
    }

    /// Complete a redirect-flow attempt from the returned binary envelope.
    ///
    /// A successful envelope names the signing key by username and
    /// fingerprint; the key must still be present in the principal's
    /// current listing.
    pub async fn process_response(
        &self,
        payload: &[u8],
        envelope: &[u8],
    ) -> Result<AuthenticatorResponse> {
        let mut reader = ByteReader::new(envelope);
        if reader.read_boolean().map_err(AuthError::from)? {
            let username = reader.read_string().map_err(AuthError::from)?;
            let fingerprint_text = reader.read_string().map_err(AuthError::from)?;
            let flags = reader.read_int().map_err(AuthError::from)?;
            let signature = reader.read_binary_string().map_err(AuthError::from)?;

            let key = self.get_user_key(&username, &fingerprint_text).await?;
            Ok(AuthenticatorResponse::new(
                key,
                payload.to_vec(),
                signature,
                flags,
            ))
        } else {
            Err(AuthError::Service(
                reader.read_string().map_err(AuthError::from)?,
            ))
        }
    }

    async fn sign_payload(
        &self,
        principal: &str,
        key: PublicKey,
        payload: &[u8],
    ) -> Result<AuthenticatorResponse> {
        let fingerprint = fingerprint(&key);
        debug!(%fingerprint, "selected key");

        let flags = self.get_flags(&key);
        let request = SignatureRequest {
            principal: principal.to_string(),
            fingerprint,
            remote_name: self.remote_name.clone(),
            text: self.replace_variables(principal),
            button_text: self.authorize_text.clone(),
            encoded_payload: URL_SAFE.encode(payload),
            flags,
        };

        let signature = self.signature_service().request_signature(&request).await?;
        Ok(AuthenticatorResponse::new(
            key,
            payload.to_vec(),
            signature,
            flags,
        ))
    }

    async fn list_keys(&self, principal: &str) -> Vec<String> {
        match self.key_source().list_keys(principal).await {
            Ok(lines) => lines,
            Err(e) => {
                // A failed listing means no keys are available; the caller
                // surfaces the appropriate typed error.
                warn!(error = %e, principal, "unable to list authorized keys");
                Vec::new()
            }
        }
    }

    fn is_supported(&self, key: &PublicKey) -> bool {
        match &self.supported_algorithms {
            Some(allowed) => allowed.iter().any(|tag| tag == key.algorithm()),
            None => true,
        }
    }

    fn replace_variables(&self, principal: &str) -> String {
        self.prompt_text
            .replace("{username}", principal)
            .replace("{remoteName}", &self.remote_name)
            .replace("{hostname}", &self.hostname)
    }

    fn key_source(&self) -> Arc<dyn KeySource> {
        self.key_source
            .clone()
            .unwrap_or_else(|| Arc::new(DefaultKeySource::new(&self.hostname, self.port)))
    }

    fn signature_service(&self) -> Arc<dyn SignatureService> {
        self.signature_service
            .clone()
            .unwrap_or_else(|| Arc::new(DefaultSignatureService::new(&self.hostname, self.port)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use latchkey_proto::{ProtoError, SSH_ED25519};
    use std::sync::Mutex;

    const ED_LINE: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIHm1Vi6P5lT5QHixEuipi6eQH4U65pW+1+DjkQutBJZk test@example.com";
    const RSA_LINE: &str = "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQCvQ4zyxQXxiEwxWa32fOgkkb4vDy2103243hbRwaqbYqJJ+aseUPLKgFf5K+BEwoolPqJ/TGfbG7776q/pSH3jw1BeNmNyqUgmGYa2h65mZlmz/Xva/DRUPDeoCOr7cJvRnuSBh2wItgrMSz9haeC0KI5thtR+otxdiy6wez1/vdMb/ZyqvhGKEtiXpvyxcJK+TdNyUatFjwZpY+Z7SOfSvrnzUhQOiCMbZ+BsVNP6ZC2Z7KmcyMkPrp/fw3RflhDXHxSyqms8KOgDIJGURCVEDp+ncGXIBRTONj+Wg5VfhMSipbrZyx4QdbBMrClauDJk3GJ7ssDomocYABN/1yQN test@example.com";
    const ED_FP: &str = "SHA256:eVkCKHnc5RjanBduU2vmOecbFl3M9wOgHdk24INJytY";

    struct StaticKeys(Vec<String>);

    #[async_trait]
    impl KeySource for StaticKeys {
        async fn list_keys(&self, _principal: &str) -> Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    struct FailingKeys;

    #[async_trait]
    impl KeySource for FailingKeys {
        async fn list_keys(&self, _principal: &str) -> Result<Vec<String>> {
            Err(AuthError::Service("connection refused".to_string()))
        }
    }

    struct CapturingService {
        signature: Vec<u8>,
        seen: Mutex<Option<SignatureRequest>>,
    }

    impl CapturingService {
        fn new(signature: Vec<u8>) -> Self {
            Self {
                signature,
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl SignatureService for CapturingService {
        async fn request_signature(&self, request: &SignatureRequest) -> Result<Vec<u8>> {
            *self.seen.lock().expect("lock") = Some(request.clone());
            Ok(self.signature.clone())
        }
    }

    struct ZeroRandom;

    impl RandomSource for ZeroRandom {
        fn fill_bytes(&self, buf: &mut [u8]) {
            buf.fill(0);
        }
    }

    fn client_with_keys(lines: &[&str]) -> AuthenticatorClient {
        AuthenticatorClient::new("localhost")
            .with_key_source(Arc::new(StaticKeys(
                lines.iter().map(|s| s.to_string()).collect(),
            )))
            .with_random_source(Arc::new(ZeroRandom))
    }

    #[tokio::test]
    async fn test_default_key_prefers_non_rsa() {
        let client = client_with_keys(&[RSA_LINE, ED_LINE]);
        let key = client.get_default_key("test").await.expect("should select");
        assert_eq!(key.algorithm(), SSH_ED25519);
    }

    #[tokio::test]
    async fn test_default_key_falls_back_to_first() {
        let client = client_with_keys(&[RSA_LINE]);
        let key = client.get_default_key("test").await.expect("should select");
        assert_eq!(key.algorithm(), SSH_RSA);
    }

    #[tokio::test]
    async fn test_default_key_without_keys_is_not_registered() {
        let client = client_with_keys(&[]);
        let err = client.get_default_key("test").await.unwrap_err();
        assert!(matches!(err, AuthError::NotRegistered(p) if p == "test"));
    }

    #[tokio::test]
    async fn test_algorithm_filter_excludes_only_key() {
        let client =
            client_with_keys(&[ED_LINE]).with_supported_algorithms([SSH_RSA.to_string()]);
        let err = client
            .authenticate_with_payload("test", &[0u8; 128])
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NoSuitableKey(p) if p == "test"));
    }

    #[tokio::test]
    async fn test_undecodable_keys_are_skipped() {
        let service = Arc::new(CapturingService::new(vec![1, 2, 3]));
        let client = client_with_keys(&["garbage line", "# comment-ish", ED_LINE])
            .with_signature_service(service.clone());
        let response = client
            .authenticate_with_payload("test", &[0u8; 128])
            .await
            .expect("should authenticate with the surviving key");
        assert_eq!(response.key().algorithm(), SSH_ED25519);
    }

    #[tokio::test]
    async fn test_key_source_failure_means_no_suitable_key() {
        let client = AuthenticatorClient::new("localhost")
            .with_key_source(Arc::new(FailingKeys));
        let err = client
            .authenticate_with_payload("test", &[0u8; 128])
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NoSuitableKey(_)));
    }

    #[tokio::test]
    async fn test_prompt_substitution_and_request_fields() {
        let service = Arc::new(CapturingService::new(vec![0u8; 64]));
        let client = client_with_keys(&[ED_LINE]).with_signature_service(service.clone());

        let payload = [0u8; 128];
        client
            .authenticate_with_payload("test", &payload)
            .await
            .expect("should authenticate");

        let seen = service.seen.lock().expect("lock").clone().expect("captured");
        assert_eq!(seen.principal, "test");
        assert_eq!(seen.fingerprint, ED_FP);
        assert_eq!(seen.remote_name, "Authenticator API");
        assert_eq!(
            seen.text,
            "test wants to authenticate from Authenticator API using your localhost credentials."
        );
        assert_eq!(seen.button_text, "Authorize");
        assert_eq!(seen.encoded_payload, URL_SAFE.encode(payload));
        assert_eq!(seen.flags, 0);
    }

    #[tokio::test]
    async fn test_rsa_key_requests_sha512_flags() {
        let service = Arc::new(CapturingService::new(vec![0u8; 256]));
        let client = client_with_keys(&[RSA_LINE]).with_signature_service(service.clone());

        client
            .authenticate_with_payload("test", &[0u8; 128])
            .await
            .expect("should authenticate");

        let seen = service.seen.lock().expect("lock").clone().expect("captured");
        assert_eq!(seen.flags, FLAG_RSA_SHA512);
    }

    #[tokio::test]
    async fn test_keys_are_tried_in_listing_order() {
        // Both keys qualify; the RSA key is listed first and must win.
        let service = Arc::new(CapturingService::new(vec![0u8; 256]));
        let client = client_with_keys(&[RSA_LINE, ED_LINE]).with_signature_service(service);
        let response = client
            .authenticate_with_payload("test", &[0u8; 128])
            .await
            .expect("should authenticate");
        assert_eq!(response.key().algorithm(), SSH_RSA);
    }

    #[tokio::test]
    async fn test_generate_request_payload_layout() {
        let client = client_with_keys(&[ED_LINE]);
        let request = client
            .generate_request("test@test.com", "https://relying.example/callback")
            .await
            .expect("should build request");

        let decoded = URL_SAFE
            .decode(request.encoded_payload())
            .expect("should decode payload");
        let mut reader = ByteReader::new(&decoded);
        assert_eq!(reader.read_string().expect("email"), "test@test.com");
        assert_eq!(reader.read_string().expect("fingerprint"), ED_FP);
        assert_eq!(reader.read_string().expect("remote name"), "Authenticator API");
        assert_eq!(reader.read_string().expect("prompt"), DEFAULT_PROMPT);
        assert_eq!(reader.read_string().expect("button"), "Authorize");
        assert_eq!(reader.read_int().expect("flags"), 0);
        assert_eq!(reader.read_int().expect("nonce"), 0); // ZeroRandom
        assert_eq!(
            reader.read_string().expect("redirect"),
            "https://relying.example/callback"
        );
        assert_eq!(reader.remaining(), 16); // trailing noise
    }

    #[tokio::test]
    async fn test_process_response_failure_envelope() {
        let client = client_with_keys(&[ED_LINE]);

        let mut writer = ByteWriter::new();
        writer.write_boolean(false);
        writer.write_string("It's all gone a bit Pete Tong");
        let err = client
            .process_response(&[0u8; 128], writer.as_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Service(m) if m == "It's all gone a bit Pete Tong"));
    }

    #[tokio::test]
    async fn test_process_response_unknown_fingerprint() {
        let client = client_with_keys(&[RSA_LINE]);

        let mut writer = ByteWriter::new();
        writer.write_boolean(true);
        writer.write_string("test");
        writer.write_string(ED_FP); // not in the listing
        writer.write_int(0);
        writer.write_binary_string(&[0u8; 64]);
        let err = client
            .process_response(&[0u8; 128], writer.as_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NoSuitableKey(p) if p == "test"));
    }

    #[tokio::test]
    async fn test_process_response_truncated_envelope() {
        let client = client_with_keys(&[ED_LINE]);
        let err = client.process_response(&[0u8; 128], &[]).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Proto(ProtoError::Underflow { .. })
        ));
    }

    #[tokio::test]
    async fn test_builder_configuration() {
        let client = AuthenticatorClient::new("test.mydomain.com")
            .with_port(8443)
            .with_remote_name("A remote name")
            .with_prompt_text("Some prompt text")
            .with_authorize_text("Some authorize text");
        assert_eq!(client.hostname(), "test.mydomain.com");
        assert_eq!(client.port(), 8443);
        assert_eq!(client.remote_name(), "A remote name");
        assert_eq!(client.prompt_text(), "Some prompt text");
        assert_eq!(client.authorize_text(), "Some authorize text");
    }
}
