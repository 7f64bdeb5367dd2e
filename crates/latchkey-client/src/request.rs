// ABOUTME: Redirect-flow request handed to the user's browser.
// ABOUTME: Carries the base64url payload and decodes the out-of-band response.

use crate::client::AuthenticatorClient;
use crate::error::Result;
use crate::response::AuthenticatorResponse;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;

/// A pending redirect-flow authentication attempt.
///
/// Everything needed to resume travels inside the encoded payload; the
/// request itself only pairs that payload with the client that built it.
pub struct AuthenticatorRequest<'a> {
    client: &'a AuthenticatorClient,
    encoded_payload: String,
}

impl<'a> AuthenticatorRequest<'a> {
    pub(crate) fn new(client: &'a AuthenticatorClient, encoded_payload: String) -> Self {
        Self {
            client,
            encoded_payload,
        }
    }

    /// The URL to redirect the user's browser to. The port is elided for
    /// the default HTTPS port.
    pub fn url(&self) -> String {
        if self.client.port() == 443 {
            format!(
                "https://{}/authenticator/sign/{}",
                self.client.hostname(),
                self.encoded_payload
            )
        } else {
            format!(
                "https://{}:{}/authenticator/sign/{}",
                self.client.hostname(),
                self.client.port(),
                self.encoded_payload
            )
        }
    }

    pub fn encoded_payload(&self) -> &str {
        &self.encoded_payload
    }

    /// Complete the attempt from the base64url response returned
    /// out-of-band. The signed payload is this request's own encoding.
    pub async fn process_response(&self, response: &str) -> Result<AuthenticatorResponse> {
        let payload = URL_SAFE.decode(&self.encoded_payload)?;
        let envelope = URL_SAFE.decode(response)?;
        self.client.process_response(&payload, &envelope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENCODED: &str = "KX1YIKPRkmHggrCC6KB90CuyNVsl2QO8ddgkgCruZIijgn1xxr0Wxnt8bURKbF0B8j8Af1aXW";

    #[test]
    fn test_url_on_default_port() {
        let client = AuthenticatorClient::new("test.mydomain.com");
        let request = AuthenticatorRequest::new(&client, ENCODED.to_string());
        assert_eq!(
            request.url(),
            format!("https://test.mydomain.com/authenticator/sign/{ENCODED}")
        );
    }

    #[test]
    fn test_url_on_custom_port() {
        let client = AuthenticatorClient::new("test.mydomain.com").with_port(8443);
        let request = AuthenticatorRequest::new(&client, ENCODED.to_string());
        assert_eq!(
            request.url(),
            format!("https://test.mydomain.com:8443/authenticator/sign/{ENCODED}")
        );
    }
}
