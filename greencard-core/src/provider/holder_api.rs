//! Client for the central holder API.
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use super::models::{
    GetCredentialsPostData, RemoteAccessTokens, RemoteConfigProviders, RemoteCredentials,
    RemotePrepareIssue,
};
use crate::error::GreenCardError;
use crate::events::{SignatureVerifier, SignedResponse, SignedResponseError};
use crate::http_request::Request;
use crate::Environment;

/// Client for the central holder API. Every answer is a signed envelope verified against
/// the pinned central certificate.
pub struct HolderApiClient {
    base_url: String,
    request: Request,
    verifier: Arc<dyn SignatureVerifier>,
    certificate: Vec<u8>,
}

impl std::fmt::Debug for HolderApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HolderApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HolderApiClient {
    /// Creates a client for `environment`.
    #[must_use]
    pub fn new(
        environment: Environment,
        verifier: Arc<dyn SignatureVerifier>,
        certificate: Vec<u8>,
    ) -> Self {
        Self::with_base_url(environment.holder_api_url(), verifier, certificate)
    }

    /// Creates a client against a custom base URL. The URL ends with `/`.
    #[must_use]
    pub fn with_base_url(
        base_url: &str,
        verifier: Arc<dyn SignatureVerifier>,
        certificate: Vec<u8>,
    ) -> Self {
        Self {
            base_url: base_url.to_string(),
            request: Request::new(),
            verifier,
            certificate,
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Starts an issuance session.
    ///
    /// # Errors
    /// `NetworkError` when the API is unreachable, `ServerError` or `InvalidSignature`
    /// for a failed or unverifiable answer.
    pub async fn get_prepare_issue(&self) -> Result<RemotePrepareIssue, GreenCardError> {
        let url = self.url("holder/prepare_issue");
        let builder = self.request.get(&url);
        self.signed_json(&url, builder).await
    }

    /// Exchanges stored events and a commitment for green cards.
    ///
    /// # Errors
    /// As [`Self::get_prepare_issue`].
    pub async fn get_credentials(
        &self,
        data: &GetCredentialsPostData,
    ) -> Result<RemoteCredentials, GreenCardError> {
        let url = self.url("holder/get_credentials");
        let builder = self.request.post(&url).json(data);
        self.signed_json(&url, builder).await
    }

    /// Lists the event providers.
    ///
    /// # Errors
    /// As [`Self::get_prepare_issue`].
    pub async fn get_config_providers(&self) -> Result<RemoteConfigProviders, GreenCardError> {
        let url = self.url("holder/config_providers");
        let builder = self.request.get(&url);
        self.signed_json(&url, builder).await
    }

    /// Exchanges the holder's login token for per-provider access tokens.
    ///
    /// # Errors
    /// As [`Self::get_prepare_issue`].
    pub async fn get_access_tokens(
        &self,
        token: &str,
    ) -> Result<RemoteAccessTokens, GreenCardError> {
        let url = self.url("holder/access_tokens");
        let builder = self.request.post(&url).bearer_auth(token);
        self.signed_json(&url, builder).await
    }

    /// Downloads `config.json` and returns its verified bytes.
    ///
    /// # Errors
    /// As [`Self::get_prepare_issue`].
    pub async fn get_config_bytes(&self) -> Result<Vec<u8>, GreenCardError> {
        let url = self.url("holder/config");
        let builder = self.request.get(&url);
        self.signed_payload(&url, builder).await
    }

    /// Downloads `public_keys.json` and returns its verified bytes.
    ///
    /// # Errors
    /// As [`Self::get_prepare_issue`].
    pub async fn get_public_keys_bytes(&self) -> Result<Vec<u8>, GreenCardError> {
        let url = self.url("holder/public_keys");
        let builder = self.request.get(&url);
        self.signed_payload(&url, builder).await
    }

    async fn signed_json<T: DeserializeOwned>(
        &self,
        url: &str,
        builder: RequestBuilder,
    ) -> Result<T, GreenCardError> {
        let payload = self.signed_payload(url, builder).await?;
        serde_json::from_slice(&payload).map_err(|e| GreenCardError::ServerError {
            url: url.to_string(),
            status: None,
            error: format!("unexpected payload: {e}"),
        })
    }

    async fn signed_payload(
        &self,
        url: &str,
        builder: RequestBuilder,
    ) -> Result<Vec<u8>, GreenCardError> {
        let response = self.request.handle(builder).await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            log::warn!("holder api {url} answered {status}");
            return Err(server_error(url, Some(status), error_body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| server_error(url, Some(status), format!("reading body: {e}")))?;

        SignedResponse::from_bytes(&body)
            .and_then(|signed| signed.verified_payload(self.verifier.as_ref(), &self.certificate))
            .map_err(|e| match e {
                SignedResponseError::Signature(error) => {
                    GreenCardError::InvalidSignature { error }
                }
                other => server_error(url, Some(status), other.to_string()),
            })
    }
}

fn server_error(url: &str, status: Option<StatusCode>, error: String) -> GreenCardError {
    GreenCardError::ServerError {
        url: url.to_string(),
        status: status.map(|status| status.as_u16()),
        error,
    }
}

/// Encodes bytes for a JSON body field.
pub(crate) fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::test_support::{sign, FixedCertificateVerifier};
    use mockito::{Matcher, Server, ServerGuard};

    const CENTRAL_CERT: &[u8] = b"central-cert";

    fn client(server: &ServerGuard) -> HolderApiClient {
        HolderApiClient::with_base_url(
            &format!("{}/", server.url()),
            Arc::new(FixedCertificateVerifier {
                certificate: CENTRAL_CERT.to_vec(),
            }),
            CENTRAL_CERT.to_vec(),
        )
    }

    #[test]
    fn test_environment_urls() {
        let verifier: Arc<dyn SignatureVerifier> = Arc::new(FixedCertificateVerifier {
            certificate: vec![],
        });
        let staging = HolderApiClient::new(Environment::Staging, verifier.clone(), vec![]);
        assert_eq!(staging.base_url, "https://holder-api.acc.coronacheck.nl/v4/");
        let production = HolderApiClient::new(Environment::Production, verifier, vec![]);
        assert_eq!(production.base_url, "https://holder-api.coronacheck.nl/v4/");
    }

    #[tokio::test]
    async fn test_access_tokens_send_bearer() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/holder/access_tokens")
            .match_header("authorization", "Bearer digid-token")
            .with_status(200)
            .with_body(sign(&serde_json::json!({
                "tokens": [{"providerIdentifier": "GGD", "unomi": "u", "event": "e"}]
            })))
            .create_async()
            .await;

        let tokens = client(&server)
            .get_access_tokens("digid-token")
            .await
            .unwrap();

        assert_eq!(tokens.tokens.len(), 1);
        assert_eq!(tokens.tokens[0].provider_identifier, "GGD");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_credentials_posts_events() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/holder/get_credentials")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "stoken": "session",
                "issueCommitmentMessage": "Y29tbWl0"
            })))
            .with_status(200)
            .with_body(sign(&serde_json::json!({"euGreencards": []})))
            .create_async()
            .await;

        let credentials = client(&server)
            .get_credentials(&GetCredentialsPostData {
                events: vec![],
                stoken: "session".to_string(),
                issue_commitment_message: encode_base64(b"commit"),
            })
            .await
            .unwrap();

        assert!(credentials.domestic_greencard.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_failure_is_server_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/holder/prepare_issue")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let err = client(&server).get_prepare_issue().await.unwrap_err();
        match err {
            GreenCardError::ServerError { status, error, .. } => {
                assert_eq!(status, Some(500));
                assert_eq!(error, "boom");
            }
            other => panic!("expected ServerError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unsigned_answer_is_rejected() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/holder/config_providers")
            .with_status(200)
            .with_body(r#"{"eventProviders": []}"#)
            .create_async()
            .await;

        let err = client(&server).get_config_providers().await.unwrap_err();
        assert!(matches!(err, GreenCardError::ServerError { .. }));
    }

    #[tokio::test]
    async fn test_foreign_signature_is_invalid_signature() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/holder/config")
            .with_status(200)
            .with_body(sign(&serde_json::json!({"minimumVersion": 1})))
            .create_async()
            .await;

        let other = HolderApiClient::with_base_url(
            &format!("{}/", server.url()),
            Arc::new(FixedCertificateVerifier {
                certificate: CENTRAL_CERT.to_vec(),
            }),
            b"other-cert".to_vec(),
        );
        let err = other.get_config_bytes().await.unwrap_err();
        assert!(matches!(err, GreenCardError::InvalidSignature { .. }));
    }
}
