//! Client for external test and vaccination providers.
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::GreenCardError;
use crate::events::{
    RemoteEvents, RemoteEventsVaccinations, RemoteTestResult3, RemoteUnomi, SignatureVerifier,
    SignedResponseWithModel,
};
use crate::http_request::Request;
use crate::store::EventType;

/// Talks to event providers. Every answer must verify against the certificate the holder
/// API pinned for that provider.
pub struct EventProviderClient {
    request: Request,
    verifier: Arc<dyn SignatureVerifier>,
}

impl std::fmt::Debug for EventProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventProviderClient").finish_non_exhaustive()
    }
}

impl EventProviderClient {
    /// Creates a client verifying signatures with `verifier`.
    #[must_use]
    pub fn new(verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self {
            request: Request::new(),
            verifier,
        }
    }

    /// Asks a provider whether it holds test events for the token's holder.
    ///
    /// # Errors
    /// `NetworkError` when the provider is unreachable, `ProviderError` for a failed,
    /// malformed or unsigned answer.
    pub async fn unomi_test_events(
        &self,
        url: &str,
        token: &str,
        certificate: &[u8],
    ) -> Result<RemoteUnomi, GreenCardError> {
        self.unomi(url, token, certificate, EventType::Test).await
    }

    /// Asks a provider whether it holds vaccination events for the token's holder.
    ///
    /// # Errors
    /// As [`Self::unomi_test_events`].
    pub async fn unomi_vaccination_events(
        &self,
        url: &str,
        token: &str,
        certificate: &[u8],
    ) -> Result<RemoteUnomi, GreenCardError> {
        self.unomi(url, token, certificate, EventType::Vaccination)
            .await
    }

    /// Fetches negative test events. The raw body is kept for persistence.
    ///
    /// # Errors
    /// As [`Self::unomi_test_events`].
    pub async fn negative_test_events(
        &self,
        url: &str,
        token: &str,
        certificate: &[u8],
    ) -> Result<SignedResponseWithModel<RemoteTestResult3>, GreenCardError> {
        self.post_signed(url, token, certificate, EventType::Test)
            .await
    }

    /// Fetches vaccination events. The raw body is kept for persistence.
    ///
    /// # Errors
    /// As [`Self::unomi_test_events`].
    pub async fn vaccination_events(
        &self,
        url: &str,
        token: &str,
        certificate: &[u8],
    ) -> Result<SignedResponseWithModel<RemoteEventsVaccinations>, GreenCardError> {
        self.post_signed(url, token, certificate, EventType::Vaccination)
            .await
    }

    /// Fetches events of `event_type` as a [`RemoteEvents`] batch ready to be saved.
    ///
    /// Test payloads of any protocol version are accepted.
    ///
    /// # Errors
    /// As [`Self::unomi_test_events`].
    pub async fn events(
        &self,
        url: &str,
        token: &str,
        certificate: &[u8],
        event_type: EventType,
    ) -> Result<SignedResponseWithModel<RemoteEvents>, GreenCardError> {
        let signed: SignedResponseWithModel<serde_json::Value> = self
            .post_signed(url, token, certificate, event_type)
            .await?;
        let (payload, raw) = signed.into_parts();
        let payload = serde_json::to_vec(&payload)?;
        let events =
            RemoteEvents::parse(event_type, &payload).map_err(|e| GreenCardError::ProviderError {
                provider_identifier: url.to_string(),
                status: None,
                error: e.to_string(),
            })?;
        Ok(SignedResponseWithModel::new(raw, events))
    }

    async fn unomi(
        &self,
        url: &str,
        token: &str,
        certificate: &[u8],
        event_type: EventType,
    ) -> Result<RemoteUnomi, GreenCardError> {
        let signed: SignedResponseWithModel<RemoteUnomi> = self
            .post_signed(url, token, certificate, event_type)
            .await?;
        Ok(signed.into_parts().0)
    }

    async fn post_signed<T: DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
        certificate: &[u8],
        event_type: EventType,
    ) -> Result<SignedResponseWithModel<T>, GreenCardError> {
        let builder = self
            .request
            .post(url)
            .bearer_auth(token)
            .json(&serde_json::json!({ "filter": event_type.to_string() }));
        let response = self.request.handle(builder).await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            log::warn!("provider {url} answered {status}");
            return Err(GreenCardError::ProviderError {
                provider_identifier: url.to_string(),
                status: Some(status.as_u16()),
                error: error_body,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| GreenCardError::ProviderError {
                provider_identifier: url.to_string(),
                status: Some(status.as_u16()),
                error: format!("reading body: {e}"),
            })?;

        SignedResponseWithModel::open(body.to_vec(), self.verifier.as_ref(), certificate).map_err(
            |e| GreenCardError::ProviderError {
                provider_identifier: url.to_string(),
                status: Some(status.as_u16()),
                error: e.to_string(),
            },
        )
    }
}
