//! Access tokens → providers → unomi → events, run as one unit.
//!
//! Nothing is persisted unless every stage for every provider succeeded.

use std::sync::Arc;

use futures::future::join_all;

use super::event_provider::EventProviderClient;
use super::holder_api::HolderApiClient;
use super::models::{RemoteAccessToken, RemoteEventProvider};
use crate::error::GreenCardError;
use crate::events::{RemoteEvents, SignedResponseWithModel};
use crate::store::{EventGroup, EventSaver, EventType, SavePolicy};

/// Events one provider returned.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderEvents {
    /// Provider identifier
    pub provider_identifier: String,
    /// Display name from the provider list
    pub provider_name: String,
    /// Every event in the batch is a demo event
    pub is_specimen: bool,
    /// The signed batch
    pub events: SignedResponseWithModel<RemoteEvents>,
}

/// Outcome of a completed fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum EventsResult {
    /// At least one provider returned events
    Success(Vec<ProviderEvents>),
    /// Every provider answered, none had events
    HasNoEvents,
}

/// Fetches events from every provider the holder has a token for.
pub struct GetEvents {
    holder_api: Arc<HolderApiClient>,
    providers: EventProviderClient,
}

impl std::fmt::Debug for GetEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GetEvents")
            .field("holder_api", &self.holder_api)
            .finish_non_exhaustive()
    }
}

impl GetEvents {
    /// Creates the pipeline.
    #[must_use]
    pub const fn new(holder_api: Arc<HolderApiClient>, providers: EventProviderClient) -> Self {
        Self {
            holder_api,
            providers,
        }
    }

    /// Runs the pipeline for `event_type` with the holder's login token.
    ///
    /// Providers are queried concurrently. The first failure of any provider fails the
    /// whole call and the other results are discarded.
    ///
    /// # Errors
    /// `InvalidInput` for recovery events, otherwise the error of the failing stage.
    pub async fn get_events(
        &self,
        token: &str,
        event_type: EventType,
    ) -> Result<EventsResult, GreenCardError> {
        if event_type == EventType::Recovery {
            return Err(GreenCardError::InvalidInput {
                error: "providers do not serve recovery events".to_string(),
            });
        }

        let tokens = self.holder_api.get_access_tokens(token).await?;
        let providers = self.holder_api.get_config_providers().await?;

        let units = providers
            .event_providers
            .iter()
            .filter_map(|provider| {
                let access = tokens
                    .tokens
                    .iter()
                    .find(|access| access.provider_identifier == provider.provider_identifier)?;
                Some(self.provider_events(provider, access, event_type))
            })
            .collect::<Vec<_>>();
        log::info!("querying {} provider(s) for {event_type} events", units.len());

        let mut events = Vec::new();
        for result in join_all(units).await {
            events.extend(result?);
        }

        if events.is_empty() {
            Ok(EventsResult::HasNoEvents)
        } else {
            Ok(EventsResult::Success(events))
        }
    }

    /// Runs the pipeline and saves the fetched batches.
    ///
    /// # Errors
    /// Any pipeline error, in which case nothing is saved, or a save error.
    pub async fn fetch_and_save(
        &self,
        token: &str,
        event_type: EventType,
        saver: &EventSaver,
        policy: SavePolicy,
    ) -> Result<Vec<EventGroup>, GreenCardError> {
        match self.get_events(token, event_type).await? {
            EventsResult::HasNoEvents => Ok(Vec::new()),
            EventsResult::Success(events) => {
                saver
                    .save_events(events.into_iter().map(|e| e.events).collect(), policy)
                    .await
            }
        }
    }

    async fn provider_events(
        &self,
        provider: &RemoteEventProvider,
        access: &RemoteAccessToken,
        event_type: EventType,
    ) -> Result<Option<ProviderEvents>, GreenCardError> {
        let identifier = provider.provider_identifier.as_str();
        let certificate = provider.signing_certificate()?;

        let unomi = match event_type {
            EventType::Vaccination => {
                self.providers
                    .unomi_vaccination_events(&provider.unomi_url, &access.unomi, &certificate)
                    .await
            }
            _ => {
                self.providers
                    .unomi_test_events(&provider.unomi_url, &access.unomi, &certificate)
                    .await
            }
        }
        .map_err(|e| attribute_to(e, identifier))?;

        if !unomi.information_available {
            log::debug!("provider {identifier} has no {event_type} events");
            return Ok(None);
        }

        let events = self
            .providers
            .events(&provider.event_url, &access.event, &certificate, event_type)
            .await
            .map_err(|e| attribute_to(e, identifier))?;

        if !events.model().has_events() {
            return Ok(None);
        }
        Ok(Some(ProviderEvents {
            provider_identifier: identifier.to_string(),
            provider_name: provider.name.clone(),
            is_specimen: events.model().is_specimen(),
            events,
        }))
    }
}

/// The provider client labels failures with the URL; name the provider instead.
fn attribute_to(error: GreenCardError, provider_identifier: &str) -> GreenCardError {
    match error {
        GreenCardError::ProviderError { status, error, .. } => GreenCardError::ProviderError {
            provider_identifier: provider_identifier.to_string(),
            status,
            error,
        },
        other => other,
    }
}
