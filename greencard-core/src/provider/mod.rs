//! Clients for the central holder API and the external event providers.

mod event_provider;
mod get_events;
mod holder_api;
mod models;

pub use event_provider::EventProviderClient;
pub use get_events::{EventsResult, GetEvents, ProviderEvents};
pub(crate) use holder_api::encode_base64;
pub use holder_api::HolderApiClient;
pub use models::{
    GetCredentialsPostData, RemoteAccessToken, RemoteAccessTokens, RemoteConfigProviders,
    RemoteCredentials, RemoteDomesticGreenCard, RemoteEuGreenCard, RemoteEventProvider,
    RemotePrepareIssue,
};
