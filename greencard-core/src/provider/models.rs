//! Wire models of the central holder API.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::GreenCardError;
use crate::events::SignedResponse;
use crate::green_card::Origin;

/// Answer of `holder/prepare_issue`: a session token and the issuer nonce message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePrepareIssue {
    /// Issuance session token, echoed in `get_credentials`
    pub stoken: String,
    /// Base64 issuer nonce message handed to the primitive
    pub prepare_issue_message: String,
}

impl RemotePrepareIssue {
    /// Decodes the nonce message.
    ///
    /// # Errors
    /// `SerializationError` when the message is not valid base64.
    pub fn prepare_issue_message_bytes(&self) -> Result<Vec<u8>, GreenCardError> {
        STANDARD
            .decode(&self.prepare_issue_message)
            .map_err(|e| GreenCardError::SerializationError {
                error: format!("prepare issue message: {e}"),
            })
    }
}

/// Body of `holder/get_credentials`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCredentialsPostData {
    /// Stored signed event envelopes, exactly as received from providers
    pub events: Vec<SignedResponse>,
    /// Token of the issuance session
    pub stoken: String,
    /// Base64 commitment message created by the primitive
    pub issue_commitment_message: String,
}

/// Answer of `holder/get_credentials`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCredentials {
    /// The domestic card, absent when no event qualifies
    pub domestic_greencard: Option<RemoteDomesticGreenCard>,
    /// One card per qualifying event
    #[serde(default)]
    pub eu_greencards: Vec<RemoteEuGreenCard>,
}

/// Domestic card as issued by the holder API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDomesticGreenCard {
    /// Origins backing the card
    pub origins: Vec<Origin>,
    /// Issuer messages the primitive turns into credentials
    pub create_credential_messages: serde_json::Value,
}

/// EU card as issued by the holder API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEuGreenCard {
    /// The single origin of the card
    pub origins: Vec<Origin>,
    /// The DCC, ready to be encoded
    pub credential: String,
}

/// Answer of `holder/config_providers`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfigProviders {
    /// Providers that hold events for holders
    #[serde(default)]
    pub event_providers: Vec<RemoteEventProvider>,
}

/// One event provider and where to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEventProvider {
    /// Provider identifier, matches the access token and event payloads
    pub provider_identifier: String,
    /// Display name
    pub name: String,
    /// Unomi endpoint
    pub unomi_url: String,
    /// Events endpoint
    pub event_url: String,
    /// Base64 signing certificate the provider's responses are pinned to
    pub cms: String,
}

impl RemoteEventProvider {
    /// Decodes the pinned signing certificate.
    ///
    /// # Errors
    /// `ServerError` when the holder API sent an undecodable certificate.
    pub fn signing_certificate(&self) -> Result<Vec<u8>, GreenCardError> {
        STANDARD
            .decode(&self.cms)
            .map_err(|e| GreenCardError::ServerError {
                url: self.unomi_url.clone(),
                status: None,
                error: format!(
                    "invalid signing certificate for {}: {e}",
                    self.provider_identifier
                ),
            })
    }
}

/// Answer of `holder/access_tokens`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemoteAccessTokens {
    /// One token pair per provider
    #[serde(default)]
    pub tokens: Vec<RemoteAccessToken>,
}

/// Tokens for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAccessToken {
    /// Provider the tokens are for
    pub provider_identifier: String,
    /// Bearer token for the unomi call
    pub unomi: String,
    /// Bearer token for the events call
    pub event: String,
}
