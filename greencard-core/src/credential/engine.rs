//! Issuance and reading of domestic and European credentials.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretBox};

use super::attributes::{DomesticAttributes, EuropeanCredential, IssuedDomesticCredential};
use super::primitive::CredentialPrimitive;
use crate::config::CachedAppConfig;
use crate::error::GreenCardError;
use crate::green_card::{Credential, GreenCard, GreenCardType, Origin};
use crate::provider::{encode_base64, GetCredentialsPostData, HolderApiClient, RemoteCredentials};
use crate::store::{EventGroup, EventType};

/// The holder's secret key. Zeroized on drop, never logged.
pub struct HolderSecretKey(SecretBox<Vec<u8>>);

impl HolderSecretKey {
    /// Wraps key bytes loaded from secure storage.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(SecretBox::new(Box::new(bytes)))
    }

    /// Copy of the key for a primitive call.
    fn to_vec(&self) -> Vec<u8> {
        self.0.expose_secret().clone()
    }

    /// Copy of the key bytes for persisting to secure storage.
    #[must_use]
    pub fn expose_bytes(&self) -> Vec<u8> {
        self.to_vec()
    }
}

impl std::fmt::Debug for HolderSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HolderSecretKey(<redacted>)")
    }
}

/// Turns stored event groups into green cards through the holder API and the primitive.
pub struct CredentialEngine {
    primitive: Arc<dyn CredentialPrimitive>,
    config: Arc<CachedAppConfig>,
    holder_api: Arc<HolderApiClient>,
}

impl std::fmt::Debug for CredentialEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialEngine")
            .field("config", &self.config)
            .field("holder_api", &self.holder_api)
            .finish_non_exhaustive()
    }
}

impl CredentialEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new(
        primitive: Arc<dyn CredentialPrimitive>,
        config: Arc<CachedAppConfig>,
        holder_api: Arc<HolderApiClient>,
    ) -> Self {
        Self {
            primitive,
            config,
            holder_api,
        }
    }

    /// The primitive this engine calls into.
    #[must_use]
    pub fn primitive(&self) -> &Arc<dyn CredentialPrimitive> {
        &self.primitive
    }

    /// Generates a fresh holder secret key.
    ///
    /// # Errors
    /// `CryptoPrimitive` when generation fails.
    pub fn generate_holder_sk(&self) -> Result<HolderSecretKey, GreenCardError> {
        self.primitive.generate_holder_sk().map(HolderSecretKey::from_bytes)
    }

    /// Loads the cached issuer public keys into the primitive.
    ///
    /// # Errors
    /// `CorruptPublicKeys` when the cached bundle is unusable, or the primitive's error.
    pub fn load_public_keys(&self) -> Result<(), GreenCardError> {
        let keys = self.config.public_keys()?;
        self.primitive.load_domestic_issuer_pks(keys.as_bytes().to_vec())
    }

    /// Selects the groups that can back a card of `card_type` at `now`.
    ///
    /// A group is eligible while its latest event plus the configured validity of its
    /// type has not passed. European cards cannot be backed by protocol v2 tests.
    /// Identical signed batches count once. Newest groups come first.
    ///
    /// # Errors
    /// `ConfigNotCached` before the first config refresh, or a parse error of a stored group.
    pub fn eligible_event_groups(
        &self,
        groups: &[EventGroup],
        card_type: GreenCardType,
        now: DateTime<Utc>,
    ) -> Result<Vec<EventGroup>, GreenCardError> {
        let config = self.config.require_cached()?;
        let mut seen = HashSet::new();
        let mut eligible = Vec::new();

        for group in groups {
            let validity_hours = match group.event_type() {
                EventType::Test => config.test_event_validity,
                EventType::Vaccination => config.vaccination_event_validity,
                EventType::Recovery => config.recovery_event_validity,
            };
            let expires_at = group
                .max_issued_at()
                .checked_add_signed(Duration::hours(i64::from(validity_hours)));
            if expires_at.is_some_and(|expires_at| expires_at < now) {
                log::debug!("event group {} expired", group.id());
                continue;
            }
            if card_type == GreenCardType::Eu
                && group.event_type() != EventType::Recovery
                && !group.events()?.supports_european_credential()
            {
                continue;
            }
            if seen.insert(group.digest()) {
                eligible.push(group.clone());
            }
        }

        eligible.sort_by(|a, b| b.max_issued_at().cmp(&a.max_issued_at()));
        Ok(eligible)
    }

    /// Exchanges the eligible groups for green cards.
    ///
    /// Runs prepare issue, the commitment, `get_credentials` and credential creation as
    /// one unit. Any failure fails the whole issuance.
    ///
    /// # Errors
    /// `InvalidInput` when no group is eligible, otherwise the failing stage's error.
    pub async fn issue(
        &self,
        holder_sk: &HolderSecretKey,
        groups: &[EventGroup],
        now: DateTime<Utc>,
    ) -> Result<Vec<GreenCard>, GreenCardError> {
        let eligible = self.eligible_event_groups(groups, GreenCardType::Domestic, now)?;
        if eligible.is_empty() {
            return Err(GreenCardError::InvalidInput {
                error: "no eligible events to issue from".to_string(),
            });
        }

        let prepare = self.holder_api.get_prepare_issue().await?;
        let commitment = self.primitive.create_commitment_message(
            holder_sk.to_vec(),
            prepare.prepare_issue_message_bytes()?,
        )?;

        let data = GetCredentialsPostData {
            events: eligible
                .iter()
                .map(EventGroup::signed_response)
                .collect::<Result<_, _>>()?,
            stoken: prepare.stoken,
            issue_commitment_message: encode_base64(&commitment),
        };
        let credentials = self.holder_api.get_credentials(&data).await?;
        log::info!(
            "issued {} european card(s), domestic card: {}",
            credentials.eu_greencards.len(),
            credentials.domestic_greencard.is_some()
        );

        self.green_cards(credentials, now)
    }

    /// Reads the attributes of a domestic credential.
    ///
    /// # Errors
    /// `CryptoPrimitive` when the credential or the primitive's output is unreadable.
    pub fn read_domestic_attributes(
        &self,
        credential: &[u8],
    ) -> Result<DomesticAttributes, GreenCardError> {
        let json = self.primitive.read_domestic_credential(credential.to_vec())?;
        DomesticAttributes::from_json(&json)
    }

    /// Reads a European credential.
    ///
    /// # Errors
    /// `CryptoPrimitive` when the credential or the primitive's output is unreadable.
    pub fn read_european_attributes(
        &self,
        credential: &[u8],
    ) -> Result<EuropeanCredential, GreenCardError> {
        let json = self.primitive.read_european_credential(credential.to_vec())?;
        EuropeanCredential::from_json(&json)
    }

    /// Creates a fresh disclosure proof of a domestic credential.
    ///
    /// # Errors
    /// `CryptoPrimitive` when the primitive fails.
    pub fn disclose(
        &self,
        holder_sk: &HolderSecretKey,
        credential: &[u8],
    ) -> Result<Vec<u8>, GreenCardError> {
        self.primitive.disclose(holder_sk.to_vec(), credential.to_vec())
    }

    fn green_cards(
        &self,
        credentials: RemoteCredentials,
        now: DateTime<Utc>,
    ) -> Result<Vec<GreenCard>, GreenCardError> {
        let mut cards = Vec::new();

        if let Some(domestic) = credentials.domestic_greencard {
            if domestic.origins.is_empty() {
                log::warn!("domestic card without origins, skipping");
            } else {
                let mut card = self.card_from_response(GreenCardType::Domestic, domestic.origins)?;
                let messages = serde_json::to_vec(&domestic.create_credential_messages)?;
                let issued = IssuedDomesticCredential::list_from_json(
                    &self.primitive.create_domestic_credentials(messages)?,
                )?;
                if let Some(credential) = current_credential(issued, now) {
                    let attributes = &credential.attributes;
                    card.set_credential(Credential::new(
                        credential.credential.clone(),
                        attributes.valid_from,
                        attributes.expiration_time(),
                        attributes.credential_version,
                    ));
                }
                cards.push(card);
            }
        }

        for eu in credentials.eu_greencards {
            let mut card = self.card_from_response(GreenCardType::Eu, eu.origins)?;
            let data = eu.credential.into_bytes();
            let read = self.read_european_attributes(&data)?;
            card.set_credential(Credential::new(
                data,
                read.issued_at()?,
                read.expiration_time()?,
                read.credential_version,
            ));
            cards.push(card);
        }

        Ok(cards)
    }

    fn card_from_response(
        &self,
        card_type: GreenCardType,
        origins: Vec<Origin>,
    ) -> Result<GreenCard, GreenCardError> {
        GreenCard::new(card_type, origins).map_err(|e| GreenCardError::ServerError {
            url: self.holder_api.url("holder/get_credentials"),
            status: None,
            error: format!("unusable {card_type} green card: {e}"),
        })
    }
}

/// The credential valid at `now`, else the next one to become valid, else the last.
fn current_credential(
    issued: Vec<IssuedDomesticCredential>,
    now: DateTime<Utc>,
) -> Option<IssuedDomesticCredential> {
    let index = issued
        .iter()
        .position(|c| c.attributes.valid_from <= now && now <= c.attributes.expiration_time())
        .or_else(|| issued.iter().position(|c| c.attributes.valid_from > now))
        .or_else(|| issued.len().checked_sub(1))?;
    issued.into_iter().nth(index)
}
