//! Wire models for `config.json` and `public_keys.json`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GreenCardError;

/// A code → display name entry of one of the config lookup tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct CodeName {
    /// Code as found in event payloads and credentials
    pub code: String,
    /// Human-readable name
    pub name: String,
}

/// Application configuration as distributed by the central holder API.
///
/// Replaced wholesale on every successful refresh. Every field is optional on the
/// wire, `AppConfig::default()` is the empty config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Lowest supported app version code
    pub minimum_version: u32,
    /// The app must not be used anymore
    pub app_deactivated: bool,
    /// Where deactivated or outdated apps point the user to
    #[serde(rename = "informationURL")]
    pub information_url: String,
    /// Seconds a fetched config stays fresh
    #[serde(rename = "configTTL")]
    pub config_ttl_seconds: u64,
    /// Maximum validity of a negative test, in hours
    pub max_validity_hours: u32,
    /// Date from which European credentials are accepted, ISO-8601
    pub eu_launch_date: String,
    /// Days before expiry at which domestic credentials are renewed
    pub credential_renewal_days: u32,
    /// Validity of one domestic credential, in hours
    pub domestic_credential_validity: u32,
    /// Hours a test event stays usable after its sample date
    pub test_event_validity: u32,
    /// Hours a recovery event stays usable
    pub recovery_event_validity: u32,
    /// Hours a vaccination event stays usable
    pub vaccination_event_validity: u32,
    /// Issuance is temporarily disabled
    pub temporarily_disabled: bool,
    /// Unix timestamp before which an update is required, 0 when unset
    pub require_update_before: u64,
    /// HPK vaccine codes
    pub hpk_codes: Vec<CodeName>,
    /// European vaccine brands (medicinal products)
    pub eu_brands: Vec<CodeName>,
    /// Domestic (protocol v2) test types
    pub nl_test_types: Vec<CodeName>,
    /// European vaccine types (prophylaxis)
    pub eu_vaccinations: Vec<CodeName>,
    /// European vaccine manufacturers
    pub eu_manufacturers: Vec<CodeName>,
    /// European test types
    pub eu_test_types: Vec<CodeName>,
    /// European test manufacturers
    pub eu_test_manufacturers: Vec<CodeName>,
    /// Event provider identifiers
    pub provider_identifiers: Vec<CodeName>,
}

/// Looks up `code` in `table`, falling back to the code itself.
pub(crate) fn resolve(table: &[CodeName], code: Option<&str>) -> String {
    let Some(code) = code else {
        return String::new();
    };
    table
        .iter()
        .find(|entry| entry.code == code)
        .map_or_else(|| code.to_string(), |entry| entry.name.clone())
}

impl AppConfig {
    /// Parses a config from its JSON bytes.
    ///
    /// # Errors
    /// Returns an error if the bytes are not a valid config document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, GreenCardError> {
        serde_json::from_slice(bytes).map_err(|e| GreenCardError::SerializationError {
            error: format!("invalid config.json: {e}"),
        })
    }

    /// Returns the EU launch date, or `None` when unset or malformed.
    ///
    /// Both a full timestamp and a plain date are accepted.
    #[must_use]
    pub fn eu_launch_date(&self) -> Option<DateTime<Utc>> {
        if self.eu_launch_date.is_empty() {
            return None;
        }
        if let Ok(date_time) = DateTime::parse_from_rfc3339(&self.eu_launch_date) {
            return Some(date_time.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(&self.eu_launch_date, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|date_time| date_time.and_utc())
    }

    /// Name of a provider, or an empty string when unknown.
    #[must_use]
    pub fn provider_name(&self, provider_identifier: &str) -> String {
        self.provider_identifiers
            .iter()
            .find(|provider| provider.code == provider_identifier)
            .map(|provider| provider.name.clone())
            .unwrap_or_default()
    }
}

/// A single issuer public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClKey {
    /// Key identifier referenced by credentials
    pub id: String,
    /// Base64 encoded public key
    pub public_key: String,
}

/// Signed issuer key bundle used to verify credential signatures.
///
/// Keeps the bytes it was parsed from, the credential primitive consumes the bundle verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeySet {
    keys: Vec<ClKey>,
    raw: Vec<u8>,
}

#[derive(Deserialize)]
struct PublicKeysDocument {
    cl_keys: Vec<ClKey>,
}

impl PublicKeySet {
    /// Parses a key bundle.
    ///
    /// # Errors
    /// Corrupt or truncated bytes are `CorruptPublicKeys`, there is no fallback.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GreenCardError> {
        let document: PublicKeysDocument =
            serde_json::from_slice(bytes).map_err(|e| GreenCardError::CorruptPublicKeys {
                error: e.to_string(),
            })?;
        Ok(Self {
            keys: document.cl_keys,
            raw: bytes.to_vec(),
        })
    }

    /// Issuer keys in the bundle.
    #[must_use]
    pub fn keys(&self) -> &[ClKey] {
        &self.keys
    }

    /// The bundle exactly as it was read.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}
