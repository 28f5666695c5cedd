//! Typed views of what the primitive reads out of credentials.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GreenCardError;

fn malformed(what: &str, detail: impl std::fmt::Display) -> GreenCardError {
    GreenCardError::CryptoPrimitive {
        error: format!("malformed {what}: {detail}"),
    }
}

/// Domestic attributes exactly as the primitive returns them. Every value is a string.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDomesticAttributes {
    credential_version: String,
    is_specimen: String,
    #[serde(default)]
    is_paper_proof: Option<String>,
    valid_from: String,
    valid_for_hours: String,
    first_name_initial: String,
    last_name_initial: String,
    birth_day: String,
    birth_month: String,
}

/// Attributes of a domestic credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomesticAttributes {
    /// Credential format version
    pub credential_version: u32,
    /// Demo credential, verifiers show it as such
    pub is_specimen: bool,
    /// Printed rather than shown on a phone
    pub is_paper_proof: bool,
    /// Start of validity
    pub valid_from: DateTime<Utc>,
    /// Hours the credential is valid from `valid_from`
    pub valid_for_hours: u32,
    /// First letter of the given name, may be empty
    pub first_name_initial: String,
    /// First letter of the surname, may be empty
    pub last_name_initial: String,
    /// Day of birth, may be `X` when unknown
    pub birth_day: String,
    /// Month of birth, may be `X` when unknown
    pub birth_month: String,
    expiration_time: DateTime<Utc>,
}

impl DomesticAttributes {
    /// Parses the primitive's JSON output.
    ///
    /// # Errors
    /// `CryptoPrimitive` for truncated or unreadable output.
    pub fn from_json(bytes: &[u8]) -> Result<Self, GreenCardError> {
        let raw: RawDomesticAttributes =
            serde_json::from_slice(bytes).map_err(|e| malformed("domestic attributes", e))?;
        Self::try_from(raw)
    }

    /// End of validity.
    #[must_use]
    pub const fn expiration_time(&self) -> DateTime<Utc> {
        self.expiration_time
    }
}

impl TryFrom<RawDomesticAttributes> for DomesticAttributes {
    type Error = GreenCardError;

    fn try_from(raw: RawDomesticAttributes) -> Result<Self, Self::Error> {
        let valid_from = raw
            .valid_from
            .parse::<i64>()
            .ok()
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
            .ok_or_else(|| malformed("validFrom", &raw.valid_from))?;
        let valid_for_hours: u32 = raw
            .valid_for_hours
            .parse()
            .map_err(|e| malformed("validForHours", e))?;
        let expiration_time = valid_from
            .checked_add_signed(Duration::hours(i64::from(valid_for_hours)))
            .ok_or_else(|| malformed("validForHours", "validity ends out of range"))?;
        Ok(Self {
            credential_version: raw
                .credential_version
                .parse()
                .map_err(|e| malformed("credentialVersion", e))?,
            is_specimen: raw.is_specimen == "1",
            is_paper_proof: raw.is_paper_proof.as_deref() == Some("1"),
            valid_from,
            valid_for_hours,
            first_name_initial: raw.first_name_initial,
            last_name_initial: raw.last_name_initial,
            birth_day: raw.birth_day,
            birth_month: raw.birth_month,
            expiration_time,
        })
    }
}

/// One domestic credential created from issuer messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedDomesticCredential {
    /// Credential bytes
    pub credential: Vec<u8>,
    /// Its attributes
    pub attributes: DomesticAttributes,
}

#[derive(Deserialize)]
struct RawIssuedDomesticCredential {
    credential: serde_json::Value,
    attributes: RawDomesticAttributes,
}

impl IssuedDomesticCredential {
    /// Parses the output of `create_domestic_credentials`, ordered by start of validity.
    ///
    /// # Errors
    /// `CryptoPrimitive` for unreadable output.
    pub fn list_from_json(bytes: &[u8]) -> Result<Vec<Self>, GreenCardError> {
        let raw: Vec<RawIssuedDomesticCredential> =
            serde_json::from_slice(bytes).map_err(|e| malformed("domestic credentials", e))?;
        let mut issued = raw
            .into_iter()
            .map(|raw| -> Result<Self, GreenCardError> {
                let credential = match raw.credential {
                    serde_json::Value::String(encoded) => encoded.into_bytes(),
                    other => serde_json::to_vec(&other)
                        .map_err(|e| malformed("domestic credential", e))?,
                };
                Ok(Self {
                    credential,
                    attributes: DomesticAttributes::try_from(raw.attributes)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        issued.sort_by_key(|issued| issued.attributes.valid_from);
        Ok(issued)
    }
}

/// A European credential as read by the primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EuropeanCredential {
    /// Credential format version
    pub credential_version: u32,
    /// Issuing country
    pub issuer: String,
    /// Unix seconds of issuance
    pub issued_at: i64,
    /// Unix seconds of expiry
    pub expiration_time: i64,
    /// The certificate content
    pub dcc: DigitalCovidCertificate,
}

impl EuropeanCredential {
    /// Parses the primitive's JSON output.
    ///
    /// # Errors
    /// `CryptoPrimitive` for truncated or unreadable output.
    pub fn from_json(bytes: &[u8]) -> Result<Self, GreenCardError> {
        serde_json::from_slice(bytes).map_err(|e| malformed("european credential", e))
    }

    /// Issuance as a timestamp.
    ///
    /// # Errors
    /// `CryptoPrimitive` when out of range.
    pub fn issued_at(&self) -> Result<DateTime<Utc>, GreenCardError> {
        DateTime::from_timestamp(self.issued_at, 0)
            .ok_or_else(|| malformed("issuedAt", self.issued_at))
    }

    /// Expiry as a timestamp.
    ///
    /// # Errors
    /// `CryptoPrimitive` when out of range.
    pub fn expiration_time(&self) -> Result<DateTime<Utc>, GreenCardError> {
        DateTime::from_timestamp(self.expiration_time, 0)
            .ok_or_else(|| malformed("expirationTime", self.expiration_time))
    }
}

/// EU Digital COVID Certificate payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DigitalCovidCertificate {
    /// Schema version
    pub ver: String,
    /// Holder name
    pub nam: DccName,
    /// Date of birth, possibly partial
    pub dob: String,
    /// Vaccinations
    #[serde(default)]
    pub v: Vec<DccVaccination>,
    /// Tests
    #[serde(default)]
    pub t: Vec<DccTest>,
    /// Recoveries
    #[serde(default)]
    pub r: Vec<DccRecovery>,
}

impl DigitalCovidCertificate {
    /// "Family name, given name" for display.
    #[must_use]
    pub fn full_name(&self) -> String {
        match (self.nam.family_name.as_str(), self.nam.given_name.as_str()) {
            (family, "") => family.to_string(),
            ("", given) => given.to_string(),
            (family, given) => format!("{family}, {given}"),
        }
    }
}

/// Holder name of a DCC.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DccName {
    /// Family name
    #[serde(rename = "fn", default)]
    pub family_name: String,
    /// Transliterated family name
    #[serde(rename = "fnt", default)]
    pub family_name_transliterated: String,
    /// Given name
    #[serde(rename = "gn", default)]
    pub given_name: String,
    /// Transliterated given name
    #[serde(rename = "gnt", default)]
    pub given_name_transliterated: String,
}

/// Vaccination entry of a DCC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DccVaccination {
    /// Targeted disease
    pub tg: String,
    /// Vaccine type
    pub vp: String,
    /// Medicinal product
    pub mp: String,
    /// Manufacturer
    pub ma: String,
    /// Dose number
    pub dn: u32,
    /// Total doses in the series
    pub sd: u32,
    /// Date of vaccination
    pub dt: String,
    /// Country
    pub co: String,
    /// Issuer
    pub is: String,
    /// Certificate identifier
    pub ci: String,
}

/// Test entry of a DCC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DccTest {
    /// Targeted disease
    pub tg: String,
    /// Test type
    pub tt: String,
    /// Test name, NAA tests only
    #[serde(default)]
    pub nm: Option<String>,
    /// Test manufacturer, antigen tests only
    #[serde(default)]
    pub ma: Option<String>,
    /// Sample collection time
    pub sc: String,
    /// Result
    pub tr: String,
    /// Testing facility
    #[serde(default)]
    pub tc: Option<String>,
    /// Country
    pub co: String,
    /// Issuer
    pub is: String,
    /// Certificate identifier
    pub ci: String,
}

/// Recovery entry of a DCC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DccRecovery {
    /// Targeted disease
    pub tg: String,
    /// First positive test date
    pub fr: String,
    /// Country
    pub co: String,
    /// Issuer
    pub is: String,
    /// Valid from
    pub df: String,
    /// Valid until
    pub du: String,
    /// Certificate identifier
    pub ci: String,
}
