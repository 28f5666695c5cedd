//! Event payloads as returned by test and vaccination providers.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GreenCardError;
use crate::store::EventType;

/// Processing status reported by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    /// The result is final
    Complete,
    /// The result is not available yet
    Pending,
    /// The holder needs to complete a verification code step
    VerificationRequired,
    /// The token used for the request was rejected
    InvalidToken,
    /// Any status this version does not know
    #[serde(other)]
    Unknown,
}

/// Unomi answer: whether a provider holds events for the holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUnomi {
    /// Provider that answered
    pub provider_identifier: String,
    /// Protocol version of the answer
    pub protocol_version: String,
    /// Whether an events call would return data
    pub information_available: bool,
}

/// Holder identity in protocol v3 payloads.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holder {
    /// Given name
    pub first_name: Option<String>,
    /// Surname prefix ("van", "de")
    pub infix: Option<String>,
    /// Surname
    pub last_name: Option<String>,
    /// ISO-8601 birth date, may be partial ("1990-XX-XX")
    pub birth_date: Option<String>,
}

impl Holder {
    /// "Last name, first name", including the infix.
    #[must_use]
    pub fn full_name(&self) -> String {
        let last_name = [self.infix.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        match self.first_name.as_deref() {
            Some(first_name) if !first_name.is_empty() => format!("{last_name}, {first_name}"),
            _ => last_name,
        }
    }
}

/// Negative test result in protocol v3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTestResult3 {
    /// Provider that issued the events
    pub provider_identifier: Option<String>,
    /// Always "3.0"
    pub protocol_version: String,
    /// Processing status
    pub status: RemoteStatus,
    /// Holder identity
    pub holder: Option<Holder>,
    /// Test events
    pub events: Option<Vec<TestEvent3>>,
}

/// One event of a v3 negative test payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestEvent3 {
    /// Event type, "negativetest"
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    /// Provider-unique identifier
    pub unique: Option<String>,
    /// Demo event that must not yield a real credential
    pub is_specimen: Option<bool>,
    /// Test details
    #[serde(rename = "negativetest")]
    pub negative_test: Option<NegativeTest>,
}

/// Details of a negative test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegativeTest {
    /// Moment the sample was taken
    pub sample_date: Option<DateTime<FixedOffset>>,
    /// Whether the result was negative
    pub negative_result: Option<bool>,
    /// Test facility
    pub facility: Option<String>,
    /// EU test type code
    #[serde(rename = "type")]
    pub test_type: Option<String>,
    /// Test name
    pub name: Option<String>,
    /// EU test manufacturer code
    pub manufacturer: Option<String>,
}

/// Vaccination events in protocol v3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEventsVaccinations {
    /// Provider that issued the events
    pub provider_identifier: Option<String>,
    /// Always "3.0"
    pub protocol_version: String,
    /// Processing status
    pub status: RemoteStatus,
    /// Holder identity
    pub holder: Option<Holder>,
    /// Vaccination events
    pub events: Option<Vec<VaccinationEvent>>,
}

/// One vaccination event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaccinationEvent {
    /// Event type, "vaccination"
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    /// Provider-unique identifier
    pub unique: Option<String>,
    /// Demo event that must not yield a real credential
    pub is_specimen: Option<bool>,
    /// Vaccination details
    pub vaccination: Option<Vaccination>,
}

/// Details of one vaccination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vaccination {
    /// Day of vaccination
    pub date: Option<NaiveDate>,
    /// HPK vaccine code
    pub hpk_code: Option<String>,
    /// EU vaccine type code
    #[serde(rename = "type")]
    pub vaccine_type: Option<String>,
    /// EU vaccine brand code
    pub brand: Option<String>,
    /// EU manufacturer code
    pub manufacturer: Option<String>,
    /// Completion was declared by a physician
    pub completed_by_medical_statement: Option<bool>,
    /// Dose number of this vaccination
    pub dose_number: Option<String>,
    /// Total doses of the series
    pub total_doses: Option<String>,
    /// ISO country code
    pub country: Option<String>,
}

/// Negative test result in protocol v2. Carries initials only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTestResult2 {
    /// Provider that issued the result
    pub provider_identifier: Option<String>,
    /// "2.0"
    pub protocol_version: String,
    /// Processing status
    pub status: RemoteStatus,
    /// The result, absent while pending
    pub result: Option<TestResult2>,
}

/// The test of a v2 result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult2 {
    /// Provider-unique identifier
    pub unique: String,
    /// Moment the sample was taken
    pub sample_date: Option<DateTime<FixedOffset>>,
    /// Domestic test type code
    pub test_type: String,
    /// Whether the result was negative
    pub negative_result: bool,
    /// Holder initials and birth day/month
    pub holder: Option<Holder2>,
}

/// Holder identity in protocol v2 payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holder2 {
    /// First letter of the given name
    pub first_name_initial: String,
    /// First letter of the surname
    pub last_name_initial: String,
    /// Day of birth
    pub birth_day: String,
    /// Month of birth
    pub birth_month: String,
}

/// Any event payload the store accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEvents {
    /// Protocol v2 negative test
    NegativeTestV2(RemoteTestResult2),
    /// Protocol v3 negative tests
    NegativeTestV3(RemoteTestResult3),
    /// Protocol v3 vaccinations
    Vaccination(RemoteEventsVaccinations),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProtocolVersionProbe {
    protocol_version: String,
}

impl RemoteEvents {
    /// Parses a payload of the given event type, choosing the test protocol by `protocolVersion`.
    ///
    /// # Errors
    /// Returns an error if the payload does not match the schema of its version.
    pub fn parse(event_type: EventType, payload: &[u8]) -> Result<Self, GreenCardError> {
        let parsed = match event_type {
            EventType::Vaccination => serde_json::from_slice(payload).map(Self::Vaccination),
            EventType::Test => {
                let probe: ProtocolVersionProbe = serde_json::from_slice(payload)?;
                if probe.protocol_version.starts_with("2.") {
                    serde_json::from_slice(payload).map(Self::NegativeTestV2)
                } else {
                    serde_json::from_slice(payload).map(Self::NegativeTestV3)
                }
            }
            EventType::Recovery => {
                return Err(GreenCardError::InvalidInput {
                    error: "recovery events are issued by the holder api, not by providers"
                        .to_string(),
                })
            }
        };
        parsed.map_err(|e| GreenCardError::SerializationError {
            error: format!("invalid {event_type} payload: {e}"),
        })
    }

    /// Provider that issued the events.
    #[must_use]
    pub fn provider_identifier(&self) -> Option<&str> {
        match self {
            Self::NegativeTestV2(result) => result.provider_identifier.as_deref(),
            Self::NegativeTestV3(result) => result.provider_identifier.as_deref(),
            Self::Vaccination(result) => result.provider_identifier.as_deref(),
        }
        .filter(|identifier| !identifier.is_empty())
    }

    /// Store type of the events.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::NegativeTestV2(_) | Self::NegativeTestV3(_) => EventType::Test,
            Self::Vaccination(_) => EventType::Vaccination,
        }
    }

    /// Whether the payload can back a European credential. v2 tests only carry initials.
    #[must_use]
    pub const fn supports_european_credential(&self) -> bool {
        !matches!(self, Self::NegativeTestV2(_))
    }

    /// Latest event date in the batch, `None` when no event carries a date.
    ///
    /// Vaccinations are dated at the start of their day, UTC.
    #[must_use]
    pub fn max_issued_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::NegativeTestV2(result) => result
                .result
                .as_ref()
                .and_then(|result| result.sample_date)
                .map(|date| date.with_timezone(&Utc)),
            Self::NegativeTestV3(result) => result
                .events
                .iter()
                .flatten()
                .filter_map(|event| event.negative_test.as_ref()?.sample_date)
                .map(|date| date.with_timezone(&Utc))
                .max(),
            Self::Vaccination(result) => result
                .events
                .iter()
                .flatten()
                .filter_map(|event| event.vaccination.as_ref()?.date)
                .max()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|date_time| date_time.and_utc()),
        }
    }

    /// Whether the payload holds at least one event.
    #[must_use]
    pub fn has_events(&self) -> bool {
        match self {
            Self::NegativeTestV2(result) => result.result.is_some(),
            Self::NegativeTestV3(result) => result.events.as_ref().is_some_and(|e| !e.is_empty()),
            Self::Vaccination(result) => result.events.as_ref().is_some_and(|e| !e.is_empty()),
        }
    }

    /// Whether the payload holds events and every one is a specimen (demo) event.
    #[must_use]
    pub fn is_specimen(&self) -> bool {
        if !self.has_events() {
            return false;
        }
        match self {
            Self::NegativeTestV2(_) => false,
            Self::NegativeTestV3(result) => result
                .events
                .iter()
                .flatten()
                .all(|event| event.is_specimen == Some(true)),
            Self::Vaccination(result) => result
                .events
                .iter()
                .flatten()
                .all(|event| event.is_specimen == Some(true)),
        }
    }
}
