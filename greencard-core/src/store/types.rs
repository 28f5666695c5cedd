//! Stored event groups and their keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::error::GreenCardError;
use crate::events::{RemoteEvents, SignedResponse};

/// Kind of proof an event group holds.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    Serialize,
    Deserialize,
    uniffi::Enum,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Negative test
    Test,
    /// Vaccination
    Vaccination,
    /// Recovery
    Recovery,
}

/// Identifies the log an event group is appended to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventGroupKey {
    /// Provider that issued the events
    pub provider_identifier: String,
    /// Kind of events
    pub event_type: EventType,
}

impl EventGroupKey {
    /// Creates a key.
    #[must_use]
    pub fn new(provider_identifier: impl Into<String>, event_type: EventType) -> Self {
        Self {
            provider_identifier: provider_identifier.into(),
            event_type,
        }
    }
}

/// One persisted batch of signed provider events.
///
/// Never mutated after creation; a newer fetch adds a new group or, under
/// [`SavePolicy::Replace`], supersedes the groups of its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventGroup {
    id: Uuid,
    provider_identifier: String,
    event_type: EventType,
    max_issued_at: DateTime<Utc>,
    #[serde(with = "serde_bytes_vec")]
    raw_signed_bytes: Vec<u8>,
}

impl EventGroup {
    pub(crate) fn new(
        provider_identifier: String,
        event_type: EventType,
        max_issued_at: DateTime<Utc>,
        raw_signed_bytes: Vec<u8>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider_identifier,
            event_type,
            max_issued_at,
            raw_signed_bytes,
        }
    }

    /// Unique id of the group.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Provider that issued the events.
    #[must_use]
    pub fn provider_identifier(&self) -> &str {
        &self.provider_identifier
    }

    /// Kind of events.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Latest event date in the batch.
    #[must_use]
    pub const fn max_issued_at(&self) -> DateTime<Utc> {
        self.max_issued_at
    }

    /// The signed response body exactly as it was received.
    #[must_use]
    pub fn raw_signed_bytes(&self) -> &[u8] {
        &self.raw_signed_bytes
    }

    /// Key of the log this group belongs to.
    #[must_use]
    pub fn key(&self) -> EventGroupKey {
        EventGroupKey::new(self.provider_identifier.clone(), self.event_type)
    }

    /// Hex SHA-256 of the raw bytes. Equal digests mean the same signed batch.
    #[must_use]
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.raw_signed_bytes))
    }

    /// The signed envelope, as submitted to the holder API for issuance.
    ///
    /// # Errors
    /// Returns an error if the stored bytes are not an envelope.
    pub fn signed_response(&self) -> Result<SignedResponse, GreenCardError> {
        SignedResponse::from_bytes(&self.raw_signed_bytes).map_err(|e| {
            GreenCardError::SerializationError {
                error: format!("event group {}: {e}", self.id),
            }
        })
    }

    /// Re-parses the stored events. The signature was verified when the batch was fetched.
    ///
    /// # Errors
    /// Returns an error if the stored bytes no longer parse.
    pub fn events(&self) -> Result<RemoteEvents, GreenCardError> {
        let payload = self.signed_response()?.payload_bytes().map_err(|e| {
            GreenCardError::SerializationError {
                error: format!("event group {}: {e}", self.id),
            }
        })?;
        RemoteEvents::parse(self.event_type, &payload)
    }
}

/// What a save does with groups already stored under the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, uniffi::Enum)]
pub enum SavePolicy {
    /// Keep existing groups and add the new ones.
    #[default]
    Append,
    /// Remove existing groups of each saved key first.
    Replace,
}

/// CBOR encodes `Vec<u8>` as an array of integers unless told otherwise.
mod serde_bytes_vec {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        struct BytesVisitor;

        impl<'de> serde::de::Visitor<'de> for BytesVisitor {
            type Value = Vec<u8>;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a byte string")
            }

            fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                Ok(v.to_vec())
            }

            fn visit_byte_buf<E: serde::de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
                Ok(v)
            }

            fn visit_seq<A: serde::de::SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> Result<Self::Value, A::Error> {
                let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(byte) = seq.next_element()? {
                    bytes.push(byte);
                }
                Ok(bytes)
            }
        }

        deserializer.deserialize_byte_buf(BytesVisitor)
    }
}
