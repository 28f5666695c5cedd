//! Origins and their time-derived state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::store::EventType;

/// Kind of proof an origin stands for.
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
pub enum OriginType {
    /// Negative test
    Test,
    /// Vaccination
    Vaccination,
    /// Recovery
    Recovery,
}

impl From<EventType> for OriginType {
    fn from(event_type: EventType) -> Self {
        match event_type {
            EventType::Test => Self::Test,
            EventType::Vaccination => Self::Vaccination,
            EventType::Recovery => Self::Recovery,
        }
    }
}

/// One proof instance with its validity window.
///
/// The window is inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Origin {
    /// Kind of proof
    #[serde(rename = "type")]
    pub origin_type: OriginType,
    /// Moment of the underlying event (sample or vaccination)
    pub event_time: DateTime<Utc>,
    /// Start of validity
    pub valid_from: DateTime<Utc>,
    /// End of validity
    pub expiration_time: DateTime<Utc>,
}

/// Where `now` lies relative to an origin's window. Always computed, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum OriginState {
    /// Not valid yet
    Future,
    /// Inside the window
    Valid,
    /// Past the window. Terminal.
    Expired,
}

impl OriginState {
    /// State of `origin` at `now`.
    #[must_use]
    pub fn at(origin: &Origin, now: DateTime<Utc>) -> Self {
        if now < origin.valid_from {
            Self::Future
        } else if now <= origin.expiration_time {
            Self::Valid
        } else {
            Self::Expired
        }
    }
}

impl Origin {
    /// State of this origin at `now`.
    #[must_use]
    pub fn state(&self, now: DateTime<Utc>) -> OriginState {
        OriginState::at(self, now)
    }

    /// Whether the origin is valid now or will become valid.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.state(now) != OriginState::Expired
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use test_case::test_case;

    use super::*;

    fn utc(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, day, hour, 0, 0).unwrap()
    }

    fn origin() -> Origin {
        Origin {
            origin_type: OriginType::Test,
            event_time: utc(9, 12),
            valid_from: utc(10, 0),
            expiration_time: utc(20, 0),
        }
    }

    #[test_case(utc(5, 0), OriginState::Future; "before window")]
    #[test_case(utc(10, 0), OriginState::Valid; "at valid from")]
    #[test_case(utc(15, 0), OriginState::Valid; "inside window")]
    #[test_case(utc(20, 0), OriginState::Valid; "at expiration")]
    #[test_case(utc(25, 0), OriginState::Expired; "after window")]
    fn test_state_is_function_of_window(now: DateTime<Utc>, expected: OriginState) {
        assert_eq!(OriginState::at(&origin(), now), expected);
    }

    #[test]
    fn test_origin_serializes_type_field() {
        let json = serde_json::to_value(origin()).unwrap();
        assert_eq!(json["type"], "test");
        assert_eq!(json["validFrom"], "2021-06-10T00:00:00Z");
    }
}
