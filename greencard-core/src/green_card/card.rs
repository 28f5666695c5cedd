//! Green cards and their credentials: display filtering, domestic slots, countdowns.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::origin::{Origin, OriginState, OriginType};
use crate::error::GreenCardError;

/// A card shows a countdown once less than this is left.
const EXPIRE_COUNTDOWN_THRESHOLD_HOURS: i64 = 6;

/// Which credential family a green card carries.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
    uniffi::Enum,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GreenCardType {
    /// Dutch credential, may combine several origins
    Domestic,
    /// European Digital COVID Certificate, one origin per card
    Eu,
}

/// Fixed position of an origin on a domestic card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DomesticSlot {
    /// Slot 1
    Vaccination = 1,
    /// Slot 2
    Recovery = 2,
    /// Slot 3
    Test = 3,
}

impl DomesticSlot {
    /// Slot an origin of `origin_type` is rendered in.
    #[must_use]
    pub const fn for_origin_type(origin_type: OriginType) -> Self {
        match origin_type {
            OriginType::Vaccination => Self::Vaccination,
            OriginType::Recovery => Self::Recovery,
            OriginType::Test => Self::Test,
        }
    }

    /// One-based slot number.
    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }
}

/// Locally held proof material of a green card.
///
/// The bytes are wiped when the credential is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    data: Vec<u8>,
    #[zeroize(skip)]
    valid_from: DateTime<Utc>,
    #[zeroize(skip)]
    expiration_time: DateTime<Utc>,
    #[zeroize(skip)]
    version: u32,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("data", &"[REDACTED]")
            .field("valid_from", &self.valid_from)
            .field("expiration_time", &self.expiration_time)
            .field("version", &self.version)
            .finish()
    }
}

impl Credential {
    /// Wraps credential bytes returned by issuance.
    #[must_use]
    pub const fn new(
        data: Vec<u8>,
        valid_from: DateTime<Utc>,
        expiration_time: DateTime<Utc>,
        version: u32,
    ) -> Self {
        Self {
            data,
            valid_from,
            expiration_time,
            version,
        }
    }

    /// The credential bytes, as fed to the QR encoder and the attribute reader.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Start of validity.
    #[must_use]
    pub const fn valid_from(&self) -> DateTime<Utc> {
        self.valid_from
    }

    /// End of validity.
    #[must_use]
    pub const fn expiration_time(&self) -> DateTime<Utc> {
        self.expiration_time
    }

    /// Credential format version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Whether the credential can be shown at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_from <= now && now <= self.expiration_time
    }
}

/// Time left before a card expires, shown when it is about to run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpireCountdown {
    /// Whole hours left
    pub hours: i64,
    /// Minutes left on top of `hours`
    pub minutes: i64,
}

/// A displayable proof: one or more origins plus at most one credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GreenCard {
    id: Uuid,
    card_type: GreenCardType,
    origins: Vec<Origin>,
    credential: Option<Credential>,
}

impl GreenCard {
    /// Creates a card without a credential.
    ///
    /// # Errors
    /// `InvalidInput` when the card has no origin, or an EU card has more than one.
    pub fn new(card_type: GreenCardType, origins: Vec<Origin>) -> Result<Self, GreenCardError> {
        if origins.is_empty() {
            return Err(GreenCardError::InvalidInput {
                error: "a green card needs at least one origin".to_string(),
            });
        }
        if card_type == GreenCardType::Eu && origins.len() > 1 {
            return Err(GreenCardError::InvalidInput {
                error: format!("an eu green card holds one origin, got {}", origins.len()),
            });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            card_type,
            origins,
            credential: None,
        })
    }

    /// Unique id of the card.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Credential family of the card.
    #[must_use]
    pub const fn card_type(&self) -> GreenCardType {
        self.card_type
    }

    /// Every origin, including expired ones.
    #[must_use]
    pub fn origins(&self) -> &[Origin] {
        &self.origins
    }

    /// The current credential, if one was issued.
    #[must_use]
    pub const fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Installs a newly issued credential and returns the one it supersedes.
    pub fn set_credential(&mut self, credential: Credential) -> Option<Credential> {
        self.credential.replace(credential)
    }

    /// Origins that are not expired at `now`. Domestic cards list them in slot order.
    #[must_use]
    pub fn visible_origins(&self, now: DateTime<Utc>) -> Vec<&Origin> {
        let mut origins: Vec<&Origin> = self
            .origins
            .iter()
            .filter(|origin| origin.is_active(now))
            .collect();
        if self.card_type == GreenCardType::Domestic {
            origins.sort_by_key(|origin| DomesticSlot::for_origin_type(origin.origin_type));
        }
        origins
    }

    /// Domestic slot layout at `now`. The latest expiring origin wins a slot.
    #[must_use]
    pub fn domestic_slots(&self, now: DateTime<Utc>) -> Vec<(DomesticSlot, &Origin)> {
        let mut slots: Vec<(DomesticSlot, &Origin)> = Vec::new();
        for origin in self.visible_origins(now) {
            let slot = DomesticSlot::for_origin_type(origin.origin_type);
            match slots.iter_mut().find(|(taken, _)| *taken == slot) {
                Some(entry) if entry.1.expiration_time < origin.expiration_time => {
                    entry.1 = origin;
                }
                Some(_) => {}
                None => slots.push((slot, origin)),
            }
        }
        slots
    }

    /// Whether the card has anything left to show at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.origins.iter().any(|origin| origin.is_active(now))
    }

    /// Latest expiration of all origins.
    #[must_use]
    pub fn expiration_time(&self) -> Option<DateTime<Utc>> {
        self.origins
            .iter()
            .map(|origin| origin.expiration_time)
            .max()
    }

    /// Countdown for a card whose single remaining origin runs out within six hours.
    #[must_use]
    pub fn expire_countdown(&self, now: DateTime<Utc>) -> Option<ExpireCountdown> {
        let origins = self.visible_origins(now);
        let [origin] = origins.as_slice() else {
            return None;
        };
        if origin.state(now) != OriginState::Valid {
            return None;
        }
        let left = origin.expiration_time - now;
        if left >= Duration::hours(EXPIRE_COUNTDOWN_THRESHOLD_HOURS) {
            return None;
        }
        let minutes = left.num_minutes();
        Some(ExpireCountdown {
            hours: minutes / 60,
            minutes: minutes % 60,
        })
    }
}

/// Cards with at least one non-expired origin, in their original order.
///
/// Expired origins stay on the returned cards; use [`GreenCard::visible_origins`] to hide them.
#[must_use]
pub fn active_green_cards(cards: &[GreenCard], now: DateTime<Utc>) -> Vec<&GreenCard> {
    cards.iter().filter(|card| card.is_active(now)).collect()
}

/// Days until an origin becomes usable, rounded up.
///
/// EU cards cannot be used before the EU launch date, which then counts as the start.
/// Returns `None` when the origin is usable at `now`.
#[must_use]
pub fn days_until_valid(
    origin: &Origin,
    card_type: GreenCardType,
    now: DateTime<Utc>,
    eu_launch_date: Option<DateTime<Utc>>,
) -> Option<i64> {
    let pending_launch = eu_launch_date.filter(|launch| {
        card_type == GreenCardType::Eu && *launch > now
    });
    let starts_at = match (pending_launch, origin.state(now)) {
        (Some(launch), _) => launch,
        (None, OriginState::Future) => origin.valid_from,
        (None, _) => return None,
    };
    let hours = (starts_at - now).num_hours();
    Some(hours.div_euclid(24) + i64::from(hours.rem_euclid(24) != 0))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, day, hour, minute, 0).unwrap()
    }

    fn origin(origin_type: OriginType, from: DateTime<Utc>, until: DateTime<Utc>) -> Origin {
        Origin {
            origin_type,
            event_time: from,
            valid_from: from,
            expiration_time: until,
        }
    }

    fn credential(data: &[u8]) -> Credential {
        Credential::new(data.to_vec(), at(10, 0, 0), at(20, 0, 0), 2)
    }

    #[test]
    fn test_eu_card_holds_one_origin() {
        let origins = vec![
            origin(OriginType::Test, at(10, 0, 0), at(11, 0, 0)),
            origin(OriginType::Vaccination, at(10, 0, 0), at(30, 0, 0)),
        ];
        assert!(GreenCard::new(GreenCardType::Eu, origins.clone()).is_err());
        assert!(GreenCard::new(GreenCardType::Domestic, origins).is_ok());
        assert!(GreenCard::new(GreenCardType::Domestic, vec![]).is_err());
    }

    #[test]
    fn test_new_credential_supersedes_previous() {
        let mut card = GreenCard::new(
            GreenCardType::Domestic,
            vec![origin(OriginType::Test, at(10, 0, 0), at(11, 0, 0))],
        )
        .unwrap();
        assert!(card.set_credential(credential(b"first")).is_none());
        let previous = card.set_credential(credential(b"second")).unwrap();

        assert_eq!(previous.data(), b"first");
        assert_eq!(card.credential().unwrap().data(), b"second");
    }

    #[test]
    fn test_fully_expired_cards_are_hidden() {
        let expired = GreenCard::new(
            GreenCardType::Eu,
            vec![origin(OriginType::Test, at(1, 0, 0), at(2, 0, 0))],
        )
        .unwrap();
        let mixed = GreenCard::new(
            GreenCardType::Domestic,
            vec![
                origin(OriginType::Test, at(1, 0, 0), at(2, 0, 0)),
                origin(OriginType::Vaccination, at(1, 0, 0), at(30, 0, 0)),
            ],
        )
        .unwrap();
        let cards = vec![expired, mixed.clone()];

        let active = active_green_cards(&cards, at(15, 0, 0));
        assert_eq!(active, vec![&mixed]);
        assert_eq!(active[0].origins().len(), 2);
        assert_eq!(active[0].visible_origins(at(15, 0, 0)).len(), 1);
    }

    #[test]
    fn test_domestic_slots_follow_fixed_order() {
        let card = GreenCard::new(
            GreenCardType::Domestic,
            vec![
                origin(OriginType::Test, at(14, 0, 0), at(16, 0, 0)),
                origin(OriginType::Recovery, at(1, 0, 0), at(30, 0, 0)),
                origin(OriginType::Vaccination, at(1, 0, 0), at(30, 0, 0)),
            ],
        )
        .unwrap();
        let slots = card
            .domestic_slots(at(15, 0, 0))
            .into_iter()
            .map(|(slot, origin)| (slot.number(), origin.origin_type))
            .collect::<Vec<_>>();
        assert_eq!(
            slots,
            vec![
                (1, OriginType::Vaccination),
                (2, OriginType::Recovery),
                (3, OriginType::Test)
            ]
        );
    }

    #[test]
    fn test_countdown_only_for_single_origin_close_to_expiry() {
        let single = GreenCard::new(
            GreenCardType::Domestic,
            vec![origin(OriginType::Test, at(15, 0, 0), at(16, 12, 0))],
        )
        .unwrap();
        assert_eq!(single.expire_countdown(at(16, 0, 0)), None);
        assert_eq!(
            single.expire_countdown(at(16, 9, 15)),
            Some(ExpireCountdown {
                hours: 2,
                minutes: 45
            })
        );

        let two = GreenCard::new(
            GreenCardType::Domestic,
            vec![
                origin(OriginType::Test, at(15, 0, 0), at(16, 12, 0)),
                origin(OriginType::Vaccination, at(1, 0, 0), at(30, 0, 0)),
            ],
        )
        .unwrap();
        assert_eq!(two.expire_countdown(at(16, 9, 15)), None);
    }

    #[test]
    fn test_days_until_valid_rounds_up() {
        let future = origin(OriginType::Vaccination, at(17, 12, 0), at(30, 0, 0));
        assert_eq!(
            days_until_valid(&future, GreenCardType::Domestic, at(15, 0, 0), None),
            Some(3)
        );
        assert_eq!(
            days_until_valid(&future, GreenCardType::Domestic, at(18, 0, 0), None),
            None
        );
    }

    #[test]
    fn test_days_until_valid_waits_for_eu_launch() {
        let valid = origin(OriginType::Test, at(1, 0, 0), at(30, 0, 0));
        let launch = Some(at(20, 0, 0));
        assert_eq!(
            days_until_valid(&valid, GreenCardType::Eu, at(15, 0, 0), launch),
            Some(5)
        );
        assert_eq!(
            days_until_valid(&valid, GreenCardType::Domestic, at(15, 0, 0), launch),
            None
        );
    }
}
