//! Green cards and the time-bounded origins backing them.

mod card;
mod origin;

pub use card::{
    active_green_cards, days_until_valid, Credential, DomesticSlot, ExpireCountdown, GreenCard,
    GreenCardType,
};
pub use origin::{Origin, OriginState, OriginType};
