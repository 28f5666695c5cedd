//! Core credential lifecycle for the green card holder and verifier apps.
//!
//! Signed health events are fetched from providers, persisted as event groups,
//! exchanged for domestic and European credentials and rendered as QR codes.
//! Verifier apps validate those QR codes offline against the cached public keys.
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
use strum::EnumString;

/// Deployment environment. Selects the central holder API host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    /// Acceptance environment, uses test providers and specimen events.
    Staging,
    /// Production environment.
    Production,
}

impl Environment {
    /// Base URL of the central holder API, including the trailing `/`.
    #[must_use]
    pub const fn holder_api_url(&self) -> &'static str {
        match self {
            Self::Staging => "https://holder-api.acc.coronacheck.nl/v4/",
            Self::Production => "https://holder-api.coronacheck.nl/v4/",
        }
    }
}

mod error;
pub use error::*;

pub mod logger;

pub mod config;
pub use config::{AppConfig, AppStatus, CachedAppConfig, PublicKeySet};

pub mod events;
pub use events::{RemoteEvents, SignedResponseWithModel};

pub mod provider;

pub mod store;
pub use store::{EventGroup, EventType};

pub mod green_card;
pub use green_card::{GreenCard, GreenCardType, Origin, OriginState, OriginType};

pub mod credential;

pub mod qr;

pub mod verifier;

// private modules
mod http_request;

uniffi::setup_scaffolding!("greencard_core");
