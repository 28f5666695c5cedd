//! Offline verification of scanned domestic QR codes.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::credential::{CredentialPrimitive, DomesticAttributes};

/// Tolerated clock difference between the holder's and the verifier's device, in seconds.
pub const DEFAULT_CLOCK_SKEW_SECONDS: i64 = 180;

/// A QR code that verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedQr {
    /// Moment of verification
    pub verified_at: DateTime<Utc>,
    /// Attributes disclosed by the proof
    pub attributes: DomesticAttributes,
}

/// Outcome of scanning a QR code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifiedQrResultState {
    /// Genuine and within its validity window
    Valid(VerifiedQr),
    /// Genuine specimen credential, within its validity window
    Demo(VerifiedQr),
    /// Genuine, but outside its validity window
    Invalid(VerifiedQr),
    /// Not a verifiable credential
    Error {
        /// Why verification failed
        error: String,
    },
}

/// Verifies QR codes with the primitive initialized by the config refresh.
pub struct QrVerifier {
    primitive: Arc<dyn CredentialPrimitive>,
    clock_skew: Duration,
}

impl std::fmt::Debug for QrVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QrVerifier")
            .field("clock_skew", &self.clock_skew)
            .finish_non_exhaustive()
    }
}

impl QrVerifier {
    /// Creates a verifier tolerating [`DEFAULT_CLOCK_SKEW_SECONDS`].
    #[must_use]
    pub fn new(primitive: Arc<dyn CredentialPrimitive>) -> Self {
        Self::with_clock_skew(primitive, Duration::seconds(DEFAULT_CLOCK_SKEW_SECONDS))
    }

    /// Creates a verifier tolerating `clock_skew` before the start of validity.
    #[must_use]
    pub fn with_clock_skew(primitive: Arc<dyn CredentialPrimitive>, clock_skew: Duration) -> Self {
        Self {
            primitive,
            clock_skew,
        }
    }

    /// Verifies `qr_content` at `now`.
    #[must_use]
    pub fn verify(&self, qr_content: &[u8], now: DateTime<Utc>) -> VerifiedQrResultState {
        let attributes = match self
            .primitive
            .verify(qr_content.to_vec())
            .and_then(|json| DomesticAttributes::from_json(&json))
        {
            Ok(attributes) => attributes,
            Err(e) => {
                log::info!("qr code did not verify: {e}");
                return VerifiedQrResultState::Error {
                    error: e.to_string(),
                };
            }
        };

        let Some(earliest) = attributes.valid_from.checked_sub_signed(self.clock_skew) else {
            log::info!("qr code validity starts out of range");
            return VerifiedQrResultState::Error {
                error: "validFrom out of range".to_string(),
            };
        };
        let within_window = earliest <= now && now <= attributes.expiration_time();
        let is_specimen = attributes.is_specimen;
        let verified = VerifiedQr {
            verified_at: now,
            attributes,
        };

        match (within_window, is_specimen) {
            (false, _) => VerifiedQrResultState::Invalid(verified),
            (true, true) => VerifiedQrResultState::Demo(verified),
            (true, false) => VerifiedQrResultState::Valid(verified),
        }
    }
}
