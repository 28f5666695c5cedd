//! QR payloads for display: the rendered image next to the attributes it encodes.

use std::sync::Arc;

use crate::credential::{CredentialEngine, DomesticAttributes, EuropeanCredential, HolderSecretKey};
use crate::error::GreenCardError;
use crate::green_card::GreenCardType;

/// QR error correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum ErrorCorrectionLevel {
    /// ~15% recovery
    M,
    /// ~25% recovery
    Q,
}

impl ErrorCorrectionLevel {
    /// Level used for cards of `card_type`.
    #[must_use]
    pub const fn for_card_type(card_type: GreenCardType) -> Self {
        match card_type {
            GreenCardType::Domestic => Self::M,
            GreenCardType::Eu => Self::Q,
        }
    }
}

/// Renders QR images. Provided by the host platform.
#[uniffi::export(with_foreign)]
pub trait QrImageEncoder: Send + Sync {
    /// Encodes `content` into an image of `width` x `height`.
    ///
    /// # Errors
    ///
    /// Returns an error if the content does not fit or rendering fails.
    fn encode(
        &self,
        content: Vec<u8>,
        width: u32,
        height: u32,
        error_correction: ErrorCorrectionLevel,
    ) -> Result<Vec<u8>, GreenCardError>;
}

/// A rendered QR code with the attributes of the credential behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrCodeData {
    /// Domestic card
    Domestic {
        /// Encoded image
        image: Vec<u8>,
        /// Attributes of the credential
        attributes: DomesticAttributes,
    },
    /// European card
    European {
        /// Encoded image
        image: Vec<u8>,
        /// The credential as read
        credential: EuropeanCredential,
    },
}

impl QrCodeData {
    /// The encoded image.
    #[must_use]
    pub fn image(&self) -> &[u8] {
        match self {
            Self::Domestic { image, .. } | Self::European { image, .. } => image,
        }
    }
}

/// Combines the platform encoder with the credential reader.
pub struct QrCodeDataAssembler {
    engine: Arc<CredentialEngine>,
    encoder: Arc<dyn QrImageEncoder>,
}

impl std::fmt::Debug for QrCodeDataAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QrCodeDataAssembler")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl QrCodeDataAssembler {
    /// Creates an assembler.
    #[must_use]
    pub fn new(engine: Arc<CredentialEngine>, encoder: Arc<dyn QrImageEncoder>) -> Self {
        Self { engine, encoder }
    }

    /// Renders `credential` and reads its attributes.
    ///
    /// With `should_disclose` the image carries a fresh disclosure proof of `credential`
    /// instead of the credential itself. The attributes are always read from `credential`.
    ///
    /// # Errors
    /// The encoder's error, or `CryptoPrimitive` when disclosure or reading fails.
    pub fn assemble(
        &self,
        card_type: GreenCardType,
        credential: &[u8],
        holder_sk: &HolderSecretKey,
        should_disclose: bool,
        width: u32,
        height: u32,
    ) -> Result<QrCodeData, GreenCardError> {
        let content = if should_disclose {
            self.engine.disclose(holder_sk, credential)?
        } else {
            credential.to_vec()
        };
        let image = self.encoder.encode(
            content,
            width,
            height,
            ErrorCorrectionLevel::for_card_type(card_type),
        )?;

        Ok(match card_type {
            GreenCardType::Domestic => QrCodeData::Domestic {
                image,
                attributes: self.engine.read_domestic_attributes(credential)?,
            },
            GreenCardType::Eu => QrCodeData::European {
                image,
                credential: self.engine.read_european_attributes(credential)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::config::{CachedAppConfig, ConfigPaths};
    use crate::credential::test_support::FakePrimitive;
    use crate::events::test_support::FixedCertificateVerifier;
    use crate::provider::HolderApiClient;

    #[derive(Default)]
    struct RecordingEncoder {
        calls: Mutex<Vec<(Vec<u8>, u32, u32, ErrorCorrectionLevel)>>,
    }

    impl QrImageEncoder for RecordingEncoder {
        fn encode(
            &self,
            content: Vec<u8>,
            width: u32,
            height: u32,
            error_correction: ErrorCorrectionLevel,
        ) -> Result<Vec<u8>, GreenCardError> {
            self.calls
                .lock()
                .unwrap()
                .push((content.clone(), width, height, error_correction));
            Ok([b"png:".as_slice(), &content].concat())
        }
    }

    struct Fixture {
        assembler: QrCodeDataAssembler,
        primitive: Arc<FakePrimitive>,
        encoder: Arc<RecordingEncoder>,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let primitive = Arc::new(FakePrimitive::default());
        let engine = CredentialEngine::new(
            primitive.clone(),
            Arc::new(CachedAppConfig::new(ConfigPaths::new(dir.path(), dir.path()))),
            Arc::new(HolderApiClient::with_base_url(
                "https://unused/",
                Arc::new(FixedCertificateVerifier {
                    certificate: vec![],
                }),
                vec![],
            )),
        );
        let encoder = Arc::new(RecordingEncoder::default());
        Fixture {
            assembler: QrCodeDataAssembler::new(Arc::new(engine), encoder.clone()),
            primitive,
            encoder,
            _dir: dir,
        }
    }

    fn sk() -> HolderSecretKey {
        HolderSecretKey::from_bytes(b"holder-sk".to_vec())
    }

    #[test]
    fn test_domestic_halves_see_identical_bytes() {
        let fixture = fixture();
        let credential = b"domestic-credential".to_vec();

        let data = fixture
            .assembler
            .assemble(GreenCardType::Domestic, &credential, &sk(), false, 300, 300)
            .unwrap();

        let calls = fixture.encoder.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, credential);
        assert_eq!(calls[0].3, ErrorCorrectionLevel::M);
        assert_eq!(
            fixture.primitive.read_credentials.lock().unwrap().as_slice(),
            [credential.clone()]
        );
        assert!(matches!(data, QrCodeData::Domestic { .. }));
        assert_eq!(data.image(), b"png:domestic-credential");
    }

    #[test]
    fn test_disclosure_is_derived_from_the_read_credential() {
        let fixture = fixture();
        let credential = b"domestic-credential".to_vec();

        fixture
            .assembler
            .assemble(GreenCardType::Domestic, &credential, &sk(), true, 200, 100)
            .unwrap();

        let calls = fixture.encoder.calls.lock().unwrap();
        assert_eq!(calls[0].0, b"disclosed:domestic-credential");
        assert_eq!((calls[0].1, calls[0].2), (200, 100));
        assert_eq!(
            fixture.primitive.read_credentials.lock().unwrap().as_slice(),
            [credential.clone()]
        );
    }

    #[test]
    fn test_european_uses_high_correction() {
        let fixture = fixture();
        let credential = b"HC1:EUCREDENTIAL".to_vec();

        let data = fixture
            .assembler
            .assemble(GreenCardType::Eu, &credential, &sk(), false, 300, 300)
            .unwrap();

        let calls = fixture.encoder.calls.lock().unwrap();
        assert_eq!(calls[0].0, credential);
        assert_eq!(calls[0].3, ErrorCorrectionLevel::Q);
        assert_eq!(
            fixture.primitive.read_credentials.lock().unwrap().as_slice(),
            [credential.clone()]
        );
        match data {
            QrCodeData::European { credential, .. } => {
                assert_eq!(credential.dcc.full_name(), "Bouwer, Bob");
            }
            other => panic!("expected a European payload, got {other:?}"),
        }
    }
}
