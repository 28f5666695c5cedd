//! Common test utilities shared across integration tests.

#![allow(missing_docs)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use base64::{engine::general_purpose::STANDARD, Engine};
use greencard_core::credential::{CredentialEngine, CredentialPrimitive};
use greencard_core::events::{SignatureVerifier, SignedResponse};
use greencard_core::provider::HolderApiClient;
use greencard_core::qr::{ErrorCorrectionLevel, QrImageEncoder};
use greencard_core::store::EventType;
use greencard_core::{CachedAppConfig, GreenCardError, RemoteEvents, SignedResponseWithModel};

pub const PROVIDER_CERT: &[u8] = b"provider-cert";

pub const CONFIG: &[u8] = br#"{
    "minimumVersion": 1,
    "configTTL": 3600,
    "maxValidityHours": 40,
    "testEventValidity": 40,
    "vaccinationEventValidity": 14600,
    "recoveryEventValidity": 7300,
    "euLaunchDate": "2021-07-01",
    "providerIdentifiers": [{"code": "GGD", "name": "GGD GHOR Nederland"}]
}"#;

pub const PUBLIC_KEYS: &[u8] = br#"{"cl_keys":[{"id":"testPk","public_key":"cGs="}]}"#;

/// Accepts signatures equal to `b"signed"` made with [`PROVIDER_CERT`].
pub struct StubSignatureVerifier;

impl SignatureVerifier for StubSignatureVerifier {
    fn verify(
        &self,
        certificate: Vec<u8>,
        _payload: Vec<u8>,
        signature: Vec<u8>,
    ) -> Result<(), GreenCardError> {
        if certificate == PROVIDER_CERT && signature == b"signed" {
            Ok(())
        } else {
            Err(GreenCardError::InvalidSignature {
                error: "unexpected certificate".to_string(),
            })
        }
    }
}

pub fn sign(payload: &serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&SignedResponse {
        payload: STANDARD.encode(serde_json::to_vec(payload).unwrap()),
        signature: STANDARD.encode(b"signed"),
    })
    .unwrap()
}

/// A verified batch, as the provider client hands it to the saver.
pub fn signed_batch(
    event_type: EventType,
    payload: &serde_json::Value,
) -> SignedResponseWithModel<RemoteEvents> {
    let raw = sign(payload);
    let model: SignedResponseWithModel<serde_json::Value> =
        SignedResponseWithModel::open(raw, &StubSignatureVerifier, PROVIDER_CERT).unwrap();
    let (payload, raw) = model.into_parts();
    let events = RemoteEvents::parse(event_type, &serde_json::to_vec(&payload).unwrap()).unwrap();
    SignedResponseWithModel::new(raw, events)
}

#[allow(dead_code, reason = "used in tests")]
pub fn negative_tests(provider: &str, sample_dates: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "providerIdentifier": provider,
        "protocolVersion": "3.0",
        "status": "complete",
        "holder": {"firstName": "Bob", "lastName": "Bouwer", "birthDate": "1960-01-20"},
        "events": sample_dates.iter().enumerate().map(|(i, date)| serde_json::json!({
            "type": "negativetest",
            "unique": format!("{provider}-{i}"),
            "negativetest": {
                "sampleDate": date,
                "negativeResult": true,
                "type": "LP217198-3",
                "manufacturer": "1232"
            }
        })).collect::<Vec<_>>()
    })
}

#[allow(dead_code, reason = "used in tests")]
pub fn vaccinations(provider: &str, dates: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "providerIdentifier": provider,
        "protocolVersion": "3.0",
        "status": "complete",
        "events": dates.iter().enumerate().map(|(i, date)| serde_json::json!({
            "type": "vaccination",
            "unique": format!("{provider}-v{i}"),
            "vaccination": {"date": date, "hpkCode": "2924528", "doseNumber": "1", "totalDoses": "2"}
        })).collect::<Vec<_>>()
    })
}

/// Primitive answering with fixed attributes and recording the bytes it reads.
#[allow(dead_code, reason = "used in tests")]
pub struct StubPrimitive {
    pub valid_from: i64,
    pub read: Mutex<Vec<Vec<u8>>>,
}

impl StubPrimitive {
    #[allow(dead_code, reason = "used in tests")]
    pub fn new(valid_from: i64) -> Self {
        Self {
            valid_from,
            read: Mutex::new(Vec::new()),
        }
    }

    fn attributes(&self) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "credentialVersion": "2",
            "isSpecimen": "0",
            "validFrom": self.valid_from.to_string(),
            "validForHours": "24",
            "firstNameInitial": "B",
            "lastNameInitial": "B",
            "birthDay": "20",
            "birthMonth": "1"
        }))
        .unwrap()
    }
}

impl CredentialPrimitive for StubPrimitive {
    fn load_domestic_issuer_pks(&self, _public_keys: Vec<u8>) -> Result<(), GreenCardError> {
        Ok(())
    }

    fn generate_holder_sk(&self) -> Result<Vec<u8>, GreenCardError> {
        Ok(b"holder-sk".to_vec())
    }

    fn create_commitment_message(
        &self,
        _holder_sk: Vec<u8>,
        prepare_issue_message: Vec<u8>,
    ) -> Result<Vec<u8>, GreenCardError> {
        Ok(prepare_issue_message)
    }

    fn create_domestic_credentials(
        &self,
        _create_credential_messages: Vec<u8>,
    ) -> Result<Vec<u8>, GreenCardError> {
        Ok(b"[]".to_vec())
    }

    fn read_domestic_credential(&self, credential: Vec<u8>) -> Result<Vec<u8>, GreenCardError> {
        self.read.lock().unwrap().push(credential);
        Ok(self.attributes())
    }

    fn read_european_credential(&self, credential: Vec<u8>) -> Result<Vec<u8>, GreenCardError> {
        self.read.lock().unwrap().push(credential);
        Err(GreenCardError::CryptoPrimitive {
            error: "not a european credential".to_string(),
        })
    }

    fn disclose(
        &self,
        _holder_sk: Vec<u8>,
        credential: Vec<u8>,
    ) -> Result<Vec<u8>, GreenCardError> {
        Ok([b"proof:".as_slice(), &credential].concat())
    }

    fn initialize_verifier(&self, _config_dir: String) -> Result<(), GreenCardError> {
        Ok(())
    }

    fn verify(&self, qr_content: Vec<u8>) -> Result<Vec<u8>, GreenCardError> {
        if qr_content.starts_with(b"proof:") {
            Ok(self.attributes())
        } else {
            Err(GreenCardError::CryptoPrimitive {
                error: "proof does not verify".to_string(),
            })
        }
    }
}

/// Returns the content as the "image" so tests can see what was encoded.
#[allow(dead_code, reason = "used in tests")]
pub struct EchoEncoder;

impl QrImageEncoder for EchoEncoder {
    fn encode(
        &self,
        content: Vec<u8>,
        _width: u32,
        _height: u32,
        _error_correction: ErrorCorrectionLevel,
    ) -> Result<Vec<u8>, GreenCardError> {
        Ok(content)
    }
}

#[allow(dead_code, reason = "used in tests")]
pub fn persisted_config(dir: &Path, now: chrono::DateTime<chrono::Utc>) -> Arc<CachedAppConfig> {
    let config = CachedAppConfig::new(greencard_core::config::ConfigPaths::new(
        dir.join("files"),
        dir.join("cache"),
    ));
    config.persist(CONFIG, PUBLIC_KEYS, now).unwrap();
    Arc::new(config)
}

#[allow(dead_code, reason = "used in tests")]
pub fn engine(
    primitive: Arc<dyn CredentialPrimitive>,
    config: Arc<CachedAppConfig>,
) -> CredentialEngine {
    let holder_api = HolderApiClient::with_base_url(
        "https://holder-api.invalid/v4/",
        Arc::new(StubSignatureVerifier),
        PROVIDER_CERT.to_vec(),
    );
    CredentialEngine::new(primitive, config, Arc::new(holder_api))
}
