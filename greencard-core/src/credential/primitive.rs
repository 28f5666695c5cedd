//! The foreign credential primitive.

use crate::error::GreenCardError;

/// The native credential library, provided by the host app.
///
/// Bytes in, bytes or JSON out. Implementations report failures as `CryptoPrimitive`;
/// the engine treats those as fatal and never retries them.
#[uniffi::export(with_foreign)]
pub trait CredentialPrimitive: Send + Sync {
    /// Loads the domestic issuer public keys (`public_keys.json`).
    ///
    /// # Errors
    ///
    /// Returns an error if the key bundle is rejected.
    fn load_domestic_issuer_pks(&self, public_keys: Vec<u8>) -> Result<(), GreenCardError>;

    /// Generates a new holder secret key.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails.
    fn generate_holder_sk(&self) -> Result<Vec<u8>, GreenCardError>;

    /// Creates the issue commitment message for the issuer nonce.
    ///
    /// # Errors
    ///
    /// Returns an error if the key or nonce is rejected.
    fn create_commitment_message(
        &self,
        holder_sk: Vec<u8>,
        prepare_issue_message: Vec<u8>,
    ) -> Result<Vec<u8>, GreenCardError>;

    /// Turns issuer messages into domestic credentials.
    ///
    /// Returns a JSON array of `{"credential": .., "attributes": {..}}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the messages cannot be processed.
    fn create_domestic_credentials(
        &self,
        create_credential_messages: Vec<u8>,
    ) -> Result<Vec<u8>, GreenCardError>;

    /// Reads the attributes of a domestic credential as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential is unreadable.
    fn read_domestic_credential(&self, credential: Vec<u8>) -> Result<Vec<u8>, GreenCardError>;

    /// Reads a European credential as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential is unreadable.
    fn read_european_credential(&self, credential: Vec<u8>) -> Result<Vec<u8>, GreenCardError>;

    /// Creates a fresh disclosure proof of a domestic credential, the QR payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the proof cannot be created.
    fn disclose(&self, holder_sk: Vec<u8>, credential: Vec<u8>) -> Result<Vec<u8>, GreenCardError>;

    /// Points the verifier at the directory holding `config.json` and `public_keys.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the verifier cannot be initialized.
    fn initialize_verifier(&self, config_dir: String) -> Result<(), GreenCardError>;

    /// Verifies scanned QR content and returns the disclosed attributes as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the proof does not verify.
    fn verify(&self, qr_content: Vec<u8>) -> Result<Vec<u8>, GreenCardError>;
}
