//! Signed response envelopes.
//!
//! Providers and the central holder API wrap every payload as
//! `{"payload": "<base64 json>", "signature": "<base64 CMS>"}`. The raw response body is
//! kept next to the parsed model: it is what gets persisted and later re-submitted
//! for issuance, so it must survive byte for byte.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::GreenCardError;

/// Verifies a detached signature against a pinned certificate.
///
/// Implemented by the host app on top of the platform CMS implementation. The
/// certificate is the one pinned for the answering party, never the platform trust store.
#[uniffi::export(with_foreign)]
pub trait SignatureVerifier: Send + Sync {
    /// Verifies `signature` over `payload` with `certificate`.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature does not verify.
    fn verify(
        &self,
        certificate: Vec<u8>,
        payload: Vec<u8>,
        signature: Vec<u8>,
    ) -> Result<(), GreenCardError>;
}

/// Failures opening a signed envelope.
#[derive(Debug, Error)]
pub enum SignedResponseError {
    /// The body is not a signed envelope
    #[error("malformed envelope: {0}")]
    Envelope(String),
    /// The signature did not verify
    #[error("invalid signature: {0}")]
    Signature(String),
    /// The signed payload does not match the expected model
    #[error("malformed payload: {0}")]
    Payload(String),
}

/// The signed envelope as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedResponse {
    /// Base64 encoded JSON payload
    pub payload: String,
    /// Base64 encoded detached signature
    pub signature: String,
}

impl SignedResponse {
    /// Parses an envelope from a response body.
    ///
    /// # Errors
    /// Returns an error if the body is not a JSON envelope.
    pub fn from_bytes(body: &[u8]) -> Result<Self, SignedResponseError> {
        serde_json::from_slice(body).map_err(|e| SignedResponseError::Envelope(e.to_string()))
    }

    /// Decodes the payload bytes.
    ///
    /// # Errors
    /// Returns an error if the payload is not valid base64.
    pub fn payload_bytes(&self) -> Result<Vec<u8>, SignedResponseError> {
        STANDARD
            .decode(&self.payload)
            .map_err(|e| SignedResponseError::Envelope(format!("payload: {e}")))
    }

    /// Decodes the payload and checks its signature.
    ///
    /// # Errors
    /// Returns an error if decoding fails or the signature does not verify.
    pub fn verified_payload(
        &self,
        verifier: &dyn SignatureVerifier,
        certificate: &[u8],
    ) -> Result<Vec<u8>, SignedResponseError> {
        let payload = self.payload_bytes()?;
        let signature = STANDARD
            .decode(&self.signature)
            .map_err(|e| SignedResponseError::Envelope(format!("signature: {e}")))?;
        verifier
            .verify(certificate.to_vec(), payload.clone(), signature)
            .map_err(|e| SignedResponseError::Signature(e.to_string()))?;
        Ok(payload)
    }
}

/// A parsed model together with the exact response body it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedResponseWithModel<T> {
    raw: Vec<u8>,
    model: T,
}

impl<T: DeserializeOwned> SignedResponseWithModel<T> {
    /// Verifies and parses a response body.
    ///
    /// # Errors
    /// Returns an error if the envelope is malformed, the signature does not verify
    /// or the payload does not parse as `T`.
    pub fn open(
        raw: Vec<u8>,
        verifier: &dyn SignatureVerifier,
        certificate: &[u8],
    ) -> Result<Self, SignedResponseError> {
        let payload = SignedResponse::from_bytes(&raw)?.verified_payload(verifier, certificate)?;
        let model = serde_json::from_slice(&payload)
            .map_err(|e| SignedResponseError::Payload(e.to_string()))?;
        Ok(Self { raw, model })
    }
}

impl<T> SignedResponseWithModel<T> {
    /// Pairs an already parsed model with its raw body.
    pub const fn new(raw: Vec<u8>, model: T) -> Self {
        Self { raw, model }
    }

    /// The response body exactly as received.
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The parsed payload.
    pub const fn model(&self) -> &T {
        &self.model
    }

    /// Splits into model and raw body.
    pub fn into_parts(self) -> (T, Vec<u8>) {
        (self.model, self.raw)
    }

    /// Maps the model, keeping the raw body.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SignedResponseWithModel<U> {
        SignedResponseWithModel {
            raw: self.raw,
            model: f(self.model),
        }
    }
}
