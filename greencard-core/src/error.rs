//! Error taxonomy and the UI state each error maps to.

use thiserror::Error;

/// Error outputs from `GreenCard` core.
#[derive(Debug, Error, uniffi::Error)]
pub enum GreenCardError {
    /// The presented input is not valid for the requested operation
    #[error("invalid_input: {error}")]
    InvalidInput {
        /// Explanation of the invalid input
        error: String,
    },
    /// Network connection error. The user may retry the same request.
    #[error("network_error: {url}: {error}")]
    NetworkError {
        /// Requested URL
        url: String,
        /// Error details
        error: String,
    },
    /// An event provider answered with a failure, or with a malformed or unsigned response.
    #[error("provider_error: {provider_identifier} (status {status:?}): {error}")]
    ProviderError {
        /// Identifier of the failing provider
        provider_identifier: String,
        /// HTTP status code when one was received
        status: Option<u16>,
        /// Error details
        error: String,
    },
    /// The central holder API answered with a failure or a malformed response.
    #[error("server_error: {url} (status {status:?}): {error}")]
    ServerError {
        /// Requested URL
        url: String,
        /// HTTP status code when one was received
        status: Option<u16>,
        /// Error details
        error: String,
    },
    /// A signed envelope did not verify against the pinned certificate
    #[error("invalid_signature: {error}")]
    InvalidSignature {
        /// Error details
        error: String,
    },
    /// An event batch contains no datable event
    #[error("missing_required_date: provider {provider_identifier}")]
    MissingRequiredDate {
        /// Provider of the rejected batch
        provider_identifier: String,
    },
    /// An event batch does not carry a provider identifier
    #[error("missing_provider_identifier")]
    MissingProviderIdentifier,
    /// The public key bundle could not be read or parsed
    #[error("corrupt_public_keys: {error}")]
    CorruptPublicKeys {
        /// Error details
        error: String,
    },
    /// An accessor that needs a cached `AppConfig` was used before any config was persisted
    #[error("app_config_not_cached")]
    ConfigNotCached,
    /// The credential primitive failed or returned unreadable output
    #[error("crypto_primitive_error: {error}")]
    CryptoPrimitive {
        /// Error details
        error: String,
    },
    /// Unexpected error serializing information
    #[error("serialization_error: {error}")]
    SerializationError {
        /// Error details
        error: String,
    },
    /// Persistence layer failure
    #[error("storage_error: {error}")]
    Storage {
        /// Error details
        error: String,
    },
    /// Unexpected `UniFFI` callback error
    #[error("unexpected uniffi callback error: {error}")]
    UnexpectedUniFFICallbackError {
        /// Error details
        error: String,
    },
}

impl From<uniffi::UnexpectedUniFFICallbackError> for GreenCardError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError {
            error: error.reason,
        }
    }
}

impl From<serde_json::Error> for GreenCardError {
    fn from(error: serde_json::Error) -> Self {
        Self::SerializationError {
            error: error.to_string(),
        }
    }
}

/// Display state the UI boundary shows for a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum ErrorState {
    /// Dismissible dialog offering a retry of the same action.
    RetryDialog,
    /// Terminal screen explaining the failure. Retrying needs new input.
    TerminalScreen,
    /// The app is in an unusable state and needs a refresh or reinstall.
    AppError,
}

impl ErrorState {
    /// Maps a failure onto the state the UI shows for it.
    ///
    /// Returns `None` for programmer errors. Those are not part of the displayable
    /// set and must be propagated by the caller.
    #[must_use]
    pub const fn from_error(error: &GreenCardError) -> Option<Self> {
        match error {
            GreenCardError::NetworkError { .. } => Some(Self::RetryDialog),
            GreenCardError::ProviderError { .. }
            | GreenCardError::ServerError { .. }
            | GreenCardError::InvalidSignature { .. } => Some(Self::TerminalScreen),
            GreenCardError::MissingRequiredDate { .. }
            | GreenCardError::MissingProviderIdentifier
            | GreenCardError::CorruptPublicKeys { .. }
            | GreenCardError::CryptoPrimitive { .. }
            | GreenCardError::SerializationError { .. }
            | GreenCardError::Storage { .. } => Some(Self::AppError),
            GreenCardError::ConfigNotCached
            | GreenCardError::InvalidInput { .. }
            | GreenCardError::UnexpectedUniFFICallbackError { .. } => None,
        }
    }
}
