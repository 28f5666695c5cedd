//! Config download, persistence and activation.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::cache::CachedAppConfig;
use super::status::{app_status, AppStatus, ConfigResult};
use crate::credential::CredentialPrimitive;
use crate::error::GreenCardError;
use crate::provider::HolderApiClient;

/// Downloads, persists and activates the config bundle.
pub struct ConfigRefresher {
    holder_api: Arc<HolderApiClient>,
    config: Arc<CachedAppConfig>,
    primitive: Arc<dyn CredentialPrimitive>,
    is_verifier_app: bool,
}

impl std::fmt::Debug for ConfigRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigRefresher")
            .field("config", &self.config)
            .field("is_verifier_app", &self.is_verifier_app)
            .finish_non_exhaustive()
    }
}

impl ConfigRefresher {
    /// Creates a refresher. Verifier apps also initialize the verifier on every refresh.
    #[must_use]
    pub fn new(
        holder_api: Arc<HolderApiClient>,
        config: Arc<CachedAppConfig>,
        primitive: Arc<dyn CredentialPrimitive>,
        is_verifier_app: bool,
    ) -> Self {
        Self {
            holder_api,
            config,
            primitive,
            is_verifier_app,
        }
    }

    /// Downloads `config.json` and `public_keys.json`. Any failure is `ConfigResult::Error`.
    pub async fn fetch(&self) -> ConfigResult {
        let (config, public_keys) = futures::join!(
            self.holder_api.get_config_bytes(),
            self.holder_api.get_public_keys_bytes()
        );
        match (config, public_keys) {
            (Ok(config), Ok(public_keys)) => ConfigResult::Success {
                config,
                public_keys,
            },
            (Err(e), _) | (_, Err(e)) => {
                log::warn!("config download failed: {e}");
                ConfigResult::Error
            }
        }
    }

    /// Refreshes the config and returns the resulting app status.
    ///
    /// The status is derived from the downloaded config, or from the cached one when the
    /// download failed. A bundle that cannot be persisted or whose keys the primitive
    /// rejects turns the status into `AppStatus::Error`.
    ///
    /// # Errors
    /// The primitive's error when a verifier app fails to initialize its verifier.
    pub async fn refresh(
        &self,
        version_code: u32,
        now: DateTime<Utc>,
    ) -> Result<AppStatus, GreenCardError> {
        let result = self.fetch().await;
        let status = app_status(&result, &self.config, version_code, now);

        if let ConfigResult::Success {
            config,
            public_keys,
        } = &result
        {
            if let Err(e) = self.config.persist(config, public_keys, now) {
                log::error!("could not persist config: {e}");
                return Ok(AppStatus::Error);
            }
            if let Err(e) = self.load_public_keys() {
                log::error!("could not load public keys: {e}");
                return Ok(AppStatus::Error);
            }
        }

        if self.is_verifier_app {
            let Some(config_dir) = self.config.paths().complete_config_dir() else {
                log::error!("verifier has no config files to initialize from");
                return Ok(AppStatus::Error);
            };
            self.primitive
                .initialize_verifier(config_dir.to_string_lossy().into_owned())?;
        }

        Ok(status)
    }

    fn load_public_keys(&self) -> Result<(), GreenCardError> {
        let keys = self.config.public_keys()?;
        self.primitive.load_domestic_issuer_pks(keys.as_bytes().to_vec())
    }
}
