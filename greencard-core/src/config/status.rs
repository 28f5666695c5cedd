//! App status derived from the config bundle.

use chrono::{DateTime, Utc};

use super::cache::CachedAppConfig;
use super::model::AppConfig;

/// Outcome of downloading the config bundle.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum ConfigResult {
    /// Both documents were downloaded and verified.
    Success {
        /// Raw `config.json`
        config: Vec<u8>,
        /// Raw `public_keys.json`
        public_keys: Vec<u8>,
    },
    /// The download failed.
    Error,
}

/// What the app must do before it can be used.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum AppStatus {
    /// The app can be used.
    NoActionRequired,
    /// The installed version is below the minimum version.
    UpdateRequired,
    /// The app has been switched off.
    Deactivated {
        /// Page explaining the deactivation
        information_url: String,
    },
    /// No usable config is available without a connection.
    InternetRequired,
    /// The cached config or keys are unusable.
    Error,
}

/// Derives the app status from a fetch outcome and the cached config.
///
/// A successful fetch is judged on its own config. A failed fetch falls back to the
/// cached config only while it is within its TTL.
#[must_use]
pub fn app_status(
    result: &ConfigResult,
    cached: &CachedAppConfig,
    version_code: u32,
    now: DateTime<Utc>,
) -> AppStatus {
    match result {
        ConfigResult::Success { config, .. } => match AppConfig::from_json(config) {
            Ok(config) => status_for(&config, version_code),
            Err(e) => {
                log::error!("downloaded config does not parse: {e}");
                AppStatus::Error
            }
        },
        ConfigResult::Error => match cached.cached() {
            Some(config) if cached.is_fresh(now) => status_for(&config, version_code),
            _ => AppStatus::InternetRequired,
        },
    }
}

fn status_for(config: &AppConfig, version_code: u32) -> AppStatus {
    if config.app_deactivated {
        AppStatus::Deactivated {
            information_url: config.information_url.clone(),
        }
    } else if version_code < config.minimum_version {
        AppStatus::UpdateRequired
    } else {
        AppStatus::NoActionRequired
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use test_case::test_case;

    use super::*;
    use crate::config::ConfigPaths;

    const KEYS: &[u8] = br#"{"cl_keys":[]}"#;

    fn config(minimum_version: u32, deactivated: bool) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "minimumVersion": minimum_version,
            "appDeactivated": deactivated,
            "informationURL": "https://coronacheck.nl",
            "configTTL": 3600
        }))
        .unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 15, 12, 0, 0).unwrap()
    }

    fn empty_cache() -> (CachedAppConfig, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cache = CachedAppConfig::new(ConfigPaths::new(dir.path(), dir.path()));
        (cache, dir)
    }

    #[test_case(5, false, 5 => AppStatus::NoActionRequired ; "current version")]
    #[test_case(5, false, 4 => AppStatus::UpdateRequired ; "outdated version")]
    #[test_case(5, true, 9 => AppStatus::Deactivated { information_url: "https://coronacheck.nl".to_string() } ; "deactivated wins")]
    fn test_status_of_fresh_download(
        minimum_version: u32,
        deactivated: bool,
        version_code: u32,
    ) -> AppStatus {
        let (cache, _dir) = empty_cache();
        let result = ConfigResult::Success {
            config: config(minimum_version, deactivated),
            public_keys: KEYS.to_vec(),
        };
        app_status(&result, &cache, version_code, now())
    }

    #[test]
    fn test_failed_download_without_cache_needs_internet() {
        let (cache, _dir) = empty_cache();
        assert_eq!(
            app_status(&ConfigResult::Error, &cache, 1, now()),
            AppStatus::InternetRequired
        );
    }

    #[test]
    fn test_failed_download_uses_fresh_cache() {
        let (cache, _dir) = empty_cache();
        cache.persist(&config(2, false), KEYS, now()).unwrap();

        assert_eq!(
            app_status(&ConfigResult::Error, &cache, 1, now() + Duration::minutes(30)),
            AppStatus::UpdateRequired
        );
        assert_eq!(
            app_status(&ConfigResult::Error, &cache, 1, now() + Duration::hours(2)),
            AppStatus::InternetRequired
        );
    }

    #[test]
    fn test_unparsable_download_is_error() {
        let (cache, _dir) = empty_cache();
        let result = ConfigResult::Success {
            config: b"{".to_vec(),
            public_keys: KEYS.to_vec(),
        };
        assert_eq!(app_status(&result, &cache, 1, now()), AppStatus::Error);
    }
}
