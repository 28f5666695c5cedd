//! Process-wide cache of the latest app config and public keys.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};

use super::model::{AppConfig, PublicKeySet};
use super::paths::{ConfigPaths, CONFIG_FILENAME, PUBLIC_KEYS_FILENAME};
use crate::error::GreenCardError;

#[derive(Debug, Clone)]
struct Snapshot {
    config: Arc<AppConfig>,
    persisted_at: Option<DateTime<Utc>>,
}

/// Read-mostly cache of `config.json` and `public_keys.json`.
///
/// Only the refresh pipeline writes through [`CachedAppConfig::persist`]. Readers get
/// an immutable `Arc` snapshot; a persist swaps the snapshot only after both files were
/// fully written, so a reader sees either the old or the new config.
#[derive(uniffi::Object)]
pub struct CachedAppConfig {
    paths: ConfigPaths,
    snapshot: RwLock<Option<Snapshot>>,
}

impl std::fmt::Debug for CachedAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedAppConfig")
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

impl CachedAppConfig {
    /// Creates a cache reading from and writing to `paths`.
    #[must_use]
    pub const fn new(paths: ConfigPaths) -> Self {
        Self {
            paths,
            snapshot: RwLock::new(None),
        }
    }

    /// Locations used by this cache.
    #[must_use]
    pub const fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// Returns the cached config, or the empty default when nothing usable is cached.
    ///
    /// Never fails: a missing or unparsable `config.json` yields `AppConfig::default()`.
    #[must_use]
    pub fn get(&self) -> Arc<AppConfig> {
        self.cached().unwrap_or_else(|| Arc::new(AppConfig::default()))
    }

    /// Returns the cached config, or `None` when no config was ever persisted or it is corrupt.
    #[must_use]
    pub fn cached(&self) -> Option<Arc<AppConfig>> {
        if let Some(snapshot) = self.read_snapshot() {
            return Some(snapshot.config);
        }

        let snapshot = self.load_from_disk()?;
        let config = Arc::clone(&snapshot.config);
        if let Ok(mut guard) = self.snapshot.write() {
            guard.get_or_insert(snapshot);
        }
        Some(config)
    }

    /// Maximum validity of a negative test, in hours.
    ///
    /// # Errors
    /// `ConfigNotCached` when called before any config was persisted.
    pub fn max_validity_hours(&self) -> Result<u32, GreenCardError> {
        self.require_cached().map(|config| config.max_validity_hours)
    }

    /// Hours a vaccination event stays usable.
    ///
    /// # Errors
    /// `ConfigNotCached` when called before any config was persisted.
    pub fn vaccination_event_validity(&self) -> Result<u32, GreenCardError> {
        self.require_cached()
            .map(|config| config.vaccination_event_validity)
    }

    /// Name of a provider, or an empty string when unknown.
    #[must_use]
    pub fn provider_name(&self, provider_identifier: &str) -> String {
        self.get().provider_name(provider_identifier)
    }

    /// Reads and parses the cached public keys.
    ///
    /// # Errors
    /// `CorruptPublicKeys` when the file is missing, unreadable or does not parse.
    pub fn public_keys(&self) -> Result<PublicKeySet, GreenCardError> {
        let path = self.paths.readable(PUBLIC_KEYS_FILENAME).ok_or_else(|| {
            GreenCardError::CorruptPublicKeys {
                error: "public_keys.json is not cached".to_string(),
            }
        })?;
        let bytes = fs::read(&path).map_err(|e| GreenCardError::CorruptPublicKeys {
            error: format!("{}: {e}", path.display()),
        })?;
        PublicKeySet::from_bytes(&bytes)
    }

    /// Validates and persists a freshly downloaded config and key bundle.
    ///
    /// Both documents are parsed before anything is written. The in-memory snapshot is
    /// replaced once both files are on disk.
    ///
    /// # Errors
    /// Parse failures leave the cache untouched. I/O failures are `Storage` errors.
    pub fn persist(
        &self,
        config_bytes: &[u8],
        public_keys_bytes: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Arc<AppConfig>, GreenCardError> {
        let config = Arc::new(AppConfig::from_json(config_bytes)?);
        PublicKeySet::from_bytes(public_keys_bytes)?;

        fs::create_dir_all(self.paths.files_dir()).map_err(storage_err)?;
        write_atomic(&self.paths.config_path(), config_bytes)?;
        write_atomic(&self.paths.public_keys_path(), public_keys_bytes)?;

        let mut guard = self.snapshot.write().map_err(|_| GreenCardError::Storage {
            error: "config snapshot lock poisoned".to_string(),
        })?;
        *guard = Some(Snapshot {
            config: Arc::clone(&config),
            persisted_at: Some(now),
        });
        log::info!(
            "persisted app config (minimum version {}, ttl {}s)",
            config.minimum_version,
            config.config_ttl_seconds
        );
        Ok(config)
    }

    /// Whether the cached config is within its `configTTL`.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let Some(snapshot) = self.read_snapshot().or_else(|| self.load_from_disk()) else {
            return false;
        };
        let Some(persisted_at) = snapshot.persisted_at else {
            return false;
        };
        let ttl = i64::try_from(snapshot.config.config_ttl_seconds).unwrap_or(i64::MAX);
        persisted_at
            .checked_add_signed(Duration::seconds(ttl))
            .is_none_or(|fresh_until| now <= fresh_until)
    }

    /// Whether both config files exist in one of the two directories.
    #[must_use]
    pub fn are_config_files_present(&self) -> bool {
        self.paths.complete_config_dir().is_some()
    }

    pub(crate) fn require_cached(&self) -> Result<Arc<AppConfig>, GreenCardError> {
        self.cached().ok_or_else(|| {
            log::error!("AppConfig should be cached before it is read");
            GreenCardError::ConfigNotCached
        })
    }

    fn read_snapshot(&self) -> Option<Snapshot> {
        self.snapshot
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().cloned())
    }

    fn load_from_disk(&self) -> Option<Snapshot> {
        let path = self.paths.readable(CONFIG_FILENAME)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("could not read {}: {e}", path.display());
                return None;
            }
        };
        let config = match AppConfig::from_json(&bytes) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("ignoring cached config: {e}");
                return None;
            }
        };
        let persisted_at = fs::metadata(&path)
            .and_then(|metadata| metadata.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        Some(Snapshot {
            config: Arc::new(config),
            persisted_at,
        })
    }
}

#[uniffi::export]
impl CachedAppConfig {
    /// Creates a cache for the platform files and cache directories.
    #[uniffi::constructor]
    #[must_use]
    pub fn from_paths(paths: Arc<ConfigPaths>) -> Self {
        Self::new(Arc::unwrap_or_clone(paths))
    }

    /// Returns a copy of the cached config or the empty default.
    #[must_use]
    pub fn app_config(&self) -> AppConfig {
        self.get().as_ref().clone()
    }

    /// Name of a provider, or an empty string when unknown.
    #[must_use]
    pub fn get_provider_name(&self, provider_identifier: String) -> String {
        self.provider_name(&provider_identifier)
    }

    /// Maximum validity of a negative test, in hours.
    ///
    /// # Errors
    /// `ConfigNotCached` when called before any config was persisted.
    pub fn get_max_validity_hours(&self) -> Result<u32, GreenCardError> {
        self.max_validity_hours()
    }

    /// Hours a vaccination event stays usable.
    ///
    /// # Errors
    /// `ConfigNotCached` when called before any config was persisted.
    pub fn get_vaccination_event_validity(&self) -> Result<u32, GreenCardError> {
        self.vaccination_event_validity()
    }
}

fn storage_err(e: std::io::Error) -> GreenCardError {
    GreenCardError::Storage {
        error: e.to_string(),
    }
}

/// Writes `bytes` next to `path` and renames into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), GreenCardError> {
    let tmp = path.with_extension("json.tmp");
    let mut file = fs::File::create(&tmp).map_err(storage_err)?;
    file.write_all(bytes).map_err(storage_err)?;
    file.sync_all().map_err(storage_err)?;
    fs::rename(&tmp, path).map_err(storage_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const CONFIG: &[u8] = br#"{
        "minimumVersion": 2,
        "configTTL": 3600,
        "maxValidityHours": 40,
        "vaccinationEventValidity": 14600,
        "providerIdentifiers": [{"code": "GGD", "name": "GGD GHOR Nederland"}]
    }"#;
    const KEYS: &[u8] = br#"{"cl_keys":[{"id":"testPk","public_key":"cGs="}]}"#;

    fn cache() -> (CachedAppConfig, tempfile::TempDir, tempfile::TempDir) {
        let files = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::new(files.path(), cache.path());
        (CachedAppConfig::new(paths), files, cache)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_get_without_cache_returns_default() {
        let (cache, _files, _cache_dir) = cache();
        assert_eq!(*cache.get(), AppConfig::default());
        assert!(cache.cached().is_none());
    }

    #[test]
    fn test_get_with_corrupt_file_returns_default() {
        let (cache, files, _cache_dir) = cache();
        fs::write(files.path().join(CONFIG_FILENAME), b"{not json").unwrap();
        assert_eq!(*cache.get(), AppConfig::default());
    }

    #[test]
    fn test_assuming_accessors_fail_before_first_persist() {
        let (cache, _files, _cache_dir) = cache();
        assert!(matches!(
            cache.max_validity_hours(),
            Err(GreenCardError::ConfigNotCached)
        ));
        assert!(matches!(
            cache.vaccination_event_validity(),
            Err(GreenCardError::ConfigNotCached)
        ));
    }

    #[test]
    fn test_persist_then_read() {
        let (cache, files, _cache_dir) = cache();
        cache.persist(CONFIG, KEYS, now()).unwrap();

        assert_eq!(cache.max_validity_hours().unwrap(), 40);
        assert_eq!(cache.vaccination_event_validity().unwrap(), 14600);
        assert_eq!(cache.provider_name("GGD"), "GGD GHOR Nederland");
        assert_eq!(cache.provider_name("ZZZ"), "");
        assert_eq!(cache.public_keys().unwrap().as_bytes(), KEYS);
        assert_eq!(fs::read(files.path().join(CONFIG_FILENAME)).unwrap(), CONFIG);
        assert!(cache.are_config_files_present());
    }

    #[test]
    fn test_persist_rejects_corrupt_keys_without_writing() {
        let (cache, files, _cache_dir) = cache();
        let err = cache.persist(CONFIG, b"\x00\x01", now()).unwrap_err();
        assert!(matches!(err, GreenCardError::CorruptPublicKeys { .. }));
        assert!(!files.path().join(CONFIG_FILENAME).exists());
        assert!(cache.cached().is_none());
    }

    #[test]
    fn test_falls_back_to_cache_dir() {
        let (cache, _files, cache_dir) = cache();
        fs::write(cache_dir.path().join(CONFIG_FILENAME), CONFIG).unwrap();
        assert_eq!(cache.max_validity_hours().unwrap(), 40);
    }

    #[test]
    fn test_freshness_follows_ttl() {
        let (cache, _files, _cache_dir) = cache();
        assert!(!cache.is_fresh(now()));

        cache.persist(CONFIG, KEYS, now()).unwrap();
        assert!(cache.is_fresh(now() + Duration::minutes(59)));
        assert!(!cache.is_fresh(now() + Duration::minutes(61)));
    }
}
