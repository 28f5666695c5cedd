//! Config file locations.

use std::path::{Path, PathBuf};

pub(crate) const CONFIG_FILENAME: &str = "config.json";
pub(crate) const PUBLIC_KEYS_FILENAME: &str = "public_keys.json";

/// The two directories config files are read from.
///
/// The durable files directory is preferred; the volatile cache directory holds
/// copies written by older app versions and is only read as a fallback.
#[derive(Debug, Clone, uniffi::Object)]
pub struct ConfigPaths {
    files_dir: PathBuf,
    cache_dir: PathBuf,
}

impl ConfigPaths {
    /// Builds config paths for the given files and cache directories.
    #[must_use]
    pub fn new(files_dir: impl AsRef<Path>, cache_dir: impl AsRef<Path>) -> Self {
        Self {
            files_dir: files_dir.as_ref().to_path_buf(),
            cache_dir: cache_dir.as_ref().to_path_buf(),
        }
    }

    /// Returns the durable files directory.
    #[must_use]
    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    /// Returns the volatile cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Where `config.json` is written.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.files_dir.join(CONFIG_FILENAME)
    }

    /// Where `public_keys.json` is written.
    #[must_use]
    pub fn public_keys_path(&self) -> PathBuf {
        self.files_dir.join(PUBLIC_KEYS_FILENAME)
    }

    /// Resolves `filename` for reading: files directory first, then cache directory.
    #[must_use]
    pub fn readable(&self, filename: &str) -> Option<PathBuf> {
        [&self.files_dir, &self.cache_dir]
            .into_iter()
            .map(|dir| dir.join(filename))
            .find(|path| path.exists())
    }

    /// The directory holding both config files, preferring the files directory.
    ///
    /// Verifier initialization points the primitive at this directory.
    #[must_use]
    pub fn complete_config_dir(&self) -> Option<&Path> {
        [&self.files_dir, &self.cache_dir]
            .into_iter()
            .find(|dir| {
                dir.join(CONFIG_FILENAME).exists() && dir.join(PUBLIC_KEYS_FILENAME).exists()
            })
            .map(PathBuf::as_path)
    }
}

#[uniffi::export]
impl ConfigPaths {
    /// Builds config paths from the platform directory strings.
    #[uniffi::constructor]
    #[must_use]
    pub fn from_dirs(files_dir: String, cache_dir: String) -> Self {
        Self::new(PathBuf::from(files_dir), PathBuf::from(cache_dir))
    }

    /// Returns the path of the files directory config as a string.
    #[must_use]
    pub fn config_path_string(&self) -> String {
        self.config_path().to_string_lossy().to_string()
    }
}
