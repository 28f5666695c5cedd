//! Blob store on the local filesystem.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use greencard_core::store::AtomicBlobStore;
use greencard_core::GreenCardError;

fn storage_err(path: &Path, e: &std::io::Error) -> GreenCardError {
    GreenCardError::Storage {
        error: format!("{}: {e}", path.display()),
    }
}

/// Stores each blob as a file below `root`. Blob paths use `/` separators.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, GreenCardError> {
        if path.split('/').any(|part| part.is_empty() || part == "." || part == "..") {
            return Err(GreenCardError::InvalidInput {
                error: format!("invalid blob path {path:?}"),
            });
        }
        Ok(path.split('/').fold(self.root.clone(), |dir, part| dir.join(part)))
    }

    fn collect(&self, dir: &Path, out: &mut Vec<String>) -> Result<(), GreenCardError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(storage_err(dir, &e)),
        };
        for entry in entries {
            let path = entry.map_err(|e| storage_err(dir, &e))?.path();
            let is_tmp = path.extension().is_some_and(|ext| ext == "tmp");
            if path.is_dir() {
                self.collect(&path, out)?;
            } else if let (false, Ok(relative)) = (is_tmp, path.strip_prefix(&self.root)) {
                let parts: Vec<_> = relative
                    .components()
                    .map(|part| part.as_os_str().to_string_lossy().into_owned())
                    .collect();
                out.push(parts.join("/"));
            }
        }
        Ok(())
    }
}

impl AtomicBlobStore for FsBlobStore {
    fn read(&self, path: String) -> Result<Option<Vec<u8>>, GreenCardError> {
        let file = self.resolve(&path)?;
        match fs::read(&file) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_err(&file, &e)),
        }
    }

    fn write_atomic(&self, path: String, bytes: Vec<u8>) -> Result<(), GreenCardError> {
        let file = self.resolve(&path)?;
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).map_err(|e| storage_err(parent, &e))?;
        }
        let tmp = file.with_extension("tmp");
        let mut out = fs::File::create(&tmp).map_err(|e| storage_err(&tmp, &e))?;
        out.write_all(&bytes).map_err(|e| storage_err(&tmp, &e))?;
        out.sync_all().map_err(|e| storage_err(&tmp, &e))?;
        fs::rename(&tmp, &file).map_err(|e| storage_err(&file, &e))
    }

    fn delete(&self, path: String) -> Result<(), GreenCardError> {
        let file = self.resolve(&path)?;
        match fs::remove_file(&file) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(storage_err(&file, &e)),
            _ => Ok(()),
        }
    }

    fn list(&self, prefix: String) -> Result<Vec<String>, GreenCardError> {
        let mut paths = Vec::new();
        self.collect(&self.root, &mut paths)?;
        paths.retain(|path| path.starts_with(&prefix));
        paths.sort();
        Ok(paths)
    }
}
