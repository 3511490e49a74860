//! Resource lookup for model and asset files referenced by graphs.
//!
//! Calculators never open files directly; they go through the process-wide
//! [`ResourceProvider`]. Desktop builds use [`FileSystemResources`] rooted at
//! the resource directory. Android builds can swap in
//! [`android::AndroidAssets`], which extracts APK assets on demand.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Error, Result};

#[cfg(target_os = "android")]
pub mod android;

/// Environment variable consulted for the initial resource directory.
pub const RESOURCE_DIR_ENV: &str = "MEDIAPIPE_RESOURCE_DIR";

/// Source of resource files.
pub trait ResourceProvider: Send + Sync {
    /// Map a resource path to a readable file on disk.
    fn resolve(&self, path: &str) -> Result<PathBuf>;

    /// Read a resource completely.
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let resolved = self.resolve(path)?;
        std::fs::read(&resolved)
            .map_err(|e| Error::Resource(format!("{}: {}", resolved.display(), e)))
    }
}

/// Resources loaded from a directory on the local file system.
#[derive(Debug, Clone)]
pub struct FileSystemResources {
    root: PathBuf,
}

impl FileSystemResources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root from `MEDIAPIPE_RESOURCE_DIR`, else the working directory.
    pub fn from_env() -> Self {
        let root = std::env::var_os(RESOURCE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceProvider for FileSystemResources {
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        if path.is_empty() {
            return Err(Error::Resource("empty resource path".to_string()));
        }
        let candidate = Path::new(path);
        let resolved = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };
        if resolved.is_file() {
            Ok(resolved)
        } else {
            Err(Error::Resource(format!(
                "{} not found under {}",
                path,
                self.root.display()
            )))
        }
    }
}

lazy_static! {
    static ref PROVIDER: RwLock<Arc<dyn ResourceProvider>> =
        RwLock::new(Arc::new(FileSystemResources::from_env()));
}

/// The provider new graphs resolve resources through.
pub fn provider() -> Arc<dyn ResourceProvider> {
    Arc::clone(&PROVIDER.read())
}

/// Replace the process-wide provider. Running graphs keep the provider they
/// started with.
pub fn set_provider(provider: Arc<dyn ResourceProvider>) {
    *PROVIDER.write() = provider;
}

/// Root relative resource paths at `dir`.
#[cfg(not(target_os = "android"))]
pub fn set_resource_dir(dir: impl Into<PathBuf>) {
    let dir = dir.into();
    debug!(dir = %dir.display(), "resource directory set");
    set_provider(Arc::new(FileSystemResources::new(dir)));
}

/// Resources come from the APK on Android, so the directory is ignored.
#[cfg(target_os = "android")]
pub fn set_resource_dir(dir: impl Into<PathBuf>) {
    let dir = dir.into();
    debug!(dir = %dir.display(), "resource directory ignored on Android");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_and_absolute() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("labels.txt"), b"hand").unwrap();
        let resources = FileSystemResources::new(dir.path());

        let relative = resources.resolve("labels.txt").unwrap();
        assert_eq!(relative, dir.path().join("labels.txt"));

        let absolute = dir.path().join("labels.txt");
        let resolved = resources.resolve(absolute.to_str().unwrap()).unwrap();
        assert_eq!(resolved, absolute);

        assert_eq!(resources.read("labels.txt").unwrap(), b"hand");
    }

    #[test]
    fn test_missing_resource_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let resources = FileSystemResources::new(dir.path());
        assert!(matches!(
            resources.resolve("model.tflite"),
            Err(Error::Resource(_))
        ));
        assert!(resources.resolve("").is_err());
    }
}
