//! Data file path resolution.
//!
//! The data file lives either where the caller points it or in a
//! per-application folder under the user's cache root:
//! `${XDG_CACHE_HOME or ~/.cache}/<app>/<app>.json`.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::error::{PersistenceError, Result};

const CACHE_HOME_VAR: &str = "XDG_CACHE_HOME";

/// The resolved data file and its sibling paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceTarget {
    /// Durable data file (`<name>.json`).
    pub file: PathBuf,
    /// Write staging file (`<name>.json.tmp`).
    pub temp: PathBuf,
    /// Advisory lock marker (`<name>.json.lock`).
    pub lock: PathBuf,
    /// Quarantine location for unparsable data (`<name>.json.corrupt`).
    pub backup: PathBuf,
}

impl PersistenceTarget {
    /// Resolve a target from an optional caller-supplied path.
    ///
    /// Without a path, or with an empty one, the default cache location is
    /// used, creating the per-application folder if needed.
    pub fn resolve(path: Option<&Path>, app_name: &str) -> Result<Self> {
        let file = match explicit_path(path) {
            Some(path) => path.to_path_buf(),
            None => default_data_path(&default_cache_root()?, app_name)?,
        };
        Self::from_file(&file)
    }

    /// Build the target for a data file path, appending `.json` when missing
    /// and making the path absolute.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = with_json_extension(path);
        let file = std::path::absolute(&file).map_err(|e| PersistenceError::Io {
            operation: "resolve",
            path: file.clone(),
            source: e,
        })?;

        Ok(Self {
            temp: sibling(&file, ".tmp"),
            lock: sibling(&file, ".lock"),
            backup: sibling(&file, ".corrupt"),
            file,
        })
    }
}

/// Cache root: `$XDG_CACHE_HOME` when set, otherwise `~/.cache`.
pub fn default_cache_root() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CACHE_HOME_VAR).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".cache"))
        .ok_or(PersistenceError::NoHomeDir)
}

/// `<root>/<app>/<app>.json`, creating `<root>/<app>` (non-recursively) if
/// it does not exist yet.
pub fn default_data_path(cache_root: &Path, app_name: &str) -> Result<PathBuf> {
    let dir = cache_root.join(app_name);
    if !dir.exists() {
        fs::create_dir(&dir).map_err(|e| PersistenceError::CacheDir {
            path: dir.clone(),
            source: e,
        })?;
    }
    Ok(dir.join(format!("{app_name}.json")))
}

fn explicit_path(path: Option<&Path>) -> Option<&Path> {
    path.filter(|p| !p.as_os_str().is_empty())
}

fn with_json_extension(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == "json") {
        path.to_path_buf()
    } else {
        sibling(path, ".json")
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sibling_paths() {
        let target = PersistenceTarget::from_file(Path::new("/data/store.json")).unwrap();
        assert_eq!(target.file, PathBuf::from("/data/store.json"));
        assert_eq!(target.temp, PathBuf::from("/data/store.json.tmp"));
        assert_eq!(target.lock, PathBuf::from("/data/store.json.lock"));
        assert_eq!(target.backup, PathBuf::from("/data/store.json.corrupt"));
    }

    #[test]
    fn test_empty_path_means_default_location() {
        assert_eq!(explicit_path(Some(Path::new(""))), None);
        assert_eq!(explicit_path(None), None);
        assert_eq!(
            explicit_path(Some(Path::new("data.json"))),
            Some(Path::new("data.json"))
        );
    }

    #[test]
    fn test_json_extension_appended() {
        let target = PersistenceTarget::from_file(Path::new("/data/store")).unwrap();
        assert_eq!(target.file, PathBuf::from("/data/store.json"));

        let target = PersistenceTarget::from_file(Path::new("/data/store.txt")).unwrap();
        assert_eq!(target.file, PathBuf::from("/data/store.txt.json"));
    }

    #[test]
    fn test_relative_path_made_absolute() {
        let target = PersistenceTarget::from_file(Path::new("cache/mystorage.json")).unwrap();
        assert!(target.file.is_absolute());
        assert!(target.file.ends_with("cache/mystorage.json"));
    }

    #[test]
    fn test_default_data_path_creates_app_dir() {
        let root = tempdir().unwrap();
        let path = default_data_path(root.path(), "stow").unwrap();

        assert_eq!(path, root.path().join("stow").join("stow.json"));
        assert!(root.path().join("stow").is_dir());

        // Second call finds the folder already there
        assert_eq!(default_data_path(root.path(), "stow").unwrap(), path);
    }

    #[test]
    fn test_default_data_path_is_not_recursive() {
        let root = tempdir().unwrap();
        let missing_root = root.path().join("does-not-exist");

        let result = default_data_path(&missing_root, "stow");
        assert!(matches!(result, Err(PersistenceError::CacheDir { .. })));
    }
}
