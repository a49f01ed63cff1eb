//! Generic whole-document JSON persistence for `config.json` and the per-subsystem
//! `*-state.json` / `memory.json` documents.
//!
//! Readers tolerate a missing or unparseable file by reverting to `T::default()`;
//! writers perform a whole-file overwrite. Neither operation takes a lock here — callers
//! (node-core's `PersistedState<T>`) are responsible for serializing concurrent access
//! within the process.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::LoadError;

/// Returns the directory this node's documents live in: `<config_dir>/<app_name>`.
/// Creates it if missing.
pub fn app_dir(app_name: &str) -> Result<PathBuf, LoadError> {
    let base = dirs::config_dir().ok_or(LoadError::NoConfigDir)?;
    let dir = base.join(app_name);
    std::fs::create_dir_all(&dir).map_err(LoadError::CreateDir)?;
    Ok(dir)
}

/// Reads and deserializes a JSON document at `path`. A missing file or parse failure
/// yields `T::default()` (logged at `warn`) rather than an error.
pub fn load_document<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return T::default(),
    };
    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse document, reverting to defaults");
            T::default()
        }
    }
}

/// Serializes `value` and overwrites `path` in full. Logs and returns `Ok(())`-shaped
/// callers still see the error so they can decide whether to continue; write
/// failures are logged and do not otherwise interrupt the caller's subsystem.
pub fn save_document<T>(path: &Path, value: &T) -> Result<(), LoadError>
where
    T: Serialize,
{
    let json = serde_json::to_string_pretty(value).map_err(LoadError::Serialize)?;
    std::fs::write(path, json).map_err(LoadError::Write)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct Doc {
        count: u32,
    }

    #[test]
    fn load_document_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let doc: Doc = load_document(&path);
        assert_eq!(doc, Doc::default());
    }

    #[test]
    fn load_document_unparseable_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        let doc: Doc = load_document(&path);
        assert_eq!(doc, Doc::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        save_document(&path, &Doc { count: 7 }).unwrap();
        let doc: Doc = load_document(&path);
        assert_eq!(doc, Doc { count: 7 });
    }
}
