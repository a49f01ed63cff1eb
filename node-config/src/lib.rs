//! Load configuration from `$XDG_CONFIG_HOME/<app>/config.json` and a project `.env`
//! overlay, then expose a typed [`NodeConfig`] plus whole-document JSON persistence
//! helpers for the `*-state.json` documents every subsystem in `node-core` owns.
//!
//! Environment precedence: existing process env > project `.env` > `<app>/env.json`
//! overlay. This lets operators keep secrets like bearer tokens and TLS
//! passphrases out of the committed `config.json`.

mod documents;
mod dotenv;
mod env_overlay;
pub mod types;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use documents::{app_dir, load_document, save_document};
pub use types::{
    EventHookConfig, EventKind, FleetNodeConfig, HandoffTaskConfig, McpServerConfig,
    MemoryCategory, NodeConfig, ScheduledTaskConfig, SyncConfig, TaskCondition, TlsSettings,
};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("no config directory available on this platform")]
    NoConfigDir,
    #[error("create config directory: {0}")]
    CreateDir(std::io::Error),
    #[error("read file: {0}")]
    XdgRead(std::io::Error),
    #[error("parse json: {0}")]
    XdgParse(#[from] serde_json::Error),
    #[error("read .env: {0}")]
    DotenvRead(std::io::Error),
    #[error("serialize document: {0}")]
    Serialize(serde_json::Error),
    #[error("write document: {0}")]
    Write(std::io::Error),
}

/// Loads `<app>/env.json` and project `.env`, then applies them to the process
/// environment for any key not already set (existing env always wins).
pub fn load_and_apply(app_name: &str, override_dir: Option<&Path>) -> Result<(), LoadError> {
    let overlay_map = env_overlay::load_env_map(app_name)?;
    let dotenv_map = dotenv::load_env_map(override_dir).map_err(LoadError::DotenvRead)?;

    let mut keys: std::collections::HashSet<String> = overlay_map.keys().cloned().collect();
    keys.extend(dotenv_map.keys().cloned());

    for key in keys {
        if std::env::var(&key).is_ok() {
            continue;
        }
        let value = dotenv_map.get(&key).or_else(|| overlay_map.get(&key)).cloned();
        if let Some(v) = value {
            std::env::set_var(&key, v);
        }
    }

    Ok(())
}

/// Owns the path layout for one node's documents under
/// `$XDG_CONFIG_HOME/<app_name>/` and provides typed load/save for `config.json`.
///
/// This is the "process-wide state object with explicit lifecycle" design note
///: constructed once at startup, handed to every subsystem by dependency
/// injection rather than read from a true global.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    /// Resolves (and creates) `$XDG_CONFIG_HOME/<app_name>`.
    pub fn new(app_name: &str) -> Result<Self, LoadError> {
        Ok(Self {
            dir: app_dir(app_name)?,
        })
    }

    /// Builds a store rooted at an explicit directory (used by tests).
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Loads `config.json`, reverting to [`NodeConfig::default`] if missing or unparseable.
    pub fn load_config(&self) -> NodeConfig {
        load_document(&self.path("config.json"))
    }

    /// Overwrites `config.json` in full.
    pub fn save_config(&self, config: &NodeConfig) -> Result<(), LoadError> {
        save_document(&self.path("config.json"), config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_config_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at(dir.path());
        let config = store.load_config();
        assert_eq!(config.node_name, "node");
        assert!(config.peers.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at(dir.path());
        let mut config = NodeConfig::default();
        config.node_name = "alpha".to_string();
        config.peers.push(FleetNodeConfig {
            name: "beta".to_string(),
            url: "https://beta.example:7700".to_string(),
            token: Some("tok".to_string()),
            client_cert: None,
            client_key: None,
        });
        store.save_config(&config).unwrap();

        let loaded = store.load_config();
        assert_eq!(loaded.node_name, "alpha");
        assert_eq!(loaded.peers.len(), 1);
        assert_eq!(loaded.peers[0].name, "beta");
    }

    #[test]
    fn load_and_apply_no_config_ok() {
        let r = load_and_apply("node-config-test-nonexistent-app-xyz", None::<&std::path::Path>);
        assert!(r.is_ok());
    }

    #[test]
    fn event_kind_roundtrips_through_json() {
        let kind = EventKind::ServiceDown {
            service: "nginx".to_string(),
        };
        let json = serde_json::to_string(&kind).unwrap();
        assert!(json.contains("\"type\":\"service_down\""));
        let back: EventKind = serde_json::from_str(&json).unwrap();
        matches!(back, EventKind::ServiceDown { .. });
    }
}
