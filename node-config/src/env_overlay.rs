//! Load a `[env]`-style overlay from `$XDG_CONFIG_HOME/<app>/env.json`.
//!
//! Targets a JSON document rather than TOML, since every other configuration
//! document in this crate is JSON.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::LoadError;

fn xdg_env_path(app_name: &str) -> Option<PathBuf> {
    let config_dir = dirs::config_dir()?.join(app_name);
    let path = config_dir.join("env.json");
    if path.exists() {
        Some(path)
    } else {
        None
    }
}

/// Returns env key-value pairs from `<app>/env.json`. Missing file returns an empty map.
pub fn load_env_map(app_name: &str) -> Result<HashMap<String, String>, LoadError> {
    let path = match xdg_env_path(app_name) {
        Some(p) => p,
        None => return Ok(HashMap::new()),
    };
    let content = std::fs::read_to_string(&path).map_err(LoadError::XdgRead)?;
    let map: HashMap<String, String> = serde_json::from_str(&content)?;
    Ok(map)
}
