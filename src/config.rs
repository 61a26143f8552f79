use std::fs;
use std::path::PathBuf;

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

/// Persisted client state: which server to talk to and the saved session,
/// so a restart does not force a fresh login.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // TOML is preferred; a legacy JSON state file is converted on load.
    fn toml_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("baylink.toml"))
    }

    fn legacy_json_path() -> Option<PathBuf> {
        let proj = directories::ProjectDirs::from("com", "baylink", "BayLink")?;
        Some(proj.config_dir().join("state.json"))
    }

    pub fn load() -> Self {
        if let Some(path) = Self::toml_path() {
            if let Ok(bytes) = fs::read(&path) {
                if let Ok(text) = String::from_utf8(bytes) {
                    if let Ok(config) = toml::from_str::<AppConfig>(&text) {
                        return config;
                    }
                }
            }
        }

        if let Some(legacy) = Self::legacy_json_path() {
            if let Ok(bytes) = fs::read(&legacy) {
                if let Ok(config) = serde_json::from_slice::<AppConfig>(&bytes) {
                    let _ = config.save();
                    return config;
                }
            }
        }

        Self::new()
    }

    pub fn save(&self) -> std::io::Result<()> {
        if let Some(path) = Self::toml_path() {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let toml = toml::to_string_pretty(self)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
            fs::write(path, toml)
        } else {
            Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config dir",
            ))
        }
    }

    /// Forget the saved session, keeping the server address.
    pub fn clear_session(&mut self) {
        self.token = None;
        self.user_id = None;
    }
}
