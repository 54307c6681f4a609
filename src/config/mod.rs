use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

pub mod persistence;
pub mod user;

pub use persistence::PersistentState;
pub use user::UserConfig;

pub struct AppConfig; // Namespace only

impl AppConfig {
    pub fn get_config_dir() -> PathBuf {
        let dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("puddle");

        if !dir.exists() {
            let _ = fs::create_dir_all(&dir);
        }
        dir
    }

    pub fn get_config_path() -> PathBuf {
        Self::get_config_dir().join("config.toml")
    }

    pub fn get_state_path() -> PathBuf {
        Self::get_config_dir().join("state.toml")
    }

    pub fn get_log_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("puddle")
    }

    /// Load config.toml and state.toml from the platform config dir
    pub fn load() -> (UserConfig, PersistentState) {
        Self::load_from(&Self::get_config_path(), &Self::get_state_path())
    }

    /// A missing config.toml is written out with defaults so users have
    /// something to edit. Unreadable or malformed files fall back to defaults.
    pub fn load_from(config_path: &Path, state_path: &Path) -> (UserConfig, PersistentState) {
        let user_config = if config_path.exists() {
            read_toml(config_path).unwrap_or_default()
        } else {
            let c = UserConfig::default();
            if let Ok(content) = toml::to_string_pretty(&c) {
                let _ = fs::write(config_path, content);
            }
            c
        };

        let state = read_toml(state_path).unwrap_or_default();
        (user_config, state)
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config file");
            None
        }
    }
}
