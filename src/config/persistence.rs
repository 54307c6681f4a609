use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Automatically saved session state
/// stored in `state.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistentState {
    #[serde(default = "default_volume")]
    pub volume: u8,
    #[serde(default)]
    pub last_query: Option<String>,
}

fn default_volume() -> u8 {
    75
}

impl Default for PersistentState {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            last_query: None,
        }
    }
}

impl PersistentState {
    pub fn save(&self) -> Result<()> {
        self.save_to(&super::AppConfig::get_state_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize state")?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
    }
}
