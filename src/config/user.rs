use serde::{Deserialize, Serialize};

/// User-editable configuration, stored in `config.toml`. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_mpd_host")]
    pub mpd_host: String,
    #[serde(default = "default_mpd_port")]
    pub mpd_port: u16,
    /// How often the backend is asked for a snapshot
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    /// Start the first hit as soon as a search finishes
    #[serde(default = "default_true")]
    pub autoplay_search_results: bool,
    /// Move to the next queue entry when a track runs out
    #[serde(default = "default_true")]
    pub auto_advance: bool,
    /// Tracing filter used unless `RUST_LOG` is set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_mpd_host() -> String {
    "localhost".to_string()
}

fn default_mpd_port() -> u16 {
    6600
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_search_limit() -> usize {
    8
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            mpd_host: default_mpd_host(),
            mpd_port: default_mpd_port(),
            poll_interval_ms: default_poll_interval_ms(),
            search_limit: default_search_limit(),
            autoplay_search_results: true,
            auto_advance: true,
            log_level: default_log_level(),
        }
    }
}
