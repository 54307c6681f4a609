use clap::Parser;

/// Puddle - the car dashboard mini player, headless 🎵
#[derive(Parser, Debug)]
#[command(name = "puddle", version, about)]
pub struct Args {
    /// MPD host (overrides config.toml)
    #[arg(long)]
    pub mpd_host: Option<String>,

    /// MPD port (overrides config.toml)
    #[arg(long)]
    pub mpd_port: Option<u16>,

    /// Search for this as soon as the player starts
    #[arg(long, short = 'q')]
    pub query: Option<String>,

    /// Backend poll interval in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Generate default config.toml to stdout
    #[arg(long)]
    pub generate_config: bool,
}

impl Args {
    /// Fold command-line overrides into the loaded config.
    pub fn apply(&self, config: &mut crate::config::UserConfig) {
        if let Some(host) = &self.mpd_host {
            config.mpd_host = host.clone();
        }
        if let Some(port) = self.mpd_port {
            config.mpd_port = port;
        }
        if let Some(interval) = self.poll_interval_ms {
            config.poll_interval_ms = interval;
        }
    }
}
