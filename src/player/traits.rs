use super::error::{PlaybackError, SearchError};
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Provider key (video id, MPD file path). Queue lookups and playback
    /// identity both go through this.
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    /// 0 until the backend resolves it
    pub duration_ms: u64,
    pub artwork_url: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<String>, name: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            artist: artist.into(),
            album: String::new(),
            duration_ms: 0,
            artwork_url: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_artwork(mut self, url: impl Into<String>) -> Self {
        self.artwork_url = Some(url.into());
        self
    }
}

/// Insertion order is search/playlist order. Duplicates are allowed, lookups
/// take the first match.
pub type Queue = Vec<Track>;

/// What the backend reported on one poll.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub track: Track,
    pub position_ms: u64,
    pub is_playing: bool,
    /// Stream duration as resolved by the backend, 0 if unknown.
    pub duration_ms: u64,
}

impl PlaybackSnapshot {
    pub fn new(track: Track, position_ms: u64, is_playing: bool) -> Self {
        Self {
            track,
            position_ms,
            is_playing,
            duration_ms: 0,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Duration reported by this snapshot, falling back to the track metadata.
    pub fn reported_duration_ms(&self) -> u64 {
        if self.duration_ms > 0 {
            self.duration_ms
        } else {
            self.track.duration_ms
        }
    }
}

/// Search + playback service the mini player drives 🎵
///
/// Calls may block on network or device I/O; the reconciler always invokes
/// them from a blocking worker, never from the owner task.
pub trait MusicBackend: Send + Sync {
    fn search(&self, query: &str, limit: usize) -> std::result::Result<Vec<Track>, SearchError>;
    fn play(&self, track: &Track) -> std::result::Result<(), PlaybackError>;
    fn seek(&self, position_ms: u64) -> std::result::Result<(), PlaybackError>;

    // Best-effort controls, failures are only logged
    fn pause(&self) -> Result<()>;
    fn resume(&self) -> Result<()>;
    fn stop(&self) -> Result<()>;
    fn set_volume(&self, percent: u8) -> Result<()>;

    /// `Ok(None)` means stopped / nothing loaded. `Err` means the backend
    /// could not be reached this cycle.
    fn current_snapshot(&self) -> Result<Option<PlaybackSnapshot>>;
}
