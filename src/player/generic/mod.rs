use crate::player::error::{PlaybackError, SearchError};
use crate::player::traits::{MusicBackend, PlaybackSnapshot, Track};
use anyhow::Result;

/// Stand-in used when no real backend is compiled in. Searches come back
/// empty and playback reports a missing output device.
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl MusicBackend for UnavailableBackend {
    fn search(&self, query: &str, _limit: usize) -> std::result::Result<Vec<Track>, SearchError> {
        tracing::debug!(query, reason = %self.reason, "search on unavailable backend");
        Ok(Vec::new())
    }
    fn play(&self, _track: &Track) -> std::result::Result<(), PlaybackError> {
        Err(PlaybackError::NoAudioDevice)
    }
    fn seek(&self, _position_ms: u64) -> std::result::Result<(), PlaybackError> {
        Err(PlaybackError::NothingLoaded)
    }
    fn pause(&self) -> Result<()> {
        Ok(())
    }
    fn resume(&self) -> Result<()> {
        Ok(())
    }
    fn stop(&self) -> Result<()> {
        Ok(())
    }
    fn set_volume(&self, _percent: u8) -> Result<()> {
        Ok(())
    }
    fn current_snapshot(&self) -> Result<Option<PlaybackSnapshot>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_backend_refuses_playback() {
        let backend = UnavailableBackend::new("test");
        let track = Track::new("id", "Song", "Artist");

        assert_eq!(backend.play(&track), Err(PlaybackError::NoAudioDevice));
        assert!(backend.search("anything", 8).unwrap().is_empty());
        assert!(backend.current_snapshot().unwrap().is_none());
    }
}
