use std::sync::Arc;

use crate::player::Track;

/// A surface that renders playback (mini view, expanded view, queue list...).
///
/// Every registered sink sees the same notifications in the same order.
pub trait ViewSink: Send + Sync {
    fn on_track_changed(&self, track: &Track);
    fn on_position_changed(&self, position_ms: u64, duration_ms: u64);
    fn on_playing_state_changed(&self, playing: bool);
    fn on_queue_replaced(&self, queue: &[Track]);
    /// User-facing failure of a playback action.
    fn on_error(&self, message: &str);

    /// Backend reported nothing loaded.
    fn on_idle(&self) {}

    /// Artwork for `track_id` finished downloading. `None` means fall back to
    /// the default art.
    fn on_artwork_loaded(&self, _track_id: &str, _image: Option<&[u8]>) {}
}

/// Ordered fan-out over the registered sinks.
#[derive(Default, Clone)]
pub struct SinkList {
    sinks: Vec<Arc<dyn ViewSink>>,
}

impl SinkList {
    pub fn push(&mut self, sink: Arc<dyn ViewSink>) {
        self.sinks.push(sink);
    }

    pub fn track_changed(&self, track: &Track) {
        for sink in &self.sinks {
            sink.on_track_changed(track);
        }
    }

    pub fn position_changed(&self, position_ms: u64, duration_ms: u64) {
        for sink in &self.sinks {
            sink.on_position_changed(position_ms, duration_ms);
        }
    }

    pub fn playing_state_changed(&self, playing: bool) {
        for sink in &self.sinks {
            sink.on_playing_state_changed(playing);
        }
    }

    pub fn queue_replaced(&self, queue: &[Track]) {
        for sink in &self.sinks {
            sink.on_queue_replaced(queue);
        }
    }

    pub fn error(&self, message: &str) {
        for sink in &self.sinks {
            sink.on_error(message);
        }
    }

    pub fn idle(&self) {
        for sink in &self.sinks {
            sink.on_idle();
        }
    }

    pub fn artwork_loaded(&self, track_id: &str, image: Option<&[u8]>) {
        for sink in &self.sinks {
            sink.on_artwork_loaded(track_id, image);
        }
    }
}
