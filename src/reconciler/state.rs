use crate::player::{PlaybackSnapshot, Queue, Track};

/// A backend position within this distance of a pending seek target counts
/// as the seek having landed.
pub const SEEK_SYNC_TOLERANCE_MS: u64 = 2_000;

/// A playing track that vanishes this close to its end has finished.
pub const END_OF_TRACK_WINDOW_MS: u64 = 2_000;

/// Everything the reconciler believes about playback. Only the reconciler
/// mutates it; views get copies through notifications.
#[derive(Debug, Default, Clone)]
pub struct ReconcilerState {
    pub(crate) current_track: Option<Track>,
    pub(crate) queue: Queue,
    pub(crate) pending_seek: Option<u64>,
    pub(crate) last_snapshot: Option<PlaybackSnapshot>,
    pub(crate) duration_hint_ms: u64,
    pub(crate) display_position_ms: u64,
    pub(crate) playing: bool,
}

impl ReconcilerState {
    pub fn current_track(&self) -> Option<&Track> {
        self.current_track.as_ref()
    }

    pub fn queue(&self) -> &[Track] {
        &self.queue
    }

    pub fn pending_seek(&self) -> Option<u64> {
        self.pending_seek
    }

    pub fn last_snapshot(&self) -> Option<&PlaybackSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn duration_hint_ms(&self) -> u64 {
        self.duration_hint_ms
    }

    pub fn display_position_ms(&self) -> u64 {
        self.display_position_ms
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Stored track duration, or the late-arriving hint while it is unknown.
    pub fn effective_duration_ms(&self) -> u64 {
        match self.current_track.as_ref() {
            Some(track) if track.duration_ms > 0 => track.duration_ms,
            _ => self.duration_hint_ms,
        }
    }

    pub fn current_index(&self) -> Option<usize> {
        let current = self.current_track.as_ref()?;
        queue_index_of(&self.queue, &current.id)
    }

    /// Fill in a duration the track did not know about yet. A zero report
    /// never erases a known duration.
    pub(crate) fn backfill_duration(&mut self, reported_ms: u64) {
        if reported_ms == 0 {
            return;
        }
        if let Some(track) = self.current_track.as_mut() {
            if track.duration_ms == 0 {
                track.duration_ms = reported_ms;
                self.duration_hint_ms = reported_ms;
            }
        }
    }

    /// True when the last poll saw the current track playing right up to its end.
    pub(crate) fn was_near_end(&self) -> bool {
        let duration = self.effective_duration_ms();
        let current_id = self.current_track.as_ref().map(|t| t.id.as_str());
        match self.last_snapshot.as_ref() {
            Some(last)
                if last.is_playing
                    && duration > 0
                    && current_id == Some(last.track.id.as_str()) =>
            {
                last.position_ms + END_OF_TRACK_WINDOW_MS >= duration
            }
            _ => false,
        }
    }
}

/// First queue entry carrying `id`.
pub fn queue_index_of(queue: &[Track], id: &str) -> Option<usize> {
    queue.iter().position(|t| t.id == id)
}

/// Index `step` entries away from `current`, wrapping both ways. Without a
/// current entry a forward step starts at the head, a backward one at the tail.
pub fn step_index(current: Option<usize>, len: usize, step: i32) -> Option<usize> {
    if len == 0 {
        return None;
    }
    match current {
        None if step >= 0 => Some(0),
        None => Some(len - 1),
        Some(i) => Some((i as i64 + step as i64).rem_euclid(len as i64) as usize),
    }
}

/// Position to show for a backend report, honoring an unconfirmed seek.
/// Clears `pending` once the backend lands within tolerance.
pub fn resolve_display_position(pending: &mut Option<u64>, reported_ms: u64) -> u64 {
    match *pending {
        Some(target) if reported_ms.abs_diff(target) <= SEEK_SYNC_TOLERANCE_MS => {
            *pending = None;
            reported_ms
        }
        Some(target) => target,
        None => reported_ms,
    }
}
