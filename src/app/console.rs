use std::io::Write;
use std::sync::Mutex;

use crate::player::Track;
use crate::reconciler::ViewSink;
use crate::utils::{format_time, remaining_ms};

#[derive(Default)]
struct Screen {
    playing: bool,
    // The progress line is redrawn in place; anything else starts a fresh line.
    progress_shown: bool,
}

/// Plain-terminal rendering of the mini player.
#[derive(Default)]
pub struct ConsoleSink {
    screen: Mutex<Screen>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn line(&self, text: &str) {
        let mut screen = self.screen.lock().unwrap_or_else(|e| e.into_inner());
        let mut out = std::io::stdout().lock();
        if std::mem::take(&mut screen.progress_shown) {
            let _ = writeln!(out);
        }
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
    }
}

pub fn progress_line(position_ms: u64, duration_ms: u64, playing: bool) -> String {
    let icon = if playing { "▶" } else { "⏸" };
    if duration_ms == 0 {
        return format!("{icon} {}", format_time(position_ms));
    }
    format!(
        "{icon} {} / {}  (-{})",
        format_time(position_ms),
        format_time(duration_ms),
        format_time(remaining_ms(position_ms, duration_ms)),
    )
}

pub fn queue_lines(queue: &[Track]) -> Vec<String> {
    queue
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let length = if t.duration_ms > 0 {
                format!("  [{}]", format_time(t.duration_ms))
            } else {
                String::new()
            };
            format!("{:>3}. {} - {}{}", i + 1, t.artist, t.name, length)
        })
        .collect()
}

impl ViewSink for ConsoleSink {
    fn on_track_changed(&self, track: &Track) {
        let album = if track.album.is_empty() {
            String::new()
        } else {
            format!(" ({})", track.album)
        };
        self.line(&format!("♪ {} - {}{}", track.artist, track.name, album));
    }

    fn on_position_changed(&self, position_ms: u64, duration_ms: u64) {
        let mut screen = self.screen.lock().unwrap_or_else(|e| e.into_inner());
        let mut out = std::io::stdout().lock();
        let _ = write!(
            out,
            "\r\x1b[2K{}",
            progress_line(position_ms, duration_ms, screen.playing)
        );
        let _ = out.flush();
        screen.progress_shown = true;
    }

    fn on_playing_state_changed(&self, playing: bool) {
        self.screen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .playing = playing;
    }

    fn on_queue_replaced(&self, queue: &[Track]) {
        if queue.is_empty() {
            self.line("No results.");
            return;
        }
        self.line(&queue_lines(queue).join("\n"));
    }

    fn on_error(&self, message: &str) {
        self.line(&format!("⚠ {message}"));
    }

    fn on_idle(&self) {
        self.screen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .playing = false;
    }

    fn on_artwork_loaded(&self, _track_id: &str, image: Option<&[u8]>) {
        if let Some(bytes) = image {
            tracing::debug!(size = bytes.len(), "artwork ready");
        }
    }
}
