//! Owner task for a [`PlaybackReconciler`].
//!
//! The UI side only holds a [`ReconcilerHandle`] and sends [`Command`]s. One
//! task owns the reconciler and interleaves those commands with the poll
//! timer and with background completions (searches, artwork), so state is
//! only ever mutated from one place and polls never overlap.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::artwork::ArtworkFetcher;
use crate::config::UserConfig;
use crate::player::{PlaybackError, SearchError, Track};
use crate::reconciler::{PlaybackReconciler, PollOutcome, SearchTicket, SearchTracker, SHUTDOWN_GRACE};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Search(String),
    PlayIndex(usize),
    PlayTrack(Track),
    TogglePlayPause,
    Advance(i32),
    Seek(u64),
    SeekBy(i64),
    SetVolume(i32),
    /// A secondary video view covered the player.
    OverlayOpened,
    OverlayClosed,
    Shutdown,
}

enum Completion {
    Search {
        ticket: SearchTicket,
        result: Result<Vec<Track>, SearchError>,
    },
    Artwork {
        track_id: String,
        image: Option<Vec<u8>>,
    },
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub poll_interval: Duration,
    pub search_limit: usize,
    pub autoplay_search_results: bool,
    pub auto_advance: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            search_limit: 8,
            autoplay_search_results: true,
            auto_advance: true,
        }
    }
}

impl From<&UserConfig> for ServiceConfig {
    fn from(config: &UserConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(50)),
            search_limit: config.search_limit.max(1),
            autoplay_search_results: config.autoplay_search_results,
            auto_advance: config.auto_advance,
        }
    }
}

#[derive(Debug, Error)]
#[error("playback service has shut down")]
pub struct ServiceClosed;

/// Cheap, cloneable sender side. Safe to use from any UI callback.
#[derive(Clone)]
pub struct ReconcilerHandle {
    tx: mpsc::Sender<Command>,
}

impl ReconcilerHandle {
    pub async fn send(&self, command: Command) -> Result<(), ServiceClosed> {
        self.tx.send(command).await.map_err(|_| ServiceClosed)
    }

    pub async fn search(&self, query: impl Into<String>) -> Result<(), ServiceClosed> {
        self.send(Command::Search(query.into())).await
    }

    pub async fn play_index(&self, index: usize) -> Result<(), ServiceClosed> {
        self.send(Command::PlayIndex(index)).await
    }

    pub async fn toggle_play_pause(&self) -> Result<(), ServiceClosed> {
        self.send(Command::TogglePlayPause).await
    }

    pub async fn advance(&self, step: i32) -> Result<(), ServiceClosed> {
        self.send(Command::Advance(step)).await
    }

    pub async fn seek(&self, position_ms: u64) -> Result<(), ServiceClosed> {
        self.send(Command::Seek(position_ms)).await
    }

    pub async fn set_volume(&self, percent: i32) -> Result<(), ServiceClosed> {
        self.send(Command::SetVolume(percent)).await
    }

    pub async fn overlay_opened(&self) -> Result<(), ServiceClosed> {
        self.send(Command::OverlayOpened).await
    }

    pub async fn overlay_closed(&self) -> Result<(), ServiceClosed> {
        self.send(Command::OverlayClosed).await
    }
}

/// Join side of a spawned service.
pub struct ServiceTask {
    tx: mpsc::Sender<Command>,
    join: JoinHandle<PlaybackReconciler>,
}

impl ServiceTask {
    /// Stop polling, cancel outstanding work and hand back the reconciler.
    /// Gives up (and aborts the task) if teardown takes too long.
    pub async fn shutdown(self) -> Option<PlaybackReconciler> {
        let _ = self.tx.send(Command::Shutdown).await;
        let abort = self.join.abort_handle();
        match tokio::time::timeout(SHUTDOWN_GRACE * 2, self.join).await {
            Ok(Ok(reconciler)) => Some(reconciler),
            Ok(Err(e)) => {
                warn!(error = %e, "playback service task failed");
                None
            }
            Err(_) => {
                warn!("playback service did not stop in time, aborting");
                abort.abort();
                None
            }
        }
    }
}

pub struct ReconcilerService {
    reconciler: PlaybackReconciler,
    config: ServiceConfig,
    commands: mpsc::Receiver<Command>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    searches: SearchTracker,
    artwork: Option<ArtworkFetcher>,
    artwork_for: Option<String>,
    resume_after_overlay: bool,
}

impl ReconcilerService {
    pub fn spawn(
        reconciler: PlaybackReconciler,
        config: ServiceConfig,
        artwork: Option<ArtworkFetcher>,
    ) -> (ReconcilerHandle, ServiceTask) {
        let (tx, commands) = mpsc::channel(100);
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let service = Self {
            reconciler,
            config,
            commands,
            completions_tx,
            completions_rx,
            searches: SearchTracker::default(),
            artwork,
            artwork_for: None,
            resume_after_overlay: false,
        };
        let join = tokio::spawn(service.run());

        (ReconcilerHandle { tx: tx.clone() }, ServiceTask { tx, join })
    }

    async fn run(mut self) -> PlaybackReconciler {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        // A slow poll must not queue up a burst of catch-up ticks
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval = ?self.config.poll_interval, "playback service started");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(done) = self.completions_rx.recv() => self.handle_completion(done).await,
                _ = ticker.tick() => self.poll().await,
            }
            self.sync_artwork();
        }

        if let Some(artwork) = self.artwork.as_mut() {
            artwork.cancel();
        }
        self.reconciler.shutdown().await;
        info!("playback service stopped");
        self.reconciler
    }

    async fn handle_command(&mut self, command: Command) {
        let result = match command {
            Command::Search(query) => {
                self.start_search(query);
                Ok(())
            }
            Command::PlayIndex(index) => self.reconciler.play_index(index).await,
            Command::PlayTrack(track) => self.reconciler.play_track(track).await,
            Command::TogglePlayPause => self.reconciler.toggle_play_pause().await,
            Command::Advance(step) => self.reconciler.advance(step).await,
            Command::Seek(position_ms) => self.reconciler.seek(position_ms).await,
            Command::SeekBy(delta_ms) => self.reconciler.seek_by(delta_ms).await,
            Command::SetVolume(percent) => {
                self.reconciler.set_volume(percent).await;
                Ok(())
            }
            Command::OverlayOpened => {
                self.overlay_opened().await;
                Ok(())
            }
            Command::OverlayClosed => {
                self.overlay_closed().await;
                Ok(())
            }
            Command::Shutdown => Ok(()),
        };
        settle(result);
    }

    fn start_search(&mut self, query: String) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        let ticket = self.searches.begin(query);
        debug!(token = ticket.token, query = %ticket.query, "searching");

        let backend = self.reconciler.backend();
        let limit = self.config.search_limit;
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let query = ticket.query.clone();
            let result = tokio::task::spawn_blocking(move || backend.search(&query, limit))
                .await
                .unwrap_or_else(|e| Err(SearchError::Dispatch(e.to_string())));
            let _ = tx.send(Completion::Search { ticket, result });
        });
    }

    async fn handle_completion(&mut self, done: Completion) {
        match done {
            Completion::Search { ticket, result } => {
                if !self.searches.is_current(&ticket) {
                    debug!(token = ticket.token, query = %ticket.query, "discarding stale search results");
                    return;
                }
                match result {
                    Ok(tracks) => {
                        info!(query = %ticket.query, hits = tracks.len(), "search finished");
                        let first = tracks.first().cloned();
                        self.reconciler.load_queue(tracks);
                        if let (true, Some(first)) = (self.config.autoplay_search_results, first) {
                            settle(self.reconciler.play_track(first).await);
                        }
                    }
                    Err(e) => {
                        warn!(query = %ticket.query, error = %e, "search failed");
                        self.reconciler.sinks().error(&format!("Search failed: {e}"));
                    }
                }
            }
            Completion::Artwork { track_id, image } => {
                if self.artwork_for.as_deref() == Some(track_id.as_str()) {
                    self.reconciler
                        .sinks()
                        .artwork_loaded(&track_id, image.as_deref());
                }
            }
        }
    }

    async fn poll(&mut self) {
        let outcome = self.reconciler.poll_once().await;
        if outcome == PollOutcome::Finished && self.config.auto_advance {
            settle(self.reconciler.advance(1).await);
        }
    }

    async fn overlay_opened(&mut self) {
        self.resume_after_overlay = if self.reconciler.state().is_playing() {
            self.reconciler.pause().await
        } else {
            false
        };
    }

    async fn overlay_closed(&mut self) {
        if std::mem::take(&mut self.resume_after_overlay) {
            self.reconciler.resume().await;
        }
    }

    /// Kick off an artwork download whenever the current track changes.
    fn sync_artwork(&mut self) {
        let Some(artwork) = self.artwork.as_mut() else {
            return;
        };
        let current = self.reconciler.state().current_track();
        if current.map(|t| t.id.as_str()) == self.artwork_for.as_deref() {
            return;
        }
        self.artwork_for = current.map(|t| t.id.clone());

        match current {
            Some(track) => {
                let tx = self.completions_tx.clone();
                let track_id = track.id.clone();
                artwork.fetch(track, move |image| {
                    let _ = tx.send(Completion::Artwork { track_id, image });
                });
            }
            None => artwork.cancel(),
        }
    }
}

/// Playback failures were already logged and shown by the reconciler.
fn settle(result: Result<(), PlaybackError>) {
    if let Err(err) = result {
        debug!(%err, "command failed");
    }
}
