//! Single source of truth for "what is playing and where".
//!
//! The reconciler owns the queue/track/position model, pushes user actions to
//! the [`MusicBackend`] from blocking workers, and folds each polled
//! [`PlaybackSnapshot`] back into its state before fanning the result out to
//! every [`ViewSink`]. All mutation goes through `&mut self`, so whoever owns
//! the reconciler serializes it.

pub mod search;
pub mod sink;
pub mod state;

pub use search::{SearchTicket, SearchTracker};
pub use sink::{SinkList, ViewSink};
pub use state::{ReconcilerState, END_OF_TRACK_WINDOW_MS, SEEK_SYNC_TOLERANCE_MS};

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use crate::player::{MusicBackend, PlaybackError, PlaybackSnapshot, Queue, Track};

/// Upper bound on how long teardown waits for the backend to stop.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Backend reported nothing loaded (or could not be reached).
    Idle,
    /// The track that was playing ran to its end.
    Finished,
    Active,
}

pub struct PlaybackReconciler {
    backend: Arc<dyn MusicBackend>,
    sinks: SinkList,
    state: ReconcilerState,
}

impl PlaybackReconciler {
    pub fn new(backend: Arc<dyn MusicBackend>) -> Self {
        Self {
            backend,
            sinks: SinkList::default(),
            state: ReconcilerState::default(),
        }
    }

    pub fn subscribe(&mut self, sink: Arc<dyn ViewSink>) {
        self.sinks.push(sink);
    }

    pub fn state(&self) -> &ReconcilerState {
        &self.state
    }

    pub fn sinks(&self) -> &SinkList {
        &self.sinks
    }

    pub fn backend(&self) -> Arc<dyn MusicBackend> {
        Arc::clone(&self.backend)
    }

    /// Run a backend call on the blocking pool.
    async fn dispatch<T, F>(&self, f: F) -> Result<T, JoinError>
    where
        F: FnOnce(&dyn MusicBackend) -> T + Send + 'static,
        T: Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || f(backend.as_ref())).await
    }

    fn report(&self, context: &str, err: &PlaybackError) {
        error!(%err, "{}", context);
        self.sinks.error(&format!("{context}: {err}"));
    }

    fn set_playing(&mut self, playing: bool) {
        if let Some(last) = self.state.last_snapshot.as_mut() {
            last.is_playing = playing;
        }
        if self.state.playing != playing {
            self.state.playing = playing;
            self.sinks.playing_state_changed(playing);
        }
    }

    /// Replace the queue wholesale. Does not touch the current track or start
    /// playback.
    pub fn load_queue(&mut self, tracks: Queue) {
        debug!(len = tracks.len(), "queue replaced");
        self.state.queue = tracks;
        self.state.pending_seek = None;
        self.sinks.queue_replaced(&self.state.queue);
    }

    pub async fn play_track(&mut self, track: Track) -> Result<(), PlaybackError> {
        let request = track.clone();
        let result = self
            .dispatch(move |backend| backend.play(&request))
            .await
            .unwrap_or_else(|e| Err(PlaybackError::Dispatch(e.to_string())));

        if let Err(err) = result {
            self.report("Unable to play track", &err);
            return Err(err);
        }

        info!(id = %track.id, name = %track.name, "playback started");
        let duration_ms = track.duration_ms;
        self.state.pending_seek = None;
        self.state.duration_hint_ms = 0;
        self.state.display_position_ms = 0;
        // The old track's last position says nothing about the new one.
        self.state.last_snapshot = None;
        self.sinks.track_changed(&track);
        self.state.current_track = Some(track);
        self.sinks.position_changed(0, duration_ms);
        Ok(())
    }

    /// Play queue entry `index`. Re-selecting the current track is a no-op.
    pub async fn play_index(&mut self, index: usize) -> Result<(), PlaybackError> {
        let Some(track) = self.state.queue.get(index).cloned() else {
            debug!(index, len = self.state.queue.len(), "queue index out of range");
            return Ok(());
        };
        if self.state.current_track.as_ref().map(|c| c.id == track.id).unwrap_or(false) {
            return Ok(());
        }
        self.play_track(track).await
    }

    pub async fn toggle_play_pause(&mut self) -> Result<(), PlaybackError> {
        let playing = self
            .state
            .last_snapshot
            .as_ref()
            .map(|s| s.is_playing)
            .unwrap_or(false);

        if playing {
            self.user_control("Unable to pause", |backend| backend.pause())
                .await?;
            self.set_playing(false);
        } else if self.state.current_track.is_some() {
            self.user_control("Unable to resume", |backend| backend.resume())
                .await?;
            self.set_playing(true);
        } else if let Some(first) = self.state.queue.first().cloned() {
            return self.play_track(first).await;
        }
        Ok(())
    }

    async fn user_control<F>(&mut self, context: &str, f: F) -> Result<(), PlaybackError>
    where
        F: FnOnce(&dyn MusicBackend) -> anyhow::Result<()> + Send + 'static,
    {
        let result = match self.dispatch(f).await {
            Ok(r) => r.map_err(|e| PlaybackError::Backend(format!("{e:#}"))),
            Err(e) => Err(PlaybackError::Dispatch(e.to_string())),
        };
        if let Err(err) = &result {
            self.report(context, err);
        }
        result
    }

    /// Move `step` entries through the queue, wrapping at either end.
    pub async fn advance(&mut self, step: i32) -> Result<(), PlaybackError> {
        if step == 0 {
            return Ok(());
        }
        let Some(next) =
            state::step_index(self.state.current_index(), self.state.queue.len(), step)
        else {
            return Ok(());
        };
        let track = self.state.queue[next].clone();
        self.play_track(track).await
    }

    /// Optimistic seek: the target is shown immediately and held until a poll
    /// confirms it.
    pub async fn seek(&mut self, position_ms: u64) -> Result<(), PlaybackError> {
        if self.state.current_track.is_none() {
            debug!(position_ms, "seek ignored, nothing loaded");
            return Ok(());
        }

        let duration_ms = self.state.effective_duration_ms();
        let target = if duration_ms > 0 {
            position_ms.min(duration_ms)
        } else {
            position_ms
        };

        let previous_pending = self.state.pending_seek.replace(target);
        let previous_display = self.state.display_position_ms;
        self.state.display_position_ms = target;
        self.sinks.position_changed(target, duration_ms);

        let result = self
            .dispatch(move |backend| backend.seek(target))
            .await
            .unwrap_or_else(|e| Err(PlaybackError::Dispatch(e.to_string())));

        if let Err(err) = &result {
            self.state.pending_seek = previous_pending;
            self.state.display_position_ms = previous_display;
            self.report("Unable to seek", err);
        }
        result
    }

    /// Seek relative to the displayed position.
    pub async fn seek_by(&mut self, delta_ms: i64) -> Result<(), PlaybackError> {
        let target = self.state.display_position_ms.saturating_add_signed(delta_ms);
        self.seek(target).await
    }

    /// Best-effort. Failures are logged, never shown to the user.
    pub async fn set_volume(&self, percent: i32) {
        let level = percent.clamp(0, 100) as u8;
        match self.dispatch(move |backend| backend.set_volume(level)).await {
            Ok(Ok(())) => debug!(level, "volume set"),
            Ok(Err(e)) => debug!(level, error = %e, "setting volume failed"),
            Err(e) => warn!(level, error = %e, "volume task failed"),
        }
    }

    /// Best-effort pause. Returns whether the backend accepted it.
    pub async fn pause(&mut self) -> bool {
        match self.dispatch(|backend| backend.pause()).await {
            Ok(Ok(())) => {
                self.set_playing(false);
                true
            }
            Ok(Err(e)) => {
                debug!(error = %e, "pause failed");
                false
            }
            Err(e) => {
                warn!(error = %e, "pause task failed");
                false
            }
        }
    }

    /// Best-effort resume. Returns whether the backend accepted it.
    pub async fn resume(&mut self) -> bool {
        match self.dispatch(|backend| backend.resume()).await {
            Ok(Ok(())) => {
                self.set_playing(true);
                true
            }
            Ok(Err(e)) => {
                debug!(error = %e, "resume failed");
                false
            }
            Err(e) => {
                warn!(error = %e, "resume task failed");
                false
            }
        }
    }

    /// One reconciliation cycle. Never fails: an unreachable backend is the
    /// same as an idle one.
    pub async fn poll_once(&mut self) -> PollOutcome {
        let snapshot = match self.dispatch(|backend| backend.current_snapshot()).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                debug!(error = %e, "polling playback failed");
                None
            }
            Err(e) => {
                debug!(error = %e, "poll task failed");
                None
            }
        };

        match snapshot {
            Some(snapshot) => {
                self.apply_snapshot(snapshot);
                PollOutcome::Active
            }
            None => self.apply_idle(),
        }
    }

    fn apply_idle(&mut self) -> PollOutcome {
        let finished = self.state.was_near_end();
        self.state.last_snapshot = None;
        self.state.playing = false;
        self.state.display_position_ms = 0;

        self.sinks.idle();
        self.sinks.position_changed(0, self.state.effective_duration_ms());

        if finished {
            debug!("track reached its end");
            PollOutcome::Finished
        } else {
            PollOutcome::Idle
        }
    }

    fn apply_snapshot(&mut self, snapshot: PlaybackSnapshot) {
        let track_changed = self
            .state
            .current_track
            .as_ref()
            .map(|current| current.id != snapshot.track.id)
            .unwrap_or(true);

        if track_changed {
            debug!(id = %snapshot.track.id, "backend switched track");
            self.state.current_track = Some(snapshot.track.clone());
            self.state.duration_hint_ms = 0;
            self.sinks.track_changed(&snapshot.track);
        }

        self.state.backfill_duration(snapshot.reported_duration_ms());

        if snapshot.is_playing != self.state.playing {
            self.state.playing = snapshot.is_playing;
            self.sinks.playing_state_changed(snapshot.is_playing);
        }

        let display =
            state::resolve_display_position(&mut self.state.pending_seek, snapshot.position_ms);
        let duration_ms = self.state.effective_duration_ms();
        let shown = if duration_ms > 0 {
            display.min(duration_ms)
        } else {
            display
        };
        self.state.display_position_ms = shown;
        self.sinks.position_changed(shown, duration_ms);

        self.state.last_snapshot = Some(snapshot);
    }

    /// Ask the backend to stop, giving up after [`SHUTDOWN_GRACE`].
    pub async fn shutdown(&mut self) {
        match tokio::time::timeout(SHUTDOWN_GRACE, self.dispatch(|backend| backend.stop())).await {
            Ok(Ok(Ok(()))) => info!("backend stopped"),
            Ok(Ok(Err(e))) => debug!(error = %e, "stopping backend failed"),
            Ok(Err(e)) => warn!(error = %e, "stop task failed"),
            Err(_) => warn!(grace = ?SHUTDOWN_GRACE, "backend did not stop in time"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::SearchError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeBackend {
        snapshots: Mutex<VecDeque<anyhow::Result<Option<PlaybackSnapshot>>>>,
        play_error: Mutex<Option<PlaybackError>>,
        seek_error: Mutex<Option<PlaybackError>>,
        fail_controls: Mutex<bool>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn push_snapshot(&self, snapshot: Option<PlaybackSnapshot>) {
            self.snapshots.lock().unwrap().push_back(Ok(snapshot));
        }

        fn push_unreachable(&self) {
            self.snapshots
                .lock()
                .unwrap()
                .push_back(Err(anyhow::anyhow!("connection refused")));
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn control(&self, name: &str) -> anyhow::Result<()> {
            self.record(name.to_string());
            if *self.fail_controls.lock().unwrap() {
                anyhow::bail!("{name} rejected");
            }
            Ok(())
        }
    }

    impl MusicBackend for FakeBackend {
        fn search(&self, query: &str, _limit: usize) -> Result<Vec<Track>, SearchError> {
            self.record(format!("search:{query}"));
            Ok(Vec::new())
        }
        fn play(&self, track: &Track) -> Result<(), PlaybackError> {
            self.record(format!("play:{}", track.id));
            match self.play_error.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
        fn seek(&self, position_ms: u64) -> Result<(), PlaybackError> {
            self.record(format!("seek:{position_ms}"));
            match self.seek_error.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
        fn pause(&self) -> anyhow::Result<()> {
            self.control("pause")
        }
        fn resume(&self) -> anyhow::Result<()> {
            self.control("resume")
        }
        fn stop(&self) -> anyhow::Result<()> {
            self.control("stop")
        }
        fn set_volume(&self, percent: u8) -> anyhow::Result<()> {
            self.control(&format!("volume:{percent}"))
        }
        fn current_snapshot(&self) -> anyhow::Result<Option<PlaybackSnapshot>> {
            self.snapshots.lock().unwrap().pop_front().unwrap_or(Ok(None))
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Track(String),
        Position(u64, u64),
        Playing(bool),
        Queue(usize),
        Error(String),
        Idle,
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<Event>>,
    }

    impl RecordingSink {
        fn take(&self) -> Vec<Event> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }
    }

    impl ViewSink for RecordingSink {
        fn on_track_changed(&self, track: &Track) {
            self.events.lock().unwrap().push(Event::Track(track.id.clone()));
        }
        fn on_position_changed(&self, position_ms: u64, duration_ms: u64) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Position(position_ms, duration_ms));
        }
        fn on_playing_state_changed(&self, playing: bool) {
            self.events.lock().unwrap().push(Event::Playing(playing));
        }
        fn on_queue_replaced(&self, queue: &[Track]) {
            self.events.lock().unwrap().push(Event::Queue(queue.len()));
        }
        fn on_error(&self, message: &str) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Error(message.to_string()));
        }
        fn on_idle(&self) {
            self.events.lock().unwrap().push(Event::Idle);
        }
    }

    fn setup() -> (PlaybackReconciler, Arc<FakeBackend>, Arc<RecordingSink>) {
        let backend = Arc::new(FakeBackend::default());
        let sink = Arc::new(RecordingSink::default());
        let mut reconciler = PlaybackReconciler::new(backend.clone());
        reconciler.subscribe(sink.clone());
        (reconciler, backend, sink)
    }

    fn t1() -> Track {
        Track::new("1", "First", "Artist")
    }

    fn t2() -> Track {
        Track::new("2", "Second", "Artist").with_duration(200_000)
    }

    fn tracks(ids: &[&str]) -> Queue {
        ids.iter()
            .map(|id| Track::new(*id, format!("Song {id}"), "Artist").with_duration(180_000))
            .collect()
    }

    #[tokio::test]
    async fn test_play_then_poll_backfills_duration() {
        let (mut r, backend, sink) = setup();
        r.load_queue(vec![t1(), t2()]);
        r.play_track(t1()).await.unwrap();
        assert_eq!(
            sink.take(),
            vec![Event::Queue(2), Event::Track("1".into()), Event::Position(0, 0)]
        );

        backend.push_snapshot(Some(PlaybackSnapshot::new(t1(), 0, true)));
        assert_eq!(r.poll_once().await, PollOutcome::Active);
        assert_eq!(sink.take(), vec![Event::Playing(true), Event::Position(0, 0)]);

        backend.push_snapshot(Some(
            PlaybackSnapshot::new(t1(), 1_000, true).with_duration(210_000),
        ));
        r.poll_once().await;
        assert_eq!(sink.take(), vec![Event::Position(1_000, 210_000)]);
        assert_eq!(r.state().duration_hint_ms(), 210_000);
        assert_eq!(r.state().current_track().unwrap().duration_ms, 210_000);
    }

    #[tokio::test]
    async fn test_seek_holds_until_backend_confirms() {
        let (mut r, backend, sink) = setup();
        r.play_track(t1()).await.unwrap();
        backend.push_snapshot(Some(PlaybackSnapshot::new(t1(), 10_000, true)));
        r.poll_once().await;
        sink.take();

        r.seek(50_000).await.unwrap();
        assert_eq!(r.state().pending_seek(), Some(50_000));
        assert_eq!(sink.take(), vec![Event::Position(50_000, 0)]);

        backend.push_snapshot(Some(PlaybackSnapshot::new(t1(), 10_500, true)));
        r.poll_once().await;
        assert_eq!(r.state().display_position_ms(), 50_000);
        assert_eq!(r.state().pending_seek(), Some(50_000));

        backend.push_snapshot(Some(PlaybackSnapshot::new(t1(), 49_200, true)));
        r.poll_once().await;
        assert_eq!(r.state().pending_seek(), None);
        assert_eq!(r.state().display_position_ms(), 49_200);

        backend.push_snapshot(Some(PlaybackSnapshot::new(t1(), 51_000, true)));
        r.poll_once().await;
        assert_eq!(r.state().display_position_ms(), 51_000);
        assert!(backend.calls().contains(&"seek:50000".to_string()));
    }

    #[tokio::test]
    async fn test_seek_clamps_to_known_duration() {
        let (mut r, backend, _sink) = setup();
        r.play_track(t2()).await.unwrap();

        r.seek(900_000).await.unwrap();

        assert_eq!(r.state().pending_seek(), Some(200_000));
        assert!(backend.calls().contains(&"seek:200000".to_string()));
    }

    #[tokio::test]
    async fn test_seek_with_nothing_loaded_is_noop() {
        let (mut r, backend, sink) = setup();

        r.seek(5_000).await.unwrap();

        assert!(r.state().pending_seek().is_none());
        assert!(backend.calls().is_empty());
        assert!(sink.take().is_empty());
    }

    #[tokio::test]
    async fn test_failed_seek_restores_pending() {
        let (mut r, backend, sink) = setup();
        r.play_track(t2()).await.unwrap();
        sink.take();
        *backend.seek_error.lock().unwrap() = Some(PlaybackError::Backend("rejected".into()));

        let err = r.seek(30_000).await.unwrap_err();

        assert_eq!(err, PlaybackError::Backend("rejected".into()));
        assert_eq!(r.state().pending_seek(), None);
        assert_eq!(r.state().display_position_ms(), 0);
        assert!(matches!(sink.take().last(), Some(Event::Error(_))));
    }

    #[tokio::test]
    async fn test_seek_by_is_relative_to_display() {
        let (mut r, backend, _sink) = setup();
        r.play_track(t2()).await.unwrap();
        backend.push_snapshot(Some(PlaybackSnapshot::new(t2(), 60_000, true)));
        r.poll_once().await;

        r.seek_by(10_000).await.unwrap();
        assert_eq!(r.state().pending_seek(), Some(70_000));

        r.seek_by(-100_000).await.unwrap();
        assert_eq!(r.state().pending_seek(), Some(0));
    }

    #[tokio::test]
    async fn test_advance_wraps_both_ways() {
        let (mut r, backend, _sink) = setup();
        r.load_queue(tracks(&["a", "b", "c"]));
        r.play_index(2).await.unwrap();

        r.advance(1).await.unwrap();
        assert_eq!(r.state().current_track().unwrap().id, "a");

        r.advance(-1).await.unwrap();
        assert_eq!(r.state().current_track().unwrap().id, "c");

        r.advance(-1).await.unwrap();
        assert_eq!(r.state().current_track().unwrap().id, "b");
        assert_eq!(
            backend.calls(),
            vec!["play:c", "play:a", "play:c", "play:b"]
        );
    }

    #[tokio::test]
    async fn test_advance_without_current_picks_an_end() {
        let (mut r, _backend, _sink) = setup();
        r.load_queue(tracks(&["a", "b", "c"]));
        r.advance(-1).await.unwrap();
        assert_eq!(r.state().current_track().unwrap().id, "c");

        let (mut r, _backend, _sink) = setup();
        r.load_queue(tracks(&["a", "b", "c"]));
        r.advance(1).await.unwrap();
        assert_eq!(r.state().current_track().unwrap().id, "a");
    }

    #[tokio::test]
    async fn test_advance_on_empty_queue_is_noop() {
        let (mut r, backend, sink) = setup();

        r.advance(1).await.unwrap();
        r.advance(-1).await.unwrap();

        assert!(backend.calls().is_empty());
        assert!(sink.take().is_empty());
        assert!(r.state().current_track().is_none());
    }

    #[tokio::test]
    async fn test_failed_play_leaves_state_untouched() {
        let (mut r, backend, sink) = setup();
        r.play_track(t1()).await.unwrap();
        sink.take();
        *backend.play_error.lock().unwrap() = Some(PlaybackError::NoAudioDevice);

        let err = r.play_track(t2()).await.unwrap_err();

        assert_eq!(err, PlaybackError::NoAudioDevice);
        assert_eq!(r.state().current_track().unwrap().id, "1");
        assert_eq!(
            sink.take(),
            vec![Event::Error(
                "Unable to play track: no audio output device detected".into()
            )]
        );
    }

    #[tokio::test]
    async fn test_repeated_idle_polls_keep_current_track() {
        let (mut r, _backend, sink) = setup();
        r.play_track(t1()).await.unwrap();
        sink.take();

        for _ in 0..3 {
            assert_eq!(r.poll_once().await, PollOutcome::Idle);
            assert_eq!(sink.take(), vec![Event::Idle, Event::Position(0, 0)]);
        }
        assert_eq!(r.state().current_track().unwrap().id, "1");
    }

    #[tokio::test]
    async fn test_unreachable_backend_counts_as_idle() {
        let (mut r, backend, sink) = setup();
        backend.push_unreachable();

        assert_eq!(r.poll_once().await, PollOutcome::Idle);
        assert!(!sink.take().iter().any(|e| matches!(e, Event::Error(_))));

        backend.push_snapshot(Some(PlaybackSnapshot::new(t1(), 500, true)));
        assert_eq!(r.poll_once().await, PollOutcome::Active);
    }

    #[tokio::test]
    async fn test_backfilled_duration_survives_zero_reports() {
        let (mut r, backend, _sink) = setup();
        r.play_track(t1()).await.unwrap();

        backend.push_snapshot(Some(
            PlaybackSnapshot::new(t1(), 1_000, true).with_duration(180_000),
        ));
        backend.push_snapshot(Some(PlaybackSnapshot::new(t1(), 2_000, true)));
        r.poll_once().await;
        r.poll_once().await;

        assert_eq!(r.state().current_track().unwrap().duration_ms, 180_000);
        assert_eq!(r.state().effective_duration_ms(), 180_000);
    }

    #[tokio::test]
    async fn test_poll_adopts_backend_track() {
        let (mut r, backend, sink) = setup();
        r.play_track(t1()).await.unwrap();
        sink.take();

        backend.push_snapshot(Some(PlaybackSnapshot::new(t2(), 3_000, false)));
        r.poll_once().await;

        assert_eq!(r.state().current_track().unwrap().id, "2");
        assert_eq!(
            sink.take(),
            vec![Event::Track("2".into()), Event::Position(3_000, 200_000)]
        );
    }

    #[tokio::test]
    async fn test_track_running_out_is_reported_finished() {
        let (mut r, backend, _sink) = setup();
        r.play_track(t2()).await.unwrap();
        backend.push_snapshot(Some(PlaybackSnapshot::new(t2(), 199_000, true)));
        r.poll_once().await;

        assert_eq!(r.poll_once().await, PollOutcome::Finished);
        assert_eq!(r.poll_once().await, PollOutcome::Idle);
    }

    #[tokio::test]
    async fn test_switching_tracks_mid_song_is_not_a_finish() {
        let (mut r, backend, _sink) = setup();
        let long = Track::new("long", "Long", "Artist").with_duration(200_000);
        let short = Track::new("short", "Short", "Artist").with_duration(120_000);
        r.load_queue(vec![long.clone(), short, t1()]);

        r.play_track(long.clone()).await.unwrap();
        backend.push_snapshot(Some(PlaybackSnapshot::new(long, 150_000, true)));
        r.poll_once().await;

        r.advance(1).await.unwrap();
        assert_eq!(r.state().current_track().unwrap().id, "short");
        assert!(r.state().last_snapshot().is_none());

        // Backend still buffering the new track
        assert_eq!(r.poll_once().await, PollOutcome::Idle);
        assert_eq!(r.state().current_track().unwrap().id, "short");
    }

    #[tokio::test]
    async fn test_control_failures_name_the_action() {
        let (mut r, backend, sink) = setup();
        r.play_track(t2()).await.unwrap();
        backend.push_snapshot(Some(PlaybackSnapshot::new(t2(), 1_000, true)));
        r.poll_once().await;
        sink.take();
        *backend.fail_controls.lock().unwrap() = true;

        assert!(r.toggle_play_pause().await.is_err());
        assert_eq!(
            sink.take(),
            vec![Event::Error("Unable to pause: pause rejected".into())]
        );

        *backend.fail_controls.lock().unwrap() = false;
        r.toggle_play_pause().await.unwrap();
        *backend.fail_controls.lock().unwrap() = true;
        sink.take();

        assert!(r.toggle_play_pause().await.is_err());
        assert_eq!(
            sink.take(),
            vec![Event::Error("Unable to resume: resume rejected".into())]
        );
    }

    #[tokio::test]
    async fn test_toggle_dispatches_on_last_snapshot() {
        let (mut r, backend, sink) = setup();

        r.toggle_play_pause().await.unwrap();
        assert!(backend.calls().is_empty());

        r.load_queue(tracks(&["a", "b"]));
        r.toggle_play_pause().await.unwrap();
        assert_eq!(r.state().current_track().unwrap().id, "a");

        backend.push_snapshot(Some(PlaybackSnapshot::new(tracks(&["a"])[0].clone(), 0, true)));
        r.poll_once().await;
        sink.take();

        r.toggle_play_pause().await.unwrap();
        assert_eq!(sink.take(), vec![Event::Playing(false)]);

        r.toggle_play_pause().await.unwrap();
        assert_eq!(sink.take(), vec![Event::Playing(true)]);
        assert_eq!(backend.calls(), vec!["play:a", "pause", "resume"]);
    }

    #[tokio::test]
    async fn test_toggle_failure_is_surfaced() {
        let (mut r, backend, sink) = setup();
        r.play_track(t1()).await.unwrap();
        sink.take();
        *backend.fail_controls.lock().unwrap() = true;

        assert!(matches!(
            r.toggle_play_pause().await,
            Err(PlaybackError::Backend(_))
        ));
        assert!(matches!(sink.take().as_slice(), [Event::Error(_)]));
        assert!(!r.state().is_playing());
    }

    #[tokio::test]
    async fn test_volume_is_clamped_and_failures_swallowed() {
        let (r, backend, sink) = setup();
        r.set_volume(150).await;
        r.set_volume(-5).await;
        *backend.fail_controls.lock().unwrap() = true;
        r.set_volume(40).await;

        assert_eq!(backend.calls(), vec!["volume:100", "volume:0", "volume:40"]);
        assert!(sink.take().is_empty());
    }

    #[tokio::test]
    async fn test_load_queue_clears_pending_seek() {
        let (mut r, _backend, sink) = setup();
        r.play_track(t2()).await.unwrap();
        r.seek(20_000).await.unwrap();
        sink.take();

        r.load_queue(tracks(&["x"]));

        assert!(r.state().pending_seek().is_none());
        assert_eq!(r.state().current_track().unwrap().id, "2");
        assert_eq!(sink.take(), vec![Event::Queue(1)]);
    }

    #[tokio::test]
    async fn test_all_sinks_see_same_sequence() {
        let (mut r, backend, first) = setup();
        let second = Arc::new(RecordingSink::default());
        r.subscribe(second.clone());

        r.play_track(t1()).await.unwrap();
        backend.push_snapshot(Some(PlaybackSnapshot::new(t1(), 700, true)));
        r.poll_once().await;
        r.poll_once().await;

        assert_eq!(first.take(), second.take());
    }
}
