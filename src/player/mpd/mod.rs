use crate::player::error::{PlaybackError, SearchError};
use crate::player::traits::{MusicBackend, PlaybackSnapshot, Track};
use anyhow::{Context, Result};
use mpd::{Client, Song, State};
use std::sync::Mutex;
use std::time::Duration;

/// MPD-backed playback. Track ids are MPD file paths.
pub struct MpdBackend {
    host: String,
    port: u16,
    client: Mutex<Option<Client>>,
}

impl MpdBackend {
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            client: Mutex::new(None),
        }
    }

    /// Run `f` against a live connection, reconnecting if the old one dropped.
    fn with_client<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Client) -> Result<T>,
    {
        let mut client_guard = self
            .client
            .lock()
            .map_err(|_| anyhow::anyhow!("MPD client mutex poisoned"))?;

        let needs_connect = match client_guard.as_mut() {
            Some(client) => client.status().is_err(),
            None => true,
        };

        if needs_connect {
            let addr = format!("{}:{}", self.host, self.port);
            match Client::connect(&addr) {
                Ok(c) => {
                    tracing::info!(%addr, "connected to MPD");
                    *client_guard = Some(c);
                }
                Err(e) => {
                    *client_guard = None;
                    return Err(anyhow::anyhow!("Failed to connect to MPD at {}: {}", addr, e));
                }
            }
        }

        match client_guard.as_mut() {
            Some(client) => f(client),
            None => Err(anyhow::anyhow!("No MPD connection")),
        }
    }
}

impl Default for MpdBackend {
    fn default() -> Self {
        Self::new("localhost".to_string(), 6600)
    }
}

fn duration_to_ms(d: Duration) -> u64 {
    d.as_secs() * 1000 + d.subsec_millis() as u64
}

fn find_tag(tags: &[(String, String)], key: &str) -> Option<String> {
    tags.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.clone())
}

fn track_from_song(song: &Song) -> Track {
    let name = song
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| {
            song.file
                .rsplit('/')
                .next()
                .unwrap_or(&song.file)
                .to_string()
        });
    let artist = song
        .artist
        .clone()
        .or_else(|| find_tag(&song.tags, "Artist"))
        .or_else(|| find_tag(&song.tags, "AlbumArtist"))
        .unwrap_or_else(|| "Unknown Artist".to_string());

    Track {
        id: song.file.clone(),
        name,
        artist,
        album: find_tag(&song.tags, "Album").unwrap_or_default(),
        duration_ms: song.duration.map(duration_to_ms).unwrap_or(0),
        artwork_url: None,
    }
}

/// MPD stops at the end of every song only with `single` on and `repeat` off
/// (`single` plus `repeat` loops the song instead).
fn stops_after_each_song(repeat: bool, single: bool) -> bool {
    single && !repeat
}

/// Keep MPD from moving through its own playlist. The reconciler queue picks
/// the next track once MPD reports it has stopped.
fn stop_after_each_song(client: &mut Client) -> Result<()> {
    let status = client.status()?;
    if !stops_after_each_song(status.repeat, status.single) {
        client.repeat(false).context("Failed to turn off repeat")?;
        client.single(true).context("Failed to turn on single mode")?;
        tracing::debug!("MPD set to stop after each song");
    }
    Ok(())
}

fn song_matches(song: &Song, query_lower: &str) -> bool {
    song.file.to_lowercase().contains(query_lower)
        || song
            .title
            .as_ref()
            .map(|t| t.to_lowercase().contains(query_lower))
            .unwrap_or(false)
        || song
            .tags
            .iter()
            .any(|(_, v)| v.to_lowercase().contains(query_lower))
}

impl MusicBackend for MpdBackend {
    fn search(&self, query: &str, limit: usize) -> std::result::Result<Vec<Track>, SearchError> {
        let query_lower = query.to_lowercase();
        self.with_client(|client| {
            let songs = client.listall()?;
            Ok(songs
                .iter()
                .filter(|s| song_matches(s, &query_lower))
                .take(limit)
                .map(track_from_song)
                .collect())
        })
        .map_err(|e| SearchError::Network(e.to_string()))
    }

    fn play(&self, track: &Track) -> std::result::Result<(), PlaybackError> {
        self.with_client(|client| {
            stop_after_each_song(client)?;
            let queued = client
                .queue()?
                .iter()
                .find(|s| s.file == track.id)
                .and_then(|s| s.place.as_ref().map(|p| p.pos));

            match queued {
                Some(pos) => client.switch(pos).context("Failed to switch to track"),
                None => {
                    let song = Song {
                        file: track.id.clone(),
                        ..Default::default()
                    };
                    let id = client.push(&song).context("MPD refused the track")?;
                    client.switch(id).context("Failed to switch to track")
                }
            }
        })
        .map_err(|e| PlaybackError::StreamUnresolved(format!("{}: {}", track.id, e)))
    }

    fn seek(&self, position_ms: u64) -> std::result::Result<(), PlaybackError> {
        self.with_client(|client| {
            let place = client.status()?.song.context("No song playing")?;
            client
                .seek(place.pos, Duration::from_millis(position_ms))
                .context("Failed to seek")
        })
        .map_err(|e| PlaybackError::Backend(e.to_string()))
    }

    fn pause(&self) -> Result<()> {
        self.with_client(|client| client.pause(true).context("Failed to pause"))
    }

    fn resume(&self) -> Result<()> {
        self.with_client(|client| client.play().context("Failed to resume"))
    }

    fn stop(&self) -> Result<()> {
        self.with_client(|client| client.stop().context("Failed to stop"))
    }

    fn set_volume(&self, percent: u8) -> Result<()> {
        self.with_client(|client| {
            client
                .volume(percent.min(100) as i8)
                .context("Failed to set volume")
        })
    }

    fn current_snapshot(&self) -> Result<Option<PlaybackSnapshot>> {
        self.with_client(|client| {
            let status = client.status()?;
            if status.state == State::Stop {
                return Ok(None);
            }
            let Some(song) = client.currentsong()? else {
                return Ok(None);
            };

            let track = track_from_song(&song);
            let position_ms = status.elapsed.map(duration_to_ms).unwrap_or(0);
            let duration_ms = status.duration.map(duration_to_ms).unwrap_or(0);

            Ok(Some(
                PlaybackSnapshot::new(track, position_ms, status.state == State::Play)
                    .with_duration(duration_ms),
            ))
        })
    }
}
