use anyhow::Result;
use reqwest::Client;
use tokio::task::JoinHandle;

use crate::player::Track;

/// Downloads cover art for the current track. Only one download is ever in
/// flight; starting a new one aborts the previous request.
pub struct ArtworkFetcher {
    client: Client,
    in_flight: Option<JoinHandle<()>>,
}

impl ArtworkFetcher {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            in_flight: None,
        }
    }

    pub async fn fetch_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
        let response = client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Start fetching art for `track`. `deliver` gets the image bytes, or
    /// `None` when the track has no remote art or the download failed. It is
    /// never called for a fetch that was cancelled.
    pub fn fetch<F>(&mut self, track: &Track, deliver: F)
    where
        F: FnOnce(Option<Vec<u8>>) + Send + 'static,
    {
        self.cancel();

        let Some(url) = track.artwork_url.clone().filter(|u| is_remote(u)) else {
            deliver(None);
            return;
        };

        let client = self.client.clone();
        let track_id = track.id.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let image = match Self::fetch_bytes(&client, &url).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    tracing::debug!(track = %track_id, error = %e, "album art download failed");
                    None
                }
            };
            deliver(image);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

impl Drop for ArtworkFetcher {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
