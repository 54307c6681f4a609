pub mod error;
pub mod generic;
#[cfg(feature = "mpd")]
pub mod mpd;
pub mod traits;

use std::sync::Arc;

use crate::config::UserConfig;

pub use error::{PlaybackError, SearchError};
pub use generic::UnavailableBackend;
#[cfg(feature = "mpd")]
pub use mpd::MpdBackend;
pub use traits::{MusicBackend, PlaybackSnapshot, Queue, Track};

/// Factory for the backend this build supports
pub fn get_backend(config: &UserConfig) -> Arc<dyn MusicBackend> {
    #[cfg(feature = "mpd")]
    {
        Arc::new(MpdBackend::new(config.mpd_host.clone(), config.mpd_port))
    }
    #[cfg(not(feature = "mpd"))]
    {
        let _ = config;
        Arc::new(UnavailableBackend::new("built without a playback backend"))
    }
}
