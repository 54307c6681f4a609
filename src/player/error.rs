use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("search task failed: {0}")]
    Dispatch(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("no audio output device detected")]
    NoAudioDevice,
    #[error("unable to resolve an audio stream for {0}")]
    StreamUnresolved(String),
    #[error("authentication required: {0}")]
    AuthRequired(String),
    #[error("nothing is loaded")]
    NothingLoaded,
    #[error("{0}")]
    Backend(String),
    #[error("playback task failed: {0}")]
    Dispatch(String),
}
