/// Result alias that carries the [`SceneError`] type.
pub type Result<T> = std::result::Result<T, SceneError>;

/// Errors raised while parsing externally supplied data (playlists, config,
/// saved preferences).
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("playlist has no tracks")]
    EmptyPlaylist,
    #[error("unknown track `{0}`")]
    UnknownTrack(String),
}

/// Failures reported by the audio platform. None of these are fatal: the
/// graph degrades to silence and waits for the next user gesture.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AudioError {
    /// The platform refused audible playback without a prior user gesture.
    #[error("playback blocked by autoplay policy: {0}")]
    AutoplayBlocked(String),
    /// The audio context could not leave the suspended state.
    #[error("audio context resume rejected: {0}")]
    ResumeRejected(String),
    /// No audio output exists on this platform (no context, no media element).
    #[error("audio unavailable: {0}")]
    Unavailable(String),
    #[error("audio operation failed: {0}")]
    Failed(String),
}

impl AudioError {
    pub fn is_autoplay_blocked(&self) -> bool {
        matches!(self, AudioError::AutoplayBlocked(_))
    }
}
