use thiserror::Error;

/// Trail recording error types
///
/// The fix filter itself never fails; these cover the surfaces around it
/// (path queries, session lifecycle, configuration and export files).
#[derive(Error, Debug)]
pub enum TrailError {
    #[error("Trail is empty")]
    EmptyTrail,

    #[error("Target index {target} out of range for trail of {len} points")]
    TargetOutOfRange { target: usize, len: usize },

    #[error("Session already recording")]
    AlreadyRecording,

    #[error("Session not recording")]
    NotRecording,

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown checkpoint: {0}")]
    UnknownCheckpoint(u64),

    #[error("Unsupported export version: {0}")]
    UnsupportedVersion(u32),

    #[error("Tracker task is no longer running")]
    TrackerClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for trail operations
pub type TrailResult<T> = Result<T, TrailError>;

impl TrailError {
    /// True for errors caused by the caller passing bad arguments, as opposed
    /// to a data or lifecycle condition. An empty trail counts: every target
    /// index is out of range for it.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            TrailError::EmptyTrail
                | TrailError::TargetOutOfRange { .. }
                | TrailError::InvalidConfig(_)
        )
    }
}
