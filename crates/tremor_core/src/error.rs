//! Core Error Types

use thiserror::Error;

/// Errors from configuration, capture and the ingest engine
///
/// Message processing itself has no error path; these surface at setup
/// time or from collaborators (file system, channels).
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Could not determine a platform directory for {0}")]
    NoPlatformDirectory(&'static str),

    #[error("DSP error: {0}")]
    DspError(#[from] tremor_dsp::DspError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to spawn ingest thread: {0}")]
    SpawnError(String),

    #[error("Engine already shut down")]
    EngineStopped,

    #[error("Channel send error - receiver dropped")]
    ChannelSendError,

    #[error("Channel receive error - sender dropped")]
    ChannelRecvError,
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
