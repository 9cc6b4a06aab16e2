//! Error types for memovox
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use thiserror::Error;

/// Top-level error type for the memovox application
#[derive(Error, Debug)]
pub enum MemovoxError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Recording error: {0}")]
    Recording(#[from] RecordingError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a single capture strategy attempt.
///
/// These are recovered locally: the session controller falls through to the
/// next strategy in the chain when it sees one.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Audio device not found: '{0}'. List devices with: memovox devices")]
    DeviceNotFound(String),

    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Permission denied opening audio device: {0}")]
    PermissionDenied(String),

    #[error("Unsupported audio format: {0}")]
    FormatUnsupported(String),

    #[error("Audio stream error: {0}")]
    StreamError(String),

    #[error("ffmpeg not found in PATH. Install it via your package manager.")]
    FfmpegNotFound,

    #[error("Capture process failed: {0}")]
    ProcessFailed(String),

    #[error("Refusing unsafe output path: {0}")]
    InvalidOutputPath(String),
}

/// Terminal recording failures surfaced to the caller of `start()`.
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("A recording session is already active")]
    AlreadyRecording,

    #[error("All capture strategies failed. Check your microphone and audio server.")]
    AllStrategiesFailed,

    #[error("Placeholder synthesis failed: {0}")]
    SynthesisFailed(String),
}

/// Errors from checkpoint flushes and finalization.
///
/// A failed flush is logged and retried on the next interval; a failed
/// finalize rename triggers a direct save from the in-memory buffer.
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint write failed: {0}")]
    Write(String),

    #[error("Checkpoint rename failed ({from} -> {to}): {source}")]
    Rename {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using MemovoxError
pub type Result<T> = std::result::Result<T, MemovoxError>;

impl From<hound::Error> for CheckpointError {
    fn from(e: hound::Error) -> Self {
        CheckpointError::Write(e.to_string())
    }
}
