use thiserror::Error;

use super::audio_models::AudioTrackType;

/// Errors that can occur while recording, draining or encoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("device not available: {0}")]
    DeviceUnavailable(String),

    #[error("format mismatch: {0}")]
    FormatMismatch(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("start failed: {0}")]
    StartFailed(Box<CaptureError>),

    #[error("{track:?} buffer full: {requested} bytes requested, {free} bytes free")]
    BufferFull {
        track: AudioTrackType,
        requested: usize,
        free: usize,
    },

    #[error("stop failed: {}", join_faults(.0))]
    StopFailed(Vec<CaptureError>),

    #[error("encoding failed: {0}")]
    EncodeFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Wrap a start-time fault. Already-wrapped faults are returned as is.
    pub fn start_failed(cause: CaptureError) -> Self {
        match cause {
            Self::StartFailed(_) => cause,
            other => Self::StartFailed(Box::new(other)),
        }
    }
}

fn join_faults(faults: &[CaptureError]) -> String {
    faults.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}
