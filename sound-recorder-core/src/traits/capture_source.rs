use std::sync::Arc;

use crate::models::audio_models::AudioSource;
use crate::models::error::CaptureError;
use crate::models::wave_format::WaveFormat;

/// Callback invoked with each captured chunk, in the source's [`WaveFormat`].
///
/// Chunks always hold whole blocks. Chunk size and cadence are decided by the
/// device, not by the caller.
pub type ChunkCallback = Arc<dyn Fn(&[u8]) + Send + Sync + 'static>;

/// A hardware capture device: system loopback or microphone.
///
/// Both variants share this contract; the session never needs to know which
/// one it is talking to beyond the track it routes the chunks to.
pub trait CaptureSource: Send {
    /// The negotiated (or forced) format of delivered chunks.
    fn format(&self) -> WaveFormat;

    /// Start delivering chunks to `callback` on a dedicated delivery thread.
    ///
    /// Device initialization completes before this returns, so
    /// `DeviceUnavailable` and `FormatMismatch` are reported here rather than
    /// on the delivery thread.
    fn start(&mut self, callback: ChunkCallback) -> Result<(), CaptureError>;

    /// Stop delivering chunks. A no-op when not running.
    fn stop(&mut self) -> Result<(), CaptureError>;

    fn is_running(&self) -> bool;

    /// Information about the device backing this source.
    fn device_info(&self) -> AudioSource;
}

/// Constructs the per-session capture sources.
///
/// A fresh pair is opened for every recording and released when it stops.
pub trait CaptureBackend: Send + Sync {
    type Loopback: CaptureSource;
    type Microphone: CaptureSource;

    /// Open the system-output loopback source; its format becomes the session format.
    fn open_loopback(&self) -> Result<Self::Loopback, CaptureError>;

    /// Open the microphone with `format` forced on it.
    ///
    /// Fails with `FormatMismatch` here or in `start` when the device cannot
    /// deliver that format.
    fn open_microphone(&self, format: &WaveFormat) -> Result<Self::Microphone, CaptureError>;
}
