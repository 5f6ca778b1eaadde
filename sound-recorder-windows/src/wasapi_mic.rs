//! WASAPI microphone capture source.
//!
//! Opens a capture endpoint in shared mode with the recording format forced
//! on it; the audio engine converts rate, depth and channel count
//! (`AUDCLNT_STREAMFLAGS_AUTOCONVERTPCM`).

use sound_recorder_core::models::audio_models::{AudioSource, AudioTrackType};
use sound_recorder_core::models::error::CaptureError;
use sound_recorder_core::models::wave_format::WaveFormat;
use sound_recorder_core::traits::capture_source::{CaptureSource, ChunkCallback};

use crate::capture_thread::{CaptureThread, StreamMode};
use crate::com::{self, ComScope, Endpoint};
use crate::device_enumerator::DeviceEnumerator;

/// Microphone capture delivering chunks in a forced format.
pub struct WasapiMicCapture {
    endpoint: Endpoint,
    format: WaveFormat,
    device: AudioSource,
    thread: CaptureThread,
}

impl WasapiMicCapture {
    /// Open the default microphone, or the one with `device_id`.
    ///
    /// Fails with `DeviceUnavailable` when the device cannot be claimed,
    /// including when the privacy settings block microphone access. A format the device cannot be converted to is
    /// reported by `start` as `FormatMismatch`.
    pub fn open(device_id: Option<&str>, format: &WaveFormat) -> Result<Self, CaptureError> {
        let endpoint = match device_id {
            Some(id) => Endpoint::Capture(id.to_string()),
            None => Endpoint::DefaultCapture,
        };

        let _com = ComScope::enter()?;
        let device = com::open_device(&endpoint)?;
        // Probe access now so a denied microphone fails before anything starts.
        com::activate_client(&device, AudioTrackType::Mic)?;
        let info = DeviceEnumerator::describe(&device, AudioTrackType::Mic, device_id.is_none());

        log::info!("microphone: {} (forced to {})", info.name, format);
        Ok(Self {
            endpoint,
            format: *format,
            device: info,
            thread: CaptureThread::new("mic"),
        })
    }
}

impl CaptureSource for WasapiMicCapture {
    fn format(&self) -> WaveFormat {
        self.format
    }

    fn start(&mut self, callback: ChunkCallback) -> Result<(), CaptureError> {
        self.thread
            .start(self.endpoint.clone(), self.format, StreamMode::ForcedFormat, callback)
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.thread.stop()
    }

    fn is_running(&self) -> bool {
        self.thread.is_running()
    }

    fn device_info(&self) -> AudioSource {
        self.device.clone()
    }
}
