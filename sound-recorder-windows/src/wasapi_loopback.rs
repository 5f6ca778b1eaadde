//! WASAPI loopback capture source for system audio.
//!
//! Captures the mix going to the default render endpoint using
//! `AUDCLNT_STREAMFLAGS_LOOPBACK`. No special permissions needed on Windows.
//! DRM-protected audio is silenced in loopback.

use sound_recorder_core::models::audio_models::{AudioSource, AudioTrackType};
use sound_recorder_core::models::error::CaptureError;
use sound_recorder_core::models::wave_format::WaveFormat;
use sound_recorder_core::traits::capture_source::{CaptureSource, ChunkCallback};

use crate::capture_thread::{CaptureThread, StreamMode};
use crate::com::{self, ComScope, Endpoint, MixFormat};
use crate::device_enumerator::DeviceEnumerator;

/// Loopback capture of the default output device.
///
/// The device mix format is read when the source is opened and becomes the
/// format of the whole recording.
pub struct WasapiLoopbackCapture {
    format: WaveFormat,
    device: AudioSource,
    thread: CaptureThread,
}

impl WasapiLoopbackCapture {
    pub fn open_default() -> Result<Self, CaptureError> {
        let _com = ComScope::enter()?;
        let device = com::open_device(&Endpoint::DefaultRender)?;
        let client = com::activate_client(&device, AudioTrackType::System)?;
        let format = MixFormat::of(&client)?.wave_format()?;
        let info = DeviceEnumerator::describe(&device, AudioTrackType::System, true);

        log::info!("loopback device: {} ({})", info.name, format);
        Ok(Self {
            format,
            device: info,
            thread: CaptureThread::new("loopback"),
        })
    }
}

impl CaptureSource for WasapiLoopbackCapture {
    fn format(&self) -> WaveFormat {
        self.format
    }

    fn start(&mut self, callback: ChunkCallback) -> Result<(), CaptureError> {
        self.thread
            .start(Endpoint::DefaultRender, self.format, StreamMode::Loopback, callback)
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
