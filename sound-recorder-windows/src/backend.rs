use sound_recorder_core::models::audio_models::AudioSource;
use sound_recorder_core::models::error::CaptureError;
use sound_recorder_core::models::wave_format::WaveFormat;
use sound_recorder_core::traits::capture_source::CaptureBackend;

use crate::com::ComScope;
use crate::device_enumerator::DeviceEnumerator;
use crate::wasapi_loopback::WasapiLoopbackCapture;
use crate::wasapi_mic::WasapiMicCapture;

/// Opens WASAPI sources for a `RecordingSession`.
///
/// ```ignore
/// use sound_recorder_core::{RecorderConfiguration, RecordingSession};
/// use sound_recorder_windows::WasapiBackend;
///
/// let mut session = RecordingSession::new(WasapiBackend::new(), RecorderConfiguration::default());
/// session.start_recording("meeting.mp3".as_ref())?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct WasapiBackend {
    microphone_id: Option<String>,
}

impl WasapiBackend {
    /// Record the default output device and the default microphone.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record from the microphone with this endpoint ID instead of the default.
    pub fn with_microphone(mut self, device_id: impl Into<String>) -> Self {
        self.microphone_id = Some(device_id.into());
        self
    }

    /// Active microphones to choose from.
    pub fn microphones() -> Result<Vec<AudioSource>, CaptureError> {
        let _com = ComScope::enter()?;
        DeviceEnumerator::new()?.list_capture_devices()
    }
}

impl CaptureBackend for WasapiBackend {
    type Loopback = WasapiLoopbackCapture;
    type Microphone = WasapiMicCapture;

    fn open_loopback(&self) -> Result<WasapiLoopbackCapture, CaptureError> {
        WasapiLoopbackCapture::open_default()
    }

    fn open_microphone(&self, format: &WaveFormat) -> Result<WasapiMicCapture, CaptureError> {
        WasapiMicCapture::open(self.microphone_id.as_deref(), format)
    }
}
