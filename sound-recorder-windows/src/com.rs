//! COM apartment handling and endpoint activation shared by both sources.

use windows::core::PCWSTR;
use windows::Win32::Foundation::RPC_E_CHANGED_MODE;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use sound_recorder_core::models::audio_models::AudioTrackType;
use sound_recorder_core::models::error::CaptureError;
use sound_recorder_core::models::wave_format::WaveFormat;

use crate::formats;
use crate::permissions;

/// Which endpoint a source reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// The default render device, opened in loopback mode.
    DefaultRender,
    DefaultCapture,
    Capture(String),
}

impl Endpoint {
    pub fn track(&self) -> AudioTrackType {
        match self {
            Endpoint::DefaultRender => AudioTrackType::System,
            Endpoint::DefaultCapture | Endpoint::Capture(_) => AudioTrackType::Mic,
        }
    }
}

/// Keeps COM initialized on the current thread for its lifetime.
///
/// A thread that already lives in a single-threaded apartment is used as is.
pub struct ComScope {
    owned: bool,
}

impl ComScope {
    pub fn enter() -> Result<Self, CaptureError> {
        let hr = unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) };
        if hr == RPC_E_CHANGED_MODE {
            return Ok(Self { owned: false });
        }
        hr.ok()
            .map_err(|e| CaptureError::Unknown(format!("CoInitializeEx failed: {}", e)))?;
        Ok(Self { owned: true })
    }
}

impl Drop for ComScope {
    fn drop(&mut self) {
        if self.owned {
            unsafe {
                CoUninitialize();
            }
        }
    }
}

/// Resolve `endpoint` to a device. COM must be initialized.
pub fn open_device(endpoint: &Endpoint) -> Result<IMMDevice, CaptureError> {
    unsafe {
        let enumerator: IMMDeviceEnumerator = CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
            .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to create enumerator: {}", e)))?;

        match endpoint {
            Endpoint::DefaultRender => enumerator
                .GetDefaultAudioEndpoint(eRender, eConsole)
                .map_err(|e| CaptureError::DeviceUnavailable(format!("no default output device: {}", e))),
            Endpoint::DefaultCapture => enumerator
                .GetDefaultAudioEndpoint(eCapture, eConsole)
                .map_err(|e| CaptureError::DeviceUnavailable(format!("no default microphone: {}", e))),
            Endpoint::Capture(id) => {
                let wide_id: Vec<u16> = id.encode_utf16().chain(std::iter::once(0)).collect();
                enumerator
                    .GetDevice(PCWSTR(wide_id.as_ptr()))
                    .map_err(|e| CaptureError::DeviceUnavailable(format!("microphone {} not found: {}", id, e)))
            }
        }
    }
}

/// Activate an `IAudioClient` on `device`.
pub fn activate_client(device: &IMMDevice, track: AudioTrackType) -> Result<IAudioClient, CaptureError> {
    unsafe { device.Activate(CLSCTX_ALL, None) }.map_err(|e| permissions::classify_activation_error(&e, track))
}

/// The shared-mode mix format of a client, freed on drop.
pub struct MixFormat {
    raw: *mut WAVEFORMATEX,
}

impl MixFormat {
    pub fn of(client: &IAudioClient) -> Result<Self, CaptureError> {
        let raw = unsafe { client.GetMixFormat() }
            .map_err(|e| CaptureError::ConfigurationFailed(format!("GetMixFormat failed: {}", e)))?;
        Ok(Self { raw })
    }

    pub fn wave_format(&self) -> Result<WaveFormat, CaptureError> {
        unsafe { formats::wave_format_from_raw(self.raw) }
    }

    pub fn as_ptr(&self) -> *const WAVEFORMATEX {
        self.raw
    }
}

impl Drop for MixFormat {
    fn drop(&mut self) {
        unsafe {
            CoTaskMemFree(Some(self.raw as *const _));
        }
    }
}
