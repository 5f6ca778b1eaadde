//! Windows audio device enumeration via the MMDevice API.
//!
//! Wraps `IMMDeviceEnumerator` to list capture (microphone) and render
//! (speaker/headphone) endpoints with friendly names and transport types.

use windows::Win32::Devices::FunctionDiscovery::*;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use sound_recorder_core::models::audio_models::{AudioSource, AudioTrackType, AudioTransportType};
use sound_recorder_core::models::error::CaptureError;

/// Audio device enumerator using the Windows MMDevice API.
pub struct DeviceEnumerator {
    enumerator: IMMDeviceEnumerator,
}

impl DeviceEnumerator {
    /// Create a new device enumerator.
    ///
    /// Requires COM to be initialized on the calling thread.
    pub fn new() -> Result<Self, CaptureError> {
        unsafe {
            let enumerator: IMMDeviceEnumerator = CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to create enumerator: {}", e)))?;
            Ok(Self { enumerator })
        }
    }

    /// Describe an opened endpoint for `CaptureSource::device_info`.
    pub fn describe(device: &IMMDevice, source_type: AudioTrackType, is_default: bool) -> AudioSource {
        let id = unsafe { device.GetId() }
            .ok()
            .and_then(|id| unsafe { id.to_string() }.ok())
            .unwrap_or_default();
        let name = Self::get_device_friendly_name(device).unwrap_or_else(|| match source_type {
            AudioTrackType::System => "System Audio (Loopback)".into(),
            AudioTrackType::Mic => "Microphone".into(),
        });

        AudioSource {
            id,
            name,
            source_type,
            is_default,
            transport_type: Some(Self::detect_transport_type(device)),
        }
    }

    /// List active capture (microphone) devices.
    pub fn list_capture_devices(&self) -> Result<Vec<AudioSource>, CaptureError> {
        self.list_devices(eCapture, AudioTrackType::Mic)
    }

    /// List active render (output) devices.
    pub fn list_render_devices(&self) -> Result<Vec<AudioSource>, CaptureError> {
        self.list_devices(eRender, AudioTrackType::System)
    }

    fn list_devices(
        &self,
        data_flow: EDataFlow,
        source_type: AudioTrackType,
    ) -> Result<Vec<AudioSource>, CaptureError> {
        unsafe {
            let collection = self
                .enumerator
                .EnumAudioEndpoints(data_flow, DEVICE_STATE_ACTIVE)
                .map_err(|e| CaptureError::Unknown(format!("EnumAudioEndpoints failed: {}", e)))?;

            let count = collection
                .GetCount()
                .map_err(|e| CaptureError::Unknown(format!("GetCount failed: {}", e)))?;

            // Get default device ID for comparison
            let default_id = self
                .enumerator
                .GetDefaultAudioEndpoint(data_flow, eConsole)
                .ok()
                .and_then(|d| d.GetId().ok())
                .and_then(|id| id.to_string().ok());

            let mut devices = Vec::new();

            for i in 0..count {
                let device = match collection.Item(i) {
                    Ok(d) => d,
                    Err(_) => continue,
                };

                let id = match device.GetId() {
                    Ok(id) => id.to_string().unwrap_or_default(),
                    Err(_) => continue,
                };

                let is_default = default_id.as_deref() == Some(id.as_str());
                let mut source = Self::describe(&device, source_type, is_default);
                source.id = id;
                devices.push(source);
            }

            Ok(devices)
        }
    }

    /// Read the PKEY_Device_FriendlyName property from a device.
    fn get_device_friendly_name(device: &IMMDevice) -> Option<String> {
        unsafe {
            let store = device.OpenPropertyStore(STGM_READ).ok()?;
            let value = store.GetValue(&PKEY_Device_FriendlyName).ok()?;
            let name = value.to_string();
            (!name.is_empty()).then_some(name)
        }
    }

    /// Detect the transport type of an audio device from its enumerator name.
    fn detect_transport_type(device: &IMMDevice) -> AudioTransportType {
        let enumerator_name = unsafe {
            device
                .OpenPropertyStore(STGM_READ)
                .and_then(|store| store.GetValue(&PKEY_Device_EnumeratorName))
                .map(|value| value.to_string())
        };

        match enumerator_name {
            Ok(name) if name.contains("BTHLEENUM") => AudioTransportType::BluetoothLE,
            Ok(name) if name.contains("BTHENUM") => AudioTransportType::Bluetooth,
            Ok(name) if name.contains("USB") => AudioTransportType::Usb,
            Ok(name) if name.contains("SWD") => AudioTransportType::Virtual,
            Ok(_) => AudioTransportType::BuiltIn,
            Err(_) => AudioTransportType::Unknown,
        }
    }
}
