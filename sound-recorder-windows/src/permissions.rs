//! Windows microphone privacy permission check.
//!
//! On Windows 10 1803+, microphone access is controlled by the privacy
//! settings at Settings > Privacy > Microphone. Desktop apps are allowed
//! unless the user has disabled the global toggle, in which case activating
//! a capture endpoint fails with `E_ACCESSDENIED`.
//!
//! Loopback capture of the render endpoint is never restricted.

use windows::Win32::Foundation::E_ACCESSDENIED;
use windows::Win32::Media::Audio::{IAudioClient, AUDCLNT_E_DEVICE_INVALIDATED, AUDCLNT_E_DEVICE_IN_USE};
use windows::Win32::System::Com::CLSCTX_ALL;

use sound_recorder_core::models::audio_models::AudioTrackType;
use sound_recorder_core::models::error::CaptureError;

use crate::com::{self, ComScope, Endpoint};

/// Check if microphone access is available.
///
/// Activates the default capture device. Returns `Ok(false)` when there is
/// no microphone or the privacy settings deny access.
pub fn check_microphone_permission() -> Result<bool, CaptureError> {
    let _com = ComScope::enter()?;

    let device = match com::open_device(&Endpoint::DefaultCapture) {
        Ok(device) => device,
        Err(_) => return Ok(false),
    };

    match unsafe { device.Activate::<IAudioClient>(CLSCTX_ALL, None) } {
        Ok(_) => Ok(true),
        Err(e) if e.code() == E_ACCESSDENIED => Ok(false),
        Err(e) => {
            log::warn!("unexpected error checking mic permission: {}", e);
            Ok(true)
        }
    }
}

/// Map an `IMMDevice::Activate` failure to a capture error.
///
/// Every activation failure means the device cannot be claimed, so all of
/// them are `DeviceUnavailable`; the message names the cause.
pub fn classify_activation_error(error: &windows::core::Error, track: AudioTrackType) -> CaptureError {
    let code = error.code();
    let reason = if code == E_ACCESSDENIED && track == AudioTrackType::Mic {
        "microphone access denied by privacy settings"
    } else if code == E_ACCESSDENIED {
        "access denied"
    } else if code == AUDCLNT_E_DEVICE_IN_USE {
        "in use by another application"
    } else if code == AUDCLNT_E_DEVICE_INVALIDATED {
        "disconnected"
    } else {
        "activation failed"
    };
    CaptureError::DeviceUnavailable(format!("{:?} device {}: {}", track, reason, error))
}
