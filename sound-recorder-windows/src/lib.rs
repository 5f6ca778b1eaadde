//! # sound-recorder-windows
//!
//! Windows WASAPI backend for sound-recorder-core.
//!
//! Provides:
//! - `WasapiBackend`: opens a fresh source pair for every recording
//! - `WasapiLoopbackCapture`: system audio via WASAPI loopback on the default render endpoint
//! - `WasapiMicCapture`: microphone capture with the loopback format forced on it
//! - `DeviceEnumerator`: audio device enumeration via the MMDevice API
//! - `permissions`: Windows microphone privacy check
//!
//! ## Platform Requirements
//! - Windows 10 1703+ (build 15063)
//! - Visual Studio Build Tools 2022 + Windows SDK for linking
//!
//! ## Usage
//! ```ignore
//! use sound_recorder_core::{RecorderConfiguration, RecordingSession};
//! use sound_recorder_windows::WasapiBackend;
//!
//! let mut session = RecordingSession::new(WasapiBackend::new(), RecorderConfiguration::default());
//! session.start_recording("call.mp3".as_ref())?;
//! // ...
//! let result = session.stop_recording()?;
//! ```

#[cfg(target_os = "windows")]
pub mod backend;
#[cfg(target_os = "windows")]
mod capture_thread;
#[cfg(target_os = "windows")]
mod com;
#[cfg(target_os = "windows")]
pub mod device_enumerator;
#[cfg(target_os = "windows")]
pub mod formats;
#[cfg(target_os = "windows")]
pub mod permissions;
#[cfg(target_os = "windows")]
pub mod wasapi_loopback;
#[cfg(target_os = "windows")]
pub mod wasapi_mic;

#[cfg(target_os = "windows")]
pub use backend::WasapiBackend;
#[cfg(target_os = "windows")]
pub use device_enumerator::DeviceEnumerator;
#[cfg(target_os = "windows")]
pub use wasapi_loopback::WasapiLoopbackCapture;
#[cfg(target_os = "windows")]
pub use wasapi_mic::WasapiMicCapture;
