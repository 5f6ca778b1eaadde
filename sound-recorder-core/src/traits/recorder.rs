use std::path::Path;

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::RecordingState;

/// The control surface a start/stop toggle drives.
pub trait Recorder {
    fn state(&self) -> RecordingState;

    /// Start capturing both streams toward `output_path`. Transitions: idle → recording.
    ///
    /// Every failure is a `StartFailed` and leaves nothing running.
    fn start_recording(&mut self, output_path: &Path) -> Result<(), CaptureError>;

    /// Stop capturing, drain the mixed audio to the output and finalize it.
    /// Transitions: recording → idle.
    ///
    /// Returns `Ok(None)` when there is nothing to stop.
    fn stop_recording(&mut self) -> Result<Option<RecordingResult>, CaptureError>;
}
