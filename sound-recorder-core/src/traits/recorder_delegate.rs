use crate::models::audio_models::AudioTrackType;
use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::RecordingState;

/// Event delegate for recording session notifications.
///
/// `on_buffer_full` is called from a capture delivery thread; everything else
/// from the thread driving the session. Implementations should marshal to a
/// UI thread if needed and must not block.
pub trait RecorderDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: &RecordingState);

    /// Called when a chunk was dropped because its buffer is full.
    fn on_buffer_full(&self, track: AudioTrackType, dropped_bytes: usize);

    /// Called for each fault collected while stopping.
    fn on_error(&self, error: &CaptureError);

    /// Called when the output has been drained and finalized.
    fn on_recording_finished(&self, result: &RecordingResult);
}
