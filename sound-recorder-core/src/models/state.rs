/// Recording session state machine.
///
/// ```text
/// idle → recording → idle
/// ```
///
/// Draining happens synchronously inside the recording → idle transition,
/// so it is never observable as a state of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
}

impl RecordingState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }
}
