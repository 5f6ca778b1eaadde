use serde::{Deserialize, Serialize};

/// Which of the two captured streams a buffer, source or event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioTrackType {
    Mic,
    System,
}

/// Transport type for an audio device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioTransportType {
    BuiltIn,
    Bluetooth,
    BluetoothLE,
    Usb,
    Virtual,
    Unknown,
}

/// An audio device backing a capture source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    pub id: String,
    pub name: String,
    pub source_type: AudioTrackType,
    pub is_default: bool,
    pub transport_type: Option<AudioTransportType>,
}

/// Fill level of one bounded buffer at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLevel {
    pub available_bytes: usize,
    pub capacity_bytes: usize,
}

/// Counters for debugging a recording session.
///
/// Updated from the delivery threads and from the drain pass; read a copy
/// through `RecordingSession::diagnostics`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDiagnostics {
    pub system_chunks: u64,
    pub mic_chunks: u64,
    pub system_bytes: u64,
    pub mic_bytes: u64,
    pub system_rejected_chunks: u64,
    pub mic_rejected_chunks: u64,
    pub system_rejected_bytes: u64,
    pub mic_rejected_bytes: u64,
    /// Chunks that arrived after the session stopped accepting audio.
    pub late_chunks: u64,
    pub drain_windows: u64,
    pub bytes_mixed: u64,
}

impl SessionDiagnostics {
    pub(crate) fn record_accepted(&mut self, track: AudioTrackType, bytes: usize) {
        match track {
            AudioTrackType::System => {
                self.system_chunks += 1;
                self.system_bytes += bytes as u64;
            }
            AudioTrackType::Mic => {
                self.mic_chunks += 1;
                self.mic_bytes += bytes as u64;
            }
        }
    }

    pub(crate) fn record_rejected(&mut self, track: AudioTrackType, bytes: usize) {
        match track {
            AudioTrackType::System => {
                self.system_rejected_chunks += 1;
                self.system_rejected_bytes += bytes as u64;
            }
            AudioTrackType::Mic => {
                self.mic_rejected_chunks += 1;
                self.mic_rejected_bytes += bytes as u64;
            }
        }
    }
}
