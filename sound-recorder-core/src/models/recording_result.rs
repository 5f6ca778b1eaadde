use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::audio_models::AudioTrackType;
use super::config::OutputFormat;
use super::wave_format::WaveFormat;

/// Result returned when a recording has been drained and finalized.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub duration_secs: f64,
    /// Byte ceiling the drain pass ran against.
    pub drain_budget: u64,
    /// Mixed bytes actually handed to the encoder.
    pub bytes_mixed: u64,
    /// SHA-256 of the finalized file, when it could be read back.
    pub checksum: Option<String>,
    pub metadata: RecordingMetadata,
}

/// Metadata describing a finalized recording.
///
/// Serializable for the optional JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub created_at: String,
    pub duration_secs: f64,
    pub file_path: String,
    pub checksum: Option<String>,
    pub output_format: OutputFormat,
    pub wave_format: WaveFormat,
    pub tracks: Vec<AudioTrackType>,
    pub dropped_mic_bytes: u64,
    pub dropped_system_bytes: u64,
}

impl RecordingMetadata {
    /// Metadata for a mixed system + microphone recording.
    pub fn new_mixed(
        duration_secs: f64,
        file_path: &str,
        checksum: Option<String>,
        output_format: OutputFormat,
        wave_format: WaveFormat,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            duration_secs,
            file_path: file_path.to_string(),
            checksum,
            output_format,
            wave_format,
            tracks: vec![AudioTrackType::System, AudioTrackType::Mic],
            dropped_mic_bytes: 0,
            dropped_system_bytes: 0,
        }
    }
}
