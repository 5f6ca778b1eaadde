use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Constant bitrates (kbps) the MP3 encoder accepts.
pub const MP3_BITRATES_KBPS: [u32; 16] = [8, 16, 24, 32, 40, 48, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];

/// Container/codec of the finalized output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum OutputFormat {
    /// MPEG-1/2 Layer III at a constant bitrate.
    Mp3 { bitrate_kbps: u32 },
    /// Uncompressed RIFF WAV in the capture format.
    Wav,
}

impl OutputFormat {
    /// File extension the output path is normalized to.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 { .. } => "mp3",
            Self::Wav => "wav",
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Mp3 { bitrate_kbps: 128 }
    }
}

/// Configuration for a recording session.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderConfiguration {
    /// Capacity of each bounded buffer, in audio time (default: 30 minutes).
    pub buffer_duration: Duration,

    /// Drain window size in blocks of the shared format (default: 1000).
    pub window_blocks: usize,

    /// Output container (default: MP3 at 128 kbps).
    pub output_format: OutputFormat,

    /// Write a `.metadata.json` sidecar next to the recording (default: false).
    pub write_metadata: bool,
}

impl RecorderConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.buffer_duration.is_zero() {
            return Err("buffer duration must be positive".into());
        }
        if self.window_blocks == 0 {
            return Err("drain window must hold at least one block".into());
        }
        if let OutputFormat::Mp3 { bitrate_kbps } = self.output_format {
            if !MP3_BITRATES_KBPS.contains(&bitrate_kbps) {
                return Err(format!("unsupported MP3 bitrate: {} kbps", bitrate_kbps));
            }
        }
        Ok(())
    }
}

impl Default for RecorderConfiguration {
    fn default() -> Self {
        Self {
            buffer_duration: Duration::from_secs(30 * 60),
            window_blocks: 1000,
            output_format: OutputFormat::default(),
            write_metadata: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = RecorderConfiguration::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.buffer_duration, Duration::from_secs(1800));
        assert_eq!(config.output_format, OutputFormat::Mp3 { bitrate_kbps: 128 });
    }

    #[test]
    fn rejects_odd_bitrate() {
        let config = RecorderConfiguration {
            output_format: OutputFormat::Mp3 { bitrate_kbps: 100 },
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("100"));
    }

    #[test]
    fn rejects_empty_buffer_and_window() {
        let zero_buffer = RecorderConfiguration {
            buffer_duration: Duration::ZERO,
            ..Default::default()
        };
        assert!(zero_buffer.validate().is_err());

        let zero_window = RecorderConfiguration {
            window_blocks: 0,
            ..Default::default()
        };
        assert!(zero_window.validate().is_err());
    }

    #[test]
    fn extensions() {
        assert_eq!(OutputFormat::default().extension(), "mp3");
        assert_eq!(OutputFormat::Wav.extension(), "wav");
    }
}
