use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// How samples are encoded in a [`WaveFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleEncoding {
    /// Integer PCM. 8-bit is unsigned (offset 128), wider depths are signed little-endian.
    Pcm,
    /// 32-bit IEEE float, nominal range `[-1.0, 1.0]`.
    IeeeFloat,
}

/// Layout of one interleaved sample, derived from encoding + bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleLayout {
    U8,
    I16,
    I24,
    I32,
    F32,
}

impl SampleLayout {
    pub fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::I16 => 2,
            Self::I24 => 3,
            Self::I32 | Self::F32 => 4,
        }
    }
}

/// Wave format shared by both captured streams, the mixer and the encoder.
///
/// `block_align` and `average_bytes_per_second` are always derived from the
/// other fields by the constructors; a hand-built value is checked by
/// [`WaveFormat::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaveFormat {
    pub encoding: SampleEncoding,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
    pub block_align: u16,
    pub average_bytes_per_second: u32,
}

impl WaveFormat {
    pub fn pcm(sample_rate: u32, bits_per_sample: u16, channels: u16) -> Self {
        Self::with_encoding(SampleEncoding::Pcm, sample_rate, bits_per_sample, channels)
    }

    /// 32-bit float, the shared-mode mix format of most loopback endpoints.
    pub fn ieee_float(sample_rate: u32, channels: u16) -> Self {
        Self::with_encoding(SampleEncoding::IeeeFloat, sample_rate, 32, channels)
    }

    pub fn with_encoding(encoding: SampleEncoding, sample_rate: u32, bits_per_sample: u16, channels: u16) -> Self {
        let block_align = channels * (bits_per_sample / 8);
        Self {
            encoding,
            sample_rate,
            bits_per_sample,
            channels,
            block_align,
            average_bytes_per_second: sample_rate * block_align as u32,
        }
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.sample_rate == 0 {
            return Err(CaptureError::UnsupportedFormat("sample rate must be positive".into()));
        }
        if self.channels == 0 {
            return Err(CaptureError::UnsupportedFormat("channel count must be positive".into()));
        }
        self.sample_layout()?;
        let expected_align = self.channels * (self.bits_per_sample / 8);
        if self.block_align != expected_align {
            return Err(CaptureError::UnsupportedFormat(format!(
                "block align {} does not match {} channels of {} bits",
                self.block_align, self.channels, self.bits_per_sample
            )));
        }
        if self.average_bytes_per_second != self.sample_rate * self.block_align as u32 {
            return Err(CaptureError::UnsupportedFormat(format!(
                "average bytes per second {} does not match {} Hz x {} bytes",
                self.average_bytes_per_second, self.sample_rate, self.block_align
            )));
        }
        Ok(())
    }

    pub fn sample_layout(&self) -> Result<SampleLayout, CaptureError> {
        match (self.encoding, self.bits_per_sample) {
            (SampleEncoding::Pcm, 8) => Ok(SampleLayout::U8),
            (SampleEncoding::Pcm, 16) => Ok(SampleLayout::I16),
            (SampleEncoding::Pcm, 24) => Ok(SampleLayout::I24),
            (SampleEncoding::Pcm, 32) => Ok(SampleLayout::I32),
            (SampleEncoding::IeeeFloat, 32) => Ok(SampleLayout::F32),
            (encoding, bits) => Err(CaptureError::UnsupportedFormat(format!(
                "{:?} with {} bits per sample",
                encoding, bits
            ))),
        }
    }

    /// Playback duration of `bytes` bytes of audio in this format.
    pub fn duration_of(&self, bytes: usize) -> Duration {
        if self.average_bytes_per_second == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(bytes as f64 / self.average_bytes_per_second as f64)
    }

    /// Number of bytes holding `duration` of audio, floored to whole blocks.
    pub fn bytes_for(&self, duration: Duration) -> usize {
        let raw = (duration.as_secs_f64() * self.average_bytes_per_second as f64) as usize;
        self.floor_to_block(raw)
    }

    pub fn floor_to_block(&self, bytes: usize) -> usize {
        let align = self.block_align.max(1) as usize;
        bytes - bytes % align
    }

    pub fn ceil_to_block(&self, bytes: usize) -> usize {
        let align = self.block_align.max(1) as usize;
        bytes.div_ceil(align) * align
    }
}

impl fmt::Display for WaveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.encoding {
            SampleEncoding::Pcm => "PCM",
            SampleEncoding::IeeeFloat => "float",
        };
        write!(
            f,
            "{} Hz, {}-bit {}, {} ch",
            self.sample_rate, self.bits_per_sample, kind, self.channels
        )
    }
}
