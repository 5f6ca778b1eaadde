use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use mp3lame_encoder::{Bitrate, Builder, Encoder, FlushNoGap, InterleavedPcm, MonoPcm, Quality};

use crate::models::error::CaptureError;
use crate::models::wave_format::{SampleLayout, WaveFormat};
use crate::processing::samples;
use crate::traits::encoder_sink::EncoderSink;

/// LAME needs this much headroom to flush its last frames.
const FLUSH_HEADROOM: usize = 7200;

/// Constant-bitrate MP3 writer backed by LAME.
///
/// Mixed windows are converted to 16-bit samples and encoded as they
/// arrive; nothing uncompressed is written to disk.
pub struct Mp3FileSink {
    file_path: PathBuf,
    channels: u16,
    layout: SampleLayout,
    encoder: Encoder,
    file: Option<BufWriter<File>>,
    encoded: Vec<u8>,
}

impl Mp3FileSink {
    /// Create the output file and configure LAME for `format` at `bitrate_kbps`.
    ///
    /// Only mono and stereo input can be encoded.
    pub fn create(file_path: &Path, format: &WaveFormat, bitrate_kbps: u32) -> Result<Self, CaptureError> {
        format.validate()?;
        let layout = format.sample_layout()?;
        if !(1..=2).contains(&format.channels) {
            return Err(CaptureError::EncodeFailed(format!(
                "MP3 supports mono or stereo input, got {} channels",
                format.channels
            )));
        }

        let encoder = build_encoder(format, bitrate_kbps)?;
        let file = File::create(file_path)
            .map_err(|e| CaptureError::StorageError(format!("failed to create {}: {}", file_path.display(), e)))?;

        Ok(Self {
            file_path: file_path.to_path_buf(),
            channels: format.channels,
            layout,
            encoder,
            file: Some(BufWriter::new(file)),
            encoded: Vec::new(),
        })
    }

    fn write_encoded(&mut self) -> Result<(), CaptureError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::EncodeFailed("MP3 sink already finalized".into()))?;
        file.write_all(&self.encoded)
            .map_err(|e| CaptureError::EncodeFailed(format!("write failed: {}", e)))?;
        self.encoded.clear();
        Ok(())
    }
}

impl EncoderSink for Mp3FileSink {
    fn write(&mut self, pcm: &[u8]) -> Result<(), CaptureError> {
        if self.file.is_none() {
            return Err(CaptureError::EncodeFailed("MP3 sink already finalized".into()));
        }

        let samples = samples::to_i16(self.layout, pcm);
        let frames = samples.len() / self.channels as usize;
        self.encoded.clear();
        self.encoded.reserve(mp3lame_encoder::max_required_buffer_size(frames));

        if self.channels == 2 {
            self.encoder.encode_to_vec(InterleavedPcm(&samples), &mut self.encoded)
        } else {
            self.encoder.encode_to_vec(MonoPcm(&samples), &mut self.encoded)
        }
        .map_err(|e| CaptureError::EncodeFailed(format!("LAME encode failed: {:?}", e)))?;

        self.write_encoded()
    }

    fn finalize(&mut self) -> Result<(), CaptureError> {
        if self.file.is_none() {
            return Err(CaptureError::EncodeFailed("MP3 sink already finalized".into()));
        }

        self.encoded.clear();
        self.encoded.reserve(FLUSH_HEADROOM);
        self.encoder
            .flush_to_vec::<FlushNoGap>(&mut self.encoded)
            .map_err(|e| CaptureError::EncodeFailed(format!("LAME flush failed: {:?}", e)))?;
        self.write_encoded()?;

        if let Some(mut file) = self.file.take() {
            file.flush()
                .and_then(|_| file.get_ref().sync_all())
                .map_err(|e| CaptureError::EncodeFailed(format!("failed to finalize MP3: {}", e)))?;
        }
        Ok(())
    }

    fn output_path(&self) -> &Path {
        &self.file_path
    }
}

fn build_encoder(format: &WaveFormat, bitrate_kbps: u32) -> Result<Encoder, CaptureError> {
    let bitrate = lame_bitrate(bitrate_kbps)?;
    let build_err = |e| CaptureError::EncodeFailed(format!("LAME setup failed: {:?}", e));

    let mut builder =
        Builder::new().ok_or_else(|| CaptureError::EncodeFailed("failed to allocate LAME encoder".into()))?;
    builder.set_num_channels(format.channels as u8).map_err(build_err)?;
    builder.set_sample_rate(format.sample_rate).map_err(build_err)?;
    builder.set_brate(bitrate).map_err(build_err)?;
    builder.set_quality(Quality::Good).map_err(build_err)?;
    builder.build().map_err(build_err)
}

fn lame_bitrate(kbps: u32) -> Result<Bitrate, CaptureError> {
    let bitrate = match kbps {
        8 => Bitrate::Kbps8,
        16 => Bitrate::Kbps16,
        24 => Bitrate::Kbps24,
        32 => Bitrate::Kbps32,
        40 => Bitrate::Kbps40,
        48 => Bitrate::Kbps48,
        64 => Bitrate::Kbps64,
        80 => Bitrate::Kbps80,
        96 => Bitrate::Kbps96,
        112 => Bitrate::Kbps112,
        128 => Bitrate::Kbps128,
        160 => Bitrate::Kbps160,
        192 => Bitrate::Kbps192,
        224 => Bitrate::Kbps224,
        256 => Bitrate::Kbps256,
        320 => Bitrate::Kbps320,
        other => {
            return Err(CaptureError::ConfigurationFailed(format!(
                "unsupported MP3 bitrate: {} kbps",
                other
            )))
        }
    };
    Ok(bitrate)
}
