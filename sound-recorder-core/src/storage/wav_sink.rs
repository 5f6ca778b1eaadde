use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::wave_format::WaveFormat;
use crate::processing::wav_format;
use crate::traits::encoder_sink::EncoderSink;

/// Streaming WAV writer in the capture format.
///
/// ```text
/// [44-byte WAV header, sizes patched on finalize]
/// [raw mixed samples...]
/// ```
pub struct WavFileSink {
    file_path: PathBuf,
    format: WaveFormat,
    file: Option<BufWriter<File>>,
    data_bytes: u64,
}

impl WavFileSink {
    /// Create the file and write a header with a zero data size.
    pub fn create(file_path: &Path, format: &WaveFormat) -> Result<Self, CaptureError> {
        format.validate()?;

        let file = File::create(file_path)
            .map_err(|e| CaptureError::StorageError(format!("failed to create {}: {}", file_path.display(), e)))?;
        let mut file = BufWriter::new(file);

        let header = wav_format::generate_wav_header(format, 0);
        file.write_all(&header)
            .map_err(|e| CaptureError::EncodeFailed(format!("header write failed: {}", e)))?;

        Ok(Self {
            file_path: file_path.to_path_buf(),
            format: *format,
            file: Some(file),
            data_bytes: 0,
        })
    }

    /// Mixed bytes written so far (excluding the header).
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }
}

impl EncoderSink for WavFileSink {
    fn write(&mut self, pcm: &[u8]) -> Result<(), CaptureError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::EncodeFailed("WAV sink already finalized".into()))?;
        file.write_all(pcm)
            .map_err(|e| CaptureError::EncodeFailed(format!("write failed: {}", e)))?;
        self.data_bytes += pcm.len() as u64;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), CaptureError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| CaptureError::EncodeFailed("WAV sink already finalized".into()))?;

        let mut header = wav_format::generate_wav_header(&self.format, 0);
        wav_format::patch_data_size(&mut header, self.data_bytes);
        wav_format::patch_file_size(&mut header, wav_format::WAV_HEADER_SIZE as u64 + self.data_bytes);

        let seal = |file: &mut BufWriter<File>| -> std::io::Result<()> {
            file.seek(SeekFrom::Start(0))?;
            file.write_all(&header)?;
            file.flush()?;
            file.get_ref().sync_all()
        };
        seal(&mut file).map_err(|e| CaptureError::EncodeFailed(format!("failed to finalize WAV: {}", e)))
    }

    fn output_path(&self) -> &Path {
        &self.file_path
    }
}
