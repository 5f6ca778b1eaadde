pub mod checksum;
pub mod metadata;
pub mod mp3_sink;
pub mod paths;
pub mod wav_sink;

use std::path::Path;
use std::sync::Arc;

use crate::models::config::OutputFormat;
use crate::models::error::CaptureError;
use crate::models::wave_format::WaveFormat;
use crate::traits::encoder_sink::{EncoderSink, SinkFactory};

pub use mp3_sink::Mp3FileSink;
pub use wav_sink::WavFileSink;

/// Open the file sink matching `output` at `path`.
pub fn open_file_sink(
    path: &Path,
    format: &WaveFormat,
    output: &OutputFormat,
) -> Result<Box<dyn EncoderSink>, CaptureError> {
    match *output {
        OutputFormat::Mp3 { bitrate_kbps } => Ok(Box::new(Mp3FileSink::create(path, format, bitrate_kbps)?)),
        OutputFormat::Wav => Ok(Box::new(WavFileSink::create(path, format)?)),
    }
}

/// The [`SinkFactory`] sessions use unless told otherwise.
pub fn file_sink_factory() -> SinkFactory {
    Arc::new(open_file_sink)
}
