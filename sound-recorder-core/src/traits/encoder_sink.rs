use std::path::Path;
use std::sync::Arc;

use crate::models::config::OutputFormat;
use crate::models::error::CaptureError;
use crate::models::wave_format::WaveFormat;

/// Destination of the mixed stream.
///
/// Receives raw bytes in the mixed [`WaveFormat`], in order, and owns the
/// container/codec. Failures are reported as `EncodeFailed`.
pub trait EncoderSink {
    /// Encode and write one window of mixed audio.
    fn write(&mut self, pcm: &[u8]) -> Result<(), CaptureError>;

    /// Flush the encoder and seal the container. Further writes fail.
    fn finalize(&mut self) -> Result<(), CaptureError>;

    /// Where the output lands.
    fn output_path(&self) -> &Path;
}

/// Opens a sink for a normalized output path and the session format.
pub type SinkFactory =
    Arc<dyn Fn(&Path, &WaveFormat, &OutputFormat) -> Result<Box<dyn EncoderSink>, CaptureError> + Send + Sync>;
