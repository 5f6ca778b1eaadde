//! # sound-recorder-core
//!
//! Platform-agnostic core of a two-stream sound recorder.
//!
//! Captures what the computer plays (loopback) and what the microphone
//! hears into two bounded buffers, mixes them into one stream when the
//! recording stops and encodes the result to MP3 or WAV. Platform backends
//! (Windows WASAPI) implement [`CaptureBackend`] and plug into the generic
//! [`RecordingSession`].
//!
//! ## Architecture
//!
//! ```text
//! sound-recorder-core (this crate)
//! ├── traits/       ← CaptureSource, CaptureBackend, EncoderSink, Recorder, RecorderDelegate
//! ├── models/       ← CaptureError, WaveFormat, RecordingState, RecorderConfiguration, etc.
//! ├── processing/   ← BoundedAudioBuffer, StreamMixer, drain pass, sample math, WAV header
//! ├── session/      ← RecordingSession (generic controller)
//! └── storage/      ← MP3/WAV file sinks, output paths, checksum, metadata sidecar
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioSource, AudioTrackType, AudioTransportType, BufferLevel, SessionDiagnostics};
pub use models::config::{OutputFormat, RecorderConfiguration};
pub use models::error::CaptureError;
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::state::RecordingState;
pub use models::wave_format::{SampleEncoding, WaveFormat};
pub use processing::bounded_buffer::BoundedAudioBuffer;
pub use processing::mixer::StreamMixer;
pub use session::controller::RecordingSession;
pub use storage::{Mp3FileSink, WavFileSink};
pub use traits::capture_source::{CaptureBackend, CaptureSource, ChunkCallback};
pub use traits::encoder_sink::{EncoderSink, SinkFactory};
pub use traits::recorder::Recorder;
pub use traits::recorder_delegate::RecorderDelegate;
