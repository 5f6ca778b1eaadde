use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioTrackType, BufferLevel, SessionDiagnostics};
use crate::models::config::RecorderConfiguration;
use crate::models::error::CaptureError;
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::models::state::RecordingState;
use crate::models::wave_format::WaveFormat;
use crate::processing::bounded_buffer::BoundedAudioBuffer;
use crate::processing::drain::{self, DrainReport};
use crate::processing::mixer::StreamMixer;
use crate::storage;
use crate::storage::paths;
use crate::traits::capture_source::{CaptureBackend, CaptureSource, ChunkCallback};
use crate::traits::encoder_sink::{EncoderSink, SinkFactory};
use crate::traits::recorder::Recorder;
use crate::traits::recorder_delegate::RecorderDelegate;

/// Everything that lives exactly as long as one recording.
struct ActiveRecording<B: CaptureBackend> {
    system: B::Loopback,
    microphone: B::Microphone,
    system_buffer: Arc<BoundedAudioBuffer>,
    mic_buffer: Arc<BoundedAudioBuffer>,
    mixer: StreamMixer,
    sink: Box<dyn EncoderSink>,
    /// Read at the top of every capture callback; cleared before the sources stop.
    accepting: Arc<AtomicBool>,
    format: WaveFormat,
    output_path: PathBuf,
    started_at: Instant,
}

/// Recording session controller.
///
/// Owns the per-recording capture sources, bounded buffers, mixer and
/// encoder sink, and drives them through idle → recording → idle:
///
/// ```text
/// [Loopback source] → callback → [System buffer] ─┐
///                                                  ├→ [StreamMixer] → drain → [EncoderSink] → file
/// [Microphone source] → callback → [Mic buffer] ───┘
/// ```
///
/// Capture callbacks run on the sources' delivery threads and only touch
/// their own buffer. Mixing and encoding happen synchronously inside
/// [`stop_recording`](RecordingSession::stop_recording).
pub struct RecordingSession<B: CaptureBackend> {
    backend: B,
    config: RecorderConfiguration,
    sink_factory: SinkFactory,
    delegate: Option<Arc<dyn RecorderDelegate>>,
    diagnostics: Arc<Mutex<SessionDiagnostics>>,
    active: Option<ActiveRecording<B>>,
}

impl<B: CaptureBackend> RecordingSession<B> {
    pub fn new(backend: B, config: RecorderConfiguration) -> Self {
        Self {
            backend,
            config,
            sink_factory: storage::file_sink_factory(),
            delegate: None,
            diagnostics: Arc::new(Mutex::new(SessionDiagnostics::default())),
            active: None,
        }
    }

    /// Replace the file sinks, e.g. to stream into another container.
    pub fn with_sink_factory(mut self, sink_factory: SinkFactory) -> Self {
        self.sink_factory = sink_factory;
        self
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn RecorderDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> RecordingState {
        if self.active.is_some() {
            RecordingState::Recording
        } else {
            RecordingState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    pub fn config(&self) -> &RecorderConfiguration {
        &self.config
    }

    /// Counters for the current (or last) recording.
    pub fn diagnostics(&self) -> SessionDiagnostics {
        self.diagnostics.lock().clone()
    }

    /// Normalized output path of the current recording.
    pub fn output_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|a| a.output_path.as_path())
    }

    /// Shared format of the current recording.
    pub fn format(&self) -> Option<WaveFormat> {
        self.active.as_ref().map(|a| a.format)
    }

    /// Fill levels of the system and microphone buffers while recording.
    pub fn buffer_levels(&self) -> Option<(BufferLevel, BufferLevel)> {
        self.active.as_ref().map(|a| (level(&a.system_buffer), level(&a.mic_buffer)))
    }

    /// Start capturing toward `output_path`. Transitions: idle → recording.
    ///
    /// Every failure is reported as `StartFailed` wrapping the cause; any
    /// source that already started is stopped and the output file removed.
    pub fn start_recording(&mut self, output_path: &Path) -> Result<(), CaptureError> {
        if self.active.is_some() {
            return Err(CaptureError::start_failed(CaptureError::InvalidState(
                "a recording is already in progress".into(),
            )));
        }

        let active = self.open_recording(output_path).map_err(|e| {
            log::error!("failed to start recording: {}", e);
            CaptureError::start_failed(e)
        })?;

        log::info!(
            "recording started: {} ({})",
            active.output_path.display(),
            active.format
        );
        self.active = Some(active);
        self.notify_state(RecordingState::Recording);
        Ok(())
    }

    /// Stop capturing, drain the mixed audio to the encoder and finalize it.
    /// Transitions: recording → idle.
    ///
    /// Returns `Ok(None)` when idle. Teardown is best-effort: a fault in one
    /// step never skips the others, and all faults are reported together as
    /// `StopFailed` once the session is idle again.
    pub fn stop_recording(&mut self) -> Result<Option<RecordingResult>, CaptureError> {
        let Some(mut active) = self.active.take() else {
            log::debug!("stop requested while idle");
            return Ok(None);
        };

        let mut faults = Vec::new();

        // Unregister first: nothing delivered from here on reaches a buffer.
        active.accepting.store(false, Ordering::SeqCst);

        if let Err(e) = active.system.stop() {
            log::error!("failed to stop loopback capture: {}", e);
            faults.push(e);
        }
        if let Err(e) = active.microphone.stop() {
            log::error!("failed to stop microphone capture: {}", e);
            faults.push(e);
        }

        let budget = drain::drain_budget(&active.system_buffer, &active.mic_buffer);
        let window = drain::window_size(&active.format, self.config.window_blocks);
        let report = match drain::drain(&active.mixer, active.sink.as_mut(), budget, window) {
            Ok(report) => report,
            Err(e) => {
                log::error!("drain aborted: {}", e);
                faults.push(e);
                DrainReport {
                    budget,
                    ..Default::default()
                }
            }
        };

        // Seal whatever made it out, even after a failed write.
        let finalized = match active.sink.finalize() {
            Ok(()) => true,
            Err(e) => {
                log::error!("failed to finalize output: {}", e);
                faults.push(e);
                false
            }
        };

        {
            let mut diagnostics = self.diagnostics.lock();
            diagnostics.drain_windows = report.windows;
            diagnostics.bytes_mixed = report.bytes_written;
        }

        let format = active.format;
        let started_at = active.started_at;
        let output_path = std::mem::take(&mut active.output_path);
        // Sources, buffers, mixer and sink are released before the session goes idle.
        drop(active);

        self.notify_state(RecordingState::Idle);
        log::info!(
            "recording stopped after {:.1}s wall clock: {} of {} budgeted bytes mixed",
            started_at.elapsed().as_secs_f64(),
            report.bytes_written,
            report.budget
        );

        let result = self.build_result(format, output_path, &report, finalized, &mut faults);

        if faults.is_empty() {
            if let Some(ref delegate) = self.delegate {
                delegate.on_recording_finished(&result);
            }
            Ok(Some(result))
        } else {
            if let Some(ref delegate) = self.delegate {
                faults.iter().for_each(|fault| delegate.on_error(fault));
            }
            Err(CaptureError::StopFailed(faults))
        }
    }

    // --- Internal helpers ---

    fn open_recording(&mut self, output_path: &Path) -> Result<ActiveRecording<B>, CaptureError> {
        self.config.validate().map_err(CaptureError::ConfigurationFailed)?;

        let output_path = paths::normalize_output_path(output_path, &self.config.output_format)?;
        paths::ensure_parent_dir(&output_path)?;

        let mut system = self.backend.open_loopback()?;
        let format = system.format();
        format.validate()?;

        let mut microphone = self.backend.open_microphone(&format)?;
        if microphone.format() != format {
            return Err(CaptureError::FormatMismatch(format!(
                "microphone delivers {}, loopback delivers {}",
                microphone.format(),
                format
            )));
        }

        let sink = (self.sink_factory)(&output_path, &format, &self.config.output_format)?;

        let system_buffer = Arc::new(BoundedAudioBuffer::new(
            AudioTrackType::System,
            format,
            self.config.buffer_duration,
        ));
        let mic_buffer = Arc::new(BoundedAudioBuffer::new(
            AudioTrackType::Mic,
            format,
            self.config.buffer_duration,
        ));
        let mixer = match StreamMixer::new(Arc::clone(&system_buffer), Arc::clone(&mic_buffer)) {
            Ok(mixer) => mixer,
            Err(e) => {
                discard_output(sink, &output_path);
                return Err(e);
            }
        };

        *self.diagnostics.lock() = SessionDiagnostics::default();
        // A fresh flag per recording: callbacks left over from an earlier
        // recording keep reading their own, long-cleared flag.
        let accepting = Arc::new(AtomicBool::new(true));

        let system_callback = self.chunk_route(AudioTrackType::System, &system_buffer, &accepting);
        let mic_callback = self.chunk_route(AudioTrackType::Mic, &mic_buffer, &accepting);

        if let Err(e) = system.start(system_callback) {
            accepting.store(false, Ordering::SeqCst);
            stop_quietly(&mut system, "loopback");
            discard_output(sink, &output_path);
            return Err(e);
        }
        if let Err(e) = microphone.start(mic_callback) {
            accepting.store(false, Ordering::SeqCst);
            stop_quietly(&mut system, "loopback");
            stop_quietly(&mut microphone, "microphone");
            discard_output(sink, &output_path);
            return Err(e);
        }

        Ok(ActiveRecording {
            system,
            microphone,
            system_buffer,
            mic_buffer,
            mixer,
            sink,
            accepting,
            format,
            output_path,
            started_at: Instant::now(),
        })
    }

    /// Callback that pushes a source's chunks into its own buffer.
    fn chunk_route(
        &self,
        track: AudioTrackType,
        buffer: &Arc<BoundedAudioBuffer>,
        accepting: &Arc<AtomicBool>,
    ) -> ChunkCallback {
        let buffer = Arc::clone(buffer);
        let accepting = Arc::clone(accepting);
        let diagnostics = Arc::clone(&self.diagnostics);
        let delegate = self.delegate.clone();

        Arc::new(move |chunk: &[u8]| {
            if !accepting.load(Ordering::SeqCst) {
                diagnostics.lock().late_chunks += 1;
                return;
            }

            match buffer.push(chunk) {
                Ok(()) => diagnostics.lock().record_accepted(track, chunk.len()),
                Err(e) => {
                    diagnostics.lock().record_rejected(track, chunk.len());
                    log::warn!("dropped captured chunk: {}", e);
                    if let Some(ref d) = delegate {
                        d.on_buffer_full(track, chunk.len());
                    }
                }
            }
        })
    }

    fn build_result(
        &self,
        format: WaveFormat,
        output_path: PathBuf,
        report: &DrainReport,
        finalized: bool,
        faults: &mut Vec<CaptureError>,
    ) -> RecordingResult {
        let duration_secs = format.duration_of(report.bytes_written as usize).as_secs_f64();

        let checksum = if finalized {
            storage::checksum::sha256_file(&output_path)
                .map_err(|e| log::debug!("no checksum for {}: {}", output_path.display(), e))
                .ok()
        } else {
            None
        };

        let mut metadata = RecordingMetadata::new_mixed(
            duration_secs,
            &output_path.to_string_lossy(),
            checksum.clone(),
            self.config.output_format,
            format,
        );
        {
            let diagnostics = self.diagnostics.lock();
            metadata.dropped_mic_bytes = diagnostics.mic_rejected_bytes;
            metadata.dropped_system_bytes = diagnostics.system_rejected_bytes;
        }

        if self.config.write_metadata && finalized {
            if let Err(e) = storage::metadata::write_metadata(&metadata, &output_path) {
                log::error!("failed to write metadata sidecar: {}", e);
                faults.push(e);
            }
        }

        RecordingResult {
            file_path: output_path,
            duration_secs,
            drain_budget: report.budget,
            bytes_mixed: report.bytes_written,
            checksum,
            metadata,
        }
    }

    fn notify_state(&self, state: RecordingState) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&state);
        }
    }
}

impl<B: CaptureBackend> Recorder for RecordingSession<B> {
    fn state(&self) -> RecordingState {
        RecordingSession::state(self)
    }

    fn start_recording(&mut self, output_path: &Path) -> Result<(), CaptureError> {
        RecordingSession::start_recording(self, output_path)
    }

    fn stop_recording(&mut self) -> Result<Option<RecordingResult>, CaptureError> {
        RecordingSession::stop_recording(self)
    }
}

impl<B: CaptureBackend> Drop for RecordingSession<B> {
    fn drop(&mut self) {
        if let Some(mut active) = self.active.take() {
            log::warn!(
                "recording session dropped while recording; {} is not finalized",
                active.output_path.display()
            );
            active.accepting.store(false, Ordering::SeqCst);
            stop_quietly(&mut active.system, "loopback");
            stop_quietly(&mut active.microphone, "microphone");
        }
    }
}

fn level(buffer: &BoundedAudioBuffer) -> BufferLevel {
    BufferLevel {
        available_bytes: buffer.available_bytes(),
        capacity_bytes: buffer.capacity_bytes(),
    }
}

fn stop_quietly<S: CaptureSource>(source: &mut S, name: &str) {
    if let Err(e) = source.stop() {
        log::warn!("failed to stop {} capture during rollback: {}", name, e);
    }
}

/// Drop a sink that never received audio and remove the file it created.
fn discard_output(sink: Box<dyn EncoderSink>, output_path: &Path) {
    drop(sink);
    if output_path.exists() {
        if let Err(e) = fs::remove_file(output_path) {
            log::warn!("failed to remove {}: {}", output_path.display(), e);
        }
    }
}
