//! Bounded drain/encode pass: turns the open-ended pull mixer into a finite export.
//!
//! The budget is fixed at stop time from what both buffers hold. The pass
//! ends when the budget is spent or the mixer runs dry, whichever is first,
//! so it terminates even when nothing was captured.

use crate::models::error::CaptureError;
use crate::models::wave_format::WaveFormat;
use crate::processing::bounded_buffer::BoundedAudioBuffer;
use crate::processing::mixer::StreamMixer;
use crate::traits::encoder_sink::EncoderSink;

/// Outcome of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub budget: u64,
    pub bytes_written: u64,
    pub windows: u64,
}

/// Byte ceiling for the drain pass.
///
/// Each buffer's buffered duration times the bytes-per-second of its format;
/// the larger of the two wins so the longer stream is never truncated (the
/// shorter one is mixed as silence). Floored to whole blocks.
///
/// Sub-second durations count: the tail after the last whole second is
/// drained rather than cut off.
pub fn drain_budget(system: &BoundedAudioBuffer, microphone: &BoundedAudioBuffer) -> u64 {
    let bytes_for = |buffer: &BoundedAudioBuffer| {
        let format = buffer.format();
        let raw = buffer.buffered_duration().as_secs_f64() * format.average_bytes_per_second as f64;
        // Round before flooring: the duration round trip can land a hair under a whole byte.
        format.floor_to_block(raw.round() as usize) as u64
    };
    bytes_for(system).max(bytes_for(microphone))
}

/// Drain window size: `blocks` whole blocks of `format`.
pub fn window_size(format: &WaveFormat, blocks: usize) -> usize {
    format.block_align as usize * blocks.max(1)
}

/// Pull mixed windows and forward them to `sink` until `budget` bytes are
/// written or the mixer yields nothing.
///
/// The last request is trimmed to the remaining budget (rounded up to a
/// whole block). A sink failure aborts the pass as `EncodeFailed`; what was
/// already written stays written.
pub fn drain(
    mixer: &StreamMixer,
    sink: &mut dyn EncoderSink,
    budget: u64,
    window: usize,
) -> Result<DrainReport, CaptureError> {
    let format = *mixer.format();
    let mut report = DrainReport {
        budget,
        ..Default::default()
    };

    while report.bytes_written < budget {
        let remaining = (budget - report.bytes_written) as usize;
        let request = format.ceil_to_block(remaining.min(window));

        let mixed = mixer.read(request);
        if mixed.is_empty() {
            log::debug!(
                "mixer ran dry after {} of {} budgeted bytes",
                report.bytes_written,
                budget
            );
            break;
        }

        sink.write(&mixed).map_err(|e| match e {
            CaptureError::EncodeFailed(_) => e,
            other => CaptureError::EncodeFailed(other.to_string()),
        })?;
        report.bytes_written += mixed.len() as u64;
        report.windows += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::models::audio_models::AudioTrackType;

    /// Sink that keeps every window in memory.
    #[derive(Default)]
    struct CollectingSink {
        windows: Vec<Vec<u8>>,
        fail_after: Option<usize>,
        path: PathBuf,
    }

    impl EncoderSink for CollectingSink {
        fn write(&mut self, pcm: &[u8]) -> Result<(), CaptureError> {
            if self.fail_after == Some(self.windows.len()) {
                return Err(CaptureError::StorageError("disk full".into()));
            }
            self.windows.push(pcm.to_vec());
            Ok(())
        }

        fn finalize(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }

        fn output_path(&self) -> &Path {
            &self.path
        }
    }

    fn cd_buffers() -> (Arc<BoundedAudioBuffer>, Arc<BoundedAudioBuffer>) {
        let format = WaveFormat::pcm(44100, 16, 2);
        let capacity = Duration::from_secs(60);
        (
            Arc::new(BoundedAudioBuffer::new(AudioTrackType::System, format, capacity)),
            Arc::new(BoundedAudioBuffer::new(AudioTrackType::Mic, format, capacity)),
        )
    }

    #[test]
    fn budget_is_the_longer_recording() {
        let (system, mic) = cd_buffers();
        system.push(&vec![0u8; 176_400 * 10]).unwrap();
        mic.push(&vec![0u8; 176_400 * 4]).unwrap();
        assert_eq!(drain_budget(&system, &mic), 1_764_000);

        // Same answer with the roles swapped.
        assert_eq!(drain_budget(&mic, &system), 1_764_000);
    }

    #[test]
    fn budget_keeps_fractional_seconds() {
        let (system, mic) = cd_buffers();
        // 2.5 seconds
        system.push(&vec![0u8; 441_000]).unwrap();
        assert_eq!(drain_budget(&system, &mic), 441_000);
    }

    #[test]
    fn budget_of_empty_buffers_is_zero() {
        let (system, mic) = cd_buffers();
        assert_eq!(drain_budget(&system, &mic), 0);
    }

    #[test]
    fn window_is_whole_blocks() {
        assert_eq!(window_size(&WaveFormat::ieee_float(48000, 2), 1000), 8000);
        assert_eq!(window_size(&WaveFormat::pcm(8000, 8, 1), 0), 1);
    }

    #[test]
    fn drains_everything_within_budget() {
        let (system, mic) = cd_buffers();
        system.push(&vec![1u8; 10_000]).unwrap();
        mic.push(&vec![2u8; 4_000]).unwrap();
        let budget = drain_budget(&system, &mic);
        let mixer = StreamMixer::new(system, mic).unwrap();

        let mut sink = CollectingSink::default();
        let report = drain(&mixer, &mut sink, budget, 4000).unwrap();

        assert_eq!(report.bytes_written, 10_000);
        assert_eq!(report.windows, 3);
        let total: usize = sink.windows.iter().map(Vec::len).sum();
        assert_eq!(total, 10_000);
    }

    #[test]
    fn stops_at_budget() {
        let (system, mic) = cd_buffers();
        system.push(&vec![0u8; 10_000]).unwrap();
        let mixer = StreamMixer::new(Arc::clone(&system), mic).unwrap();

        let mut sink = CollectingSink::default();
        let report = drain(&mixer, &mut sink, 6_000, 4_000).unwrap();

        assert_eq!(report.bytes_written, 6_000);
        assert_eq!(system.available_bytes(), 4_000);
    }

    #[test]
    fn zero_budget_never_touches_the_sink() {
        let (system, mic) = cd_buffers();
        system.push(&vec![0u8; 400]).unwrap();
        let mixer = StreamMixer::new(system, mic).unwrap();

        let mut sink = CollectingSink::default();
        let report = drain(&mixer, &mut sink, 0, 4000).unwrap();
        assert_eq!(report, DrainReport::default());
        assert!(sink.windows.is_empty());
    }

    #[test]
    fn terminates_when_mixer_runs_dry_before_budget() {
        let (system, mic) = cd_buffers();
        system.push(&vec![0u8; 400]).unwrap();
        let mixer = StreamMixer::new(system, mic).unwrap();

        let mut sink = CollectingSink::default();
        let report = drain(&mixer, &mut sink, 1_000_000, 4000).unwrap();
        assert_eq!(report.bytes_written, 400);
    }

    #[test]
    fn fragment_in_one_buffer_does_not_end_the_pass() {
        let (system, mic) = cd_buffers();
        // 1.5 blocks of system audio, 100 blocks of microphone audio.
        system.push(&[0u8; 6]).unwrap();
        mic.push(&vec![2u8; 400]).unwrap();
        let budget = drain_budget(&system, &mic);
        let mixer = StreamMixer::new(Arc::clone(&system), Arc::clone(&mic)).unwrap();

        let mut sink = CollectingSink::default();
        let report = drain(&mixer, &mut sink, budget, 4000).unwrap();

        assert_eq!(budget, 400);
        assert_eq!(report.bytes_written, 400);
        assert!(mic.is_empty());
    }

    #[test]
    fn sink_failure_aborts_as_encode_failed() {
        let (system, mic) = cd_buffers();
        system.push(&vec![0u8; 12_000]).unwrap();
        let mixer = StreamMixer::new(system, mic).unwrap();

        let mut sink = CollectingSink {
            fail_after: Some(1),
            ..Default::default()
        };
        let err = drain(&mixer, &mut sink, 12_000, 4000).unwrap_err();
        assert!(matches!(err, CaptureError::EncodeFailed(msg) if msg.contains("disk full")));
        assert_eq!(sink.windows.len(), 1);
    }
}
