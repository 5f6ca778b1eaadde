use std::sync::Arc;

use crate::models::error::CaptureError;
use crate::models::wave_format::{SampleLayout, WaveFormat};
use crate::processing::bounded_buffer::BoundedAudioBuffer;
use crate::processing::samples;

/// Pull-based additive mixer over the system and microphone buffers.
///
/// Each [`read`](StreamMixer::read) mixes whatever both buffers hold *now*:
///
/// * both hold data: the window is `min(window, system, mic)` bytes, so the
///   stream that is ahead keeps its surplus for the next read;
/// * only one holds data: that stream is mixed against silence;
/// * both empty: an empty window, immediately.
///
/// Window lengths are whole blocks of the shared format.
#[derive(Debug, Clone)]
pub struct StreamMixer {
    system: Arc<BoundedAudioBuffer>,
    microphone: Arc<BoundedAudioBuffer>,
    format: WaveFormat,
    layout: SampleLayout,
}

impl StreamMixer {
    /// Both buffers must share one format; there is no per-stream conversion.
    pub fn new(system: Arc<BoundedAudioBuffer>, microphone: Arc<BoundedAudioBuffer>) -> Result<Self, CaptureError> {
        let format = *system.format();
        if *microphone.format() != format {
            return Err(CaptureError::FormatMismatch(format!(
                "microphone buffer is {}, system buffer is {}",
                microphone.format(),
                format
            )));
        }
        let layout = format.sample_layout()?;
        Ok(Self {
            system,
            microphone,
            format,
            layout,
        })
    }

    /// Mix up to `window_size` bytes. Never blocks.
    ///
    /// Empty only when neither buffer holds a whole block (or `window_size`
    /// is below one block).
    pub fn read(&self, window_size: usize) -> Vec<u8> {
        loop {
            let ready = match (self.system.available_bytes(), self.microphone.available_bytes()) {
                (0, 0) => return Vec::new(),
                (0, only) | (only, 0) => only,
                (system, mic) => system.min(mic),
            };

            let len = self.format.floor_to_block(ready.min(window_size));
            if len > 0 {
                let system = self.system.pull(len);
                let mic = self.microphone.pull(len);
                return samples::mix_into(self.layout, &system, &mic);
            }

            // A fragment on one side must not hide whole blocks on the other.
            if window_size < self.format.block_align as usize || !self.discard_fragments() {
                return Vec::new();
            }
        }
    }

    pub fn format(&self) -> &WaveFormat {
        &self.format
    }

    pub fn system_buffer(&self) -> &Arc<BoundedAudioBuffer> {
        &self.system
    }

    pub fn microphone_buffer(&self) -> &Arc<BoundedAudioBuffer> {
        &self.microphone
    }

    // `push` accepts any byte count, so a buffer can end in a partial frame.
    // Once nothing else is queued behind it, it can never become a whole block.
    // Returns whether anything was dropped.
    fn discard_fragments(&self) -> bool {
        let align = self.format.block_align as usize;
        let mut dropped = false;
        for buffer in [&self.system, &self.microphone] {
            let available = buffer.available_bytes();
            if available > 0 && available < align {
                log::warn!("discarding {} byte fragment from {:?} buffer", available, buffer.track());
                buffer.pull(available);
                dropped = true;
            }
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::audio_models::AudioTrackType;

    fn buffers(format: WaveFormat) -> (Arc<BoundedAudioBuffer>, Arc<BoundedAudioBuffer>) {
        let capacity = Duration::from_secs(10);
        (
            Arc::new(BoundedAudioBuffer::new(AudioTrackType::System, format, capacity)),
            Arc::new(BoundedAudioBuffer::new(AudioTrackType::Mic, format, capacity)),
        )
    }

    fn i16_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn mixes_min_of_both_and_keeps_surplus() {
        let format = WaveFormat::pcm(8000, 8, 1);
        let (system, mic) = buffers(format);
        let system_data: Vec<u8> = (0..100).map(|i| 130 + (i % 50) as u8).collect();
        let mic_data: Vec<u8> = (0..60).map(|i| 140 + (i % 30) as u8).collect();
        system.push(&system_data).unwrap();
        mic.push(&mic_data).unwrap();

        let mixer = StreamMixer::new(Arc::clone(&system), Arc::clone(&mic)).unwrap();
        let mixed = mixer.read(1000);

        assert_eq!(mixed.len(), 60);
        let expected = samples::mix_into(SampleLayout::U8, &system_data[..60], &mic_data);
        assert_eq!(mixed, expected);
        assert_eq!(system.available_bytes(), 40);
        assert_eq!(mic.available_bytes(), 0);

        // The surplus comes out on the next read, against silence.
        assert_eq!(mixer.read(1000), system_data[60..].to_vec());
        assert!(mixer.read(1000).is_empty());
    }

    #[test]
    fn empty_buffers_return_nothing_without_blocking() {
        let (system, mic) = buffers(WaveFormat::ieee_float(48000, 2));
        let mixer = StreamMixer::new(system, mic).unwrap();
        assert!(mixer.read(8000).is_empty());
    }

    #[test]
    fn lone_stream_is_mixed_with_silence() {
        let format = WaveFormat::pcm(48000, 16, 2);
        let (system, mic) = buffers(format);
        mic.push(&i16_bytes(&[5, -5, 7, -7])).unwrap();

        let mixer = StreamMixer::new(system, mic).unwrap();
        assert_eq!(mixer.read(4000), i16_bytes(&[5, -5, 7, -7]));
    }

    #[test]
    fn window_limits_read_and_stays_block_aligned() {
        let format = WaveFormat::pcm(48000, 16, 2);
        let (system, mic) = buffers(format);
        system.push(&i16_bytes(&[1; 40])).unwrap();
        mic.push(&i16_bytes(&[2; 40])).unwrap();

        let mixer = StreamMixer::new(Arc::clone(&system), Arc::clone(&mic)).unwrap();
        // 10 bytes is 2.5 blocks: floored to 2 blocks.
        let mixed = mixer.read(10);
        assert_eq!(mixed, i16_bytes(&[3; 4]));
        assert_eq!(system.available_bytes(), 72);
        assert_eq!(mic.available_bytes(), 72);
    }

    #[test]
    fn torn_fragment_is_discarded() {
        let format = WaveFormat::pcm(48000, 16, 2);
        let (system, mic) = buffers(format);
        system.push(&[1, 2, 3]).unwrap();

        let mixer = StreamMixer::new(Arc::clone(&system), mic).unwrap();
        assert!(mixer.read(4000).is_empty());
        assert!(system.is_empty());
    }

    #[test]
    fn fragment_on_one_side_does_not_hide_the_other() {
        let format = WaveFormat::pcm(48000, 16, 2);
        let (system, mic) = buffers(format);
        // 1.5 blocks of system audio, 100 blocks of microphone audio.
        system.push(&i16_bytes(&[1, 1, 1])).unwrap();
        mic.push(&i16_bytes(&[2; 200])).unwrap();

        let mixer = StreamMixer::new(Arc::clone(&system), Arc::clone(&mic)).unwrap();
        assert_eq!(mixer.read(4000), i16_bytes(&[3, 3]));

        // The system fragment is dropped and the microphone keeps flowing.
        assert_eq!(mixer.read(4000), i16_bytes(&[2; 198]));
        assert!(system.is_empty());
        assert!(mic.is_empty());
        assert!(mixer.read(4000).is_empty());
    }

    #[test]
    fn rejects_mismatched_formats() {
        let capacity = Duration::from_secs(1);
        let system = Arc::new(BoundedAudioBuffer::new(
            AudioTrackType::System,
            WaveFormat::ieee_float(48000, 2),
            capacity,
        ));
        let mic = Arc::new(BoundedAudioBuffer::new(
            AudioTrackType::Mic,
            WaveFormat::pcm(44100, 16, 1),
            capacity,
        ));

        let err = StreamMixer::new(system, mic).unwrap_err();
        assert!(matches!(err, CaptureError::FormatMismatch(_)));
    }
}
