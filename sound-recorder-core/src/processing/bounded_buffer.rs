use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::audio_models::AudioTrackType;
use crate::models::error::CaptureError;
use crate::models::wave_format::WaveFormat;

/// Thread-safe FIFO byte buffer with a fixed capacity expressed as audio time.
///
/// One producer (a capture delivery thread) pushes, one consumer (the mixer)
/// pulls; both go through an internal `parking_lot::Mutex`, so the buffer is
/// shared as `Arc<BoundedAudioBuffer>` without further locking.
///
/// Overflow behavior: reject-and-report. A chunk that does not fit into the
/// free space is dropped whole and `BufferFull` is returned; stored audio is
/// never overwritten. Storage grows lazily, the capacity never changes.
#[derive(Debug)]
pub struct BoundedAudioBuffer {
    track: AudioTrackType,
    format: WaveFormat,
    capacity_duration: Duration,
    capacity_bytes: usize,
    bytes: Mutex<VecDeque<u8>>,
}

impl BoundedAudioBuffer {
    pub fn new(track: AudioTrackType, format: WaveFormat, capacity_duration: Duration) -> Self {
        Self {
            track,
            format,
            capacity_duration,
            capacity_bytes: format.bytes_for(capacity_duration),
            bytes: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a captured chunk.
    ///
    /// Returns `BufferFull` and leaves the buffer untouched if the chunk does
    /// not fit.
    pub fn push(&self, chunk: &[u8]) -> Result<(), CaptureError> {
        if chunk.is_empty() {
            return Ok(());
        }

        let mut bytes = self.bytes.lock();
        let free = self.capacity_bytes - bytes.len();
        if chunk.len() > free {
            return Err(CaptureError::BufferFull {
                track: self.track,
                requested: chunk.len(),
                free,
            });
        }
        bytes.extend(chunk);
        Ok(())
    }

    /// Remove and return up to `max_bytes` of the oldest bytes.
    ///
    /// Returns fewer bytes (possibly none) if fewer are buffered. Never blocks
    /// waiting for data.
    pub fn pull(&self, max_bytes: usize) -> Vec<u8> {
        let mut bytes = self.bytes.lock();
        let to_read = max_bytes.min(bytes.len());
        bytes.drain(..to_read).collect()
    }

    /// Number of bytes currently readable.
    pub fn available_bytes(&self) -> usize {
        self.bytes.lock().len()
    }

    pub fn free_bytes(&self) -> usize {
        self.capacity_bytes - self.available_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.lock().is_empty()
    }

    /// Audio time currently buffered.
    pub fn buffered_duration(&self) -> Duration {
        self.format.duration_of(self.available_bytes())
    }

    /// Drop everything buffered.
    pub fn clear(&self) {
        self.bytes.lock().clear();
    }

    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }

    pub fn capacity_duration(&self) -> Duration {
        self.capacity_duration
    }

    pub fn format(&self) -> &WaveFormat {
        &self.format
    }

    pub fn track(&self) -> AudioTrackType {
        self.track
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    /// 8-bit mono at 1000 Hz: one byte per millisecond.
    fn byte_per_ms() -> WaveFormat {
        WaveFormat::pcm(1000, 8, 1)
    }

    fn buffer(capacity_ms: u64) -> BoundedAudioBuffer {
        BoundedAudioBuffer::new(AudioTrackType::Mic, byte_per_ms(), Duration::from_millis(capacity_ms))
    }

    #[test]
    fn basic_push_pull() {
        let buf = buffer(10);
        buf.push(&[1, 2, 3]).unwrap();

        assert_eq!(buf.available_bytes(), 3);
        assert_eq!(buf.pull(3), vec![1, 2, 3]);
        assert!(buf.is_empty());
    }

    #[test]
    fn pull_partial() {
        let buf = buffer(10);
        buf.push(&[1, 2, 3, 4, 5]).unwrap();

        assert_eq!(buf.pull(3), vec![1, 2, 3]);
        assert_eq!(buf.available_bytes(), 2);

        let rest = buf.pull(10); // request more than available
        assert_eq!(rest, vec![4, 5]);
        assert!(buf.pull(10).is_empty());
    }

    #[test]
    fn capacity_derived_from_duration() {
        let format = WaveFormat::pcm(44100, 16, 2);
        let buf = BoundedAudioBuffer::new(AudioTrackType::System, format, Duration::from_secs(2));
        assert_eq!(buf.capacity_bytes(), 352_800);
        assert_eq!(buf.capacity_duration(), Duration::from_secs(2));
    }

    #[test]
    fn overflow_rejects_whole_chunk() {
        let buf = buffer(4);
        buf.push(&[1, 2, 3]).unwrap();

        let err = buf.push(&[4, 5]).unwrap_err();
        assert_eq!(
            err,
            CaptureError::BufferFull {
                track: AudioTrackType::Mic,
                requested: 2,
                free: 1,
            }
        );

        // Stored audio untouched, a chunk that fits still goes in.
        assert_eq!(buf.available_bytes(), 3);
        buf.push(&[9]).unwrap();
        assert_eq!(buf.pull(4), vec![1, 2, 3, 9]);
    }

    #[test]
    fn never_exceeds_capacity() {
        let buf = buffer(16);
        for round in 0..50u8 {
            let _ = buf.push(&[round; 5]);
            assert!(buf.available_bytes() <= buf.capacity_bytes());
            if round % 3 == 0 {
                buf.pull(4);
            }
        }
    }

    #[test]
    fn empty_operations() {
        let buf = buffer(10);
        assert!(buf.is_empty());
        assert!(buf.pull(5).is_empty());

        buf.push(&[]).unwrap();
        assert!(buf.is_empty());
        assert_eq!(buf.buffered_duration(), Duration::ZERO);
    }

    #[test]
    fn buffered_duration_tracks_fill() {
        let buf = buffer(1000);
        buf.push(&[0; 250]).unwrap();
        assert_eq!(buf.buffered_duration(), Duration::from_millis(250));
        assert_eq!(buf.free_bytes(), 750);
    }

    #[test]
    fn clear_drops_everything() {
        let buf = buffer(10);
        buf.push(&[1, 2, 3]).unwrap();
        buf.clear();
        assert!(buf.is_empty());
    }

    #[test]
    fn concurrent_pulls_are_a_prefix_in_push_order() {
        let buf = Arc::new(BoundedAudioBuffer::new(
            AudioTrackType::System,
            byte_per_ms(),
            Duration::from_secs(60),
        ));

        let producer = {
            let buf = Arc::clone(&buf);
            thread::spawn(move || {
                for i in 0..2000u32 {
                    let chunk: Vec<u8> = (0..7).map(|j| ((i * 7 + j) % 251) as u8).collect();
                    buf.push(&chunk).unwrap();
                }
            })
        };

        let mut pulled = Vec::new();
        while pulled.len() < 2000 * 7 {
            pulled.extend(buf.pull(13));
            if producer.is_finished() && buf.is_empty() {
                break;
            }
        }
        producer.join().unwrap();
        pulled.extend(buf.pull(usize::MAX));

        let expected: Vec<u8> = (0..2000u32 * 7).map(|k| (k % 251) as u8).collect();
        assert_eq!(pulled, expected);
    }
}
