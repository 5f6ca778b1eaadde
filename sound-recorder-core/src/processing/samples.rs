//! Per-sample arithmetic over interleaved little-endian byte windows.
//!
//! Mixing is additive with saturation: the sum of two samples is clamped to
//! the range of the sample layout, never wrapped. No gain reduction is
//! applied, so two loud inputs clip rather than distort.

use crate::models::wave_format::SampleLayout;

const I24_MIN: i32 = -(1 << 23);
const I24_MAX: i32 = (1 << 23) - 1;

/// Mix two byte windows of the same layout.
///
/// The output is as long as the longer input; where only one input has a
/// sample the other counts as silence, so that sample passes through as is.
pub fn mix_into(layout: SampleLayout, a: &[u8], b: &[u8]) -> Vec<u8> {
    let (longer, shorter) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let mut mixed = longer.to_vec();

    let width = layout.bytes();
    let overlap = shorter.len() - shorter.len() % width;
    for (out, theirs) in mixed[..overlap]
        .chunks_exact_mut(width)
        .zip(shorter[..overlap].chunks_exact(width))
    {
        mix_sample(layout, out, theirs);
    }
    mixed
}

fn mix_sample(layout: SampleLayout, out: &mut [u8], other: &[u8]) {
    match layout {
        SampleLayout::U8 => {
            let sum = (out[0] as i16 - 128) + (other[0] as i16 - 128);
            out[0] = (sum.clamp(-128, 127) + 128) as u8;
        }
        SampleLayout::I16 => {
            let x = i16::from_le_bytes([out[0], out[1]]);
            let y = i16::from_le_bytes([other[0], other[1]]);
            out.copy_from_slice(&x.saturating_add(y).to_le_bytes());
        }
        SampleLayout::I24 => {
            let sum = (read_i24(out) + read_i24(other)).clamp(I24_MIN, I24_MAX);
            out.copy_from_slice(&sum.to_le_bytes()[..3]);
        }
        SampleLayout::I32 => {
            let x = i32::from_le_bytes([out[0], out[1], out[2], out[3]]);
            let y = i32::from_le_bytes([other[0], other[1], other[2], other[3]]);
            out.copy_from_slice(&x.saturating_add(y).to_le_bytes());
        }
        SampleLayout::F32 => {
            let x = f32::from_le_bytes([out[0], out[1], out[2], out[3]]);
            let y = f32::from_le_bytes([other[0], other[1], other[2], other[3]]);
            out.copy_from_slice(&(x + y).clamp(-1.0, 1.0).to_le_bytes());
        }
    }
}

fn read_i24(bytes: &[u8]) -> i32 {
    // Place the 24 bits in the top of an i32, then arithmetic-shift back down.
    i32::from_le_bytes([0, bytes[0], bytes[1], bytes[2]]) >> 8
}

/// Convert a byte window to 16-bit samples for encoders that take `i16`.
///
/// Wider integer samples keep their top 16 bits, float samples are clamped
/// to `[-1.0, 1.0]` before scaling. A trailing partial sample is ignored.
pub fn to_i16(layout: SampleLayout, bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(layout.bytes())
        .map(|s| match layout {
            SampleLayout::U8 => (s[0] as i16 - 128) << 8,
            SampleLayout::I16 => i16::from_le_bytes([s[0], s[1]]),
            SampleLayout::I24 => (read_i24(s) >> 8) as i16,
            SampleLayout::I32 => (i32::from_le_bytes([s[0], s[1], s[2], s[3]]) >> 16) as i16,
            SampleLayout::F32 => {
                let sample = f32::from_le_bytes([s[0], s[1], s[2], s[3]]).clamp(-1.0, 1.0);
                (sample * i16::MAX as f32) as i16
            }
        })
        .collect()
}
