//! WAV file format utilities.
//!
//! Generates the canonical 44-byte RIFF header for a [`WaveFormat`] and
//! patches its size fields once the data length is known.

use crate::models::wave_format::{SampleEncoding, WaveFormat};

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

const FORMAT_TAG_PCM: u16 = 1;
const FORMAT_TAG_IEEE_FLOAT: u16 = 3;

/// Generate a 44-byte WAV RIFF header.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    file size - 8 (36 + data_size)
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (format chunk size)
/// [20-21]  format tag: 1 = PCM, 3 = IEEE float
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  average bytes per second
/// [32-33]  block_align
/// [34-35]  bits per sample
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(format: &WaveFormat, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let format_tag = match format.encoding {
        SampleEncoding::Pcm => FORMAT_TAG_PCM,
        SampleEncoding::IeeeFloat => FORMAT_TAG_IEEE_FLOAT,
    };
    let chunk_size = 36 + data_size;

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&format_tag.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&format.average_bytes_per_second.to_le_bytes());
    header[32..34].copy_from_slice(&format.block_align.to_le_bytes());
    header[34..36].copy_from_slice(&format.bits_per_sample.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Patch the RIFF chunk size at offset 4 (total file size - 8).
pub fn patch_file_size(header: &mut [u8], total_file_size: u64) {
    let chunk_size = (total_file_size - 8) as u32;
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
}

/// Patch the data-size field at offset 40.
pub fn patch_data_size(header: &mut [u8], data_size: u64) {
    let data_size_u32 = data_size as u32;
    header[40..44].copy_from_slice(&data_size_u32.to_le_bytes());
}
