//! Conversion between WASAPI `WAVEFORMATEX(TENSIBLE)` and [`WaveFormat`].

use windows::core::GUID;
use windows::Win32::Media::Audio::{WAVEFORMATEX, WAVEFORMATEXTENSIBLE, WAVEFORMATEXTENSIBLE_0, WAVE_FORMAT_PCM};
use windows::Win32::Media::KernelStreaming::{
    KSAUDIO_SPEAKER_MONO, KSAUDIO_SPEAKER_STEREO, KSDATAFORMAT_SUBTYPE_PCM, WAVE_FORMAT_EXTENSIBLE,
};
use windows::Win32::Media::Multimedia::{KSDATAFORMAT_SUBTYPE_IEEE_FLOAT, WAVE_FORMAT_IEEE_FLOAT};

use sound_recorder_core::models::error::CaptureError;
use sound_recorder_core::models::wave_format::{SampleEncoding, WaveFormat};

/// Read a device format.
///
/// # Safety
/// `raw` must point to a valid `WAVEFORMATEX`; when its tag is
/// `WAVE_FORMAT_EXTENSIBLE` the allocation must hold a full
/// `WAVEFORMATEXTENSIBLE`, as `GetMixFormat` guarantees.
pub unsafe fn wave_format_from_raw(raw: *const WAVEFORMATEX) -> Result<WaveFormat, CaptureError> {
    let format = unsafe { std::ptr::read_unaligned(raw) };
    let tag = format.wFormatTag as u32;

    let encoding = if tag == WAVE_FORMAT_EXTENSIBLE {
        let extensible = unsafe { std::ptr::read_unaligned(raw as *const WAVEFORMATEXTENSIBLE) };
        let sub_format = extensible.SubFormat;
        encoding_for_sub_format(sub_format)?
    } else if tag == WAVE_FORMAT_IEEE_FLOAT {
        SampleEncoding::IeeeFloat
    } else if tag == WAVE_FORMAT_PCM {
        SampleEncoding::Pcm
    } else {
        return Err(CaptureError::UnsupportedFormat(format!("device format tag {:#06x}", tag)));
    };

    let result = WaveFormat::with_encoding(
        encoding,
        format.nSamplesPerSec,
        format.wBitsPerSample,
        format.nChannels,
    );
    result.validate()?;
    Ok(result)
}

fn encoding_for_sub_format(sub_format: GUID) -> Result<SampleEncoding, CaptureError> {
    if sub_format == KSDATAFORMAT_SUBTYPE_IEEE_FLOAT {
        Ok(SampleEncoding::IeeeFloat)
    } else if sub_format == KSDATAFORMAT_SUBTYPE_PCM {
        Ok(SampleEncoding::Pcm)
    } else {
        Err(CaptureError::UnsupportedFormat(format!("device sub-format {:?}", sub_format)))
    }
}

/// Describe `format` to WASAPI, e.g. to force it on a microphone stream.
pub fn to_extensible(format: &WaveFormat) -> WAVEFORMATEXTENSIBLE {
    let header_size = std::mem::size_of::<WAVEFORMATEXTENSIBLE>() - std::mem::size_of::<WAVEFORMATEX>();
    let sub_format = match format.encoding {
        SampleEncoding::Pcm => KSDATAFORMAT_SUBTYPE_PCM,
        SampleEncoding::IeeeFloat => KSDATAFORMAT_SUBTYPE_IEEE_FLOAT,
    };
    let channel_mask = match format.channels {
        1 => KSAUDIO_SPEAKER_MONO,
        2 => KSAUDIO_SPEAKER_STEREO,
        _ => 0,
    };

    WAVEFORMATEXTENSIBLE {
        Format: WAVEFORMATEX {
            wFormatTag: WAVE_FORMAT_EXTENSIBLE as u16,
            nChannels: format.channels,
            nSamplesPerSec: format.sample_rate,
            nAvgBytesPerSec: format.average_bytes_per_second,
            nBlockAlign: format.block_align,
            wBitsPerSample: format.bits_per_sample,
            cbSize: header_size as u16,
        },
        Samples: WAVEFORMATEXTENSIBLE_0 {
            wValidBitsPerSample: format.bits_per_sample,
        },
        dwChannelMask: channel_mask,
        SubFormat: sub_format,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensible_round_trips_float_mix_format() {
        let format = WaveFormat::ieee_float(48000, 2);
        let raw = to_extensible(&format);
        let parsed = unsafe { wave_format_from_raw(&raw as *const WAVEFORMATEXTENSIBLE as *const WAVEFORMATEX) }.unwrap();
        assert_eq!(parsed, format);
    }

    #[test]
    fn plain_pcm_header_is_read() {
        let raw = WAVEFORMATEX {
            wFormatTag: WAVE_FORMAT_PCM as u16,
            nChannels: 1,
            nSamplesPerSec: 16000,
            nAvgBytesPerSec: 32000,
            nBlockAlign: 2,
            wBitsPerSample: 16,
            cbSize: 0,
        };
        let parsed = unsafe { wave_format_from_raw(&raw) }.unwrap();
        assert_eq!(parsed, WaveFormat::pcm(16000, 16, 1));
    }

    #[test]
    fn unknown_tag_is_unsupported() {
        let raw = WAVEFORMATEX {
            wFormatTag: 0x55,
            nChannels: 2,
            nSamplesPerSec: 44100,
            nAvgBytesPerSec: 16000,
            nBlockAlign: 1,
            wBitsPerSample: 0,
            cbSize: 0,
        };
        let err = unsafe { wave_format_from_raw(&raw) }.unwrap_err();
        assert!(matches!(err, CaptureError::UnsupportedFormat(_)));
    }
}
