//! Raw PCM helpers for the 16 kHz mono `f32` format the model consumes.

use byteorder::{ByteOrder, LittleEndian};

use crate::audio::convert::ConversionError;
use crate::stt::SAMPLE_RATE;

/// Decode a raw little-endian `f32` byte stream (ffmpeg's `f32le`) into
/// samples.
///
/// An empty stream decodes to an empty buffer.  A length that is not a
/// multiple of 4 means the tool was interrupted mid-sample and is rejected.
pub fn decode_f32le(bytes: &[u8]) -> Result<Vec<f32>, ConversionError> {
    if bytes.len() % 4 != 0 {
        return Err(ConversionError::Malformed { len: bytes.len() });
    }
    let mut samples = vec![0.0f32; bytes.len() / 4];
    LittleEndian::read_f32_into(bytes, &mut samples);
    Ok(samples)
}

/// Duration of a 16 kHz mono buffer in seconds.
pub fn duration_secs(samples: &[f32]) -> f32 {
    samples.len() as f32 / SAMPLE_RATE as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_little_endian_floats() {
        let mut bytes = Vec::new();
        for v in [0.0f32, 1.0, -0.5] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(decode_f32le(&bytes).unwrap(), vec![0.0, 1.0, -0.5]);
    }

    #[test]
    fn empty_stream_is_empty_buffer() {
        assert!(decode_f32le(&[]).unwrap().is_empty());
    }

    #[test]
    fn truncated_sample_is_rejected() {
        let err = decode_f32le(&[0, 0, 128]).unwrap_err();
        assert!(matches!(err, ConversionError::Malformed { len: 3 }));
    }

    #[test]
    fn duration_of_two_seconds() {
        let samples = vec![0.0f32; 32_000];
        assert!((duration_secs(&samples) - 2.0).abs() < 1e-6);
    }
}
