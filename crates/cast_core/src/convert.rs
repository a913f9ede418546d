//! Sample Width Conversion
//!
//! In-place re-encoding of a planar region between the internal `f64le`
//! width and the integer / `f32le` widths decoders and devices use.
//!
//! Every element keeps its linear position (`slot * capacity + i`); only its
//! byte width changes. Narrowing walks forward and widening walks backward,
//! so an element is always read before anything overwrites it.

use crate::audio::Bits;
use crate::error::{SamplesError, SamplesResult};

/// Byte pattern of digital silence at `bits`
pub fn silence_byte(bits: Bits) -> u8 {
    match bits {
        Bits::U8 => 0x80,
        _ => 0x00,
    }
}

fn check_supported(bits: Bits) -> SamplesResult<()> {
    match bits {
        Bits::F16 | Bits::F24 => Err(SamplesError::UnsupportedConversion(bits)),
        _ => Ok(()),
    }
}

/// Decode one little-endian sample into `[-1, 1)` (floats pass through)
///
/// `bytes` must hold exactly `bits.size()` bytes.
#[inline]
pub fn decode_sample(bytes: &[u8], bits: Bits) -> f64 {
    match bits {
        Bits::U8 => (bytes[0] as f64 - 128.0) / 128.0,
        Bits::S16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64 / 32_768.0,
        Bits::S24 => {
            let raw = i32::from_le_bytes([0, bytes[0], bytes[1], bytes[2]]) >> 8;
            raw as f64 / 8_388_608.0
        }
        Bits::S32 => {
            i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64 / 2_147_483_648.0
        }
        Bits::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        Bits::F64 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes[..8]);
            f64::from_le_bytes(raw)
        }
        Bits::F16 | Bits::F24 => 0.0,
    }
}

/// Encode one sample, clamping to full scale for integer widths
#[inline]
pub fn encode_sample(value: f64, bits: Bits, out: &mut [u8]) {
    let v = if value.is_nan() { 0.0 } else { value };
    match bits {
        Bits::U8 => {
            out[0] = ((v * 128.0).round().clamp(-128.0, 127.0) + 128.0) as u8;
        }
        Bits::S16 => {
            let s = (v * 32_768.0).round().clamp(i16::MIN as f64, i16::MAX as f64) as i16;
            out[..2].copy_from_slice(&s.to_le_bytes());
        }
        Bits::S24 => {
            let s = (v * 8_388_608.0).round().clamp(-8_388_608.0, 8_388_607.0) as i32;
            out[..3].copy_from_slice(&s.to_le_bytes()[..3]);
        }
        Bits::S32 => {
            let s = (v * 2_147_483_648.0).round().clamp(i32::MIN as f64, i32::MAX as f64) as i32;
            out[..4].copy_from_slice(&s.to_le_bytes());
        }
        Bits::F32 => out[..4].copy_from_slice(&(v as f32).to_le_bytes()),
        Bits::F64 => out[..8].copy_from_slice(&v.to_le_bytes()),
        Bits::F16 | Bits::F24 => {}
    }
}

/// Re-encode `elements` samples stored contiguously in `bytes` from `from` to `to`
pub(crate) fn convert_region(bytes: &mut [u8], elements: usize, from: Bits, to: Bits) -> SamplesResult<()> {
    check_supported(from)?;
    check_supported(to)?;
    let (fw, tw) = (from.size(), to.size());
    if bytes.len() < elements * fw.max(tw) {
        return Err(SamplesError::CapacityExceeded {
            needed: elements * fw.max(tw),
            available: bytes.len(),
        });
    }

    let step = |i: usize, bytes: &mut [u8]| {
        let v = decode_sample(&bytes[i * fw..(i + 1) * fw], from);
        encode_sample(v, to, &mut bytes[i * tw..(i + 1) * tw]);
    };

    if tw <= fw {
        for i in 0..elements {
            step(i, bytes);
        }
    } else {
        for i in (0..elements).rev() {
            step(i, bytes);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_encode_points() {
        let mut buf = [0u8; 8];
        encode_sample(0.5, Bits::S16, &mut buf);
        assert_eq!(&buf[..2], &0x4000i16.to_le_bytes());
        assert_eq!(decode_sample(&buf[..2], Bits::S16), 0.5);

        encode_sample(-1.0, Bits::S24, &mut buf);
        assert_eq!(&buf[..3], &[0x00, 0x00, 0x80]);
        assert_eq!(decode_sample(&buf[..3], Bits::S24), -1.0);

        encode_sample(0.0, Bits::U8, &mut buf);
        assert_eq!(buf[0], 0x80);
    }

    #[test]
    fn test_integer_encode_clamps() {
        let mut buf = [0u8; 4];
        encode_sample(3.0, Bits::S16, &mut buf);
        assert_eq!(i16::from_le_bytes([buf[0], buf[1]]), i16::MAX);
        encode_sample(-3.0, Bits::S32, &mut buf);
        assert_eq!(i32::from_le_bytes(buf), i32::MIN);
        encode_sample(f64::NAN, Bits::S16, &mut buf);
        assert_eq!(i16::from_le_bytes([buf[0], buf[1]]), 0);
    }

    #[test]
    fn test_region_narrow_then_widen() {
        let values: [f64; 5] = [0.0, 0.25, -0.5, 0.75, -1.0];
        let mut storage = vec![0u8; values.len() * 8];
        for (i, v) in values.iter().enumerate() {
            storage[i * 8..i * 8 + 8].copy_from_slice(&v.to_le_bytes());
        }

        convert_region(&mut storage, values.len(), Bits::F64, Bits::S16).unwrap();
        for (i, v) in values.iter().enumerate() {
            assert_eq!(decode_sample(&storage[i * 2..i * 2 + 2], Bits::S16), *v);
        }

        convert_region(&mut storage, values.len(), Bits::S16, Bits::F64).unwrap();
        for (i, v) in values.iter().enumerate() {
            assert_eq!(decode_sample(&storage[i * 8..i * 8 + 8], Bits::F64), *v);
        }
    }

    #[test]
    fn test_unsupported_widths() {
        let mut storage = vec![0u8; 16];
        assert_eq!(
            convert_region(&mut storage, 2, Bits::F64, Bits::F16),
            Err(SamplesError::UnsupportedConversion(Bits::F16))
        );
    }
}
