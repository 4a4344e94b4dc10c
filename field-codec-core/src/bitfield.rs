//! Packing of opcode parameters at arbitrary bit offsets.
//!
//! Fields narrower than a byte are placed most-significant-bit first inside
//! the byte holding their offset and never straddle into the next byte.
//! Byte-sized and wider fields must start on a byte boundary and are stored
//! little-endian over `ceil(width / 8)` bytes.

use crate::error::{CodecError, Result};
use crate::schema::FieldDescriptor;

fn mask(bit_width: u8) -> u64 {
    (1u64 << bit_width) - 1
}

/// Byte index and, for narrow fields, the left shift inside that byte.
fn locate(bit_offset: usize, bit_width: u8) -> Result<(usize, u32)> {
    let misaligned = CodecError::MisalignedField {
        bit_offset,
        bit_width,
    };
    if bit_width == 0 || bit_width > 32 {
        return Err(misaligned);
    }

    let local = bit_offset % 8;
    if bit_width < 8 {
        let used = local + bit_width as usize;
        if used > 8 {
            return Err(misaligned);
        }
        Ok((bit_offset / 8, (8 - used) as u32))
    } else if local != 0 {
        Err(misaligned)
    } else {
        Ok((bit_offset / 8, 0))
    }
}

fn byte_span(bit_width: u8) -> usize {
    (bit_width as usize + 7) / 8
}

fn out_of_bounds(len: usize, byte: usize, needed: usize) -> CodecError {
    CodecError::TruncatedSequence {
        what: "opcode parameter",
        offset: byte,
        needed,
        available: len.saturating_sub(byte),
    }
}

/// Read the raw, unsigned bits of one field.
pub fn unpack_field(buf: &[u8], bit_offset: usize, bit_width: u8) -> Result<u32> {
    let (byte, shift) = locate(bit_offset, bit_width)?;
    let span = byte_span(bit_width);
    let bytes = buf
        .get(byte..byte + span)
        .ok_or_else(|| out_of_bounds(buf.len(), byte, span))?;

    if bit_width < 8 {
        return Ok(((bytes[0] >> shift) as u64 & mask(bit_width)) as u32);
    }

    let raw = bytes
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, &b)| acc | (u64::from(b) << (8 * i)));
    Ok((raw & mask(bit_width)) as u32)
}

/// Write one field. The value is truncated to `bit_width` bits; negative
/// values end up as their two's-complement pattern.
///
/// Narrow fields are OR-ed into their byte so sibling fields packed earlier
/// into the same byte survive. The buffer is expected to start zeroed.
pub fn pack_field(buf: &mut [u8], bit_offset: usize, bit_width: u8, value: i64) -> Result<()> {
    let (byte, shift) = locate(bit_offset, bit_width)?;
    let span = byte_span(bit_width);
    let len = buf.len();
    let bytes = buf
        .get_mut(byte..byte + span)
        .ok_or_else(|| out_of_bounds(len, byte, span))?;

    let raw = (value as u64) & mask(bit_width);
    if bit_width < 8 {
        bytes[0] |= (raw << shift) as u8;
    } else {
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = (raw >> (8 * i)) as u8;
        }
    }
    Ok(())
}

/// Reinterpret `raw` as a two's-complement number of `bit_width` bits.
pub fn sign_extend(raw: u32, bit_width: u8) -> i64 {
    if bit_width == 0 {
        return 0;
    }
    let raw = i64::from(raw) & mask(bit_width) as i64;
    let max = (1i64 << (bit_width - 1)) - 1;
    if raw > max {
        raw - (1i64 << bit_width)
    } else {
        raw
    }
}

/// Decode a field according to its descriptor.
pub fn read_value(buf: &[u8], bit_offset: usize, descriptor: &FieldDescriptor) -> Result<i64> {
    let raw = unpack_field(buf, bit_offset, descriptor.bit_width)?;
    Ok(if descriptor.signed {
        sign_extend(raw, descriptor.bit_width)
    } else {
        i64::from(raw)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParamType;

    #[test]
    fn signed_range_is_symmetric_around_the_sign_bit() {
        for w in [3u8, 4, 8, 16, 24] {
            let all_ones = ((1u64 << w) - 1) as u32;
            assert_eq!(sign_extend(all_ones, w), -1, "width {w}");
            assert_eq!(sign_extend(1 << (w - 1), w), -(1i64 << (w - 1)), "width {w}");
            assert_eq!(sign_extend((1 << (w - 1)) - 1, w), (1i64 << (w - 1)) - 1, "width {w}");
        }
    }

    #[test]
    fn narrow_fields_are_msb_first() {
        let mut buf = [0u8; 2];
        // REQ: group 8, priority 3, script 5.
        pack_field(&mut buf, 0, 8, 0x12).unwrap();
        pack_field(&mut buf, 8, 3, 0b101).unwrap();
        pack_field(&mut buf, 11, 5, 0b00011).unwrap();
        assert_eq!(buf, [0x12, 0b1010_0011]);
        assert_eq!(unpack_field(&buf, 8, 3).unwrap(), 0b101);
        assert_eq!(unpack_field(&buf, 11, 5).unwrap(), 0b00011);
    }

    #[test]
    fn single_bits_do_not_disturb_siblings() {
        let mut buf = [0u8; 1];
        pack_field(&mut buf, 0, 1, 1).unwrap();
        pack_field(&mut buf, 3, 1, 1).unwrap();
        let before = buf[0];
        pack_field(&mut buf, 5, 1, 1).unwrap();
        assert_eq!(buf[0] & before, before);
        assert_eq!(buf[0], 0b1001_0100);
        pack_field(&mut buf, 6, 1, 0).unwrap();
        assert_eq!(buf[0], 0b1001_0100);
    }

    #[test]
    fn wide_fields_are_little_endian() {
        let mut buf = [0u8; 6];
        pack_field(&mut buf, 0, 16, 0xFEFF).unwrap();
        pack_field(&mut buf, 16, 24, 0x00AB_CDEF).unwrap();
        assert_eq!(buf, [0xFF, 0xFE, 0xEF, 0xCD, 0xAB, 0x00]);
        assert_eq!(unpack_field(&buf, 16, 24).unwrap(), 0x00AB_CDEF);
    }

    #[test]
    fn negative_values_write_twos_complement() {
        let mut buf = [0u8; 2];
        pack_field(&mut buf, 0, 16, -2).unwrap();
        assert_eq!(buf, [0xFE, 0xFF]);
        let coord = ParamType::CoordX.descriptor();
        assert_eq!(read_value(&buf, 0, &coord).unwrap(), -2);
        assert_eq!(read_value(&buf, 0, &ParamType::Word.descriptor()).unwrap(), 0xFFFE);
    }

    #[test]
    fn out_of_range_values_are_truncated() {
        let mut buf = [0u8; 1];
        pack_field(&mut buf, 0, 4, 0x1F).unwrap();
        assert_eq!(buf[0], 0xF0);
    }

    #[test]
    fn reading_past_the_end_is_an_error() {
        let buf = [0u8; 2];
        assert!(matches!(
            unpack_field(&buf, 8, 16),
            Err(CodecError::TruncatedSequence { offset: 1, needed: 2, available: 1, .. })
        ));
        let mut buf = [0u8; 1];
        assert!(pack_field(&mut buf, 8, 8, 1).is_err());
    }

    #[test]
    fn straddling_fields_are_rejected() {
        let buf = [0u8; 2];
        assert_eq!(
            unpack_field(&buf, 6, 4),
            Err(CodecError::MisalignedField { bit_offset: 6, bit_width: 4 })
        );
        assert!(unpack_field(&buf, 4, 8).is_err());
    }
}
