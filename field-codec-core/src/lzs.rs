//! LZS (Okumura LZSS) decompression of field files.

use crate::error::{read_u32, CodecError, Result};

const RING_SIZE: usize = 4096;
const RING_START: usize = RING_SIZE - 18;
const MIN_MATCH: usize = 3;

/// Decompress a `[u32 compressed size][payload]` stream.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let declared = read_u32(data, 0, "LZS size header")? as usize;
    let available = data.len() - 4;
    if declared > available {
        return Err(CodecError::Lzs("size header is larger than the stream"));
    }
    if declared < available {
        log::debug!("LZS stream has {} trailing bytes", available - declared);
    }
    decompress_raw(&data[4..4 + declared])
}

/// Decompress a headerless payload.
///
/// Each flag byte covers the next eight items, least significant bit first:
/// a set bit is a literal byte, a clear bit a two-byte back reference into a
/// 4 KiB ring buffer that starts zeroed with its cursor at 0xFEE.
pub fn decompress_raw(payload: &[u8]) -> Result<Vec<u8>> {
    if payload.is_empty() {
        return Err(CodecError::Lzs("empty stream"));
    }

    let mut out = Vec::with_capacity(payload.len() * 4);
    let mut window = Window::new();
    let mut input = payload.iter().copied();

    'stream: while let Some(flags) = input.next() {
        for bit in 0..8 {
            if flags & (1 << bit) != 0 {
                let Some(b) = input.next() else { break 'stream };
                window.push(b, &mut out);
                continue;
            }

            let (Some(lo), Some(hi)) = (input.next(), input.next()) else {
                break 'stream;
            };
            let offset = usize::from(lo) | (usize::from(hi & 0xF0) << 4);
            let length = usize::from(hi & 0x0F) + MIN_MATCH;
            // A reference may overlap the bytes it is producing.
            for k in 0..length {
                let b = window.get(offset + k);
                window.push(b, &mut out);
            }
        }
    }
    Ok(out)
}

struct Window {
    ring: [u8; RING_SIZE],
    cursor: usize,
}

impl Window {
    fn new() -> Self {
        Window {
            ring: [0; RING_SIZE],
            cursor: RING_START,
        }
    }

    fn get(&self, pos: usize) -> u8 {
        self.ring[pos % RING_SIZE]
    }

    fn push(&mut self, b: u8, out: &mut Vec<u8>) {
        out.push(b);
        self.ring[self.cursor] = b;
        self.cursor = (self.cursor + 1) % RING_SIZE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_header(payload: &[u8]) -> Vec<u8> {
        let mut data = (payload.len() as u32).to_le_bytes().to_vec();
        data.extend_from_slice(payload);
        data
    }

    #[test]
    fn literals_pass_through() {
        let payload = [0xFF, b'F', b'I', b'E', b'L', b'D', b'7', b'!', b'?'];
        assert_eq!(decompress(&with_header(&payload)).unwrap(), b"FIELD7!?");
    }

    #[test]
    fn back_references_repeat_history() {
        // "ab" as literals, then 4 bytes starting at ring position 0xFEE.
        let payload = [0b0000_0011, b'a', b'b', 0xEE, 0xF1];
        assert_eq!(decompress_raw(&payload).unwrap(), b"ababab");
    }

    #[test]
    fn references_before_any_output_read_zeroes() {
        let payload = [0b0000_0000, 0x00, 0x00];
        assert_eq!(decompress_raw(&payload).unwrap(), vec![0u8; 3]);
    }

    #[test]
    fn bad_headers_are_rejected() {
        assert!(matches!(decompress(&[1, 0]), Err(CodecError::TruncatedSequence { .. })));
        assert_eq!(
            decompress(&[9, 0, 0, 0, 0xFF, b'a']),
            Err(CodecError::Lzs("size header is larger than the stream"))
        );
        assert_eq!(decompress_raw(&[]), Err(CodecError::Lzs("empty stream")));
    }
}
