use thiserror::Error;

/// Errors raised by the field codecs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("{what} has {actual} bytes, expected {expected}")]
    MalformedSize {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{what} needs {needed} bytes at offset {offset}, only {available} available")]
    TruncatedSequence {
        what: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("unknown opcode {0:#04X}")]
    UnknownOpcode(u16),

    #[error("no free tile slot left in layer {layer}")]
    CapacityExceeded { layer: u8 },

    #[error("{bit_width}-bit field at bit offset {bit_offset} is not aligned")]
    MisalignedField { bit_offset: usize, bit_width: u8 },

    #[error("tile {0:#06X} not found")]
    TileNotFound(u16),

    #[error("invalid tile: {0}")]
    InvalidTile(&'static str),

    #[error("jump at opcode {index} targets byte {target}, which is not an opcode boundary")]
    InvalidJumpTarget { index: usize, target: i64 },

    #[error("label {label} at opcode {index} is already defined")]
    DuplicateLabel { index: usize, label: u32 },

    #[error("jump at opcode {index} needs offset {offset}, which does not fit its field")]
    JumpOutOfRange { index: usize, offset: i64 },

    #[error("value {value} is out of range {min}..={max}")]
    ValueOutOfRange { value: i64, min: i64, max: i64 },

    #[error("missing '{0}' marker")]
    MissingMarker(&'static str),

    #[error("LZS: {0}")]
    Lzs(&'static str),
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Borrow `len` bytes at `offset`, reporting what was being read on failure.
pub(crate) fn take<'a>(
    data: &'a [u8],
    offset: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8]> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or(CodecError::TruncatedSequence {
            what,
            offset,
            needed: len,
            available: data.len().saturating_sub(offset),
        })
}

pub(crate) fn read_u8(data: &[u8], offset: usize, what: &'static str) -> Result<u8> {
    Ok(take(data, offset, 1, what)?[0])
}

pub(crate) fn read_u16(data: &[u8], offset: usize, what: &'static str) -> Result<u16> {
    let b = take(data, offset, 2, what)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

pub(crate) fn read_u32(data: &[u8], offset: usize, what: &'static str) -> Result<u32> {
    let b = take(data, offset, 4, what)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}
