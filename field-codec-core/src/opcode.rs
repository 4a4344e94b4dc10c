//! Field script opcodes: decoding from and encoding to the engine bytecode.

use serde::Serialize;

use crate::bitfield::{pack_field, read_value};
use crate::error::{read_u8, take, CodecError, Result};
use crate::schema::{schema_for, FieldDescriptor, ParamType};

pub const SPECIAL: u8 = 0x0F;
pub const KAWAI: u8 = 0x28;
/// Synthetic id of jump targets. Never stored in a script.
pub const LABEL_ID: u16 = 0x100;
/// First byte of a serialised label: the low byte of `LABEL_ID`.
pub const LABEL_MARKER: u8 = (LABEL_ID & 0xFF) as u8;
pub const LABEL_LEN: usize = 5;

const KAWAI_HEADER_LEN: usize = 3;
const OP_1C: u8 = 0x1C;
const OP_1C_MAX_EXTRA: u8 = 128;

#[derive(Copy, Clone, Debug)]
pub struct OpcodeInfo {
    pub name: &'static str,
    /// Total length in bytes, id byte included. Escapes and 0x1C are longer
    /// than this depending on their payload.
    pub length: u8,
    pub documented: bool,
}

const fn op(name: &'static str, length: u8) -> OpcodeInfo {
    OpcodeInfo {
        name,
        length,
        documented: true,
    }
}

const fn unused(name: &'static str, length: u8) -> OpcodeInfo {
    OpcodeInfo {
        name,
        length,
        documented: false,
    }
}

pub const OPCODES: [OpcodeInfo; 257] = [
    op("RET", 1), op("REQ", 3), op("REQSW", 3), op("REQEW", 3),
    op("PREQ", 3), op("PRQSW", 3), op("PRQEW", 3), op("RETTO", 2),
    op("JOIN", 2), op("SPLIT", 15), op("SPTYE", 6), op("GTPYE", 6),
    unused("UNUSED0C", 1), unused("UNUSED0D", 1), op("DSKCG", 2), op("SPECIAL", 2),
    // 0x10
    op("JMPF", 2), op("JMPFL", 3), op("JMPB", 2), op("JMPBL", 3),
    op("IFUB", 6), op("IFUBL", 7), op("IFSW", 8), op("IFSWL", 9),
    op("IFUW", 8), op("IFUWL", 9), unused("UNUSED1A", 10), unused("UNUSED1B", 3),
    unused("UNUSED1C", 6), unused("UNUSED1D", 1), unused("UNUSED1E", 1), unused("UNUSED1F", 1),
    // 0x20
    op("MINIGAME", 11), op("TUTOR", 2), op("BTMD2", 5), op("BTRLD", 3),
    op("WAIT", 3), op("NFADE", 9), op("BLINK", 2), op("BGMOVIE", 2),
    op("KAWAI", 3), op("KAWIW", 1), op("PMOVA", 2), op("SLIP", 2),
    op("BGPDH", 5), op("BGSCR", 7), op("WCLS", 2), op("WSIZW", 10),
    // 0x30
    op("IFKEY", 4), op("IFKEYON", 4), op("IFKEYOFF", 4), op("UC", 2),
    op("PDIRA", 2), op("PTURA", 4), op("WSPCL", 5), op("WNUMB", 8),
    op("STTIM", 6), op("GOLDu", 6), op("GOLDd", 6), op("CHGLD", 4),
    op("HMPMAX1", 1), op("HMPMAX2", 1), op("MHMMX", 1), op("HMPMAX3", 1),
    // 0x40
    op("MESSAGE", 3), op("MPARA", 5), op("MPRA2", 6), op("MPNAM", 2),
    unused("UNUSED44", 1), op("MPu", 5), unused("UNUSED46", 1), op("MPd", 5),
    op("ASK", 7), op("MENU", 4), op("MENU2", 2), op("BTLTB", 2),
    unused("UNUSED4C", 1), op("HPu", 5), unused("UNUSED4E", 1), op("HPd", 5),
    // 0x50
    op("WINDOW", 10), op("WMOVE", 6), op("WMODE", 4), op("WREST", 2),
    op("WCLSE", 2), op("WROW", 3), op("GWCOL", 7), op("SWCOL", 7),
    op("STITM", 5), op("DLITM", 5), op("CKITM", 5), op("SMTRA", 7),
    op("DMTRA", 8), op("CMTRA", 10), op("SHAKE", 8), op("NOP", 1),
    // 0x60
    op("MAPJUMP", 10), op("SCRLO", 2), op("SCRLC", 5), op("SCRLA", 6),
    op("SCR2D", 6), op("SCRCC", 1), op("SCR2DC", 9), op("SCRLW", 1),
    op("SCR2DL", 9), op("MPDSP", 2), op("VWOFT", 7), op("FADE", 9),
    op("FADEW", 1), op("IDLCK", 4), op("LSTMP", 3), op("SCRLP", 6),
    // 0x70
    op("BATTLE", 4), op("BTLON", 2), op("BTLMD", 3), op("PGTDR", 4),
    op("GETPC", 4), op("PXYZI", 8), op("PLUS!", 4), op("PLUS2!", 5),
    op("MINUS!", 4), op("MINUS2!", 5), op("INC!", 3), op("INC2!", 3),
    op("DEC!", 3), op("DEC2!", 3), op("TLKON", 2), op("RDMSD", 3),
    // 0x80
    op("SETBYTE", 4), op("SETWORD", 5), op("BITON", 4), op("BITOFF", 4),
    op("BITXOR", 4), op("PLUS", 4), op("PLUS2", 5), op("MINUS", 4),
    op("MINUS2", 5), op("MUL", 4), op("MUL2", 5), op("DIV", 4),
    op("DIV2", 5), op("MOD", 4), op("MOD2", 5), op("AND", 4),
    // 0x90
    op("AND2", 5), op("OR", 4), op("OR2", 5), op("XOR", 4),
    op("XOR2", 5), op("INC", 3), op("INC2", 3), op("DEC", 3),
    op("DEC2", 3), op("RANDOM", 3), op("LBYTE", 4), op("HBYTE", 5),
    op("2BYTE", 6), op("SETX", 7), op("GETX", 7), op("SEARCHX", 11),
    // 0xa0
    op("PC", 2), op("CHAR", 2), op("DFANM", 3), op("ANIME1", 3),
    op("VISI", 2), op("XYZI", 11), op("XYI", 9), op("XYZ", 9),
    op("MOVE", 6), op("CMOVE", 6), op("MOVA", 2), op("TURA", 4),
    op("ANIMW", 1), op("FMOVE", 6), op("ANIME2", 3), op("ANIM!1", 3),
    // 0xb0
    op("CANIM1", 5), op("CANM!1", 5), op("MSPED", 4), op("DIR", 3),
    op("TURNGEN", 6), op("TURN", 6), op("DIRA", 2), op("GETDIR", 4),
    op("GETAXY", 5), op("GETAI", 4), op("ANIM!2", 3), op("CANIM2", 5),
    op("CANM!2", 5), op("ASPED", 4), unused("UNUSEDBE", 1), op("CC", 2),
    // 0xc0
    op("JUMP", 11), op("AXYZI", 8), op("LADER", 15), op("OFST", 12),
    op("OFSTW", 1), op("TALKR", 3), op("SLIDR", 3), op("SOLID", 2),
    op("PRTYP", 2), op("PRTYM", 2), op("PRTYE", 4), op("IFPRTYQ", 3),
    op("IFMEMBQ", 3), op("MMBud", 3), op("MMBLK", 2), op("MMBUK", 2),
    // 0xd0
    op("LINE", 13), op("LINON", 2), op("MPJPO", 2), op("SLINE", 16),
    op("SIN", 10), op("COS", 10), op("TLKR2", 4), op("SLDR2", 4),
    op("PMJMP", 3), op("PMJMP2", 1), op("AKAO2", 15), op("FCFIX", 2),
    op("CCANM", 4), op("ANIMB", 1), op("TURNW", 1), op("MPPAL", 11),
    // 0xe0
    op("BGON", 4), op("BGOFF", 4), op("BGROL", 3), op("BGROL2", 3),
    op("BGCLR", 3), op("STPAL", 5), op("LDPAL", 5), op("CPPAL", 5),
    op("RTPAL", 7), op("ADPAL", 10), op("MPPAL2", 10), op("STPLS", 5),
    op("LDPLS", 5), op("CPPAL2", 8), op("RTPAL2", 8), op("ADPAL2", 11),
    // 0xf0
    op("MUSIC", 2), op("SOUND", 5), op("AKAO", 14), op("MUSVT", 2),
    op("MUSVM", 2), op("MULCK", 2), op("BMUSC", 2), op("CHMPH", 4),
    op("PMVIE", 2), op("MOVIE", 1), op("MVIEF", 3), op("MVCAM", 2),
    op("FMUSC", 2), op("CMUSC", 8), op("CHMST", 3), op("GAMEOVER", 1),
    // label
    op("LABEL", 0),
];

/// Fixed length of an opcode, id byte included.
pub fn opcode_length(id: u16) -> Option<usize> {
    OPCODES.get(id as usize).map(|info| info.length as usize)
}

/// Parameter bytes following the SPECIAL sub-opcode.
pub fn special_param_len(sub_id: u8) -> usize {
    match sub_id {
        0xF5 | 0xF6 | 0xF7 | 0xFB | 0xFC => 1,
        0xF8 | 0xFD => 2,
        _ => 0,
    }
}

pub fn special_name(sub_id: u8) -> Option<&'static str> {
    Some(match sub_id {
        0xF5 => "ARROW",
        0xF6 => "PNAME",
        0xF7 => "GMSPD",
        0xF8 => "SMSPD",
        0xF9 => "FLMAT",
        0xFA => "FLITM",
        0xFB => "BTLCK",
        0xFC => "MVLCK",
        0xFD => "SPCNM",
        0xFE => "RSGLB",
        0xFF => "CLITM",
        _ => return None,
    })
}

pub fn kawai_name(sub_id: u8) -> Option<&'static str> {
    Some(match sub_id {
        0x00 => "EYETX",
        0x01 => "TRNSP",
        0x02 => "AMBNT",
        0x06 => "LIGHT",
        0x0A => "SBOBJ",
        0x0D => "SHINE",
        0xFF => "RESET",
        _ => return None,
    })
}

/// One decoded parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Field {
    pub descriptor: FieldDescriptor,
    pub value: i64,
}

impl Field {
    pub fn new(kind: ParamType, value: i64) -> Self {
        Field {
            descriptor: kind.descriptor(),
            value,
        }
    }

    pub fn raw(byte: u8) -> Self {
        Field {
            descriptor: FieldDescriptor::RAW_BYTE,
            value: i64::from(byte),
        }
    }

    pub fn range(&self) -> (i64, i64) {
        self.descriptor.range()
    }

    /// Encoding silently truncates; callers validating user input check here
    /// first.
    pub fn check_range(&self) -> Result<()> {
        let (min, max) = self.range();
        if (min..=max).contains(&self.value) {
            Ok(())
        } else {
            Err(CodecError::ValueOutOfRange {
                value: self.value,
                min,
                max,
            })
        }
    }
}

fn raw_fields(payload: &[u8]) -> Vec<Field> {
    payload.iter().copied().map(Field::raw).collect()
}

fn payload_bytes(fields: &[Field]) -> usize {
    let bits: usize = fields.iter().map(|f| f.descriptor.bit_width as usize).sum();
    (bits + 7) / 8
}

fn pack_fields(buf: &mut [u8], start_bit: usize, fields: &[Field]) -> Result<()> {
    let mut offset = start_bit;
    for field in fields {
        pack_field(buf, offset, field.descriptor.bit_width, field.value)?;
        offset += field.descriptor.bit_width as usize;
    }
    Ok(())
}

/// A field script instruction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum Opcode {
    /// Any opcode with a fixed layout, typed or raw.
    Ordinary { id: u8, fields: Vec<Field> },
    /// 0x0F, dispatching on a sub-opcode with a 0 to 2 byte payload.
    Special { sub_id: u8, fields: Vec<Field> },
    /// 0x28, whose length byte covers a free-form payload.
    Kawai { sub_id: u8, fields: Vec<Field> },
    /// Jump target inserted by the symbolic layer.
    Label { target: u32 },
}

impl Opcode {
    /// Opcode `id` with every parameter zeroed.
    pub fn new(id: u16) -> Result<Self> {
        if id == LABEL_ID {
            return Ok(Opcode::label(0));
        }
        let byte = u8::try_from(id).map_err(|_| CodecError::UnknownOpcode(id))?;
        match byte {
            SPECIAL => Ok(Opcode::special(0xFF, &[])),
            KAWAI => Opcode::kawai(0, &[]),
            _ => {
                let schema = schema_for(id);
                let fields = if schema.is_empty() {
                    let len = match byte {
                        OP_1C => 5,
                        _ => OPCODES[byte as usize].length as usize - 1,
                    };
                    vec![Field::raw(0); len]
                } else {
                    schema
                        .fields()
                        .map(|descriptor| Field {
                            descriptor,
                            value: 0,
                        })
                        .collect()
                };
                Ok(Opcode::Ordinary { id: byte, fields })
            }
        }
    }

    /// SPECIAL sub-opcode. Missing payload bytes are zero, extra ones dropped.
    pub fn special(sub_id: u8, params: &[u8]) -> Self {
        let mut payload = vec![0u8; special_param_len(sub_id)];
        for (dst, src) in payload.iter_mut().zip(params) {
            *dst = *src;
        }
        Opcode::Special {
            sub_id,
            fields: raw_fields(&payload),
        }
    }

    /// KAWAI sub-opcode. Its length byte is `params.len() + 3`.
    pub fn kawai(sub_id: u8, params: &[u8]) -> Result<Self> {
        let max = u8::MAX as usize - KAWAI_HEADER_LEN;
        if params.len() > max {
            return Err(CodecError::MalformedSize {
                what: "KAWAI parameters",
                expected: max,
                actual: params.len(),
            });
        }
        Ok(Opcode::Kawai {
            sub_id,
            fields: raw_fields(params),
        })
    }

    pub fn label(target: u32) -> Self {
        Opcode::Label { target }
    }

    /// Decode the opcode at the front of `bytes`. Trailing bytes are ignored;
    /// `byte_len` of the result tells how many were consumed.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let id = read_u8(bytes, 0, "opcode id")?;
        match id {
            SPECIAL => {
                let sub_id = read_u8(bytes, 1, "SPECIAL sub-opcode")?;
                let payload = take(bytes, 2, special_param_len(sub_id), "SPECIAL parameters")?;
                Ok(Opcode::Special {
                    sub_id,
                    fields: raw_fields(payload),
                })
            }
            KAWAI => {
                let length = read_u8(bytes, 1, "KAWAI length")? as usize;
                if length < KAWAI_HEADER_LEN {
                    return Err(CodecError::MalformedSize {
                        what: "KAWAI opcode",
                        expected: KAWAI_HEADER_LEN,
                        actual: length,
                    });
                }
                let sub_id = read_u8(bytes, 2, "KAWAI sub-opcode")?;
                let payload = take(bytes, 3, length - KAWAI_HEADER_LEN, "KAWAI parameters")?;
                Ok(Opcode::Kawai {
                    sub_id,
                    fields: raw_fields(payload),
                })
            }
            _ => Self::decode_ordinary(id, bytes),
        }
    }

    fn decode_ordinary(id: u8, bytes: &[u8]) -> Result<Self> {
        let info = &OPCODES[id as usize];
        if !info.documented {
            log::warn!("opcode {:#04X} ({}) is undocumented, keeping raw bytes", id, info.name);
        }

        let schema = schema_for(u16::from(id));
        if schema.is_empty() {
            let mut len = info.length as usize - 1;
            if id == OP_1C {
                let extra = read_u8(bytes, 5, "opcode 0x1C size")?.min(OP_1C_MAX_EXTRA);
                len += extra as usize;
            }
            let payload = take(bytes, 1, len, "opcode parameters")?;
            return Ok(Opcode::Ordinary {
                id,
                fields: raw_fields(payload),
            });
        }

        let body = take(bytes, 0, info.length as usize, "opcode")?;
        let mut offset = 8;
        let mut fields = Vec::with_capacity(schema.len());
        for descriptor in schema.fields() {
            let value = read_value(body, offset, &descriptor)?;
            offset += descriptor.bit_width as usize;
            fields.push(Field { descriptor, value });
        }
        Ok(Opcode::Ordinary { id, fields })
    }

    /// Decode the 5-byte editor form of a label: marker byte, then the
    /// target as a little-endian u32.
    pub fn decode_label(bytes: &[u8]) -> Result<Self> {
        let raw = take(bytes, 0, LABEL_LEN, "label")?;
        if raw[0] != LABEL_MARKER {
            return Err(CodecError::MissingMarker("label"));
        }
        let target = u32::from_le_bytes([raw[1], raw[2], raw[3], raw[4]]);
        Field::new(ParamType::Label, i64::from(target)).check_range()?;
        Ok(Opcode::Label { target })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Opcode::Ordinary { id, fields } => {
                let mut buf = vec![0u8; 1 + payload_bytes(fields)];
                buf[0] = *id;
                pack_fields(&mut buf, 8, fields)?;
                Ok(buf)
            }
            Opcode::Special { sub_id, fields } => {
                let mut buf = vec![0u8; 2 + payload_bytes(fields)];
                buf[0] = SPECIAL;
                buf[1] = *sub_id;
                pack_fields(&mut buf, 16, fields)?;
                Ok(buf)
            }
            Opcode::Kawai { sub_id, fields } => {
                let length = KAWAI_HEADER_LEN + payload_bytes(fields);
                let length_byte = u8::try_from(length).map_err(|_| CodecError::MalformedSize {
                    what: "KAWAI opcode",
                    expected: u8::MAX as usize,
                    actual: length,
                })?;
                let mut buf = vec![0u8; length];
                buf[0] = KAWAI;
                buf[1] = length_byte;
                buf[2] = *sub_id;
                pack_fields(&mut buf, 24, fields)?;
                Ok(buf)
            }
            Opcode::Label { target } => {
                Field::new(ParamType::Label, i64::from(*target)).check_range()?;
                let mut buf = Vec::with_capacity(LABEL_LEN);
                buf.push(LABEL_MARKER);
                buf.extend_from_slice(&target.to_le_bytes());
                Ok(buf)
            }
        }
    }

    /// Length inside a script. Labels take no space there.
    pub fn byte_len(&self) -> usize {
        match self {
            Opcode::Ordinary { fields, .. } => 1 + payload_bytes(fields),
            Opcode::Special { fields, .. } => 2 + payload_bytes(fields),
            Opcode::Kawai { fields, .. } => KAWAI_HEADER_LEN + payload_bytes(fields),
            Opcode::Label { .. } => 0,
        }
    }

    pub fn id(&self) -> u16 {
        match self {
            Opcode::Ordinary { id, .. } => u16::from(*id),
            Opcode::Special { .. } => u16::from(SPECIAL),
            Opcode::Kawai { .. } => u16::from(KAWAI),
            Opcode::Label { .. } => LABEL_ID,
        }
    }

    pub fn sub_id(&self) -> Option<u8> {
        match self {
            Opcode::Special { sub_id, .. } | Opcode::Kawai { sub_id, .. } => Some(*sub_id),
            _ => None,
        }
    }

    /// Mnemonic of the opcode, resolving escape sub-opcodes when known.
    pub fn name(&self) -> &'static str {
        match self {
            Opcode::Special { sub_id, .. } => special_name(*sub_id).unwrap_or("SPECIAL"),
            Opcode::Kawai { sub_id, .. } => kawai_name(*sub_id).unwrap_or("KAWAI"),
            _ => OPCODES[self.id() as usize].name,
        }
    }

    pub fn fields(&self) -> &[Field] {
        match self {
            Opcode::Ordinary { fields, .. }
            | Opcode::Special { fields, .. }
            | Opcode::Kawai { fields, .. } => fields,
            Opcode::Label { .. } => &[],
        }
    }

    pub fn fields_mut(&mut self) -> &mut [Field] {
        match self {
            Opcode::Ordinary { fields, .. }
            | Opcode::Special { fields, .. }
            | Opcode::Kawai { fields, .. } => fields,
            Opcode::Label { .. } => &mut [],
        }
    }

    pub fn jump_field_index(&self) -> Option<usize> {
        match self {
            Opcode::Ordinary { fields, .. } => {
                fields.iter().position(|f| f.descriptor.kind.is_jump())
            }
            _ => None,
        }
    }

    pub fn is_jump(&self) -> bool {
        self.jump_field_index().is_some()
    }

    /// JMPB and JMPBL count their offset backwards from the opcode start.
    pub fn is_back_jump(&self) -> bool {
        matches!(self, Opcode::Ordinary { id: 0x12 | 0x13, .. })
    }

    /// Byte offset of the jump parameter from the start of the opcode.
    pub fn jump_field_offset(&self) -> Option<usize> {
        let index = self.jump_field_index()?;
        let bits: usize = self.fields()[..index]
            .iter()
            .map(|f| f.descriptor.bit_width as usize)
            .sum();
        Some(1 + bits / 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(id: u8, len: usize) -> Vec<u8> {
        let mut bytes: Vec<u8> = (0..len)
            .map(|i| (i as u8).wrapping_mul(37).wrapping_add(id))
            .collect();
        bytes[0] = id;
        bytes
    }

    #[test]
    fn schemas_fill_their_opcode_exactly() {
        for id in 0..=0xFFu16 {
            let schema = schema_for(id);
            if schema.is_empty() {
                continue;
            }
            let len = opcode_length(id).unwrap();
            assert_eq!(schema.bit_len(), (len - 1) * 8, "opcode {id:#04X}");

            let mut offset = 0;
            for d in schema.fields() {
                if d.bit_width < 8 {
                    assert!(offset % 8 + d.bit_width as usize <= 8, "opcode {id:#04X}");
                } else {
                    assert_eq!(offset % 8, 0, "opcode {id:#04X}");
                }
                offset += d.bit_width as usize;
            }
        }
    }

    #[test]
    fn every_typed_opcode_round_trips() {
        for id in 0..=0xFFu8 {
            if schema_for(u16::from(id)).is_empty() {
                continue;
            }
            let bytes = fixture(id, OPCODES[id as usize].length as usize);
            let op = Opcode::decode(&bytes).unwrap();
            assert_eq!(op.byte_len(), bytes.len(), "opcode {id:#04X}");
            assert_eq!(op.encode().unwrap(), bytes, "opcode {id:#04X}");
        }
    }

    #[test]
    fn raw_opcodes_round_trip_too() {
        for id in [0x00u8, 0x1A, 0x5E, 0x9D, 0xE5, 0xF2, 0xFF] {
            let bytes = fixture(id, OPCODES[id as usize].length as usize);
            let op = Opcode::decode(&bytes).unwrap();
            assert!(op.fields().iter().all(|f| f.descriptor == FieldDescriptor::RAW_BYTE));
            assert_eq!(op.encode().unwrap(), bytes, "opcode {id:#04X}");
        }
    }

    #[test]
    fn req_unpacks_priority_and_script() {
        let op = Opcode::decode(&[0x01, 0x05, 0b0110_0011]).unwrap();
        let values: Vec<i64> = op.fields().iter().map(|f| f.value).collect();
        assert_eq!(values, vec![5, 3, 3]);
        assert_eq!(op.name(), "REQ");
    }

    #[test]
    fn signed_coordinates_decode_negative() {
        // XYZI with constant banks, x = -1, y = -32768, z = 32767, triangle 7.
        let bytes = [
            0xA5, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x80, 0xFF, 0x7F, 0x07, 0x00,
        ];
        let op = Opcode::decode(&bytes).unwrap();
        let values: Vec<i64> = op.fields().iter().map(|f| f.value).collect();
        assert_eq!(values, vec![0, 0, 0, 0, -1, -32768, 32767, 7]);
        assert_eq!(op.encode().unwrap(), bytes);
    }

    #[test]
    fn special_payload_depends_on_sub_opcode() {
        let op = Opcode::decode(&[0x0F, 0xF8, 0x12, 0x34, 0x99]).unwrap();
        assert_eq!(op.sub_id(), Some(0xF8));
        assert_eq!(op.fields(), &[Field::raw(0x12), Field::raw(0x34)]);
        assert_eq!(op.byte_len(), 4);
        assert_eq!(op.name(), "SMSPD");

        let op = Opcode::decode(&[0x0F, 0x00]).unwrap();
        assert_eq!(op.sub_id(), Some(0x00));
        assert!(op.fields().is_empty());
        assert_eq!(op.encode().unwrap(), vec![0x0F, 0x00]);

        let op = Opcode::decode(&[0x0F, 0xF5, 0x01]).unwrap();
        assert_eq!(op.fields().len(), 1);
    }

    #[test]
    fn special_is_truncated_without_its_payload() {
        assert!(matches!(
            Opcode::decode(&[0x0F, 0xFD, 0x01]),
            Err(CodecError::TruncatedSequence { .. })
        ));
    }

    #[test]
    fn kawai_length_covers_its_parameters() {
        let op = Opcode::kawai(0x06, &[1, 2, 3, 4]).unwrap();
        let bytes = op.encode().unwrap();
        assert_eq!(bytes, vec![0x28, 7, 0x06, 1, 2, 3, 4]);
        assert_eq!(Opcode::decode(&bytes).unwrap(), op);
        assert_eq!(op.name(), "LIGHT");

        let empty = Opcode::kawai(0xFF, &[]).unwrap().encode().unwrap();
        assert_eq!(empty, vec![0x28, 3, 0xFF]);
    }

    #[test]
    fn kawai_rejects_impossible_lengths() {
        assert!(matches!(
            Opcode::decode(&[0x28, 0x02, 0x00]),
            Err(CodecError::MalformedSize { actual: 2, .. })
        ));
        assert!(Opcode::kawai(0, &[0u8; 253]).is_err());
        assert!(Opcode::kawai(0, &[0u8; 252]).is_ok());
    }

    #[test]
    fn label_fixture() {
        // Editor-side shape: low byte of 0x100, then the target.
        let bytes = [0x00, 0x2A, 0x00, 0x00, 0x00];
        let op = Opcode::decode_label(&bytes).unwrap();
        assert_eq!(op, Opcode::label(42));
        assert_eq!(op.id(), LABEL_ID);
        assert_eq!(op.encode().unwrap(), bytes);
        assert_eq!(op.byte_len(), 0);

        // The same first byte read as a script opcode is RET.
        assert_eq!(Opcode::decode(&bytes).unwrap().name(), "RET");
        assert_eq!(
            Opcode::decode_label(&[0x01, 0, 0, 0, 0]),
            Err(CodecError::MissingMarker("label"))
        );
    }

    #[test]
    fn label_numbers_stop_at_the_signed_maximum() {
        let top = Opcode::label(0x7FFF_FFFF);
        assert_eq!(top.encode().unwrap(), [0x00, 0xFF, 0xFF, 0xFF, 0x7F]);
        assert_eq!(
            Opcode::label(0x8000_0000).encode(),
            Err(CodecError::ValueOutOfRange {
                value: 0x8000_0000,
                min: 0,
                max: 0x7FFF_FFFF,
            })
        );
        assert!(matches!(
            Opcode::decode_label(&[0x00, 0x00, 0x00, 0x00, 0x80]),
            Err(CodecError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn opcode_1c_carries_a_sized_payload() {
        let bytes = [0x1C, 0x00, 0x10, 0x00, 0x00, 0x02, 0xAA, 0xBB];
        let op = Opcode::decode(&bytes).unwrap();
        assert_eq!(op.fields().len(), 7);
        assert_eq!(op.byte_len(), 8);
        assert_eq!(op.encode().unwrap(), bytes);
    }

    #[test]
    fn undocumented_opcodes_decode_without_arguments() {
        let op = Opcode::decode(&[0x0C, 0x40]).unwrap();
        assert_eq!(op.byte_len(), 1);
        assert!(op.fields().is_empty());
    }

    #[test]
    fn new_builds_zeroed_opcodes() {
        let op = Opcode::new(0x58).unwrap();
        assert_eq!(op.encode().unwrap(), vec![0x58, 0, 0, 0, 0]);
        assert_eq!(Opcode::new(0x5E).unwrap().byte_len(), 8);
        assert_eq!(Opcode::new(LABEL_ID).unwrap(), Opcode::label(0));
        assert_eq!(Opcode::new(0x101), Err(CodecError::UnknownOpcode(0x101)));
    }

    #[test]
    fn jump_metadata() {
        let ifub = Opcode::decode(&[0x14, 0x10, 0x05, 0x01, 0x00, 0x09]).unwrap();
        assert!(ifub.is_jump());
        assert!(!ifub.is_back_jump());
        assert_eq!(ifub.jump_field_index(), Some(5));
        assert_eq!(ifub.jump_field_offset(), Some(5));

        let jmpb = Opcode::decode(&[0x12, 0x04]).unwrap();
        assert!(jmpb.is_back_jump());
        assert_eq!(jmpb.jump_field_offset(), Some(1));

        let ifkey = Opcode::decode(&[0x30, 0x20, 0x00, 0x03]).unwrap();
        assert_eq!(ifkey.jump_field_offset(), Some(3));

        assert!(!Opcode::new(0x40).unwrap().is_jump());
    }

    #[test]
    fn range_checks_flag_truncating_values() {
        let mut op = Opcode::new(0x01).unwrap();
        op.fields_mut()[1].value = 8;
        assert_eq!(
            op.fields()[1].check_range(),
            Err(CodecError::ValueOutOfRange { value: 8, min: 0, max: 7 })
        );
        assert!(Field::new(ParamType::CoordY, -5).check_range().is_ok());
    }
}
