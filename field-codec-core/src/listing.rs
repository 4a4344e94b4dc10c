use std::fmt::Write as _;

use thiserror::Error;

use crate::error::CodecError;
use crate::opcode::{Field, Opcode, OPCODES};
use crate::schema::{schema_for, ParamType};

/// Errors raised while assembling a text listing.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("unknown opcode '{opcode}' on line {line}")]
    UnknownOpcode { line: usize, opcode: String },

    #[error("wrong argument count for {opcode} on line {line}: expected {expected}, got {got}")]
    WrongArgCount {
        line: usize,
        opcode: String,
        expected: usize,
        got: usize,
    },

    #[error("failed to parse integer '{token}' on line {line}")]
    ParseInt {
        line: usize,
        token: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("value '{token}' on line {line} is out of range for {kind}")]
    ValueOutOfRange {
        line: usize,
        token: String,
        kind: &'static str,
    },

    #[error("line {line}: {source}")]
    Codec {
        line: usize,
        #[source]
        source: CodecError,
    },
}

fn parse_int(line: usize, token: &str) -> Result<i64, ListingError> {
    let t = token.trim_end_matches(',');
    let (negative, digits) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t),
    };
    let res = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else {
        digits.parse::<i64>()
    };

    res.map(|v| if negative { -v } else { v })
        .map_err(|e| ListingError::ParseInt {
            line,
            token: t.to_string(),
            source: e,
        })
}

fn parse_byte(line: usize, token: &str, kind: &'static str) -> Result<u8, ListingError> {
    let v = parse_int(line, token)?;
    u8::try_from(v).map_err(|_| ListingError::ValueOutOfRange {
        line,
        token: token.to_string(),
        kind,
    })
}

fn lookup(mnemonic: &str) -> Option<u8> {
    OPCODES[..=0xFF]
        .iter()
        .position(|info| info.name.eq_ignore_ascii_case(mnemonic))
        .map(|id| id as u8)
}

fn push_args(line: &mut String, fields: &[Field]) {
    for field in fields {
        let _ = write!(line, " {}", field.value);
    }
}

/// One opcode per line. Escape opcodes print their sub-opcode in hex.
pub fn disassemble(opcodes: &[Opcode]) -> String {
    let mut out = String::new();
    for op in opcodes {
        let mut line = String::new();
        match op {
            Opcode::Ordinary { id, fields } => {
                line.push_str(OPCODES[*id as usize].name);
                push_args(&mut line, fields);
            }
            Opcode::Special { sub_id, fields } => {
                let _ = write!(line, "SPECIAL {sub_id:#04X}");
                push_args(&mut line, fields);
            }
            Opcode::Kawai { sub_id, fields } => {
                let _ = write!(line, "KAWAI {sub_id:#04X}");
                push_args(&mut line, fields);
            }
            Opcode::Label { target } => {
                let _ = write!(line, "LABEL {target}");
            }
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Parse a listing back into opcodes.
///
/// Line format: `MNEMONIC arg ...`, `SPECIAL sub arg ...`, `KAWAI sub arg
/// ...` or `LABEL n`, with decimal or 0x-prefixed numbers. Blank lines and
/// lines starting with `#` or `//` are ignored. Every argument is checked
/// against its parameter's range except jumps, which may hold label numbers
/// and are checked when the labels are resolved.
pub fn assemble(src: &str) -> Result<Vec<Opcode>, ListingError> {
    let mut out = Vec::new();

    for (idx, raw_line) in src.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }

        let mut parts = line.split_whitespace();
        let Some(op_tok) = parts.next() else {
            continue;
        };
        let opcode = op_tok.to_ascii_uppercase();
        let args: Vec<&str> = parts.collect();
        let codec = |source| ListingError::Codec {
            line: line_no,
            source,
        };

        let op = match opcode.as_str() {
            "LABEL" => {
                expect_args(line_no, &opcode, 1, &args)?;
                let target = parse_int(line_no, args[0])?;
                let (min, max) = ParamType::Label.descriptor().range();
                if !(min..=max).contains(&target) {
                    return Err(ListingError::ValueOutOfRange {
                        line: line_no,
                        token: args[0].to_string(),
                        kind: "label",
                    });
                }
                Opcode::label(target as u32)
            }
            "SPECIAL" | "KAWAI" => {
                let Some((sub, params)) = args.split_first() else {
                    return Err(ListingError::WrongArgCount {
                        line: line_no,
                        opcode: opcode.clone(),
                        expected: 1,
                        got: 0,
                    });
                };
                let sub_id = parse_byte(line_no, sub, "sub-opcode")?;
                let bytes = params
                    .iter()
                    .map(|t| parse_byte(line_no, t, "byte"))
                    .collect::<Result<Vec<u8>, _>>()?;
                if opcode == "SPECIAL" {
                    let special = Opcode::special(sub_id, &[]);
                    expect_args(line_no, &opcode, special.fields().len() + 1, &args)?;
                    Opcode::special(sub_id, &bytes)
                } else {
                    Opcode::kawai(sub_id, &bytes).map_err(codec)?
                }
            }
            _ => {
                let id = lookup(&opcode).ok_or_else(|| ListingError::UnknownOpcode {
                    line: line_no,
                    opcode: opcode.clone(),
                })?;
                assemble_ordinary(line_no, &opcode, id, &args)?
            }
        };
        out.push(op);
    }

    Ok(out)
}

fn expect_args(
    line: usize,
    opcode: &str,
    expected: usize,
    args: &[&str],
) -> Result<(), ListingError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ListingError::WrongArgCount {
            line,
            opcode: opcode.to_string(),
            expected,
            got: args.len(),
        })
    }
}

fn assemble_ordinary(
    line: usize,
    opcode: &str,
    id: u8,
    args: &[&str],
) -> Result<Opcode, ListingError> {
    let mut op =
        Opcode::new(u16::from(id)).map_err(|source| ListingError::Codec { line, source })?;

    if schema_for(u16::from(id)).is_empty() {
        let bytes = args
            .iter()
            .map(|t| parse_byte(line, t, "byte"))
            .collect::<Result<Vec<u8>, _>>()?;
        let mut expected = op.fields().len();
        if id == 0x1C {
            // Byte 5 sizes the extra payload.
            expected += bytes.get(4).map_or(0, |&n| usize::from(n.min(128)));
        }
        expect_args(line, opcode, expected, args)?;
        return Ok(Opcode::Ordinary {
            id,
            fields: bytes.into_iter().map(Field::raw).collect(),
        });
    }

    expect_args(line, opcode, op.fields().len(), args)?;
    for (field, token) in op.fields_mut().iter_mut().zip(args) {
        let value = parse_int(line, token)?;
        field.value = value;
        if !field.descriptor.kind.is_jump() && field.check_range().is_err() {
            return Err(ListingError::ValueOutOfRange {
                line,
                token: token.to_string(),
                kind: field.descriptor.kind.name(),
            });
        }
    }
    Ok(op)
}
