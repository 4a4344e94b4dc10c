//! Opcode streams, and conversion between byte-offset jumps and labels.
//!
//! Forward jumps count from the byte holding their jump parameter, back
//! jumps (JMPB, JMPBL) count backwards from the start of the opcode. In
//! symbolic form the jump parameter holds a label number instead, and a
//! `Label` opcode sits in front of every jump target.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{CodecError, Result};
use crate::opcode::Opcode;

/// Decode a whole bytecode stream.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<Opcode>> {
    let mut opcodes = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        let op = Opcode::decode(&bytes[offset..]).map_err(|err| shift_offset(err, offset))?;
        offset += op.byte_len().max(1);
        opcodes.push(op);
    }
    Ok(opcodes)
}

fn shift_offset(err: CodecError, base: usize) -> CodecError {
    match err {
        CodecError::TruncatedSequence {
            what,
            offset,
            needed,
            available,
        } => CodecError::TruncatedSequence {
            what,
            offset: base + offset,
            needed,
            available,
        },
        other => other,
    }
}

/// Encode a stream. Labels produce no bytes.
pub fn encode_script(opcodes: &[Opcode]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(opcodes.iter().map(Opcode::byte_len).sum());
    for op in opcodes {
        if !matches!(op, Opcode::Label { .. }) {
            out.extend(op.encode()?);
        }
    }
    Ok(out)
}

/// Start offset of every opcode, plus the end of the stream.
fn positions(opcodes: &[Opcode]) -> Vec<usize> {
    let mut out = Vec::with_capacity(opcodes.len() + 1);
    let mut pos = 0;
    for op in opcodes {
        out.push(pos);
        pos += op.byte_len();
    }
    out.push(pos);
    out
}

fn jump_value(op: &Opcode) -> Option<(usize, i64)> {
    let index = op.jump_field_index()?;
    Some((index, op.fields()[index].value))
}

/// Replace byte-offset jumps by label numbers and insert the labels.
///
/// Labels are numbered by ascending target offset, starting at 0. A target
/// that is not an opcode boundary (or the end of the stream) is an error.
pub fn insert_labels(opcodes: &[Opcode]) -> Result<Vec<Opcode>> {
    let starts = positions(opcodes);
    let end = starts[opcodes.len()];
    let boundaries: HashSet<i64> = starts.iter().map(|&p| p as i64).collect();

    let mut jumps = Vec::new();
    let mut targets = BTreeMap::new();
    for (i, op) in opcodes.iter().enumerate() {
        let Some((field, value)) = jump_value(op) else {
            continue;
        };
        let pos = starts[i] as i64;
        let target = if op.is_back_jump() {
            pos - value
        } else {
            // jump_field_offset is Some whenever jump_value is.
            pos + op.jump_field_offset().unwrap_or(1) as i64 + value
        };
        if !boundaries.contains(&target) {
            return Err(CodecError::InvalidJumpTarget { index: i, target });
        }
        targets.insert(target as usize, 0u32);
        jumps.push((i, field, target as usize));
    }

    for (number, label) in targets.values_mut().enumerate() {
        *label = number as u32;
    }

    let mut out: Vec<Opcode> = opcodes.to_vec();
    for (i, field, target) in jumps {
        out[i].fields_mut()[field].value = i64::from(targets[&target]);
    }

    let mut with_labels = Vec::with_capacity(out.len() + targets.len());
    for (i, op) in out.into_iter().enumerate() {
        if let Some(&label) = targets.get(&starts[i]) {
            with_labels.push(Opcode::label(label));
        }
        with_labels.push(op);
    }
    if let Some(&label) = targets.get(&end) {
        with_labels.push(Opcode::label(label));
    }
    log::debug!("inserted {} labels", targets.len());
    Ok(with_labels)
}

/// Turn label numbers back into byte offsets and drop the labels.
///
/// Errors report the index of the jump within `opcodes`.
pub fn resolve_labels(opcodes: &[Opcode]) -> Result<Vec<Opcode>> {
    let starts = positions(opcodes);
    let mut labels: HashMap<u32, usize> = HashMap::new();
    for (i, op) in opcodes.iter().enumerate() {
        if let Opcode::Label { target } = op {
            if labels.insert(*target, starts[i]).is_some() {
                return Err(CodecError::DuplicateLabel { index: i, label: *target });
            }
        }
    }

    let mut out = Vec::with_capacity(opcodes.len());
    for (i, op) in opcodes.iter().enumerate() {
        if matches!(op, Opcode::Label { .. }) {
            continue;
        }
        let mut op = op.clone();
        if let Some((field, label)) = jump_value(&op) {
            let target = u32::try_from(label)
                .ok()
                .and_then(|l| labels.get(&l))
                .copied()
                .ok_or(CodecError::InvalidJumpTarget { index: i, target: label })?;
            let pos = starts[i] as i64;
            let offset = if op.is_back_jump() {
                pos - target as i64
            } else {
                target as i64 - pos - op.jump_field_offset().unwrap_or(1) as i64
            };
            let jump = &mut op.fields_mut()[field];
            let (_, max) = jump.range();
            if !(0..=max).contains(&offset) {
                return Err(CodecError::JumpOutOfRange { index: i, offset });
            }
            jump.value = offset;
        }
        out.push(op);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOP: u8 = 0x5F;

    fn round_trip(bytes: &[u8]) -> Vec<Opcode> {
        let ops = decode_script(bytes).unwrap();
        assert_eq!(encode_script(&ops).unwrap(), bytes);
        let symbolic = insert_labels(&ops).unwrap();
        let resolved = resolve_labels(&symbolic).unwrap();
        assert_eq!(resolved, ops);
        symbolic
    }

    #[test]
    fn decodes_a_stream_opcode_by_opcode() {
        let ops = decode_script(&[0x01, 0x02, 0x23, NOP, 0x0F, 0xF5, 0x01, 0x00]).unwrap();
        let names: Vec<_> = ops.iter().map(Opcode::name).collect();
        assert_eq!(names, vec!["REQ", "NOP", "ARROW", "RET"]);
    }

    #[test]
    fn truncated_streams_report_the_absolute_offset() {
        let err = decode_script(&[NOP, NOP, 0x24, 0x01]).unwrap_err();
        assert!(matches!(err, CodecError::TruncatedSequence { offset: 2, .. }), "{err:?}");
    }

    #[test]
    fn forward_jump_counts_from_its_parameter() {
        // JMPF +2 skips the NOP and lands on RET.
        let symbolic = round_trip(&[0x10, 0x02, NOP, 0x00]);
        assert_eq!(symbolic.len(), 4);
        assert_eq!(symbolic[0].fields()[0].value, 0);
        assert_eq!(symbolic[2], Opcode::label(0));
        assert_eq!(symbolic[3].name(), "RET");
    }

    #[test]
    fn conditional_jump_counts_from_its_parameter() {
        // IFUB at 0, jump byte at 5: +1 lands on the NOP at 6.
        let symbolic = round_trip(&[0x14, 0x00, 0x01, 0x02, 0x00, 0x01, NOP, 0x00]);
        assert_eq!(symbolic[1], Opcode::label(0));
        assert_eq!(symbolic[2].name(), "NOP");
    }

    #[test]
    fn back_jump_counts_from_the_opcode() {
        let symbolic = round_trip(&[NOP, 0x12, 0x01, 0x00]);
        assert_eq!(symbolic[0], Opcode::label(0));
        assert_eq!(symbolic[2].name(), "JMPB");
    }

    #[test]
    fn jump_to_the_end_of_the_stream_is_allowed() {
        let symbolic = round_trip(&[NOP, 0x10, 0x01]);
        assert_eq!(symbolic.last(), Some(&Opcode::label(0)));
    }

    #[test]
    fn labels_are_numbered_by_target() {
        // JMPF to offset 5, then JMPF to offset 4.
        let symbolic = round_trip(&[0x10, 0x04, 0x10, 0x01, NOP, 0x00]);
        let jumps: Vec<i64> = symbolic
            .iter()
            .filter(|op| op.is_jump())
            .map(|op| op.fields()[0].value)
            .collect();
        assert_eq!(jumps, vec![1, 0]);
    }

    #[test]
    fn jump_into_an_opcode_is_rejected() {
        // JMPF +0 lands on its own parameter byte.
        let ops = decode_script(&[0x10, 0x00, 0x00]).unwrap();
        assert_eq!(
            insert_labels(&ops),
            Err(CodecError::InvalidJumpTarget { index: 0, target: 1 })
        );
    }

    #[test]
    fn unknown_label_is_rejected() {
        let mut jmpf = Opcode::new(0x10).unwrap();
        jmpf.fields_mut()[0].value = 7;
        let ops = vec![jmpf, Opcode::label(0), Opcode::new(0x00).unwrap()];
        assert_eq!(
            resolve_labels(&ops),
            Err(CodecError::InvalidJumpTarget { index: 0, target: 7 })
        );
    }

    #[test]
    fn a_label_number_can_only_be_defined_once() {
        let mut jmpf = Opcode::new(0x10).unwrap();
        jmpf.fields_mut()[0].value = 0;
        let ops = vec![
            jmpf,
            Opcode::label(0),
            Opcode::new(NOP as u16).unwrap(),
            Opcode::label(0),
            Opcode::new(0x00).unwrap(),
        ];
        assert_eq!(
            resolve_labels(&ops),
            Err(CodecError::DuplicateLabel { index: 3, label: 0 })
        );
    }

    #[test]
    fn short_jumps_that_outgrow_their_field_are_rejected() {
        let mut ops = vec![Opcode::new(0x10).unwrap()];
        ops.extend((0..300).map(|_| Opcode::new(NOP as u16).unwrap()));
        ops.push(Opcode::label(0));
        ops.push(Opcode::new(0x00).unwrap());
        assert_eq!(
            resolve_labels(&ops),
            Err(CodecError::JumpOutOfRange { index: 0, offset: 301 })
        );

        // The long form reaches it.
        ops[0] = Opcode::new(0x11).unwrap();
        let resolved = resolve_labels(&ops).unwrap();
        assert_eq!(resolved[0].fields()[0].value, 302);
    }

    #[test]
    fn forward_jump_cannot_point_backwards() {
        let ops = vec![
            Opcode::label(0),
            Opcode::new(NOP as u16).unwrap(),
            Opcode::new(0x10).unwrap(),
        ];
        assert!(matches!(
            resolve_labels(&ops),
            Err(CodecError::JumpOutOfRange { index: 2, .. })
        ));
    }
}
