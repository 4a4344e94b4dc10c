//! Section 1 of a PC field: entity scripts and dialog texts.

use serde::Serialize;

use crate::error::{read_u16, read_u32, read_u8, take, CodecError, Result};

pub const SCRIPTS_PER_ENTITY: usize = 32;
const HEADER_LEN: usize = 32;
const NAME_LEN: usize = 8;
const TEXT_END: u8 = 0xFF;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Section1Header {
    pub version: u16,
    pub entity_count: u8,
    pub model_count: u8,
    pub text_offset: u16,
    pub akao_count: u16,
    pub scale: u16,
    pub creator: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub name: String,
    pub script_positions: [u16; SCRIPTS_PER_ENTITY],
}

/// Parsed layout of section 1, borrowing its bytes.
#[derive(Clone, Debug)]
pub struct Section1<'a> {
    data: &'a [u8],
    pub header: Section1Header,
    pub entities: Vec<Entity>,
    pub akao_offsets: Vec<u32>,
    /// Every script start plus the text offset, sorted and deduplicated.
    boundaries: Vec<u16>,
}

fn fixed_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

impl<'a> Section1<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        take(data, 0, HEADER_LEN, "section 1 header")?;
        let header = Section1Header {
            version: read_u16(data, 0, "version")?,
            entity_count: read_u8(data, 2, "entity count")?,
            model_count: read_u8(data, 3, "model count")?,
            text_offset: read_u16(data, 4, "text offset")?,
            akao_count: read_u16(data, 6, "AKAO count")?,
            scale: read_u16(data, 8, "scale")?,
            creator: fixed_str(take(data, 16, NAME_LEN, "creator")?),
            name: fixed_str(take(data, 24, NAME_LEN, "field name")?),
        };

        let entity_count = header.entity_count as usize;
        let mut pos = HEADER_LEN;
        let mut names = Vec::with_capacity(entity_count);
        for _ in 0..entity_count {
            names.push(fixed_str(take(data, pos, NAME_LEN, "entity name")?));
            pos += NAME_LEN;
        }

        let mut akao_offsets = Vec::with_capacity(header.akao_count as usize);
        for _ in 0..header.akao_count {
            akao_offsets.push(read_u32(data, pos, "AKAO offset")?);
            pos += 4;
        }

        let mut entities = Vec::with_capacity(entity_count);
        for name in names {
            let mut script_positions = [0u16; SCRIPTS_PER_ENTITY];
            for p in script_positions.iter_mut() {
                *p = read_u16(data, pos, "script position")?;
                pos += 2;
            }
            entities.push(Entity {
                name,
                script_positions,
            });
        }

        let text_offset = header.text_offset;
        if text_offset as usize > data.len() {
            return Err(CodecError::MalformedSize {
                what: "section 1 text offset",
                expected: data.len(),
                actual: text_offset as usize,
            });
        }
        let mut boundaries: Vec<u16> = entities
            .iter()
            .flat_map(|e| e.script_positions)
            .chain(std::iter::once(text_offset))
            .collect();
        boundaries.sort_unstable();
        boundaries.dedup();

        Ok(Section1 {
            data,
            header,
            entities,
            akao_offsets,
            boundaries,
        })
    }

    /// Bytecode of one script. A script runs up to the next script start, or
    /// to the texts for the last one.
    pub fn script(&self, entity: usize, index: usize) -> Result<&'a [u8]> {
        let start = self
            .entities
            .get(entity)
            .and_then(|e| e.script_positions.get(index))
            .copied()
            .ok_or(CodecError::MalformedSize {
                what: "script index",
                expected: self.entities.len() * SCRIPTS_PER_ENTITY,
                actual: entity * SCRIPTS_PER_ENTITY + index,
            })?;
        let end = self
            .boundaries
            .iter()
            .copied()
            .find(|&b| b > start)
            .unwrap_or(start);
        take(self.data, start as usize, (end - start) as usize, "script")
    }

    /// Scripts of every entity, skipping aliases of an earlier slot.
    pub fn scripts(&self) -> impl Iterator<Item = (usize, usize, Result<&'a [u8]>)> + '_ {
        self.entities.iter().enumerate().flat_map(move |(e, entity)| {
            (0..SCRIPTS_PER_ENTITY)
                .filter(move |&s| {
                    s == 0 || entity.script_positions[s] != entity.script_positions[s - 1]
                })
                .map(move |s| (e, s, self.script(e, s)))
        })
    }

    pub fn text_count(&self) -> Result<usize> {
        Ok(read_u16(self.data, self.header.text_offset as usize, "text count")? as usize)
    }

    /// Raw bytes of one dialog text, up to its terminator.
    pub fn text(&self, index: usize) -> Result<&'a [u8]> {
        let base = self.header.text_offset as usize;
        let rel = read_u16(self.data, base + 2 + 2 * index, "text position")? as usize;
        let rest = self
            .data
            .get(base + rel..)
            .ok_or(CodecError::TruncatedSequence {
                what: "text",
                offset: base + rel,
                needed: 1,
                available: 0,
            })?;
        let len = rest.iter().position(|&b| b == TEXT_END).unwrap_or(rest.len());
        Ok(&rest[..len])
    }
}

/// Printable form of an in-game text: plain characters map onto ASCII,
/// everything else is shown as `{XX}`.
pub fn decode_text(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            0x00..=0x5E => out.push(char::from(b + 0x20)),
            0xE7 => out.push('\n'),
            _ => out.push_str(&format!("{{{b:02X}}}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two entities, one AKAO block, three distinct scripts and two texts.
    fn fixture() -> Vec<u8> {
        let mut d = vec![0u8; HEADER_LEN];
        d[0..2].copy_from_slice(&0x0502u16.to_le_bytes());
        d[2] = 2;
        d[3] = 1;
        d[6..8].copy_from_slice(&1u16.to_le_bytes());
        d[8..10].copy_from_slice(&512u16.to_le_bytes());
        d[16..21].copy_from_slice(b"SQUAR");
        d[24..28].copy_from_slice(b"md1_");

        d.extend_from_slice(b"dir\0\0\0\0\0");
        d.extend_from_slice(b"cloud\0\0\0");
        d.extend_from_slice(&0x1234u32.to_le_bytes());

        let scripts_at = (d.len() + 2 * 2 * SCRIPTS_PER_ENTITY) as u16;
        // dir: script 0 at +0, script 1 at +2, rest aliases of script 1.
        // cloud: script 0 at +3.
        for s in 0..SCRIPTS_PER_ENTITY {
            let p = if s == 0 { scripts_at } else { scripts_at + 2 };
            d.extend_from_slice(&p.to_le_bytes());
        }
        for _ in 0..SCRIPTS_PER_ENTITY {
            d.extend_from_slice(&(scripts_at + 3).to_le_bytes());
        }
        d.extend_from_slice(&[0x5F, 0x00, 0x00, 0x10, 0x00, 0x00]);

        let texts = d.len() as u16;
        d[4..6].copy_from_slice(&texts.to_le_bytes());
        d.extend_from_slice(&2u16.to_le_bytes());
        d.extend_from_slice(&6u16.to_le_bytes());
        d.extend_from_slice(&9u16.to_le_bytes());
        d.extend_from_slice(&[0x28, 0x41, TEXT_END]);
        d.extend_from_slice(&[0x21, 0xE7, 0x00, TEXT_END]);
        d
    }

    #[test]
    fn parses_the_header() {
        let data = fixture();
        let s1 = Section1::parse(&data).unwrap();
        assert_eq!(s1.header.version, 0x0502);
        assert_eq!(s1.header.entity_count, 2);
        assert_eq!(s1.header.creator, "SQUAR");
        assert_eq!(s1.header.name, "md1_");
        assert_eq!(s1.akao_offsets, vec![0x1234]);
        let names: Vec<_> = s1.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["dir", "cloud"]);
    }

    #[test]
    fn scripts_end_at_the_next_start() {
        let data = fixture();
        let s1 = Section1::parse(&data).unwrap();
        assert_eq!(s1.script(0, 0).unwrap(), &[0x5F, 0x00]);
        assert_eq!(s1.script(0, 1).unwrap(), &[0x00]);
        assert_eq!(s1.script(0, 31).unwrap(), &[0x00]);
        assert_eq!(s1.script(1, 0).unwrap(), &[0x10, 0x00, 0x00]);
        assert!(s1.script(2, 0).is_err());

        let listed: Vec<_> = s1.scripts().map(|(e, s, _)| (e, s)).collect();
        assert_eq!(listed, vec![(0, 0), (0, 1), (1, 0)]);
    }

    #[test]
    fn reads_texts() {
        let data = fixture();
        let s1 = Section1::parse(&data).unwrap();
        assert_eq!(s1.text_count().unwrap(), 2);
        assert_eq!(decode_text(s1.text(0).unwrap()), "Ha");
        assert_eq!(decode_text(s1.text(1).unwrap()), "A\n ");
    }

    #[test]
    fn unprintable_bytes_are_escaped() {
        assert_eq!(decode_text(&[0x33, 0xEA, 0x34]), "S{EA}T");
    }

    #[test]
    fn short_sections_are_truncated() {
        let data = fixture();
        assert!(matches!(
            Section1::parse(&data[..40]),
            Err(CodecError::TruncatedSequence { .. })
        ));
    }
}
