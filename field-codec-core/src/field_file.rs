//! Decompressed PC field file: nine length-prefixed sections.

use serde::Serialize;

use crate::error::{read_u32, take, CodecError, Result};
use crate::lzs;

pub const SECTION_COUNT: usize = 9;
const HEADER_LEN: usize = 2 + 4 + SECTION_COUNT * 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum SectionKind {
    Scripts,
    Camera,
    ModelLoader,
    Palette,
    Walkmesh,
    TileMap,
    Encounter,
    Triggers,
    Background,
}

impl SectionKind {
    pub const ALL: [SectionKind; SECTION_COUNT] = [
        SectionKind::Scripts,
        SectionKind::Camera,
        SectionKind::ModelLoader,
        SectionKind::Palette,
        SectionKind::Walkmesh,
        SectionKind::TileMap,
        SectionKind::Encounter,
        SectionKind::Triggers,
        SectionKind::Background,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// A field split into sections. Each section keeps its own bytes, without
/// the length prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldFile {
    sections: Vec<Vec<u8>>,
}

impl FieldFile {
    /// Parse an LZS-compressed field as stored in `flevel.lgp`.
    pub fn from_compressed(data: &[u8]) -> Result<Self> {
        Self::parse(&lzs::decompress(data)?)
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        take(data, 0, HEADER_LEN, "field header")?;
        let count = read_u32(data, 2, "section count")? as usize;
        if count != SECTION_COUNT {
            return Err(CodecError::MalformedSize {
                what: "field section count",
                expected: SECTION_COUNT,
                actual: count,
            });
        }

        let mut sections = Vec::with_capacity(SECTION_COUNT);
        for kind in SectionKind::ALL {
            let pos = read_u32(data, 6 + kind.index() * 4, "section position")? as usize;
            let size = read_u32(data, pos, "section size")? as usize;
            sections.push(take(data, pos + 4, size, "section data")?.to_vec());
        }
        Ok(FieldFile { sections })
    }

    pub fn section(&self, kind: SectionKind) -> &[u8] {
        &self.sections[kind.index()]
    }

    pub fn set_section(&mut self, kind: SectionKind, data: Vec<u8>) {
        self.sections[kind.index()] = data;
    }

    /// Uncompressed file with the sections laid out back to back.
    pub fn save(&self) -> Vec<u8> {
        let total: usize = self.sections.iter().map(|s| s.len() + 4).sum();
        let mut out = Vec::with_capacity(HEADER_LEN + total);
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&(SECTION_COUNT as u32).to_le_bytes());
        let mut pos = HEADER_LEN;
        for section in &self.sections {
            out.extend_from_slice(&(pos as u32).to_le_bytes());
            pos += section.len() + 4;
        }
        for section in &self.sections {
            out.extend_from_slice(&(section.len() as u32).to_le_bytes());
            out.extend_from_slice(section);
        }
        out
    }
}
