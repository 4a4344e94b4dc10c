//! PC background section: palettes, tile records and texture pages.
//!
//! The section is read in three chained stages. Palette alpha flags sit at
//! byte 12, right before the tile layers; the texture pages start a fixed
//! gap after the last tile layer ends, so they cannot be located without
//! walking the tiles first.

use serde::Serialize;

use crate::error::{read_u16, read_u32, read_u8, take, CodecError, Result};

/// Start of the palette alpha flags, after the "PALETTE" header.
pub const ALPHA_OFFSET: usize = 12;
pub const MAX_PALETTES: usize = 24;
/// Distance from the end of the tile layers to the first texture page.
pub const TEXTURE_OFFSET_GAP: usize = 7;
pub const TEXTURE_PAGES: usize = 42;
pub const TEXTURE_PAGE_SIZE: usize = 256;
pub const TILE_RECORD_LEN: usize = 52;
/// Tile id of a tile that has no record yet. A record whose z id holds this
/// value is a free slot.
pub const TILE_PENDING: u16 = 0xFFFF;
pub const LAYER_COUNT: u8 = 4;

const PALETTE_HEADER_LEN: usize = 12;
const BACK_MARKER: &[u8; 4] = b"BACK";
const LAYER_PADDING: usize = 2;

/// Byte offsets inside a tile record.
mod rec {
    pub const DST_X: usize = 0;
    pub const DST_Y: usize = 2;
    pub const SRC_X: usize = 8;
    pub const SRC_Y: usize = 10;
    pub const SRC_X2: usize = 12;
    pub const SRC_Y2: usize = 14;
    pub const WIDTH: usize = 16;
    pub const HEIGHT: usize = 18;
    pub const PALETTE: usize = 20;
    pub const Z: usize = 22;
    pub const PARAM: usize = 24;
    pub const STATE: usize = 25;
    pub const BLENDING: usize = 26;
    pub const TYPE_TRANS: usize = 28;
    pub const TEXTURE: usize = 30;
    pub const TEXTURE2: usize = 32;
    pub const DEPTH: usize = 34;
}

/// One 15-bit color converted to 8 bits per channel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

fn expand5(v: u16) -> u8 {
    let v = (v & 31) as u8;
    (v << 3) | (v >> 2)
}

impl Color {
    /// Palette color: 5 bits per channel, red in the low bits. Black with the
    /// STP bit clear is fully transparent.
    pub fn from_ps(raw: u16) -> Self {
        Color {
            r: expand5(raw),
            g: expand5(raw >> 5),
            b: expand5(raw >> 10),
            a: if raw == 0 { 0 } else { 0xFF },
        }
    }

    /// Texel of a 16-bit direct color page: red in the high bits.
    pub fn from_pc_direct(raw: u16) -> Self {
        Color {
            r: expand5(raw >> 11),
            g: expand5(raw >> 6),
            b: expand5(raw),
            a: if raw == 0 { 0 } else { 0xFF },
        }
    }

    /// Semi-transparency bit of a palette color.
    pub fn ps_stp(raw: u16) -> bool {
        raw & 0x8000 != 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub colors: Vec<u16>,
    /// Flag byte from the background section, one per palette.
    pub alpha: u8,
}

impl Palette {
    pub fn color(&self, index: usize) -> Option<Color> {
        self.colors.get(index).copied().map(Color::from_ps)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Tile {
    /// Record index in the section, or `TILE_PENDING` before `add_tile`.
    pub tile_id: u16,
    pub layer_id: u8,
    pub dst_x: i16,
    pub dst_y: i16,
    pub src_x: u8,
    pub src_y: u8,
    pub src_x2: u8,
    pub src_y2: u8,
    pub width: u16,
    pub height: u16,
    pub palette_id: u8,
    /// Sorting id. 0xFFFF is reserved for free slots.
    pub z: u16,
    pub param: u8,
    pub state: u8,
    pub blending: bool,
    pub type_trans: u8,
    pub texture_id: u8,
    pub texture_id2: u8,
    /// 1 for 8-bit paletted texels, 2 for 16-bit direct colors.
    pub depth: u8,
}

impl Tile {
    pub fn pending(layer_id: u8) -> Self {
        Tile {
            tile_id: TILE_PENDING,
            layer_id,
            dst_x: 0,
            dst_y: 0,
            src_x: 0,
            src_y: 0,
            src_x2: 0,
            src_y2: 0,
            width: 16,
            height: 16,
            palette_id: 0,
            z: 0,
            param: 0,
            state: 0,
            blending: false,
            type_trans: 0,
            texture_id: 0,
            texture_id2: 0,
            depth: 1,
        }
    }

    fn decode(record: &[u8], tile_id: u16, layer_id: u8) -> Self {
        let u16_at = |o: usize| u16::from_le_bytes([record[o], record[o + 1]]);
        Tile {
            tile_id,
            layer_id,
            dst_x: u16_at(rec::DST_X) as i16,
            dst_y: u16_at(rec::DST_Y) as i16,
            src_x: record[rec::SRC_X],
            src_y: record[rec::SRC_Y],
            src_x2: record[rec::SRC_X2],
            src_y2: record[rec::SRC_Y2],
            width: u16_at(rec::WIDTH),
            height: u16_at(rec::HEIGHT),
            palette_id: record[rec::PALETTE],
            z: u16_at(rec::Z),
            param: record[rec::PARAM],
            state: record[rec::STATE],
            blending: record[rec::BLENDING] != 0,
            type_trans: record[rec::TYPE_TRANS],
            texture_id: record[rec::TEXTURE],
            texture_id2: record[rec::TEXTURE2],
            depth: record[rec::DEPTH],
        }
    }

    /// Overwrite the known fields of `record`; the rest is left as found.
    fn encode_into(&self, record: &mut [u8]) {
        let mut put16 = |o: usize, v: u16| record[o..o + 2].copy_from_slice(&v.to_le_bytes());
        put16(rec::DST_X, self.dst_x as u16);
        put16(rec::DST_Y, self.dst_y as u16);
        put16(rec::WIDTH, self.width);
        put16(rec::HEIGHT, self.height);
        put16(rec::Z, self.z);
        record[rec::SRC_X] = self.src_x;
        record[rec::SRC_Y] = self.src_y;
        record[rec::SRC_X2] = self.src_x2;
        record[rec::SRC_Y2] = self.src_y2;
        record[rec::PALETTE] = self.palette_id;
        record[rec::PARAM] = self.param;
        record[rec::STATE] = self.state;
        record[rec::BLENDING] = u8::from(self.blending);
        record[rec::TYPE_TRANS] = self.type_trans;
        record[rec::TEXTURE] = self.texture_id;
        record[rec::TEXTURE2] = self.texture_id2;
        record[rec::DEPTH] = self.depth;
    }

    fn validate(&self) -> Result<()> {
        if self.layer_id >= LAYER_COUNT {
            return Err(CodecError::InvalidTile("layer id out of range"));
        }
        if self.z == TILE_PENDING {
            return Err(CodecError::InvalidTile("z id 0xFFFF marks a free slot"));
        }
        if !matches!(self.depth, 1 | 2) {
            return Err(CodecError::InvalidTile("depth must be 1 or 2"));
        }
        if self.type_trans > 3 {
            return Err(CodecError::InvalidTile("blend type out of range"));
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LayerInfo {
    pub layer_id: u8,
    pub width: u16,
    pub height: u16,
    pub tile_count: u16,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct TileSlot {
    offset: usize,
    layer_id: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TexturePage {
    pub depth: u8,
    pub data: Vec<u8>,
}

impl TexturePage {
    /// Raw texel: a palette index for 8-bit pages, a direct color otherwise.
    pub fn texel(&self, x: usize, y: usize) -> Option<u16> {
        if x >= TEXTURE_PAGE_SIZE || y >= TEXTURE_PAGE_SIZE {
            return None;
        }
        let at = (y * TEXTURE_PAGE_SIZE + x) * self.depth as usize;
        match self.depth {
            1 => self.data.get(at).map(|&b| u16::from(b)),
            _ => self
                .data
                .get(at..at + 2)
                .map(|b| u16::from_le_bytes([b[0], b[1]])),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TextureAtlas {
    pub pages: Vec<Option<TexturePage>>,
}

impl TextureAtlas {
    pub fn page(&self, id: usize) -> Option<&TexturePage> {
        self.pages.get(id).and_then(Option::as_ref)
    }
}

/// Everything a background decode produces.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Background {
    pub palettes: Vec<Palette>,
    pub layers: Vec<LayerInfo>,
    /// Allocated tiles only, in record order.
    pub tiles: Vec<Tile>,
    pub textures: TextureAtlas,
}

/// Handle over the raw background section.
#[derive(Clone, Debug)]
pub struct BackgroundFile {
    data: Vec<u8>,
    texture_offset: Option<usize>,
    layers: Vec<LayerInfo>,
    slots: Vec<TileSlot>,
}

impl BackgroundFile {
    pub fn new(data: Vec<u8>) -> Self {
        BackgroundFile {
            data,
            texture_offset: None,
            layers: Vec::new(),
            slots: Vec::new(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Known once the tile layers have been walked.
    pub fn texture_offset(&self) -> Option<usize> {
        self.texture_offset
    }

    /// Decode the whole background. `palette_data` is the companion palette
    /// section.
    pub fn open(&mut self, palette_data: &[u8]) -> Result<Background> {
        let palettes = read_palettes(&self.data, palette_data).map_err(|err| {
            log::warn!("background palettes: {err}");
            err
        })?;

        if self.texture_offset.is_none() {
            self.read_tile_layout().map_err(|err| {
                log::warn!("background tiles: {err}");
                err
            })?;
        }
        let texture_offset = self.texture_offset.ok_or(CodecError::MissingMarker("TEXTURE"))?;

        let textures = read_textures(&self.data, texture_offset).map_err(|err| {
            log::warn!("background textures at {texture_offset:#x}: {err}");
            err
        })?;

        Ok(Background {
            palettes,
            layers: self.layers.clone(),
            tiles: self.allocated_tiles(),
            textures,
        })
    }

    fn ensure_layout(&mut self) -> Result<()> {
        if self.texture_offset.is_none() {
            self.read_tile_layout()?;
        }
        Ok(())
    }

    fn read_tile_layout(&mut self) -> Result<()> {
        let data = &self.data;
        let mut pos = ALPHA_OFFSET;
        take(data, pos, MAX_PALETTES, "palette flags")?;
        pos += MAX_PALETTES;
        if take(data, pos, BACK_MARKER.len(), "BACK marker")? != BACK_MARKER {
            return Err(CodecError::MissingMarker("BACK"));
        }
        pos += BACK_MARKER.len();

        let mut layers = Vec::new();
        let mut slots = Vec::new();
        for layer_id in 0..LAYER_COUNT {
            if layer_id > 0 {
                let present = read_u8(data, pos, "layer flag")?;
                pos += 1;
                if present == 0 {
                    continue;
                }
            }
            let info = LayerInfo {
                layer_id,
                width: read_u16(data, pos, "layer width")?,
                height: read_u16(data, pos + 2, "layer height")?,
                tile_count: read_u16(data, pos + 4, "tile count")?,
            };
            // Layer 0 carries its depth, layer 1 a longer unknown block.
            pos += 6 + match layer_id {
                0 => 2,
                1 => 16,
                _ => 10,
            };
            pos += LAYER_PADDING;

            let count = info.tile_count as usize;
            take(data, pos, count * TILE_RECORD_LEN, "tile records")?;
            slots.extend((0..count).map(|i| TileSlot {
                offset: pos + i * TILE_RECORD_LEN,
                layer_id,
            }));
            pos += count * TILE_RECORD_LEN + LAYER_PADDING;
            layers.push(info);
        }
        if pos > data.len() {
            return Err(CodecError::TruncatedSequence {
                what: "tile layers",
                offset: pos,
                needed: 0,
                available: 0,
            });
        }

        // Slot indices are tile ids, and 0xFFFF marks a pending tile.
        if slots.len() > usize::from(TILE_PENDING) {
            return Err(CodecError::MalformedSize {
                what: "tile slot count",
                expected: usize::from(TILE_PENDING),
                actual: slots.len(),
            });
        }

        log::debug!("{} tile slots over {} layers, tiles end at {pos:#x}", slots.len(), layers.len());
        self.layers = layers;
        self.slots = slots;
        self.texture_offset = Some(pos + TEXTURE_OFFSET_GAP);
        Ok(())
    }

    fn record(&self, slot: &TileSlot) -> &[u8] {
        &self.data[slot.offset..slot.offset + TILE_RECORD_LEN]
    }

    fn is_free(&self, slot: &TileSlot) -> bool {
        let r = self.record(slot);
        u16::from_le_bytes([r[rec::Z], r[rec::Z + 1]]) == TILE_PENDING
    }

    /// Allocated tiles in record order.
    pub fn tiles(&mut self) -> Result<Vec<Tile>> {
        self.ensure_layout()?;
        Ok(self.allocated_tiles())
    }

    fn allocated_tiles(&self) -> Vec<Tile> {
        self.slots
            .iter()
            .zip(0u16..)
            .filter(|(slot, _)| !self.is_free(slot))
            .map(|(slot, id)| Tile::decode(self.record(slot), id, slot.layer_id))
            .collect()
    }

    /// Number of free slots in `layer_id`.
    pub fn free_slots(&mut self, layer_id: u8) -> Result<usize> {
        self.ensure_layout()?;
        Ok(self
            .slots
            .iter()
            .filter(|s| s.layer_id == layer_id && self.is_free(s))
            .count())
    }

    /// Rewrite an allocated tile record in place.
    pub fn set_tile(&mut self, tile: &Tile) -> Result<()> {
        self.ensure_layout()?;
        let slot = self
            .slots
            .get(tile.tile_id as usize)
            .copied()
            .filter(|s| tile.tile_id != TILE_PENDING && !self.is_free(s))
            .ok_or(CodecError::TileNotFound(tile.tile_id))?;
        tile.validate()?;
        if slot.layer_id != tile.layer_id {
            return Err(CodecError::InvalidTile("a tile cannot move to another layer"));
        }
        tile.encode_into(&mut self.data[slot.offset..slot.offset + TILE_RECORD_LEN]);
        Ok(())
    }

    /// Store a pending tile in the first free slot of its layer and give it
    /// that slot's id.
    pub fn add_tile(&mut self, tile: &mut Tile) -> Result<u16> {
        self.ensure_layout()?;
        if tile.tile_id != TILE_PENDING {
            return Err(CodecError::InvalidTile("tile is already allocated"));
        }
        tile.validate()?;

        let (index, slot) = self
            .slots
            .iter()
            .enumerate()
            .find(|(_, s)| s.layer_id == tile.layer_id && self.is_free(s))
            .map(|(i, s)| (i, *s))
            .ok_or(CodecError::CapacityExceeded {
                layer: tile.layer_id,
            })?;

        tile.tile_id = u16::try_from(index).map_err(|_| CodecError::MalformedSize {
            what: "tile slot count",
            expected: usize::from(TILE_PENDING),
            actual: index,
        })?;
        tile.encode_into(&mut self.data[slot.offset..slot.offset + TILE_RECORD_LEN]);
        log::debug!("tile {index} allocated in layer {}", tile.layer_id);
        Ok(tile.tile_id)
    }
}

/// Palettes from the companion section, alpha flags from the background.
fn read_palettes(data: &[u8], palette_data: &[u8]) -> Result<Vec<Palette>> {
    read_u32(palette_data, 0, "palette size")?;
    let colors_per_palette = read_u16(palette_data, 8, "colors per palette")? as usize;
    let count = read_u16(palette_data, 10, "palette count")? as usize;
    if count > MAX_PALETTES {
        return Err(CodecError::MalformedSize {
            what: "palette count",
            expected: MAX_PALETTES,
            actual: count,
        });
    }
    let alpha = take(data, ALPHA_OFFSET, count, "palette flags")?;

    let raw = take(
        palette_data,
        PALETTE_HEADER_LEN,
        count * colors_per_palette * 2,
        "palette colors",
    )?;
    let palettes = raw
        .chunks_exact((colors_per_palette * 2).max(1))
        .take(count)
        .zip(alpha)
        .map(|(chunk, &alpha)| Palette {
            colors: chunk
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect(),
            alpha,
        })
        .collect();
    Ok(palettes)
}

fn read_textures(data: &[u8], offset: usize) -> Result<TextureAtlas> {
    if offset > data.len() {
        return Err(CodecError::TruncatedSequence {
            what: "texture pages",
            offset,
            needed: 0,
            available: 0,
        });
    }
    let mut pos = offset;
    let mut pages = Vec::with_capacity(TEXTURE_PAGES);
    for _ in 0..TEXTURE_PAGES {
        let exists = read_u16(data, pos, "texture page flag")?;
        pos += 2;
        if exists == 0 {
            pages.push(None);
            continue;
        }
        let depth = read_u16(data, pos + 2, "texture page depth")?;
        pos += 4;
        if !matches!(depth, 1 | 2) {
            return Err(CodecError::MalformedSize {
                what: "texture page depth",
                expected: 2,
                actual: depth as usize,
            });
        }
        let len = TEXTURE_PAGE_SIZE * TEXTURE_PAGE_SIZE * depth as usize;
        let texels = take(data, pos, len, "texture page")?;
        pos += len;
        pages.push(Some(TexturePage {
            depth: depth as u8,
            data: texels.to_vec(),
        }));
    }
    Ok(TextureAtlas { pages })
}
