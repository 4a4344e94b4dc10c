use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

pub const ENCOUNTER_SECTION_LEN: usize = 48;
pub const ENCOUNTER_TABLE_LEN: usize = 24;

const _: () = assert!(2 + 6 * 2 + 4 * 2 + 2 == ENCOUNTER_TABLE_LEN);
const _: () = assert!(2 * ENCOUNTER_TABLE_LEN == ENCOUNTER_SECTION_LEN);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableId {
    Normal,
    Special,
}

/// One packed encounter: battle id in the low 10 bits, probability above.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter(pub u16);

impl Encounter {
    pub fn new(battle_id: u16, probability: u8) -> Self {
        Encounter((battle_id & 0x3FF) | (u16::from(probability & 0x3F) << 10))
    }

    pub fn battle_id(self) -> u16 {
        self.0 & 0x3FF
    }

    pub fn probability(self) -> u8 {
        (self.0 >> 10) as u8
    }
}

/// A 24-byte random battle table.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterTable {
    pub enabled: u8,
    pub rate: u8,
    /// Regular battles; their probabilities add up to 64.
    pub standard: [Encounter; 6],
    /// Back attacks (first two), side attack and pincer attack.
    pub special: [Encounter; 4],
    pub pad: u16,
}

impl EncounterTable {
    fn read(b: &[u8]) -> Self {
        let word = |i: usize| Encounter(u16::from_le_bytes([b[2 + 2 * i], b[3 + 2 * i]]));
        EncounterTable {
            enabled: b[0],
            rate: b[1],
            standard: std::array::from_fn(word),
            special: std::array::from_fn(|i| word(6 + i)),
            pad: u16::from_le_bytes([b[22], b[23]]),
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.push(self.enabled);
        out.push(self.rate);
        for e in self.standard.iter().chain(&self.special) {
            out.extend_from_slice(&e.0.to_le_bytes());
        }
        out.extend_from_slice(&self.pad.to_le_bytes());
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled != 0
    }
}

/// The encounter section: a normal and a special table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterFile {
    tables: [EncounterTable; 2],
}

impl EncounterFile {
    pub fn open(data: &[u8]) -> Result<Self> {
        if data.len() != ENCOUNTER_SECTION_LEN {
            return Err(CodecError::MalformedSize {
                what: "encounter section",
                expected: ENCOUNTER_SECTION_LEN,
                actual: data.len(),
            });
        }
        let (normal, special) = data.split_at(ENCOUNTER_TABLE_LEN);
        Ok(EncounterFile {
            tables: [EncounterTable::read(normal), EncounterTable::read(special)],
        })
    }

    pub fn save(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENCOUNTER_SECTION_LEN);
        for table in &self.tables {
            table.write(&mut out);
        }
        out
    }

    pub fn table(&self, id: TableId) -> &EncounterTable {
        &self.tables[id as usize]
    }

    pub fn set_table(&mut self, id: TableId, table: EncounterTable) {
        self.tables[id as usize] = table;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section() -> Vec<u8> {
        let mut data: Vec<u8> = (0..48u8).collect();
        data[0] = 1;
        data[1] = 0x40;
        // First standard encounter: battle 0x123, probability 32.
        data[2..4].copy_from_slice(&(0x123u16 | (32 << 10)).to_le_bytes());
        data
    }

    #[test]
    fn open_and_save_round_trip() {
        let data = section();
        let file = EncounterFile::open(&data).unwrap();
        assert_eq!(file.save(), data);

        let normal = file.table(TableId::Normal);
        assert!(normal.is_enabled());
        assert_eq!(normal.rate, 0x40);
        assert_eq!(normal.standard[0].battle_id(), 0x123);
        assert_eq!(normal.standard[0].probability(), 32);
        assert_eq!(file.table(TableId::Special).enabled, 24);
        assert_eq!(file.table(TableId::Special).pad, u16::from_le_bytes([46, 47]));
    }

    #[test]
    fn only_48_bytes_are_accepted() {
        for len in [0, 24, 47, 49] {
            assert_eq!(
                EncounterFile::open(&vec![0; len]),
                Err(CodecError::MalformedSize {
                    what: "encounter section",
                    expected: 48,
                    actual: len
                })
            );
        }
    }

    #[test]
    fn set_table_replaces_one_table() {
        let mut file = EncounterFile::open(&section()).unwrap();
        let mut table = EncounterTable::default();
        table.enabled = 1;
        table.special[3] = Encounter::new(999, 8);
        file.set_table(TableId::Special, table);

        let saved = file.save();
        assert_eq!(saved.len(), 48);
        assert_eq!(&saved[..24], &section()[..24]);
        assert_eq!(saved[24], 1);
        assert_eq!(u16::from_le_bytes([saved[44], saved[45]]), 999 | (8 << 10));
        assert_eq!(file.table(TableId::Special).special[3].battle_id(), 999);
    }
}
