//! Read-only access to LGP archives such as `flevel.lgp`.

use crate::error::{read_u32, take, CodecError, Result};

const CREATOR_LEN: usize = 12;
const NAME_LEN: usize = 20;
/// Name, data offset, then one unused byte and a conflict count.
const TOC_ENTRY_LEN: usize = NAME_LEN + 4 + 3;
const FILE_HEADER_LEN: usize = NAME_LEN + 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LgpEntry {
    pub name: String,
    pub offset: u32,
}

#[derive(Clone, Debug)]
pub struct LgpArchive<'a> {
    raw: &'a [u8],
    pub creator: String,
    pub entries: Vec<LgpEntry>,
}

fn name_from(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim().to_string()
}

impl<'a> LgpArchive<'a> {
    pub fn parse(raw: &'a [u8]) -> Result<Self> {
        let creator = name_from(take(raw, 0, CREATOR_LEN, "LGP creator")?);
        let count = read_u32(raw, CREATOR_LEN, "LGP file count")? as usize;
        let toc_start = CREATOR_LEN + 4;
        let toc_len = count.checked_mul(TOC_ENTRY_LEN).ok_or(CodecError::MalformedSize {
            what: "LGP file count",
            expected: raw.len() / TOC_ENTRY_LEN,
            actual: count,
        })?;
        let toc = take(raw, toc_start, toc_len, "LGP table of contents")?;

        let entries = toc
            .chunks_exact(TOC_ENTRY_LEN)
            .map(|e| LgpEntry {
                name: name_from(&e[..NAME_LEN]),
                offset: u32::from_le_bytes([e[20], e[21], e[22], e[23]]),
            })
            .collect();
        Ok(LgpArchive {
            raw,
            creator,
            entries,
        })
    }

    pub fn find(&self, name: &str) -> Option<&LgpEntry> {
        self.entries.iter().find(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Contents of one entry, after its own name and size header.
    pub fn data(&self, entry: &LgpEntry) -> Result<&'a [u8]> {
        let offset = entry.offset as usize;
        let size = read_u32(self.raw, offset + NAME_LEN, "LGP entry size")? as usize;
        take(self.raw, offset + FILE_HEADER_LEN, size, "LGP entry data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded(name: &str, len: usize) -> Vec<u8> {
        let mut out = name.as_bytes().to_vec();
        out.resize(len, 0);
        out
    }

    fn archive(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut out = padded("SQUARESOFT", CREATOR_LEN);
        out.extend_from_slice(&(files.len() as u32).to_le_bytes());
        let mut offset = out.len() + files.len() * TOC_ENTRY_LEN;
        for (name, data) in files {
            out.extend(padded(name, NAME_LEN));
            out.extend_from_slice(&(offset as u32).to_le_bytes());
            out.extend_from_slice(&[0x0E, 0, 0]);
            offset += FILE_HEADER_LEN + data.len();
        }
        for (name, data) in files {
            out.extend(padded(name, NAME_LEN));
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            out.extend_from_slice(data);
        }
        out
    }

    #[test]
    fn lists_and_reads_entries() {
        let raw = archive(&[("md1stin", &b"abc"[..]), ("md1_1", &b"de"[..])]);
        let lgp = LgpArchive::parse(&raw).unwrap();
        assert_eq!(lgp.creator, "SQUARESOFT");
        let names: Vec<_> = lgp.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["md1stin", "md1_1"]);

        let entry = lgp.find("MD1_1").unwrap();
        assert_eq!(lgp.data(entry).unwrap(), b"de");
        assert!(lgp.find("md1_2").is_none());
    }

    #[test]
    fn truncated_toc_is_an_error() {
        let raw = archive(&[("md1stin", &b"abc"[..])]);
        assert!(matches!(
            LgpArchive::parse(&raw[..30]),
            Err(CodecError::TruncatedSequence { what: "LGP table of contents", .. })
        ));
    }

    #[test]
    fn entry_past_the_end_is_an_error() {
        let mut raw = archive(&[("md1stin", &b"abc"[..])]);
        raw.truncate(raw.len() - 1);
        let lgp = LgpArchive::parse(&raw).unwrap();
        assert!(lgp.data(&lgp.entries[0]).is_err());
    }
}
