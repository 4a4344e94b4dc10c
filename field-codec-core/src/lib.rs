//! Codecs for the binary formats of Final Fantasy VII PC field maps: the
//! field script bytecode, background tiles and textures, and random
//! encounter tables.

pub mod background;
pub mod bitfield;
pub mod encounter;
pub mod error;
pub mod field_file;
pub mod lgp;
pub mod listing;
pub mod lzs;
pub mod opcode;
pub mod schema;
pub mod script;
pub mod section1;
pub mod verify;

pub use background::{Background, BackgroundFile, Tile, TILE_PENDING};
pub use encounter::{EncounterFile, EncounterTable, TableId};
pub use error::{CodecError, Result};
pub use field_file::{FieldFile, SectionKind};
pub use opcode::{Field, Opcode};
pub use schema::{schema_for, FieldDescriptor, ParamType};
pub use verify::{run_verify, VerifyReport, VerifySettings};
