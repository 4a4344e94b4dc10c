//! Parameter layouts of the field script opcodes.
//!
//! Each opcode id maps to the ordered list of its typed parameters. The order
//! is the order the engine stores them in, which is neither alphabetical nor
//! sorted by size: banks come first, packed two per byte, followed by the
//! values they qualify. Ids without a list here are edited as raw bytes.

use serde::Serialize;

/// Semantic tag of an opcode parameter.
///
/// The tag decides the bit width, the signedness and the display name of a
/// parameter. It never changes how the bits are packed beyond that.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum ParamType {
    Unknown,
    Word,
    SWord,
    CoordX,
    CoordY,
    CoordZ,
    FieldId,
    TutorialId,
    CharacterId,
    DiscId,
    MinigameId,
    Byte,
    Speed,
    Speed16,
    Direction,
    PolygonId,
    GroupId,
    ScriptId,
    PartyId,
    Bank,
    Address,
    Priority,
    Bit,
    Jump,
    JumpLong,
    Operator,
    Boolean,
    LayerId,
    ParamId,
    StateId,
    WindowId,
    WindowWidth,
    WindowHeight,
    WindowVar,
    Keys,
    Rotation,
    WindowNum,
    TextId,
    Menu,
    WindowType,
    ItemId,
    MateriaId,
    Quantity,
    Color,
    AnimationId,
    MusicId,
    SoundId,
    MovieId,
    Label,
}

impl ParamType {
    pub const fn bit_width(self) -> u8 {
        use ParamType::*;
        match self {
            Label => 32,
            Color => 24,
            Word | SWord | JumpLong | CoordX | CoordY | CoordZ | WindowWidth | WindowHeight
            | ItemId | Speed16 | PolygonId | SoundId | Keys | FieldId => 16,
            ScriptId => 5,
            Bank => 4,
            Priority => 3,
            Bit => 1,
            _ => 8,
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            ParamType::SWord | ParamType::CoordX | ParamType::CoordY | ParamType::CoordZ
        )
    }

    pub const fn is_jump(self) -> bool {
        matches!(self, ParamType::Jump | ParamType::JumpLong)
    }

    pub const fn descriptor(self) -> FieldDescriptor {
        FieldDescriptor {
            kind: self,
            bit_width: self.bit_width(),
            signed: self.is_signed(),
        }
    }

    pub fn name(self) -> &'static str {
        use ParamType::*;
        match self {
            Unknown => "Unknown",
            Word => "Word",
            SWord => "Signed word",
            CoordX => "X coordinate",
            CoordY => "Y coordinate",
            CoordZ => "Z coordinate",
            FieldId => "Field",
            TutorialId => "Tutorial",
            CharacterId => "Character",
            DiscId => "Disc",
            MinigameId => "Minigame",
            Byte => "Byte",
            Speed => "Speed (8-bit)",
            Speed16 => "Speed (16-bit)",
            Direction => "Direction",
            PolygonId => "Triangle",
            GroupId => "Group",
            ScriptId => "Script",
            PartyId => "Party member",
            Bank => "Bank",
            Address => "Address",
            Priority => "Priority",
            Bit => "Flag",
            Jump => "Short jump",
            JumpLong => "Long jump",
            Operator => "Operator",
            Boolean => "Boolean",
            LayerId => "Layer",
            ParamId => "Parameter",
            StateId => "State",
            WindowId => "Window",
            WindowWidth => "Width",
            WindowHeight => "Height",
            WindowVar => "Variable",
            Keys => "Key(s)",
            Rotation => "Rotation",
            WindowNum => "Display type",
            TextId => "Text",
            Menu => "Menu",
            WindowType => "Window type",
            ItemId => "Item",
            MateriaId => "Materia",
            Quantity => "Quantity",
            Color => "Color",
            AnimationId => "Animation",
            MusicId => "Music",
            SoundId => "Sound",
            MovieId => "Movie",
            Label => "Label",
        }
    }
}

/// Width and signedness of one packed parameter.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct FieldDescriptor {
    pub kind: ParamType,
    pub bit_width: u8,
    pub signed: bool,
}

impl FieldDescriptor {
    /// Descriptor used for bytes that have no typed layout.
    pub const RAW_BYTE: FieldDescriptor = ParamType::Unknown.descriptor();

    /// Inclusive value range representable by this field.
    pub fn range(&self) -> (i64, i64) {
        if self.kind == ParamType::Label {
            // Stored in 32 bits, edited as a non-negative signed int.
            return (0, i64::from(i32::MAX));
        }
        let w = u32::from(self.bit_width);
        if self.signed {
            let max = (1i64 << (w - 1)) - 1;
            (-max - 1, max)
        } else {
            (0, (1i64 << w) - 1)
        }
    }
}

/// Ordered parameter layout of one opcode id.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct OpcodeSchema {
    params: &'static [ParamType],
}

impl OpcodeSchema {
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn params(&self) -> &'static [ParamType] {
        self.params
    }

    pub fn fields(&self) -> impl Iterator<Item = FieldDescriptor> + 'static {
        self.params.iter().map(|p| p.descriptor())
    }

    /// Total number of payload bits.
    pub fn bit_len(&self) -> usize {
        self.params.iter().map(|p| p.bit_width() as usize).sum()
    }
}

/// Parameter layout for `id` (0x00-0xFF, or 0x100 for the label).
///
/// Every other id, and every opcode edited as raw bytes, gets the empty
/// schema.
pub fn schema_for(id: u16) -> OpcodeSchema {
    let params = table::PARAMS.get(id as usize).copied().unwrap_or(&[]);
    OpcodeSchema { params }
}

mod table {
    use super::ParamType::{self, *};

    pub(super) const PARAMS: [&[ParamType]; 257] = [
        /* 00 RET      */ &[],
        /* 01 REQ      */ &[GroupId, Priority, ScriptId],
        /* 02 REQSW    */ &[GroupId, Priority, ScriptId],
        /* 03 REQEW    */ &[GroupId, Priority, ScriptId],
        /* 04 PREQ     */ &[PartyId, Priority, ScriptId],
        /* 05 PRQSW    */ &[PartyId, Priority, ScriptId],
        /* 06 PRQEW    */ &[PartyId, Priority, ScriptId],
        /* 07 RETTO    */ &[Priority, ScriptId],
        /* 08 JOIN     */ &[Speed],
        /* 09 SPLIT    */
        &[
            Bank, Bank, Bank, Bank, Bank, Bank, CoordX, CoordY, Direction, CoordX, CoordY,
            Direction, Speed,
        ],
        /* 0a SPTYE    */ &[Bank, Bank, Bank, Bank, PartyId, PartyId, PartyId],
        /* 0b GTPYE    */ &[Bank, Bank, Bank, Bank, PartyId, PartyId, PartyId],
        /* 0c          */ &[],
        /* 0d          */ &[],
        /* 0e DSKCG    */ &[DiscId],
        /* 0f SPECIAL  */ &[],
        /* 10 JMPF     */ &[Jump],
        /* 11 JMPFL    */ &[JumpLong],
        /* 12 JMPB     */ &[Jump],
        /* 13 JMPBL    */ &[JumpLong],
        /* 14 IFUB     */ &[Bank, Bank, Byte, Byte, Operator, Jump],
        /* 15 IFUBL    */ &[Bank, Bank, Byte, Byte, Operator, JumpLong],
        /* 16 IFSW     */ &[Bank, Bank, SWord, SWord, Operator, Jump],
        /* 17 IFSWL    */ &[Bank, Bank, SWord, SWord, Operator, JumpLong],
        /* 18 IFUW     */ &[Bank, Bank, Word, Word, Operator, Jump],
        /* 19 IFUWL    */ &[Bank, Bank, Word, Word, Operator, JumpLong],
        /* 1a          */ &[],
        /* 1b          */ &[],
        /* 1c          */ &[],
        /* 1d          */ &[],
        /* 1e          */ &[],
        /* 1f          */ &[],
        /* 20 MINIGAME */ &[FieldId, CoordX, CoordY, PolygonId, Byte, MinigameId],
        /* 21 TUTOR    */ &[TutorialId],
        /* 22 BTMD2    */
        &[
            Bit, Bit, Bit, Bit, Bit, Bit, Bit, Bit, Bit, Bit, Bit, Bit, Bit, Bit, Bit, Bit, Bit,
            Bit, Bit, Bit, Bit, Bit, Bit, Bit, Bit, Bit, Bit, Bit, Bit, Bit, Bit, Bit,
        ],
        /* 23 BTRLD    */ &[Bank, Bank, Byte],
        /* 24 WAIT     */ &[Word],
        /* 25 NFADE    */ &[Unknown, Unknown, Unknown, Color, Unknown, Unknown],
        /* 26 BLINK    */ &[Boolean],
        /* 27 BGMOVIE  */ &[Boolean],
        /* 28 KAWAI    */ &[],
        /* 29 KAWIW    */ &[],
        /* 2a PMOVA    */ &[PartyId],
        /* 2b SLIP     */ &[Boolean],
        /* 2c BGPDH    */ &[Bank, Bank, LayerId, CoordZ],
        /* 2d BGSCR    */ &[Bank, Bank, LayerId, SWord, SWord],
        /* 2e WCLS     */ &[WindowId],
        /* 2f WSIZW    */ &[WindowId, CoordX, CoordY, WindowWidth, WindowHeight],
        /* 30 IFKEY    */ &[Keys, Jump],
        /* 31 IFKEYON  */ &[Keys, Jump],
        /* 32 IFKEYOFF */ &[Keys, Jump],
        /* 33 UC       */ &[Boolean],
        /* 34 PDIRA    */ &[PartyId],
        /* 35 PTURA    */ &[PartyId, Speed, Rotation],
        /* 36 WSPCL    */ &[WindowId, WindowNum, Byte, Byte],
        /* 37 WNUMB    */ &[Bank, Bank, WindowId, Word, Word, Byte],
        /* 38 STTIM    */ &[Bank, Bank, Bank, Bank, Byte, Byte, Byte],
        /* 39 GOLDu    */ &[Bank, Bank, Word, Word],
        /* 3a GOLDd    */ &[Bank, Bank, Word, Word],
        /* 3b CHGLD    */ &[Bank, Bank, Address, Address],
        /* 3c HMPMAX1  */ &[],
        /* 3d HMPMAX2  */ &[],
        /* 3e MHMMX    */ &[],
        /* 3f HMPMAX3  */ &[],
        /* 40 MESSAGE  */ &[WindowId, TextId],
        /* 41 MPARA    */ &[Bank, Bank, WindowId, WindowVar, Byte],
        /* 42 MPRA2    */ &[Bank, Bank, WindowId, WindowVar, Word],
        /* 43 MPNAM    */ &[TextId],
        /* 44          */ &[],
        /* 45 MPu      */ &[Bank, Bank, PartyId, Word],
        /* 46          */ &[],
        /* 47 MPd      */ &[Bank, Bank, PartyId, Word],
        /* 48 ASK      */ &[Bank, Bank, WindowId, TextId, Byte, Byte, Address],
        /* 49 MENU     */ &[Bank, Bank, Menu, Byte],
        /* 4a MENU2    */ &[Boolean],
        /* 4b BTLTB    */ &[Byte],
        /* 4c          */ &[],
        /* 4d HPu      */ &[Bank, Bank, PartyId, Word],
        /* 4e          */ &[],
        /* 4f HPd      */ &[Bank, Bank, PartyId, Word],
        /* 50 WINDOW   */ &[WindowId, CoordX, CoordY, WindowWidth, WindowHeight],
        /* 51 WMOVE    */ &[WindowId, CoordX, CoordY],
        /* 52 WMODE    */ &[WindowId, WindowType, Boolean],
        /* 53 WREST    */ &[WindowId],
        /* 54 WCLSE    */ &[WindowId],
        /* 55 WROW     */ &[WindowId, Byte],
        /* 56 GWCOL    */ &[Bank, Bank, Bank, Bank, Address, Address, Address, Address],
        /* 57 SWCOL    */ &[Bank, Bank, Bank, Bank, Byte, Color],
        /* 58 STITM    */ &[Bank, Bank, ItemId, Quantity],
        /* 59 DLITM    */ &[Bank, Bank, ItemId, Quantity],
        /* 5a CKITM    */ &[Bank, Bank, ItemId, Address],
        /* 5b SMTRA    */ &[Bank, Bank, Bank, Bank, MateriaId, Byte, Byte, Byte],
        /* 5c DMTRA    */ &[Bank, Bank, Bank, Bank, MateriaId, Byte, Byte, Byte, Quantity],
        /* 5d CMTRA    */
        &[
            Bank, Bank, Bank, Bank, Bank, Bank, MateriaId, Byte, Byte, Byte, Unknown, Address,
        ],
        /* 5e SHAKE    */ &[],
        /* 5f NOP      */ &[],
        /* 60 MAPJUMP  */ &[FieldId, CoordX, CoordY, PolygonId, Direction],
        /* 61 SCRLO    */ &[],
        /* 62 SCRLC    */ &[],
        /* 63 SCRLA    */ &[Bank, Bank, Speed16, GroupId, Byte],
        /* 64 SCR2D    */ &[Bank, Bank, CoordX, CoordY],
        /* 65 SCRCC    */ &[],
        /* 66 SCR2DC   */ &[Bank, Bank, Bank, Bank, CoordX, CoordY, Speed16],
        /* 67 SCRLW    */ &[],
        /* 68 SCR2DL   */ &[Bank, Bank, Bank, Bank, CoordX, CoordY, Speed16],
        /* 69 MPDSP    */ &[Boolean],
        /* 6a VWOFT    */ &[],
        /* 6b FADE     */ &[Bank, Bank, Bank, Bank, Color, Speed, Byte, Byte],
        /* 6c FADEW    */ &[],
        /* 6d IDLCK    */ &[PolygonId, Boolean],
        /* 6e LSTMP    */ &[Bank, Bank, Address],
        /* 6f SCRLP    */ &[Bank, Bank, Speed16, PartyId, Byte],
        /* 70 BATTLE   */ &[Bank, Bank, Word],
        /* 71 BTLON    */ &[Boolean],
        /* 72 BTLMD    */ &[],
        /* 73 PGTDR    */ &[Bank, Bank, PartyId, Address],
        /* 74 GETPC    */ &[Bank, Bank, PartyId, Address],
        /* 75 PXYZI    */ &[Bank, Bank, Bank, Bank, PartyId, Address, Address, Address, Address],
        /* 76 PLUS!    */ &[Bank, Bank, Address, Byte],
        /* 77 PLUS2!   */ &[Bank, Bank, Address, Word],
        /* 78 MINUS!   */ &[Bank, Bank, Address, Byte],
        /* 79 MINUS2!  */ &[Bank, Bank, Address, Word],
        /* 7a INC!     */ &[Bank, Bank, Address],
        /* 7b INC2!    */ &[Bank, Bank, Address],
        /* 7c DEC!     */ &[Bank, Bank, Address],
        /* 7d DEC2!    */ &[Bank, Bank, Address],
        /* 7e TLKON    */ &[Boolean],
        /* 7f RDMSD    */ &[Bank, Bank, Byte],
        /* 80 SETBYTE  */ &[Bank, Bank, Address, Byte],
        /* 81 SETWORD  */ &[Bank, Bank, Address, Word],
        /* 82 BITON    */ &[Bank, Bank, Address, Byte],
        /* 83 BITOFF   */ &[Bank, Bank, Address, Byte],
        /* 84 BITXOR   */ &[Bank, Bank, Address, Byte],
        /* 85 PLUS     */ &[Bank, Bank, Address, Byte],
        /* 86 PLUS2    */ &[Bank, Bank, Address, Word],
        /* 87 MINUS    */ &[Bank, Bank, Address, Byte],
        /* 88 MINUS2   */ &[Bank, Bank, Address, Word],
        /* 89 MUL      */ &[Bank, Bank, Address, Byte],
        /* 8a MUL2     */ &[Bank, Bank, Address, Word],
        /* 8b DIV      */ &[Bank, Bank, Address, Byte],
        /* 8c DIV2     */ &[Bank, Bank, Address, Word],
        /* 8d MOD      */ &[Bank, Bank, Address, Byte],
        /* 8e MOD2     */ &[Bank, Bank, Address, Word],
        /* 8f AND      */ &[Bank, Bank, Address, Byte],
        /* 90 AND2     */ &[Bank, Bank, Address, Word],
        /* 91 OR       */ &[Bank, Bank, Address, Byte],
        /* 92 OR2      */ &[Bank, Bank, Address, Word],
        /* 93 XOR      */ &[Bank, Bank, Address, Byte],
        /* 94 XOR2     */ &[Bank, Bank, Address, Word],
        /* 95 INC      */ &[Bank, Bank, Address],
        /* 96 INC2     */ &[Bank, Bank, Address],
        /* 97 DEC      */ &[Bank, Bank, Address],
        /* 98 DEC2     */ &[Bank, Bank, Address],
        /* 99 RANDOM   */ &[Bank, Bank, Address],
        /* 9a LBYTE    */ &[Bank, Bank, Address, Byte],
        /* 9b HBYTE    */ &[Bank, Bank, Address, Word],
        /* 9c 2BYTE    */ &[Bank, Bank, Bank, Bank, Address, Byte, Byte],
        /* 9d SETX     */ &[],
        /* 9e GETX     */ &[],
        /* 9f SEARCHX  */ &[],
        /* a0 PC       */ &[CharacterId],
        /* a1 CHAR     */ &[Byte],
        /* a2 DFANM    */ &[AnimationId, Speed],
        /* a3 ANIME1   */ &[AnimationId, Speed],
        /* a4 VISI     */ &[Boolean],
        /* a5 XYZI     */ &[Bank, Bank, Bank, Bank, CoordX, CoordY, CoordZ, PolygonId],
        /* a6 XYI      */ &[Bank, Bank, Bank, Bank, CoordX, CoordY, PolygonId],
        /* a7 XYZ      */ &[Bank, Bank, Bank, Bank, CoordX, CoordY, CoordZ],
        /* a8 MOVE     */ &[Bank, Bank, CoordX, CoordY],
        /* a9 CMOVE    */ &[Bank, Bank, CoordX, CoordY],
        /* aa MOVA     */ &[GroupId],
        /* ab TURA     */ &[GroupId, Rotation, Speed],
        /* ac ANIMW    */ &[],
        /* ad FMOVE    */ &[Bank, Bank, CoordX, CoordY],
        /* ae ANIME2   */ &[AnimationId, Speed],
        /* af ANIM!1   */ &[AnimationId, Speed],
        /* b0 CANIM1   */ &[AnimationId, Byte, Byte, Speed],
        /* b1 CANM!1   */ &[AnimationId, Byte, Byte, Speed],
        /* b2 MSPED    */ &[Bank, Bank, Speed16],
        /* b3 DIR      */ &[Bank, Bank, Direction],
        /* b4 TURNGEN  */ &[Bank, Bank, Direction, Byte, Speed, Unknown],
        /* b5 TURN     */ &[Bank, Bank, Direction, Byte, Speed, Unknown],
        /* b6 DIRA     */ &[GroupId],
        /* b7 GETDIR   */ &[Bank, Bank, GroupId, Address],
        /* b8 GETAXY   */ &[Bank, Bank, GroupId, Address, Address],
        /* b9 GETAI    */ &[Bank, Bank, GroupId, Address],
        /* ba ANIM!2   */ &[AnimationId, Speed],
        /* bb CANIM2   */ &[AnimationId, Byte, Byte, Speed],
        /* bc CANM!2   */ &[AnimationId, Byte, Byte, Speed],
        /* bd ASPED    */ &[Bank, Bank, Speed16],
        /* be          */ &[],
        /* bf CC       */ &[GroupId],
        /* c0 JUMP     */ &[Bank, Bank, Bank, Bank, CoordX, CoordY, PolygonId, Word],
        /* c1 AXYZI    */ &[Bank, Bank, Bank, Bank, GroupId, Address, Address, Address, Address],
        /* c2 LADER    */
        &[
            Bank, Bank, Bank, Bank, CoordX, CoordY, CoordZ, PolygonId, Byte, AnimationId,
            Direction, Speed,
        ],
        /* c3 OFST     */ &[Bank, Bank, Bank, Bank, Byte, CoordX, CoordY, CoordZ, Speed16],
        /* c4 OFSTW    */ &[],
        /* c5 TALKR    */ &[Bank, Bank, Byte],
        /* c6 SLIDR    */ &[Bank, Bank, Byte],
        /* c7 SOLID    */ &[Boolean],
        /* c8 PRTYP    */ &[CharacterId],
        /* c9 PRTYM    */ &[CharacterId],
        /* ca PRTYE    */ &[CharacterId, CharacterId, CharacterId],
        /* cb IFPRTYQ  */ &[CharacterId, Jump],
        /* cc IFMEMBQ  */ &[CharacterId, Jump],
        /* cd MMBud    */ &[Boolean, CharacterId],
        /* ce MMBLK    */ &[CharacterId],
        /* cf MMBUK    */ &[CharacterId],
        /* d0 LINE     */ &[CoordX, CoordY, CoordZ, CoordX, CoordY, CoordZ],
        /* d1 LINON    */ &[Boolean],
        /* d2 MPJPO    */ &[Boolean],
        /* d3 SLINE    */
        &[
            Bank, Bank, Bank, Bank, Bank, Bank, CoordX, CoordY, CoordZ, CoordX, CoordY, CoordZ,
        ],
        /* d4 SIN      */ &[Bank, Bank, Bank, Bank, Word, Word, Word, Byte],
        /* d5 COS      */ &[Bank, Bank, Bank, Bank, Word, Word, Word, Byte],
        /* d6 TLKR2    */ &[Bank, Bank, Word],
        /* d7 SLDR2    */ &[Bank, Bank, Word],
        /* d8 PMJMP    */ &[FieldId],
        /* d9 PMJMP2   */ &[],
        /* da AKAO2    */ &[],
        /* db FCFIX    */ &[Boolean],
        /* dc CCANM    */ &[AnimationId, Speed, Byte],
        /* dd ANIMB    */ &[],
        /* de TURNW    */ &[],
        /* df MPPAL    */ &[],
        /* e0 BGON     */ &[Bank, Bank, ParamId, StateId],
        /* e1 BGOFF    */ &[Bank, Bank, ParamId, StateId],
        /* e2 BGROL    */ &[Bank, Bank, ParamId],
        /* e3 BGROL2   */ &[Bank, Bank, ParamId],
        /* e4 BGCLR    */ &[Bank, Bank, ParamId],
        /* e5 STPAL    */ &[],
        /* e6 LDPAL    */ &[],
        /* e7 CPPAL    */ &[],
        /* e8 RTPAL    */ &[],
        /* e9 ADPAL    */ &[],
        /* ea MPPAL2   */ &[],
        /* eb STPLS    */ &[],
        /* ec LDPLS    */ &[],
        /* ed CPPAL2   */ &[],
        /* ee RTPAL2   */ &[],
        /* ef ADPAL2   */ &[],
        /* f0 MUSIC    */ &[MusicId],
        /* f1 SOUND    */ &[Bank, Bank, SoundId, Byte],
        /* f2 AKAO     */ &[],
        /* f3 MUSVT    */ &[MusicId],
        /* f4 MUSVM    */ &[MusicId],
        /* f5 MULCK    */ &[Boolean],
        /* f6 BMUSC    */ &[MusicId],
        /* f7 CHMPH    */ &[],
        /* f8 PMVIE    */ &[MovieId],
        /* f9 MOVIE    */ &[],
        /* fa MVIEF    */ &[Bank, Bank, Address],
        /* fb MVCAM    */ &[Boolean],
        /* fc FMUSC    */ &[],
        /* fd CMUSC    */ &[],
        /* fe CHMST    */ &[Bank, Bank, Address],
        /* ff GAMEOVER */ &[],
        /* 100 LABEL   */ &[Label],
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_widths_match_the_engine() {
        assert_eq!(ParamType::Label.bit_width(), 32);
        assert_eq!(ParamType::Color.bit_width(), 24);
        assert_eq!(ParamType::FieldId.bit_width(), 16);
        assert_eq!(ParamType::ScriptId.bit_width(), 5);
        assert_eq!(ParamType::Bank.bit_width(), 4);
        assert_eq!(ParamType::Priority.bit_width(), 3);
        assert_eq!(ParamType::Bit.bit_width(), 1);
        assert_eq!(ParamType::MovieId.bit_width(), 8);
    }

    #[test]
    fn only_words_and_coordinates_are_signed() {
        let signed: Vec<_> = (0..=0x100u16)
            .flat_map(|id| schema_for(id).params().iter().copied())
            .filter(|p| p.is_signed())
            .collect();
        assert!(signed
            .iter()
            .all(|p| matches!(p, ParamType::SWord | ParamType::CoordX | ParamType::CoordY | ParamType::CoordZ)));
        assert!(!ParamType::Word.is_signed());
    }

    #[test]
    fn split_keeps_engine_order() {
        let schema = schema_for(0x09);
        assert_eq!(schema.len(), 13);
        assert_eq!(&schema.params()[..6], &[ParamType::Bank; 6]);
        assert_eq!(schema.params()[6], ParamType::CoordX);
        assert_eq!(schema.params()[8], ParamType::Direction);
        assert_eq!(schema.params()[12], ParamType::Speed);
        assert_eq!(schema.bit_len(), 112);
    }

    #[test]
    fn escapes_and_unmapped_ids_have_no_schema() {
        assert!(schema_for(0x0F).is_empty());
        assert!(schema_for(0x28).is_empty());
        assert!(schema_for(0x1C).is_empty());
        assert!(schema_for(0xFF).is_empty());
        assert!(schema_for(0x101).is_empty());
        assert!(schema_for(0xFFFF).is_empty());
    }

    #[test]
    fn label_is_a_single_32_bit_field() {
        let fields: Vec<_> = schema_for(0x100).fields().collect();
        assert_eq!(fields, vec![ParamType::Label.descriptor()]);
    }

    #[test]
    fn descriptor_ranges() {
        assert_eq!(ParamType::SWord.descriptor().range(), (-32768, 32767));
        assert_eq!(ParamType::Word.descriptor().range(), (0, 65535));
        assert_eq!(ParamType::Bank.descriptor().range(), (0, 15));
        assert_eq!(ParamType::Bit.descriptor().range(), (0, 1));
        assert_eq!(ParamType::Label.descriptor().range(), (0, 0x7FFF_FFFF));
        assert_eq!(FieldDescriptor::RAW_BYTE.range(), (0, 255));
    }
}
