//! Special variable and intrinsic function name tables

use std::collections::HashMap;

/// Special variables known to the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialVar {
    /// `$DEVICE`
    Device,
    /// `$ECODE`
    ECode,
    /// `$ESTACK`
    EStack,
    /// `$ETRAP`
    ETrap,
    /// `$HOROLOG`
    Horolog,
    /// `$IO`
    Io,
    /// `$JOB`
    Job,
    /// `$KEY`
    Key,
    /// `$PRINCIPAL`
    Principal,
    /// `$QUIT`
    Quit,
    /// `$REFERENCE`
    Reference,
    /// `$STACK`
    Stack,
    /// `$STORAGE`
    Storage,
    /// `$SYSTEM`
    System,
    /// `$TEST`
    Test,
    /// `$TLEVEL`
    TLevel,
    /// `$X`
    X,
    /// `$Y`
    Y,
    /// `$ZDIRECTORY`
    ZDirectory,
    /// `$ZSTATUS`
    ZStatus,
    /// `$ZTRAP`
    ZTrap,
}

impl SpecialVar {
    /// Look a name up (case-insensitive, full name or abbreviation, without the `$`)
    pub fn lookup(name: &str) -> Option<SpecialVar> {
        SVN_NAMES.get(name.to_ascii_uppercase().as_str()).copied()
    }

    /// May this variable be the target of a SET?
    pub fn can_set(self) -> bool {
        matches!(
            self,
            SpecialVar::Device
                | SpecialVar::ECode
                | SpecialVar::ETrap
                | SpecialVar::Key
                | SpecialVar::System
                | SpecialVar::X
                | SpecialVar::Y
                | SpecialVar::ZDirectory
                | SpecialVar::ZStatus
                | SpecialVar::ZTrap
        )
    }

    /// Trap variables are stored with a dedicated opcode
    pub fn is_trap(self) -> bool {
        matches!(self, SpecialVar::ETrap | SpecialVar::ZTrap)
    }

    /// Code carried in the `SVPUT`/`SVGET` operand
    pub fn code(self) -> i64 {
        self as i64
    }
}

/// Intrinsic functions known to the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    /// `$ASCII`
    Ascii,
    /// `$CHAR`
    Char,
    /// `$DATA`
    Data,
    /// `$EXTRACT`
    Extract,
    /// `$FIND`
    Find,
    /// `$GET`
    Get,
    /// `$INCREMENT`
    Increment,
    /// `$JUSTIFY`
    Justify,
    /// `$LENGTH`
    Length,
    /// `$NAME`
    Name,
    /// `$ORDER`
    Order,
    /// `$PIECE`
    Piece,
    /// `$QUERY`
    Query,
    /// `$REVERSE`
    Reverse,
    /// `$TRANSLATE`
    Translate,
    /// `$ZEXTRACT`
    ZExtract,
    /// `$ZJUSTIFY`
    ZJustify,
    /// `$ZPIECE`
    ZPiece,
}

impl Intrinsic {
    /// Look a name up (case-insensitive, full name or abbreviation, without the `$`)
    pub fn lookup(name: &str) -> Option<Intrinsic> {
        FUNCTION_NAMES.get(name.to_ascii_uppercase().as_str()).copied()
    }

    /// Code carried in the `FNCALL` operand
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Functions whose evaluation may change variables used as subscripts
    pub fn has_side_effects(self) -> bool {
        matches!(self, Intrinsic::Increment)
    }
}

lazy_static::lazy_static! {
    /// Special variable names and abbreviations
    static ref SVN_NAMES: HashMap<&'static str, SpecialVar> = {
        use SpecialVar::*;
        let entries: [(&str, &str, SpecialVar); 21] = [
            ("DEVICE", "D", Device),
            ("ECODE", "EC", ECode),
            ("ESTACK", "ES", EStack),
            ("ETRAP", "ET", ETrap),
            ("HOROLOG", "H", Horolog),
            ("IO", "I", Io),
            ("JOB", "J", Job),
            ("KEY", "K", Key),
            ("PRINCIPAL", "P", Principal),
            ("QUIT", "Q", Quit),
            ("REFERENCE", "R", Reference),
            ("STACK", "ST", Stack),
            ("STORAGE", "S", Storage),
            ("SYSTEM", "SY", System),
            ("TEST", "T", Test),
            ("TLEVEL", "TL", TLevel),
            ("X", "X", X),
            ("Y", "Y", Y),
            ("ZDIRECTORY", "ZD", ZDirectory),
            ("ZSTATUS", "ZS", ZStatus),
            ("ZTRAP", "ZT", ZTrap),
        ];
        let mut map = HashMap::new();
        for (name, abbrev, sv) in entries {
            map.insert(name, sv);
            map.insert(abbrev, sv);
        }
        map
    };

    /// Intrinsic function names and abbreviations
    static ref FUNCTION_NAMES: HashMap<&'static str, Intrinsic> = {
        use Intrinsic::*;
        let entries: [(&str, &str, Intrinsic); 18] = [
            ("ASCII", "A", Ascii),
            ("CHAR", "C", Char),
            ("DATA", "D", Data),
            ("EXTRACT", "E", Extract),
            ("FIND", "F", Find),
            ("GET", "G", Get),
            ("INCREMENT", "I", Increment),
            ("JUSTIFY", "J", Justify),
            ("LENGTH", "L", Length),
            ("NAME", "NA", Name),
            ("ORDER", "O", Order),
            ("PIECE", "P", Piece),
            ("QUERY", "Q", Query),
            ("REVERSE", "RE", Reverse),
            ("TRANSLATE", "TR", Translate),
            ("ZEXTRACT", "ZE", ZExtract),
            ("ZJUSTIFY", "ZJ", ZJustify),
            ("ZPIECE", "ZPI", ZPiece),
        ];
        let mut map = HashMap::new();
        for (name, abbrev, f) in entries {
            map.insert(name, f);
            map.insert(abbrev, f);
        }
        map
    };
}
