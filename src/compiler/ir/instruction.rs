//! Triples: opcode plus a fixed pair of operands

use std::fmt;

use crate::runtime::MStr;

/// Handle of a triple in a [`super::TripleArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TripleRef(pub(crate) u32);

impl TripleRef {
    /// Arena index
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index into the literal table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LitId(pub u32);

/// Index into the variable table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarIdx(pub u32);

/// Shared result slot (filled once the right-hand side is parsed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultSlot(pub u32);

/// Jump destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpTarget {
    /// Not yet set
    Pending,
    /// Whatever triple ends up following this one once the chain is final
    NextAfter(TripleRef),
    /// Concrete destination
    Resolved(TripleRef),
}

/// Triple operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Operand {
    /// Unused
    #[default]
    None,
    /// Value computed by another triple
    Triple(TripleRef),
    /// Literal table entry
    Lit(LitId),
    /// Immediate integer
    ILit(i64),
    /// Local variable
    Var(VarIdx),
    /// String constant
    Str(MStr),
    /// Saved indirect glvn (control slot)
    GlvnSlot(u32),
    /// Indirect reference to the shared right-hand-side result
    Result(ResultSlot),
    /// Jump destination
    Jump(JumpTarget),
}

impl Operand {
    /// Referenced triple, if this is a triple reference
    pub fn triple(&self) -> Option<TripleRef> {
        match self {
            Operand::Triple(t) => Some(*t),
            _ => None,
        }
    }

    /// True unless `Operand::None`
    pub fn is_some(&self) -> bool {
        !matches!(self, Operand::None)
    }
}

/// Opcodes emitted by the front end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Structure
    /// Sentinel heading a chain
    ChainHead,
    /// Does nothing; landing pad for jumps
    Noop,
    /// Argument carrier: value in operand 0, next parameter in operand 1
    Parameter,
    /// Literal value
    Lit,
    /// Immediate integer
    ILit,
    /// Local variable fetch
    Var,
    /// Copy into a temporary so later side effects cannot change it
    StoTemp,

    // Expression operators
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `\`
    IDiv,
    /// `#`
    Mod,
    /// `_`
    Concat,
    /// `=`
    Equ,
    /// `'=`
    Nequ,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `'<`
    NLt,
    /// `'>`
    NGt,
    /// `[`
    Contains,
    /// `'[`
    NContains,
    /// `]`
    Follows,
    /// `']`
    NFollows,
    /// `]]`
    SortsAfter,
    /// `']]`
    NSortsAfter,
    /// `&`
    And,
    /// `!`
    Or,
    /// `'&`
    NAnd,
    /// `'!`
    NOr,
    /// Unary `-`
    Neg,
    /// Unary `+`
    ForceNum,
    /// Unary `'`
    Not,

    // Fetches
    /// Subscripted local fetch
    GetIndx,
    /// Global fetch after a name triple
    GvGet,
    /// Special variable fetch
    SvGet,
    /// Indirect rvalue
    IndRvalue,
    /// Intrinsic function call
    FnCall,
    /// `$$` extrinsic call
    Exfun,

    // SET targets
    /// Subscripted local lvalue
    PutIndx,
    /// Global name
    GvName,
    /// Naked global reference
    GvNaked,
    /// Extended global reference
    GvExtNam,
    /// Store into a local
    Sto,
    /// Store into the current global
    GvPut,
    /// Store into a special variable
    SvPut,
    /// Store into a special variable that is a trap
    PsvPut,
    /// Store through a saved indirect glvn
    StoGlvn,
    /// Evaluate an indirect glvn and save it in a control slot
    IndSavGlvn,
    /// Release saved glvn slots
    GlvnPop,
    /// Fetch through a saved indirect glvn
    IndGet1,
    /// Local fetch for a pseudo-function target
    FnGet,
    /// Global fetch for a pseudo-function target
    FnGvGet,
    /// Replace pieces
    SetPiece,
    /// Replace pieces, byte oriented
    SetZPiece,
    /// Replace characters
    SetExtract,
    /// Replace bytes
    SetZExtract,
    /// Replace pieces with a single-character delimiter
    SetP1,
    /// Replace pieces with a single-byte delimiter
    SetZP1,
    /// Defer a whole argument to run-time indirection
    CommArg,
    /// Naked `$ZWRTAC` target
    ClrAlsVars,
    /// Alias to alias
    SetAls2Als,
    /// Container into alias container
    SetAlsIn2AlsCt,
    /// Container into alias
    SetAlsCtIn2Als,
    /// Container to container
    SetAlsCt2AlsCt,
    /// Extrinsic result into alias
    SetFnRetIn2Als,
    /// Extrinsic result into alias container
    SetFnRetIn2AlsCt,

    // Control
    /// Unconditional jump
    Jmp,
    /// Coerce to a boolean test
    CoBool,
    /// Jump when the last test was <= 0
    JmpLeq,
    /// Compare first and last positions
    VxCmpl,
    /// Jump when the last compare was greater
    JmpGtr,
    /// Raise a compile-time error when executed
    RtError,
}

impl Opcode {
    /// Listing mnemonic
    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            ChainHead => "HEAD",
            Noop => "NOOP",
            Parameter => "PARAMETER",
            Lit => "LIT",
            ILit => "ILIT",
            Var => "VAR",
            StoTemp => "STOTEMP",
            Add => "ADD",
            Sub => "SUB",
            Mul => "MUL",
            Div => "DIV",
            IDiv => "IDIV",
            Mod => "MOD",
            Concat => "CAT",
            Equ => "EQU",
            Nequ => "NEQU",
            Lt => "LT",
            Gt => "GT",
            NLt => "NLT",
            NGt => "NGT",
            Contains => "CONTAIN",
            NContains => "NCONTAIN",
            Follows => "FOLLOW",
            NFollows => "NFOLLOW",
            SortsAfter => "SORTSAFTER",
            NSortsAfter => "NSORTSAFTER",
            And => "AND",
            Or => "OR",
            NAnd => "NAND",
            NOr => "NOR",
            Neg => "NEG",
            ForceNum => "FORCENUM",
            Not => "COM",
            GetIndx => "GETINDX",
            GvGet => "GVGET",
            SvGet => "SVGET",
            IndRvalue => "INDRVAL",
            FnCall => "FNCALL",
            Exfun => "EXFUN",
            PutIndx => "PUTINDX",
            GvName => "GVNAME",
            GvNaked => "GVNAKED",
            GvExtNam => "GVEXTNAM",
            Sto => "STO",
            GvPut => "GVPUT",
            SvPut => "SVPUT",
            PsvPut => "PSVPUT",
            StoGlvn => "STOGLVN",
            IndSavGlvn => "INDSAVGLVN",
            GlvnPop => "GLVNPOP",
            IndGet1 => "INDGET1",
            FnGet => "FNGET",
            FnGvGet => "FNGVGET",
            SetPiece => "SETPIECE",
            SetZPiece => "SETZPIECE",
            SetExtract => "SETEXTRACT",
            SetZExtract => "SETZEXTRACT",
            SetP1 => "SETP1",
            SetZP1 => "SETZP1",
            CommArg => "COMMARG",
            ClrAlsVars => "CLRALSVARS",
            SetAls2Als => "SETALS2ALS",
            SetAlsIn2AlsCt => "SETALSIN2ALSCT",
            SetAlsCtIn2Als => "SETALSCTIN2ALS",
            SetAlsCt2AlsCt => "SETALSCT2ALSCT",
            SetFnRetIn2Als => "SETFNRETIN2ALS",
            SetFnRetIn2AlsCt => "SETFNRETIN2ALSCT",
            Jmp => "JMP",
            CoBool => "COBOOL",
            JmpLeq => "JMPLEQ",
            VxCmpl => "VXCMPL",
            JmpGtr => "JMPGTR",
            RtError => "RTERROR",
        }
    }

    /// True for opcodes carrying a jump destination in operand 0
    pub fn is_jump(self) -> bool {
        matches!(self, Opcode::Jmp | Opcode::JmpLeq | Opcode::JmpGtr)
    }

    /// True for the global reference builders
    pub fn is_gvn(self) -> bool {
        matches!(self, Opcode::GvName | Opcode::GvNaked | Opcode::GvExtNam)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// One node of a chain
#[derive(Debug, Clone)]
pub struct Triple {
    /// What the triple does
    pub opcode: Opcode,
    /// Operands
    pub operands: [Operand; 2],
    /// (line, column) the triple was generated at
    pub src: (usize, usize),
    pub(crate) prev: Option<TripleRef>,
    pub(crate) next: Option<TripleRef>,
}

impl Triple {
    pub(crate) fn new(opcode: Opcode, src: (usize, usize)) -> Self {
        Self {
            opcode,
            operands: [Operand::None; 2],
            src,
            prev: None,
            next: None,
        }
    }
}
