//! Error types for the MUMPS value kernel and SET compiler

use std::fmt;

use thiserror::Error;

/// Diagnostic code attached to a compile-time syntax failure
///
/// Codes name the exact condition the parser tripped over; [`SyntaxCode::kind`]
/// folds them into the coarser [`ErrorKind`] taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxCode {
    /// `=` expected after the SET target list
    Equal,
    /// `,` expected between `$PIECE` arguments
    Comma,
    /// `)` missing at the end of a target list or function target
    RParenMissing,
    /// A variable name was expected
    VarExpected,
    /// Unknown special variable name
    InvalidSvn,
    /// Special variable exists but may not be SET
    SvnNoSet,
    /// Unknown function name used as a SET target
    InvalidFunction,
    /// Only a local variable or `$$` call is allowed under alias processing
    AliasExpected,
    /// `SET *` combined with a parenthesized target list
    NoAliasList,
    /// `$ZWRTAC` inside a parenthesized target list
    DzwrNoParen,
    /// `$ZWRTAC` combined with alias processing
    DzwrNoAlias,
    /// String literal without a closing quote
    StringTerminator,
    /// Unknown command keyword
    InvalidCommand,
    /// An expression was expected
    ExpressionExpected,
    /// Space expected between commands
    SpaceExpected,
}

impl SyntaxCode {
    /// Short mnemonic, as printed in diagnostics
    pub fn mnemonic(self) -> &'static str {
        match self {
            SyntaxCode::Equal => "EQUAL",
            SyntaxCode::Comma => "COMMA",
            SyntaxCode::RParenMissing => "RPARENMISSING",
            SyntaxCode::VarExpected => "VAREXPECTED",
            SyntaxCode::InvalidSvn => "INVSVN",
            SyntaxCode::SvnNoSet => "SVNOSET",
            SyntaxCode::InvalidFunction => "INVFCN",
            SyntaxCode::AliasExpected => "ALIASEXPECTED",
            SyntaxCode::NoAliasList => "NOALIASLIST",
            SyntaxCode::DzwrNoParen => "DZWRNOPAREN",
            SyntaxCode::DzwrNoAlias => "DZWRNOALIAS",
            SyntaxCode::StringTerminator => "STRINGTERM",
            SyntaxCode::InvalidCommand => "INVCMD",
            SyntaxCode::ExpressionExpected => "EXPR",
            SyntaxCode::SpaceExpected => "SPOREOL",
        }
    }

    /// Human readable description
    pub fn describe(self) -> &'static str {
        match self {
            SyntaxCode::Equal => "equal sign expected",
            SyntaxCode::Comma => "comma expected",
            SyntaxCode::RParenMissing => "right parenthesis expected",
            SyntaxCode::VarExpected => "variable expected",
            SyntaxCode::InvalidSvn => "invalid special variable name",
            SyntaxCode::SvnNoSet => "special variable cannot be SET",
            SyntaxCode::InvalidFunction => "invalid function name",
            SyntaxCode::AliasExpected => "alias or alias container variable expected",
            SyntaxCode::NoAliasList => "parenthetical lists of alias targets are not allowed",
            SyntaxCode::DzwrNoParen => "$ZWRTAC is not allowed in a parenthesized list",
            SyntaxCode::DzwrNoAlias => "$ZWRTAC is not allowed with alias processing",
            SyntaxCode::StringTerminator => "string literal is not terminated",
            SyntaxCode::InvalidCommand => "invalid command keyword",
            SyntaxCode::ExpressionExpected => "expression expected but not found",
            SyntaxCode::SpaceExpected => "space or end of line expected",
        }
    }

    /// Stable numeric code carried by runtime error triples
    pub fn number(self) -> i64 {
        match self {
            SyntaxCode::Equal => 1,
            SyntaxCode::Comma => 2,
            SyntaxCode::RParenMissing => 3,
            SyntaxCode::VarExpected => 4,
            SyntaxCode::InvalidSvn => 5,
            SyntaxCode::SvnNoSet => 6,
            SyntaxCode::InvalidFunction => 7,
            SyntaxCode::AliasExpected => 8,
            SyntaxCode::NoAliasList => 9,
            SyntaxCode::DzwrNoParen => 10,
            SyntaxCode::DzwrNoAlias => 11,
            SyntaxCode::StringTerminator => 12,
            SyntaxCode::InvalidCommand => 13,
            SyntaxCode::ExpressionExpected => 14,
            SyntaxCode::SpaceExpected => 15,
        }
    }

    /// Taxonomy member this code reports as
    pub fn kind(self) -> ErrorKind {
        match self {
            SyntaxCode::Equal
            | SyntaxCode::Comma
            | SyntaxCode::RParenMissing
            | SyntaxCode::VarExpected
            | SyntaxCode::DzwrNoParen
            | SyntaxCode::StringTerminator
            | SyntaxCode::InvalidCommand
            | SyntaxCode::ExpressionExpected
            | SyntaxCode::SpaceExpected => ErrorKind::Syntax,
            SyntaxCode::InvalidSvn | SyntaxCode::SvnNoSet => ErrorKind::InvalidSpecialVariable,
            SyntaxCode::InvalidFunction => ErrorKind::InvalidFunctionTarget,
            SyntaxCode::AliasExpected | SyntaxCode::NoAliasList | SyntaxCode::DzwrNoAlias => {
                ErrorKind::AliasSyntaxConflict
            }
        }
    }
}

impl fmt::Display for SyntaxCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}, {}", self.mnemonic(), self.describe())
    }
}

/// Coarse failure taxonomy shared by compiler and runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed token sequence
    Syntax,
    /// Unknown or read-only special variable used as a target
    InvalidSpecialVariable,
    /// Unknown pseudo-function used as a target
    InvalidFunctionTarget,
    /// Alias marker mixed with a list or a non-variable source
    AliasSyntaxConflict,
    /// A value that must be defined is not
    UndefinedValue,
    /// Division by zero
    DivideByZero,
    /// Result outside the numeric range
    NumericOverflow,
    /// String longer than the maximum string length
    MaxStringLength,
    /// Arena or side-table allocation failed
    ResourceExhaustion,
    /// Anything else (stale handles, configuration)
    Internal,
}

/// Kernel and compiler errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Compile-time errors
    /// Malformed target/source token sequence
    ///
    /// **Triggered by:** missing `=`, missing `)`, unexpected token kind
    /// **Example:** `SET A 1`
    #[error("Syntax error at line {line}, column {col}: {code}")]
    SyntaxError {
        /// Diagnostic code
        code: SyntaxCode,
        /// Line number where error occurred
        line: usize,
        /// Column number where error occurred
        col: usize,
    },

    /// Unknown or unsettable special variable used as a SET target
    ///
    /// **Example:** `SET $BADSVN=1`, `SET $JOB=1`
    #[error("Invalid special variable target at line {line}, column {col}: {code}")]
    InvalidSpecialVariable {
        /// `InvalidSvn` or `SvnNoSet`
        code: SyntaxCode,
        /// Line number where error occurred
        line: usize,
        /// Column number where error occurred
        col: usize,
    },

    /// Unknown function name used as a pseudo-function SET target
    ///
    /// **Example:** `SET $FOO(X)=1`
    #[error("Invalid function target at line {line}, column {col}: {code}")]
    InvalidFunctionTarget {
        /// Always `InvalidFunction`
        code: SyntaxCode,
        /// Line number where error occurred
        line: usize,
        /// Column number where error occurred
        col: usize,
    },

    /// Alias processing combined with a list or an illegal source
    ///
    /// **Example:** `SET *(A,B)=C`, `SET *A=1`
    #[error("Alias syntax conflict at line {line}, column {col}: {code}")]
    AliasSyntaxConflict {
        /// Diagnostic code
        code: SyntaxCode,
        /// Line number where error occurred
        line: usize,
        /// Column number where error occurred
        col: usize,
    },

    // Runtime errors
    /// A value required to be defined is not
    #[error("Undefined value: {}", .name.as_deref().unwrap_or("<expression>"))]
    UndefinedValue {
        /// Variable name, when known
        name: Option<String>,
    },

    /// Division by zero
    ///
    /// **Triggered by:** `X\0`, `X\"0.0"`
    #[error("Division by zero")]
    DivideByZero,

    /// Numeric result beyond the representable range
    #[error("Numeric overflow")]
    NumericOverflow {
        /// Source-column adjustment used only for error-location hints
        column_hint: i32,
    },

    /// String result longer than the maximum string length
    #[error("Maximum string length exceeded (requested {requested}, limit {limit})")]
    MaxStringLength {
        /// Requested length in bytes
        requested: usize,
        /// Configured limit
        limit: usize,
    },

    // Resource errors
    /// Arena or side-table growth could not obtain memory
    #[error("Resource exhausted: {what} (requested {requested} bytes)")]
    ResourceExhaustion {
        /// What was being grown
        what: &'static str,
        /// Requested capacity
        requested: usize,
    },

    /// String handle refers to a pool generation that has been reset
    #[error("Stale string reference (generation {handle}, pool generation {current})")]
    StaleString {
        /// Generation recorded in the handle
        handle: u32,
        /// Current pool generation
        current: u32,
    },

    /// Invalid configuration document
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Fatal error that cannot be recovered from
    Fatal,
    /// Recoverable error; may be trapped by a user error handler
    Recoverable,
    /// Warning that doesn't prevent the rest of the statement from compiling
    Warning,
}

impl Error {
    /// Build the compile-time error for a diagnostic code at a source location
    pub fn syntax(code: SyntaxCode, line: usize, col: usize) -> Self {
        match code.kind() {
            ErrorKind::InvalidSpecialVariable => Error::InvalidSpecialVariable { code, line, col },
            ErrorKind::InvalidFunctionTarget => Error::InvalidFunctionTarget { code, line, col },
            ErrorKind::AliasSyntaxConflict => Error::AliasSyntaxConflict { code, line, col },
            _ => Error::SyntaxError { code, line, col },
        }
    }

    /// Undefined value with no variable name attached
    pub fn undefined() -> Self {
        Error::UndefinedValue { name: None }
    }

    /// Taxonomy member of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::SyntaxError { .. } => ErrorKind::Syntax,
            Error::InvalidSpecialVariable { .. } => ErrorKind::InvalidSpecialVariable,
            Error::InvalidFunctionTarget { .. } => ErrorKind::InvalidFunctionTarget,
            Error::AliasSyntaxConflict { .. } => ErrorKind::AliasSyntaxConflict,
            Error::UndefinedValue { .. } => ErrorKind::UndefinedValue,
            Error::DivideByZero => ErrorKind::DivideByZero,
            Error::NumericOverflow { .. } => ErrorKind::NumericOverflow,
            Error::MaxStringLength { .. } => ErrorKind::MaxStringLength,
            Error::ResourceExhaustion { .. } => ErrorKind::ResourceExhaustion,
            Error::StaleString { .. } | Error::Config(_) => ErrorKind::Internal,
        }
    }

    /// Diagnostic code, for compile-time errors
    pub fn syntax_code(&self) -> Option<SyntaxCode> {
        match self {
            Error::SyntaxError { code, .. }
            | Error::InvalidSpecialVariable { code, .. }
            | Error::InvalidFunctionTarget { code, .. }
            | Error::AliasSyntaxConflict { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Classify error severity
    pub fn classify(&self) -> ErrorSeverity {
        match self {
            Error::ResourceExhaustion { .. } => ErrorSeverity::Fatal,
            Error::StaleString { .. } => ErrorSeverity::Fatal,

            Error::InvalidSpecialVariable { .. } => ErrorSeverity::Warning,
            Error::InvalidFunctionTarget { .. } => ErrorSeverity::Warning,

            _ => ErrorSeverity::Recoverable,
        }
    }
}

/// Result type for kernel operations
pub type Result<T> = std::result::Result<T, Error>;
