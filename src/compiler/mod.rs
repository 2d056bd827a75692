//! # M Compiler - SET commands to triples
//!
//! Compiles a source line of SET commands into a chain of triples.
//!
//! ## Architecture
//!
//! ```text
//! source line → tokens → (SET argument → target chain + rhs) → chain → resolve jumps
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use mumps_core::compiler::{Compiler, CompileOptions, Opcode};
//!
//! let compiler = Compiler::new(CompileOptions::default());
//! let line = compiler.compile_line("SET A=1,B=2").unwrap();
//! let stores: Vec<_> = line
//!     .opcodes()
//!     .into_iter()
//!     .filter(|op| *op == Opcode::Sto)
//!     .collect();
//! assert_eq!(stores.len(), 2);
//! ```

pub mod context;
pub mod debug;
pub mod expr;
pub mod ir;
pub mod names;
pub mod set;

pub use context::{CompilerContext, Diagnostic};
pub use debug::{dump_chain, format_chain, format_triple};
pub use expr::ExprType;
pub use ir::{
    ChainId, JumpTarget, LitId, Opcode, Operand, ResultSlot, Triple, TripleArena, TripleRef, VarIdx,
};
pub use names::{Intrinsic, SpecialVar};
pub use set::{SetOutcome, INDIR_SET};

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorSeverity, Result, SyntaxCode};
use crate::lexer::{Scanner, TokenKind, TokenWindow};
use crate::runtime::{Mval, PoolOptions, StringPool};

/// Compilation options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Character semantics for `$PIECE`/`$JUSTIFY` (bytes when false)
    pub utf8_mode: bool,
    /// Fold `\`, `=`, `'=` and `_` over literal operands
    pub fold_literals: bool,
    /// String pool used for literals and folding
    pub pool: PoolOptions,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            utf8_mode: true,
            fold_literals: true,
            pool: PoolOptions::default(),
        }
    }
}

impl CompileOptions {
    /// Load options from a JSON document; missing fields keep their defaults
    pub fn from_json(text: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        if !options.fold_literals {
            tracing::warn!("literal folding disabled");
        }
        Ok(options)
    }
}

/// M line compiler
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    /// Create a new compiler with options
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Options in effect
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile one source line
    ///
    /// Syntax problems do not fail the call: they are recorded as diagnostics and planted as
    /// run-time error triples, as the line must still raise them when executed. Only scanning
    /// and resource failures are returned as errors.
    pub fn compile_line(&self, source: &str) -> Result<CompiledLine> {
        let tokens = Scanner::new(source).scan_tokens()?;
        let pool = StringPool::new(self.options.pool.clone())?;
        let mut ctx = CompilerContext::new(TokenWindow::new(tokens), self.options.clone(), pool);

        let mut commands = 0;
        'line: loop {
            while ctx.window.at(&TokenKind::Space) {
                ctx.window.advance();
            }
            if ctx.window.at(&TokenKind::Eol) {
                break;
            }
            let is_set = ctx
                .window
                .ident()
                .is_some_and(|kw| kw.eq_ignore_ascii_case("S") || kw.eq_ignore_ascii_case("SET"));
            if !is_set {
                let error = ctx.fail(SyntaxCode::InvalidCommand);
                ctx.report(&error);
                break;
            }
            ctx.window.advance();
            if !ctx.window.at(&TokenKind::Space) {
                let code = if ctx.window.at(&TokenKind::Eol) {
                    SyntaxCode::VarExpected
                } else {
                    SyntaxCode::SpaceExpected
                };
                let error = ctx.fail(code);
                ctx.report(&error);
                break;
            }
            ctx.window.advance();

            loop {
                match ctx.compile_set() {
                    Ok(outcome) => {
                        tracing::trace!(targets = outcome.targets, "compiled SET argument");
                    }
                    Err(Error::ResourceExhaustion { what, requested }) => {
                        return Err(Error::ResourceExhaustion { what, requested });
                    }
                    Err(_) => break 'line,
                }
                if !ctx.window.at(&TokenKind::Comma) {
                    break;
                }
                ctx.window.advance();
            }
            commands += 1;

            if !ctx.window.at(&TokenKind::Space) && !ctx.window.at(&TokenKind::Eol) {
                let error = ctx.fail(SyntaxCode::SpaceExpected);
                ctx.report(&error);
                break;
            }
        }

        let jumps = ctx.arena.resolve_jumps(ctx.main);
        tracing::debug!(
            commands,
            triples = ctx.arena.len(ctx.main),
            jumps,
            diagnostics = ctx.diagnostics.len(),
            "compiled line"
        );
        Ok(CompiledLine::from_context(ctx, source))
    }
}

/// Compilation result for one line
#[derive(Debug, Clone)]
pub struct CompiledLine {
    source: String,
    arena: TripleArena,
    main: ChainId,
    literals: Vec<Mval>,
    vars: Vec<String>,
    pool: StringPool,
    diagnostics: Vec<Diagnostic>,
}

impl CompiledLine {
    fn from_context(ctx: CompilerContext, source: &str) -> Self {
        Self {
            source: source.to_string(),
            arena: ctx.arena,
            main: ctx.main,
            literals: ctx.literals,
            vars: ctx.vars,
            pool: ctx.pool,
            diagnostics: ctx.diagnostics,
        }
    }

    /// Source text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Triples in execution order
    pub fn triples(&self) -> Vec<TripleRef> {
        self.arena.iter(self.main).collect()
    }

    /// Opcodes in execution order
    pub fn opcodes(&self) -> Vec<Opcode> {
        self.arena.iter(self.main).map(|t| self.arena.opcode(t)).collect()
    }

    /// Position of the first triple with `opcode`
    pub fn position(&self, opcode: Opcode) -> Option<usize> {
        self.opcodes().iter().position(|op| *op == opcode)
    }

    /// Positions of every triple with `opcode`
    pub fn positions(&self, opcode: Opcode) -> Vec<usize> {
        self.opcodes()
            .iter()
            .enumerate()
            .filter(|(_, op)| **op == opcode)
            .map(|(i, _)| i)
            .collect()
    }

    /// Borrow a triple
    pub fn triple(&self, t: TripleRef) -> &Triple {
        self.arena.get(t)
    }

    /// The arena holding every triple
    pub fn arena(&self) -> &TripleArena {
        &self.arena
    }

    /// The line's chain
    pub fn chain(&self) -> ChainId {
        self.main
    }

    /// Content of a shared result slot
    pub fn result(&self, slot: ResultSlot) -> Operand {
        self.arena.result(slot)
    }

    /// Literal value
    pub fn literal(&self, id: LitId) -> Option<&Mval> {
        self.literals.get(id.0 as usize)
    }

    /// Literal rendered as source text (strings quoted)
    pub fn literal_text(&self, id: LitId) -> Option<String> {
        let value = self.literal(id)?;
        let text = value.render(&self.pool).ok()?;
        Some(match value {
            Mval::Str { .. } => format!("{:?}", text),
            _ => text,
        })
    }

    /// Name of a local variable
    pub fn var_name(&self, idx: VarIdx) -> Option<&str> {
        self.vars.get(idx.0 as usize).map(String::as_str)
    }

    /// Every local variable referenced, by index
    pub fn vars(&self) -> &[String] {
        &self.vars
    }

    /// String pool holding the line's literals
    pub fn pool(&self) -> &StringPool {
        &self.pool
    }

    /// Diagnostics, warnings included
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// True when some diagnostic is more than a warning
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity != ErrorSeverity::Warning)
    }

    /// Listing of the chain
    pub fn dump(&self) -> String {
        format_chain(self)
    }
}
