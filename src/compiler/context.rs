//! Per-line compilation state shared by the expression parser and the SET compiler

use std::collections::HashMap;

use super::ir::{ChainId, JumpTarget, LitId, Opcode, Operand, TripleArena, TripleRef, VarIdx};
use super::CompileOptions;
use crate::error::{Error, ErrorSeverity, SyntaxCode};
use crate::lexer::{TokenKind, TokenWindow};
use crate::runtime::{Mval, StringPool};

/// A problem found while compiling a line
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// The error as it will be raised when the line runs
    pub error: Error,
    /// Warning (compilation went on) or not
    pub severity: ErrorSeverity,
    /// Source line
    pub line: usize,
    /// Source column
    pub col: usize,
}

/// Compiler state for one line
pub struct CompilerContext {
    pub(crate) arena: TripleArena,
    /// Chain new triples are appended to
    pub(crate) curtchain: ChainId,
    /// The line's execution chain
    pub(crate) main: ChainId,
    pub(crate) window: TokenWindow,
    /// Set when something evaluated so far may change variables used as subscripts
    pub(crate) temp_subs: bool,
    pub(crate) literals: Vec<Mval>,
    pub(crate) vars: Vec<String>,
    var_index: HashMap<String, VarIdx>,
    pub(crate) pool: StringPool,
    pub(crate) options: CompileOptions,
    pub(crate) diagnostics: Vec<Diagnostic>,
    glvn_slots: u32,
}

impl CompilerContext {
    /// Fresh state over a token window
    pub fn new(window: TokenWindow, options: CompileOptions, pool: StringPool) -> Self {
        let mut arena = TripleArena::new();
        let main = arena.new_chain();
        Self {
            arena,
            curtchain: main,
            main,
            window,
            temp_subs: false,
            literals: Vec::new(),
            vars: Vec::new(),
            var_index: HashMap::new(),
            pool,
            options,
            diagnostics: Vec::new(),
            glvn_slots: 0,
        }
    }

    /// Source position of the window token
    pub(crate) fn src(&self) -> (usize, usize) {
        self.window.position()
    }

    /// Make a triple at the current source position (unlinked)
    pub(crate) fn make_triple(&mut self, opcode: Opcode) -> TripleRef {
        let src = self.src();
        self.arena.make_triple(opcode, src)
    }

    /// Make a triple and append it to the current chain
    pub(crate) fn new_triple(&mut self, opcode: Opcode) -> TripleRef {
        let t = self.make_triple(opcode);
        self.arena.append(self.curtchain, t);
        t
    }

    /// Redirect emission to `chain`, returning the chain previously current
    pub(crate) fn set_current_chain(&mut self, chain: ChainId) -> ChainId {
        std::mem::replace(&mut self.curtchain, chain)
    }

    /// Immediate integer operand
    pub(crate) fn put_ilit(&self, value: i64) -> Operand {
        Operand::ILit(value)
    }

    /// Immediate integer as a value-producing triple
    pub(crate) fn ilit_triple(&mut self, value: i64) -> Operand {
        let t = self.new_triple(Opcode::ILit);
        self.arena.set_operand(t, 0, Operand::ILit(value));
        Operand::Triple(t)
    }

    /// Literal table operand
    pub(crate) fn put_lit(&mut self, value: Mval) -> Operand {
        self.literals.push(value);
        Operand::Lit(LitId(self.literals.len() as u32 - 1))
    }

    /// Literal as a value-producing triple
    pub(crate) fn lit_triple(&mut self, value: Mval) -> Operand {
        let lit = self.put_lit(value);
        let t = self.new_triple(Opcode::Lit);
        self.arena.set_operand(t, 0, lit);
        Operand::Triple(t)
    }

    /// Local variable operand, interning the name
    pub(crate) fn put_mvar(&mut self, name: &str) -> Operand {
        if let Some(idx) = self.var_index.get(name) {
            return Operand::Var(*idx);
        }
        let idx = VarIdx(self.vars.len() as u32);
        self.vars.push(name.to_string());
        self.var_index.insert(name.to_string(), idx);
        Operand::Var(idx)
    }

    /// Value of an `ILIT` triple operand
    pub(crate) fn ilit_value(&self, operand: &Operand) -> Option<i64> {
        let t = operand.triple()?;
        match (self.arena.opcode(t), self.arena.operand(t, 0)) {
            (Opcode::ILit, Operand::ILit(value)) => Some(value),
            _ => None,
        }
    }

    /// Literal held by a `LIT` triple operand
    pub(crate) fn lit_value(&self, operand: &Operand) -> Option<Mval> {
        let t = operand.triple()?;
        match (self.arena.opcode(t), self.arena.operand(t, 0)) {
            (Opcode::Lit, Operand::Lit(id)) => self.literals.get(id.0 as usize).copied(),
            _ => None,
        }
    }

    /// Build the error for `code` at the window position, without reporting it
    pub(crate) fn fail(&self, code: SyntaxCode) -> Error {
        let (line, col) = self.src();
        Error::syntax(code, line, col)
    }

    /// Record a hard error and plant its run-time error triple on the current chain
    pub(crate) fn report(&mut self, error: &Error) {
        let severity = match error.classify() {
            ErrorSeverity::Warning => ErrorSeverity::Recoverable,
            other => other,
        };
        self.record(error.clone(), severity);
    }

    /// Record a warning; compilation of the statement continues
    pub(crate) fn warn(&mut self, code: SyntaxCode) {
        let error = self.fail(code);
        tracing::warn!(code = code.mnemonic(), "{}", error);
        self.record(error, ErrorSeverity::Warning);
    }

    fn record(&mut self, error: Error, severity: ErrorSeverity) {
        let (line, col) = match &error {
            Error::SyntaxError { line, col, .. }
            | Error::InvalidSpecialVariable { line, col, .. }
            | Error::InvalidFunctionTarget { line, col, .. }
            | Error::AliasSyntaxConflict { line, col, .. } => (*line, *col),
            _ => self.src(),
        };
        let number = error.syntax_code().map(SyntaxCode::number).unwrap_or(0);
        self.diagnostics.push(Diagnostic {
            error,
            severity,
            line,
            col,
        });
        self.ins_errtriple(number);
    }

    fn ins_errtriple(&mut self, number: i64) {
        let t = self.new_triple(Opcode::RtError);
        self.arena.set_operand(t, 0, Operand::ILit(number));
        self.arena
            .set_operand(t, 1, Operand::ILit(self.diagnostics.len() as i64 - 1));
    }

    /// Jump destination meaning "whatever follows the current chain's last triple"
    pub(crate) fn next_target(&self) -> Operand {
        Operand::Jump(JumpTarget::NextAfter(self.arena.last_or_head(self.curtchain)))
    }

    /// Evaluate an indirect glvn once and keep it in a fresh control slot
    pub(crate) fn insert_indsavglvn(&mut self, glvn: Operand) -> Operand {
        let slot = Operand::GlvnSlot(self.glvn_slots);
        self.glvn_slots += 1;
        let t = self.new_triple(Opcode::IndSavGlvn);
        self.arena.set_operand(t, 0, glvn);
        self.arena.set_operand(t, 1, slot);
        slot
    }

    /// Snapshot variable-valued subscripts of `sub` into temporaries
    ///
    /// Run when later evaluation (an extrinsic, `$INCREMENT`) could change those variables
    /// before the store happens.
    pub(crate) fn create_temporaries(&mut self, sub: TripleRef) {
        let skip = match self.arena.opcode(sub) {
            Opcode::PutIndx | Opcode::GvName => 1,
            Opcode::GvExtNam => 2,
            _ => 0,
        };
        let mut link = self.arena.operand(sub, 1);
        for _ in 0..skip {
            if let Some(param) = link.triple() {
                link = self.arena.operand(param, 1);
            }
        }
        while let Some(param) = link.triple() {
            link = self.arena.operand(param, 1);
            let Some(value) = self.arena.operand(param, 0).triple() else {
                continue;
            };
            if matches!(self.arena.opcode(value), Opcode::Var | Opcode::GetIndx)
                && self.arena.is_linked(value)
            {
                let temp = self.make_triple(Opcode::StoTemp);
                self.arena.set_operand(temp, 0, Operand::Triple(value));
                self.arena.insert_after(value, temp);
                self.arena.set_operand(param, 0, Operand::Triple(temp));
                tracing::trace!(subscript = value.index(), "captured subscript in temporary");
            }
        }
    }

    /// Chain of `PARAMETER` triples carrying `values`, first to last
    pub(crate) fn param_chain(&mut self, values: &[Operand]) -> Operand {
        let mut next = Operand::None;
        let params: Vec<TripleRef> = values.iter().map(|_| self.new_triple(Opcode::Parameter)).collect();
        for (param, value) in params.iter().zip(values).rev() {
            self.arena.set_operand(*param, 0, *value);
            self.arena.set_operand(*param, 1, next);
            next = Operand::Triple(*param);
        }
        next
    }

    /// Expect `kind` at the window and step over it
    pub(crate) fn expect(&mut self, kind: TokenKind, code: SyntaxCode) -> crate::error::Result<()> {
        if !self.window.at(&kind) {
            return Err(self.fail(code));
        }
        self.window.advance();
        Ok(())
    }

    /// Diagnostics recorded so far
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}
