//! # SET command compilation
//!
//! One SET argument (`target=expr`, `(t1,t2,...)=expr`, `*alias=source`, `@x`) becomes a run of
//! triples on the current chain.
//!
//! Target triples are built on a private *target chain* while the right-hand side is parsed
//! onto the current chain; the target chain is spliced after the right-hand side at the end.
//! The right-hand side is therefore evaluated once, and every store reads it through one shared
//! result slot. Targets execute left to right.
//!
//! ```text
//! SET ^X($$F())=$$G()
//!
//!   EXFUN F        (subscripts, on the current chain)
//!   EXFUN G        (right-hand side)
//!   GVNAME ^X      ┐ target chain, spliced
//!   GVPUT  =G      ┘
//! ```
//!
//! `$PIECE`/`$EXTRACT` targets put their range guards *before* the target's addressing triples,
//! so an empty range never touches the naked indicator.

use super::context::CompilerContext;
use super::expr::ExprType;
use super::ir::{ChainId, Opcode, Operand, TripleRef};
use super::names::{Intrinsic, SpecialVar};
use crate::error::{Result, SyntaxCode};
use crate::lexer::TokenKind;
use crate::runtime::{MStr, Mval};

/// Indirection code carried by a deferred `SET @X` argument
pub const INDIR_SET: i64 = 1;

const DZWRTAC: &str = "$ZWRTAC";

/// Validity of the first target of an argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FirstTarget {
    NotSeen,
    Valid,
    Invalid,
}

/// What compiling one SET argument produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetOutcome {
    /// The whole argument was deferred to run-time indirection
    pub deferred: bool,
    /// Number of targets compiled
    pub targets: usize,
    /// The first target was invalid; only its error triple was kept
    pub first_target_invalid: bool,
}

struct SetState {
    targchain: ChainId,
    first: FirstTarget,
    /// Chain to restore when the first target turned out invalid
    saved_curtchain: Option<ChainId>,
    saved_targchain: Option<ChainId>,
    put: Option<TripleRef>,
    /// Last subscripted target, candidate for temporaries
    sub: Option<TripleRef>,
    first_control_slot: Option<Operand>,
}

impl CompilerContext {
    /// Compile one SET argument at the window
    ///
    /// Errors are reported (diagnostic plus run-time error triple) before being returned, with
    /// the current chain restored first.
    pub fn compile_set(&mut self) -> Result<SetOutcome> {
        let targchain = self.arena.new_chain();
        let mut state = SetState {
            targchain,
            first: FirstTarget::NotSeen,
            saved_curtchain: None,
            saved_targchain: None,
            put: None,
            sub: None,
            first_control_slot: None,
        };
        match self.set_argument(&mut state) {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                if let Some(saved) = state.saved_curtchain.take() {
                    self.set_current_chain(saved);
                }
                self.temp_subs = false;
                self.report(&error);
                Err(error)
            }
        }
    }

    fn set_argument(&mut self, st: &mut SetState) -> Result<SetOutcome> {
        self.temp_subs = false;
        let result = self.arena.new_result_slot();
        let resptr = Operand::Result(result);

        let alias = self.window.at(&TokenKind::Asterisk);
        if alias {
            self.window.advance();
        }
        let got_lparen = self.window.at(&TokenKind::LParen);
        if got_lparen {
            if alias {
                return Err(self.fail(SyntaxCode::NoAliasList));
            }
            self.window.advance();
            self.temp_subs = true;
        }

        let mut targets = 0;
        loop {
            let target = self.set_target(st, alias, got_lparen, resptr)?;
            if let Some(deferred) = target.deferred {
                return Ok(deferred);
            }
            targets += 1;

            if st.first == FirstTarget::NotSeen {
                if target.warned {
                    st.first = FirstTarget::Invalid;
                    // everything after an invalid first target is compiled and thrown away
                    let discard = self.arena.new_chain();
                    st.saved_curtchain = Some(self.set_current_chain(discard));
                    st.saved_targchain = Some(st.targchain);
                    st.targchain = self.arena.new_chain();
                    tracing::debug!("first SET target invalid, discarding the rest of the argument");
                } else {
                    st.first = FirstTarget::Valid;
                }
            }

            if !got_lparen {
                break;
            }
            match self.window.kind() {
                TokenKind::Comma => self.window.advance(),
                TokenKind::RParen => {
                    self.window.advance();
                    break;
                }
                _ => return Err(self.fail(SyntaxCode::RParenMissing)),
            }
        }

        self.expect(TokenKind::Equal, SyntaxCode::Equal)?;
        let temp_subs_was_clear = !self.temp_subs;
        if !alias {
            let rhs = self.expr(ExprType::Expr)?;
            self.arena.fill_result(result, rhs);
        } else {
            let source = self.alias_source(st)?;
            self.arena.fill_result(result, source);
        }

        if st.first == FirstTarget::Invalid {
            if let Some(saved) = st.saved_curtchain.take() {
                self.set_current_chain(saved);
            }
            if let Some(saved) = st.saved_targchain.take() {
                st.targchain = saved;
            }
        }
        let cursor = self.arena.last_or_head(self.curtchain);
        tracing::debug!(
            targets,
            triples = self.arena.len(st.targchain),
            "splicing SET targets after right-hand side"
        );
        self.arena.splice_after(cursor, st.targchain);

        if self.temp_subs && temp_subs_was_clear {
            if let Some(sub) = st.sub {
                self.create_temporaries(sub);
            }
        }
        self.temp_subs = false;
        if let Some(slot) = st.first_control_slot {
            let pop = self.new_triple(Opcode::GlvnPop);
            self.arena.set_operand(pop, 0, slot);
        }
        Ok(SetOutcome {
            deferred: false,
            targets,
            first_target_invalid: st.first == FirstTarget::Invalid,
        })
    }

    /// Source of `SET *target=source`
    fn alias_source(&mut self, st: &mut SetState) -> Result<Operand> {
        self.window.allow_dzwrtac_as_mident();
        let Some(name) = self.window.ident().map(str::to_string) else {
            if self.window.at(&TokenKind::Dollar)
                && self.window.director_kind() == &TokenKind::Dollar
            {
                self.temp_subs = true;
                self.window.advance();
                let call = self.exfunc()?;
                if let Some(put) = st.put {
                    let op = if self.arena.opcode(put) == Opcode::SetAlsIn2AlsCt {
                        Opcode::SetFnRetIn2AlsCt
                    } else {
                        Opcode::SetFnRetIn2Als
                    };
                    self.arena.set_opcode(put, op);
                }
                return Ok(call);
            }
            return Err(self.fail(SyntaxCode::AliasExpected));
        };
        if name.starts_with('$') && name.len() <= DZWRTAC.len() {
            return Err(self.fail(SyntaxCode::DzwrNoAlias));
        }
        if self.window.director_kind() == &TokenKind::LParen {
            if let Some(put) = st.put {
                let op = if self.arena.opcode(put) == Opcode::SetAls2Als {
                    Opcode::SetAlsCtIn2Als
                } else {
                    Opcode::SetAlsCt2AlsCt
                };
                self.arena.set_opcode(put, op);
            }
        }
        self.lvn(Opcode::GetIndx)
    }

    fn set_target(
        &mut self,
        st: &mut SetState,
        alias: bool,
        got_lparen: bool,
        resptr: Operand,
    ) -> Result<TargetOutcome> {
        self.window.allow_dzwrtac_as_mident();
        match self.window.kind().clone() {
            TokenKind::Ident(name) => {
                self.local_target(st, &name, alias, got_lparen, resptr)?;
                Ok(TargetOutcome::done())
            }
            TokenKind::Circumflex => {
                if alias {
                    return Err(self.fail(SyntaxCode::AliasExpected));
                }
                self.global_reference(st)?;
                let put = self.make_triple(Opcode::GvPut);
                self.arena.set_operand(put, 0, resptr);
                self.arena.append(st.targchain, put);
                st.put = Some(put);
                Ok(TargetOutcome::done())
            }
            TokenKind::At => {
                if alias {
                    return Err(self.fail(SyntaxCode::AliasExpected));
                }
                let target = self.indirection()?;
                if !got_lparen && !self.window.at(&TokenKind::Equal) {
                    let arg = self.new_triple(Opcode::CommArg);
                    self.arena.set_operand(arg, 0, target);
                    self.arena.set_operand(arg, 1, Operand::ILit(INDIR_SET));
                    return Ok(TargetOutcome::deferred());
                }
                let slot = self.saved_glvn(st, target);
                let put = self.make_triple(Opcode::StoGlvn);
                self.arena.set_operand(put, 0, slot);
                self.arena.set_operand(put, 1, resptr);
                self.arena.append(st.targchain, put);
                st.put = Some(put);
                Ok(TargetOutcome::done())
            }
            TokenKind::Dollar => {
                if alias {
                    return Err(self.fail(SyntaxCode::AliasExpected));
                }
                self.window.advance();
                if self.window.ident().is_none() {
                    return Err(self.fail(SyntaxCode::VarExpected));
                }
                let warned = if self.window.director_kind() != &TokenKind::LParen {
                    self.svn_target(st, resptr)
                } else {
                    self.function_target(st, resptr)?
                };
                Ok(TargetOutcome {
                    warned,
                    deferred: None,
                })
            }
            TokenKind::Asterisk => Err(self.fail(SyntaxCode::NoAliasList)),
            _ => Err(self.fail(SyntaxCode::VarExpected)),
        }
    }

    fn local_target(
        &mut self,
        st: &mut SetState,
        name: &str,
        alias: bool,
        got_lparen: bool,
        resptr: Operand,
    ) -> Result<()> {
        if name.starts_with('$') {
            if got_lparen {
                return Err(self.fail(SyntaxCode::DzwrNoParen));
            }
            if name.len() == DZWRTAC.len() {
                if alias {
                    return Err(self.fail(SyntaxCode::DzwrNoAlias));
                }
                let put = self.make_triple(Opcode::ClrAlsVars);
                self.arena.set_operand(put, 0, resptr);
                self.arena.append(st.targchain, put);
                st.put = Some(put);
                self.window.advance();
                return Ok(());
            }
        }

        let mut lh_alias = false;
        let target = if !alias || self.window.director_kind() == &TokenKind::LParen {
            let target = self.lvn(Opcode::PutIndx)?;
            self.move_subscripted(st, target);
            target
        } else {
            lh_alias = true;
            let Operand::Var(idx) = self.put_mvar(name) else {
                return Err(self.fail(SyntaxCode::VarExpected));
            };
            self.window.advance();
            self.put_ilit(idx.0 as i64)
        };

        let op = match (alias, lh_alias) {
            (false, _) => Opcode::Sto,
            (true, true) => Opcode::SetAls2Als,
            (true, false) => Opcode::SetAlsIn2AlsCt,
        };
        let put = self.make_triple(op);
        self.arena.set_operand(put, 0, target);
        self.arena.set_operand(put, 1, resptr);
        self.arena.append(st.targchain, put);
        st.put = Some(put);
        Ok(())
    }

    /// Move a freshly built `PUTINDX` from the current chain to the target chain
    fn move_subscripted(&mut self, st: &mut SetState, target: Operand) {
        let Some(sub) = target.triple() else {
            return;
        };
        if self.arena.opcode(sub) != Opcode::PutIndx {
            return;
        }
        self.arena.detach(sub);
        self.arena.append(st.targchain, sub);
        st.sub = Some(sub);
        if self.temp_subs {
            self.create_temporaries(sub);
        }
    }

    /// Parse a global reference and move its name triple to the target chain
    fn global_reference(&mut self, st: &mut SetState) -> Result<()> {
        let before = self.arena.last_or_head(self.curtchain);
        self.gvn()?;
        let mut cursor = self.arena.last(self.curtchain);
        while let Some(t) = cursor {
            if t == before {
                break;
            }
            if self.arena.opcode(t).is_gvn() {
                self.arena.detach(t);
                self.arena.append(st.targchain, t);
                st.sub = Some(t);
                if self.temp_subs {
                    self.create_temporaries(t);
                }
                break;
            }
            cursor = self.arena.predecessor(self.curtchain, t);
        }
        Ok(())
    }

    /// Save an indirect target once per argument
    fn saved_glvn(&mut self, st: &mut SetState, target: Operand) -> Operand {
        let slot = self.insert_indsavglvn(target);
        if st.first_control_slot.is_none() {
            st.first_control_slot = Some(slot);
        }
        slot
    }

    /// `SET $X=...`; returns true when a warning was raised
    fn svn_target(&mut self, st: &mut SetState, resptr: Operand) -> bool {
        let name = self.window.ident().map(str::to_string).unwrap_or_default();
        let target = match SpecialVar::lookup(&name) {
            None => {
                self.warn(SyntaxCode::InvalidSvn);
                None
            }
            Some(sv) if !sv.can_set() => {
                self.warn(SyntaxCode::SvnNoSet);
                None
            }
            Some(sv) => Some(sv),
        };
        self.window.advance();
        match target {
            Some(sv) => {
                let op = if sv.is_trap() {
                    Opcode::PsvPut
                } else {
                    Opcode::SvPut
                };
                let put = self.make_triple(op);
                self.arena.set_operand(put, 0, Operand::ILit(sv.code()));
                self.arena.set_operand(put, 1, resptr);
                self.arena.append(st.targchain, put);
                st.put = Some(put);
                false
            }
            None => {
                self.move_error_triple(st);
                true
            }
        }
    }

    /// Move the error triple a warning just planted onto the target chain
    fn move_error_triple(&mut self, st: &mut SetState) {
        if let Some(err) = self.arena.last(self.curtchain) {
            debug_assert_eq!(self.arena.opcode(err), Opcode::RtError);
            self.arena.detach(err);
            self.arena.append(st.targchain, err);
        }
    }

    /// `SET $PIECE(...)=...` and friends; returns true when a warning was raised
    fn function_target(&mut self, st: &mut SetState, resptr: Operand) -> Result<bool> {
        let name = self.window.ident().map(str::to_string).unwrap_or_default();
        let Some(function) = Intrinsic::lookup(&name) else {
            self.warn(SyntaxCode::InvalidFunction);
            self.move_error_triple(st);
            self.window.advance();
            self.window.advance();
            self.skip_to_closing_paren();
            self.expect(TokenKind::RParen, SyntaxCode::RParenMissing)?;
            return Ok(true);
        };
        let (setop, is_extract) = match function {
            Intrinsic::Piece => (Opcode::SetPiece, false),
            Intrinsic::ZPiece => (Opcode::SetZPiece, false),
            Intrinsic::Extract => (Opcode::SetExtract, true),
            Intrinsic::ZExtract => (Opcode::SetZExtract, true),
            _ => return Err(self.fail(SyntaxCode::VarExpected)),
        };
        self.window.advance();
        self.window.advance();

        // guards go in front of this target's addressing triples
        let mut guard_cursor = self.arena.last_or_head(st.targchain);
        let s = self.make_triple(setop);

        let (get, put) = match self.window.kind() {
            TokenKind::Ident(_) => {
                let target = self.lvn(Opcode::PutIndx)?;
                self.move_subscripted(st, target);
                let get = self.make_triple(Opcode::FnGet);
                self.arena.set_operand(get, 0, target);
                let put = self.make_triple(Opcode::Sto);
                self.arena.set_operand(put, 0, target);
                self.arena.set_operand(put, 1, Operand::Triple(s));
                (get, put)
            }
            TokenKind::At => {
                let target = self.indirection()?;
                let slot = self.saved_glvn(st, target);
                let get = self.make_triple(Opcode::IndGet1);
                self.arena.set_operand(get, 0, slot);
                let put = self.make_triple(Opcode::StoGlvn);
                self.arena.set_operand(put, 0, slot);
                self.arena.set_operand(put, 1, Operand::Triple(s));
                (get, put)
            }
            TokenKind::Circumflex => {
                self.global_reference(st)?;
                let get = self.make_triple(Opcode::FnGvGet);
                self.arena.set_operand(get, 0, Operand::Str(MStr::EMPTY));
                let put = self.make_triple(Opcode::GvPut);
                self.arena.set_operand(put, 0, Operand::Triple(s));
                (get, put)
            }
            _ => return Err(self.fail(SyntaxCode::VarExpected)),
        };
        self.arena.set_operand(s, 0, Operand::Triple(get));
        self.arena.append(st.targchain, get);

        let mut delimiter = None;
        let mut delimval = Operand::None;
        let first = self.new_triple(Opcode::Parameter);
        if !is_extract {
            let d = self.new_triple(Opcode::Parameter);
            self.arena.set_operand(s, 1, Operand::Triple(d));
            self.arena.set_operand(d, 1, Operand::Triple(first));
            delimiter = Some(d);
            self.expect(TokenKind::Comma, SyntaxCode::Comma)?;
            delimval = self.expr(ExprType::Str)?;
        } else {
            self.arena.set_operand(s, 1, Operand::Triple(first));
        }

        let firstval = if self.window.at(&TokenKind::Comma) {
            self.window.advance();
            self.expr(ExprType::Int)?
        } else {
            self.ilit_triple(1)
        };
        self.arena.set_operand(first, 0, firstval);
        let first_lit = self.ilit_value(&firstval);

        let mut delim1char = false;
        let mut last = None;
        let mut jmp1 = None;
        let mut jmp2 = None;
        if !self.window.at(&TokenKind::Comma) {
            if let Some(d) = delimiter {
                if let Some(packed) = self.single_char_delimiter(setop, &delimval) {
                    self.arena.set_opcode(s, packed.opcode);
                    self.arena.set_operand(d, 0, Operand::ILit(packed.value));
                    delim1char = true;
                }
            }
            if !delim1char {
                if let Some(d) = delimiter {
                    self.arena.set_operand(d, 0, delimval);
                }
                let l = self.new_triple(Opcode::Parameter);
                self.arena.set_operand(first, 1, Operand::Triple(l));
                self.arena.set_operand(l, 0, firstval);
                last = Some(l);
            }
            match first_lit {
                Some(value) if value < 1 => {
                    jmp1 = Some(self.guard(&mut guard_cursor, Opcode::Jmp));
                }
                Some(_) => {}
                None => {
                    let test = self.guard(&mut guard_cursor, Opcode::CoBool);
                    self.arena.set_operand(test, 0, firstval);
                    jmp1 = Some(self.guard(&mut guard_cursor, Opcode::JmpLeq));
                }
            }
        } else {
            if let Some(d) = delimiter {
                self.arena.set_operand(d, 0, delimval);
            }
            let l = self.new_triple(Opcode::Parameter);
            self.arena.set_operand(first, 1, Operand::Triple(l));
            self.window.advance();
            let lastval = self.expr(ExprType::Int)?;
            self.arena.set_operand(l, 0, lastval);
            last = Some(l);
            let last_lit = self.ilit_value(&lastval);
            match last_lit {
                Some(value) => {
                    if value < 1 || first_lit.is_some_and(|f| f > value) {
                        jmp1 = Some(self.guard(&mut guard_cursor, Opcode::Jmp));
                    }
                }
                None => {
                    let test = self.guard(&mut guard_cursor, Opcode::CoBool);
                    self.arena.set_operand(test, 0, lastval);
                    jmp1 = Some(self.guard(&mut guard_cursor, Opcode::JmpLeq));
                }
            }
            if last_lit.is_none() || first_lit.is_none() {
                let cmp = self.guard(&mut guard_cursor, Opcode::VxCmpl);
                self.arena.set_operand(cmp, 0, firstval);
                self.arena.set_operand(cmp, 1, lastval);
                jmp2 = Some(self.guard(&mut guard_cursor, Opcode::JmpGtr));
            }
        }

        self.expect(TokenKind::RParen, SyntaxCode::RParenMissing)?;

        self.arena.append(st.targchain, s);
        self.arena.append(st.targchain, put);
        st.put = Some(put);
        match last {
            Some(l) if !delim1char => self.arena.set_operand(l, 1, resptr),
            _ => self.arena.set_operand(first, 1, resptr),
        }
        let saved = self.set_current_chain(st.targchain);
        for jump in [jmp1, jmp2].into_iter().flatten() {
            let past_store = self.next_target();
            self.arena.set_operand(jump, 0, past_store);
        }
        self.set_current_chain(saved);
        Ok(false)
    }

    /// Insert a guard triple at the cursor on the target chain and advance the cursor
    fn guard(&mut self, cursor: &mut TripleRef, op: Opcode) -> TripleRef {
        let t = self.make_triple(op);
        self.arena.insert_after(*cursor, t);
        *cursor = t;
        t
    }

    /// Single-character literal delimiter, packed into an integer
    fn single_char_delimiter(&self, setop: Opcode, delimval: &Operand) -> Option<PackedDelimiter> {
        let value = self.lit_value(delimval)?;
        let Mval::Str { text, .. } = value else {
            return None;
        };
        let bytes = self.pool.bytes(&text).ok()?;
        let chars_mode = self.options.utf8_mode && setop == Opcode::SetPiece;
        if chars_mode {
            // a lone byte is one character even when it is not valid UTF-8
            if bytes.len() != 1 {
                let text = std::str::from_utf8(bytes).ok()?;
                let mut chars = text.chars();
                let (Some(_), None) = (chars.next(), chars.next()) else {
                    return None;
                };
            }
            let mut packed = [0u8; 4];
            packed[..bytes.len()].copy_from_slice(bytes);
            Some(PackedDelimiter {
                opcode: Opcode::SetP1,
                value: u32::from_le_bytes(packed) as i64,
            })
        } else if bytes.len() == 1 {
            Some(PackedDelimiter {
                opcode: Opcode::SetZP1,
                value: bytes[0] as i64,
            })
        } else {
            None
        }
    }

    /// Step over balanced tokens up to (not including) the `)` closing the current list
    fn skip_to_closing_paren(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.window.kind() {
                TokenKind::Eol | TokenKind::Space => return,
                TokenKind::RParen if depth == 0 => return,
                TokenKind::RParen => depth -= 1,
                TokenKind::LParen => depth += 1,
                _ => {}
            }
            self.window.advance();
        }
    }
}

struct PackedDelimiter {
    opcode: Opcode,
    value: i64,
}

struct TargetOutcome {
    warned: bool,
    deferred: Option<SetOutcome>,
}

impl TargetOutcome {
    fn done() -> Self {
        Self {
            warned: false,
            deferred: None,
        }
    }

    fn deferred() -> Self {
        Self {
            warned: false,
            deferred: Some(SetOutcome {
                deferred: true,
                targets: 0,
                first_target_invalid: false,
            }),
        }
    }
}
