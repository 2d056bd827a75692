//! Expression parsing: atoms, operators, variable and global references, indirection and
//! extrinsic calls.
//!
//! M evaluates binary operators strictly left to right with no precedence. Literal operands of
//! `\`, `=`, `'=` and `_` are folded with the runtime kernel when folding is enabled.

use super::context::CompilerContext;
use super::ir::{Opcode, Operand};
use super::names::{Intrinsic, SpecialVar};
use crate::error::{Error, Result, SyntaxCode};
use crate::lexer::TokenKind;
use crate::runtime::{self, Mval, Number};

/// Coercion requested by the caller of [`CompilerContext::expr`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprType {
    /// Any value
    Expr,
    /// String context
    Str,
    /// Integer context: literals become immediate integers
    Int,
}

impl CompilerContext {
    /// Parse an expression onto the current chain
    pub(crate) fn expr(&mut self, ty: ExprType) -> Result<Operand> {
        let mut lhs = self.expratom()?;
        while let Some(op) = self.binary_operator() {
            let rhs = self.expratom()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(self.coerce(lhs, ty))
    }

    fn binary_operator(&mut self) -> Option<Opcode> {
        let negated = self.window.at(&TokenKind::Apostrophe)
            && self.window.director_kind().is_negatable_operator();
        let kind = if negated {
            self.window.director_kind().clone()
        } else {
            self.window.kind().clone()
        };
        let op = match (negated, kind) {
            (false, TokenKind::Plus) => Opcode::Add,
            (false, TokenKind::Minus) => Opcode::Sub,
            (false, TokenKind::Asterisk) => Opcode::Mul,
            (false, TokenKind::Slash) => Opcode::Div,
            (false, TokenKind::Backslash) => Opcode::IDiv,
            (false, TokenKind::Hash) => Opcode::Mod,
            (false, TokenKind::Underscore) => Opcode::Concat,
            (false, TokenKind::Equal) => Opcode::Equ,
            (false, TokenKind::Lt) => Opcode::Lt,
            (false, TokenKind::Gt) => Opcode::Gt,
            (false, TokenKind::LBracket) => Opcode::Contains,
            (false, TokenKind::RBracket) => Opcode::Follows,
            (false, TokenKind::SortsAfter) => Opcode::SortsAfter,
            (false, TokenKind::Ampersand) => Opcode::And,
            (false, TokenKind::Exclaim) => Opcode::Or,
            (true, TokenKind::Equal) => Opcode::Nequ,
            (true, TokenKind::Lt) => Opcode::NLt,
            (true, TokenKind::Gt) => Opcode::NGt,
            (true, TokenKind::LBracket) => Opcode::NContains,
            (true, TokenKind::RBracket) => Opcode::NFollows,
            (true, TokenKind::SortsAfter) => Opcode::NSortsAfter,
            (true, TokenKind::Ampersand) => Opcode::NAnd,
            (true, TokenKind::Exclaim) => Opcode::NOr,
            _ => return None,
        };
        if negated {
            self.window.advance();
        }
        self.window.advance();
        Some(op)
    }

    fn binary(&mut self, op: Opcode, lhs: Operand, rhs: Operand) -> Operand {
        if self.options.fold_literals {
            if let Some(folded) = self.fold(op, lhs, rhs) {
                return folded;
            }
        }
        let t = self.new_triple(op);
        self.arena.set_operand(t, 0, lhs);
        self.arena.set_operand(t, 1, rhs);
        Operand::Triple(t)
    }

    fn fold(&mut self, op: Opcode, lhs: Operand, rhs: Operand) -> Option<Operand> {
        let (mut a, mut b) = (self.lit_value(&lhs)?, self.lit_value(&rhs)?);
        let value = match op {
            Opcode::IDiv => runtime::integer_divide(&mut a, &mut b, &self.pool).ok()?,
            Opcode::Equ => Mval::int(runtime::equals(&mut a, &mut b, &mut self.pool).ok()? as i64),
            Opcode::Nequ => {
                Mval::int(runtime::not_equals(&mut a, &mut b, &mut self.pool).ok()? as i64)
            }
            Opcode::Concat => {
                let left = a.force_str(&mut self.pool).ok()?;
                let right = b.force_str(&mut self.pool).ok()?;
                let mut joined = self.pool.bytes(&left).ok()?.to_vec();
                joined.extend_from_slice(self.pool.bytes(&right).ok()?);
                Mval::literal(&mut self.pool, &joined).ok()?
            }
            _ => return None,
        };
        for operand in [lhs, rhs] {
            if let Some(t) = operand.triple() {
                self.arena.detach(t);
            }
        }
        tracing::trace!(op = op.mnemonic(), "folded literal operands");
        Some(self.lit_triple(value))
    }

    fn fold_unary(&mut self, op: Opcode, operand: Operand) -> Option<Operand> {
        let num = self.lit_value(&operand)?.force_num(&self.pool).ok()?;
        let value = match op {
            Opcode::Neg => num.negated(),
            Opcode::ForceNum => num,
            _ => return None,
        };
        if let Some(t) = operand.triple() {
            self.arena.detach(t);
        }
        tracing::trace!(op = op.mnemonic(), "folded unary literal");
        Some(self.lit_triple(Mval::number(value)))
    }

    fn coerce(&mut self, operand: Operand, ty: ExprType) -> Operand {
        if ty != ExprType::Int {
            return operand;
        }
        let (Some(t), Some(mut value)) = (operand.triple(), self.lit_value(&operand)) else {
            return operand;
        };
        let truncated = runtime::integer_divide(&mut value, &mut Mval::int(1), &self.pool);
        if let Ok(Mval::Number {
            num: Number::Int(n),
            ..
        }) = truncated
        {
            if i32::try_from(n).is_ok() {
                self.arena.set_opcode(t, Opcode::ILit);
                self.arena.set_operand(t, 0, Operand::ILit(n));
            }
        }
        operand
    }

    /// Numeric literal overflow points just past the offending token
    fn locate_overflow(&self, error: Error) -> Error {
        match error {
            Error::NumericOverflow { .. } => Error::NumericOverflow {
                column_hint: if self.window.director_kind() == &TokenKind::Eol {
                    -2
                } else {
                    2
                },
            },
            other => other,
        }
    }

    fn expratom(&mut self) -> Result<Operand> {
        match self.window.kind().clone() {
            TokenKind::Number(text) => {
                let value = Mval::numeric_literal(&text).map_err(|e| self.locate_overflow(e))?;
                self.window.advance();
                Ok(self.lit_triple(value))
            }
            TokenKind::Str(text) => {
                let value = Mval::literal(&mut self.pool, text.as_bytes())?;
                self.window.advance();
                Ok(self.lit_triple(value))
            }
            TokenKind::LParen => {
                self.window.advance();
                let inner = self.expr(ExprType::Expr)?;
                self.expect(TokenKind::RParen, SyntaxCode::RParenMissing)?;
                Ok(inner)
            }
            TokenKind::Minus | TokenKind::Plus | TokenKind::Apostrophe => {
                let op = match self.window.kind() {
                    TokenKind::Minus => Opcode::Neg,
                    TokenKind::Plus => Opcode::ForceNum,
                    _ => Opcode::Not,
                };
                self.window.advance();
                let operand = self.expratom()?;
                if self.options.fold_literals {
                    if let Some(folded) = self.fold_unary(op, operand) {
                        return Ok(folded);
                    }
                }
                let t = self.new_triple(op);
                self.arena.set_operand(t, 0, operand);
                Ok(Operand::Triple(t))
            }
            TokenKind::Ident(_) => {
                let lvn = self.lvn(Opcode::GetIndx)?;
                Ok(self.as_value(lvn))
            }
            TokenKind::Circumflex => {
                self.gvn()?;
                Ok(Operand::Triple(self.new_triple(Opcode::GvGet)))
            }
            TokenKind::At => {
                let target = self.indirection()?;
                let t = self.new_triple(Opcode::IndRvalue);
                self.arena.set_operand(t, 0, target);
                Ok(Operand::Triple(t))
            }
            TokenKind::Dollar => {
                if self.window.director_kind() == &TokenKind::Dollar {
                    self.window.advance();
                    return self.exfunc();
                }
                self.window.advance();
                self.intrinsic_or_svn()
            }
            _ => Err(self.fail(SyntaxCode::ExpressionExpected)),
        }
    }

    /// Wrap a bare variable operand in a fetch triple
    pub(crate) fn as_value(&mut self, operand: Operand) -> Operand {
        match operand {
            Operand::Var(_) => {
                let t = self.new_triple(Opcode::Var);
                self.arena.set_operand(t, 0, operand);
                Operand::Triple(t)
            }
            other => other,
        }
    }

    fn intrinsic_or_svn(&mut self) -> Result<Operand> {
        let Some(name) = self.window.ident().map(str::to_string) else {
            return Err(self.fail(SyntaxCode::ExpressionExpected));
        };
        if self.window.director_kind() != &TokenKind::LParen {
            let Some(sv) = SpecialVar::lookup(&name) else {
                return Err(self.fail(SyntaxCode::InvalidSvn));
            };
            self.window.advance();
            let t = self.new_triple(Opcode::SvGet);
            self.arena.set_operand(t, 0, Operand::ILit(sv.code()));
            return Ok(Operand::Triple(t));
        }
        let Some(function) = Intrinsic::lookup(&name) else {
            return Err(self.fail(SyntaxCode::InvalidFunction));
        };
        self.window.advance();
        self.window.advance();
        let mut args = Vec::new();
        loop {
            args.push(self.expr(ExprType::Expr)?);
            match self.window.kind() {
                TokenKind::Comma => self.window.advance(),
                TokenKind::RParen => {
                    self.window.advance();
                    break;
                }
                _ => return Err(self.fail(SyntaxCode::RParenMissing)),
            }
        }
        if function.has_side_effects() {
            self.temp_subs = true;
        }
        let params = self.param_chain(&args);
        let t = self.new_triple(Opcode::FnCall);
        self.arena.set_operand(t, 0, Operand::ILit(function.code()));
        self.arena.set_operand(t, 1, params);
        Ok(Operand::Triple(t))
    }

    /// Local variable reference
    ///
    /// Unsubscripted names yield a variable operand. Subscripted ones emit `op`
    /// (`PUTINDX` or `GETINDX`) over a parameter chain of the variable and its subscripts.
    pub(crate) fn lvn(&mut self, op: Opcode) -> Result<Operand> {
        let Some(name) = self.window.ident().map(str::to_string) else {
            return Err(self.fail(SyntaxCode::VarExpected));
        };
        let var = self.put_mvar(&name);
        self.window.advance();
        if !self.window.at(&TokenKind::LParen) {
            return Ok(var);
        }
        self.window.advance();
        let mut subs = vec![var];
        self.subscripts(&mut subs)?;
        let count = subs.len() as i64;
        let params = self.param_chain(&subs);
        let t = self.new_triple(op);
        self.arena.set_operand(t, 0, Operand::ILit(count));
        self.arena.set_operand(t, 1, params);
        Ok(Operand::Triple(t))
    }

    /// Subscript list after `(`, through the closing `)`
    fn subscripts(&mut self, subs: &mut Vec<Operand>) -> Result<()> {
        loop {
            subs.push(self.expr(ExprType::Expr)?);
            match self.window.kind() {
                TokenKind::Comma => self.window.advance(),
                TokenKind::RParen => {
                    self.window.advance();
                    return Ok(());
                }
                _ => return Err(self.fail(SyntaxCode::RParenMissing)),
            }
        }
    }

    /// Global reference starting at `^`; leaves a name triple at the end of the current chain
    pub(crate) fn gvn(&mut self) -> Result<()> {
        self.window.advance();
        let mut params = Vec::new();
        let mut op = Opcode::GvName;
        if self.window.at(&TokenKind::Pipe) {
            self.window.advance();
            params.push(self.expr(ExprType::Expr)?);
            self.expect(TokenKind::Pipe, SyntaxCode::VarExpected)?;
            op = Opcode::GvExtNam;
        }
        if self.window.at(&TokenKind::LParen) {
            if op == Opcode::GvExtNam {
                return Err(self.fail(SyntaxCode::VarExpected));
            }
            op = Opcode::GvNaked;
        } else {
            let Some(name) = self.window.ident().map(str::to_string) else {
                return Err(self.fail(SyntaxCode::VarExpected));
            };
            let value = Mval::literal(&mut self.pool, name.as_bytes())?;
            params.push(self.put_lit(value));
            self.window.advance();
        }
        if self.window.at(&TokenKind::LParen) {
            self.window.advance();
            self.subscripts(&mut params)?;
        }
        let count = params.len() as i64;
        let chain = self.param_chain(&params);
        let t = self.new_triple(op);
        self.arena.set_operand(t, 0, Operand::ILit(count));
        self.arena.set_operand(t, 1, chain);
        Ok(())
    }

    /// `@atom`: the operand naming the indirect target
    pub(crate) fn indirection(&mut self) -> Result<Operand> {
        self.window.advance();
        self.expratom()
    }

    /// `$$label[^routine][(args)]`, entered with the window on the second `$`
    pub(crate) fn exfunc(&mut self) -> Result<Operand> {
        self.window.advance();
        let Some(label) = self.window.ident().map(str::to_string) else {
            return Err(self.fail(SyntaxCode::ExpressionExpected));
        };
        self.window.advance();
        let mut entry = label;
        if self.window.at(&TokenKind::Circumflex) {
            self.window.advance();
            let Some(routine) = self.window.ident().map(str::to_string) else {
                return Err(self.fail(SyntaxCode::ExpressionExpected));
            };
            self.window.advance();
            entry = format!("{}^{}", entry, routine);
        }

        let mut args = Vec::new();
        if self.window.at(&TokenKind::LParen) {
            self.window.advance();
            if self.window.at(&TokenKind::RParen) {
                self.window.advance();
            } else {
                loop {
                    if self.window.at(&TokenKind::Period) {
                        // pass by reference
                        self.window.advance();
                        let Some(name) = self.window.ident().map(str::to_string) else {
                            return Err(self.fail(SyntaxCode::VarExpected));
                        };
                        args.push(self.put_mvar(&name));
                        self.window.advance();
                    } else {
                        args.push(self.expr(ExprType::Expr)?);
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
            }
        }

        self.temp_subs = true;
        let name = Mval::literal(&mut self.pool, entry.as_bytes())?;
        let name = self.put_lit(name);
        let params = self.param_chain(&args);
        let t = self.new_triple(Opcode::Exfun);
        self.arena.set_operand(t, 0, name);
        self.arena.set_operand(t, 1, params);
        Ok(Operand::Triple(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompileOptions;
    use crate::lexer::{Scanner, TokenWindow};
    use crate::runtime::StringPool;

    fn context(source: &str) -> CompilerContext {
        let tokens = Scanner::new(source).scan_tokens().unwrap();
        CompilerContext::new(
            TokenWindow::new(tokens),
            CompileOptions::default(),
            StringPool::new(Default::default()).unwrap(),
        )
    }

    fn opcodes(ctx: &CompilerContext) -> Vec<Opcode> {
        ctx.arena
            .iter(ctx.main)
            .map(|t| ctx.arena.opcode(t))
            .collect()
    }

    #[test]
    fn test_left_to_right() {
        let mut ctx = context("A+B*C");
        ctx.expr(ExprType::Expr).unwrap();
        assert_eq!(
            opcodes(&ctx),
            vec![Opcode::Var, Opcode::Var, Opcode::Add, Opcode::Var, Opcode::Mul]
        );
    }

    #[test]
    fn test_folds_integer_division() {
        let mut ctx = context("7\\2");
        let result = ctx.expr(ExprType::Expr).unwrap();
        assert_eq!(opcodes(&ctx), vec![Opcode::Lit]);
        assert_eq!(ctx.lit_value(&result), Some(Mval::int(3)));
    }

    #[test]
    fn test_division_by_zero_is_left_for_run_time() {
        let mut ctx = context("1\\0");
        ctx.expr(ExprType::Expr).unwrap();
        assert_eq!(opcodes(&ctx), vec![Opcode::Lit, Opcode::Lit, Opcode::IDiv]);
    }

    #[test]
    fn test_folds_concatenation_and_equality() {
        let mut ctx = context("\"ab\"_\"c\"=\"abc\"");
        let result = ctx.expr(ExprType::Expr).unwrap();
        assert_eq!(opcodes(&ctx), vec![Opcode::Lit]);
        assert_eq!(ctx.lit_value(&result), Some(Mval::int(1)));
    }

    #[test]
    fn test_integer_context_truncates() {
        let mut ctx = context("2.7");
        let result = ctx.expr(ExprType::Int).unwrap();
        assert_eq!(ctx.ilit_value(&result), Some(2));
    }

    #[test]
    fn test_folds_unary_minus_over_literals() {
        let mut ctx = context("-\"3abc\"");
        let result = ctx.expr(ExprType::Expr).unwrap();
        assert_eq!(opcodes(&ctx), vec![Opcode::Lit]);
        assert_eq!(ctx.lit_value(&result), Some(Mval::int(-3)));

        let mut ctx = context("--1.5");
        let result = ctx.expr(ExprType::Expr).unwrap();
        assert_eq!(opcodes(&ctx), vec![Opcode::Lit]);
        assert_eq!(
            ctx.lit_value(&result),
            Some(Mval::numeric_literal("1.5").unwrap())
        );

        let mut ctx = context("-1");
        let result = ctx.expr(ExprType::Int).unwrap();
        assert_eq!(ctx.ilit_value(&result), Some(-1));
    }

    #[test]
    fn test_unary_minus_over_variable_is_kept() {
        let mut ctx = context("-X");
        ctx.expr(ExprType::Expr).unwrap();
        assert_eq!(opcodes(&ctx), vec![Opcode::Var, Opcode::Neg]);
    }

    #[test]
    fn test_extrinsic_sets_temp_subs() {
        let mut ctx = context("$$F^R(1,.X)");
        ctx.expr(ExprType::Expr).unwrap();
        assert!(ctx.temp_subs);
        assert_eq!(opcodes(&ctx).last(), Some(&Opcode::Exfun));
    }

    #[test]
    fn test_unknown_svn_is_an_error() {
        let mut ctx = context("$BADSVN");
        let err = ctx.expr(ExprType::Expr).unwrap_err();
        assert_eq!(err.syntax_code(), Some(SyntaxCode::InvalidSvn));
    }

    #[test]
    fn test_numeric_overflow_hint() {
        let mut ctx = context("1E50");
        let err = ctx.expr(ExprType::Expr).unwrap_err();
        assert_eq!(err, Error::NumericOverflow { column_hint: -2 });
    }
}
