//! SET compiler tests: emitted triple order, error recovery and the special target forms

use mumps_core::compiler::{
    CompileOptions, CompiledLine, Compiler, JumpTarget, Opcode, Operand, SpecialVar, INDIR_SET,
};
use mumps_core::{ErrorSeverity, SyntaxCode};

fn compile(source: &str) -> CompiledLine {
    Compiler::new(CompileOptions::default())
        .compile_line(source)
        .unwrap()
}

fn pos(line: &CompiledLine, op: Opcode) -> usize {
    line.position(op)
        .unwrap_or_else(|| panic!("no {} in\n{}", op, line.dump()))
}

fn codes(line: &CompiledLine) -> Vec<SyntaxCode> {
    line.diagnostics()
        .iter()
        .filter_map(|d| d.error.syntax_code())
        .collect()
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn test_targets_execute_left_to_right() {
    let line = compile("SET A=1,B=2");
    assert_eq!(
        line.opcodes(),
        vec![Opcode::Lit, Opcode::Sto, Opcode::Lit, Opcode::Sto]
    );
    let stores = line.positions(Opcode::Sto);
    let names: Vec<_> = stores
        .iter()
        .map(|i| match line.triple(line.triples()[*i]).operands[0] {
            Operand::Var(idx) => line.var_name(idx).unwrap().to_string(),
            other => panic!("unexpected store target {:?}", other),
        })
        .collect();
    assert_eq!(names, vec!["A", "B"]);
    assert!(line.diagnostics().is_empty());
}

#[test]
fn test_stores_share_one_right_hand_side() {
    let line = compile("S (A,B)=X+1");
    assert_eq!(
        line.opcodes(),
        vec![Opcode::Var, Opcode::Lit, Opcode::Add, Opcode::Sto, Opcode::Sto]
    );
    let triples = line.triples();
    let add = triples[2];
    for i in line.positions(Opcode::Sto) {
        let Operand::Result(slot) = line.triple(triples[i]).operands[1] else {
            panic!("store does not read the shared result");
        };
        assert_eq!(line.result(slot), Operand::Triple(add));
    }
}

#[test]
fn test_subscripts_evaluate_before_right_hand_side() {
    let line = compile("SET ^X($$F())=$$G()");
    let exfuns = line.positions(Opcode::Exfun);
    assert_eq!(exfuns.len(), 2);
    let gvname = pos(&line, Opcode::GvName);
    let gvput = pos(&line, Opcode::GvPut);
    assert!(exfuns[0] < exfuns[1]);
    assert!(exfuns[1] < gvname);
    assert!(gvname < gvput);
    assert_eq!(gvput, line.opcodes().len() - 1);

    let triples = line.triples();
    let Operand::Lit(first) = line.triple(triples[exfuns[0]]).operands[0] else {
        panic!("extrinsic without entry name");
    };
    assert_eq!(line.literal_text(first).as_deref(), Some("\"F\""));
}

#[test]
fn test_extrinsic_in_rhs_captures_variable_subscripts() {
    let line = compile("SET A(B)=$$F()");
    let temp = pos(&line, Opcode::StoTemp);
    assert!(temp < pos(&line, Opcode::Exfun));
    assert!(pos(&line, Opcode::PutIndx) > temp);

    let plain = compile("SET A(B)=1");
    assert_eq!(plain.position(Opcode::StoTemp), None);
}

// =============================================================================
// $PIECE and $EXTRACT targets
// =============================================================================

#[test]
fn test_empty_piece_range_jumps_over_global_access() {
    let line = compile("SET $PIECE(^X,\",\",3,2)=Y");
    let jmp = pos(&line, Opcode::Jmp);
    let gvname = pos(&line, Opcode::GvName);
    let gvput = pos(&line, Opcode::GvPut);
    assert!(jmp < gvname);
    assert!(pos(&line, Opcode::FnGvGet) < pos(&line, Opcode::SetPiece));
    assert!(pos(&line, Opcode::SetPiece) < gvput);

    let triples = line.triples();
    let Operand::Jump(JumpTarget::Resolved(dest)) = line.triple(triples[jmp]).operands[0] else {
        panic!("unresolved jump");
    };
    let dest_pos = triples.iter().position(|t| *t == dest).unwrap();
    assert!(dest_pos > gvput);
    assert_eq!(line.opcodes()[dest_pos], Opcode::Noop);
}

#[test]
fn test_valid_literal_range_has_no_guard() {
    let line = compile("SET $PIECE(X,\";\",2,3)=\"a\"");
    assert_eq!(line.position(Opcode::Jmp), None);
    assert_eq!(line.position(Opcode::JmpLeq), None);
    assert_eq!(line.position(Opcode::JmpGtr), None);
    assert!(pos(&line, Opcode::FnGet) < pos(&line, Opcode::SetPiece));
    assert!(pos(&line, Opcode::SetPiece) < pos(&line, Opcode::Sto));
}

#[test]
fn test_first_below_one_skips_global_access() {
    let line = compile("SET $PIECE(^X,\",\",0)=1");
    assert!(pos(&line, Opcode::Jmp) < pos(&line, Opcode::GvName));
    assert_eq!(line.position(Opcode::CoBool), None);
    assert_eq!(line.position(Opcode::JmpLeq), None);
    assert!(pos(&line, Opcode::SetP1) < pos(&line, Opcode::GvPut));
}

#[test]
fn test_negative_literal_first_is_skipped_at_compile_time() {
    let line = compile("SET $PIECE(X,\",\",-1)=1");
    assert!(pos(&line, Opcode::Jmp) < pos(&line, Opcode::FnGet));
    assert_eq!(line.position(Opcode::Neg), None);
    assert_eq!(line.position(Opcode::CoBool), None);
    assert_eq!(line.position(Opcode::JmpLeq), None);
}

#[test]
fn test_variable_first_without_last_gets_one_guard() {
    let line = compile("SET $PIECE(X,\",\",I)=1");
    let cobool = pos(&line, Opcode::CoBool);
    let jmpleq = pos(&line, Opcode::JmpLeq);
    assert!(cobool < jmpleq && jmpleq < pos(&line, Opcode::FnGet));
    assert_eq!(line.position(Opcode::VxCmpl), None);
    assert_eq!(line.position(Opcode::JmpGtr), None);
    assert_eq!(line.position(Opcode::Jmp), None);
    assert!(pos(&line, Opcode::SetP1) < pos(&line, Opcode::Sto));
}

#[test]
fn test_variable_range_gets_run_time_guards() {
    let line = compile("SET $EXTRACT(X,I,J)=Y");
    let cobool = pos(&line, Opcode::CoBool);
    let jmpleq = pos(&line, Opcode::JmpLeq);
    let vxcmpl = pos(&line, Opcode::VxCmpl);
    let jmpgtr = pos(&line, Opcode::JmpGtr);
    let fnget = pos(&line, Opcode::FnGet);
    assert!(cobool < jmpleq && jmpleq < vxcmpl && vxcmpl < jmpgtr && jmpgtr < fnget);
    assert!(pos(&line, Opcode::SetExtract) < pos(&line, Opcode::Sto));
    // the store is last: both jumps land on the landing pad
    assert_eq!(line.opcodes().last(), Some(&Opcode::Noop));
}

#[test]
fn test_single_char_delimiter_is_packed() {
    let line = compile("SET $PIECE(X,\",\",2)=Y");
    assert!(line.position(Opcode::SetP1).is_some());
    assert_eq!(line.position(Opcode::SetPiece), None);
    let packed = line.triples().into_iter().any(|t| {
        let triple = line.triple(t);
        triple.opcode == Opcode::Parameter && triple.operands[0] == Operand::ILit(',' as i64)
    });
    assert!(packed, "{}", line.dump());

    let zpiece = compile("SET $ZPIECE(X,\",\",2)=Y");
    assert!(zpiece.position(Opcode::SetZP1).is_some());

    let bytes = Compiler::new(CompileOptions {
        utf8_mode: false,
        ..CompileOptions::default()
    })
    .compile_line("SET $PIECE(X,\",\",2)=Y")
    .unwrap();
    assert!(bytes.position(Opcode::SetZP1).is_some());

    let multi = compile("SET $PIECE(X,\"ab\",2)=Y");
    assert!(multi.position(Opcode::SetPiece).is_some());

    let wide = compile("SET $PIECE(X,\"é\",2)=Y");
    assert!(wide.position(Opcode::SetP1).is_some());
    let packed = u32::from_le_bytes([0xC3, 0xA9, 0, 0]) as i64;
    assert!(wide.triples().into_iter().any(|t| {
        wide.triple(t).operands[0] == Operand::ILit(packed)
    }));
}

// =============================================================================
// Special variables and error recovery
// =============================================================================

#[test]
fn test_special_variable_targets() {
    let line = compile("SET $X=5,$ET=\"Q\"");
    let triples = line.triples();
    let svput = pos(&line, Opcode::SvPut);
    assert_eq!(
        line.triple(triples[svput]).operands[0],
        Operand::ILit(SpecialVar::X.code())
    );
    assert!(line.position(Opcode::PsvPut).is_some());
}

#[test]
fn test_invalid_first_target_discards_rest_of_argument() {
    let line = compile("SET $BADSVN=$$F(),A=2");
    assert_eq!(
        line.opcodes(),
        vec![Opcode::RtError, Opcode::Lit, Opcode::Sto]
    );
    assert_eq!(codes(&line), vec![SyntaxCode::InvalidSvn]);
    assert_eq!(line.diagnostics()[0].severity, ErrorSeverity::Warning);
    assert!(!line.has_errors());
}

#[test]
fn test_invalid_first_target_in_list_discards_whole_list() {
    let line = compile("SET ($BADSVN,A)=$$F()");
    assert_eq!(line.opcodes(), vec![Opcode::RtError]);
    assert_eq!(codes(&line), vec![SyntaxCode::InvalidSvn]);
    assert!(!line.has_errors());
}

#[test]
fn test_invalid_later_target_in_list_keeps_earlier_stores() {
    let line = compile("SET (A,$BADSVN)=$$F()");
    assert_eq!(
        line.opcodes(),
        vec![Opcode::Exfun, Opcode::Sto, Opcode::RtError]
    );
    assert_eq!(codes(&line), vec![SyntaxCode::InvalidSvn]);
    assert_eq!(line.diagnostics()[0].severity, ErrorSeverity::Warning);
}

#[test]
fn test_read_only_special_variable_warns() {
    let line = compile("SET $JOB=1");
    assert_eq!(codes(&line), vec![SyntaxCode::SvnNoSet]);
    assert_eq!(line.opcodes(), vec![Opcode::RtError]);
}

#[test]
fn test_unknown_function_target_warns() {
    let line = compile("SET $FOO(X)=1,B=2");
    assert_eq!(codes(&line), vec![SyntaxCode::InvalidFunction]);
    assert_eq!(
        line.opcodes(),
        vec![Opcode::RtError, Opcode::Lit, Opcode::Sto]
    );
}

#[test]
fn test_missing_equals_is_reported() {
    let line = compile("SET A");
    assert_eq!(codes(&line), vec![SyntaxCode::Equal]);
    assert_eq!(line.opcodes(), vec![Opcode::RtError]);
    assert!(line.has_errors());
}

#[test]
fn test_error_in_later_argument_keeps_earlier_ones() {
    let line = compile("SET A=1,B=");
    assert_eq!(codes(&line), vec![SyntaxCode::ExpressionExpected]);
    assert_eq!(
        line.opcodes(),
        vec![Opcode::Lit, Opcode::Sto, Opcode::RtError]
    );
    let diag = &line.diagnostics()[0];
    assert_eq!(diag.severity, ErrorSeverity::Recoverable);
    assert_eq!(diag.line, 1);
}

#[test]
fn test_error_triple_carries_code_and_diagnostic() {
    let line = compile("SET 1=2");
    let triples = line.triples();
    let err = line.triple(triples[pos(&line, Opcode::RtError)]);
    assert_eq!(
        err.operands,
        [
            Operand::ILit(SyntaxCode::VarExpected.number()),
            Operand::ILit(0)
        ]
    );
}

#[test]
fn test_command_level_errors() {
    assert_eq!(codes(&compile("SET")), vec![SyntaxCode::VarExpected]);
    assert_eq!(codes(&compile("KILL A")), vec![SyntaxCode::InvalidCommand]);
    assert_eq!(codes(&compile("SET A=1)")), vec![SyntaxCode::SpaceExpected]);
    assert!(compile("").opcodes().is_empty());
    assert!(compile("set a=1 ; comment").diagnostics().is_empty());
}

// =============================================================================
// Aliases, $ZWRTAC and indirection
// =============================================================================

#[test]
fn test_alias_forms() {
    let line = compile("SET *A=B");
    assert!(line.position(Opcode::SetAls2Als).is_some());

    let container = compile("SET *A=B(1)");
    assert!(container.position(Opcode::SetAlsCtIn2Als).is_some());

    let from_call = compile("SET *A(1)=$$F()");
    assert!(from_call.position(Opcode::SetFnRetIn2AlsCt).is_some());
}

#[test]
fn test_alias_errors() {
    assert_eq!(codes(&compile("SET *(A)=B")), vec![SyntaxCode::NoAliasList]);
    assert_eq!(codes(&compile("SET *^G=B")), vec![SyntaxCode::AliasExpected]);
    assert_eq!(codes(&compile("SET *A=1")), vec![SyntaxCode::AliasExpected]);
    assert_eq!(
        codes(&compile("SET *A=$ZWRTAC")),
        vec![SyntaxCode::DzwrNoAlias]
    );
    assert_eq!(codes(&compile("SET (A,*B)=C")), vec![SyntaxCode::NoAliasList]);
}

#[test]
fn test_zwrtac_targets() {
    let clear = compile("SET $ZWRTAC=\"\"");
    assert!(clear.position(Opcode::ClrAlsVars).is_some());
    assert!(clear.diagnostics().is_empty());

    let numbered = compile("SET $ZWRTAC5=1");
    assert_eq!(numbered.vars(), &["$ZWRTAC5".to_string()]);

    assert_eq!(
        codes(&compile("SET ($ZWRTAC1,A)=1")),
        vec![SyntaxCode::DzwrNoParen]
    );
}

#[test]
fn test_whole_argument_indirection_is_deferred() {
    let line = compile("SET @X");
    let triples = line.triples();
    let arg = line.triple(triples[pos(&line, Opcode::CommArg)]);
    assert_eq!(arg.operands[1], Operand::ILit(INDIR_SET));
    assert_eq!(line.position(Opcode::Sto), None);
}

#[test]
fn test_indirect_target_is_saved_once() {
    let line = compile("SET @X=1");
    assert_eq!(
        line.opcodes(),
        vec![
            Opcode::Var,
            Opcode::IndSavGlvn,
            Opcode::Lit,
            Opcode::StoGlvn,
            Opcode::GlvnPop
        ]
    );
    let triples = line.triples();
    let saved = line.triple(triples[1]).operands[1];
    assert_eq!(line.triple(triples[3]).operands[0], saved);
    assert_eq!(line.triple(triples[4]).operands[0], saved);
}

// =============================================================================
// Folding and listings
// =============================================================================

#[test]
fn test_literal_folding() {
    let line = compile("SET A=7\\2,B=\"x\"_\"y\"");
    assert_eq!(
        line.opcodes(),
        vec![Opcode::Lit, Opcode::Sto, Opcode::Lit, Opcode::Sto]
    );
    let listing = line.dump();
    assert!(listing.contains("3"), "{}", listing);
    assert!(listing.contains("\"xy\""), "{}", listing);

    let unfolded = Compiler::new(CompileOptions {
        fold_literals: false,
        ..CompileOptions::default()
    })
    .compile_line("SET A=7\\2")
    .unwrap();
    assert!(unfolded.position(Opcode::IDiv).is_some());
}

#[test]
fn test_dump_lists_every_triple() {
    let line = compile("SET ^G(1)=A");
    let listing = line.dump();
    assert_eq!(listing.lines().count(), line.opcodes().len());
    assert!(listing.contains("GVNAME"));
    assert!(listing.contains("GVPUT"));
}
