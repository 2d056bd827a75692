//! Debug utilities: human-readable triple listings

use super::ir::{JumpTarget, Operand, TripleRef};
use super::CompiledLine;

/// Print a compiled line's chain
pub fn dump_chain(line: &CompiledLine) {
    println!("═══════════════════════════════════════════════════════════");
    println!("                    TRIPLE DUMP");
    println!("═══════════════════════════════════════════════════════════");
    println!("Source: {}", line.source());
    println!("Variables: {:?}", line.vars());
    println!("───────────────────────────────────────────────────────────");
    print!("{}", format_chain(line));
    for diag in line.diagnostics() {
        println!("!! {:?} {}", diag.severity, diag.error);
    }
    println!("═══════════════════════════════════════════════════════════\n");
}

/// The chain as text, one triple per line
pub fn format_chain(line: &CompiledLine) -> String {
    let mut out = String::new();
    for t in line.triples() {
        out.push_str(&format!("[{:03}] {}\n", t.index(), format_triple(line, t)));
    }
    out
}

/// Format a single triple
pub fn format_triple(line: &CompiledLine, t: TripleRef) -> String {
    let triple = line.triple(t);
    let operands: Vec<String> = triple
        .operands
        .iter()
        .filter(|op| op.is_some())
        .map(|op| format_operand(line, op))
        .collect();
    if operands.is_empty() {
        triple.opcode.mnemonic().to_string()
    } else {
        format!("{:<16} {}", triple.opcode.mnemonic(), operands.join(", "))
    }
}

/// Format a single operand
pub fn format_operand(line: &CompiledLine, operand: &Operand) -> String {
    match operand {
        Operand::None => "-".to_string(),
        Operand::Triple(t) => format!("[{:03}]", t.index()),
        Operand::Lit(id) => line
            .literal_text(*id)
            .unwrap_or_else(|| format!("lit{}", id.0)),
        Operand::ILit(n) => format!("#{}", n),
        Operand::Var(idx) => line
            .var_name(*idx)
            .map(str::to_string)
            .unwrap_or_else(|| format!("var{}", idx.0)),
        Operand::Str(s) => match line.pool().bytes(s) {
            Ok(bytes) => format!("{:?}", String::from_utf8_lossy(bytes)),
            Err(_) => "<stale>".to_string(),
        },
        Operand::GlvnSlot(n) => format!("glvn{}", n),
        Operand::Result(slot) => format!("={}", format_operand(line, &line.result(*slot))),
        Operand::Jump(JumpTarget::Pending) => "->?".to_string(),
        Operand::Jump(JumpTarget::NextAfter(t)) => format!("->after[{:03}]", t.index()),
        Operand::Jump(JumpTarget::Resolved(t)) => format!("->[{:03}]", t.index()),
    }
}
