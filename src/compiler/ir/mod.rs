//! # Triple IR
//!
//! The SET compiler emits *triples* (an opcode with two operands) threaded onto
//! execution-order *chains*.
//!
//! ## Module Structure
//!
//! ```text
//! ir/
//! ├── mod.rs          # This file - module definition and re-exports
//! ├── instruction.rs  # Opcode, Operand, Triple and the handle types
//! └── program.rs      # TripleArena, ChainId and the chain primitives
//! ```
//!
//! ## Chain primitives
//!
//! | Primitive | Effect |
//! |-----------|--------|
//! | [`TripleArena::make_triple`] | allocate an unlinked triple |
//! | [`TripleArena::append`] | link at the tail of a chain |
//! | [`TripleArena::insert_after`] | link after a cursor |
//! | [`TripleArena::detach`] | unlink from its chain |
//! | [`TripleArena::splice_after`] | move a whole chain after a cursor in O(1) |
//! | [`TripleArena::resolve_jumps`] | bind `NextAfter` jump targets once the chain is final |

mod instruction;
mod program;

pub use instruction::{JumpTarget, LitId, Opcode, Operand, ResultSlot, Triple, TripleRef, VarIdx};
pub use program::{ChainId, ChainIter, TripleArena};
