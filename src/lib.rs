//! # mumps-core - M SET compilation and value kernel
//!
//! The core of an M (MUMPS) implementation: the compiler front half for the `SET` command
//! and the value-level runtime kernel it relies on.
//!
//! ## Features
//!
//! - **Triple IR** - arena-backed, chain-threaded intermediate code with O(1) splicing
//! - **SET compiler** - multiple targets, `$PIECE`/`$EXTRACT` targets, indirection, aliases
//! - **Value kernel** - canonical numbers, integer division, null-aware equality, `$JUSTIFY`
//! - **String pool** - generation-checked handles, growth and compaction
//!
//! ## Quick Start
//!
//! ```rust
//! use mumps_core::{CompileOptions, Compiler, Opcode};
//!
//! # fn main() -> mumps_core::Result<()> {
//! let compiler = Compiler::new(CompileOptions::default());
//! let line = compiler.compile_line("SET A=1,B=2")?;
//!
//! assert!(!line.has_errors());
//! assert_eq!(line.positions(Opcode::Sto).len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ### Runtime values
//!
//! ```rust
//! use mumps_core::runtime::{equals, integer_divide, Mval, PoolOptions, StringPool};
//!
//! # fn main() -> mumps_core::Result<()> {
//! let mut pool = StringPool::new(PoolOptions::default())?;
//! let mut a = Mval::from_bytes(&mut pool, b"-7")?;
//! let mut b = Mval::int(2);
//!
//! let q = integer_divide(&mut a, &mut b, &pool)?;
//! assert_eq!(q.render(&pool)?, "-3");
//!
//! let mut x = Mval::from_bytes(&mut pool, b"3.0")?;
//! let mut y = Mval::int(3);
//! assert!(!equals(&mut x, &mut y, &mut pool)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Source line → Scanner → Tokens → TokenWindow → SET compiler → Triple chain
//!                                                     │
//!                                                     └─ literal folding → runtime kernel
//! ```
//!
//! ### Main Components
//!
//! - [`Scanner`] - tokenizes a source line
//! - [`TokenWindow`] - window/director lookahead
//! - [`Compiler`] - compiles a line into a [`CompiledLine`]
//! - [`Mval`] - run-time value
//! - [`StringPool`] - string storage for values

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Module declarations
pub mod compiler;
pub mod error;
pub mod lexer;
pub mod runtime;

// Re-export main types
pub use compiler::{CompileOptions, CompiledLine, Compiler, Opcode};
pub use error::{Error, ErrorKind, ErrorSeverity, Result, SyntaxCode};
pub use lexer::{Scanner, Token, TokenKind, TokenWindow};
pub use runtime::{Mval, Number, PoolOptions, StringPool};
