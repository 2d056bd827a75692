//! Lexical analysis for M command lines
//!
//! Converts a source line into tokens and offers the two-token window the parser reads through.

mod scanner;
mod token;
mod window;

pub use scanner::Scanner;
pub use token::{Token, TokenKind};
pub use window::{TokenWindow, MAX_MIDENT_LEN};
