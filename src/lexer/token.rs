use serde::{Deserialize, Serialize};

/// A single token from an M source line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// The type of token
    pub kind: TokenKind,
    /// Original text of the token
    pub lexeme: String,
    /// Line number where token appears (1-indexed)
    pub line: usize,
    /// Column number where token starts (1-indexed)
    pub column: usize,
}

impl Token {
    /// Creates a new token with the given properties
    pub fn new(kind: TokenKind, lexeme: String, line: usize, column: usize) -> Self {
        Token {
            kind,
            lexeme,
            line,
            column,
        }
    }
}

/// All token types of the M command language subset we compile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    // Literals
    /// Numeric literal, kept as written
    Number(String),
    /// String literal with `""` already collapsed to `"`
    Str(String),

    /// Name: local variable, command keyword, function or label name
    Ident(String),

    // Punctuation
    /// `$`
    Dollar,
    /// `^`
    Circumflex,
    /// `@`
    At,
    /// `*` (multiplication, or the alias marker after SET)
    Asterisk,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `|` (extended reference delimiter)
    Pipe,
    /// `.` not starting a number
    Period,

    // Operators
    /// `=`
    Equal,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `/`
    Slash,
    /// `\`
    Backslash,
    /// `#`
    Hash,
    /// `_`
    Underscore,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `]]`
    SortsAfter,
    /// `&`
    Ampersand,
    /// `!`
    Exclaim,
    /// `'`
    Apostrophe,
    /// `?`
    Question,

    /// One or more spaces
    Space,
    /// End of line (also ends a comment)
    Eol,
    /// Character with no meaning to the scanner
    Other(char),
}

impl TokenKind {
    /// True for tokens that can follow `'` to form a negated operator
    pub fn is_negatable_operator(&self) -> bool {
        matches!(
            self,
            TokenKind::Equal
                | TokenKind::Lt
                | TokenKind::Gt
                | TokenKind::LBracket
                | TokenKind::RBracket
                | TokenKind::SortsAfter
                | TokenKind::Ampersand
                | TokenKind::Exclaim
        )
    }

    /// True for binary operators
    pub fn is_binary_operator(&self) -> bool {
        self.is_negatable_operator()
            || matches!(
                self,
                TokenKind::Plus
                    | TokenKind::Minus
                    | TokenKind::Asterisk
                    | TokenKind::Slash
                    | TokenKind::Backslash
                    | TokenKind::Hash
                    | TokenKind::Underscore
            )
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "{}", n),
            TokenKind::Str(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            TokenKind::Ident(name) => write!(f, "{}", name),
            TokenKind::Space => write!(f, "<space>"),
            TokenKind::Eol => write!(f, "<eol>"),
            TokenKind::Other(c) => write!(f, "{}", c),
            other => write!(f, "{:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_classes() {
        assert!(TokenKind::SortsAfter.is_negatable_operator());
        assert!(TokenKind::Underscore.is_binary_operator());
        assert!(!TokenKind::Underscore.is_negatable_operator());
        assert!(!TokenKind::Comma.is_binary_operator());
    }

    #[test]
    fn test_display_escapes_quotes() {
        assert_eq!(TokenKind::Str("a\"b".into()).to_string(), "\"a\"\"b\"");
    }
}
