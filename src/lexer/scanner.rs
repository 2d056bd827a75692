use super::token::{Token, TokenKind};
use crate::error::{Error, Result, SyntaxCode};

/// Scanner for M command lines
pub struct Scanner {
    /// Source code as character vector
    source: Vec<char>,
    /// Accumulated tokens
    tokens: Vec<Token>,
    /// Start position of current token
    start: usize,
    /// Column where the current token starts
    start_column: usize,
    /// Current position in source
    current: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// Current column number (1-indexed)
    column: usize,
}

impl Scanner {
    /// Creates a new scanner from source code
    pub fn new(source: &str) -> Self {
        Scanner {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            start_column: 1,
            current: 0,
            line: 1,
            column: 1,
        }
    }

    /// Scans all tokens; the stream always ends with [`TokenKind::Eol`]
    pub fn scan_tokens(&mut self) -> Result<Vec<Token>> {
        while !self.is_at_end() {
            self.start = self.current;
            self.start_column = self.column;
            self.scan_token()?;
        }

        if !matches!(self.tokens.last(), Some(t) if t.kind == TokenKind::Eol) {
            self.tokens.push(Token::new(
                TokenKind::Eol,
                String::new(),
                self.line,
                self.column,
            ));
        }

        Ok(std::mem::take(&mut self.tokens))
    }

    fn scan_token(&mut self) -> Result<()> {
        let c = self.advance();

        match c {
            ' ' | '\t' => {
                while matches!(self.peek(), ' ' | '\t') {
                    self.advance();
                }
                self.add_token(TokenKind::Space);
            }
            '\r' => {}
            '\n' => {
                self.add_token(TokenKind::Eol);
                self.line += 1;
                self.column = 1;
            }

            // Comment runs to end of line
            ';' => {
                while !self.is_at_end() && self.peek() != '\n' {
                    self.advance();
                }
            }

            '(' => self.add_token(TokenKind::LParen),
            ')' => self.add_token(TokenKind::RParen),
            ',' => self.add_token(TokenKind::Comma),
            ':' => self.add_token(TokenKind::Colon),
            '|' => self.add_token(TokenKind::Pipe),
            '$' => self.add_token(TokenKind::Dollar),
            '^' => self.add_token(TokenKind::Circumflex),
            '@' => self.add_token(TokenKind::At),
            '*' => self.add_token(TokenKind::Asterisk),
            '=' => self.add_token(TokenKind::Equal),
            '+' => self.add_token(TokenKind::Plus),
            '-' => self.add_token(TokenKind::Minus),
            '/' => self.add_token(TokenKind::Slash),
            '\\' => self.add_token(TokenKind::Backslash),
            '#' => self.add_token(TokenKind::Hash),
            '_' => self.add_token(TokenKind::Underscore),
            '<' => self.add_token(TokenKind::Lt),
            '>' => self.add_token(TokenKind::Gt),
            '[' => self.add_token(TokenKind::LBracket),
            ']' => {
                if self.match_char(']') {
                    self.add_token(TokenKind::SortsAfter);
                } else {
                    self.add_token(TokenKind::RBracket);
                }
            }
            '&' => self.add_token(TokenKind::Ampersand),
            '!' => self.add_token(TokenKind::Exclaim),
            '\'' => self.add_token(TokenKind::Apostrophe),
            '?' => self.add_token(TokenKind::Question),

            '"' => self.scan_string()?,

            '.' if self.peek().is_ascii_digit() => self.scan_number(),
            '.' => self.add_token(TokenKind::Period),
            c if c.is_ascii_digit() => self.scan_number(),

            c if c.is_ascii_alphabetic() || c == '%' => self.scan_name(),

            other => self.add_token(TokenKind::Other(other)),
        }

        Ok(())
    }

    fn scan_string(&mut self) -> Result<()> {
        let mut value = String::new();

        loop {
            if self.is_at_end() || self.peek() == '\n' {
                return Err(Error::syntax(
                    SyntaxCode::StringTerminator,
                    self.line,
                    self.start_column,
                ));
            }
            let c = self.advance();
            if c == '"' {
                if self.match_char('"') {
                    value.push('"');
                } else {
                    break;
                }
            } else {
                value.push(c);
            }
        }

        self.add_token(TokenKind::Str(value));
        Ok(())
    }

    fn scan_number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == '.' {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        if self.peek() == 'E' {
            let signed = matches!(self.peek_next(), '+' | '-');
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_at(digit_at).is_ascii_digit() {
                for _ in 0..digit_at {
                    self.advance();
                }
                while self.peek().is_ascii_digit() {
                    self.advance();
                }
            }
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        self.add_token(TokenKind::Number(text));
    }

    fn scan_name(&mut self) {
        while self.peek().is_ascii_alphanumeric() {
            self.advance();
        }
        let text: String = self.source[self.start..self.current].iter().collect();
        self.add_token(TokenKind::Ident(text));
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        self.column += 1;
        c
    }

    fn peek(&self) -> char {
        self.peek_at(0)
    }

    fn peek_next(&self) -> char {
        self.peek_at(1)
    }

    fn peek_at(&self, ahead: usize) -> char {
        self.source
            .get(self.current + ahead)
            .copied()
            .unwrap_or('\0')
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            false
        } else {
            self.current += 1;
            self.column += 1;
            true
        }
    }

    fn add_token(&mut self, kind: TokenKind) {
        let lexeme: String = self.source[self.start..self.current].iter().collect();
        self.tokens
            .push(Token::new(kind, lexeme, self.line, self.start_column));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::new(source)
            .scan_tokens()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_set_command() {
        assert_eq!(
            kinds("S A=1"),
            vec![
                TokenKind::Ident("S".into()),
                TokenKind::Space,
                TokenKind::Ident("A".into()),
                TokenKind::Equal,
                TokenKind::Number("1".into()),
                TokenKind::Eol,
            ]
        );
    }

    #[test]
    fn test_string_with_doubled_quote() {
        assert_eq!(
            kinds("\"a\"\"b\""),
            vec![TokenKind::Str("a\"b".into()), TokenKind::Eol]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = Scanner::new("S X=\"abc").scan_tokens().unwrap_err();
        assert_eq!(err.syntax_code(), Some(SyntaxCode::StringTerminator));
    }

    #[test]
    fn test_numbers_and_names() {
        assert_eq!(
            kinds(".5+1E3-%x2"),
            vec![
                TokenKind::Number(".5".into()),
                TokenKind::Plus,
                TokenKind::Number("1E3".into()),
                TokenKind::Minus,
                TokenKind::Ident("%x2".into()),
                TokenKind::Eol,
            ]
        );
    }

    #[test]
    fn test_comment_and_columns() {
        let tokens = Scanner::new("S  X=1 ; note").scan_tokens().unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Space);
        assert_eq!(tokens[2].column, 4);
        assert_eq!(tokens.last().map(|t| t.kind.clone()), Some(TokenKind::Eol));
    }

    #[test]
    fn test_sorts_after() {
        assert_eq!(
            kinds("A]]B"),
            vec![
                TokenKind::Ident("A".into()),
                TokenKind::SortsAfter,
                TokenKind::Ident("B".into()),
                TokenKind::Eol,
            ]
        );
    }
}
