use super::token::{Token, TokenKind};

/// Longest name kept by [`TokenWindow::allow_dzwrtac_as_mident`]
pub const MAX_MIDENT_LEN: usize = 31;

/// Two-token lookahead over a scanned line
///
/// The *window* token is the one being parsed; the *director* token is the one after it.
/// Past the end both read as [`TokenKind::Eol`].
#[derive(Debug, Clone)]
pub struct TokenWindow {
    tokens: Vec<Token>,
    pos: usize,
    eol: Token,
}

impl TokenWindow {
    /// Wrap a token stream
    pub fn new(tokens: Vec<Token>) -> Self {
        let (line, column) = tokens
            .last()
            .map(|t| (t.line, t.column))
            .unwrap_or((1, 1));
        TokenWindow {
            tokens,
            pos: 0,
            eol: Token::new(TokenKind::Eol, String::new(), line, column),
        }
    }

    /// Current token
    pub fn window(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eol)
    }

    /// Token after the current one
    pub fn director(&self) -> &Token {
        self.tokens.get(self.pos + 1).unwrap_or(&self.eol)
    }

    /// Kind of the current token
    pub fn kind(&self) -> &TokenKind {
        &self.window().kind
    }

    /// Kind of the director token
    pub fn director_kind(&self) -> &TokenKind {
        &self.director().kind
    }

    /// True when the current token has kind `kind`
    pub fn at(&self, kind: &TokenKind) -> bool {
        self.kind() == kind
    }

    /// Name carried by the current token, if it is an identifier
    pub fn ident(&self) -> Option<&str> {
        match self.kind() {
            TokenKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// (line, column) of the current token
    pub fn position(&self) -> (usize, usize) {
        let t = self.window();
        (t.line, t.column)
    }

    /// Move the window one token forward
    pub fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Re-read `$ZWRTAC…` as a single name token
    ///
    /// When the window is `$` and the director is a name beginning with `ZWRTAC` followed only
    /// by digits, the two tokens merge into one identifier `$ZWRTAC…` (truncated to the name
    /// length limit) and the window moves onto it.
    pub fn allow_dzwrtac_as_mident(&mut self) {
        if !self.at(&TokenKind::Dollar) {
            return;
        }
        let merged = match self.director_kind() {
            TokenKind::Ident(name) if is_zwrtac(name) => {
                let mut merged = format!("${}", name);
                merged.truncate(MAX_MIDENT_LEN);
                merged
            }
            _ => return,
        };
        self.advance();
        if let Some(token) = self.tokens.get_mut(self.pos) {
            token.lexeme = merged.clone();
            token.column = token.column.saturating_sub(1);
            token.kind = TokenKind::Ident(merged);
        }
    }
}

fn is_zwrtac(name: &str) -> bool {
    name.len() >= 6
        && name[..6].eq_ignore_ascii_case("ZWRTAC")
        && name[6..].bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Scanner;

    fn window(source: &str) -> TokenWindow {
        TokenWindow::new(Scanner::new(source).scan_tokens().unwrap())
    }

    #[test]
    fn test_window_and_director() {
        let mut w = window("A=1");
        assert_eq!(w.ident(), Some("A"));
        assert_eq!(w.director_kind(), &TokenKind::Equal);
        w.advance();
        w.advance();
        w.advance();
        assert!(w.at(&TokenKind::Eol));
        w.advance();
        assert!(w.at(&TokenKind::Eol));
    }

    #[test]
    fn test_dzwrtac_merges() {
        let mut w = window("$ZWRTAC12=1");
        w.allow_dzwrtac_as_mident();
        assert_eq!(w.ident(), Some("$ZWRTAC12"));
        assert_eq!(w.director_kind(), &TokenKind::Equal);

        let mut bare = window("$ZWRTAC=\"\"");
        bare.allow_dzwrtac_as_mident();
        assert_eq!(bare.ident(), Some("$ZWRTAC"));
    }

    #[test]
    fn test_other_dollar_names_untouched() {
        let mut w = window("$X=1");
        w.allow_dzwrtac_as_mident();
        assert!(w.at(&TokenKind::Dollar));
        let mut w = window("$ZWRTACX=1");
        w.allow_dzwrtac_as_mident();
        assert!(w.at(&TokenKind::Dollar));
    }
}
