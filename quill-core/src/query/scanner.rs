//! Query string tokenizer with one token of lookahead.

use crate::error::{Error, Result};

/// Token kinds produced by the [`Scanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Term,
    LBracket,
    RBracket,
    Space,
    Or,
    DoubleQuote,
    Undefined,
    End,
}

impl Token {
    pub fn name(self) -> &'static str {
        match self {
            Token::Term => "TERM",
            Token::LBracket => "LEFT_BRACKET",
            Token::RBracket => "RIGHT_BRACKET",
            Token::Space => "SPACE",
            Token::Or => "OR",
            Token::DoubleQuote => "DOUBLE_QUOTE",
            Token::Undefined => "UNDEFINED",
            Token::End => "END",
        }
    }
}

#[inline]
fn is_term_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Single-pass tokenizer over a query string.
///
/// A TERM is a run of `[A-Za-z0-9_]`. Spaces are skipped unless
/// `ignore_spaces` is disabled, in which case they come back as
/// [`Token::Space`] (used while scanning quoted phrases). The scanner keeps
/// exactly one step of history so a parser can rewind the last `get_next`.
pub struct Scanner<'a> {
    input: &'a [u8],
    /// Byte offset of the next unread character.
    pos: usize,
    token: Token,
    lexeme: (usize, usize),
    /// Scanner position before the last `get_next`, consumed by `cancel_last`.
    last_pos: Option<usize>,
    pub ignore_spaces: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            token: Token::Undefined,
            lexeme: (0, 0),
            last_pos: None,
            ignore_spaces: true,
        }
    }

    /// Advance to the next token and return it.
    pub fn get_next(&mut self) -> Token {
        if self.token == Token::End {
            return Token::End;
        }
        self.last_pos = Some(self.pos);

        if self.ignore_spaces {
            while self.input.get(self.pos) == Some(&b' ') {
                self.pos += 1;
            }
        }

        let byte = match self.input.get(self.pos) {
            None => {
                self.token = Token::End;
                return Token::End;
            }
            Some(&b) => b,
        };

        self.token = match byte {
            b'|' => Token::Or,
            b'(' => Token::LBracket,
            b')' => Token::RBracket,
            b' ' => Token::Space,
            b'"' => Token::DoubleQuote,
            _ => {
                let start = self.pos;
                while self.input.get(self.pos).copied().is_some_and(is_term_byte) {
                    self.pos += 1;
                }
                if self.pos > start {
                    self.lexeme = (start, self.pos);
                    self.token = Token::Term;
                    return Token::Term;
                }
                Token::Undefined
            }
        };
        self.pos += 1;
        self.token
    }

    /// Rewind exactly one `get_next`, then re-scan and return the token.
    /// Only the most recent call can be undone; a second consecutive cancel
    /// (or a cancel before any `get_next`) is an error.
    pub fn cancel_last(&mut self) -> Result<Token> {
        match self.last_pos.take() {
            None => Err(Error::Internal(
                "no get_next call available to cancel".into(),
            )),
            Some(pos) => {
                self.pos = pos;
                if self.token == Token::End {
                    self.token = Token::Undefined;
                }
                Ok(self.get_next())
            }
        }
    }

    /// The token returned by the most recent `get_next`.
    pub fn token(&self) -> Token {
        self.token
    }

    /// Text of the current TERM token.
    pub fn lexeme(&self) -> &'a str {
        // the scanner only recognizes ASCII term bytes, so this slice is
        // always on a char boundary
        std::str::from_utf8(&self.input[self.lexeme.0..self.lexeme.1]).unwrap_or("")
    }

    /// Byte position just past the current token, for error reporting.
    pub fn position(&self) -> usize {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        let mut scanner = Scanner::new(input);
        let mut out = Vec::new();
        loop {
            let tok = scanner.get_next();
            out.push(tok);
            if tok == Token::End {
                return out;
            }
        }
    }

    #[test]
    fn scans_cnf_tokens() {
        assert_eq!(
            tokens("(a | b) c"),
            vec![
                Token::LBracket,
                Token::Term,
                Token::Or,
                Token::Term,
                Token::RBracket,
                Token::Term,
                Token::End,
            ]
        );
    }

    #[test]
    fn term_lexemes() {
        let mut s = Scanner::new("foo_1  bar");
        assert_eq!(s.get_next(), Token::Term);
        assert_eq!(s.lexeme(), "foo_1");
        assert_eq!(s.get_next(), Token::Term);
        assert_eq!(s.lexeme(), "bar");
        assert_eq!(s.get_next(), Token::End);
        // END is sticky
        assert_eq!(s.get_next(), Token::End);
    }

    #[test]
    fn spaces_surface_when_not_ignored() {
        let mut s = Scanner::new("a b");
        s.ignore_spaces = false;
        assert_eq!(s.get_next(), Token::Term);
        assert_eq!(s.get_next(), Token::Space);
        assert_eq!(s.get_next(), Token::Term);
        assert_eq!(s.get_next(), Token::End);
    }

    #[test]
    fn undefined_bytes_are_consumed() {
        let mut s = Scanner::new("a!b");
        assert_eq!(s.get_next(), Token::Term);
        assert_eq!(s.get_next(), Token::Undefined);
        assert_eq!(s.get_next(), Token::Term);
        assert_eq!(s.lexeme(), "b");
    }

    #[test]
    fn cancel_rewinds_one_token() {
        let mut s = Scanner::new("a | b");
        assert_eq!(s.get_next(), Token::Term);
        assert_eq!(s.get_next(), Token::Or);
        assert_eq!(s.cancel_last().unwrap(), Token::Or);
        assert_eq!(s.get_next(), Token::Term);
        assert_eq!(s.lexeme(), "b");
    }

    #[test]
    fn cancel_twice_fails() {
        let mut s = Scanner::new("a b");
        s.get_next();
        s.get_next();
        assert!(s.cancel_last().is_ok());
        assert!(s.cancel_last().is_err());
    }

    #[test]
    fn cancel_before_any_get_next_fails() {
        let mut s = Scanner::new("a");
        assert!(s.cancel_last().is_err());
    }

    #[test]
    fn quote_token() {
        assert_eq!(
            tokens("\"a\""),
            vec![Token::DoubleQuote, Token::Term, Token::DoubleQuote, Token::End]
        );
    }
}
