use std::iter::FusedIterator;

use log::debug;
use phf::phf_map;

use crate::error::LoxError;
use crate::token::{Token, TokenType};

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and" => TokenType::AND,
    b"class" => TokenType::CLASS,
    b"else" => TokenType::ELSE,
    b"false" => TokenType::FALSE,
    b"fun" => TokenType::FUN,
    b"for" => TokenType::FOR,
    b"if" => TokenType::IF,
    b"nil" => TokenType::NIL,
    b"or" => TokenType::OR,
    b"print" => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super" => TokenType::SUPER,
    b"this" => TokenType::THIS,
    b"true" => TokenType::TRUE,
    b"var" => TokenType::VAR,
    b"while" => TokenType::WHILE,
};

/// Single-pass, byte-indexed scanner over UTF-8 source.
///
/// Implemented as an iterator yielding `Result<Token, LoxError>`: lexical
/// errors are yielded in-stream and scanning continues afterwards, so a
/// caller sees every error the source contains.  The EOF token is emitted
/// exactly once, after the last real token.
#[derive(Debug, Clone)]
pub struct Scanner<'src> {
    source: &'src [u8],
    start: usize,
    current: usize,
    line: usize,
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src [u8]) -> Self {
        Self {
            source,
            start: 0,
            current: 0,
            line: 1,
        }
    }

    /// Scan one lexeme starting at `self.start`.  `Ok(None)` means the
    /// lexeme produced no token (whitespace, comment, newline).
    fn scan_token(&mut self) -> Result<Option<TokenType>, LoxError> {
        let byte: u8 = self.advance();

        let token_type = match byte {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,

            b'!' => {
                if self.match_byte(b'=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                }
            }

            b'=' => {
                if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                }
            }

            b'<' => {
                if self.match_byte(b'=') {
                    TokenType::LESS_EQUAL
                } else {
                    TokenType::LESS
                }
            }

            b'>' => {
                if self.match_byte(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                }
            }

            b' ' | b'\r' | b'\t' => return Ok(None),

            b'\n' => {
                self.line += 1;
                return Ok(None);
            }

            b'/' => {
                if self.match_byte(b'/') {
                    // Comment runs up to, but not including, the newline.
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                    return Ok(None);
                }
                TokenType::SLASH
            }

            b'"' => return self.scan_string().map(Some),

            b'0'..=b'9' => self.scan_number(),

            b if b.is_ascii_alphabetic() || b == b'_' => self.scan_identifier(),

            _ => {
                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", byte as char),
                ));
            }
        };

        Ok(Some(token_type))
    }

    /// A string terminates at the closing quote or at a newline; escapes are
    /// not supported.  A newline (or EOF) before the closing quote is an
    /// error anchored at the opening line, and the offending newline is left
    /// for the main loop so line counting stays correct.
    fn scan_string(&mut self) -> Result<TokenType, LoxError> {
        while !self.is_at_end() && self.peek() != b'"' && self.peek() != b'\n' {
            self.advance();
        }

        if self.is_at_end() || self.peek() == b'\n' {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        // Closing quote.
        self.advance();

        let literal =
            String::from_utf8_lossy(&self.source[self.start + 1..self.current - 1]).into_owned();

        Ok(TokenType::STRING(literal))
    }

    fn scan_number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // A '.' belongs to the number only when digits follow; a trailing
        // '.' is left for the next token.
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let lexeme = String::from_utf8_lossy(&self.source[self.start..self.current]);
        let number: f64 = lexeme.parse().unwrap_or(0.0);

        TokenType::NUMBER(number)
    }

    fn scan_identifier(&mut self) -> TokenType {
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.advance();
        }

        match KEYWORDS.get(&self.source[self.start..self.current]) {
            Some(token_type) => token_type.clone(),
            None => TokenType::IDENTIFIER,
        }
    }

    #[inline]
    fn advance(&mut self) -> u8 {
        let byte = self.source[self.current];
        self.current += 1;
        byte
    }

    #[inline]
    fn match_byte(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            false
        } else {
            self.current += 1;
            true
        }
    }

    #[inline]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.source[self.current]
        }
    }

    #[inline]
    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.source.len() {
            0
        } else {
            self.source[self.current + 1]
        }
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Token, LoxError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.is_at_end() {
                // Emit EOF exactly once, then fuse.
                if self.current == self.source.len() {
                    self.current += 1;
                    return Some(Ok(Token::new(TokenType::EOF, String::new(), self.line)));
                }

                return None;
            }

            self.start = self.current;

            match self.scan_token() {
                Err(e) => return Some(Err(e)),

                Ok(Some(token_type)) => {
                    let lexeme =
                        String::from_utf8_lossy(&self.source[self.start..self.current]).into_owned();

                    debug!(
                        "Emitting token: type={:?}, lexeme={}, line={}",
                        token_type, lexeme, self.line
                    );

                    return Some(Ok(Token::new(token_type, lexeme, self.line)));
                }

                // Whitespace or comment, keep scanning.
                Ok(None) => {}
            }
        }
    }
}

impl FusedIterator for Scanner<'_> {}
