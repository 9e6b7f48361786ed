//! The lexer.
//!
//! A direct-coded scanner: each leading character dispatches to the routine
//! that knows how to finish the token. Multi-character operators are
//! recognized with maximal munch (`>=` before `>`, `...` before `.`).

use rcc_util::escape::unescape;
use rcc_util::{FileId, Span};

use crate::cursor::Cursor;
use crate::error::LexError;
use crate::token::{keyword_from_ident, Token, TokenKind};

/// Tokenize a whole buffer, returning the sequence terminated by an `Eof`
/// token.
pub fn tokenize(source: &str, file_id: FileId) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(source, file_id);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token()?;
        let done = tok.kind == TokenKind::Eof;
        tokens.push(tok);
        if done {
            return Ok(tokens);
        }
    }
}

/// The scanner state: a cursor plus the start position of the token being
/// scanned.
pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    file_id: FileId,
    token_start: usize,
    token_start_line: u32,
    token_start_column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, file_id: FileId) -> Self {
        Self {
            cursor: Cursor::new(source),
            file_id,
            token_start: 0,
            token_start_line: 1,
            token_start_column: 1,
        }
    }

    /// Scan the next token.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments()?;

        self.token_start = self.cursor.position();
        self.token_start_line = self.cursor.line();
        self.token_start_column = self.cursor.column();

        if self.cursor.is_at_end() {
            return Ok(self.make_token(TokenKind::Eof));
        }

        match self.cursor.current() {
            b'(' => Ok(self.single(TokenKind::LParen)),
            b')' => Ok(self.single(TokenKind::RParen)),
            b'{' => Ok(self.single(TokenKind::LBrace)),
            b'}' => Ok(self.single(TokenKind::RBrace)),
            b'[' => Ok(self.single(TokenKind::LBracket)),
            b']' => Ok(self.single(TokenKind::RBracket)),
            b';' => Ok(self.single(TokenKind::Semicolon)),
            b',' => Ok(self.single(TokenKind::Comma)),
            b'?' => Ok(self.single(TokenKind::Question)),
            b':' => Ok(self.single(TokenKind::Colon)),
            b'*' => Ok(self.single(TokenKind::Star)),
            b'/' => Ok(self.single(TokenKind::Slash)),
            b'%' => Ok(self.single(TokenKind::Percent)),
            b'^' => Ok(self.single(TokenKind::Caret)),
            b'~' => Ok(self.single(TokenKind::Tilde)),

            b'+' => Ok(self.lex_plus()),
            b'-' => Ok(self.lex_minus()),
            b'<' => Ok(self.lex_less()),
            b'>' => Ok(self.lex_greater()),
            b'=' => Ok(self.lex_equals()),
            b'!' => Ok(self.lex_bang()),
            b'&' => Ok(self.lex_ampersand()),
            b'|' => Ok(self.lex_pipe()),
            b'.' => Ok(self.lex_dot()),

            b'"' => self.lex_string(),
            b'\'' => self.lex_char(),

            c if c.is_ascii_digit() => Ok(self.lex_number()),
            c if is_ident_start(c) => Ok(self.lex_identifier()),

            c => {
                let span = self.span_here();
                Err(LexError::InvalidByte {
                    found: c as char,
                    span,
                })
            }
        }
    }

    /// Lexes plus, plus-plus, or plus-equals.
    fn lex_plus(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_byte(b'+') {
            self.make_token(TokenKind::PlusPlus)
        } else if self.cursor.match_byte(b'=') {
            self.make_token(TokenKind::PlusEq)
        } else {
            self.make_token(TokenKind::Plus)
        }
    }

    /// Lexes minus, arrow, minus-minus, or minus-equals.
    fn lex_minus(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_byte(b'>') {
            self.make_token(TokenKind::Arrow)
        } else if self.cursor.match_byte(b'-') {
            self.make_token(TokenKind::MinusMinus)
        } else if self.cursor.match_byte(b'=') {
            self.make_token(TokenKind::MinusEq)
        } else {
            self.make_token(TokenKind::Minus)
        }
    }

    /// Lexes less, less-equals, or left shift.
    fn lex_less(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_byte(b'<') {
            self.make_token(TokenKind::Shl)
        } else if self.cursor.match_byte(b'=') {
            self.make_token(TokenKind::LtEq)
        } else {
            self.make_token(TokenKind::Lt)
        }
    }

    /// Lexes greater, greater-equals, or right shift.
    fn lex_greater(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_byte(b'>') {
            self.make_token(TokenKind::Shr)
        } else if self.cursor.match_byte(b'=') {
            self.make_token(TokenKind::GtEq)
        } else {
            self.make_token(TokenKind::Gt)
        }
    }

    /// Lexes assignment or equality.
    fn lex_equals(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_byte(b'=') {
            self.make_token(TokenKind::EqEq)
        } else {
            self.make_token(TokenKind::Eq)
        }
    }

    /// Lexes logical not or inequality.
    fn lex_bang(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_byte(b'=') {
            self.make_token(TokenKind::NotEq)
        } else {
            self.make_token(TokenKind::Not)
        }
    }

    /// Lexes bitwise or logical and.
    fn lex_ampersand(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_byte(b'&') {
            self.make_token(TokenKind::AndAnd)
        } else {
            self.make_token(TokenKind::Ampersand)
        }
    }

    /// Lexes bitwise or logical or.
    fn lex_pipe(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_byte(b'|') {
            self.make_token(TokenKind::OrOr)
        } else {
            self.make_token(TokenKind::Pipe)
        }
    }

    /// Lexes dot or ellipsis.
    fn lex_dot(&mut self) -> Token {
        if self.cursor.starts_with("...") {
            self.cursor.advance();
            self.cursor.advance();
            self.cursor.advance();
            self.make_token(TokenKind::DotDotDot)
        } else {
            self.single(TokenKind::Dot)
        }
    }

    /// Lexes a decimal integer literal.
    fn lex_number(&mut self) -> Token {
        let mut value: i64 = 0;
        while self.cursor.current().is_ascii_digit() {
            value = value
                .wrapping_mul(10)
                .wrapping_add(i64::from(self.cursor.current() - b'0'));
            self.cursor.advance();
        }
        let mut tok = self.make_token(TokenKind::Number);
        tok.value = value;
        tok
    }

    /// Lexes an identifier or keyword.
    fn lex_identifier(&mut self) -> Token {
        while is_ident_continue(self.cursor.current()) {
            self.cursor.advance();
        }
        let text = self.cursor.slice_from(self.token_start);
        let kind = keyword_from_ident(text).unwrap_or(TokenKind::Ident);
        self.make_token(kind)
    }

    /// Lexes a string literal, decoding escapes into a fresh byte buffer.
    fn lex_string(&mut self) -> Result<Token, LexError> {
        self.cursor.advance(); // opening quote
        let mut bytes = Vec::new();
        loop {
            if self.cursor.is_at_end() {
                return Err(LexError::UnterminatedString {
                    span: self.span_here(),
                });
            }
            match self.cursor.current() {
                b'"' => {
                    self.cursor.advance();
                    break;
                }
                b'\\' => {
                    self.cursor.advance();
                    bytes.push(unescape(self.cursor.current()));
                    self.cursor.advance();
                }
                b => {
                    bytes.push(b);
                    self.cursor.advance();
                }
            }
        }
        let mut tok = self.make_token(TokenKind::Str);
        tok.bytes = Some(bytes);
        Ok(tok)
    }

    /// Lexes a character literal, stored as its integer value.
    fn lex_char(&mut self) -> Result<Token, LexError> {
        self.cursor.advance(); // opening quote
        if self.cursor.is_at_end() {
            return Err(LexError::UnterminatedChar {
                span: self.span_here(),
            });
        }
        let value = if self.cursor.current() == b'\\' {
            self.cursor.advance();
            let v = unescape(self.cursor.current());
            self.cursor.advance();
            v
        } else {
            let v = self.cursor.current();
            self.cursor.advance();
            v
        };
        if !self.cursor.match_byte(b'\'') {
            return Err(LexError::UnterminatedChar {
                span: self.span_here(),
            });
        }
        let mut tok = self.make_token(TokenKind::CharLit);
        tok.value = i64::from(value);
        Ok(tok)
    }

    /// Skip whitespace, `// line` comments, and `/* block */` comments.
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            let c = self.cursor.current();
            if c.is_ascii_whitespace() && c != 0 {
                self.cursor.advance();
            } else if self.cursor.starts_with("//") {
                while !self.cursor.is_at_end() && self.cursor.current() != b'\n' {
                    self.cursor.advance();
                }
            } else if self.cursor.starts_with("/*") {
                let start = Span::with_file(
                    self.cursor.position(),
                    self.cursor.position() + 2,
                    self.file_id,
                    self.cursor.line(),
                    self.cursor.column(),
                );
                self.cursor.advance();
                self.cursor.advance();
                while !self.cursor.starts_with("*/") {
                    if self.cursor.is_at_end() {
                        return Err(LexError::UnterminatedComment { span: start });
                    }
                    self.cursor.advance();
                }
                self.cursor.advance();
                self.cursor.advance();
            } else {
                return Ok(());
            }
        }
    }

    /// Consume one byte and produce a token of the given kind.
    fn single(&mut self, kind: TokenKind) -> Token {
        self.cursor.advance();
        self.make_token(kind)
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        let span = Span::with_file(
            self.token_start,
            self.cursor.position(),
            self.file_id,
            self.token_start_line,
            self.token_start_column,
        );
        Token::new(kind, self.cursor.slice_from(self.token_start), span)
    }

    fn span_here(&self) -> Span {
        Span::with_file(
            self.cursor.position(),
            self.cursor.position() + 1,
            self.file_id,
            self.cursor.line(),
            self.cursor.column(),
        )
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}
