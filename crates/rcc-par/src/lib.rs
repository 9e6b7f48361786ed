//! rcc-par - Recursive-descent parser and type elaboration.
//!
//! Consumes the token sequence and produces a [`Program`]: a type arena,
//! functions, and globals, with names resolved and struct layout computed
//! at declaration time. A single token of lookahead suffices everywhere
//! except the function/global split at top level and the cast/`sizeof(type)`
//! ambiguity, which peek at the token after a `(`.
//!
//! All mutable parse state lives on the [`Parser`]: the current function's
//! locals, the typedef, struct-tag, and enum-constant tables, the current
//! break/continue labels, and the label counters. Nested loops save and
//! restore the label fields around their bodies.
//!
//! Type elaboration ([`elaborate`]) runs as a separate walk after parsing
//! and assigns a resolved type to every expression node; the parser also
//! invokes it early on `sizeof` operands, which is why the walk lives in
//! this crate.

pub mod ast;
mod error;
mod expr;
mod items;
mod stmt;
pub mod symbol;
pub mod types;
pub mod typing;

pub use error::{ParseError, SemError};
pub use symbol::{Function, Global, Local, Program};
pub use types::{Member, Type, TypeArena, TypeId, TypeKind};
pub use typing::elaborate;

use rcc_lex::{Token, TokenKind};
use rcc_util::Span;
use rustc_hash::FxHashMap;

/// Parse a token sequence into a [`Program`].
///
/// The sequence must be terminated by an `Eof` token, as produced by
/// [`rcc_lex::tokenize`]. Expression types are not yet assigned; run
/// [`elaborate`] on the result before code generation.
pub fn parse(tokens: Vec<Token>) -> Result<Program, ParseError> {
    Parser::new(tokens).parse_program()
}

/// Parser state for one translation unit.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,

    pub(crate) types: TypeArena,
    pub(crate) functions: Vec<Function>,
    pub(crate) globals: Vec<Global>,

    /// Locals of the function being parsed, declaration order.
    pub(crate) locals: Vec<Local>,

    pub(crate) typedefs: FxHashMap<String, TypeId>,
    pub(crate) struct_tags: FxHashMap<String, TypeId>,
    pub(crate) enum_consts: FxHashMap<String, i64>,

    /// Labels for the innermost enclosing loop/switch.
    pub(crate) brk_label: Option<String>,
    pub(crate) cont_label: Option<String>,

    pub(crate) while_count: u32,
    pub(crate) for_count: u32,
    pub(crate) switch_count: u32,
    string_label_count: u32,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        debug_assert!(tokens.last().map_or(false, |t| t.kind == TokenKind::Eof));
        Self {
            tokens,
            pos: 0,
            types: TypeArena::new(),
            functions: Vec::new(),
            globals: Vec::new(),
            locals: Vec::new(),
            typedefs: FxHashMap::default(),
            struct_tags: FxHashMap::default(),
            enum_consts: FxHashMap::default(),
            brk_label: None,
            cont_label: None,
            while_count: 0,
            for_count: 0,
            switch_count: 0,
            string_label_count: 0,
        }
    }

    /// The current token. The sequence ends with `Eof`, which is never
    /// consumed, so this cannot run off the end.
    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// The token `n` past the current one (saturating at `Eof`).
    pub(crate) fn peek_ahead(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    pub(crate) fn span(&self) -> Span {
        self.peek().span
    }

    /// Consume and return the current token.
    pub(crate) fn bump(&mut self) -> Token {
        let tok = self.peek().clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    /// Consume the current token if it has the given kind.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Require a punctuator/keyword, diagnosing against its spelling.
    pub(crate) fn expect(
        &mut self,
        kind: TokenKind,
        spelling: &'static str,
    ) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(ParseError::Expected {
                expected: spelling,
                span: self.span(),
            })
        }
    }

    /// Require an identifier; `what` names the production for diagnostics.
    pub(crate) fn expect_ident(&mut self, what: &'static str) -> Result<Token, ParseError> {
        if self.at(TokenKind::Ident) {
            Ok(self.bump())
        } else {
            Err(ParseError::ExpectedName {
                what,
                span: self.span(),
            })
        }
    }

    /// Fresh `.LCn` label for a hoisted string literal.
    pub(crate) fn fresh_string_label(&mut self) -> String {
        let label = format!(".LC{}", self.string_label_count);
        self.string_label_count += 1;
        label
    }

    /// Whether the current token starts a type name: a type keyword,
    /// `struct`/`enum`, or a bound typedef name.
    pub(crate) fn is_typename(&self, tok: &Token) -> bool {
        match tok.kind {
            TokenKind::Int
            | TokenKind::Char
            | TokenKind::Void
            | TokenKind::Struct
            | TokenKind::Enum => true,
            TokenKind::Ident => self.typedefs.contains_key(&tok.lexeme),
            _ => false,
        }
    }
}
