//! rulec-par - Expression parser for policy conditions and effects.
//!
//! A Pratt parser over the token stream from rulec-lex. Conditions and
//! effects share one grammar; tracker-update forms (`TRU:name op= expr`)
//! are only accepted in effect context.
//!
//! # Operator precedence (loosest to tightest)
//!
//! | Level | Operators | Associativity |
//! |-------|-----------|---------------|
//! | 1 | `OR` | Left |
//! | 2 | `AND` | Left |
//! | 3 | `NOT` | Prefix |
//! | 4 | `==`, `!=`, `<`, `<=`, `>`, `>=` | Left |
//! | 5 | `+`, `-` | Left |
//! | 6 | `*`, `/` | Left |
//!
//! `NOT` sits between `AND` and the comparisons: `NOT a == b` negates the
//! whole comparison, while `NOT a AND b` negates only `a`.

pub mod ast;
pub mod expr;

pub use ast::{AssignOp, BinOp, Expr, ExprKind, Lit};
pub use expr::bp;

use rulec_lex::{tokenize, Token, TokenWithSpan};
use rulec_util::{ErrorKind, Handler, Span};

/// Whether tracker-update forms are permitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseMode {
    /// Rule condition: boolean expression, no assignments.
    Condition,
    /// Effect expression: assignments and combinations thereof allowed.
    Effect,
}

/// The expression parser.
pub struct Parser<'a> {
    tokens: Vec<TokenWithSpan>,
    pos: usize,
    handler: &'a Handler,
    mode: ParseMode,
}

impl<'a> Parser<'a> {
    /// Create a parser over an already-lexed token stream.
    ///
    /// The stream must end with [`Token::Eof`], as produced by
    /// [`rulec_lex::tokenize`].
    pub fn new(tokens: Vec<TokenWithSpan>, handler: &'a Handler, mode: ParseMode) -> Self {
        Self {
            tokens,
            pos: 0,
            handler,
            mode,
        }
    }

    /// Lex and parse in one step.
    pub fn from_source(source: &str, handler: &'a Handler, mode: ParseMode) -> Self {
        Self::new(tokenize(source, handler), handler, mode)
    }

    /// Parse a complete expression, requiring all input to be consumed.
    pub fn parse(&mut self) -> Option<Expr> {
        if matches!(self.current(), Token::Eof) {
            self.error("empty expression", self.current_span());
            return None;
        }

        let expr = self.parse_expr_bp(bp::MIN)?;

        if !matches!(self.current(), Token::Eof) {
            self.error(
                format!("unexpected token `{}` after expression", self.current()),
                self.current_span(),
            );
        }
        Some(expr)
    }

    pub(crate) fn mode(&self) -> ParseMode {
        self.mode
    }

    pub(crate) fn current(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    pub(crate) fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or(Span::DUMMY)
    }

    pub(crate) fn advance(&mut self) {
        if self.pos < self.tokens.len().saturating_sub(1) {
            self.pos += 1;
        }
    }

    /// Consume the current token if it matches.
    pub(crate) fn eat(&mut self, token: &Token) -> bool {
        if self.current() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume the expected token or report a grammar error.
    pub(crate) fn expect(&mut self, token: Token, what: &str) -> bool {
        if self.eat(&token) {
            true
        } else {
            self.error(
                format!("expected {what}, found `{}`", self.current()),
                self.current_span(),
            );
            false
        }
    }

    pub(crate) fn error(&self, message: impl Into<String>, span: Span) {
        self.handler.error(ErrorKind::Grammar, message, span);
    }
}

/// Parse a rule condition string.
pub fn parse_condition(source: &str, handler: &Handler) -> Option<Expr> {
    Parser::from_source(source, handler, ParseMode::Condition).parse()
}

/// Parse an effect expression string.
pub fn parse_effect(source: &str, handler: &Handler) -> Option<Expr> {
    Parser::from_source(source, handler, ParseMode::Effect).parse()
}
