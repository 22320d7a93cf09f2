//! Token definitions for the policy expression language.

use std::fmt;

use rulec_util::Span;

/// A token produced by the lexer.
///
/// Literal tokens keep their source text: numeric literals may exceed any
/// machine integer (operands are 256-bit words), so conversion happens later
/// under the type checker's direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    // Literals
    /// Decimal integer literal, e.g. `500`
    Number(String),
    /// `0x`-prefixed hex literal that is not address-shaped
    Hex(String),
    /// `0x`-prefixed 40-digit hex literal
    AddressLit(String),
    /// Double-quoted string literal (content, unescaped)
    Str(String),
    /// `true`
    True,
    /// `false`
    False,

    // Identifier-like forms
    /// Unprefixed identifier (function-parameter reference)
    Ident(String),
    /// `TR:name` - tracker reference
    Tracker(String),
    /// `TRU:name` - tracker update target
    TrackerUpdate(String),
    /// `FC:name` - foreign-call reference
    ForeignCall(String),
    /// `GV:NAME` - global-variable reference
    GlobalVar(String),

    // Keywords (whole-word, case-sensitive)
    And,
    Or,
    Not,

    // Operators
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,

    // Delimiters
    LParen,
    RParen,
    Comma,

    /// End of input
    Eof,
    /// Unrecognized input (an error was reported)
    Invalid(String),
}

impl Token {
    /// Returns true for `==`, `!=`, `<`, `<=`, `>`, `>=`.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Token::EqEq | Token::NotEq | Token::Lt | Token::LtEq | Token::Gt | Token::GtEq
        )
    }

    /// Returns true for the compound and plain assignment operators.
    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            Token::Eq | Token::PlusEq | Token::MinusEq | Token::StarEq | Token::SlashEq
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(s) | Token::Hex(s) | Token::AddressLit(s) => write!(f, "{s}"),
            Token::Str(s) => write!(f, "\"{s}\""),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Ident(s) => write!(f, "{s}"),
            Token::Tracker(s) => write!(f, "TR:{s}"),
            Token::TrackerUpdate(s) => write!(f, "TRU:{s}"),
            Token::ForeignCall(s) => write!(f, "FC:{s}"),
            Token::GlobalVar(s) => write!(f, "GV:{s}"),
            Token::And => write!(f, "AND"),
            Token::Or => write!(f, "OR"),
            Token::Not => write!(f, "NOT"),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::LtEq => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::GtEq => write!(f, ">="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Eq => write!(f, "="),
            Token::PlusEq => write!(f, "+="),
            Token::MinusEq => write!(f, "-="),
            Token::StarEq => write!(f, "*="),
            Token::SlashEq => write!(f, "/="),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Eof => write!(f, "<eof>"),
            Token::Invalid(s) => write!(f, "{s}"),
        }
    }
}

/// A token together with its source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenWithSpan {
    pub token: Token,
    pub span: Span,
}

impl TokenWithSpan {
    pub fn new(token: Token, span: Span) -> Self {
        Self { token, span }
    }
}
