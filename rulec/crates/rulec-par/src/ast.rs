//! rulec-par - AST node definitions.
//!
//! Expression nodes are a closed sum type; every later phase matches on them
//! exhaustively. Identifier references are still unresolved here - the scope
//! resolver turns them into placeholder references.

use std::fmt;

use rulec_util::Span;

/// Binary operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    /// Surface-syntax spelling of the operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "AND",
            BinOp::Or => "OR",
        }
    }

    /// Returns true for `==`, `!=`, `<`, `<=`, `>`, `>=`.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    /// Returns true for `<`, `<=`, `>`, `>=` (numeric ordering only).
    pub fn is_ordering(&self) -> bool {
        matches!(self, BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }

    /// Returns true for `+`, `-`, `*`, `/`.
    pub fn is_arithmetic(&self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div)
    }

    /// Returns true for `AND`, `OR`.
    pub fn is_logical(&self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Assignment operator used in tracker updates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    SubAssign,
    AddAssign,
    MulAssign,
    DivAssign,
}

impl AssignOp {
    /// Surface-syntax spelling.
    pub fn symbol(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::SubAssign => "-=",
            AssignOp::AddAssign => "+=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
        }
    }

    /// The binary operator a compound assignment applies, if any.
    pub fn bin_op(&self) -> Option<BinOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::SubAssign => Some(BinOp::Sub),
            AssignOp::AddAssign => Some(BinOp::Add),
            AssignOp::MulAssign => Some(BinOp::Mul),
            AssignOp::DivAssign => Some(BinOp::Div),
        }
    }
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Literal as written in the source, still untyped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lit {
    /// Decimal digit run
    Number(String),
    /// `0x` hex literal that is not address-shaped
    Hex(String),
    /// `0x` + 40 hex digits
    Address(String),
    /// Double-quoted string content
    Str(String),
    /// `true` / `false`
    Bool(bool),
}

/// An expression with its source span.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Expression node kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    /// Literal value
    Literal(Lit),
    /// Unprefixed identifier (function-parameter reference)
    Ident(String),
    /// `TR:name` scalar tracker reference
    Tracker(String),
    /// `FC:name` foreign-call reference
    ForeignCall(String),
    /// `GV:NAME` global-variable reference
    GlobalVar(String),
    /// `name(key)` mapped-tracker access (with or without `TR:` prefix)
    MappedAccess { name: String, key: Box<Expr> },
    /// `NOT expr`
    Not(Box<Expr>),
    /// Binary operation
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `TRU:name op= value` or `TRU:name(key) op= value`; effect context only
    TrackerUpdate {
        name: String,
        key: Option<Box<Expr>>,
        op: AssignOp,
        value: Box<Expr>,
    },
}
