//! Resolved expression tree and placeholder descriptors.

use rulec_par::ast::{AssignOp, BinOp};
use rulec_types::{LiteralValue, PrimitiveType};
use rulec_util::{define_idx, Span};

define_idx!(PlaceholderId);

/// Placeholder descriptor flag values.
///
/// `0x01`/`0x02` mark foreign-call and tracker placeholders; the remaining
/// values select a global variable. `0x00` is a plain function parameter.
pub mod flags {
    pub const PARAMETER: u8 = 0x00;
    pub const FOREIGN_CALL: u8 = 0x01;
    pub const TRACKER: u8 = 0x02;
    pub const MSG_SENDER: u8 = 0x04;
    pub const BLOCK_TIMESTAMP: u8 = 0x08;
    pub const MSG_DATA: u8 = 0x0C;
    pub const BLOCK_NUMBER: u8 = 0x10;
    pub const TX_ORIGIN: u8 = 0x14;
}

/// A runtime-resolved value reference within an instruction stream.
///
/// `type_specific_index` addresses the referent inside its own namespace:
/// parameter slot, tracker id, or foreign-call id (0 for globals).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PlaceholderDescriptor {
    #[cfg_attr(feature = "serde", serde(rename = "pType"))]
    pub p_type: PrimitiveType,
    #[cfg_attr(feature = "serde", serde(rename = "typeSpecificIndex"))]
    pub type_specific_index: u32,
    pub flags: u8,
}

/// A resolved, typed expression.
#[derive(Clone, Debug, PartialEq)]
pub struct RExpr {
    pub kind: RExprKind,
    pub ty: PrimitiveType,
    pub span: Span,
}

/// Resolved expression node kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum RExprKind {
    /// A typed literal value
    Literal(LiteralValue),
    /// A placeholder reference (parameter, scalar tracker, foreign call,
    /// or global variable)
    Placeholder(PlaceholderId),
    /// A mapped-tracker load; the id addresses the tracker directly
    MappedLoad { tracker_id: u32, key: Box<RExpr> },
    /// Boolean negation
    Not(Box<RExpr>),
    /// Binary operation
    Binary {
        op: BinOp,
        lhs: Box<RExpr>,
        rhs: Box<RExpr>,
    },
    /// Tracker update. For compound updates on scalar trackers, `current`
    /// is the placeholder reading the tracker's present value; mapped
    /// updates read through `PLHM` and need no placeholder.
    Update {
        tracker_id: u32,
        mapped: bool,
        key: Option<Box<RExpr>>,
        current: Option<PlaceholderId>,
        op: AssignOp,
        value: Box<RExpr>,
    },
}

impl RExpr {
    pub fn new(kind: RExprKind, ty: PrimitiveType, span: Span) -> Self {
        Self { kind, ty, span }
    }
}
