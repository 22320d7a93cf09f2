//! Symbol tables for one rule compilation.
//!
//! A `ScopeCtx` holds the four namespaces an expression can reference:
//! the calling function's parameter slots, scalar trackers, mapped
//! trackers, and foreign calls. Tables are insertion-ordered so slot
//! indices and ids fall out of declaration order.

use indexmap::IndexMap;

use rulec_types::PrimitiveType;

use crate::hir::flags;

/// A scalar tracker visible to expressions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackerDef {
    /// Engine-assigned tracker id (1-based, shared with mapped trackers)
    pub id: u32,
    /// Declared value type
    pub ty: PrimitiveType,
}

/// A mapped tracker visible to expressions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MappedTrackerDef {
    /// Engine-assigned tracker id (1-based, shared with scalar trackers)
    pub id: u32,
    /// Declared key type
    pub key_ty: PrimitiveType,
    /// Declared value type
    pub value_ty: PrimitiveType,
}

/// A foreign call visible to expressions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignCallDef {
    /// Engine-assigned foreign-call id (1-based)
    pub id: u32,
    /// Declared return type
    pub return_ty: PrimitiveType,
}

/// The namespaces one rule compiles against.
#[derive(Default)]
pub struct ScopeCtx {
    params: IndexMap<String, PrimitiveType>,
    trackers: IndexMap<String, TrackerDef>,
    mapped: IndexMap<String, MappedTrackerDef>,
    foreign_calls: IndexMap<String, ForeignCallDef>,
}

impl ScopeCtx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter slot; slot index is the insertion position.
    pub fn add_param(&mut self, name: impl Into<String>, ty: PrimitiveType) -> u32 {
        let (slot, _) = self.params.insert_full(name.into(), ty);
        slot as u32
    }

    pub fn add_tracker(&mut self, name: impl Into<String>, id: u32, ty: PrimitiveType) {
        self.trackers.insert(name.into(), TrackerDef { id, ty });
    }

    pub fn add_mapped_tracker(
        &mut self,
        name: impl Into<String>,
        id: u32,
        key_ty: PrimitiveType,
        value_ty: PrimitiveType,
    ) {
        self.mapped.insert(
            name.into(),
            MappedTrackerDef {
                id,
                key_ty,
                value_ty,
            },
        );
    }

    pub fn add_foreign_call(&mut self, name: impl Into<String>, id: u32, return_ty: PrimitiveType) {
        self.foreign_calls
            .insert(name.into(), ForeignCallDef { id, return_ty });
    }

    /// Resolve a parameter name to its slot index and type.
    pub fn param(&self, name: &str) -> Option<(u32, PrimitiveType)> {
        self.params
            .get_full(name)
            .map(|(slot, _, ty)| (slot as u32, *ty))
    }

    pub fn tracker(&self, name: &str) -> Option<&TrackerDef> {
        self.trackers.get(name)
    }

    pub fn mapped_tracker(&self, name: &str) -> Option<&MappedTrackerDef> {
        self.mapped.get(name)
    }

    pub fn foreign_call(&self, name: &str) -> Option<&ForeignCallDef> {
        self.foreign_calls.get(name)
    }

    /// Number of parameter slots.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}

/// Well-known environment values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlobalVar {
    BlockNumber,
    BlockTimestamp,
    MsgSender,
    MsgData,
    TxOrigin,
}

impl GlobalVar {
    /// Parse the `GV:` suffix.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "BLOCK_NUMBER" => Some(GlobalVar::BlockNumber),
            "BLOCK_TIMESTAMP" => Some(GlobalVar::BlockTimestamp),
            "MSG_SENDER" => Some(GlobalVar::MsgSender),
            "MSG_DATA" => Some(GlobalVar::MsgData),
            "TX_ORIGIN" => Some(GlobalVar::TxOrigin),
            _ => None,
        }
    }

    /// Recover a global from its descriptor flag.
    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            flags::MSG_SENDER => Some(GlobalVar::MsgSender),
            flags::BLOCK_TIMESTAMP => Some(GlobalVar::BlockTimestamp),
            flags::MSG_DATA => Some(GlobalVar::MsgData),
            flags::BLOCK_NUMBER => Some(GlobalVar::BlockNumber),
            flags::TX_ORIGIN => Some(GlobalVar::TxOrigin),
            _ => None,
        }
    }

    /// The descriptor flag selecting this global.
    pub fn flag(&self) -> u8 {
        match self {
            GlobalVar::MsgSender => flags::MSG_SENDER,
            GlobalVar::BlockTimestamp => flags::BLOCK_TIMESTAMP,
            GlobalVar::MsgData => flags::MSG_DATA,
            GlobalVar::BlockNumber => flags::BLOCK_NUMBER,
            GlobalVar::TxOrigin => flags::TX_ORIGIN,
        }
    }

    /// The value type the engine substitutes at run time.
    pub fn ty(&self) -> PrimitiveType {
        match self {
            GlobalVar::MsgSender | GlobalVar::TxOrigin => PrimitiveType::Address,
            GlobalVar::BlockNumber | GlobalVar::BlockTimestamp => PrimitiveType::Uint256,
            GlobalVar::MsgData => PrimitiveType::Bytes,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GlobalVar::BlockNumber => "BLOCK_NUMBER",
            GlobalVar::BlockTimestamp => "BLOCK_TIMESTAMP",
            GlobalVar::MsgSender => "MSG_SENDER",
            GlobalVar::MsgData => "MSG_DATA",
            GlobalVar::TxOrigin => "TX_ORIGIN",
        }
    }
}
