//! Instruction definitions.
//!
//! The token set the engine executes. Literal operands are full 256-bit
//! words; operand references are typed memo indices. Numeric opcode
//! assignment is part of the engine ABI and happens downstream - the
//! compiler's wire form is the mnemonic stream produced by
//! [`InstructionStream::flatten`].

use std::fmt;

use rulec_par::ast::{AssignOp, BinOp};
use rulec_sem::PlaceholderId;
use rulec_types::U256;
use rulec_util::{define_idx, Idx};

define_idx!(MemoId);

/// Tracker-update operation flag.
///
/// The operand carried by `TRU`/`TRUM` telling the engine how to fold the
/// source memo into the tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UpdateFlag {
    Assign = 0,
    Sub = 1,
    Add = 2,
    Mul = 3,
    Div = 4,
}

impl UpdateFlag {
    pub fn from_assign_op(op: AssignOp) -> Self {
        match op {
            AssignOp::Assign => UpdateFlag::Assign,
            AssignOp::SubAssign => UpdateFlag::Sub,
            AssignOp::AddAssign => UpdateFlag::Add,
            AssignOp::MulAssign => UpdateFlag::Mul,
            AssignOp::DivAssign => UpdateFlag::Div,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(UpdateFlag::Assign),
            1 => Some(UpdateFlag::Sub),
            2 => Some(UpdateFlag::Add),
            3 => Some(UpdateFlag::Mul),
            4 => Some(UpdateFlag::Div),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// The assignment operator this flag spells in surface syntax.
    pub fn assign_op(&self) -> AssignOp {
        match self {
            UpdateFlag::Assign => AssignOp::Assign,
            UpdateFlag::Sub => AssignOp::SubAssign,
            UpdateFlag::Add => AssignOp::AddAssign,
            UpdateFlag::Mul => AssignOp::MulAssign,
            UpdateFlag::Div => AssignOp::DivAssign,
        }
    }

    /// The binary operator a compound update applies, if any.
    pub fn bin_op(&self) -> Option<BinOp> {
        self.assign_op().bin_op()
    }
}

/// One engine instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// `N value` - push a literal word
    Push(U256),
    /// `PLH index` - push the placeholder value at index
    Placeholder(PlaceholderId),
    /// `PLHM tracker key` - push a mapped-tracker value; operands are the
    /// tracker id and the memo holding the key
    MappedPlaceholder { tracker: u32, key: MemoId },
    /// Arithmetic, comparison, or boolean operation over two memos
    Binary {
        op: BinOp,
        lhs: MemoId,
        rhs: MemoId,
    },
    /// `NOT memo` - boolean negation
    Not(MemoId),
    /// `= lhs rhs` - assignment between memos (effect streams)
    Assign { lhs: MemoId, rhs: MemoId },
    /// `TRU tracker src flag` - fold a memo into a scalar tracker
    TrackerUpdate {
        tracker: u32,
        src: MemoId,
        flag: UpdateFlag,
    },
    /// `TRUM tracker src key flag` - fold a memo into a mapped tracker
    MappedTrackerUpdate {
        tracker: u32,
        src: MemoId,
        key: MemoId,
        flag: UpdateFlag,
    },
}

impl Instruction {
    /// Producers occupy a memo slot; tracker updates do not.
    pub fn is_producer(&self) -> bool {
        !matches!(
            self,
            Instruction::TrackerUpdate { .. } | Instruction::MappedTrackerUpdate { .. }
        )
    }

    /// The instruction's mnemonic token.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Push(_) => "N",
            Instruction::Placeholder(_) => "PLH",
            Instruction::MappedPlaceholder { .. } => "PLHM",
            Instruction::Binary { op, .. } => op.symbol(),
            Instruction::Not(_) => "NOT",
            Instruction::Assign { .. } => "=",
            Instruction::TrackerUpdate { .. } => "TRU",
            Instruction::MappedTrackerUpdate { .. } => "TRUM",
        }
    }

    /// Append the mnemonic and decimal operands to a flat wire stream.
    pub fn flatten_into(&self, out: &mut Vec<String>) {
        out.push(self.mnemonic().to_owned());
        match self {
            Instruction::Push(value) => out.push(value.to_string()),
            Instruction::Placeholder(id) => out.push(id.index().to_string()),
            Instruction::MappedPlaceholder { tracker, key } => {
                out.push(tracker.to_string());
                out.push(key.index().to_string());
            }
            Instruction::Binary { lhs, rhs, .. } | Instruction::Assign { lhs, rhs } => {
                out.push(lhs.index().to_string());
                out.push(rhs.index().to_string());
            }
            Instruction::Not(operand) => out.push(operand.index().to_string()),
            Instruction::TrackerUpdate { tracker, src, flag } => {
                out.push(tracker.to_string());
                out.push(src.index().to_string());
                out.push(flag.as_u8().to_string());
            }
            Instruction::MappedTrackerUpdate {
                tracker,
                src,
                key,
                flag,
            } => {
                out.push(tracker.to_string());
                out.push(src.index().to_string());
                out.push(key.index().to_string());
                out.push(flag.as_u8().to_string());
            }
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        self.flatten_into(&mut parts);
        write!(f, "{}", parts.join(" "))
    }
}

/// A compiled instruction stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstructionStream(pub Vec<Instruction>);

impl InstructionStream {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.0.iter()
    }

    /// The flat wire form: mnemonics followed by their decimal operands.
    pub fn flatten(&self) -> Vec<String> {
        let mut out = Vec::new();
        for instruction in &self.0 {
            instruction.flatten_into(&mut out);
        }
        out
    }

    /// Returns true when every operand memo strictly precedes the memo
    /// counter at the instruction referencing it.
    pub fn is_memo_monotonic(&self) -> bool {
        let mut memo = 0usize;
        for instruction in &self.0 {
            let ok = match instruction {
                Instruction::MappedPlaceholder { key, .. } => key.index() < memo,
                Instruction::Binary { lhs, rhs, .. } | Instruction::Assign { lhs, rhs } => {
                    lhs.index() < memo && rhs.index() < memo
                }
                Instruction::Not(operand) => operand.index() < memo,
                Instruction::TrackerUpdate { src, .. } => src.index() < memo,
                Instruction::MappedTrackerUpdate { src, key, .. } => {
                    src.index() < memo && key.index() < memo
                }
                Instruction::Push(_) | Instruction::Placeholder(_) => true,
            };
            if !ok {
                return false;
            }
            if instruction.is_producer() {
                memo += 1;
            }
        }
        true
    }
}

impl fmt::Display for InstructionStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", rendered.join(", "))
    }
}

impl FromIterator<Instruction> for InstructionStream {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Self(Vec::from_iter(iter))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for InstructionStream {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.flatten().serialize(serializer)
    }
}
