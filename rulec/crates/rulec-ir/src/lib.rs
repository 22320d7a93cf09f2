//! rulec-ir - The engine instruction set and the emitter producing it.
//!
//! Instructions form a flat, memo-referencing stream: every producing
//! instruction (literal push, placeholder load, operator) occupies the next
//! memo slot, and operator operands name earlier memo slots. The stream is
//! static single assignment over a flat vector; no instruction is ever
//! revisited.

pub mod effect;
pub mod emit;
pub mod instruction;

pub use effect::{compile_effect, Effect, EffectKind};
pub use emit::{emit_expr, Emitter};
pub use instruction::{Instruction, InstructionStream, MemoId, UpdateFlag};
