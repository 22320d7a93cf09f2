//! The emitter: resolved expression tree to instruction stream.
//!
//! Post-order traversal; each atom emits a producer instruction and each
//! operator emits its opcode over the memo indices of its children. The
//! memo counter increments once per producer regardless of how many tokens
//! the instruction occupies in the wire form.

use rulec_sem::{RExpr, RExprKind};
use rulec_types::encode_word;

use crate::instruction::{Instruction, InstructionStream, MemoId, UpdateFlag};

/// Builds one instruction stream.
pub struct Emitter {
    instructions: Vec<Instruction>,
    memos: u32,
}

impl Emitter {
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
            memos: 0,
        }
    }

    /// Emit one expression tree; returns the memo holding its result.
    pub fn emit(&mut self, expr: &RExpr) -> MemoId {
        match &expr.kind {
            RExprKind::Literal(value) => self.push_producer(Instruction::Push(encode_word(value))),

            RExprKind::Placeholder(id) => self.push_producer(Instruction::Placeholder(*id)),

            RExprKind::MappedLoad { tracker_id, key } => {
                let key = self.emit(key);
                self.push_producer(Instruction::MappedPlaceholder {
                    tracker: *tracker_id,
                    key,
                })
            }

            RExprKind::Not(operand) => {
                let operand = self.emit(operand);
                self.push_producer(Instruction::Not(operand))
            }

            RExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.emit(lhs);
                let rhs = self.emit(rhs);
                self.push_producer(Instruction::Binary {
                    op: *op,
                    lhs,
                    rhs,
                })
            }

            RExprKind::Update {
                tracker_id,
                mapped,
                key,
                current,
                op,
                value,
            } => {
                let flag = UpdateFlag::from_assign_op(*op);

                if *mapped {
                    let key = match key {
                        Some(key) => self.emit(key),
                        // The resolver guarantees mapped updates carry keys
                        None => MemoId(0),
                    };
                    let src = if let Some(bin_op) = flag.bin_op() {
                        let cur = self.push_producer(Instruction::MappedPlaceholder {
                            tracker: *tracker_id,
                            key,
                        });
                        let rhs = self.emit(value);
                        self.push_producer(Instruction::Binary {
                            op: bin_op,
                            lhs: cur,
                            rhs,
                        })
                    } else {
                        self.emit(value)
                    };
                    self.instructions.push(Instruction::MappedTrackerUpdate {
                        tracker: *tracker_id,
                        src,
                        key,
                        flag,
                    });
                    return src;
                }

                let src = if let (Some(bin_op), Some(current)) = (flag.bin_op(), *current) {
                    let cur = self.push_producer(Instruction::Placeholder(current));
                    let rhs = self.emit(value);
                    self.push_producer(Instruction::Binary {
                        op: bin_op,
                        lhs: cur,
                        rhs,
                    })
                } else {
                    self.emit(value)
                };
                self.instructions.push(Instruction::TrackerUpdate {
                    tracker: *tracker_id,
                    src,
                    flag,
                });
                src
            }
        }
    }

    /// Finish, yielding the stream.
    pub fn finish(self) -> InstructionStream {
        InstructionStream(self.instructions)
    }

    fn push_producer(&mut self, instruction: Instruction) -> MemoId {
        debug_assert!(instruction.is_producer());
        let memo = MemoId(self.memos);
        self.memos += 1;
        self.instructions.push(instruction);
        memo
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Emit a single expression as a complete stream.
pub fn emit_expr(expr: &RExpr) -> InstructionStream {
    let mut emitter = Emitter::new();
    emitter.emit(expr);
    emitter.finish()
}
