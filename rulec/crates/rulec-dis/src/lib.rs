//! rulec-dis - Reverse parser: instruction stream back to surface syntax.
//!
//! Walks a cleaned instruction stream, building a memo table of printed
//! fragments. Placeholder loads substitute caller-provided labels; literal
//! pushes print as plain integers unless an override restores the original
//! text (pre-encoded strings, addresses). Logical compositions are always
//! parenthesized, arithmetic and comparisons only where precedence demands
//! it, and a final pass removes the outermost pair.

use rulec_ir::{Instruction, InstructionStream, MemoId, UpdateFlag};
use rulec_par::ast::BinOp;
use rulec_types::{parse_address, to_checksum};
use rulec_util::{FxHashMap, Idx};

/// Restores the original text of a pre-encoded literal.
///
/// `index` is the instruction's position within the stream; `original` is
/// the surface text the literal was compiled from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiteralOverride {
    pub index: usize,
    pub original: String,
}

/// Reverse-parsing failures.
///
/// These indicate a malformed stream or an incomplete label array, not
/// user error; compiled artifacts always reverse-parse cleanly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReverseParseError {
    #[error("empty instruction stream")]
    EmptyStream,
    #[error("instruction {0} references memo {1} before it is produced")]
    ForwardMemoReference(usize, usize),
    #[error("placeholder index {0} has no label")]
    MissingLabel(usize),
    #[error("tracker update at instruction {0} does not wrap a matching compound expression")]
    MalformedUpdate(usize),
}

/// Printed-fragment precedence, loosest to tightest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Assign,
    Not,
    Comparison,
    Additive,
    Multiplicative,
    Atom,
}

fn bin_op_prec(op: BinOp) -> Prec {
    match op {
        BinOp::Add | BinOp::Sub => Prec::Additive,
        BinOp::Mul | BinOp::Div => Prec::Multiplicative,
        BinOp::And | BinOp::Or => Prec::Atom,
        _ => Prec::Comparison,
    }
}

/// One reconstructed memo entry.
#[derive(Clone, Debug)]
struct Fragment {
    text: String,
    prec: Prec,
    /// Text already carries its own outer parentheses (AND/OR nodes)
    wrapped: bool,
    /// Operator and printed operand texts, kept for update reconstruction
    binary: Option<(BinOp, String)>,
}

impl Fragment {
    fn atom(text: String) -> Self {
        Self {
            text,
            prec: Prec::Atom,
            wrapped: false,
            binary: None,
        }
    }
}

/// Reconstruct the surface syntax of an instruction stream.
///
/// `labels` maps placeholder indices (and, for `PLHM`/`TRU`/`TRUM`, tracker
/// label slots) to their surface names. `overrides` restores pre-encoded
/// literals by stream position; restored addresses render in checksum form.
pub fn reverse_parse(
    stream: &InstructionStream,
    labels: &[String],
    overrides: &[LiteralOverride],
) -> Result<String, ReverseParseError> {
    if stream.is_empty() {
        return Err(ReverseParseError::EmptyStream);
    }

    let override_map: FxHashMap<usize, &str> = overrides
        .iter()
        .map(|o| (o.index, o.original.as_str()))
        .collect();

    let mut memos: Vec<Fragment> = Vec::new();
    let mut last_text = String::new();
    let mut last_wrapped = false;

    for (pos, instruction) in stream.iter().enumerate() {
        let fragment = match instruction {
            Instruction::Push(value) => {
                let text = match override_map.get(&pos) {
                    Some(original) => restore_literal(original),
                    None => value.to_string(),
                };
                Fragment::atom(text)
            }

            Instruction::Placeholder(id) => {
                Fragment::atom(label(labels, id.index())?.to_owned())
            }

            Instruction::MappedPlaceholder { tracker, key } => {
                let key = memo(&memos, pos, *key)?;
                Fragment::atom(format!("{}({})", label(labels, *tracker as usize)?, key.text))
            }

            Instruction::Binary { op, lhs, rhs } if op.is_logical() => {
                let lhs = memo(&memos, pos, *lhs)?.text.clone();
                let rhs_frag = memo(&memos, pos, *rhs)?;
                let rhs = rhs_frag.text.clone();
                Fragment {
                    text: format!("( {lhs} {op} {rhs} )"),
                    prec: Prec::Atom,
                    wrapped: true,
                    binary: Some((*op, rhs)),
                }
            }

            Instruction::Binary { op, lhs, rhs } => {
                let prec = bin_op_prec(*op);
                let lhs = parenthesize(memo(&memos, pos, *lhs)?, prec, false);
                let rhs = parenthesize(memo(&memos, pos, *rhs)?, prec, true);
                Fragment {
                    text: format!("{lhs} {op} {rhs}"),
                    prec,
                    wrapped: false,
                    binary: Some((*op, rhs)),
                }
            }

            Instruction::Not(operand) => {
                let operand = memo(&memos, pos, *operand)?;
                Fragment {
                    text: format!("NOT {}", operand.text),
                    prec: Prec::Not,
                    wrapped: false,
                    binary: None,
                }
            }

            Instruction::Assign { lhs, rhs } => {
                let lhs = memo(&memos, pos, *lhs)?.text.clone();
                let rhs = memo(&memos, pos, *rhs)?.text.clone();
                Fragment {
                    text: format!("{lhs} = {rhs}"),
                    prec: Prec::Assign,
                    wrapped: false,
                    binary: None,
                }
            }

            Instruction::TrackerUpdate { tracker, src, flag } => {
                let text = reconstruct_update(
                    labels, &memos, pos, *tracker, None, *src, *flag,
                )?;
                last_text = text;
                last_wrapped = false;
                continue;
            }

            Instruction::MappedTrackerUpdate {
                tracker,
                src,
                key,
                flag,
            } => {
                let key_text = memo(&memos, pos, *key)?.text.clone();
                let text = reconstruct_update(
                    labels,
                    &memos,
                    pos,
                    *tracker,
                    Some(key_text),
                    *src,
                    *flag,
                )?;
                last_text = text;
                last_wrapped = false;
                continue;
            }
        };

        last_text = fragment.text.clone();
        last_wrapped = fragment.wrapped;
        memos.push(fragment);
    }

    // Strip the outermost pair when the whole expression is wrapped
    if last_wrapped {
        let stripped = last_text
            .strip_prefix("( ")
            .and_then(|s| s.strip_suffix(" )"));
        if let Some(inner) = stripped {
            return Ok(inner.to_owned());
        }
    }
    Ok(last_text)
}

/// Rebuild `TRU:name(key)? op= rhs` from an update instruction.
fn reconstruct_update(
    labels: &[String],
    memos: &[Fragment],
    pos: usize,
    tracker: u32,
    key: Option<String>,
    src: MemoId,
    flag: UpdateFlag,
) -> Result<String, ReverseParseError> {
    let raw = label(labels, tracker as usize)?;
    let name = raw
        .strip_prefix("TRU:")
        .or_else(|| raw.strip_prefix("TR:"))
        .unwrap_or(raw);
    let target = match key {
        Some(key) => format!("TRU:{name}({key})"),
        None => format!("TRU:{name}"),
    };

    let src = memo(memos, pos, src)?;
    let op = flag.assign_op();
    match flag.bin_op() {
        None => Ok(format!("{target} {op} {}", src.text)),
        Some(expected) => {
            let Some((actual, rhs)) = &src.binary else {
                return Err(ReverseParseError::MalformedUpdate(pos));
            };
            if *actual != expected {
                return Err(ReverseParseError::MalformedUpdate(pos));
            }
            Ok(format!("{target} {op} {rhs}"))
        }
    }
}

/// Wrap an operand in parentheses when precedence demands it.
///
/// Left operands keep equal precedence bare (left associativity); right
/// operands of equal precedence need parentheses to survive re-parsing.
fn parenthesize(fragment: &Fragment, parent: Prec, is_rhs: bool) -> String {
    let needs_parens = fragment.prec < parent || (is_rhs && fragment.prec == parent);
    if needs_parens && !fragment.wrapped {
        format!("( {} )", fragment.text)
    } else {
        fragment.text.clone()
    }
}

/// Print an override literal, checksumming address-shaped text.
fn restore_literal(original: &str) -> String {
    match parse_address(original) {
        Ok(addr) => to_checksum(&addr),
        Err(_) => original.to_owned(),
    }
}

fn label(labels: &[String], index: usize) -> Result<&str, ReverseParseError> {
    labels
        .get(index)
        .map(String::as_str)
        .ok_or(ReverseParseError::MissingLabel(index))
}

fn memo<'m>(
    memos: &'m [Fragment],
    pos: usize,
    id: MemoId,
) -> Result<&'m Fragment, ReverseParseError> {
    memos
        .get(id.index())
        .ok_or(ReverseParseError::ForwardMemoReference(pos, id.index()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulec_ir::Instruction as I;
    use rulec_types::U256;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_owned()).collect()
    }

    fn cmp(op: BinOp, lhs: u32, rhs: u32) -> I {
        I::Binary {
            op,
            lhs: MemoId(lhs),
            rhs: MemoId(rhs),
        }
    }

    #[test]
    fn test_simple_comparison() {
        let stream = InstructionStream(vec![
            I::Placeholder(rulec_sem::PlaceholderId(0)),
            I::Push(U256::from(5u64)),
            cmp(BinOp::Gt, 0, 1),
        ]);
        let out = reverse_parse(&stream, &labels(&["value"]), &[]).unwrap();
        assert_eq!(out, "value > 5");
    }

    #[test]
    fn test_nested_boolean_composition() {
        // PLH 0, N 1, ==, PLH 1, N ..., ==, AND, PLH 2, PLH 3, N 1, ==,
        // AND, PLH 4, N 500, <, AND, OR
        let big = U256::from(0xdeadbeefdeadbeefu64);
        let stream = InstructionStream(vec![
            I::Placeholder(rulec_sem::PlaceholderId(0)),
            I::Push(U256::one()),
            cmp(BinOp::Eq, 0, 1),
            I::Placeholder(rulec_sem::PlaceholderId(1)),
            I::Push(big),
            cmp(BinOp::Eq, 3, 4),
            cmp(BinOp::And, 2, 5),
            I::Placeholder(rulec_sem::PlaceholderId(2)),
            I::Placeholder(rulec_sem::PlaceholderId(3)),
            I::Push(U256::one()),
            cmp(BinOp::Eq, 8, 9),
            cmp(BinOp::And, 7, 10),
            I::Placeholder(rulec_sem::PlaceholderId(4)),
            I::Push(U256::from(500u64)),
            cmp(BinOp::Lt, 12, 13),
            cmp(BinOp::And, 11, 14),
            cmp(BinOp::Or, 6, 15),
        ]);
        let out = reverse_parse(
            &stream,
            &labels(&["FC:isAllowed", "to", "FC:isSuperCoolGuy", "FC:isRich", "FC:creditRisk"]),
            &[],
        )
        .unwrap();
        assert_eq!(
            out,
            "( FC:isAllowed == 1 AND to == 16045690984833335023 ) OR \
             ( ( FC:isSuperCoolGuy AND FC:isRich == 1 ) AND FC:creditRisk < 500 )"
        );
    }

    #[test]
    fn test_arithmetic_parenthesized_only_when_needed() {
        // (a + b) * c needs parentheses; a + b * c does not
        let grouped = InstructionStream(vec![
            I::Placeholder(rulec_sem::PlaceholderId(0)),
            I::Placeholder(rulec_sem::PlaceholderId(1)),
            cmp(BinOp::Add, 0, 1),
            I::Placeholder(rulec_sem::PlaceholderId(2)),
            cmp(BinOp::Mul, 2, 3),
        ]);
        let out = reverse_parse(&grouped, &labels(&["a", "b", "c"]), &[]).unwrap();
        assert_eq!(out, "( a + b ) * c");

        let natural = InstructionStream(vec![
            I::Placeholder(rulec_sem::PlaceholderId(0)),
            I::Placeholder(rulec_sem::PlaceholderId(1)),
            I::Placeholder(rulec_sem::PlaceholderId(2)),
            cmp(BinOp::Mul, 1, 2),
            cmp(BinOp::Add, 0, 3),
        ]);
        let out = reverse_parse(&natural, &labels(&["a", "b", "c"]), &[]).unwrap();
        assert_eq!(out, "a + b * c");
    }

    #[test]
    fn test_right_operand_of_equal_precedence_keeps_parens() {
        // a - (b - c)
        let stream = InstructionStream(vec![
            I::Placeholder(rulec_sem::PlaceholderId(0)),
            I::Placeholder(rulec_sem::PlaceholderId(1)),
            I::Placeholder(rulec_sem::PlaceholderId(2)),
            cmp(BinOp::Sub, 1, 2),
            cmp(BinOp::Sub, 0, 3),
        ]);
        let out = reverse_parse(&stream, &labels(&["a", "b", "c"]), &[]).unwrap();
        assert_eq!(out, "a - ( b - c )");
    }

    #[test]
    fn test_mapped_placeholder() {
        let stream = InstructionStream(vec![
            I::Placeholder(rulec_sem::PlaceholderId(0)),
            I::MappedPlaceholder {
                tracker: 1,
                key: MemoId(0),
            },
            I::Push(U256::one()),
            cmp(BinOp::Eq, 1, 2),
        ]);
        let out = reverse_parse(&stream, &labels(&["to", "TR:trackerOne"]), &[]).unwrap();
        assert_eq!(out, "TR:trackerOne(to) == 1");
    }

    #[test]
    fn test_not_reconstruction() {
        let stream = InstructionStream(vec![
            I::Placeholder(rulec_sem::PlaceholderId(0)),
            I::Push(U256::from(3u64)),
            cmp(BinOp::Eq, 0, 1),
            I::Not(MemoId(2)),
        ]);
        let out = reverse_parse(&stream, &labels(&["value"]), &[]).unwrap();
        assert_eq!(out, "NOT value == 3");
    }

    #[test]
    fn test_compound_update_reconstruction() {
        let stream = InstructionStream(vec![
            I::Placeholder(rulec_sem::PlaceholderId(0)),
            I::Push(U256::one()),
            cmp(BinOp::Sub, 0, 1),
            I::TrackerUpdate {
                tracker: 0,
                src: MemoId(2),
                flag: UpdateFlag::Sub,
            },
        ]);
        let out = reverse_parse(&stream, &labels(&["TR:testOne"]), &[]).unwrap();
        assert_eq!(out, "TRU:testOne -= 1");
    }

    #[test]
    fn test_plain_assignment_reconstruction() {
        let stream = InstructionStream(vec![
            I::Push(U256::from(5u64)),
            I::TrackerUpdate {
                tracker: 0,
                src: MemoId(0),
                flag: UpdateFlag::Assign,
            },
        ]);
        let out = reverse_parse(&stream, &labels(&["TR:count"]), &[]).unwrap();
        assert_eq!(out, "TRU:count = 5");
    }

    #[test]
    fn test_mapped_update_reconstruction() {
        let stream = InstructionStream(vec![
            I::Placeholder(rulec_sem::PlaceholderId(0)),
            I::MappedPlaceholder {
                tracker: 1,
                key: MemoId(0),
            },
            I::Placeholder(rulec_sem::PlaceholderId(2)),
            cmp(BinOp::Add, 1, 2),
            I::MappedTrackerUpdate {
                tracker: 1,
                src: MemoId(3),
                key: MemoId(0),
                flag: UpdateFlag::Add,
            },
        ]);
        let out = reverse_parse(
            &stream,
            &labels(&["to", "TR:balances", "value"]),
            &[],
        )
        .unwrap();
        assert_eq!(out, "TRU:balances(to) += value");
    }

    #[test]
    fn test_string_override_restoration() {
        let digest = U256::from(123456u64);
        let stream = InstructionStream(vec![
            I::Placeholder(rulec_sem::PlaceholderId(0)),
            I::Push(digest),
            cmp(BinOp::Eq, 0, 1),
        ]);
        let overrides = vec![LiteralOverride {
            index: 1,
            original: "\"gold\"".to_owned(),
        }];
        let out = reverse_parse(&stream, &labels(&["tier"]), &overrides).unwrap();
        assert_eq!(out, "tier == \"gold\"");
    }

    #[test]
    fn test_address_override_prints_checksum_form() {
        let stream = InstructionStream(vec![
            I::Placeholder(rulec_sem::PlaceholderId(0)),
            I::Push(U256::from(1u64)),
            cmp(BinOp::Eq, 0, 1),
        ]);
        let overrides = vec![LiteralOverride {
            index: 1,
            original: "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".to_owned(),
        }];
        let out = reverse_parse(&stream, &labels(&["to"]), &overrides).unwrap();
        assert_eq!(out, "to == 0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
    }

    #[test]
    fn test_missing_label_errors() {
        let stream = InstructionStream(vec![I::Placeholder(rulec_sem::PlaceholderId(3))]);
        assert_eq!(
            reverse_parse(&stream, &labels(&["a"]), &[]),
            Err(ReverseParseError::MissingLabel(3))
        );
    }

    #[test]
    fn test_forward_memo_reference_errors() {
        let stream = InstructionStream(vec![cmp(BinOp::Add, 0, 1)]);
        assert!(matches!(
            reverse_parse(&stream, &labels(&[]), &[]),
            Err(ReverseParseError::ForwardMemoReference(0, _))
        ));
    }

    #[test]
    fn test_empty_stream_errors() {
        assert_eq!(
            reverse_parse(&InstructionStream::new(), &[], &[]),
            Err(ReverseParseError::EmptyStream)
        );
    }
}
