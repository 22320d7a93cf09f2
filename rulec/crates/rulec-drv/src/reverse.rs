//! Reverse-parsing a compiled rule back to surface syntax.
//!
//! The reverse parser itself works over label arrays; this module derives
//! those labels from a rule's placeholder descriptors and the artifact's
//! entity tables, and remaps tracker ids into label slots.

use rulec_dis::{reverse_parse, LiteralOverride, ReverseParseError};
use rulec_ir::{Effect, EffectKind, Instruction, InstructionStream};
use rulec_sem::{flags, GlobalVar, PlaceholderDescriptor};

use crate::artifact::{CompiledPolicy, CompiledRule};

/// Reconstruct the surface syntax of a rule's condition.
pub fn reverse_condition(
    policy: &CompiledPolicy,
    rule: &CompiledRule,
) -> Result<String, ReverseParseError> {
    reverse_stream(policy, rule, &rule.condition, &rule.placeholders, &[])
}

/// Reconstruct the surface syntax of one of a rule's effects.
pub fn reverse_effect(
    policy: &CompiledPolicy,
    rule: &CompiledRule,
    effect: &Effect,
) -> Result<String, ReverseParseError> {
    match effect.kind {
        EffectKind::Revert if effect.text.is_empty() => Ok("revert".to_owned()),
        EffectKind::Revert => Ok(format!("revert(\"{}\")", effect.text)),
        EffectKind::Event => Ok(format!("emit {}", effect.text)),
        EffectKind::Expression => reverse_stream(
            policy,
            rule,
            &effect.instructions,
            &rule.effect_placeholders,
            &[],
        ),
    }
}

fn reverse_stream(
    policy: &CompiledPolicy,
    rule: &CompiledRule,
    stream: &InstructionStream,
    descriptors: &[PlaceholderDescriptor],
    overrides: &[LiteralOverride],
) -> Result<String, ReverseParseError> {
    let mut labels = Vec::with_capacity(descriptors.len());
    for (index, descriptor) in descriptors.iter().enumerate() {
        labels.push(descriptor_label(policy, rule, index, descriptor)?);
    }

    // Mapped loads and tracker updates address trackers by id; give each
    // referenced tracker a label slot
    let cleaned = InstructionStream(
        stream
            .iter()
            .map(|instruction| match *instruction {
                Instruction::MappedPlaceholder { tracker, key } => {
                    tracker_label_slot(policy, &mut labels, tracker).map(|slot| {
                        Instruction::MappedPlaceholder { tracker: slot, key }
                    })
                }
                Instruction::TrackerUpdate { tracker, src, flag } => {
                    tracker_label_slot(policy, &mut labels, tracker)
                        .map(|slot| Instruction::TrackerUpdate { tracker: slot, src, flag })
                }
                Instruction::MappedTrackerUpdate {
                    tracker,
                    src,
                    key,
                    flag,
                } => tracker_label_slot(policy, &mut labels, tracker).map(|slot| {
                    Instruction::MappedTrackerUpdate {
                        tracker: slot,
                        src,
                        key,
                        flag,
                    }
                }),
                ref other => Ok(other.clone()),
            })
            .collect::<Result<Vec<_>, _>>()?,
    );

    reverse_parse(&cleaned, &labels, overrides)
}

/// The surface label a descriptor stands for.
fn descriptor_label(
    policy: &CompiledPolicy,
    rule: &CompiledRule,
    index: usize,
    descriptor: &PlaceholderDescriptor,
) -> Result<String, ReverseParseError> {
    match descriptor.flags {
        flags::PARAMETER => {
            let function = policy
                .calling_functions
                .iter()
                .find(|f| f.name == rule.calling_function)
                .ok_or(ReverseParseError::MissingLabel(index))?;
            function
                .params
                .get(descriptor.type_specific_index as usize)
                .map(|param| param.name.clone())
                .ok_or(ReverseParseError::MissingLabel(index))
        }
        flags::FOREIGN_CALL => policy
            .foreign_calls
            .iter()
            .find(|f| f.id == descriptor.type_specific_index)
            .map(|f| format!("FC:{}", f.name))
            .ok_or(ReverseParseError::MissingLabel(index)),
        flags::TRACKER => tracker_name(policy, descriptor.type_specific_index)
            .map(|name| format!("TR:{name}"))
            .ok_or(ReverseParseError::MissingLabel(index)),
        flag => GlobalVar::from_flag(flag)
            .map(|global| format!("GV:{}", global.name()))
            .ok_or(ReverseParseError::MissingLabel(index)),
    }
}

/// Find or append the label slot for a tracker id.
fn tracker_label_slot(
    policy: &CompiledPolicy,
    labels: &mut Vec<String>,
    tracker_id: u32,
) -> Result<u32, ReverseParseError> {
    let name = tracker_name(policy, tracker_id)
        .ok_or(ReverseParseError::MissingLabel(tracker_id as usize))?;
    let label = format!("TR:{name}");
    if let Some(slot) = labels.iter().position(|existing| *existing == label) {
        return Ok(slot as u32);
    }
    labels.push(label);
    Ok((labels.len() - 1) as u32)
}

fn tracker_name(policy: &CompiledPolicy, tracker_id: u32) -> Option<&str> {
    policy
        .trackers
        .iter()
        .find(|t| t.id == tracker_id)
        .map(|t| t.name.as_str())
        .or_else(|| {
            policy
                .mapped_trackers
                .iter()
                .find(|t| t.id == tracker_id)
                .map(|t| t.name.as_str())
        })
}
