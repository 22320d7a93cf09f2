//! Effect classification and compilation.
//!
//! Every effect string is one of three things: a revert (with optional
//! message), an event emission, or an expression - typically a tracker
//! update. Reverts and events carry no instructions; expressions compile
//! through the shared parse/resolve/emit pipeline.

use rulec_par::{ParseMode, Parser};
use rulec_sem::Resolver;
use rulec_util::{ErrorKind, Handler, Span};

use crate::emit::Emitter;
use crate::instruction::InstructionStream;

/// What an effect does when its rule fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum EffectKind {
    Revert,
    Event,
    Expression,
}

/// A compiled effect.
///
/// Reverts and events carry their message/event name in `text` and an
/// empty stream; expressions carry an empty `text` and the compiled
/// stream.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Effect {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: EffectKind,
    pub text: String,
    #[cfg_attr(feature = "serde", serde(rename = "instructionSet"))]
    pub instructions: InstructionStream,
}

impl Effect {
    fn revert(text: impl Into<String>) -> Self {
        Self {
            kind: EffectKind::Revert,
            text: text.into(),
            instructions: InstructionStream::new(),
        }
    }

    fn event(text: impl Into<String>) -> Self {
        Self {
            kind: EffectKind::Event,
            text: text.into(),
            instructions: InstructionStream::new(),
        }
    }
}

/// Compile one effect string.
///
/// The resolver is shared across all effects of a rule so they draw
/// placeholder indices from one namespace (disjoint from the condition's).
pub fn compile_effect(
    source: &str,
    resolver: &mut Resolver<'_>,
    handler: &Handler,
) -> Option<Effect> {
    let trimmed = source.trim();

    if trimmed == "revert" {
        return Some(Effect::revert(""));
    }
    if let Some(rest) = trimmed.strip_prefix("revert") {
        let rest = rest.trim_start();
        if rest.starts_with('(') {
            return parse_revert_message(rest, handler).map(Effect::revert);
        }
        // Anything else ("revertAll", ...) falls through to the
        // expression path
    }

    if let Some(rest) = trimmed.strip_prefix("emit ") {
        let name = rest.trim();
        if name.is_empty() {
            handler.error(ErrorKind::Grammar, "emit effect is missing an event name", Span::DUMMY);
            return None;
        }
        return Some(Effect::event(name));
    }

    let expr = Parser::from_source(trimmed, handler, ParseMode::Effect).parse()?;
    let resolved = resolver.resolve(&expr)?;

    let mut emitter = Emitter::new();
    emitter.emit(&resolved);
    Some(Effect {
        kind: EffectKind::Expression,
        text: String::new(),
        instructions: emitter.finish(),
    })
}

/// Extract the message from `("...")` after `revert`.
fn parse_revert_message(rest: &str, handler: &Handler) -> Option<String> {
    let inner = rest
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .map(str::trim);
    let Some(inner) = inner else {
        handler.error(
            ErrorKind::Grammar,
            "malformed revert effect: expected `revert(\"message\")`",
            Span::DUMMY,
        );
        return None;
    };

    if inner.is_empty() {
        return Some(String::new());
    }

    let message = inner
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(inner);
    Some(message.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulec_sem::{ExprContext, ScopeCtx};
    use rulec_types::PrimitiveType;

    fn effect_scope() -> ScopeCtx {
        let mut scope = ScopeCtx::new();
        scope.add_param("to", PrimitiveType::Address);
        scope.add_param("value", PrimitiveType::Uint256);
        scope.add_tracker("testOne", 4, PrimitiveType::Uint256);
        scope.add_mapped_tracker("balances", 5, PrimitiveType::Address, PrimitiveType::Uint256);
        scope
    }

    fn compile(source: &str) -> (Option<Effect>, Vec<rulec_sem::PlaceholderDescriptor>, Handler) {
        let scope = effect_scope();
        let handler = Handler::new();
        let mut resolver = Resolver::new(&scope, &handler, ExprContext::Effect);
        let effect = compile_effect(source, &mut resolver, &handler);
        (effect, resolver.into_descriptors(), handler)
    }

    // ========================================================================
    // CLASSIFICATION TESTS
    // ========================================================================

    #[test]
    fn test_bare_revert() {
        let (effect, _, handler) = compile("revert");
        assert!(!handler.has_errors());
        let effect = effect.unwrap();
        assert_eq!(effect.kind, EffectKind::Revert);
        assert_eq!(effect.text, "");
        assert!(effect.instructions.is_empty());
    }

    #[test]
    fn test_revert_with_message() {
        let (effect, _, handler) = compile("revert(\"Transfer denied\")");
        assert!(!handler.has_errors());
        let effect = effect.unwrap();
        assert_eq!(effect.kind, EffectKind::Revert);
        assert_eq!(effect.text, "Transfer denied");
        assert!(effect.instructions.is_empty());
    }

    #[test]
    fn test_malformed_revert_reports() {
        let (effect, _, handler) = compile("revert(\"open");
        assert!(effect.is_none());
        assert!(handler.has_errors());
    }

    #[test]
    fn test_emit_event() {
        let (effect, _, handler) = compile("emit Price exceeded");
        assert!(!handler.has_errors());
        let effect = effect.unwrap();
        assert_eq!(effect.kind, EffectKind::Event);
        assert_eq!(effect.text, "Price exceeded");
        assert!(effect.instructions.is_empty());
    }

    #[test]
    fn test_other_strings_are_expressions() {
        let (effect, _, handler) = compile("value > 5");
        assert!(!handler.has_errors());
        assert_eq!(effect.unwrap().kind, EffectKind::Expression);
    }

    // ========================================================================
    // TRACKER UPDATE LOWERING
    // ========================================================================

    #[test]
    fn test_scalar_compound_update_lowering() {
        let (effect, descriptors, handler) = compile("TRU:testOne -= 1");
        assert!(!handler.has_errors());
        let effect = effect.unwrap();
        assert_eq!(effect.kind, EffectKind::Expression);
        assert_eq!(effect.text, "");
        // Current value, rhs, subtraction, then the update folding memo 2
        assert_eq!(effect.instructions.to_string(), "PLH 0, N 1, - 0 1, TRU 4 2 1");

        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].flags, rulec_sem::flags::TRACKER);
        assert_eq!(descriptors[0].type_specific_index, 4);
    }

    #[test]
    fn test_scalar_plain_assignment_lowering() {
        let (effect, descriptors, handler) = compile("TRU:testOne = 5");
        assert!(!handler.has_errors());
        assert_eq!(
            effect.unwrap().instructions.to_string(),
            "N 5, TRU 4 0 0"
        );
        assert!(descriptors.is_empty());
    }

    #[test]
    fn test_mapped_compound_update_lowering() {
        let (effect, descriptors, handler) = compile("TRU:balances(to) += value");
        assert!(!handler.has_errors());
        // Key, current value via PLHM, rhs, addition, update
        assert_eq!(
            effect.unwrap().instructions.to_string(),
            "PLH 0, PLHM 5 0, PLH 1, + 1 2, TRUM 5 3 0 2"
        );
        // Descriptors: the key parameter and the rhs parameter
        assert_eq!(descriptors.len(), 2);
    }

    #[test]
    fn test_mapped_plain_assignment_lowering() {
        let (effect, _, handler) = compile("TRU:balances(to) = 0");
        assert!(!handler.has_errors());
        assert_eq!(
            effect.unwrap().instructions.to_string(),
            "PLH 0, N 0, TRUM 5 1 0 0"
        );
    }

    #[test]
    fn test_update_streams_stay_monotonic() {
        for source in [
            "TRU:testOne -= 1",
            "TRU:testOne = 5",
            "TRU:balances(to) += value",
            "TRU:balances(to) = 0",
        ] {
            let (effect, _, handler) = compile(source);
            assert!(!handler.has_errors());
            assert!(effect.unwrap().instructions.is_memo_monotonic());
        }
    }
}
