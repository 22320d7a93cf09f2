//! The resolution pass: untyped AST to typed, placeholder-resolved tree.
//!
//! Walking the AST visits leaves in source order, so allocating descriptors
//! on first resolution gives the first-use numbering the artifact requires.
//! Resolution failures abort the expression; type mismatches are reported
//! and the walk continues with the operator's result type, so one pass
//! collects as many problems as possible.

use rulec_par::ast::{AssignOp, BinOp, Expr, ExprKind, Lit};
use rulec_types::{parse_address, LiteralValue, PrimitiveType, U256};
use rulec_util::{ErrorKind, FxHashMap, Handler, IndexVec, Span};

use crate::hir::{flags, PlaceholderDescriptor, PlaceholderId, RExpr, RExprKind};
use crate::scope::{GlobalVar, ScopeCtx};

/// Whether the expression being resolved is a condition or an effect.
///
/// Effects may contain tracker updates and combine them with `AND`/`OR`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExprContext {
    Condition,
    Effect,
}

/// Resolves identifiers and checks types for one descriptor namespace.
///
/// A rule uses two resolvers: one for its condition and one shared across
/// all of its effects, keeping the two descriptor arrays disjoint.
pub struct Resolver<'a> {
    scope: &'a ScopeCtx,
    handler: &'a Handler,
    context: ExprContext,
    descriptors: IndexVec<PlaceholderId, PlaceholderDescriptor>,
    by_name: FxHashMap<String, PlaceholderId>,
}

impl<'a> Resolver<'a> {
    pub fn new(scope: &'a ScopeCtx, handler: &'a Handler, context: ExprContext) -> Self {
        Self {
            scope,
            handler,
            context,
            descriptors: IndexVec::new(),
            by_name: FxHashMap::default(),
        }
    }

    /// Resolve one expression. Returns `None` when a name failed to
    /// resolve; type mismatches are reported but do not abort.
    pub fn resolve(&mut self, expr: &Expr) -> Option<RExpr> {
        match &expr.kind {
            ExprKind::Literal(lit) => {
                let value = self.literal_value(lit, expr.span)?;
                let ty = value.ty();
                Some(RExpr::new(RExprKind::Literal(value), ty, expr.span))
            }

            ExprKind::Ident(name) => {
                let Some((slot, ty)) = self.scope.param(name) else {
                    self.resolution_error(
                        format!("identifier `{name}` does not resolve in any scope"),
                        expr.span,
                    );
                    return None;
                };
                let id = self.placeholder(
                    name,
                    PlaceholderDescriptor {
                        p_type: ty,
                        type_specific_index: slot,
                        flags: flags::PARAMETER,
                    },
                );
                Some(RExpr::new(RExprKind::Placeholder(id), ty, expr.span))
            }

            ExprKind::Tracker(name) => {
                if let Some(tracker) = self.scope.tracker(name) {
                    let id = self.placeholder(
                        &format!("TR:{name}"),
                        PlaceholderDescriptor {
                            p_type: tracker.ty,
                            type_specific_index: tracker.id,
                            flags: flags::TRACKER,
                        },
                    );
                    return Some(RExpr::new(RExprKind::Placeholder(id), tracker.ty, expr.span));
                }
                if self.scope.mapped_tracker(name).is_some() {
                    self.resolution_error(
                        format!("mapped tracker `{name}` requires a key"),
                        expr.span,
                    );
                } else {
                    self.resolution_error(format!("unknown tracker `{name}`"), expr.span);
                }
                None
            }

            ExprKind::ForeignCall(name) => {
                let Some(call) = self.scope.foreign_call(name) else {
                    self.resolution_error(format!("unknown foreign call `{name}`"), expr.span);
                    return None;
                };
                let id = self.placeholder(
                    &format!("FC:{name}"),
                    PlaceholderDescriptor {
                        p_type: call.return_ty,
                        type_specific_index: call.id,
                        flags: flags::FOREIGN_CALL,
                    },
                );
                Some(RExpr::new(
                    RExprKind::Placeholder(id),
                    call.return_ty,
                    expr.span,
                ))
            }

            ExprKind::GlobalVar(name) => {
                let Some(global) = GlobalVar::parse(name) else {
                    self.resolution_error(format!("unknown global variable `{name}`"), expr.span);
                    return None;
                };
                let id = self.placeholder(
                    &format!("GV:{name}"),
                    PlaceholderDescriptor {
                        p_type: global.ty(),
                        type_specific_index: 0,
                        flags: global.flag(),
                    },
                );
                Some(RExpr::new(
                    RExprKind::Placeholder(id),
                    global.ty(),
                    expr.span,
                ))
            }

            ExprKind::MappedAccess { name, key } => {
                let Some(mapped) = self.scope.mapped_tracker(name) else {
                    if self.scope.tracker(name).is_some() || self.scope.param(name).is_some() {
                        self.resolution_error(
                            format!("`{name}` is not a mapped tracker"),
                            expr.span,
                        );
                    } else {
                        self.resolution_error(
                            format!("identifier `{name}` does not resolve in any scope"),
                            expr.span,
                        );
                    }
                    return None;
                };
                let (tracker_id, key_ty, value_ty) = (mapped.id, mapped.key_ty, mapped.value_ty);

                let key = self.resolve(key)?;
                if key.ty != key_ty {
                    self.type_error(
                        format!(
                            "mapped tracker `{name}` is keyed by {key_ty}, found {}",
                            key.ty
                        ),
                        key.span,
                    );
                }
                Some(RExpr::new(
                    RExprKind::MappedLoad {
                        tracker_id,
                        key: Box::new(key),
                    },
                    value_ty,
                    expr.span,
                ))
            }

            ExprKind::Not(operand) => {
                let operand = self.resolve(operand)?;
                if operand.ty != PrimitiveType::Bool {
                    self.type_error(
                        format!("NOT requires a bool operand, found {}", operand.ty),
                        operand.span,
                    );
                }
                Some(RExpr::new(
                    RExprKind::Not(Box::new(operand)),
                    PrimitiveType::Bool,
                    expr.span,
                ))
            }

            ExprKind::Binary { op, lhs, rhs } => {
                // Resolve both sides before bailing so errors on the right
                // are still collected when the left fails.
                let lhs = self.resolve(lhs);
                let rhs = self.resolve(rhs);
                let (lhs, rhs) = (lhs?, rhs?);

                let ty = self.check_binary(*op, &lhs, &rhs, expr.span);
                Some(RExpr::new(
                    RExprKind::Binary {
                        op: *op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    ty,
                    expr.span,
                ))
            }

            ExprKind::TrackerUpdate {
                name,
                key,
                op,
                value,
            } => self.resolve_update(name, key.as_deref(), *op, value, expr.span),
        }
    }

    /// The descriptors allocated so far, in first-use order.
    pub fn descriptors(&self) -> &[PlaceholderDescriptor] {
        self.descriptors.as_slice()
    }

    /// Consume the resolver, yielding the descriptor array.
    pub fn into_descriptors(self) -> Vec<PlaceholderDescriptor> {
        self.descriptors.into_raw()
    }

    fn resolve_update(
        &mut self,
        name: &str,
        key: Option<&Expr>,
        op: AssignOp,
        value: &Expr,
        span: Span,
    ) -> Option<RExpr> {
        debug_assert_eq!(self.context, ExprContext::Effect);

        if let Some(key) = key {
            // Mapped update: the current value is read through PLHM, so no
            // placeholder is allocated for the target.
            let Some(mapped) = self.scope.mapped_tracker(name) else {
                self.resolution_error(
                    format!("unknown mapped tracker `{name}` in update"),
                    span,
                );
                return None;
            };
            let (tracker_id, key_ty, value_ty) = (mapped.id, mapped.key_ty, mapped.value_ty);

            let key = self.resolve(key)?;
            if key.ty != key_ty {
                self.type_error(
                    format!(
                        "mapped tracker `{name}` is keyed by {key_ty}, found {}",
                        key.ty
                    ),
                    key.span,
                );
            }

            let value = self.resolve(value)?;
            self.check_update_value(name, op, value_ty, &value);

            return Some(RExpr::new(
                RExprKind::Update {
                    tracker_id,
                    mapped: true,
                    key: Some(Box::new(key)),
                    current: None,
                    op,
                    value: Box::new(value),
                },
                PrimitiveType::Void,
                span,
            ));
        }

        let Some(tracker) = self.scope.tracker(name) else {
            if self.scope.mapped_tracker(name).is_some() {
                self.resolution_error(
                    format!("mapped tracker `{name}` requires a key in update"),
                    span,
                );
            } else {
                self.resolution_error(format!("unknown tracker `{name}` in update"), span);
            }
            return None;
        };
        let (tracker_id, tracker_ty) = (tracker.id, tracker.ty);

        // Compound updates read the current value; the read is a tracker
        // placeholder allocated before the right-hand side is visited.
        let current = if op.bin_op().is_some() {
            Some(self.placeholder(
                &format!("TRU:{name}"),
                PlaceholderDescriptor {
                    p_type: tracker_ty,
                    type_specific_index: tracker_id,
                    flags: flags::TRACKER,
                },
            ))
        } else {
            None
        };

        let value = self.resolve(value)?;
        self.check_update_value(name, op, tracker_ty, &value);

        Some(RExpr::new(
            RExprKind::Update {
                tracker_id,
                mapped: false,
                key: None,
                current,
                op,
                value: Box::new(value),
            },
            PrimitiveType::Void,
            span,
        ))
    }

    fn check_update_value(
        &self,
        name: &str,
        op: AssignOp,
        declared: PrimitiveType,
        value: &RExpr,
    ) {
        if value.ty != declared {
            self.type_error(
                format!(
                    "tracker `{name}` holds {declared}, cannot assign {}",
                    value.ty
                ),
                value.span,
            );
        }
        if op.bin_op().is_some() && !declared.is_numeric() {
            self.type_error(
                format!("compound update `{op}` requires a uint256 tracker, `{name}` holds {declared}"),
                value.span,
            );
        }
    }

    /// Type-check a binary operation, reporting mismatches. Returns the
    /// operator's result type so resolution can continue.
    fn check_binary(&self, op: BinOp, lhs: &RExpr, rhs: &RExpr, span: Span) -> PrimitiveType {
        if op.is_arithmetic() || op.is_ordering() {
            if lhs.ty != PrimitiveType::Uint256 || rhs.ty != PrimitiveType::Uint256 {
                self.type_error(
                    format!(
                        "operator `{op}` requires uint256 operands, found {} and {}",
                        lhs.ty, rhs.ty
                    ),
                    span,
                );
            }
            return if op.is_arithmetic() {
                PrimitiveType::Uint256
            } else {
                PrimitiveType::Bool
            };
        }

        if op.is_comparison() {
            // == and != compare any matching non-void types
            if lhs.ty != rhs.ty || lhs.ty == PrimitiveType::Void {
                self.type_error(
                    format!("cannot compare {} with {}", lhs.ty, rhs.ty),
                    span,
                );
            }
            return PrimitiveType::Bool;
        }

        // AND / OR
        let operand_ok = |ty: PrimitiveType| {
            ty == PrimitiveType::Bool
                || (self.context == ExprContext::Effect && ty == PrimitiveType::Void)
        };
        if !operand_ok(lhs.ty) || !operand_ok(rhs.ty) {
            self.type_error(
                format!(
                    "operator `{op}` requires bool operands, found {} and {}",
                    lhs.ty, rhs.ty
                ),
                span,
            );
        }
        PrimitiveType::Bool
    }

    /// Convert a source literal into a typed value.
    fn literal_value(&self, lit: &Lit, span: Span) -> Option<LiteralValue> {
        match lit {
            Lit::Number(text) => match U256::from_dec_str(text) {
                Ok(value) => Some(LiteralValue::Uint(value)),
                Err(_) => {
                    self.type_error(
                        format!("integer literal `{text}` does not fit in 256 bits"),
                        span,
                    );
                    None
                }
            },
            Lit::Hex(text) => {
                let digits = text.trim_start_matches("0x").trim_start_matches("0X");
                match U256::from_str_radix(digits, 16) {
                    Ok(value) => Some(LiteralValue::Uint(value)),
                    Err(_) => {
                        self.type_error(
                            format!("hex literal `{text}` does not fit in 256 bits"),
                            span,
                        );
                        None
                    }
                }
            }
            Lit::Address(text) => match parse_address(text) {
                Ok(addr) => Some(LiteralValue::Address(addr)),
                Err(err) => {
                    self.type_error(err.to_string(), span);
                    None
                }
            },
            Lit::Str(text) => Some(LiteralValue::Str(text.clone())),
            Lit::Bool(b) => Some(LiteralValue::Bool(*b)),
        }
    }

    /// Allocate a descriptor on first use; later uses reuse the index.
    fn placeholder(&mut self, key: &str, descriptor: PlaceholderDescriptor) -> PlaceholderId {
        if let Some(&id) = self.by_name.get(key) {
            return id;
        }
        let id = self.descriptors.push(descriptor);
        self.by_name.insert(key.to_owned(), id);
        id
    }

    fn resolution_error(&self, message: String, span: Span) {
        self.handler.error(ErrorKind::Resolution, message, span);
    }

    fn type_error(&self, message: impl Into<String>, span: Span) {
        self.handler.error(ErrorKind::Type, message, span);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulec_par::{parse_condition, parse_effect};

    fn transfer_scope() -> ScopeCtx {
        let mut scope = ScopeCtx::new();
        scope.add_param("to", PrimitiveType::Address);
        scope.add_param("value", PrimitiveType::Uint256);
        scope.add_tracker("count", 1, PrimitiveType::Uint256);
        scope.add_mapped_tracker("approved", 2, PrimitiveType::Address, PrimitiveType::Bool);
        scope.add_foreign_call("leaderboard", 1, PrimitiveType::Uint256);
        scope
    }

    fn resolve_condition(scope: &ScopeCtx, source: &str) -> (Option<RExpr>, Vec<PlaceholderDescriptor>, Handler) {
        let handler = Handler::new();
        let expr = parse_condition(source, &handler).expect("parse");
        let mut resolver = Resolver::new(scope, &handler, ExprContext::Condition);
        let resolved = resolver.resolve(&expr);
        (resolved, resolver.into_descriptors(), handler)
    }

    #[test]
    fn test_parameter_placeholders_reuse_index() {
        let scope = transfer_scope();
        let (resolved, descriptors, handler) =
            resolve_condition(&scope, "value + value > 5 AND value == 1");
        assert!(!handler.has_errors());
        assert!(resolved.is_some());
        // One descriptor despite three uses
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].type_specific_index, 1);
        assert_eq!(descriptors[0].flags, flags::PARAMETER);
        assert_eq!(descriptors[0].p_type, PrimitiveType::Uint256);
    }

    #[test]
    fn test_first_use_order() {
        let scope = transfer_scope();
        let (_, descriptors, handler) =
            resolve_condition(&scope, "FC:leaderboard > 100 AND value == 100");
        assert!(!handler.has_errors());
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].flags, flags::FOREIGN_CALL);
        assert_eq!(descriptors[0].type_specific_index, 1);
        assert_eq!(descriptors[1].flags, flags::PARAMETER);
        assert_eq!(descriptors[1].type_specific_index, 1);
    }

    #[test]
    fn test_mapped_access_allocates_no_descriptor_for_tracker() {
        let scope = transfer_scope();
        let (resolved, descriptors, handler) =
            resolve_condition(&scope, "TR:approved(to) == true");
        assert!(!handler.has_errors());
        // Only the key parameter gets a descriptor
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].p_type, PrimitiveType::Address);
        assert_eq!(descriptors[0].flags, flags::PARAMETER);

        let resolved = resolved.unwrap();
        match resolved.kind {
            RExprKind::Binary { lhs, .. } => match lhs.kind {
                RExprKind::MappedLoad { tracker_id, .. } => assert_eq!(tracker_id, 2),
                other => panic!("expected mapped load, got {other:?}"),
            },
            other => panic!("expected comparison, got {other:?}"),
        }
    }

    #[test]
    fn test_global_variable_flags() {
        let scope = transfer_scope();
        let (_, descriptors, handler) =
            resolve_condition(&scope, "GV:MSG_SENDER == to");
        assert!(!handler.has_errors());
        assert_eq!(descriptors[0].flags, flags::MSG_SENDER);
        assert_eq!(descriptors[0].p_type, PrimitiveType::Address);
        assert_eq!(descriptors[0].type_specific_index, 0);
    }

    #[test]
    fn test_unknown_identifier_is_fatal() {
        let scope = transfer_scope();
        let (resolved, _, handler) = resolve_condition(&scope, "missing > 5");
        assert!(resolved.is_none());
        assert!(handler.has_errors());
    }

    #[test]
    fn test_arithmetic_over_bools_is_type_error() {
        let scope = transfer_scope();
        let (resolved, _, handler) = resolve_condition(&scope, "true + false == 2");
        assert!(resolved.is_some());
        assert!(handler.has_errors());
    }

    #[test]
    fn test_comparing_mismatched_types_reports() {
        let scope = transfer_scope();
        let (_, _, handler) = resolve_condition(&scope, "to == 5");
        assert!(handler.has_errors());
    }

    #[test]
    fn test_mapped_tracker_without_key_reports() {
        let scope = transfer_scope();
        let (resolved, _, handler) = resolve_condition(&scope, "TR:approved == true");
        assert!(resolved.is_none());
        assert!(handler.has_errors());
    }

    #[test]
    fn test_scalar_update_allocates_tracker_descriptor() {
        let scope = transfer_scope();
        let handler = Handler::new();
        let expr = parse_effect("TRU:count -= 1", &handler).expect("parse");
        let mut resolver = Resolver::new(&scope, &handler, ExprContext::Effect);
        let resolved = resolver.resolve(&expr).expect("resolve");
        assert!(!handler.has_errors());

        let descriptors = resolver.into_descriptors();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].flags, flags::TRACKER);
        assert_eq!(descriptors[0].type_specific_index, 1);

        match resolved.kind {
            RExprKind::Update {
                tracker_id,
                mapped,
                current,
                op,
                ..
            } => {
                assert_eq!(tracker_id, 1);
                assert!(!mapped);
                assert!(current.is_some());
                assert_eq!(op, AssignOp::SubAssign);
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_assignment_reads_no_current_value() {
        let scope = transfer_scope();
        let handler = Handler::new();
        let expr = parse_effect("TRU:count = 5", &handler).expect("parse");
        let mut resolver = Resolver::new(&scope, &handler, ExprContext::Effect);
        let resolved = resolver.resolve(&expr).expect("resolve");
        assert!(!handler.has_errors());
        assert!(resolver.descriptors().is_empty());
        assert!(matches!(
            resolved.kind,
            RExprKind::Update { current: None, .. }
        ));
    }

    #[test]
    fn test_distinct_namespaces_get_distinct_descriptors() {
        // TR:count and TRU:count refer to the same tracker but allocate
        // separate descriptors.
        let scope = transfer_scope();
        let handler = Handler::new();
        let expr = parse_effect("TRU:count += TR:count", &handler).expect("parse");
        let mut resolver = Resolver::new(&scope, &handler, ExprContext::Effect);
        resolver.resolve(&expr).expect("resolve");
        assert!(!handler.has_errors());

        let descriptors = resolver.into_descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].flags, flags::TRACKER);
        assert_eq!(descriptors[1].flags, flags::TRACKER);
    }

    #[test]
    fn test_compound_update_on_bool_tracker_reports() {
        let mut scope = transfer_scope();
        scope.add_tracker("enabled", 3, PrimitiveType::Bool);
        let handler = Handler::new();
        let expr = parse_effect("TRU:enabled -= true", &handler).expect("parse");
        let mut resolver = Resolver::new(&scope, &handler, ExprContext::Effect);
        resolver.resolve(&expr);
        assert!(handler.has_errors());
    }

    #[test]
    fn test_bad_address_checksum_is_type_error() {
        let scope = transfer_scope();
        let (_, _, handler) =
            resolve_condition(&scope, "to == 0x5aaeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
        assert!(handler.has_errors());
    }
}
