//! Pratt parsing core: binding powers, prefix forms, infix loop.

use rulec_lex::Token;
use rulec_util::Span;

use crate::ast::{AssignOp, BinOp, Expr, ExprKind, Lit};
use crate::{ParseMode, Parser};

/// Binding power levels for Pratt parsing.
/// Higher numbers = tighter binding.
pub mod bp {
    /// Minimum binding power (start of expression)
    pub const MIN: u8 = 0;

    /// Logical OR
    pub const OR: u8 = 2;

    /// Logical AND
    pub const AND: u8 = 4;

    /// Prefix NOT (operand parses at this level)
    pub const NOT: u8 = 6;

    /// Comparisons: ==, !=, <, <=, >, >=
    pub const COMPARISON: u8 = 8;

    /// Additive: +, -
    pub const ADDITIVE: u8 = 10;

    /// Multiplicative: *, /
    pub const MULTIPLICATIVE: u8 = 12;
}

/// Binding powers for the current infix token.
///
/// Returns `(left_bp, right_bp, op)`. All binary operators are
/// left-associative: `right_bp = left_bp + 1`.
fn infix_binding_power(token: &Token) -> Option<(u8, u8, BinOp)> {
    let (l_bp, op) = match token {
        Token::Or => (bp::OR, BinOp::Or),
        Token::And => (bp::AND, BinOp::And),
        Token::EqEq => (bp::COMPARISON, BinOp::Eq),
        Token::NotEq => (bp::COMPARISON, BinOp::Ne),
        Token::Lt => (bp::COMPARISON, BinOp::Lt),
        Token::LtEq => (bp::COMPARISON, BinOp::Le),
        Token::Gt => (bp::COMPARISON, BinOp::Gt),
        Token::GtEq => (bp::COMPARISON, BinOp::Ge),
        Token::Plus => (bp::ADDITIVE, BinOp::Add),
        Token::Minus => (bp::ADDITIVE, BinOp::Sub),
        Token::Star => (bp::MULTIPLICATIVE, BinOp::Mul),
        Token::Slash => (bp::MULTIPLICATIVE, BinOp::Div),
        _ => return None,
    };
    Some((l_bp, l_bp + 1, op))
}

impl<'a> Parser<'a> {
    /// Parse an expression, consuming operators with binding power >= `min_bp`.
    pub(crate) fn parse_expr_bp(&mut self, min_bp: u8) -> Option<Expr> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let Some((l_bp, r_bp, op)) = infix_binding_power(self.current()) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            self.advance();

            let rhs = self.parse_expr_bp(r_bp)?;
            let span = lhs.span.to(rhs.span);
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }

        Some(lhs)
    }

    /// Parse a prefix form: literal, name, mapped access, `NOT`, group,
    /// or (in effect mode) a tracker update.
    fn parse_prefix(&mut self) -> Option<Expr> {
        let span = self.current_span();
        let token = self.current().clone();

        match token {
            Token::Not => {
                self.advance();
                let operand = self.parse_expr_bp(bp::NOT)?;
                let span = span.to(operand.span);
                Some(Expr::new(ExprKind::Not(Box::new(operand)), span))
            }

            Token::Number(text) => {
                self.advance();
                Some(Expr::new(ExprKind::Literal(Lit::Number(text)), span))
            }
            Token::Hex(text) => {
                self.advance();
                Some(Expr::new(ExprKind::Literal(Lit::Hex(text)), span))
            }
            Token::AddressLit(text) => {
                self.advance();
                Some(Expr::new(ExprKind::Literal(Lit::Address(text)), span))
            }
            Token::Str(text) => {
                self.advance();
                Some(Expr::new(ExprKind::Literal(Lit::Str(text)), span))
            }
            Token::True => {
                self.advance();
                Some(Expr::new(ExprKind::Literal(Lit::Bool(true)), span))
            }
            Token::False => {
                self.advance();
                Some(Expr::new(ExprKind::Literal(Lit::Bool(false)), span))
            }

            Token::Ident(name) => {
                self.advance();
                self.maybe_mapped_access(name, span, ExprKind::Ident)
            }
            Token::Tracker(name) => {
                self.advance();
                self.maybe_mapped_access(name, span, ExprKind::Tracker)
            }
            Token::ForeignCall(name) => {
                self.advance();
                Some(Expr::new(ExprKind::ForeignCall(name), span))
            }
            Token::GlobalVar(name) => {
                self.advance();
                Some(Expr::new(ExprKind::GlobalVar(name), span))
            }

            Token::TrackerUpdate(name) => {
                if self.mode() == ParseMode::Condition {
                    self.error("tracker updates are only valid in effects", span);
                    return None;
                }
                self.advance();
                self.parse_tracker_update(name, span)
            }

            Token::LParen => {
                self.advance();
                let inner = self.parse_expr_bp(bp::MIN)?;
                self.expect(Token::RParen, "closing `)`");
                // Redundant parentheses are discarded
                Some(inner)
            }

            other => {
                self.error(format!("unexpected token `{other}`"), span);
                None
            }
        }
    }

    /// After a parameter or tracker name, a `(` begins a mapped-tracker key.
    fn maybe_mapped_access(
        &mut self,
        name: String,
        span: Span,
        plain: fn(String) -> ExprKind,
    ) -> Option<Expr> {
        if !self.eat(&Token::LParen) {
            return Some(Expr::new(plain(name), span));
        }

        let key = self.parse_expr_bp(bp::MIN)?;
        let end = self.current_span();
        self.expect(Token::RParen, "closing `)` after mapped-tracker key");
        Some(Expr::new(
            ExprKind::MappedAccess {
                name,
                key: Box::new(key),
            },
            span.to(end),
        ))
    }

    /// Parse the tail of `TRU:name`: optional `(key)`, assignment operator,
    /// value expression.
    ///
    /// The value binds tighter than `AND`/`OR` so updates can be combined:
    /// `TRU:a += 1 AND TRU:b -= 1`.
    fn parse_tracker_update(&mut self, name: String, span: Span) -> Option<Expr> {
        let key = if self.eat(&Token::LParen) {
            let key = self.parse_expr_bp(bp::MIN)?;
            self.expect(Token::RParen, "closing `)` after mapped-tracker key");
            Some(Box::new(key))
        } else {
            None
        };

        let op = match self.current() {
            Token::Eq => AssignOp::Assign,
            Token::PlusEq => AssignOp::AddAssign,
            Token::MinusEq => AssignOp::SubAssign,
            Token::StarEq => AssignOp::MulAssign,
            Token::SlashEq => AssignOp::DivAssign,
            other => {
                self.error(
                    format!("expected assignment operator in tracker update, found `{other}`"),
                    self.current_span(),
                );
                return None;
            }
        };
        self.advance();

        let value = self.parse_expr_bp(bp::AND + 1)?;
        let span = span.to(value.span);
        Some(Expr::new(
            ExprKind::TrackerUpdate {
                name,
                key,
                op,
                value: Box::new(value),
            },
            span,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_condition, parse_effect};
    use rulec_util::Handler;

    /// Helper to parse a condition and return (expr, handler).
    fn parse_cond(source: &str) -> (Option<Expr>, Handler) {
        let handler = Handler::new();
        let expr = parse_condition(source, &handler);
        (expr, handler)
    }

    /// Helper to check a binary node's operator.
    fn assert_is_binary(expr: &Expr, op: BinOp) {
        match &expr.kind {
            ExprKind::Binary { op: actual, .. } => {
                assert_eq!(*actual, op, "expected operator {op:?}")
            }
            other => panic!("expected binary expression, got {other:?}"),
        }
    }

    fn binary_parts(expr: &Expr) -> (&Expr, &Expr) {
        match &expr.kind {
            ExprKind::Binary { lhs, rhs, .. } => (lhs, rhs),
            other => panic!("expected binary expression, got {other:?}"),
        }
    }

    // ========================================================================
    // ATOM TESTS
    // ========================================================================

    #[test]
    fn test_parse_number() {
        let (expr, handler) = parse_cond("42");
        assert!(!handler.has_errors());
        assert_eq!(
            expr.unwrap().kind,
            ExprKind::Literal(Lit::Number("42".into()))
        );
    }

    #[test]
    fn test_parse_bool_literals() {
        let (expr, _) = parse_cond("true");
        assert_eq!(expr.unwrap().kind, ExprKind::Literal(Lit::Bool(true)));
        let (expr, _) = parse_cond("false");
        assert_eq!(expr.unwrap().kind, ExprKind::Literal(Lit::Bool(false)));
    }

    #[test]
    fn test_parse_prefixed_names() {
        let (expr, _) = parse_cond("TR:count");
        assert_eq!(expr.unwrap().kind, ExprKind::Tracker("count".into()));
        let (expr, _) = parse_cond("FC:leaderboard");
        assert_eq!(expr.unwrap().kind, ExprKind::ForeignCall("leaderboard".into()));
        let (expr, _) = parse_cond("GV:MSG_SENDER");
        assert_eq!(expr.unwrap().kind, ExprKind::GlobalVar("MSG_SENDER".into()));
    }

    #[test]
    fn test_parse_mapped_access() {
        let (expr, handler) = parse_cond("TR:balances(to)");
        assert!(!handler.has_errors());
        match expr.unwrap().kind {
            ExprKind::MappedAccess { name, key } => {
                assert_eq!(name, "balances");
                assert_eq!(key.kind, ExprKind::Ident("to".into()));
            }
            other => panic!("expected mapped access, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_mapped_access_unprefixed() {
        let (expr, handler) = parse_cond("balances(to)");
        assert!(!handler.has_errors());
        assert!(matches!(
            expr.unwrap().kind,
            ExprKind::MappedAccess { .. }
        ));
    }

    #[test]
    fn test_mapped_key_is_full_expression() {
        let (expr, handler) = parse_cond("TR:scores(value + 1)");
        assert!(!handler.has_errors());
        match expr.unwrap().kind {
            ExprKind::MappedAccess { key, .. } => assert_is_binary(&key, BinOp::Add),
            other => panic!("expected mapped access, got {other:?}"),
        }
    }

    // ========================================================================
    // PRECEDENCE TESTS
    // ========================================================================

    #[test]
    fn test_precedence_mul_over_add() {
        // a + b * c parses as a + (b * c)
        let (expr, handler) = parse_cond("a + b * c");
        assert!(!handler.has_errors());
        let expr = expr.unwrap();
        assert_is_binary(&expr, BinOp::Add);
        let (_, rhs) = binary_parts(&expr);
        assert_is_binary(rhs, BinOp::Mul);
    }

    #[test]
    fn test_precedence_add_over_comparison() {
        // value + fee > 5 parses as (value + fee) > 5
        let (expr, handler) = parse_cond("value + fee > 5");
        assert!(!handler.has_errors());
        let expr = expr.unwrap();
        assert_is_binary(&expr, BinOp::Gt);
        let (lhs, _) = binary_parts(&expr);
        assert_is_binary(lhs, BinOp::Add);
    }

    #[test]
    fn test_precedence_comparison_over_and() {
        // a == 1 AND b == 2 parses as (a == 1) AND (b == 2)
        let (expr, handler) = parse_cond("a == 1 AND b == 2");
        assert!(!handler.has_errors());
        let expr = expr.unwrap();
        assert_is_binary(&expr, BinOp::And);
        let (lhs, rhs) = binary_parts(&expr);
        assert_is_binary(lhs, BinOp::Eq);
        assert_is_binary(rhs, BinOp::Eq);
    }

    #[test]
    fn test_precedence_and_over_or() {
        // a OR b AND c parses as a OR (b AND c)
        let (expr, handler) = parse_cond("a OR b AND c");
        assert!(!handler.has_errors());
        let expr = expr.unwrap();
        assert_is_binary(&expr, BinOp::Or);
        let (_, rhs) = binary_parts(&expr);
        assert_is_binary(rhs, BinOp::And);
    }

    #[test]
    fn test_not_negates_comparison() {
        // NOT binds looser than ==: NOT a == b is NOT (a == b)
        let (expr, handler) = parse_cond("NOT a == b");
        assert!(!handler.has_errors());
        match expr.unwrap().kind {
            ExprKind::Not(operand) => assert_is_binary(&operand, BinOp::Eq),
            other => panic!("expected NOT, got {other:?}"),
        }
    }

    #[test]
    fn test_not_binds_tighter_than_and() {
        // NOT a AND b is (NOT a) AND b
        let (expr, handler) = parse_cond("NOT a AND b");
        assert!(!handler.has_errors());
        let expr = expr.unwrap();
        assert_is_binary(&expr, BinOp::And);
        let (lhs, _) = binary_parts(&expr);
        assert!(matches!(lhs.kind, ExprKind::Not(_)));
    }

    #[test]
    fn test_double_not() {
        let (expr, handler) = parse_cond("NOT NOT flag");
        assert!(!handler.has_errors());
        match expr.unwrap().kind {
            ExprKind::Not(inner) => assert!(matches!(inner.kind, ExprKind::Not(_))),
            other => panic!("expected NOT, got {other:?}"),
        }
    }

    // ========================================================================
    // ASSOCIATIVITY TESTS
    // ========================================================================

    #[test]
    fn test_left_associativity() {
        // a - b - c parses as (a - b) - c
        let (expr, handler) = parse_cond("a - b - c");
        assert!(!handler.has_errors());
        let expr = expr.unwrap();
        assert_is_binary(&expr, BinOp::Sub);
        let (lhs, _) = binary_parts(&expr);
        assert_is_binary(lhs, BinOp::Sub);
    }

    #[test]
    fn test_and_left_associativity() {
        let (expr, handler) = parse_cond("a AND b AND c");
        assert!(!handler.has_errors());
        let expr = expr.unwrap();
        assert_is_binary(&expr, BinOp::And);
        let (lhs, _) = binary_parts(&expr);
        assert_is_binary(lhs, BinOp::And);
    }

    // ========================================================================
    // PARENTHESES TESTS
    // ========================================================================

    #[test]
    fn test_parens_override_precedence() {
        // (a + b) * c keeps the addition on the left
        let (expr, handler) = parse_cond("(a + b) * c");
        assert!(!handler.has_errors());
        let expr = expr.unwrap();
        assert_is_binary(&expr, BinOp::Mul);
        let (lhs, _) = binary_parts(&expr);
        assert_is_binary(lhs, BinOp::Add);
    }

    #[test]
    fn test_redundant_parens_discarded() {
        let (plain, _) = parse_cond("a + b");
        let (wrapped, handler) = parse_cond("((a + b))");
        assert!(!handler.has_errors());
        assert_eq!(
            wrapped.unwrap().kind,
            plain.unwrap().kind
        );
    }

    #[test]
    fn test_nested_grouping() {
        // 3 == 3 AND (1 == 1 OR (2 == 2 AND 3 == 3))
        let (expr, handler) = parse_cond("3 == 3 AND (1 == 1 OR (2 == 2 AND 3 == 3))");
        assert!(!handler.has_errors());
        let expr = expr.unwrap();
        assert_is_binary(&expr, BinOp::And);
        let (_, rhs) = binary_parts(&expr);
        assert_is_binary(rhs, BinOp::Or);
    }

    #[test]
    fn test_mismatched_paren_reports() {
        let (_, handler) = parse_cond("(a + b");
        assert!(handler.has_errors());
    }

    // ========================================================================
    // TRACKER UPDATE TESTS
    // ========================================================================

    #[test]
    fn test_update_rejected_in_condition() {
        let (expr, handler) = parse_cond("TRU:count -= 1");
        assert!(handler.has_errors());
        assert!(expr.is_none());
    }

    #[test]
    fn test_update_in_effect() {
        let handler = Handler::new();
        let expr = parse_effect("TRU:count -= 1", &handler);
        assert!(!handler.has_errors());
        match expr.unwrap().kind {
            ExprKind::TrackerUpdate { name, key, op, value } => {
                assert_eq!(name, "count");
                assert!(key.is_none());
                assert_eq!(op, AssignOp::SubAssign);
                assert_eq!(value.kind, ExprKind::Literal(Lit::Number("1".into())));
            }
            other => panic!("expected tracker update, got {other:?}"),
        }
    }

    #[test]
    fn test_mapped_update_in_effect() {
        let handler = Handler::new();
        let expr = parse_effect("TRU:balances(to) += value", &handler);
        assert!(!handler.has_errors());
        match expr.unwrap().kind {
            ExprKind::TrackerUpdate { name, key, op, .. } => {
                assert_eq!(name, "balances");
                assert_eq!(key.unwrap().kind, ExprKind::Ident("to".into()));
                assert_eq!(op, AssignOp::AddAssign);
            }
            other => panic!("expected tracker update, got {other:?}"),
        }
    }

    #[test]
    fn test_combined_updates() {
        // Updates combine under AND without swallowing each other
        let handler = Handler::new();
        let expr = parse_effect("TRU:a += 1 AND TRU:b -= 1", &handler);
        assert!(!handler.has_errors());
        let expr = expr.unwrap();
        assert_is_binary(&expr, BinOp::And);
        let (lhs, rhs) = binary_parts(&expr);
        assert!(matches!(lhs.kind, ExprKind::TrackerUpdate { .. }));
        assert!(matches!(rhs.kind, ExprKind::TrackerUpdate { .. }));
    }

    #[test]
    fn test_update_requires_assignment_operator() {
        let handler = Handler::new();
        let expr = parse_effect("TRU:count > 1", &handler);
        assert!(handler.has_errors());
        assert!(expr.is_none());
    }

    // ========================================================================
    // ERROR TESTS
    // ========================================================================

    #[test]
    fn test_empty_expression_reports() {
        let (expr, handler) = parse_cond("");
        assert!(handler.has_errors());
        assert!(expr.is_none());
    }

    #[test]
    fn test_trailing_token_reports() {
        let (_, handler) = parse_cond("a + b c");
        assert!(handler.has_errors());
    }

    #[test]
    fn test_missing_operand_reports() {
        let (expr, handler) = parse_cond("a +");
        assert!(handler.has_errors());
        assert!(expr.is_none());
    }
}
