//! rulec-sem - Scope resolution, placeholder allocation, and type checking.
//!
//! Takes the parser's untyped AST and produces a resolved expression tree in
//! which every name has become a placeholder reference, a mapped-tracker
//! access, or an update target, and every node carries its primitive type.
//! Placeholder descriptors are allocated in first-use order while walking
//! the tree, which visits leaves in source order.

pub mod hir;
pub mod resolve;
pub mod scope;

pub use hir::{flags, PlaceholderDescriptor, PlaceholderId, RExpr, RExprKind};
pub use resolve::{ExprContext, Resolver};
pub use scope::{ForeignCallDef, GlobalVar, MappedTrackerDef, ScopeCtx, TrackerDef};
