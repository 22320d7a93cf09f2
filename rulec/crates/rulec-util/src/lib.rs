//! rulec-util - Foundation types shared by every compiler phase.
//!
//! This crate provides source spans, the diagnostic handler used for error
//! accumulation across the whole compilation, and typed index vectors. It has
//! no knowledge of the policy language itself.

pub mod diagnostic;
pub mod index_vec;
pub mod span;

pub use diagnostic::{Diagnostic, ErrorKind, Handler, Level, Stage};
pub use index_vec::{Idx, IndexVec};
pub use span::Span;

// Re-export commonly used hash containers
pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;
