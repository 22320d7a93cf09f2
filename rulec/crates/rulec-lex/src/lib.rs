//! rulec-lex - Lexer for policy condition and effect text.
//!
//! Turns a condition or effect string into a token stream: literals,
//! identifier-like forms (including the prefixed names `TR:`, `TRU:`,
//! `FC:`, `GV:`), operators matched longest-first, parentheses, and the
//! word-boundary keywords `AND`/`OR`/`NOT`.

pub mod cursor;
pub mod lexer;
pub mod token;

pub use cursor::Cursor;
pub use lexer::{tokenize, Lexer};
pub use token::{Token, TokenWithSpan};
