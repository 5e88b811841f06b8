//! Convenience re-exports for grammar parser modules.

pub use super::combinators::*;
pub use super::core::{ParseError, ParseResult, Parser};
