//! # Analyzer Component
//!
//! The Analyzer transforms the preprocessed token stream into an Abstract
//! Syntax Tree using a parser combinator system.
//!
//! ## Component Structure
//!
//! * [`core`]: the `Parser` trait and positional error type
//! * [`combinators`]: the combinator building blocks
//! * [`prelude`]: convenience re-exports for grammar modules
//! * [`parsers`]: the SciFiWeb grammar itself
//!
//! ## Error Reporting
//!
//! Internally, errors carry token positions. [`parse_tokens`] maps the
//! furthest failure back to the token's line and column, producing the public
//! [`ParseError`]. Parsing is fail-fast: the first structural error aborts.

pub mod combinators;
pub mod core;
pub mod parsers;
pub mod prelude;

use thiserror::Error;

use crate::ast::SourceFile;
use crate::tokenizer::token::TokenSpan;

use self::core::Parser;
use self::parsers::root::parse_source_file;

/// A parse failure located in the source text.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("parse error at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub line: u32,
    pub column: usize,
    pub message: String,
}

/// Parses a full token stream into a [`SourceFile`].
///
/// The stream must already be preprocessed (comments stripped). Trailing
/// unconsumed tokens are a structural error.
#[tracing::instrument(level = "debug", skip_all)]
pub fn parse_tokens(tokens: &[TokenSpan]) -> Result<SourceFile, ParseError> {
    match parse_source_file().parse(tokens, 0) {
        Ok((consumed, file)) if consumed == tokens.len() => Ok(file),
        Ok((consumed, _)) => {
            // the item list stopped early: re-run the item parser at the
            // stuck position to recover the real cause
            let cause = parsers::root::parse_item().parse(tokens, consumed).err();
            let position = cause.as_ref().map(|e| e.get_position()).unwrap_or(consumed);
            Err(locate(
                tokens,
                position,
                cause
                    .map(|e| e.describe())
                    .unwrap_or_else(|| format!("unexpected {}", tokens[consumed].token)),
            ))
        }
        Err(e) => Err(locate(tokens, e.get_position(), e.describe())),
    }
}

fn locate(tokens: &[TokenSpan], position: usize, message: String) -> ParseError {
    match tokens.get(position) {
        Some(span) => ParseError {
            line: span.line,
            column: span.column,
            message,
        },
        None => {
            let (line, column) = tokens
                .last()
                .map(|span| (span.line, span.column))
                .unwrap_or((1, 1));
            ParseError {
                line,
                column,
                message,
            }
        }
    }
}
