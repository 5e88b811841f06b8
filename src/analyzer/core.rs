//! # Core Parser Definitions
//!
//! This module defines the fundamental parser interface and error types
//! that form the foundation of the parser combinator system.

use thiserror::Error;

/// Parser trait defines the core parsing interface.
///
/// All parsers in the system implement this trait, which takes an input slice
/// and a position, and returns either a success result with a new position and
/// output value, or a parse error.
///
/// # Type Parameters
///
/// * `I` - The input token type
/// * `O` - The output value type
pub trait Parser<I, O> {
    /// Attempts to parse the input starting at the given position.
    ///
    /// # Returns
    ///
    /// * `Ok((new_pos, output))` - the new position and the parsed value
    /// * `Err(error)` - a [`ParseError`] locating the failure
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<O>;
}

impl<I, O, F> Parser<I, O> for F
where
    F: Fn(&[I], usize) -> ParseResult<O>,
{
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<O> {
        self(input, pos)
    }
}

/// Result type for parsing operations.
pub type ParseResult<O> = Result<(usize, O), ParseError>;

/// Error type for parsing operations.
///
/// Positions are token indices into the preprocessed stream; the pipeline
/// boundary maps them back to line/column via the token spans.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Unexpected end of file
    #[error("unexpected end of input: {message} at position {position}, context: {context:?}")]
    UnexpectedEOF {
        message: String,
        position: usize,
        context: Option<String>,
    },
    /// Unexpected token
    #[error("expected {expected}, found {parsed} at position {position}, context: {context:?}")]
    Unexpected {
        expected: String,
        parsed: String,
        position: usize,
        context: Option<String>,
    },
    /// No alternative matched
    #[error("no alternative matched at position {position}, context: {context:?}")]
    NoAlternative {
        position: usize,
        context: Option<String>,
    },
    /// Explicit failure
    #[error("{message} at position {position}, context: {context:?}")]
    Failure {
        message: String,
        position: usize,
        context: Option<String>,
    },
}

impl ParseError {
    pub fn with_context(self, ctx: &str) -> Self {
        let wrap = |context: Option<String>| {
            Some(match context {
                Some(c) => format!("{} -> {}", ctx, c),
                None => ctx.to_string(),
            })
        };
        match self {
            ParseError::UnexpectedEOF {
                message,
                position,
                context,
            } => ParseError::UnexpectedEOF {
                message,
                position,
                context: wrap(context),
            },
            ParseError::Unexpected {
                expected,
                parsed,
                position,
                context,
            } => ParseError::Unexpected {
                expected,
                parsed,
                position,
                context: wrap(context),
            },
            ParseError::NoAlternative { position, context } => ParseError::NoAlternative {
                position,
                context: wrap(context),
            },
            ParseError::Failure {
                message,
                position,
                context,
            } => ParseError::Failure {
                message,
                position,
                context: wrap(context),
            },
        }
    }

    pub fn get_position(&self) -> usize {
        match self {
            ParseError::UnexpectedEOF { position, .. } => *position,
            ParseError::Unexpected { position, .. } => *position,
            ParseError::NoAlternative { position, .. } => *position,
            ParseError::Failure { position, .. } => *position,
        }
    }

    /// Short human-readable form without the positional suffix, used when the
    /// position is rendered separately as line/column.
    pub fn describe(&self) -> String {
        match self {
            ParseError::UnexpectedEOF { message, .. } => {
                format!("unexpected end of input: {}", message)
            }
            ParseError::Unexpected {
                expected, parsed, ..
            } => format!("expected {}, found {}", expected, parsed),
            ParseError::NoAlternative { context, .. } => match context {
                Some(c) => format!("no alternative matched while parsing {}", c),
                None => "no alternative matched".to_string(),
            },
            ParseError::Failure { message, .. } => message.clone(),
        }
    }
}
