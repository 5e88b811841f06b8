//! Grammar parsers for the SciFiWeb language.
//!
//! The submodules build the AST from the preprocessed token stream:
//!
//! * [`expression`]: the operator-precedence expression grammar
//! * [`types`]: collectable, group, and distribution declarations
//! * [`events`]: event definitions, statements, and option blocks
//! * [`root`]: the top-level item list
//!
//! This module holds the token-level helpers shared by all of them.

pub mod events;
pub mod expression;
pub mod root;
pub mod types;

use crate::ast::Ident;
use crate::tokenizer::keyword::Keyword;
use crate::tokenizer::symbol::{Delimiter, Operator};
use crate::tokenizer::token::{Token, TokenSpan};

use super::core::{ParseError, ParseResult, Parser};

/// Matches one specific token, ignoring its span.
pub fn token(expected: Token) -> impl Parser<TokenSpan, TokenSpan> {
    move |input: &[TokenSpan], pos: usize| match input.get(pos) {
        Some(found) if found.token == expected => Ok((pos + 1, found.clone())),
        Some(found) => Err(ParseError::Unexpected {
            expected: expected.to_string(),
            parsed: found.token.to_string(),
            position: pos,
            context: None,
        }),
        None => Err(ParseError::UnexpectedEOF {
            message: expected.to_string(),
            position: pos,
            context: None,
        }),
    }
}

pub fn keyword(keyword: Keyword) -> impl Parser<TokenSpan, TokenSpan> {
    token(Token::Keyword(keyword))
}

pub fn delimiter(delimiter: Delimiter) -> impl Parser<TokenSpan, TokenSpan> {
    token(Token::Delimiter(delimiter))
}

pub fn operator(operator: Operator) -> impl Parser<TokenSpan, TokenSpan> {
    token(Token::Operator(operator))
}

pub fn semicolon() -> impl Parser<TokenSpan, TokenSpan> {
    delimiter(Delimiter::Semicolon)
}

pub fn comma() -> impl Parser<TokenSpan, TokenSpan> {
    delimiter(Delimiter::Comma)
}

/// Matches an identifier token and carries its position into the AST.
pub fn identifier() -> impl Parser<TokenSpan, Ident> {
    move |input: &[TokenSpan], pos: usize| match input.get(pos) {
        Some(span) => match &span.token {
            Token::Identifier(name) => {
                Ok((pos + 1, Ident::new(name.clone(), span.line, span.column)))
            }
            other => Err(ParseError::Unexpected {
                expected: "identifier".to_string(),
                parsed: other.to_string(),
                position: pos,
                context: None,
            }),
        },
        None => Err(ParseError::UnexpectedEOF {
            message: "identifier".to_string(),
            position: pos,
            context: None,
        }),
    }
}

/// Matches a string literal token.
pub fn string_literal() -> impl Parser<TokenSpan, String> {
    move |input: &[TokenSpan], pos: usize| match input.get(pos) {
        Some(span) => match &span.token {
            Token::String(value) => Ok((pos + 1, value.clone())),
            other => Err(ParseError::Unexpected {
                expected: "string".to_string(),
                parsed: other.to_string(),
                position: pos,
                context: None,
            }),
        },
        None => Err(ParseError::UnexpectedEOF {
            message: "string".to_string(),
            position: pos,
            context: None,
        }),
    }
}

/// A dotted-path segment: an identifier, or one of the keywords that double
/// as property accessors (`amount`, `min`, `max`).
pub fn path_segment() -> impl Parser<TokenSpan, String> {
    move |input: &[TokenSpan], pos: usize| -> ParseResult<String> {
        match input.get(pos) {
            Some(span) => {
                let name = match &span.token {
                    Token::Identifier(name) => Some(name.clone()),
                    Token::Keyword(Keyword::Amount) => Some("amount".to_string()),
                    Token::Keyword(Keyword::Min) => Some("min".to_string()),
                    Token::Keyword(Keyword::Max) => Some("max".to_string()),
                    _ => None,
                };
                match name {
                    Some(name) => Ok((pos + 1, name)),
                    None => Err(ParseError::Unexpected {
                        expected: "path segment".to_string(),
                        parsed: span.token.to_string(),
                        position: pos,
                        context: None,
                    }),
                }
            }
            None => Err(ParseError::UnexpectedEOF {
                message: "path segment".to_string(),
                position: pos,
                context: None,
            }),
        }
    }
}
