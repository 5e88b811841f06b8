//! Operators and delimiters.
//!
//! Two-character operators (`!=`, `<=`, `>=`) are tried before their
//! one-character prefixes so `<=` never lexes as `<` followed by `=`.

use std::fmt;

use nom::{branch::alt, bytes::complete::tag, combinator::value};

use super::token::{Input, LexResult, Token};

/// Arithmetic, comparison, and miscellaneous operators.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Caret,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    PercentSign,
    Exclamation,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Caret => "^",
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::PercentSign => "%",
            Operator::Exclamation => "!",
        })
    }
}

/// Structural punctuation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Delimiter {
    Semicolon,
    Colon,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Delimiter::Semicolon => ";",
            Delimiter::Colon => ":",
            Delimiter::Dot => ".",
            Delimiter::Comma => ",",
            Delimiter::LParen => "(",
            Delimiter::RParen => ")",
            Delimiter::LBracket => "[",
            Delimiter::RBracket => "]",
            Delimiter::LBrace => "{",
            Delimiter::RBrace => "}",
        })
    }
}

pub fn parse_symbol(input: Input) -> LexResult<Token> {
    alt((parse_operator, parse_delimiter))(input)
}

fn parse_operator(input: Input) -> LexResult<Token> {
    let op = alt((
        value(Operator::NotEqual, tag("!=")),
        value(Operator::LessEqual, tag("<=")),
        value(Operator::GreaterEqual, tag(">=")),
        value(Operator::Plus, tag("+")),
        value(Operator::Minus, tag("-")),
        value(Operator::Multiply, tag("*")),
        value(Operator::Divide, tag("/")),
        value(Operator::Caret, tag("^")),
        value(Operator::Equal, tag("=")),
        value(Operator::Less, tag("<")),
        value(Operator::Greater, tag(">")),
        value(Operator::PercentSign, tag("%")),
        value(Operator::Exclamation, tag("!")),
    ));
    nom::combinator::map(op, Token::Operator)(input)
}

fn parse_delimiter(input: Input) -> LexResult<Token> {
    let delim = alt((
        value(Delimiter::Semicolon, tag(";")),
        value(Delimiter::Colon, tag(":")),
        value(Delimiter::Dot, tag(".")),
        value(Delimiter::Comma, tag(",")),
        value(Delimiter::LParen, tag("(")),
        value(Delimiter::RParen, tag(")")),
        value(Delimiter::LBracket, tag("[")),
        value(Delimiter::RBracket, tag("]")),
        value(Delimiter::LBrace, tag("{")),
        value(Delimiter::RBrace, tag("}")),
    ));
    nom::combinator::map(delim, Token::Delimiter)(input)
}
