//! # Parser Combinators
//!
//! The building blocks of the parsing system. Each combinator is a function
//! returning an `impl Parser`, so grammar parsers compose them directly:
//!
//! * **Basic**: `equal`, `satisfy`
//! * **Sequential**: `tuple2`..`tuple4`, `preceded`, `terminated`, `delimited`
//! * **Alternative**: `choice`
//! * **Repetition**: `many`, `many1`, `separated_list`
//! * **Transformation**: `map`, `as_unit`, `optional`
//! * **Recursion and errors**: `lazy`, `with_context`

use std::fmt;

use super::core::{ParseError, Parser};

fn eof_error(position: usize, message: &str) -> ParseError {
    ParseError::UnexpectedEOF {
        message: message.to_string(),
        position,
        context: None,
    }
}

/// Matches a specific token in the input and consumes it.
pub fn equal<I>(value: I) -> impl Parser<I, I>
where
    I: Clone + PartialEq + fmt::Display,
{
    move |input: &[I], pos: usize| match input.get(pos) {
        Some(found) if *found == value => Ok((pos + 1, found.clone())),
        Some(found) => Err(ParseError::Unexpected {
            expected: value.to_string(),
            parsed: found.to_string(),
            position: pos,
            context: None,
        }),
        None => Err(eof_error(pos, &value.to_string())),
    }
}

/// Consumes one token when the closure maps it to a value.
///
/// `expected` names what the closure accepts, for error reporting.
pub fn satisfy<I, O, F>(expected: &'static str, f: F) -> impl Parser<I, O>
where
    I: fmt::Display,
    F: Fn(&I) -> Option<O>,
{
    move |input: &[I], pos: usize| match input.get(pos) {
        Some(token) => match f(token) {
            Some(output) => Ok((pos + 1, output)),
            None => Err(ParseError::Unexpected {
                expected: expected.to_string(),
                parsed: token.to_string(),
                position: pos,
                context: None,
            }),
        },
        None => Err(eof_error(pos, expected)),
    }
}

/// Transforms the output of a parser.
pub fn map<I, A, B, P, F>(parser: P, f: F) -> impl Parser<I, B>
where
    P: Parser<I, A>,
    F: Fn(A) -> B,
{
    move |input: &[I], pos: usize| {
        parser
            .parse(input, pos)
            .map(|(next, value)| (next, f(value)))
    }
}

/// Discards the output of a parser.
pub fn as_unit<I, O, P>(parser: P) -> impl Parser<I, ()>
where
    P: Parser<I, O>,
{
    move |input: &[I], pos: usize| parser.parse(input, pos).map(|(next, _)| (next, ()))
}

/// Tries each parser in order and succeeds with the first that matches.
///
/// When every alternative fails, reports the error of the alternative that
/// consumed the furthest, falling back to `NoAlternative` at the start
/// position when none progressed.
pub fn choice<I, O>(parsers: Vec<Box<dyn Parser<I, O>>>) -> impl Parser<I, O> {
    move |input: &[I], pos: usize| {
        let mut best: Option<ParseError> = None;
        for parser in &parsers {
            match parser.parse(input, pos) {
                Ok(result) => return Ok(result),
                Err(e) => {
                    let further = best
                        .as_ref()
                        .map(|b| e.get_position() > b.get_position())
                        .unwrap_or(true);
                    if further {
                        best = Some(e);
                    }
                }
            }
        }
        match best {
            Some(e) if e.get_position() > pos => Err(e),
            _ => Err(ParseError::NoAlternative {
                position: pos,
                context: None,
            }),
        }
    }
}

/// Applies a parser zero or more times, collecting the results.
pub fn many<I, O, P>(parser: P) -> impl Parser<I, Vec<O>>
where
    P: Parser<I, O>,
{
    move |input: &[I], pos: usize| {
        let mut results = Vec::new();
        let mut current = pos;
        while let Ok((next, value)) = parser.parse(input, current) {
            results.push(value);
            current = next;
        }
        Ok((current, results))
    }
}

/// Applies a parser one or more times.
pub fn many1<I, O, P>(parser: P) -> impl Parser<I, Vec<O>>
where
    P: Parser<I, O>,
{
    move |input: &[I], pos: usize| {
        let (mut current, first) = parser.parse(input, pos)?;
        let mut results = vec![first];
        while let Ok((next, value)) = parser.parse(input, current) {
            results.push(value);
            current = next;
        }
        Ok((current, results))
    }
}

/// Parses a possibly-empty list of items separated by a delimiter.
pub fn separated_list<I, O, P, S, SO>(item: P, separator: S) -> impl Parser<I, Vec<O>>
where
    P: Parser<I, O>,
    S: Parser<I, SO>,
{
    move |input: &[I], pos: usize| {
        let mut results = Vec::new();
        let mut current = pos;
        if let Ok((next, value)) = item.parse(input, current) {
            results.push(value);
            current = next;
            while let Ok((sep_next, _)) = separator.parse(input, current) {
                match item.parse(input, sep_next) {
                    Ok((next, value)) => {
                        results.push(value);
                        current = next;
                    }
                    Err(_) => break,
                }
            }
        }
        Ok((current, results))
    }
}

/// Makes a parser optional, succeeding with `None` on failure.
pub fn optional<I, O, P>(parser: P) -> impl Parser<I, Option<O>>
where
    P: Parser<I, O>,
{
    move |input: &[I], pos: usize| match parser.parse(input, pos) {
        Ok((next, value)) => Ok((next, Some(value))),
        Err(_) => Ok((pos, None)),
    }
}

/// Runs two parsers in sequence, keeping only the second result.
pub fn preceded<I, A, B, P1, P2>(first: P1, second: P2) -> impl Parser<I, B>
where
    P1: Parser<I, A>,
    P2: Parser<I, B>,
{
    move |input: &[I], pos: usize| {
        let (pos, _) = first.parse(input, pos)?;
        second.parse(input, pos)
    }
}

/// Runs two parsers in sequence, keeping only the first result.
pub fn terminated<I, A, B, P1, P2>(first: P1, second: P2) -> impl Parser<I, A>
where
    P1: Parser<I, A>,
    P2: Parser<I, B>,
{
    move |input: &[I], pos: usize| {
        let (pos, value) = first.parse(input, pos)?;
        let (pos, _) = second.parse(input, pos)?;
        Ok((pos, value))
    }
}

/// Parses content between two delimiters, keeping only the content.
pub fn delimited<I, L, O, R, PL, P, PR>(left: PL, parser: P, right: PR) -> impl Parser<I, O>
where
    PL: Parser<I, L>,
    P: Parser<I, O>,
    PR: Parser<I, R>,
{
    move |input: &[I], pos: usize| {
        let (pos, _) = left.parse(input, pos)?;
        let (pos, value) = parser.parse(input, pos)?;
        let (pos, _) = right.parse(input, pos)?;
        Ok((pos, value))
    }
}

/// Runs two parsers in sequence and pairs their results.
pub fn tuple2<I, O1, O2, P1, P2>(p1: P1, p2: P2) -> impl Parser<I, (O1, O2)>
where
    P1: Parser<I, O1>,
    P2: Parser<I, O2>,
{
    move |input: &[I], pos: usize| {
        let (pos, r1) = p1.parse(input, pos)?;
        let (pos, r2) = p2.parse(input, pos)?;
        Ok((pos, (r1, r2)))
    }
}

/// Runs three parsers in sequence.
pub fn tuple3<I, O1, O2, O3, P1, P2, P3>(p1: P1, p2: P2, p3: P3) -> impl Parser<I, (O1, O2, O3)>
where
    P1: Parser<I, O1>,
    P2: Parser<I, O2>,
    P3: Parser<I, O3>,
{
    move |input: &[I], pos: usize| {
        let (pos, r1) = p1.parse(input, pos)?;
        let (pos, r2) = p2.parse(input, pos)?;
        let (pos, r3) = p3.parse(input, pos)?;
        Ok((pos, (r1, r2, r3)))
    }
}

/// Runs four parsers in sequence.
pub fn tuple4<I, O1, O2, O3, O4, P1, P2, P3, P4>(
    p1: P1,
    p2: P2,
    p3: P3,
    p4: P4,
) -> impl Parser<I, (O1, O2, O3, O4)>
where
    P1: Parser<I, O1>,
    P2: Parser<I, O2>,
    P3: Parser<I, O3>,
    P4: Parser<I, O4>,
{
    move |input: &[I], pos: usize| {
        let (pos, r1) = p1.parse(input, pos)?;
        let (pos, r2) = p2.parse(input, pos)?;
        let (pos, r3) = p3.parse(input, pos)?;
        let (pos, r4) = p4.parse(input, pos)?;
        Ok((pos, (r1, r2, r3, r4)))
    }
}

/// Defers construction of a parser, enabling recursive grammars.
pub fn lazy<I, O, F, P>(f: F) -> impl Parser<I, O>
where
    F: Fn() -> P,
    P: Parser<I, O>,
{
    move |input: &[I], pos: usize| f().parse(input, pos)
}

/// Attaches a grammar context name to failures of the inner parser.
pub fn with_context<I, O, P>(parser: P, context: &'static str) -> impl Parser<I, O>
where
    P: Parser<I, O>,
{
    move |input: &[I], pos: usize| {
        parser
            .parse(input, pos)
            .map_err(|e| e.with_context(context))
    }
}
