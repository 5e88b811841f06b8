//! Line comments and the `#include` directive.
//!
//! `#` introduces a comment running to end of line, with one exception: the
//! exact word `include` directly after the hash lexes as the include
//! directive. `#included` or `#inc` are ordinary comments.

use nom::{
    bytes::complete::{tag, take_till},
    character::complete::satisfy,
    combinator::{map, not, peek},
    sequence::terminated,
};

use super::token::{Input, LexResult, Token};

pub fn parse_hash(input: Input) -> LexResult<Token> {
    let (rest, _) = tag("#")(input)?;
    match parse_include_word(rest) {
        Ok((rest, _)) => Ok((rest, Token::Include)),
        Err(_) => map(take_till(|c| c == '\n'), |body: Input| {
            Token::Comment(body.fragment().to_string())
        })(rest),
    }
}

fn parse_include_word(input: Input) -> LexResult<()> {
    map(
        terminated(
            tag("include"),
            not(peek(satisfy(|c: char| c.is_alphanumeric() || c == '_'))),
        ),
        |_| (),
    )(input)
}
