//! Number and string literals.
//!
//! Numbers are integers or decimals, either of which may carry a `%` suffix
//! turning them into a percent literal. The suffix binds tighter than the
//! standalone `%` operator, so `90%` is one token. Strings are single-quoted
//! with `''` as the escape for an embedded quote.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while1},
    combinator::{map, opt, recognize},
    multi::fold_many0,
    sequence::{delimited, preceded},
};

use super::token::{Input, LexResult, Token};

pub fn parse_literal(input: Input) -> LexResult<Token> {
    alt((parse_number, parse_string))(input)
}

fn parse_number(input: Input) -> LexResult<Token> {
    let (rest, int) = take_while1(|c: char| c.is_ascii_digit())(input)?;
    let (rest, frac) = opt(recognize(preceded(
        tag("."),
        take_while1(|c: char| c.is_ascii_digit()),
    )))(rest)?;
    let (rest, percent) = opt(tag("%"))(rest)?;

    let token = match (frac, percent.is_some()) {
        (Some(frac), is_percent) => {
            let text = format!("{}{}", int.fragment(), frac.fragment());
            let value: f64 = text.parse().expect("lexed decimal digits");
            if is_percent {
                Token::Percentage(value)
            } else {
                Token::Decimal(value)
            }
        }
        (None, true) => {
            let value: f64 = int.fragment().parse().expect("lexed integer digits");
            Token::Percentage(value)
        }
        (None, false) => {
            let value: i64 = int.fragment().parse().expect("lexed integer digits");
            Token::Integer(value)
        }
    };
    Ok((rest, token))
}

fn parse_string(input: Input) -> LexResult<Token> {
    map(
        delimited(
            tag("'"),
            fold_many0(
                alt((map(tag("''"), |_| "'"), map(is_not("'"), |s: Input| *s.fragment()))),
                String::new,
                |mut acc, piece| {
                    acc.push_str(piece);
                    acc
                },
            ),
            tag("'"),
        ),
        Token::String,
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(text: &str) -> Token {
        let (_, token) = parse_literal(Input::new(text)).unwrap();
        token
    }

    #[test]
    fn test_integer() {
        assert_eq!(lex("42"), Token::Integer(42));
        assert_eq!(lex("0"), Token::Integer(0));
    }

    #[test]
    fn test_decimal() {
        assert_eq!(lex("4.25"), Token::Decimal(4.25));
    }

    #[test]
    fn test_percentage() {
        assert_eq!(lex("90%"), Token::Percentage(90.0));
        assert_eq!(lex("0.5%"), Token::Percentage(0.5));
    }

    #[test]
    fn test_string() {
        assert_eq!(lex("'hello'"), Token::String("hello".to_string()));
        assert_eq!(lex("''"), Token::String(String::new()));
    }

    #[test]
    fn test_string_quote_escape() {
        assert_eq!(
            lex("'it''s a chest'"),
            Token::String("it's a chest".to_string())
        );
    }
}
