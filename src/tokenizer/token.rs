//! Core token types and the tokenizer implementation.

use std::fmt;

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::multispace0,
    combinator::opt,
};
use nom_locate::LocatedSpan;
use thiserror::Error;

use super::comment::parse_hash;
use super::keyword::{Keyword, lookup_keyword};
use super::literal::parse_literal;
use super::symbol::{Delimiter, Operator, parse_symbol};

/// Lexer input carrying line/column information.
pub type Input<'a> = LocatedSpan<&'a str>;

/// Result type for the nom sub-lexers.
pub type LexResult<'a, O> = IResult<Input<'a>, O>;

/// A lexical token of the SciFiWeb language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Identifier(String),
    String(String),
    Integer(i64),
    Decimal(f64),
    Percentage(f64),
    Keyword(Keyword),
    Operator(Operator),
    Delimiter(Delimiter),
    Comment(String),
    /// The `#include` directive introducer.
    Include,
}

impl Token {
    pub fn is_comment(&self) -> bool {
        matches!(self, Token::Comment(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Identifier(name) => write!(f, "identifier {}", name),
            Token::String(s) => write!(f, "string '{}'", s),
            Token::Integer(i) => write!(f, "integer {}", i),
            Token::Decimal(d) => write!(f, "decimal {}", d),
            Token::Percentage(p) => write!(f, "percentage {}%", p),
            Token::Keyword(k) => write!(f, "keyword {}", k),
            Token::Operator(op) => write!(f, "{}", op),
            Token::Delimiter(d) => write!(f, "{}", d),
            Token::Comment(_) => write!(f, "comment"),
            Token::Include => write!(f, "#include"),
        }
    }
}

/// A token together with its source position (1-based line and column).
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSpan {
    pub token: Token,
    pub line: u32,
    pub column: usize,
}

impl fmt::Display for TokenSpan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.token)
    }
}

/// Error produced when the lexer hits a character it cannot start a token
/// with, such as an unterminated string quote or a stray `@`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("unexpected input at line {line}, column {column}: {fragment}")]
pub struct TokenizerError {
    pub line: u32,
    pub column: usize,
    pub fragment: String,
}

/// Transforms SciFiWeb source text into a stream of [`TokenSpan`]s.
///
/// Comments are kept in the stream; the preprocessor strips them. Parsing is
/// greedy and position-tracked, and the first unlexable character aborts with
/// a [`TokenizerError`].
#[derive(Debug, Default)]
pub struct Tokenizer {}

impl Tokenizer {
    pub fn new() -> Self {
        Self {}
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub fn tokenize(&self, source: &str) -> Result<Vec<TokenSpan>, TokenizerError> {
        let mut tokens = Vec::new();
        let mut rest = Input::new(source);
        loop {
            let (after_ws, _) = multispace0::<Input, nom::error::Error<Input>>(rest)
                .expect("multispace0 is infallible");
            if after_ws.fragment().is_empty() {
                break;
            }
            let line = after_ws.location_line();
            let column = after_ws.get_utf8_column();
            match parse_token(after_ws) {
                Ok((next, token)) => {
                    tokens.push(TokenSpan {
                        token,
                        line,
                        column,
                    });
                    rest = next;
                }
                Err(_) => {
                    let fragment: String = after_ws.fragment().chars().take(16).collect();
                    return Err(TokenizerError {
                        line,
                        column,
                        fragment,
                    });
                }
            }
        }
        Ok(tokens)
    }
}

fn parse_token(input: Input) -> LexResult<Token> {
    alt((
        parse_hash,
        parse_identifier_or_keyword,
        parse_literal,
        parse_symbol,
    ))(input)
}

fn is_identifier_begin(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Lexes a full word, then classifies it. A backtick prefix forces the word
/// to be an identifier even when it spells a keyword.
fn parse_identifier_or_keyword(input: Input) -> LexResult<Token> {
    let (rest, escape) = opt(tag("`"))(input)?;
    let (rest, first) = take_while1(is_identifier_begin)(rest)?;
    let (rest, tail) = take_while(is_identifier_char)(rest)?;
    let word = format!("{}{}", first.fragment(), tail.fragment());

    if escape.is_none() {
        if let Some(keyword) = lookup_keyword(&word) {
            return Ok((rest, Token::Keyword(keyword)));
        }
    }
    Ok((rest, Token::Identifier(word)))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        Tokenizer::new()
            .tokenize(source)
            .unwrap()
            .into_iter()
            .map(|span| span.token)
            .collect()
    }

    #[test]
    fn test_declaration_line() {
        assert_eq!(
            tokens("collectable Coin has amount;"),
            vec![
                Token::Keyword(Keyword::Collectable),
                Token::Identifier("Coin".to_string()),
                Token::Keyword(Keyword::Has),
                Token::Keyword(Keyword::Amount),
                Token::Delimiter(Delimiter::Semicolon),
            ]
        );
    }

    #[test]
    fn test_keyword_boundary() {
        assert_eq!(
            tokens("options minute"),
            vec![
                Token::Identifier("options".to_string()),
                Token::Identifier("minute".to_string()),
            ]
        );
    }

    #[test]
    fn test_escaped_identifier() {
        assert_eq!(tokens("`max"), vec![Token::Identifier("max".to_string())]);
    }

    #[test]
    fn test_positions() {
        let spans = Tokenizer::new()
            .tokenize("award 5 x Gem\n  to opener;")
            .unwrap();
        assert_eq!((spans[0].line, spans[0].column), (1, 1));
        assert_eq!((spans[1].line, spans[1].column), (1, 7));
        let to = spans.iter().find(|s| s.token == Token::Keyword(Keyword::To)).unwrap();
        assert_eq!((to.line, to.column), (2, 3));
    }

    #[test]
    fn test_comment_and_include() {
        assert_eq!(
            tokens("# loot tables\n#include 'items.scifi'"),
            vec![
                Token::Comment(" loot tables".to_string()),
                Token::Include,
                Token::String("items.scifi".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_character() {
        let err = Tokenizer::new().tokenize("award @gold").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 7);
    }

    #[test]
    fn test_percentage_vs_operator() {
        assert_eq!(
            tokens("90% for Coin"),
            vec![
                Token::Percentage(90.0),
                Token::Keyword(Keyword::For),
                Token::Identifier("Coin".to_string()),
            ]
        );
    }
}
