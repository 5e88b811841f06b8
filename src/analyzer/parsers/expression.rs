//! The expression grammar.
//!
//! Precedence from loosest to tightest: `or`, `and`, comparisons, `+`/`-`,
//! `*`/`/`, `^` (right-associative), unary minus/not, primaries. A duration
//! unit keyword may follow a primary (`4 hours`), and `random`, `range(..)`,
//! and list literals are primaries.

use super::super::prelude::*;
use super::{comma, delimiter, identifier, keyword, operator, path_segment};
use crate::ast::{
    BinaryOperator, DurationUnit, Expression, ListItem, Literal, UnaryOperator,
};
use crate::tokenizer::keyword::Keyword;
use crate::tokenizer::symbol::{Delimiter, Operator};
use crate::tokenizer::token::{Token, TokenSpan};

pub fn parse_expression() -> impl Parser<TokenSpan, Expression> {
    with_context(lazy(parse_logical_or), "expression")
}

fn fold_binary(first: Expression, rest: Vec<(BinaryOperator, Expression)>) -> Expression {
    rest.into_iter()
        .fold(first, |left, (op, right)| Expression::binary(op, left, right))
}

fn parse_logical_or() -> impl Parser<TokenSpan, Expression> {
    map(
        tuple2(
            parse_logical_and(),
            many(tuple2(
                map(keyword(Keyword::Or), |_| BinaryOperator::Or),
                parse_logical_and(),
            )),
        ),
        |(first, rest)| fold_binary(first, rest),
    )
}

fn parse_logical_and() -> impl Parser<TokenSpan, Expression> {
    map(
        tuple2(
            parse_comparison(),
            many(tuple2(
                map(keyword(Keyword::And), |_| BinaryOperator::And),
                parse_comparison(),
            )),
        ),
        |(first, rest)| fold_binary(first, rest),
    )
}

fn parse_comparison() -> impl Parser<TokenSpan, Expression> {
    map(
        tuple2(
            parse_additive(),
            many(tuple2(parse_comparison_operator(), parse_additive())),
        ),
        |(first, rest)| fold_binary(first, rest),
    )
}

pub fn parse_comparison_operator() -> impl Parser<TokenSpan, BinaryOperator> {
    satisfy("comparison operator", |span: &TokenSpan| {
        match span.token {
            Token::Operator(Operator::Equal) => Some(BinaryOperator::Equal),
            Token::Operator(Operator::NotEqual) => Some(BinaryOperator::NotEqual),
            Token::Operator(Operator::Greater) => Some(BinaryOperator::GreaterThan),
            Token::Operator(Operator::GreaterEqual) => Some(BinaryOperator::GreaterThanEqual),
            Token::Operator(Operator::Less) => Some(BinaryOperator::LessThan),
            Token::Operator(Operator::LessEqual) => Some(BinaryOperator::LessThanEqual),
            _ => None,
        }
    })
}

fn parse_additive() -> impl Parser<TokenSpan, Expression> {
    map(
        tuple2(
            parse_multiplicative(),
            many(tuple2(
                satisfy("additive operator", |span: &TokenSpan| match span.token {
                    Token::Operator(Operator::Plus) => Some(BinaryOperator::Add),
                    Token::Operator(Operator::Minus) => Some(BinaryOperator::Subtract),
                    _ => None,
                }),
                parse_multiplicative(),
            )),
        ),
        |(first, rest)| fold_binary(first, rest),
    )
}

fn parse_multiplicative() -> impl Parser<TokenSpan, Expression> {
    map(
        tuple2(
            parse_power(),
            many(tuple2(
                satisfy("multiplicative operator", |span: &TokenSpan| {
                    match span.token {
                        Token::Operator(Operator::Multiply) => Some(BinaryOperator::Multiply),
                        Token::Operator(Operator::Divide) => Some(BinaryOperator::Divide),
                        _ => None,
                    }
                }),
                parse_power(),
            )),
        ),
        |(first, rest)| fold_binary(first, rest),
    )
}

// right-associative: 2^3^2 is 2^(3^2)
fn parse_power() -> impl Parser<TokenSpan, Expression> {
    map(
        tuple2(
            parse_unary(),
            optional(preceded(
                operator(Operator::Caret),
                // Box the recursive reference to break the opaque-type cycle
                // (same erasure `parse_unary`'s `choice` relies on).
                |input: &[TokenSpan], pos: usize| {
                    (Box::new(parse_power()) as Box<dyn Parser<TokenSpan, Expression>>)
                        .parse(input, pos)
                },
            )),
        ),
        |(base, exponent)| match exponent {
            Some(exponent) => Expression::binary(BinaryOperator::Power, base, exponent),
            None => base,
        },
    )
}

fn parse_unary() -> impl Parser<TokenSpan, Expression> {
    choice(vec![
        Box::new(map(
            preceded(operator(Operator::Minus), lazy(parse_unary)),
            |expr| Expression::UnaryOp {
                op: UnaryOperator::Minus,
                expr: Box::new(expr),
            },
        )),
        Box::new(map(
            preceded(operator(Operator::Exclamation), lazy(parse_unary)),
            |expr| Expression::UnaryOp {
                op: UnaryOperator::Not,
                expr: Box::new(expr),
            },
        )),
        Box::new(parse_postfix()),
    ])
}

/// A primary optionally followed by a duration unit (`4 hours`).
fn parse_postfix() -> impl Parser<TokenSpan, Expression> {
    map(
        tuple2(parse_primary(), optional(parse_duration_unit())),
        |(expr, unit)| match unit {
            Some(unit) => Expression::Duration {
                value: Box::new(expr),
                unit,
            },
            None => expr,
        },
    )
}

fn parse_duration_unit() -> impl Parser<TokenSpan, DurationUnit> {
    satisfy("duration unit", |span: &TokenSpan| match span.token {
        Token::Keyword(Keyword::Seconds) => Some(DurationUnit::Seconds),
        Token::Keyword(Keyword::Minutes) => Some(DurationUnit::Minutes),
        Token::Keyword(Keyword::Hours) => Some(DurationUnit::Hours),
        Token::Keyword(Keyword::Days) => Some(DurationUnit::Days),
        Token::Keyword(Keyword::Weeks) => Some(DurationUnit::Weeks),
        _ => None,
    })
}

fn parse_primary() -> impl Parser<TokenSpan, Expression> {
    choice(vec![
        Box::new(parse_literal()),
        Box::new(parse_range()),
        Box::new(parse_random()),
        Box::new(parse_list()),
        Box::new(parse_path()),
        Box::new(parse_amount_variable()),
        Box::new(delimited(
            delimiter(Delimiter::LParen),
            lazy(parse_expression),
            delimiter(Delimiter::RParen),
        )),
    ])
}

fn parse_literal() -> impl Parser<TokenSpan, Expression> {
    satisfy("literal", |span: &TokenSpan| match &span.token {
        Token::Integer(i) => Some(Expression::Literal(Literal::Integer(*i))),
        Token::Decimal(d) => Some(Expression::Literal(Literal::Decimal(*d))),
        Token::Percentage(p) => Some(Expression::Literal(Literal::Percent(*p))),
        Token::String(s) => Some(Expression::Literal(Literal::String(s.clone()))),
        Token::Keyword(Keyword::On) => Some(Expression::Literal(Literal::Switch(true))),
        Token::Keyword(Keyword::Off) => Some(Expression::Literal(Literal::Switch(false))),
        _ => None,
    })
}

/// `range(min, max)`: an inclusive bounded pair.
fn parse_range() -> impl Parser<TokenSpan, Expression> {
    map(
        preceded(
            keyword(Keyword::Range),
            delimited(
                delimiter(Delimiter::LParen),
                tuple3(lazy(parse_expression), comma(), lazy(parse_expression)),
                delimiter(Delimiter::RParen),
            ),
        ),
        |(min, _, max)| Expression::Range {
            min: Box::new(min),
            max: Box::new(max),
        },
    )
}

// `random` binds to the following primary, so `random range(1, 6) + 1`
// samples then adds
fn parse_random() -> impl Parser<TokenSpan, Expression> {
    map(
        preceded(keyword(Keyword::Random), lazy(parse_primary)),
        |expr| Expression::Random(Box::new(expr)),
    )
}

/// `amount` as a free variable in property defaults and tier costs.
fn parse_amount_variable() -> impl Parser<TokenSpan, Expression> {
    map(keyword(Keyword::Amount), |_| {
        Expression::Variable("amount".to_string())
    })
}

/// An identifier or a dotted path rooted at one (`chest.owner`).
fn parse_path() -> impl Parser<TokenSpan, Expression> {
    map(
        tuple2(
            identifier(),
            many(preceded(delimiter(Delimiter::Dot), path_segment())),
        ),
        |(head, tail)| {
            if tail.is_empty() {
                Expression::Variable(head.name)
            } else {
                let mut segments = vec![head.name];
                segments.extend(tail);
                Expression::Path(segments)
            }
        },
    )
}

/// `[...]` with bare items or `for`-qualified pairs; both pair orders are
/// accepted and normalized to (value, key).
fn parse_list() -> impl Parser<TokenSpan, Expression> {
    map(
        delimited(
            delimiter(Delimiter::LBracket),
            separated_list(parse_list_item(), comma()),
            delimiter(Delimiter::RBracket),
        ),
        Expression::List,
    )
}

fn parse_list_item() -> impl Parser<TokenSpan, ListItem> {
    map(
        tuple2(
            lazy(parse_expression),
            optional(preceded(keyword(Keyword::For), lazy(parse_expression))),
        ),
        |(first, second)| match second {
            // the percent side of a pair is the key no matter which side
            // it was written on
            Some(second) => {
                if matches!(first, Expression::Literal(Literal::Percent(_)))
                    && !matches!(second, Expression::Literal(Literal::Percent(_)))
                {
                    ListItem {
                        value: second,
                        key: Some(first),
                    }
                } else {
                    ListItem {
                        value: first,
                        key: Some(second),
                    }
                }
            }
            None => ListItem {
                value: first,
                key: None,
            },
        },
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::tokenizer::token::Tokenizer;

    fn parse(text: &str) -> Expression {
        let spans = Tokenizer::new().tokenize(text).unwrap();
        let (consumed, expr) = parse_expression().parse(&spans, 0).unwrap();
        assert_eq!(consumed, spans.len(), "did not consume all of {:?}", text);
        expr
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("1 + 2 * 3"),
            Expression::binary(
                BinaryOperator::Add,
                Expression::integer(1),
                Expression::binary(
                    BinaryOperator::Multiply,
                    Expression::integer(2),
                    Expression::integer(3)
                ),
            )
        );
    }

    #[test]
    fn test_power_right_associative() {
        assert_eq!(
            parse("2 ^ 3 ^ 2"),
            Expression::binary(
                BinaryOperator::Power,
                Expression::integer(2),
                Expression::binary(
                    BinaryOperator::Power,
                    Expression::integer(3),
                    Expression::integer(2)
                ),
            )
        );
    }

    #[test]
    fn test_comparison_below_logic() {
        assert_eq!(
            parse("a = 1 and b > 2"),
            Expression::binary(
                BinaryOperator::And,
                Expression::binary(
                    BinaryOperator::Equal,
                    Expression::Variable("a".to_string()),
                    Expression::integer(1)
                ),
                Expression::binary(
                    BinaryOperator::GreaterThan,
                    Expression::Variable("b".to_string()),
                    Expression::integer(2)
                ),
            )
        );
    }

    #[test]
    fn test_path_access() {
        assert_eq!(
            parse("chest.owner"),
            Expression::Path(vec!["chest".to_string(), "owner".to_string()])
        );
        assert_eq!(
            parse("loot.amount"),
            Expression::Path(vec!["loot".to_string(), "amount".to_string()])
        );
    }

    #[test]
    fn test_duration() {
        assert_eq!(
            parse("4 hours"),
            Expression::Duration {
                value: Box::new(Expression::integer(4)),
                unit: DurationUnit::Hours,
            }
        );
    }

    #[test]
    fn test_range_call() {
        assert_eq!(
            parse("range(1, 100)"),
            Expression::Range {
                min: Box::new(Expression::integer(1)),
                max: Box::new(Expression::integer(100)),
            }
        );
    }

    #[test]
    fn test_random() {
        assert_eq!(
            parse("random range(1, 6)"),
            Expression::Random(Box::new(Expression::Range {
                min: Box::new(Expression::integer(1)),
                max: Box::new(Expression::integer(6)),
            }))
        );
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(
            parse("-5"),
            Expression::UnaryOp {
                op: UnaryOperator::Minus,
                expr: Box::new(Expression::integer(5)),
            }
        );
    }

    #[test]
    fn test_list_pair_orders_agree() {
        let weight_first = parse("[90% for Coin]");
        let target_first = parse("[Coin for 90%]");
        assert_eq!(weight_first, target_first);
        match weight_first {
            Expression::List(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].value, Expression::Variable("Coin".to_string()));
                assert_eq!(
                    items[0].key,
                    Some(Expression::Literal(Literal::Percent(90.0)))
                );
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_percent_literal_keeps_tag() {
        assert_eq!(parse("90%"), Expression::Literal(Literal::Percent(90.0)));
    }
}
