//! Parsers for event definitions, statements, and option blocks.

use super::super::prelude::*;
use super::expression::{parse_comparison_operator, parse_expression};
use super::{comma, delimiter, identifier, keyword, operator, semicolon};
use crate::ast::{
    AuthorizeClause, AwardSource, EventDef, Expression, FindCardinality, FindFallback, FindQuery,
    Ident, OptionBranch, ParamConstraint, ParamDef, RemoteEventDef, SetSource, Statement, Trigger,
};
use crate::tokenizer::keyword::Keyword;
use crate::tokenizer::symbol::{Delimiter, Operator};
use crate::tokenizer::token::{Token, TokenSpan};

/// `remote event Name [params];`
pub fn parse_remote_event() -> impl Parser<TokenSpan, RemoteEventDef> {
    with_context(
        map(
            tuple3(
                preceded(
                    tuple2(keyword(Keyword::Remote), keyword(Keyword::Event)),
                    identifier(),
                ),
                parse_param_list(),
                semicolon(),
            ),
            |(name, params, _)| RemoteEventDef { name, params },
        ),
        "remote event declaration",
    )
}

/// ```text
/// event Name {
///     params [...];
///     authorize <target>;
///     <statements>
/// }
/// ```
pub fn parse_event() -> impl Parser<TokenSpan, EventDef> {
    with_context(
        map(
            tuple2(
                preceded(keyword(Keyword::Event), identifier()),
                delimited(
                    delimiter(Delimiter::LBrace),
                    tuple3(
                        optional(terminated(
                            preceded(keyword(Keyword::Params), parse_param_list()),
                            semicolon(),
                        )),
                        optional(parse_authorize()),
                        many(parse_statement()),
                    ),
                    delimiter(Delimiter::RBrace),
                ),
            ),
            |(name, (params, authorize, body))| EventDef {
                name,
                params: params.unwrap_or_default(),
                authorize,
                body,
            },
        ),
        "event definition",
    )
}

fn parse_param_list() -> impl Parser<TokenSpan, Vec<ParamDef>> {
    delimited(
        delimiter(Delimiter::LBracket),
        separated_list(parse_param(), comma()),
        delimiter(Delimiter::RBracket),
    )
}

/// `name <constraint> [<cmp> <expr>]`, e.g. `chest Chest` or
/// `level integer >= 3` where the parameter is the implicit left operand.
fn parse_param() -> impl Parser<TokenSpan, ParamDef> {
    map(
        tuple3(
            identifier(),
            parse_param_constraint(),
            optional(tuple2(parse_comparison_operator(), parse_expression())),
        ),
        |(name, constraint, guard)| ParamDef {
            guard: guard.map(|(op, right)| {
                Expression::binary(op, Expression::Variable(name.name.clone()), right)
            }),
            name,
            constraint,
        },
    )
}

fn parse_param_constraint() -> impl Parser<TokenSpan, ParamConstraint> {
    choice(vec![
        Box::new(satisfy("parameter constraint", |span: &TokenSpan| {
            match span.token {
                Token::Keyword(Keyword::User) => Some(ParamConstraint::User),
                Token::Keyword(Keyword::Integer) => Some(ParamConstraint::Integer),
                Token::Keyword(Keyword::Decimal) => Some(ParamConstraint::Decimal),
                Token::Keyword(Keyword::Text) => Some(ParamConstraint::Text),
                _ => None,
            }
        })),
        Box::new(map(identifier(), ParamConstraint::Entity)),
    ])
}

/// `authorize gameserver;` / `authorize user;` / `authorize chest.owner;`
fn parse_authorize() -> impl Parser<TokenSpan, AuthorizeClause> {
    with_context(
        map(
            delimited(
                keyword(Keyword::Authorize),
                parse_authorize_path(),
                semicolon(),
            ),
            |path| AuthorizeClause { path },
        ),
        "authorize clause",
    )
}

fn parse_authorize_path() -> impl Parser<TokenSpan, Vec<Ident>> {
    choice(vec![
        Box::new(map(parse_role_word(), |role| vec![role])),
        Box::new(map(
            tuple2(
                identifier(),
                many(preceded(delimiter(Delimiter::Dot), identifier())),
            ),
            |(head, tail)| {
                let mut path = vec![head];
                path.extend(tail);
                path
            },
        )),
    ])
}

fn parse_role_word() -> impl Parser<TokenSpan, Ident> {
    satisfy("authorize target", |span: &TokenSpan| {
        let name = match span.token {
            Token::Keyword(Keyword::Gameserver) => "gameserver",
            Token::Keyword(Keyword::Admin) => "admin",
            Token::Keyword(Keyword::User) => "user",
            _ => return None,
        };
        Some(Ident::new(name, span.line, span.column))
    })
}

/// One statement of an event body. Also used inside option-branch bodies.
pub fn parse_statement() -> impl Parser<TokenSpan, Statement> {
    choice(vec![
        Box::new(parse_assert()),
        Box::new(parse_set()),
        Box::new(parse_award()),
        Box::new(parse_notify()),
        Box::new(parse_option_block()),
    ])
}

fn parse_assert() -> impl Parser<TokenSpan, Statement> {
    map(
        delimited(keyword(Keyword::Assert), parse_expression(), semicolon()),
        Statement::Assert,
    )
}

fn parse_set() -> impl Parser<TokenSpan, Statement> {
    with_context(
        map(
            tuple3(
                preceded(keyword(Keyword::Set), identifier()),
                preceded(
                    operator(Operator::Equal),
                    choice(vec![
                        Box::new(map(parse_find(), SetSource::Find)),
                        Box::new(map(parse_expression(), SetSource::Expr)),
                    ]),
                ),
                semicolon(),
            ),
            |(var, source, _)| Statement::Set { var, source },
        ),
        "set statement",
    )
}

/// `find one|any <subject> [with <expr>] [or continue]`
fn parse_find() -> impl Parser<TokenSpan, FindQuery> {
    map(
        tuple4(
            preceded(keyword(Keyword::Find), parse_cardinality()),
            parse_find_subject(),
            optional(preceded(keyword(Keyword::With), parse_expression())),
            optional(tuple2(keyword(Keyword::Or), keyword(Keyword::Continue))),
        ),
        |(cardinality, subject, predicate, fallback)| FindQuery {
            cardinality,
            subject,
            predicate,
            on_violation: if fallback.is_some() {
                FindFallback::Continue
            } else {
                FindFallback::Abort
            },
        },
    )
}

fn parse_cardinality() -> impl Parser<TokenSpan, FindCardinality> {
    satisfy("find cardinality", |span: &TokenSpan| match span.token {
        Token::Keyword(Keyword::One) => Some(FindCardinality::ExactlyOne),
        Token::Keyword(Keyword::Any) => Some(FindCardinality::ZeroOrOne),
        _ => None,
    })
}

fn parse_find_subject() -> impl Parser<TokenSpan, Ident> {
    choice(vec![
        Box::new(satisfy("find subject", |span: &TokenSpan| {
            let name = match span.token {
                Token::Keyword(Keyword::Gameserver) => "gameserver",
                Token::Keyword(Keyword::User) => "user",
                _ => return None,
            };
            Some(Ident::new(name, span.line, span.column))
        })),
        Box::new(identifier()),
    ])
}

/// `award <expr> x <collectable> to <target>;` or
/// `award <distribution> to <target>;`
fn parse_award() -> impl Parser<TokenSpan, Statement> {
    with_context(
        map(
            tuple3(
                preceded(
                    keyword(Keyword::Award),
                    choice(vec![
                        Box::new(map(
                            tuple2(
                                terminated(parse_expression(), keyword(Keyword::X)),
                                identifier(),
                            ),
                            |(amount, collectable)| AwardSource::Amount {
                                amount,
                                collectable,
                            },
                        )),
                        Box::new(map(identifier(), AwardSource::Distribution)),
                    ]),
                ),
                preceded(keyword(Keyword::To), parse_expression()),
                semicolon(),
            ),
            |(source, target, _)| Statement::Award { source, target },
        ),
        "award statement",
    )
}

/// `notify <target> of <event> [with [args]];`
fn parse_notify() -> impl Parser<TokenSpan, Statement> {
    with_context(
        map(
            tuple4(
                preceded(keyword(Keyword::Notify), parse_expression()),
                preceded(keyword(Keyword::Of), identifier()),
                optional(preceded(
                    keyword(Keyword::With),
                    delimited(
                        delimiter(Delimiter::LBracket),
                        separated_list(parse_expression(), comma()),
                        delimiter(Delimiter::RBracket),
                    ),
                )),
                semicolon(),
            ),
            |(target, event, args, _)| Statement::Notify {
                target,
                event,
                args: args.unwrap_or_default(),
            },
        ),
        "notify statement",
    )
}

/// ```text
/// option:
///     timer 4 hours
/// or
///     cost 5 x Gem
///     award 1 x Key to opener;
/// end;
/// ```
///
/// Branches are separated by `or`; triggers within a branch are chained with
/// `and` and run in order. Statements after a branch's trigger chain run only
/// if that branch wins the race.
fn parse_option_block() -> impl Parser<TokenSpan, Statement> {
    with_context(
        map(
            delimited(
                tuple2(keyword(Keyword::Option), delimiter(Delimiter::Colon)),
                separated_list(parse_option_branch(), keyword(Keyword::Or)),
                tuple2(keyword(Keyword::End), semicolon()),
            ),
            |branches| Statement::Option { branches },
        ),
        "option block",
    )
}

fn parse_option_branch() -> impl Parser<TokenSpan, OptionBranch> {
    map(
        tuple2(
            map(
                tuple2(
                    parse_trigger(),
                    many(preceded(keyword(Keyword::And), parse_trigger())),
                ),
                |(first, rest)| {
                    let mut triggers = vec![first];
                    triggers.extend(rest);
                    triggers
                },
            ),
            many(lazy(parse_statement)),
        ),
        |(triggers, body)| OptionBranch { triggers, body },
    )
}

fn parse_trigger() -> impl Parser<TokenSpan, Trigger> {
    choice(vec![
        Box::new(map(
            preceded(keyword(Keyword::Timer), parse_expression()),
            Trigger::Timer,
        )),
        Box::new(map(
            tuple2(
                preceded(keyword(Keyword::Cost), parse_expression()),
                preceded(keyword(Keyword::X), identifier()),
            ),
            |(amount, collectable)| Trigger::Cost {
                amount,
                collectable,
            },
        )),
        Box::new(map(
            preceded(keyword(Keyword::Assert), parse_expression()),
            Trigger::Assert,
        )),
    ])
}
