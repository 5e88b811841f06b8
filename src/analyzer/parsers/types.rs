//! Parsers for collectable, group, and distribution declarations.

use super::super::prelude::*;
use super::expression::parse_expression;
use super::{comma, delimiter, identifier, keyword, operator, semicolon};
use crate::ast::{
    CollectableDef, DistributionDef, DistributionEntry, DistributionEntryKind, Expression,
    GroupDef, Ident, PropertyDef, PropertyKind, RuleTier,
};
use crate::tokenizer::keyword::Keyword;
use crate::tokenizer::symbol::{Delimiter, Operator};
use crate::tokenizer::token::{Token, TokenSpan};

/// `collectable Name [in Group] [has amount] ( ; | { body } )`
pub fn parse_collectable() -> impl Parser<TokenSpan, CollectableDef> {
    with_context(
        map(
            tuple4(
                preceded(keyword(Keyword::Collectable), identifier()),
                optional(preceded(keyword(Keyword::In), identifier())),
                optional(tuple2(keyword(Keyword::Has), keyword(Keyword::Amount))),
                choice(vec![
                    Box::new(map(semicolon(), |_| Vec::new())),
                    Box::new(terminated(
                        delimited(
                            delimiter(Delimiter::LBrace),
                            many(parse_collectable_body_item()),
                            delimiter(Delimiter::RBrace),
                        ),
                        optional(semicolon()),
                    )),
                ]),
            ),
            |(name, group, inline_amount, body)| {
                let mut def = CollectableDef {
                    name,
                    group,
                    amount_bearing: inline_amount.is_some(),
                    properties: Vec::new(),
                    upgrades: Vec::new(),
                    redemptions: Vec::new(),
                };
                for item in body {
                    match item {
                        CollectableBodyItem::HasAmount => def.amount_bearing = true,
                        CollectableBodyItem::Property(p) => def.properties.push(p),
                        CollectableBodyItem::Upgrades(tiers) => def.upgrades = tiers,
                        CollectableBodyItem::Redemptions(tiers) => def.redemptions = tiers,
                    }
                }
                def
            },
        ),
        "collectable declaration",
    )
}

enum CollectableBodyItem {
    HasAmount,
    Property(PropertyDef),
    Upgrades(Vec<RuleTier>),
    Redemptions(Vec<RuleTier>),
}

fn parse_collectable_body_item() -> impl Parser<TokenSpan, CollectableBodyItem> {
    choice(vec![
        Box::new(map(
            tuple3(keyword(Keyword::Has), keyword(Keyword::Amount), semicolon()),
            |_| CollectableBodyItem::HasAmount,
        )),
        Box::new(map(parse_property(), CollectableBodyItem::Property)),
        Box::new(map(
            preceded(keyword(Keyword::Upgrades), parse_tier_table()),
            CollectableBodyItem::Upgrades,
        )),
        Box::new(map(
            preceded(keyword(Keyword::Redemptions), parse_tier_table()),
            CollectableBodyItem::Redemptions,
        )),
    ])
}

/// `property id kind [= default];`
pub fn parse_property() -> impl Parser<TokenSpan, PropertyDef> {
    with_context(
        map(
            tuple4(
                preceded(keyword(Keyword::Property), identifier()),
                parse_property_kind(),
                optional(preceded(operator(Operator::Equal), parse_expression())),
                semicolon(),
            ),
            |(id, kind, default, _)| PropertyDef { id, kind, default },
        ),
        "property declaration",
    )
}

fn parse_property_kind() -> impl Parser<TokenSpan, PropertyKind> {
    choice(vec![
        // `localized text` first so bare `localized` never matches alone
        Box::new(map(
            tuple2(keyword(Keyword::Localized), keyword(Keyword::Text)),
            |_| PropertyKind::LocalizedText,
        )),
        Box::new(satisfy("property kind", |span: &TokenSpan| {
            match span.token {
                Token::Keyword(Keyword::Switch) => Some(PropertyKind::Switch),
                Token::Keyword(Keyword::Text) => Some(PropertyKind::Text),
                Token::Keyword(Keyword::Integer) => Some(PropertyKind::Integer),
                Token::Keyword(Keyword::Decimal) => Some(PropertyKind::Decimal),
                Token::Keyword(Keyword::Percent) => Some(PropertyKind::Percent),
                Token::Keyword(Keyword::Random) => Some(PropertyKind::Random),
                Token::Keyword(Keyword::Datetime) => Some(PropertyKind::Datetime),
                Token::Keyword(Keyword::Collectable) => Some(PropertyKind::Collectable),
                Token::Keyword(Keyword::User) => Some(PropertyKind::User),
                Token::Keyword(Keyword::Group) => Some(PropertyKind::Group),
                _ => None,
            }
        })),
    ])
}

/// `[cost <expr> x <collectable> for amount range <lo> to <hi>, ...];`
fn parse_tier_table() -> impl Parser<TokenSpan, Vec<RuleTier>> {
    terminated(
        delimited(
            delimiter(Delimiter::LBracket),
            separated_list(parse_tier(), comma()),
            delimiter(Delimiter::RBracket),
        ),
        semicolon(),
    )
}

fn parse_tier() -> impl Parser<TokenSpan, RuleTier> {
    with_context(
        map(
            tuple4(
                preceded(keyword(Keyword::Cost), parse_expression()),
                preceded(keyword(Keyword::X), identifier()),
                preceded(
                    tuple3(
                        keyword(Keyword::For),
                        keyword(Keyword::Amount),
                        keyword(Keyword::Range),
                    ),
                    parse_expression(),
                ),
                preceded(keyword(Keyword::To), parse_expression()),
            ),
            |(cost, collectable, amount_lo, amount_hi)| RuleTier {
                cost,
                collectable,
                amount_lo,
                amount_hi,
            },
        ),
        "cost tier",
    )
}

/// `group Name [members] ( ; | { properties } )`
pub fn parse_group() -> impl Parser<TokenSpan, GroupDef> {
    with_context(
        map(
            tuple3(
                preceded(keyword(Keyword::Group), identifier()),
                delimited(
                    delimiter(Delimiter::LBracket),
                    separated_list(identifier(), comma()),
                    delimiter(Delimiter::RBracket),
                ),
                choice(vec![
                    Box::new(map(semicolon(), |_| Vec::new())),
                    Box::new(terminated(
                        delimited(
                            delimiter(Delimiter::LBrace),
                            many(parse_property()),
                            delimiter(Delimiter::RBrace),
                        ),
                        optional(semicolon()),
                    )),
                ]),
            ),
            |(name, members, properties)| GroupDef {
                name,
                members,
                properties,
            },
        ),
        "group declaration",
    )
}

/// ```text
/// distribution Name {
///     amount range <lo> to <hi>;
///     group range <lo> to <hi>;
///     weighted [entries];
/// }
/// ```
pub fn parse_distribution() -> impl Parser<TokenSpan, DistributionDef> {
    with_context(
        map(
            tuple2(
                preceded(keyword(Keyword::Distribution), identifier()),
                delimited(
                    delimiter(Delimiter::LBrace),
                    tuple3(
                        parse_declared_range(Keyword::Amount),
                        parse_declared_range(Keyword::Group),
                        parse_weighted_entries(),
                    ),
                    delimiter(Delimiter::RBrace),
                ),
            ),
            |(name, (amount_range, group_range, entries))| DistributionDef {
                name,
                amount_range,
                group_range,
                entries,
            },
        ),
        "distribution declaration",
    )
}

fn parse_declared_range(
    lead: Keyword,
) -> impl Parser<TokenSpan, (Expression, Expression)> {
    map(
        tuple4(
            tuple2(keyword(lead), keyword(Keyword::Range)),
            parse_expression(),
            preceded(keyword(Keyword::To), parse_expression()),
            semicolon(),
        ),
        |(_, lo, hi, _)| (lo, hi),
    )
}

fn parse_weighted_entries() -> impl Parser<TokenSpan, Vec<DistributionEntry>> {
    preceded(
        keyword(Keyword::Weighted),
        terminated(
            delimited(
                delimiter(Delimiter::LBracket),
                separated_list(parse_distribution_entry(), comma()),
                delimiter(Delimiter::RBracket),
            ),
            semicolon(),
        ),
    )
}

fn parse_distribution_entry() -> impl Parser<TokenSpan, DistributionEntry> {
    choice(vec![
        // `Target x max 2`
        Box::new(map(
            tuple3(
                terminated(identifier(), keyword(Keyword::X)),
                keyword(Keyword::Max),
                parse_expression(),
            ),
            |(target, _, count)| DistributionEntry {
                target,
                kind: DistributionEntryKind::Max(count),
            },
        )),
        // `Target x 2`
        Box::new(map(
            tuple2(terminated(identifier(), keyword(Keyword::X)), parse_expression()),
            |(target, count)| DistributionEntry {
                target,
                kind: DistributionEntryKind::Fixed(count),
            },
        )),
        // `90% for Target` / `Target for 90%`
        Box::new(parse_weighted_entry()),
    ])
}

fn parse_weighted_entry() -> impl Parser<TokenSpan, DistributionEntry> {
    move |input: &[TokenSpan], pos: usize| {
        let pair = tuple3(parse_expression(), keyword(Keyword::For), parse_expression());
        let (next, (first, _, second)) = pair.parse(input, pos)?;
        // the bare-identifier side names the target, the other is the weight
        let entry = match (&first, &second) {
            (Expression::Variable(_), Expression::Variable(_)) => None,
            (first_expr, Expression::Variable(name)) => Some((name.clone(), first_expr.clone())),
            (Expression::Variable(name), second_expr) => Some((name.clone(), second_expr.clone())),
            _ => None,
        };
        match entry {
            Some((name, weight)) => {
                let target_span = &input[pos];
                Ok((
                    next,
                    DistributionEntry {
                        target: Ident::new(name, target_span.line, target_span.column),
                        kind: DistributionEntryKind::Weight(weight),
                    },
                ))
            }
            None => Err(ParseError::Failure {
                message: "distribution entry needs a weight and a target".to_string(),
                position: pos,
                context: None,
            }),
        }
    }
}
