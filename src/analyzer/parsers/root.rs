//! Top-level item parsing.

use super::super::prelude::*;
use super::events::{parse_event, parse_remote_event};
use super::string_literal;
use super::types::{parse_collectable, parse_distribution, parse_group};
use crate::ast::{IncludeDecl, Item, SourceFile};
use crate::tokenizer::token::{Token, TokenSpan};

pub fn parse_source_file() -> impl Parser<TokenSpan, SourceFile> {
    map(many(parse_item()), SourceFile::new)
}

pub fn parse_item() -> impl Parser<TokenSpan, Item> {
    choice(vec![
        Box::new(parse_include()),
        Box::new(map(parse_collectable(), Item::Collectable)),
        Box::new(map(parse_group(), Item::Group)),
        Box::new(map(parse_distribution(), Item::Distribution)),
        Box::new(map(parse_remote_event(), Item::RemoteEvent)),
        Box::new(map(parse_event(), Item::Event)),
    ])
}

/// `#include 'path'`: survives to the AST only when a single file is parsed
/// without the include-expanding preprocessor.
fn parse_include() -> impl Parser<TokenSpan, Item> {
    move |input: &[TokenSpan], pos: usize| {
        let (next, directive) = include_token().parse(input, pos)?;
        let (next, path) = string_literal().parse(input, next)?;
        Ok((
            next,
            Item::Include(IncludeDecl {
                path,
                line: directive.line,
            }),
        ))
    }
}

fn include_token() -> impl Parser<TokenSpan, TokenSpan> {
    satisfy("#include", |span: &TokenSpan| {
        if span.token == Token::Include {
            Some(span.clone())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::tokenizer::token::Tokenizer;

    #[test]
    fn test_mixed_items() {
        let spans = Tokenizer::new()
            .tokenize(
                "#include 'items.scifi'\n\
                 collectable Coin has amount;\n\
                 group Currency [Coin];\n\
                 event Noop { }",
            )
            .unwrap();
        let stream: Vec<_> = spans
            .into_iter()
            .filter(|s| !s.token.is_comment())
            .collect();
        let (consumed, file) = parse_source_file().parse(&stream, 0).unwrap();
        assert_eq!(consumed, stream.len());
        assert_eq!(file.items.len(), 4);
        assert!(matches!(file.items[0], Item::Include(_)));
        assert!(matches!(file.items[1], Item::Collectable(_)));
        assert!(matches!(file.items[2], Item::Group(_)));
        assert!(matches!(file.items[3], Item::Event(_)));
    }
}
