//! # Preprocessor
//!
//! The preprocessor sits between the tokenizer and the parser. It normalizes
//! the token stream in two ways:
//!
//! * **Comment Removal**: comment tokens are filtered out so the grammar
//!   never has to skip them.
//! * **Include Expansion**: `#include 'path'` directives are replaced by the
//!   token stream of the referenced file, recursively, producing one merged
//!   stream per program load. Files are loaded through a host-supplied
//!   [`SourceLoader`], each path at most once; include cycles are an error.
//!
//! ```text
//! Source Text → Tokenizer → Preprocessor → Parser → Resolver → Runtime
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::tokenizer::token::{Token, TokenSpan, Tokenizer, TokenizerError};

/// A trait for preprocessing different types of input.
pub trait Preprocessor<T, U = T> {
    /// Process the input of type T and return the processed result.
    fn process(&self, input: T) -> U;
}

/// Strips comment tokens from the stream.
#[derive(Debug, Default)]
pub struct TokenPreprocessor {}

impl TokenPreprocessor {
    pub fn new() -> Self {
        Self {}
    }
}

impl Preprocessor<Vec<TokenSpan>> for TokenPreprocessor {
    fn process(&self, input: Vec<TokenSpan>) -> Vec<TokenSpan> {
        input
            .into_iter()
            .filter(|span| !span.token.is_comment())
            .collect()
    }
}

/// Host-supplied capability to read the text of an included file.
///
/// Path interpretation (working directory, extension defaulting) is entirely
/// the host's concern; the expander passes the path string through verbatim.
pub trait SourceLoader {
    fn read(&self, path: &str) -> std::io::Result<String>;
}

#[derive(Debug, Error)]
pub enum IncludeError {
    #[error("failed to read include '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("in include '{path}': {source}")]
    Lex {
        path: String,
        #[source]
        source: TokenizerError,
    },
    #[error("#include at line {line} is not followed by a quoted path")]
    MissingPath { line: u32 },
    #[error("include cycle through '{path}'")]
    Cycle { path: String },
}

/// Expands `#include` directives into one merged token stream.
pub struct IncludeExpander<'a, L: SourceLoader> {
    loader: &'a L,
    tokenizer: Tokenizer,
}

impl<'a, L: SourceLoader> IncludeExpander<'a, L> {
    pub fn new(loader: &'a L) -> Self {
        Self {
            loader,
            tokenizer: Tokenizer::new(),
        }
    }

    /// Expands the file at `path` into a comment-free token stream.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn expand_path(&self, path: &str) -> Result<Vec<TokenSpan>, IncludeError> {
        let mut output = Vec::new();
        let mut active = Vec::new();
        let mut loaded = HashSet::new();
        self.expand_file(path, &mut active, &mut loaded, &mut output)?;
        Ok(output)
    }

    /// Expands already-tokenized entry text, used when the host hands over
    /// source text rather than a path.
    pub fn expand_source(&self, source: &str) -> Result<Vec<TokenSpan>, IncludeError> {
        let tokens = self.tokenizer.tokenize(source).map_err(|e| IncludeError::Lex {
            path: "<entry>".to_string(),
            source: e,
        })?;
        let tokens = TokenPreprocessor::new().process(tokens);
        let mut output = Vec::new();
        let mut active = Vec::new();
        let mut loaded = HashSet::new();
        self.expand_tokens(tokens, &mut active, &mut loaded, &mut output)?;
        Ok(output)
    }

    fn expand_file(
        &self,
        path: &str,
        active: &mut Vec<String>,
        loaded: &mut HashSet<String>,
        output: &mut Vec<TokenSpan>,
    ) -> Result<(), IncludeError> {
        if active.iter().any(|p| p == path) {
            return Err(IncludeError::Cycle {
                path: path.to_string(),
            });
        }
        if !loaded.insert(path.to_string()) {
            tracing::debug!(path, "include already loaded, skipping");
            return Ok(());
        }
        let text = self.loader.read(path).map_err(|e| IncludeError::Io {
            path: path.to_string(),
            source: e,
        })?;
        let tokens = self.tokenizer.tokenize(&text).map_err(|e| IncludeError::Lex {
            path: path.to_string(),
            source: e,
        })?;
        let tokens = TokenPreprocessor::new().process(tokens);

        active.push(path.to_string());
        let result = self.expand_tokens(tokens, active, loaded, output);
        active.pop();
        result
    }

    fn expand_tokens(
        &self,
        tokens: Vec<TokenSpan>,
        active: &mut Vec<String>,
        loaded: &mut HashSet<String>,
        output: &mut Vec<TokenSpan>,
    ) -> Result<(), IncludeError> {
        let mut iter = tokens.into_iter().peekable();
        while let Some(span) = iter.next() {
            if span.token != Token::Include {
                output.push(span);
                continue;
            }
            match iter.peek() {
                Some(TokenSpan {
                    token: Token::String(_),
                    ..
                }) => {
                    let path_span = iter.next().expect("peeked");
                    let path = match path_span.token {
                        Token::String(path) => path,
                        _ => unreachable!(),
                    };
                    self.expand_file(&path, active, loaded, output)?;
                }
                _ => return Err(IncludeError::MissingPath { line: span.line }),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::tokenizer::keyword::Keyword;

    struct MapLoader(HashMap<&'static str, &'static str>);

    impl SourceLoader for MapLoader {
        fn read(&self, path: &str) -> io::Result<String> {
            self.0
                .get(path)
                .map(|s| s.to_string())
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
        }
    }

    fn names(tokens: &[TokenSpan]) -> Vec<String> {
        tokens
            .iter()
            .filter_map(|span| match &span.token {
                Token::Identifier(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_comment_stripping() {
        let tokens = Tokenizer::new()
            .tokenize("# header\ncollectable Coin; # trailing")
            .unwrap();
        let stream = TokenPreprocessor::new().process(tokens);
        assert_eq!(stream[0].token, Token::Keyword(Keyword::Collectable));
        assert!(stream.iter().all(|s| !s.token.is_comment()));
    }

    #[test]
    fn test_include_expansion() {
        let loader = MapLoader(HashMap::from([(
            "items.scifi",
            "collectable Coin has amount;",
        )]));
        let expander = IncludeExpander::new(&loader);
        let stream = expander
            .expand_source("#include 'items.scifi'\ncollectable Chest;")
            .unwrap();
        assert_eq!(names(&stream), vec!["Coin", "Chest"]);
    }

    #[test]
    fn test_duplicate_include_loads_once() {
        let loader = MapLoader(HashMap::from([("a.scifi", "collectable Coin;")]));
        let expander = IncludeExpander::new(&loader);
        let stream = expander
            .expand_source("#include 'a.scifi'\n#include 'a.scifi'")
            .unwrap();
        assert_eq!(names(&stream), vec!["Coin"]);
    }

    #[test]
    fn test_include_cycle() {
        let loader = MapLoader(HashMap::from([
            ("a.scifi", "#include 'b.scifi'"),
            ("b.scifi", "#include 'a.scifi'"),
        ]));
        let expander = IncludeExpander::new(&loader);
        let err = expander.expand_source("#include 'a.scifi'").unwrap_err();
        assert!(matches!(err, IncludeError::Cycle { .. }));
    }

    #[test]
    fn test_missing_include_path() {
        let loader = MapLoader(HashMap::new());
        let expander = IncludeExpander::new(&loader);
        let err = expander.expand_source("#include collectable").unwrap_err();
        assert!(matches!(err, IncludeError::MissingPath { line: 1 }));
    }

    #[test]
    fn test_unknown_include_is_io_error() {
        let loader = MapLoader(HashMap::new());
        let expander = IncludeExpander::new(&loader);
        let err = expander.expand_source("#include 'nope.scifi'").unwrap_err();
        assert!(matches!(err, IncludeError::Io { .. }));
    }
}
