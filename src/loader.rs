//! # Program Loader
//!
//! Coordinates the full processing pipeline, acting as the bridge between
//! the stages:
//!
//! ```text
//! Source Text → Tokenizer → Preprocessor → Analyzer → Resolver
//! ```
//!
//! [`parse`] and [`resolve`] expose the individual stages for hosts that
//! manage files themselves; [`ProgramLoader`] drives the whole pipeline from
//! an entry file through a host-supplied [`SourceLoader`], expanding
//! `#include` directives along the way.

use thiserror::Error;

use crate::analyzer::{ParseError, parse_tokens};
use crate::ast::SourceFile;
use crate::preprocessor::{
    IncludeError, IncludeExpander, Preprocessor, SourceLoader, TokenPreprocessor,
};
use crate::resolver::{ResolutionError, ResolvedProgram, Resolver};
use crate::tokenizer::token::Tokenizer;

/// A failure anywhere in the load pipeline.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Include(#[from] IncludeError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("resolution failed with {} diagnostic(s)", .0.len())]
    Resolution(Vec<ResolutionError>),
}

/// Parses one source text into an AST without touching includes.
///
/// `#include` directives are kept as AST items; use [`ProgramLoader`] when
/// they should be expanded.
pub fn parse(source: &str) -> Result<SourceFile, ParseError> {
    let tokens = Tokenizer::new().tokenize(source).map_err(|e| ParseError {
        line: e.line,
        column: e.column,
        message: e.to_string(),
    })?;
    let tokens = TokenPreprocessor::new().process(tokens);
    parse_tokens(&tokens)
}

/// Resolves already-parsed files into a [`ResolvedProgram`].
pub fn resolve(files: Vec<SourceFile>) -> Result<ResolvedProgram, Vec<ResolutionError>> {
    Resolver::new().resolve(files)
}

/// Drives source text from an entry point to a [`ResolvedProgram`].
pub struct ProgramLoader<L: SourceLoader> {
    loader: L,
}

impl<L: SourceLoader> ProgramLoader<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }

    /// Loads, expands, parses, and resolves starting from a file path.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn load(&self, entry_path: &str) -> Result<ResolvedProgram, LoadError> {
        let expander = IncludeExpander::new(&self.loader);
        let tokens = expander.expand_path(entry_path)?;
        let mut file = parse_tokens(&tokens)?;
        file.path = Some(entry_path.to_string());
        resolve(vec![file]).map_err(LoadError::Resolution)
    }

    /// Same pipeline, starting from in-memory entry text.
    pub fn load_source(&self, source: &str) -> Result<ResolvedProgram, LoadError> {
        let expander = IncludeExpander::new(&self.loader);
        let tokens = expander.expand_source(source)?;
        let file = parse_tokens(&tokens)?;
        resolve(vec![file]).map_err(LoadError::Resolution)
    }
}
