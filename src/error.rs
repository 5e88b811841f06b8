use thiserror::Error;

use crate::analyzer::ParseError;
use crate::eval::EvalError;
use crate::loader::LoadError;
use crate::preprocessor::IncludeError;
use crate::resolver::ResolutionError;
use crate::runtime::InvocationError;
use crate::store::StoreError;
use crate::tokenizer::token::TokenizerError;

/// Unified error type for hosts that drive the whole pipeline.
#[derive(Error, Debug)]
pub enum Error {
    #[error("tokenizer error: {0}")]
    Tokenize(#[from] TokenizerError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("include error: {0}")]
    Include(#[from] IncludeError),
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    #[error("resolution failed with {} diagnostic(s)", .0.len())]
    Resolution(Vec<ResolutionError>),
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
    #[error("invocation error: {0}")]
    Invocation(#[from] InvocationError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<Vec<ResolutionError>> for Error {
    fn from(diagnostics: Vec<ResolutionError>) -> Self {
        Error::Resolution(diagnostics)
    }
}

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}

pub type InternalResult<T> = Result<T, Error>;
