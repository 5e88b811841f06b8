//! # Resolver Component
//!
//! The resolver turns parsed source files into a [`ResolvedProgram`]: one
//! merged, validated, immutable namespace of collectable types, groups,
//! distributions, and event definitions.
//!
//! ## Guarantees
//!
//! * Identifiers are unique across the whole namespace (case-sensitive).
//! * Group membership forms a DAG; cycles never reach the runtime.
//! * Property inheritance is flattened onto each type.
//! * Distribution ranges, weights, and caps are constant-folded and sane.
//! * Upgrade/redemption tables are ordered with non-decreasing costs.
//! * Every identifier an expression references resolves in scope.
//!
//! Resolution does not partially succeed: any fatal diagnostic voids the
//! whole load and the complete list is returned.

pub mod program;
pub mod resolve;

use thiserror::Error;

use crate::ast::Ident;

pub use program::{
    Authorize, CollectableGroup, CollectableType, Constraint, CostTier, Distribution,
    DistributionEntry, EntryTarget, EventDefinition, EventParam, GroupMember, Property,
    RemoteEvent, ResolvedProgram,
};
pub use resolve::Resolver;

/// A fatal load-time diagnostic.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolutionError {
    #[error("duplicate definition of {kind} '{name}' at line {line}, column {column}")]
    DuplicateDefinition {
        name: String,
        kind: &'static str,
        line: u32,
        column: usize,
    },
    #[error("collectable group cycle through '{name}'")]
    CyclicGroup { name: String },
    #[error("undefined reference '{name}' in {context} at line {line}, column {column}")]
    UndefinedReference {
        name: String,
        context: String,
        line: u32,
        column: usize,
    },
    #[error("distribution '{name}': {message}")]
    DistributionConfig { name: String, message: String },
    #[error("cost table of '{name}': {message}")]
    CostTable { name: String, message: String },
}

impl ResolutionError {
    pub(crate) fn duplicate(name: &str, kind: &'static str, at: &Ident) -> Self {
        ResolutionError::DuplicateDefinition {
            name: name.to_string(),
            kind,
            line: at.line,
            column: at.column,
        }
    }

    pub(crate) fn undefined(name: &str, context: String, at: &Ident) -> Self {
        ResolutionError::UndefinedReference {
            name: name.to_string(),
            context,
            line: at.line,
            column: at.column,
        }
    }
}
