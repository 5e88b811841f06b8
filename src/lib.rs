//! # SciFiWeb Core
//!
//! Compiler front end and runtime engine for the SciFiWeb game-economy
//! language: typed collectable resources, randomized reward distributions,
//! and authorized events that move resources between players under
//! race-like completion rules.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Source Text → Tokenizer → Preprocessor → Analyzer → Resolver → Runtime
//! ```
//!
//! ### Stage 1: Tokenization
//!
//! The [`tokenizer`] module performs lexical analysis, producing a
//! position-tagged token stream.
//!
//! ### Stage 2: Preprocessing
//!
//! The [`preprocessor`] module strips comment tokens and expands
//! `#include` directives through a host-supplied
//! [`SourceLoader`](preprocessor::SourceLoader) into one merged stream.
//!
//! ### Stage 3: Parsing
//!
//! The [`analyzer`] module builds the [`ast`] using a parser combinator
//! system, failing fast on the first structural error.
//!
//! ### Stage 4: Resolution
//!
//! The [`resolver`] module merges all files into a single validated
//! namespace, the immutable [`ResolvedProgram`](resolver::ResolvedProgram),
//! reporting every fatal diagnostic at once.
//!
//! ### Stage 5: Execution
//!
//! The [`runtime`] module executes resolved events against a host-supplied
//! [`EconomyStore`](store::EconomyStore), using the [`eval`] expression
//! evaluator and the [`distribution`] sampling engine.
//!
//! ## Host Boundary
//!
//! The crate owns no I/O beyond what the host injects: file access comes
//! through [`preprocessor::SourceLoader`], balances and queries through
//! [`store::EconomyStore`], and randomness through the seedable source
//! passed to each invocation. [`loader::ProgramLoader`] wires the compile
//! stages together for hosts that want the one-call path.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use scifiweb_core::config::RuntimeConfig;
//! use scifiweb_core::loader;
//! use scifiweb_core::runtime::{CallerContext, EventRuntime};
//! use scifiweb_core::store::InMemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = r#"
//!     collectable Coin has amount;
//!     event Grant {
//!         params [grantee user];
//!         authorize gameserver;
//!         award 100 x Coin to grantee;
//!     }
//! "#;
//! let file = loader::parse(source)?;
//! let program = Arc::new(loader::resolve(vec![file]).map_err(|d| format!("{:?}", d))?);
//! let store = Arc::new(InMemoryStore::new());
//! let runtime = EventRuntime::new(program, store, RuntimeConfig::default());
//!
//! let outcome = runtime
//!     .run_event(
//!         "Grant",
//!         vec![scifiweb_core::eval::Value::Owner("alice".to_string())],
//!         &CallerContext::role("srv-1", "gameserver"),
//!         StdRng::seed_from_u64(0),
//!     )
//!     .await?;
//! assert_eq!(outcome.effects.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod ast;
pub mod config;
pub mod distribution;
pub mod error;
pub mod eval;
pub mod loader;
pub mod preprocessor;
pub mod resolver;
pub mod runtime;
pub mod store;
pub mod tokenizer;

// Re-exports
pub use analyzer::ParseError;
pub use error::{Error, InternalResult};
pub use eval::{Bindings, EvalError, Evaluator, Value};
pub use loader::{LoadError, ProgramLoader, parse, resolve};
pub use resolver::{ResolutionError, ResolvedProgram};
pub use runtime::{CallerContext, EventOutcome, EventRuntime, InvocationError, SideEffect};
pub use store::{EconomyStore, Entity, InMemoryStore, StoreError};
