//! # Evaluation Component
//!
//! Evaluates SciFiWeb expressions against a binding environment: parameter
//! values, `set` variables, the `amount` pseudo-variable in property-default
//! and cost-tier contexts, and entity attributes read from the economy store.
//!
//! Two entry points exist on [`Evaluator`](evaluator::Evaluator):
//!
//! * [`evaluate`](evaluator::Evaluator::evaluate): full evaluation with an
//!   injected random source for `random` expressions.
//! * [`evaluate_const`](evaluator::Evaluator::evaluate_const): used at
//!   resolution time for declared ranges and cost tables, where `random` is
//!   a non-constant error.

pub mod evaluator;
pub mod expression;

pub use evaluator::{Bindings, EvalError, Evaluator};
pub use expression::Value;
