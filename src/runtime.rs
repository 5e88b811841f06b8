//! # Event Runtime
//!
//! Executes resolved event definitions against the economy store. One
//! invocation is a small state machine, terminal on the first failure:
//!
//! 1. **Bind**: invocation arguments are matched to declared parameters and
//!    checked against their constraints. Failure aborts with zero side
//!    effects.
//! 2. **Authorize**: the resolved authorize clause is checked against the
//!    caller. Failure aborts with zero side effects.
//! 3. **Execute**: body statements run in source order. A failing statement
//!    aborts the rest; side effects already applied by earlier statements
//!    are not rolled back.
//!
//! ## Option races
//!
//! An `option` block runs one future per branch, raced under the invocation
//! task. The first branch whose ordered triggers all succeed wins; its
//! trailing statements continue the event. Losing branches are dropped the
//! instant a winner completes, which tears down pending timers before any of
//! their trailing statements can run. Declared order breaks ties: branches
//! are polled in source order, so simultaneous completion favors the
//! earliest branch. A cost trigger that already succeeded on a losing branch
//! stays applied and appears in the effect log.
//!
//! ## Concurrency
//!
//! Statements outside option blocks execute strictly in source order. The
//! runtime holds no lock across statements; balances are mutated only
//! through the store's atomic calls, and two invocations touching the same
//! entity are not serialized here; `assert` is the language's manual guard,
//! and true mutual exclusion is the host's responsibility.

use std::sync::{Arc, Mutex};

use async_recursion::async_recursion;
use futures::FutureExt;
use futures::future::{BoxFuture, select_all};
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ast::{AwardSource, Expression, SetSource, Statement, Trigger};
use crate::config::RuntimeConfig;
use crate::distribution::DistributionSampler;
use crate::eval::{Bindings, EvalError, Evaluator, Value};
use crate::resolver::{
    Authorize, Constraint, EventDefinition, ResolvedProgram,
};
use crate::store::{
    EconomyStore, FindPredicate, Notification, OwnerId, StoreError,
};

/// The identity an event is invoked under.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallerContext {
    pub id: OwnerId,
    pub roles: Vec<String>,
    pub authenticated: bool,
}

impl CallerContext {
    /// An authenticated end user.
    pub fn user(id: impl Into<OwnerId>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
            authenticated: true,
        }
    }

    /// A trusted service caller holding a role such as `gameserver`.
    pub fn role(id: impl Into<OwnerId>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: vec![role.into()],
            authenticated: true,
        }
    }
}

/// One applied side effect, in application order.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    Credit {
        owner: OwnerId,
        collectable: String,
        amount: i64,
    },
    Debit {
        owner: OwnerId,
        collectable: String,
        amount: i64,
    },
    Notify {
        event: String,
    },
}

/// A successful invocation: the ordered list of applied side effects.
#[derive(Debug, Clone, PartialEq)]
pub struct EventOutcome {
    pub invocation_id: Uuid,
    pub event: String,
    pub effects: Vec<SideEffect>,
}

/// An invocation-scoped failure. Carries the event name and the index of the
/// top-level statement that aborted; statements inside an option branch
/// report the option block's index.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("unknown event '{event}'")]
    UnknownEvent { event: String },
    #[error("parameter binding failed for '{event}': {message}")]
    ParamBinding { event: String, message: String },
    #[error("caller is not authorized to invoke '{event}'")]
    NotAuthorized { event: String },
    #[error("assertion failed in '{event}' at statement {statement}")]
    AssertionFailed { event: String, statement: usize },
    #[error("find failed in '{event}' at statement {statement}: {message}")]
    Find {
        event: String,
        statement: usize,
        message: String,
    },
    #[error(
        "insufficient balance of {collectable} for {owner} in '{event}' at statement {statement}"
    )]
    InsufficientBalance {
        event: String,
        statement: usize,
        owner: OwnerId,
        collectable: String,
    },
    #[error("evaluation failed in '{event}' at statement {statement}: {source}")]
    Evaluation {
        event: String,
        statement: usize,
        #[source]
        source: EvalError,
    },
    #[error("store failure in '{event}' at statement {statement}: {source}")]
    Store {
        event: String,
        statement: usize,
        #[source]
        source: StoreError,
    },
    #[error("invocation of '{event}' timed out")]
    Timeout { event: String },
}

/// A derived upgrade or redemption cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostQuote {
    pub collectable: String,
    pub cost: i64,
}

/// Executes events of one resolved program against an economy store.
///
/// The program is immutable shared state; the runtime itself is cheap to
/// clone per host request.
#[derive(Clone)]
pub struct EventRuntime {
    program: Arc<ResolvedProgram>,
    store: Arc<dyn EconomyStore>,
    config: RuntimeConfig,
    evaluator: Arc<Evaluator>,
}

impl EventRuntime {
    pub fn new(
        program: Arc<ResolvedProgram>,
        store: Arc<dyn EconomyStore>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            program,
            store,
            config,
            evaluator: Arc::new(Evaluator::new()),
        }
    }

    pub fn program(&self) -> &ResolvedProgram {
        &self.program
    }

    /// Runs one event invocation to completion.
    ///
    /// The random source drives `random` expressions and distribution
    /// sampling; a fixed seed makes the invocation reproducible.
    #[tracing::instrument(level = "debug", skip(self, args, caller, rng), fields(event = event_name))]
    pub async fn run_event(
        &self,
        event_name: &str,
        args: Vec<Value>,
        caller: &CallerContext,
        rng: StdRng,
    ) -> Result<EventOutcome, InvocationError> {
        let event = self
            .program
            .event(event_name)
            .ok_or_else(|| InvocationError::UnknownEvent {
                event: event_name.to_string(),
            })?;

        let rng = Mutex::new(rng);
        let mut bindings = self.bind_params(event, args, &rng)?;
        self.authorize(event, &bindings, caller)?;

        let invocation_id = Uuid::new_v4();
        debug!(%invocation_id, "invocation authorized");
        let effects = Arc::new(Mutex::new(Vec::new()));

        let body = self.execute_statements(
            &event.body,
            &mut bindings,
            caller,
            &rng,
            &effects,
            &event.name,
            None,
        );
        match self.config.invocation_timeout {
            Some(limit) => tokio::time::timeout(limit, body).await.map_err(|_| {
                InvocationError::Timeout {
                    event: event.name.clone(),
                }
            })??,
            None => body.await?,
        }

        let effects = effects.lock().expect("effect log lock").clone();
        Ok(EventOutcome {
            invocation_id,
            event: event.name.clone(),
            effects,
        })
    }

    /// Derives the upgrade cost for holding `amount` of a collectable, if a
    /// tier applies.
    pub fn upgrade_cost(
        &self,
        collectable: &str,
        amount: i64,
    ) -> Result<Option<CostQuote>, EvalError> {
        self.tier_cost(collectable, amount, true)
    }

    /// Derives the redemption cost for `amount` of a collectable.
    pub fn redemption_cost(
        &self,
        collectable: &str,
        amount: i64,
    ) -> Result<Option<CostQuote>, EvalError> {
        self.tier_cost(collectable, amount, false)
    }

    fn tier_cost(
        &self,
        collectable: &str,
        amount: i64,
        upgrades: bool,
    ) -> Result<Option<CostQuote>, EvalError> {
        let Some(ty) = self.program.collectable(collectable) else {
            return Ok(None);
        };
        let table = if upgrades { &ty.upgrades } else { &ty.redemptions };
        let Some(tier) = table.iter().find(|tier| tier.applies_to(amount)) else {
            return Ok(None);
        };
        let env = Bindings::new().with("amount", Value::Integer(amount));
        let value = self.evaluator.evaluate_const(&tier.cost, &env)?;
        let cost = value.as_f64().ok_or_else(|| EvalError::TypeMismatch {
            expected: "number",
            found: value.kind().to_string(),
        })?;
        Ok(Some(CostQuote {
            collectable: tier.collectable.clone(),
            cost: cost.ceil() as i64,
        }))
    }

    /// Matches invocation arguments to declared parameters; any mismatch
    /// aborts with zero side effects.
    fn bind_params(
        &self,
        event: &EventDefinition,
        args: Vec<Value>,
        rng: &Mutex<StdRng>,
    ) -> Result<Bindings, InvocationError> {
        let fail = |message: String| InvocationError::ParamBinding {
            event: event.name.clone(),
            message,
        };
        if args.len() != event.params.len() {
            return Err(fail(format!(
                "expected {} arguments, got {}",
                event.params.len(),
                args.len()
            )));
        }
        let mut bindings = Bindings::new();
        for (param, arg) in event.params.iter().zip(args) {
            let ok = match (&param.constraint, &arg) {
                (Constraint::CollectableType(ty), Value::Entity(entity)) => entity.kind == *ty,
                (Constraint::Group(group), Value::Entity(entity)) => {
                    self.program.is_member(&entity.kind, group)
                }
                (Constraint::User, Value::Owner(_)) => true,
                (Constraint::Integer, Value::Integer(_)) => true,
                (Constraint::Decimal, Value::Decimal(_) | Value::Integer(_)) => true,
                (Constraint::Text, Value::Text(_)) => true,
                _ => false,
            };
            if !ok {
                return Err(fail(format!(
                    "argument '{}' does not satisfy its constraint ({})",
                    param.name,
                    arg.kind()
                )));
            }
            bindings.bind(param.name.clone(), arg);
        }
        for param in &event.params {
            if let Some(guard) = &param.guard {
                let value = self
                    .eval(guard, &bindings, rng)
                    .map_err(|e| fail(e.to_string()))?;
                if value.as_bool() != Some(true) {
                    return Err(fail(format!(
                        "guard on parameter '{}' not satisfied",
                        param.name
                    )));
                }
            }
        }
        Ok(bindings)
    }

    fn authorize(
        &self,
        event: &EventDefinition,
        bindings: &Bindings,
        caller: &CallerContext,
    ) -> Result<(), InvocationError> {
        let denied = || InvocationError::NotAuthorized {
            event: event.name.clone(),
        };
        match &event.authorize {
            None => Ok(()),
            Some(Authorize::Role(role)) => {
                if caller.roles.iter().any(|r| r == role) {
                    Ok(())
                } else {
                    Err(denied())
                }
            }
            Some(Authorize::AnyUser) => {
                if caller.authenticated {
                    Ok(())
                } else {
                    Err(denied())
                }
            }
            Some(Authorize::ParamOwner { param }) => match bindings.get(param) {
                Some(Value::Entity(entity)) if entity.owner == caller.id => Ok(()),
                _ => Err(denied()),
            },
        }
    }

    /// Executes statements in source order. `parent_index` is set when
    /// running an option branch's trailing statements, so nested failures
    /// report the enclosing option block's index.
    #[async_recursion]
    #[allow(clippy::too_many_arguments)]
    async fn execute_statements(
        &self,
        statements: &[Statement],
        bindings: &mut Bindings,
        caller: &CallerContext,
        rng: &Mutex<StdRng>,
        effects: &Arc<Mutex<Vec<SideEffect>>>,
        event: &str,
        parent_index: Option<usize>,
    ) -> Result<(), InvocationError> {
        for (position, statement) in statements.iter().enumerate() {
            let index = parent_index.unwrap_or(position);
            match statement {
                Statement::Assert(expr) => {
                    let value = self
                        .eval(expr, bindings, rng)
                        .map_err(|e| self.eval_error(event, index, e))?;
                    if value.as_bool() != Some(true) {
                        return Err(InvocationError::AssertionFailed {
                            event: event.to_string(),
                            statement: index,
                        });
                    }
                }
                Statement::Set { var, source } => {
                    let value = match source {
                        SetSource::Expr(expr) => self
                            .eval(expr, bindings, rng)
                            .map_err(|e| self.eval_error(event, index, e))?,
                        SetSource::Find(query) => {
                            self.run_find(query, bindings, rng, event, index).await?
                        }
                    };
                    bindings.bind(var.name.clone(), value);
                }
                Statement::Award { source, target } => {
                    self.run_award(source, target, bindings, rng, effects, event, index)
                        .await?;
                }
                Statement::Notify {
                    target,
                    event: remote,
                    args,
                } => {
                    let target = self
                        .eval(target, bindings, rng)
                        .map_err(|e| self.eval_error(event, index, e))?;
                    let mut values = Vec::with_capacity(args.len());
                    for arg in args {
                        values.push(
                            self.eval(arg, bindings, rng)
                                .map_err(|e| self.eval_error(event, index, e))?,
                        );
                    }
                    let notification = Notification {
                        target,
                        event: remote.name.clone(),
                        args: values,
                    };
                    // fire-and-forget: cannot fail or block the invocation
                    let store = Arc::clone(&self.store);
                    let remote_name = remote.name.clone();
                    tokio::spawn(async move {
                        if let Err(e) = store.notify(notification).await {
                            warn!(event = %remote_name, error = %e, "notify dropped");
                        }
                    });
                    effects.lock().expect("effect log lock").push(SideEffect::Notify {
                        event: remote.name.clone(),
                    });
                }
                Statement::Option { branches } => {
                    if branches.is_empty() {
                        continue;
                    }
                    let winner = self
                        .run_option_race(branches, bindings, caller, rng, effects, event, index)
                        .await?;
                    self.execute_statements(
                        &branches[winner].body,
                        bindings,
                        caller,
                        rng,
                        effects,
                        event,
                        Some(index),
                    )
                    .await?;
                }
            }
        }
        Ok(())
    }

    /// Races all branches of one option block; returns the winning branch
    /// index. Losing futures are dropped as soon as a winner completes.
    #[allow(clippy::too_many_arguments)]
    async fn run_option_race(
        &self,
        branches: &[crate::ast::OptionBranch],
        bindings: &Bindings,
        caller: &CallerContext,
        rng: &Mutex<StdRng>,
        effects: &Arc<Mutex<Vec<SideEffect>>>,
        event: &str,
        index: usize,
    ) -> Result<usize, InvocationError> {
        type BranchResult = Result<usize, (usize, InvocationError)>;
        let mut racing: Vec<BoxFuture<'_, BranchResult>> = branches
            .iter()
            .enumerate()
            .map(|(branch_index, branch)| {
                self.run_branch(branch_index, branch, bindings, caller, rng, effects, event, index)
                    .boxed()
            })
            .collect();

        let mut failures: Vec<(usize, InvocationError)> = Vec::new();
        loop {
            let (result, _, rest) = select_all(racing).await;
            match result {
                Ok(winner) => {
                    debug!(winner, "option branch won the race");
                    return Ok(winner);
                }
                Err(failure) => {
                    debug!(branch = failure.0, "option branch out of the race");
                    failures.push(failure);
                    if rest.is_empty() {
                        // every branch failed: abort with the failure of the
                        // first declared branch
                        failures.sort_by_key(|(branch, _)| *branch);
                        let (_, error) = failures.remove(0);
                        return Err(error);
                    }
                    racing = rest;
                }
            }
        }
    }

    /// Runs one branch's ordered triggers. The future resolves `Ok` when all
    /// triggers succeed and `Err` when one knocks the branch out.
    #[allow(clippy::too_many_arguments)]
    async fn run_branch(
        &self,
        branch_index: usize,
        branch: &crate::ast::OptionBranch,
        bindings: &Bindings,
        caller: &CallerContext,
        rng: &Mutex<StdRng>,
        effects: &Arc<Mutex<Vec<SideEffect>>>,
        event: &str,
        index: usize,
    ) -> Result<usize, (usize, InvocationError)> {
        let fail = |e: InvocationError| (branch_index, e);
        for trigger in &branch.triggers {
            match trigger {
                Trigger::Timer(expr) => {
                    let value = self
                        .eval(expr, bindings, rng)
                        .map_err(|e| fail(self.eval_error(event, index, e)))?;
                    let duration = match value {
                        Value::Duration(d) => d,
                        other => {
                            return Err(fail(self.eval_error(
                                event,
                                index,
                                EvalError::TypeMismatch {
                                    expected: "duration",
                                    found: other.kind().to_string(),
                                },
                            )));
                        }
                    };
                    tokio::time::sleep(duration).await;
                }
                Trigger::Cost { amount, collectable } => {
                    let amount = match self
                        .eval(amount, bindings, rng)
                        .map_err(|e| fail(self.eval_error(event, index, e)))?
                    {
                        Value::Integer(i) if i > 0 => i,
                        other => {
                            return Err(fail(self.eval_error(
                                event,
                                index,
                                EvalError::TypeMismatch {
                                    expected: "positive integer",
                                    found: other.kind().to_string(),
                                },
                            )));
                        }
                    };
                    match self
                        .store
                        .debit(&caller.id, &collectable.name, amount)
                        .await
                    {
                        Ok(_) => {
                            effects.lock().expect("effect log lock").push(SideEffect::Debit {
                                owner: caller.id.clone(),
                                collectable: collectable.name.clone(),
                                amount,
                            });
                        }
                        Err(StoreError::InsufficientBalance { .. }) => {
                            return Err(fail(InvocationError::InsufficientBalance {
                                event: event.to_string(),
                                statement: index,
                                owner: caller.id.clone(),
                                collectable: collectable.name.clone(),
                            }));
                        }
                        Err(e) => {
                            return Err(fail(InvocationError::Store {
                                event: event.to_string(),
                                statement: index,
                                source: e,
                            }));
                        }
                    }
                }
                Trigger::Assert(expr) => {
                    let value = self
                        .eval(expr, bindings, rng)
                        .map_err(|e| fail(self.eval_error(event, index, e)))?;
                    if value.as_bool() != Some(true) {
                        return Err(fail(InvocationError::AssertionFailed {
                            event: event.to_string(),
                            statement: index,
                        }));
                    }
                }
            }
        }
        Ok(branch_index)
    }

    async fn run_find(
        &self,
        query: &crate::ast::FindQuery,
        bindings: &Bindings,
        rng: &Mutex<StdRng>,
        event: &str,
        index: usize,
    ) -> Result<Value, InvocationError> {
        use crate::ast::{FindCardinality, FindFallback};

        let filter = match &query.predicate {
            Some(expr) => Some(
                self.eval(expr, bindings, rng)
                    .map_err(|e| self.eval_error(event, index, e))?,
            ),
            None => None,
        };
        let predicate = FindPredicate {
            subject: query.subject.name.clone(),
            filter,
        };
        let matches = self
            .store
            .find(&predicate)
            .await
            .map_err(|e| InvocationError::Store {
                event: event.to_string(),
                statement: index,
                source: e,
            })?;

        let violation = match query.cardinality {
            FindCardinality::ExactlyOne => matches.len() != 1,
            FindCardinality::ZeroOrOne => matches.len() > 1,
        };
        if violation {
            match query.on_violation {
                FindFallback::Continue => {
                    debug!(subject = %predicate.subject, found = matches.len(),
                        "find violation, continuing unbound");
                    return Ok(Value::Null);
                }
                FindFallback::Abort => {
                    return Err(InvocationError::Find {
                        event: event.to_string(),
                        statement: index,
                        message: format!(
                            "expected {} '{}', found {}",
                            match query.cardinality {
                                FindCardinality::ExactlyOne => "exactly one",
                                FindCardinality::ZeroOrOne => "at most one",
                            },
                            predicate.subject,
                            matches.len()
                        ),
                    });
                }
            }
        }
        Ok(matches
            .into_iter()
            .next()
            .map(Value::Entity)
            .unwrap_or(Value::Null))
    }

    /// Applies one award statement: each target owner's transaction is
    /// independent, so a mid-set debit failure leaves earlier owners'
    /// transactions applied (documented best-effort model).
    #[allow(clippy::too_many_arguments)]
    async fn run_award(
        &self,
        source: &AwardSource,
        target: &Expression,
        bindings: &Bindings,
        rng: &Mutex<StdRng>,
        effects: &Arc<Mutex<Vec<SideEffect>>>,
        event: &str,
        index: usize,
    ) -> Result<(), InvocationError> {
        let target_value = self
            .eval(target, bindings, rng)
            .map_err(|e| self.eval_error(event, index, e))?;
        let owners = owners_of(&target_value).map_err(|found| {
            self.eval_error(
                event,
                index,
                EvalError::TypeMismatch {
                    expected: "owner or set of owners",
                    found,
                },
            )
        })?;

        let lines: Vec<(String, i64)> = match source {
            AwardSource::Amount { amount, collectable } => {
                let amount = match self
                    .eval(amount, bindings, rng)
                    .map_err(|e| self.eval_error(event, index, e))?
                {
                    Value::Integer(i) => i,
                    other => {
                        return Err(self.eval_error(
                            event,
                            index,
                            EvalError::TypeMismatch {
                                expected: "integer",
                                found: other.kind().to_string(),
                            },
                        ));
                    }
                };
                vec![(collectable.name.clone(), amount)]
            }
            AwardSource::Distribution(name) => {
                let Some(distribution) = self.program.distribution(&name.name) else {
                    return Err(self.eval_error(
                        event,
                        index,
                        EvalError::UndefinedVariable(name.name.clone()),
                    ));
                };
                let sampler = DistributionSampler::new(&self.program);
                let items = {
                    let mut rng = rng.lock().expect("rng lock");
                    sampler.sample(distribution, &mut *rng)
                };
                items
                    .into_iter()
                    .map(|item| (item.collectable, item.amount))
                    .collect()
            }
        };

        for owner in &owners {
            for (collectable, amount) in &lines {
                if *amount >= 0 {
                    self.store
                        .credit(owner, collectable, *amount)
                        .await
                        .map_err(|e| InvocationError::Store {
                            event: event.to_string(),
                            statement: index,
                            source: e,
                        })?;
                    effects.lock().expect("effect log lock").push(SideEffect::Credit {
                        owner: owner.clone(),
                        collectable: collectable.clone(),
                        amount: *amount,
                    });
                } else {
                    let debit = amount.unsigned_abs() as i64;
                    match self.store.debit(owner, collectable, debit).await {
                        Ok(_) => {
                            effects.lock().expect("effect log lock").push(SideEffect::Debit {
                                owner: owner.clone(),
                                collectable: collectable.clone(),
                                amount: debit,
                            });
                        }
                        Err(StoreError::InsufficientBalance { .. }) => {
                            return Err(InvocationError::InsufficientBalance {
                                event: event.to_string(),
                                statement: index,
                                owner: owner.clone(),
                                collectable: collectable.clone(),
                            });
                        }
                        Err(e) => {
                            return Err(InvocationError::Store {
                                event: event.to_string(),
                                statement: index,
                                source: e,
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn eval(
        &self,
        expr: &Expression,
        bindings: &Bindings,
        rng: &Mutex<StdRng>,
    ) -> Result<Value, EvalError> {
        let mut rng = rng.lock().expect("rng lock");
        self.evaluator.evaluate(expr, bindings, &mut *rng)
    }

    fn eval_error(&self, event: &str, statement: usize, source: EvalError) -> InvocationError {
        InvocationError::Evaluation {
            event: event.to_string(),
            statement,
            source,
        }
    }
}

/// Flattens an award target into owner ids: an owner, an entity's owner, or
/// a list of either.
fn owners_of(value: &Value) -> Result<Vec<OwnerId>, String> {
    match value {
        Value::Owner(id) => Ok(vec![id.clone()]),
        Value::Entity(entity) => Ok(vec![entity.owner.clone()]),
        Value::List(items) => {
            let mut owners = Vec::with_capacity(items.len());
            for item in items {
                owners.extend(owners_of(item)?);
            }
            Ok(owners)
        }
        other => Err(other.kind().to_string()),
    }
}
