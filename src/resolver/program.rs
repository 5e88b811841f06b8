//! The resolved, immutable program representation.
//!
//! A [`ResolvedProgram`] is built once per load by the resolver and never
//! mutated afterwards; the runtime shares it behind an `Arc`.

use std::collections::{BTreeMap, HashMap};

use crate::ast::{Expression, PropertyKind, Statement};

/// The fully merged, validated namespace of a loaded set of source files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedProgram {
    pub(crate) collectables: HashMap<String, CollectableType>,
    pub(crate) groups: HashMap<String, CollectableGroup>,
    pub(crate) distributions: HashMap<String, Distribution>,
    pub(crate) remote_events: HashMap<String, RemoteEvent>,
    pub(crate) events: HashMap<String, EventDefinition>,
}

impl ResolvedProgram {
    pub fn collectable(&self, name: &str) -> Option<&CollectableType> {
        self.collectables.get(name)
    }

    pub fn group(&self, name: &str) -> Option<&CollectableGroup> {
        self.groups.get(name)
    }

    pub fn distribution(&self, name: &str) -> Option<&Distribution> {
        self.distributions.get(name)
    }

    pub fn remote_event(&self, name: &str) -> Option<&RemoteEvent> {
        self.remote_events.get(name)
    }

    pub fn event(&self, name: &str) -> Option<&EventDefinition> {
        self.events.get(name)
    }

    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(|s| s.as_str())
    }

    /// Whether `collectable` is a (transitive) member of `group`.
    pub fn is_member(&self, collectable: &str, group: &str) -> bool {
        self.groups
            .get(group)
            .map(|g| g.leaf_types.iter().any(|t| t == collectable))
            .unwrap_or(false)
    }
}

/// A resolved collectable type with its inherited property set flattened in.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectableType {
    pub name: String,
    /// Direct parent groups.
    pub groups: Vec<String>,
    pub amount_bearing: bool,
    pub properties: BTreeMap<String, Property>,
    pub upgrades: Vec<CostTier>,
    pub redemptions: Vec<CostTier>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub id: String,
    pub kind: PropertyKind,
    pub default: Option<Expression>,
}

/// One validated tier of a redemption or upgrade table. Bounds are
/// constant-folded; the cost expression is kept for evaluation with the
/// actual amount bound.
#[derive(Debug, Clone, PartialEq)]
pub struct CostTier {
    pub amount_lo: i64,
    pub amount_hi: i64,
    pub collectable: String,
    pub cost: Expression,
}

impl CostTier {
    pub fn applies_to(&self, amount: i64) -> bool {
        (self.amount_lo..=self.amount_hi).contains(&amount)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectableGroup {
    pub name: String,
    pub members: Vec<GroupMember>,
    pub properties: BTreeMap<String, Property>,
    /// All collectable types reachable through this group's member DAG,
    /// in declaration order, each at most once.
    pub leaf_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GroupMember {
    Type(String),
    Group(String),
}

/// A validated distribution. Ranges are constant-folded; weights are
/// effective selection weights with caps carried alongside.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    pub name: String,
    pub amount_range: (i64, i64),
    pub group_range: (i64, i64),
    pub entries: Vec<DistributionEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionEntry {
    pub target: EntryTarget,
    /// Effective selection weight. Capped entries without a declared weight
    /// share the mean declared weight, or 1.0 when no entry declares one.
    pub weight: f64,
    /// Maximum times this entry may be drawn in one sample.
    pub cap: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryTarget {
    Type(String),
    Group(String),
}

impl EntryTarget {
    pub fn name(&self) -> &str {
        match self {
            EntryTarget::Type(name) | EntryTarget::Group(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEvent {
    pub name: String,
    pub params: Vec<EventParam>,
}

/// A resolved event definition. The body keeps its AST statements; the
/// runtime interprets them directly.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDefinition {
    pub name: String,
    pub params: Vec<EventParam>,
    pub authorize: Option<Authorize>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventParam {
    pub name: String,
    pub constraint: Constraint,
    pub guard: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Argument must be an entity of exactly this collectable type.
    CollectableType(String),
    /// Argument must be an entity whose type is a member of this group.
    Group(String),
    User,
    Integer,
    Decimal,
    Text,
}

/// A resolved authorize clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Authorize {
    /// Caller must hold the named role (`gameserver`, `admin`).
    Role(String),
    /// Any authenticated user.
    AnyUser,
    /// Caller identity must equal `<param>.owner`.
    ParamOwner { param: String },
}
