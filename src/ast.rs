use core::fmt;

/// A parsed source file: the ordered top-level items of one SciFiWeb text.
///
/// When the preprocessor has expanded includes, a single `SourceFile` holds
/// the merged item list and `path` names the entry file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFile {
    pub path: Option<String>,
    pub items: Vec<Item>,
}

impl SourceFile {
    pub fn new(items: Vec<Item>) -> Self {
        Self { path: None, items }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// An unexpanded `#include 'path'` directive. The preprocessor expands
    /// these at the token level, so a loader-driven pipeline never produces
    /// them; they only appear when a host parses one file in isolation.
    Include(IncludeDecl),
    Collectable(CollectableDef),
    Group(GroupDef),
    Distribution(DistributionDef),
    RemoteEvent(RemoteEventDef),
    Event(EventDef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncludeDecl {
    pub path: String,
    pub line: u32,
}

/// An identifier with its source position for diagnostics.
#[derive(Debug, Clone, Eq)]
pub struct Ident {
    pub name: String,
    pub line: u32,
    pub column: usize,
}

impl Ident {
    pub fn new(name: impl Into<String>, line: u32, column: usize) -> Self {
        Self {
            name: name.into(),
            line,
            column,
        }
    }
}

// position is metadata, not identity
impl PartialEq for Ident {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl std::hash::Hash for Ident {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Collectable Type Declaration
///
/// Declares a typed, ownable resource. The minimal form is
/// `collectable Coin;`; richer declarations attach a parent group, an
/// amount flag, properties, and upgrade/redemption cost tables:
///
/// ```text
/// collectable Chest in Lootable {
///     has amount;
///     property opened switch = off;
///     property quality integer = random range(1, 100);
///     upgrades [
///         cost 10 * amount x Gem for amount range 1 to 9
///     ];
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CollectableDef {
    pub name: Ident,
    pub group: Option<Ident>,
    pub amount_bearing: bool,
    pub properties: Vec<PropertyDef>,
    pub upgrades: Vec<RuleTier>,
    pub redemptions: Vec<RuleTier>,
}

/// Collectable Group Declaration
///
/// A named set of collectables and sub-groups with inherited properties:
/// `group Lootable [Chest, Relic] { property sellable switch = on; }`.
/// Membership edges must form a DAG; the resolver rejects cycles.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDef {
    pub name: Ident,
    pub members: Vec<Ident>,
    pub properties: Vec<PropertyDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    pub id: Ident,
    pub kind: PropertyKind,
    pub default: Option<Expression>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    Switch,
    Text,
    LocalizedText,
    Integer,
    Decimal,
    Percent,
    Random,
    Datetime,
    Collectable,
    User,
    Group,
}

/// One tier of an upgrade or redemption table:
/// `cost <expr> x <collectable> for amount range <lo> to <hi>`.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTier {
    pub cost: Expression,
    pub collectable: Ident,
    pub amount_lo: Expression,
    pub amount_hi: Expression,
}

/// Reward Distribution Declaration
///
/// ```text
/// distribution ChestLoot {
///     amount range 50 to 100;
///     group range 1 to 3;
///     weighted [
///         90% for Coin,
///         10% for Gem,
///         Relic x max 2
///     ];
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionDef {
    pub name: Ident,
    pub amount_range: (Expression, Expression),
    pub group_range: (Expression, Expression),
    pub entries: Vec<DistributionEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionEntry {
    pub target: Ident,
    pub kind: DistributionEntryKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DistributionEntryKind {
    /// `90% for Target`: selection weight.
    Weight(Expression),
    /// `Target x max 2`: capped count, equally weighted among caps.
    Max(Expression),
    /// `Target x 2`: fixed count, treated as a cap of the same size.
    Fixed(Expression),
}

/// A host-delivered notification endpoint:
/// `remote event ChestOpened [chest Chest, opener user];`
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEventDef {
    pub name: Ident,
    pub params: Vec<ParamDef>,
}

/// Event Definition
///
/// An authorized operation over the economy. Parameters are bound from
/// invocation arguments and checked against their constraints, the authorize
/// clause gates the caller, and the body runs in source order:
///
/// ```text
/// event OpenChest {
///     params [chest Chest, opener user];
///     authorize chest.owner;
///     assert chest.opened = off;
///     option:
///         timer 4 hours
///     or
///         cost 5 x Gem
///     end;
///     award ChestLoot to opener;
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EventDef {
    pub name: Ident,
    pub params: Vec<ParamDef>,
    pub authorize: Option<AuthorizeClause>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDef {
    pub name: Ident,
    pub constraint: ParamConstraint,
    /// Optional comparison guard with the parameter as implicit left operand,
    /// e.g. `level integer >= 3`.
    pub guard: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamConstraint {
    /// A collectable type or group name, resolved later.
    Entity(Ident),
    User,
    Integer,
    Decimal,
    Text,
}

/// An authorize clause as parsed: either a single word (`gameserver`,
/// `admin`, `user`) or a dotted path rooted at a parameter (`chest.owner`).
/// The resolver classifies it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizeClause {
    pub path: Vec<Ident>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Assert(Expression),
    Set {
        var: Ident,
        source: SetSource,
    },
    Award {
        source: AwardSource,
        target: Expression,
    },
    Notify {
        target: Expression,
        event: Ident,
        args: Vec<Expression>,
    },
    Option {
        branches: Vec<OptionBranch>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SetSource {
    Expr(Expression),
    Find(FindQuery),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FindQuery {
    pub cardinality: FindCardinality,
    /// What is being looked up: `gameserver`, `user`, or a collectable type.
    pub subject: Ident,
    pub predicate: Option<Expression>,
    pub on_violation: FindFallback,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FindCardinality {
    /// `find one ...`: exactly one match expected.
    ExactlyOne,
    /// `find any ...`: zero or one match expected.
    ZeroOrOne,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FindFallback {
    Abort,
    /// `... or continue`: bind nothing and keep executing.
    Continue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AwardSource {
    /// `award <expr> x <collectable> to ...`; a negative amount is a debit.
    Amount {
        amount: Expression,
        collectable: Ident,
    },
    /// `award <distribution> to ...`: sample then apply each entry.
    Distribution(Ident),
}

/// One branch of an option race: its ordered triggers and the statements
/// that run only if this branch wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionBranch {
    pub triggers: Vec<Trigger>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// Suspends the branch for a duration.
    Timer(Expression),
    /// Debits the caller; insufficient balance knocks the branch out.
    Cost {
        amount: Expression,
        collectable: Ident,
    },
    /// Boolean gate; false knocks the branch out.
    Assert(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    /// A free identifier: parameter, set-variable, declared name, or
    /// `amount` in property/tier contexts.
    Variable(String),
    /// Dotted access rooted at a variable, e.g. `chest.owner`.
    Path(Vec<String>),
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expression>,
    },
    /// `range(min, max)` / `amount range A to B`: an inclusive pair.
    Range {
        min: Box<Expression>,
        max: Box<Expression>,
    },
    /// `random <expr>`: sampled at evaluation time.
    Random(Box<Expression>),
    /// `<expr> seconds|minutes|hours|days|weeks`.
    Duration {
        value: Box<Expression>,
        unit: DurationUnit,
    },
    /// `[...]` with bare items or `for`-qualified pairs.
    List(Vec<ListItem>),
}

/// A list element. `90% for Coin` and `Coin for 90%` both produce the same
/// pair shape: the percent side is the key, the other side the value.
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub value: Expression,
    pub key: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Decimal(f64),
    /// Percent literals keep their tag through evaluation (`90%` is 0.90
    /// with percent provenance).
    Percent(f64),
    String(String),
    /// `on` / `off`.
    Switch(bool),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    And,
    Or,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnaryOperator {
    Minus,
    Not,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DurationUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl DurationUnit {
    /// Multiplier to seconds.
    pub fn seconds(&self) -> u64 {
        match self {
            DurationUnit::Seconds => 1,
            DurationUnit::Minutes => 60,
            DurationUnit::Hours => 3_600,
            DurationUnit::Days => 86_400,
            DurationUnit::Weeks => 604_800,
        }
    }
}

impl Expression {
    /// Convenience constructor used heavily by the parser and tests.
    pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn integer(value: i64) -> Self {
        Expression::Literal(Literal::Integer(value))
    }
}
