//! # Keyword Token Handling
//!
//! This module defines the reserved words of the SciFiWeb language.
//!
//! ## Keyword Groups
//!
//! * **Declaration Keywords**: `collectable`, `group`, `property`, `event`, etc.
//! * **Statement Keywords**: `params`, `authorize`, `assert`, `award`, etc.
//! * **Kind Keywords**: `switch`, `text`, `integer`, `datetime`, etc.
//! * **Value Keywords**: `on`, `off`, `seconds` through `weeks`
//! * **Economy Keywords**: `amount`, `cost`, `weighted`, `distribution`, etc.
//!
//! ## Recognition Strategy
//!
//! The lexer first consumes a full identifier and only then looks it up in the
//! keyword set, so identifiers that merely start with a keyword (for example
//! `minimum`) are never split. A backtick prefix escapes a keyword into a
//! plain identifier: `` `max `` is the identifier `max`.
//!
//! The [`Keyword`] enum uses `strum` derive macros for string conversion
//! (`EnumString`), display formatting (`Display`), and iteration (`EnumIter`).

use std::str::FromStr;

/// Reserved words of the SciFiWeb language.
///
/// Keywords may not be used as identifiers unless escaped with a backtick.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Keyword {
    // Declarations
    /// Declares a collectable type.
    Collectable,
    /// Declares a collectable group.
    Group,
    /// Declares a property on a type or group.
    Property,
    /// Marks a type amount-bearing (`has amount`).
    Has,
    /// Declares an event definition.
    Event,
    /// Reserved for function declarations.
    Function,
    /// Reserved for object declarations.
    Object,
    /// The user membership constraint and authorize target.
    User,
    /// Marks a host-delivered event (`remote event`).
    Remote,
    /// Reserved for array declarations.
    Array,
    /// Attaches a collectable to a group (`in Group`).
    In,
    /// Used in notify statements (`of EventName`).
    Of,
    /// Award targets and tier ranges (`to`).
    To,
    /// List pair qualifier and tier conditions (`for`).
    For,
    /// Notify argument lists and query predicates (`with`).
    With,
    /// Terminates an option block.
    End,

    // Event statements
    /// Opens an event's parameter list.
    Params,
    /// Declares an event's authorization clause.
    Authorize,
    /// Asserts a boolean expression.
    Assert,
    /// Binds an event-local variable.
    Set,
    /// Queries the economy store.
    Find,
    /// Credits or debits collectables.
    Award,
    /// Emits an outbound notification.
    Notify,
    /// A timer trigger inside an option branch.
    Timer,
    /// Opens an option block.
    Option,
    /// Samples a random value.
    Random,
    /// Separates option branches; logical or in expressions.
    Or,
    /// Separates branch triggers; logical and in expressions.
    And,
    /// Exactly-one find cardinality.
    One,
    /// Zero-or-one find cardinality.
    Any,
    /// Marks a find violation as non-fatal.
    Continue,

    // Property kinds
    /// Boolean property kind with `on`/`off` values.
    Switch,
    /// Plain text property kind.
    Text,
    /// Localized text property kind (`localized text`).
    Localized,
    /// Integer property kind.
    Integer,
    /// Decimal property kind.
    Decimal,
    /// Percent property kind.
    Percent,
    /// Date-time property kind.
    Datetime,

    // Special values
    /// Switch value true.
    On,
    /// Switch value false.
    Off,
    /// Duration unit.
    Seconds,
    /// Duration unit.
    Minutes,
    /// Duration unit.
    Hours,
    /// Duration unit.
    Days,
    /// Duration unit.
    Weeks,

    // Economy
    /// The amount pseudo-variable and `has amount`.
    Amount,
    /// A cost trigger or tier cost.
    Cost,
    /// Opens a distribution's entry list.
    Weighted,
    /// Declares a reward distribution.
    Distribution,
    /// A bounded range expression.
    Range,
    /// Range lower bound accessor.
    Min,
    /// Range upper bound accessor.
    Max,
    /// Count separator (`5 x Gem`).
    X,
    /// Opens a collectable's upgrade cost table.
    Upgrades,
    /// Opens a collectable's redemption cost table.
    Redemptions,
    /// The gameserver role.
    Gameserver,
    /// The admin role.
    Admin,

    // Directive
    /// The `#include` directive word.
    Include,
}

/// Classifies a lexed word as a keyword or returns `None` for identifiers.
///
/// The lexer consumes the whole word first, so boundary handling is already
/// done by the time this lookup runs.
pub fn lookup_keyword(word: &str) -> Option<Keyword> {
    Keyword::from_str(word).ok()
}
