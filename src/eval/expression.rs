//! Runtime values.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::store::Entity;

/// A runtime value produced by expression evaluation.
///
/// `Percent` holds the fractional form (`90%` evaluates to `0.90`) but keeps
/// its tag so the distribution engine can tell declared weights apart from
/// plain decimals.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Decimal(f64),
    Percent(f64),
    Boolean(bool),
    Text(String),
    Duration(Duration),
    Datetime(DateTime<Utc>),
    /// An inclusive bounded pair, never a single scalar.
    Range(i64, i64),
    /// An owner identity (a user or a gameserver).
    Owner(String),
    /// An entity returned by the economy store's find capability.
    Entity(Entity),
    List(Vec<Value>),
    /// The absent value bound by a zero-match `find any ... or continue`.
    Null,
}

impl Value {
    /// Short kind name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::Percent(_) => "percent",
            Value::Boolean(_) => "switch",
            Value::Text(_) => "text",
            Value::Duration(_) => "duration",
            Value::Datetime(_) => "datetime",
            Value::Range(..) => "range",
            Value::Owner(_) => "owner",
            Value::Entity(_) => "entity",
            Value::List(_) => "list",
            Value::Null => "null",
        }
    }

    /// Numeric view for arithmetic and comparison, when the value has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Decimal(d) => Some(*d),
            Value::Percent(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Percent(p) => write!(f, "{}%", p * 100.0),
            Value::Boolean(b) => write!(f, "{}", if *b { "on" } else { "off" }),
            Value::Text(s) => write!(f, "'{}'", s),
            Value::Duration(d) => write!(f, "{}s", d.as_secs_f64()),
            Value::Datetime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Range(lo, hi) => write!(f, "range({}, {})", lo, hi),
            Value::Owner(id) => write!(f, "owner {}", id),
            Value::Entity(e) => write!(f, "entity {}", e.id),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Null => write!(f, "null"),
        }
    }
}
