//! Expression evaluation against a binding environment.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use rand::RngCore;
use thiserror::Error;

use crate::ast::{BinaryOperator, Expression, Literal, UnaryOperator};

use super::expression::Value;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("invalid path '{0}'")]
    InvalidPath(String),
    #[error("'{0}' is not constant in this context")]
    NonConstant(String),
}

/// The variables visible to one evaluation: parameters, `set` bindings, and
/// context pseudo-variables like `amount`.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    vars: HashMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.bind(name, value);
        self
    }
}

enum RandomSource<'a> {
    Rng(&'a mut dyn RngCore),
    /// Resolution-time evaluation: `random` is an error.
    Forbidden,
}

/// Evaluates expressions. Stateless; all inputs come in through the
/// environment and the random source.
#[derive(Debug, Default)]
pub struct Evaluator {}

impl Evaluator {
    pub fn new() -> Self {
        Self {}
    }

    /// Full evaluation with an injected random source.
    pub fn evaluate(
        &self,
        expr: &Expression,
        env: &Bindings,
        rng: &mut dyn RngCore,
    ) -> Result<Value, EvalError> {
        self.eval(expr, env, &mut RandomSource::Rng(rng))
    }

    /// Constant evaluation for declared ranges and cost tables; `random`
    /// expressions are rejected.
    pub fn evaluate_const(&self, expr: &Expression, env: &Bindings) -> Result<Value, EvalError> {
        self.eval(expr, env, &mut RandomSource::Forbidden)
    }

    fn eval(
        &self,
        expr: &Expression,
        env: &Bindings,
        random: &mut RandomSource,
    ) -> Result<Value, EvalError> {
        match expr {
            Expression::Literal(literal) => Ok(literal_value(literal)),
            Expression::Variable(name) => env
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
            Expression::Path(segments) => self.eval_path(segments, env),
            Expression::BinaryOp { op, left, right } => {
                let left = self.eval(left, env, random)?;
                let right = self.eval(right, env, random)?;
                apply_binary(*op, left, right)
            }
            Expression::UnaryOp { op, expr } => {
                let value = self.eval(expr, env, random)?;
                apply_unary(*op, value)
            }
            Expression::Range { min, max } => {
                let min = self.expect_integer(min, env, random)?;
                let max = self.expect_integer(max, env, random)?;
                Ok(Value::Range(min, max))
            }
            Expression::Random(inner) => {
                let value = self.eval(inner, env, random)?;
                match random {
                    RandomSource::Rng(rng) => sample_random(value, &mut **rng),
                    RandomSource::Forbidden => {
                        Err(EvalError::NonConstant("random".to_string()))
                    }
                }
            }
            Expression::Duration { value, unit } => {
                let scalar = self.eval(value, env, random)?;
                let seconds = scalar.as_f64().ok_or_else(|| EvalError::TypeMismatch {
                    expected: "number",
                    found: scalar.kind().to_string(),
                })? * unit.seconds() as f64;
                if seconds < 0.0 {
                    return Err(EvalError::TypeMismatch {
                        expected: "non-negative duration",
                        found: "negative".to_string(),
                    });
                }
                Ok(Value::Duration(Duration::from_secs_f64(seconds)))
            }
            Expression::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(&item.value, env, random)?);
                }
                Ok(Value::List(values))
            }
        }
    }

    fn expect_integer(
        &self,
        expr: &Expression,
        env: &Bindings,
        random: &mut RandomSource,
    ) -> Result<i64, EvalError> {
        match self.eval(expr, env, random)? {
            Value::Integer(i) => Ok(i),
            other => Err(EvalError::TypeMismatch {
                expected: "integer",
                found: other.kind().to_string(),
            }),
        }
    }

    fn eval_path(&self, segments: &[String], env: &Bindings) -> Result<Value, EvalError> {
        let root = env
            .get(&segments[0])
            .cloned()
            .ok_or_else(|| EvalError::UndefinedVariable(segments[0].clone()))?;
        let mut current = root;
        for segment in &segments[1..] {
            current = match (&current, segment.as_str()) {
                (Value::Entity(entity), "owner") => Value::Owner(entity.owner.clone()),
                (Value::Entity(entity), attribute) => entity
                    .attributes
                    .get(attribute)
                    .cloned()
                    .ok_or_else(|| EvalError::InvalidPath(segments.join(".")))?,
                (Value::Range(lo, _), "min") => Value::Integer(*lo),
                (Value::Range(_, hi), "max") => Value::Integer(*hi),
                _ => return Err(EvalError::InvalidPath(segments.join("."))),
            };
        }
        Ok(current)
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Integer(i) => Value::Integer(*i),
        Literal::Decimal(d) => Value::Decimal(*d),
        // percent literals carry their fraction, tagged
        Literal::Percent(p) => Value::Percent(p / 100.0),
        Literal::String(s) => Value::Text(s.clone()),
        Literal::Switch(b) => Value::Boolean(*b),
    }
}

fn sample_random(value: Value, rng: &mut dyn RngCore) -> Result<Value, EvalError> {
    match value {
        Value::Range(lo, hi) if lo <= hi => Ok(Value::Integer(rng.gen_range(lo..=hi))),
        Value::Range(lo, hi) => Err(EvalError::TypeMismatch {
            expected: "range with min <= max",
            found: format!("range({}, {})", lo, hi),
        }),
        Value::Integer(n) if n >= 1 => Ok(Value::Integer(rng.gen_range(1..=n))),
        other => Err(EvalError::TypeMismatch {
            expected: "range",
            found: other.kind().to_string(),
        }),
    }
}

fn apply_unary(op: UnaryOperator, value: Value) -> Result<Value, EvalError> {
    match op {
        UnaryOperator::Minus => match value {
            Value::Integer(i) => Ok(Value::Integer(-i)),
            Value::Decimal(d) => Ok(Value::Decimal(-d)),
            other => Err(EvalError::TypeMismatch {
                expected: "number",
                found: other.kind().to_string(),
            }),
        },
        UnaryOperator::Not => match value {
            Value::Boolean(b) => Ok(Value::Boolean(!b)),
            other => Err(EvalError::TypeMismatch {
                expected: "switch",
                found: other.kind().to_string(),
            }),
        },
    }
}

fn apply_binary(op: BinaryOperator, left: Value, right: Value) -> Result<Value, EvalError> {
    use BinaryOperator::*;
    match op {
        Add | Subtract | Multiply | Divide | Power => apply_arithmetic(op, left, right),
        Equal => Ok(Value::Boolean(values_equal(&left, &right))),
        NotEqual => Ok(Value::Boolean(!values_equal(&left, &right))),
        GreaterThan | GreaterThanEqual | LessThan | LessThanEqual => {
            let l = numeric(&left)?;
            let r = numeric(&right)?;
            Ok(Value::Boolean(match op {
                GreaterThan => l > r,
                GreaterThanEqual => l >= r,
                LessThan => l < r,
                LessThanEqual => l <= r,
                _ => unreachable!(),
            }))
        }
        And | Or => {
            let l = boolean(&left)?;
            let r = boolean(&right)?;
            Ok(Value::Boolean(match op {
                And => l && r,
                Or => l || r,
                _ => unreachable!(),
            }))
        }
    }
}

fn apply_arithmetic(op: BinaryOperator, left: Value, right: Value) -> Result<Value, EvalError> {
    use BinaryOperator::*;
    // integer arithmetic stays integral; any decimal or percent operand
    // promotes the result to decimal
    if let (Value::Integer(l), Value::Integer(r)) = (&left, &right) {
        let (l, r) = (*l, *r);
        return match op {
            Add => Ok(Value::Integer(l + r)),
            Subtract => Ok(Value::Integer(l - r)),
            Multiply => Ok(Value::Integer(l * r)),
            Divide => {
                if r == 0 {
                    Err(EvalError::DivisionByZero)
                } else {
                    Ok(Value::Integer(l / r))
                }
            }
            Power => {
                if r >= 0 {
                    Ok(Value::Integer(l.pow(r.min(u32::MAX as i64) as u32)))
                } else {
                    Ok(Value::Decimal((l as f64).powi(r as i32)))
                }
            }
            _ => unreachable!(),
        };
    }
    let l = numeric(&left)?;
    let r = numeric(&right)?;
    match op {
        Add => Ok(Value::Decimal(l + r)),
        Subtract => Ok(Value::Decimal(l - r)),
        Multiply => Ok(Value::Decimal(l * r)),
        Divide => {
            if r == 0.0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok(Value::Decimal(l / r))
            }
        }
        Power => Ok(Value::Decimal(l.powf(r))),
        _ => unreachable!(),
    }
}

fn numeric(value: &Value) -> Result<f64, EvalError> {
    value.as_f64().ok_or_else(|| EvalError::TypeMismatch {
        expected: "number",
        found: value.kind().to_string(),
    })
}

fn boolean(value: &Value) -> Result<bool, EvalError> {
    value.as_bool().ok_or_else(|| EvalError::TypeMismatch {
        expected: "switch",
        found: value.kind().to_string(),
    })
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::analyzer::core::Parser;
    use crate::analyzer::parsers::expression::parse_expression;
    use crate::tokenizer::token::Tokenizer;

    fn expr(text: &str) -> Expression {
        let spans = Tokenizer::new().tokenize(text).unwrap();
        parse_expression().parse(&spans, 0).unwrap().1
    }

    fn eval(text: &str, env: &Bindings) -> Result<Value, EvalError> {
        Evaluator::new().evaluate(&expr(text), env, &mut StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_arithmetic() {
        let env = Bindings::new();
        assert_eq!(eval("1 + 2 * 3", &env), Ok(Value::Integer(7)));
        assert_eq!(eval("10 / 4", &env), Ok(Value::Integer(2)));
        assert_eq!(eval("10.0 / 4", &env), Ok(Value::Decimal(2.5)));
    }

    #[test]
    fn test_power_right_associative() {
        let env = Bindings::new();
        assert_eq!(eval("2 ^ 3 ^ 2", &env), Ok(Value::Integer(512)));
    }

    #[test]
    fn test_division_by_zero() {
        let env = Bindings::new();
        assert_eq!(eval("1 / 0", &env), Err(EvalError::DivisionByZero));
        assert_eq!(eval("1.5 / 0", &env), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn test_percent_literal() {
        let env = Bindings::new();
        assert_eq!(eval("90%", &env), Ok(Value::Percent(0.9)));
        // arithmetic uses the fraction and drops the tag
        assert_eq!(eval("90% * 200", &env), Ok(Value::Decimal(180.0)));
    }

    #[test]
    fn test_range_is_a_pair() {
        let env = Bindings::new();
        assert_eq!(eval("range(1, 10)", &env), Ok(Value::Range(1, 10)));

        let env = Bindings::new().with("r", Value::Range(1, 10));
        assert_eq!(eval("r.min", &env), Ok(Value::Integer(1)));
        assert_eq!(eval("r.max", &env), Ok(Value::Integer(10)));
    }

    #[test]
    fn test_comparisons_and_logic() {
        let env = Bindings::new().with("amount", Value::Integer(5));
        assert_eq!(eval("amount >= 5 and amount < 6", &env), Ok(Value::Boolean(true)));
        assert_eq!(eval("amount != 5 or amount = 5", &env), Ok(Value::Boolean(true)));
    }

    #[test]
    fn test_undefined_variable() {
        let env = Bindings::new();
        assert_eq!(
            eval("nothing + 1", &env),
            Err(EvalError::UndefinedVariable("nothing".to_string()))
        );
    }

    #[test]
    fn test_random_in_range_and_deterministic() {
        let env = Bindings::new();
        let a = eval("random range(1, 100)", &env).unwrap();
        let b = eval("random range(1, 100)", &env).unwrap();
        // same fixed seed, same draw
        assert_eq!(a, b);
        match a {
            Value::Integer(n) => assert!((1..=100).contains(&n)),
            other => panic!("expected integer, got {:?}", other),
        }
    }

    #[test]
    fn test_random_rejected_in_const_context() {
        let env = Bindings::new();
        let result = Evaluator::new().evaluate_const(&expr("random range(1, 6)"), &env);
        assert_eq!(result, Err(EvalError::NonConstant("random".to_string())));
    }

    #[test]
    fn test_duration() {
        let env = Bindings::new();
        assert_eq!(
            eval("4 hours", &env),
            Ok(Value::Duration(Duration::from_secs(4 * 3600)))
        );
        assert_eq!(
            eval("10 seconds", &env),
            Ok(Value::Duration(Duration::from_secs(10)))
        );
    }

    #[test]
    fn test_entity_path() {
        use std::collections::HashMap;

        use crate::store::Entity;

        let chest = Entity {
            id: "chest-1".to_string(),
            kind: "Chest".to_string(),
            owner: "alice".to_string(),
            attributes: HashMap::from([("opened".to_string(), Value::Boolean(false))]),
        };
        let env = Bindings::new().with("chest", Value::Entity(chest));
        assert_eq!(
            eval("chest.owner", &env),
            Ok(Value::Owner("alice".to_string()))
        );
        assert_eq!(eval("chest.opened = off", &env), Ok(Value::Boolean(true)));
        assert_eq!(
            eval("chest.missing", &env),
            Err(EvalError::InvalidPath("chest.missing".to_string()))
        );
    }
}
