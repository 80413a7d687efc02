//! Field values.
//!
//! Record fields are a small closed sum type. Missing or uncomputable
//! values are an explicit [`Value::Undefined`] variant carrying a
//! human-readable reason; it participates in filters and ordering as
//! falsy rather than aborting evaluation.

use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// A record field value.
///
/// The derived `PartialEq` is structural (two undefineds with the same
/// reason are equal); the DSL's looser [`Value::raw_eq`] is separate.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent or uncomputable value; the string is a human-readable reason.
    Undefined(String),
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Structured value produced by the datamodel (e.g. a list field).
    List(Vec<Value>),
}

impl Value {
    /// An undefined value with a reason.
    pub fn undefined(reason: impl Into<String>) -> Self {
        Value::Undefined(reason.into())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined(_))
    }

    /// Truthiness used by filter evaluation: undefined, `false`, zero and
    /// empty containers are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined(_) => false,
            Value::String(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::List(items) => !items.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The value rendered as a string, the way templates would see it.
    /// Undefined renders empty.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Undefined(_) => String::new(),
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::List(items) => items
                .iter()
                .map(|v| v.to_display_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Numeric view of the value, coercing parseable strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Raw equality as used by the expression DSL. Undefined never equals
    /// anything, numeric variants compare across int/float.
    pub fn raw_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined(_), _) | (_, Value::Undefined(_)) => false,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.raw_eq(y))
            }
            _ => false,
        }
    }

    /// Raw ordering as used by the expression DSL's comparison operators.
    /// Returns `None` for incomparable operands (including undefined).
    pub fn raw_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Undefined(_), _) | (_, Value::Undefined(_)) => None,
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (a, b) => {
                let (a, b) = (a.as_f64()?, b.as_f64()?);
                a.partial_cmp(&b)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined(_) => serializer.serialize_none(),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::undefined("missing").is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(Value::String("x".into()).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
    }

    #[test]
    fn test_raw_eq_cross_numeric() {
        assert!(Value::Int(2).raw_eq(&Value::Float(2.0)));
        assert!(!Value::Int(2).raw_eq(&Value::String("2".into())));
        assert!(!Value::undefined("x").raw_eq(&Value::undefined("x")));
    }

    #[test]
    fn test_raw_cmp() {
        assert_eq!(
            Value::Int(1).raw_cmp(&Value::Float(2.0)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::String("a".into()).raw_cmp(&Value::String("b".into())),
            Some(Ordering::Less)
        );
        // Numeric vs parseable string coerces
        assert_eq!(
            Value::Int(10).raw_cmp(&Value::String("9".into())),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::undefined("x").raw_cmp(&Value::Int(1)), None);
    }
}
