//! Query expression DSL.
//!
//! Filters and sort predicates are small expression trees built from
//! named constructors and evaluated lazily against each candidate record
//! during query iteration. Evaluation is total: a missing field degrades
//! to [`Value::Undefined`], which propagates through comparisons as falsy
//! instead of aborting iteration.
//!
//! ```
//! use strata_db::expr::Expr;
//!
//! // _model == "post" && pub_date >= "2024-01-01"
//! let filter = Expr::field("_model")
//!     .eq("post")
//!     .and(Expr::field("pub_date").ge("2024-01-01"));
//! # let _ = filter;
//! ```

use crate::record::Record;
use crate::value::Value;
use std::cmp::Ordering;

/// Comparison/combination operators of [`Expr::Binary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    /// Case-insensitive prefix test
    StartsWith,
    /// Case-insensitive suffix test
    EndsWith,
    /// Case-sensitive prefix test
    StartsWithCs,
    /// Case-sensitive suffix test
    EndsWithCs,
}

/// A lazy predicate/sort-key expression over record field values.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A constant value.
    Literal(Value),
    /// A record field reference, resolved per candidate at evaluation.
    Field(String),
    /// Two sub-expressions combined by an operator.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Membership test: `item in seq`.
    Contains { seq: Box<Expr>, item: Box<Expr> },
}

impl Expr {
    /// Reference a field of the record under evaluation.
    pub fn field(name: impl Into<String>) -> Expr {
        Expr::Field(name.into())
    }

    /// A constant.
    pub fn lit(value: impl Into<Value>) -> Expr {
        Expr::Literal(value.into())
    }

    /// A record used as a value: substitutes the record's `_id`, which is
    /// how containment against id lists is written.
    pub fn record(record: &Record) -> Expr {
        Expr::Literal(Value::String(record.id()))
    }

    fn binary(self, op: BinaryOp, other: impl Into<Expr>) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(other.into()),
        }
    }

    pub fn eq(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Eq, other)
    }

    pub fn ne(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Ne, other)
    }

    pub fn lt(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Lt, other)
    }

    pub fn le(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Le, other)
    }

    pub fn gt(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Gt, other)
    }

    pub fn ge(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Ge, other)
    }

    pub fn and(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::And, other)
    }

    pub fn or(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Or, other)
    }

    pub fn starts_with(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::StartsWith, other)
    }

    pub fn ends_with(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::EndsWith, other)
    }

    pub fn starts_with_cs(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::StartsWithCs, other)
    }

    pub fn ends_with_cs(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::EndsWithCs, other)
    }

    /// Membership: does the sequence this expression evaluates to contain
    /// the item?
    pub fn contains(self, item: impl Into<Expr>) -> Expr {
        Expr::Contains {
            seq: Box::new(self),
            item: Box::new(item.into()),
        }
    }

    /// Evaluate against a record. Total; never fails.
    pub fn evaluate(&self, record: &Record) -> Value {
        match self {
            Expr::Literal(value) => value.clone(),
            Expr::Field(name) => record.field(name),
            Expr::Binary { op, left, right } => {
                let l = left.evaluate(record);
                let r = right.evaluate(record);
                apply_binary(*op, l, r)
            }
            Expr::Contains { seq, item } => {
                let seq = seq.evaluate(record);
                let item = item.evaluate(record);
                evaluate_contains(seq, item)
            }
        }
    }
}

fn apply_binary(op: BinaryOp, l: Value, r: Value) -> Value {
    match op {
        BinaryOp::And => return Value::Bool(l.is_truthy() && r.is_truthy()),
        BinaryOp::Or => return Value::Bool(l.is_truthy() || r.is_truthy()),
        _ => {}
    }

    // An undefined operand propagates: the comparison is falsy but keeps
    // the reason for diagnostics.
    if let Value::Undefined(_) = l {
        return l;
    }
    if let Value::Undefined(_) = r {
        return r;
    }

    match op {
        BinaryOp::Eq => Value::Bool(l.raw_eq(&r)),
        BinaryOp::Ne => Value::Bool(!l.raw_eq(&r)),
        BinaryOp::Lt => cmp_result(l.raw_cmp(&r), |o| o == Ordering::Less),
        BinaryOp::Le => cmp_result(l.raw_cmp(&r), |o| o != Ordering::Greater),
        BinaryOp::Gt => cmp_result(l.raw_cmp(&r), |o| o == Ordering::Greater),
        BinaryOp::Ge => cmp_result(l.raw_cmp(&r), |o| o != Ordering::Less),
        BinaryOp::StartsWith => Value::Bool(
            l.to_display_string()
                .to_lowercase()
                .starts_with(&r.to_display_string().to_lowercase()),
        ),
        BinaryOp::EndsWith => Value::Bool(
            l.to_display_string()
                .to_lowercase()
                .ends_with(&r.to_display_string().to_lowercase()),
        ),
        BinaryOp::StartsWithCs => {
            Value::Bool(l.to_display_string().starts_with(&r.to_display_string()))
        }
        BinaryOp::EndsWithCs => {
            Value::Bool(l.to_display_string().ends_with(&r.to_display_string()))
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

fn cmp_result(ord: Option<Ordering>, check: impl FnOnce(Ordering) -> bool) -> Value {
    match ord {
        Some(ord) => Value::Bool(check(ord)),
        // Incomparable operands: the comparison is simply false.
        None => Value::Bool(false),
    }
}

fn evaluate_contains(seq: Value, item: Value) -> Value {
    match seq {
        Value::Undefined(_) => seq,
        Value::List(items) => Value::Bool(items.iter().any(|v| v.raw_eq(&item))),
        Value::String(s) => Value::Bool(s.contains(&item.to_display_string())),
        _ => Value::Bool(false),
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Literal(value)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::Literal(Value::from(s))
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr::Literal(Value::from(s))
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Expr::Literal(Value::from(b))
    }
}

impl From<i64> for Expr {
    fn from(i: i64) -> Self {
        Expr::Literal(Value::from(i))
    }
}

impl From<f64> for Expr {
    fn from(f: f64) -> Self {
        Expr::Literal(Value::from(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Record, RecordKind};
    use crate::value::Value;
    use std::collections::BTreeMap;

    fn test_record(fields: &[(&str, Value)]) -> Record {
        let mut data = BTreeMap::new();
        data.insert("_path".to_string(), Value::from("/test"));
        data.insert("_id".to_string(), Value::from("test"));
        for (k, v) in fields {
            data.insert(k.to_string(), v.clone());
        }
        Record::new(RecordKind::Page, data)
    }

    #[test]
    fn test_field_eq() {
        let record = test_record(&[("title", Value::from("Hello"))]);
        assert!(Expr::field("title").eq("Hello").evaluate(&record).is_truthy());
        assert!(!Expr::field("title").eq("Other").evaluate(&record).is_truthy());
    }

    #[test]
    fn test_missing_field_is_falsy() {
        let record = test_record(&[]);
        let result = Expr::field("nope").eq("x").evaluate(&record);
        assert!(result.is_undefined());
        assert!(!result.is_truthy());
        // Ne with an undefined side is falsy too, not vacuously true.
        assert!(!Expr::field("nope").ne("x").evaluate(&record).is_truthy());
    }

    #[test]
    fn test_ordering_ops() {
        let record = test_record(&[("count", Value::Int(5))]);
        assert!(Expr::field("count").gt(3i64).evaluate(&record).is_truthy());
        assert!(Expr::field("count").le(5i64).evaluate(&record).is_truthy());
        assert!(!Expr::field("count").lt(5i64).evaluate(&record).is_truthy());
    }

    #[test]
    fn test_logical_ops() {
        let record = test_record(&[("a", Value::Bool(true)), ("b", Value::Bool(false))]);
        let a = || Expr::field("a");
        let b = || Expr::field("b");
        assert!(!a().and(b()).evaluate(&record).is_truthy());
        assert!(a().or(b()).evaluate(&record).is_truthy());
        // Undefined operand is falsy inside logic.
        assert!(!Expr::field("nope").and(a()).evaluate(&record).is_truthy());
    }

    #[test]
    fn test_prefix_suffix() {
        let record = test_record(&[("title", Value::from("Hello World"))]);
        assert!(Expr::field("title").starts_with("hello").evaluate(&record).is_truthy());
        assert!(!Expr::field("title")
            .starts_with_cs("hello")
            .evaluate(&record)
            .is_truthy());
        assert!(Expr::field("title").ends_with("WORLD").evaluate(&record).is_truthy());
    }

    #[test]
    fn test_contains() {
        let record = test_record(&[(
            "tags",
            Value::List(vec![Value::from("rust"), Value::from("web")]),
        )]);
        assert!(Expr::field("tags").contains("rust").evaluate(&record).is_truthy());
        assert!(!Expr::field("tags").contains("go").evaluate(&record).is_truthy());
        // String containment is substring search.
        let record = test_record(&[("title", Value::from("Hello World"))]);
        assert!(Expr::field("title").contains("lo W").evaluate(&record).is_truthy());
    }

    #[test]
    fn test_record_item_uses_id() {
        let other = test_record(&[]);
        let record = test_record(&[("related", Value::List(vec![Value::from("test")]))]);
        assert!(Expr::field("related")
            .contains(Expr::record(&other))
            .evaluate(&record)
            .is_truthy());
    }
}
