//! Cross-type comparator for record ordering.
//!
//! Sorting and ordered comparisons coerce across value types so that
//! content authors get a usable order without declaring field types:
//! strings compare case- and diacritic-insensitively, numbers compare
//! against their string representations, undefined sorts before anything
//! defined, and genuinely incomparable values compare equal to keep the
//! sort total.

use std::cmp::Ordering;

use unicode_normalization::UnicodeNormalization;

use crate::value::Value;

/// Normalize a string for ordering: Unicode canonical decomposition,
/// lowercased and trimmed, so case and diacritics do not affect order.
pub fn sort_normalize_string(s: &str) -> String {
    s.trim().to_lowercase().nfd().collect()
}

/// One entry of a record's sort key: the field value plus the per-field
/// reverse flag (`-field` in an order-by spec).
#[derive(Debug, Clone)]
pub struct SortKey {
    pub value: Value,
    pub reverse: bool,
}

impl SortKey {
    pub fn new(value: Value, reverse: bool) -> Self {
        Self { value, reverse }
    }
}

/// Coercing comparison used for ordering. Always total: incomparable
/// operands arbitrate to `Equal` rather than failing.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    // Strings compare under normalization.
    if let (Value::String(a), Value::String(b)) = (a, b) {
        return sort_normalize_string(a).cmp(&sort_normalize_string(b));
    }

    // Same-variant values compare natively.
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => return a.cmp(b),
        (Value::Int(a), Value::Int(b)) => return a.cmp(b),
        (Value::Float(a), Value::Float(b)) => {
            return a.partial_cmp(b).unwrap_or(Ordering::Equal)
        }
        (Value::List(a), Value::List(b)) => {
            for (x, y) in a.iter().zip(b) {
                let ord = compare_values(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            return a.len().cmp(&b.len());
        }
        _ => {}
    }

    // Undefined behaves like a None sentinel: before everything defined.
    match (a.is_undefined(), b.is_undefined()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }

    // Numeric against non-numeric: coerce the other side when possible.
    let a_numeric = matches!(a, Value::Int(_) | Value::Float(_));
    let b_numeric = matches!(b, Value::Int(_) | Value::Float(_));
    if a_numeric || b_numeric {
        if let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) {
            return a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        }
    }

    // Incomparable types arbitrate as equal to keep the sort stable.
    Ordering::Equal
}

/// Compare two multi-field sort keys entry by entry, honoring each
/// entry's reverse flag.
pub fn compare_keys(a: &[SortKey], b: &[SortKey]) -> Ordering {
    for (ka, kb) in a.iter().zip(b) {
        let mut ord = compare_values(&ka.value, &kb.value);
        if ka.reverse {
            ord = ord.reverse();
        }
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_normalization() {
        assert_eq!(sort_normalize_string("  Ärger "), sort_normalize_string("ärger"));
        assert_eq!(
            compare_values(&Value::from("Alpha"), &Value::from("alpha")),
            Ordering::Equal
        );
        assert_eq!(
            compare_values(&Value::from("Alpha"), &Value::from("beta")),
            Ordering::Less
        );
    }

    #[test]
    fn test_undefined_sorts_first() {
        assert_eq!(
            compare_values(&Value::undefined("x"), &Value::Int(0)),
            Ordering::Less
        );
        assert_eq!(
            compare_values(&Value::undefined("x"), &Value::undefined("y")),
            Ordering::Equal
        );
    }

    #[test]
    fn test_numeric_coercion() {
        // A number against its own string representation orders the same
        // as the two numbers directly.
        assert_eq!(
            compare_values(&Value::Int(10), &Value::from("9")),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(&Value::from("2.5"), &Value::Float(3.0)),
            Ordering::Less
        );
    }

    #[test]
    fn test_incomparable_is_equal() {
        assert_eq!(
            compare_values(&Value::Bool(true), &Value::from("yes")),
            Ordering::Equal
        );
    }

    #[test]
    fn test_compare_keys_reverse() {
        let a = vec![
            SortKey::new(Value::from("Beta"), true),
            SortKey::new(Value::Int(1), false),
        ];
        let b = vec![
            SortKey::new(Value::from("Alpha"), true),
            SortKey::new(Value::Int(2), false),
        ];
        // Reverse flag on the first field flips Beta > Alpha to Less.
        assert_eq!(compare_keys(&a, &b), Ordering::Less);

        let a = vec![SortKey::new(Value::from("Same"), true), a[1].clone()];
        let b = vec![SortKey::new(Value::from("same"), true), b[1].clone()];
        // Ties fall through to the second, non-reversed field.
        assert_eq!(compare_keys(&a, &b), Ordering::Less);
    }
}
