//! Numeric vs categorical column classification

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// How a column's values are plotted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Every value is absent or a number
    Numeric,
    /// At least one value is not a number
    Categorical,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric => f.write_str("numeric"),
            Self::Categorical => f.write_str("categorical"),
        }
    }
}

/// Whether a value counts as missing
#[inline]
#[must_use]
pub fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Numeric reading of a value
///
/// Numbers, and strings that parse as numbers (`"inf"`, `"-inf"` and `"nan"`
/// included).
#[must_use]
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Category label of a value
#[must_use]
pub fn as_category(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Classify a column
///
/// Numeric iff every value is absent or numeric; an all-absent column is
/// numeric.
pub fn classify<'a>(values: impl IntoIterator<Item = &'a Value>) -> ColumnKind {
    let numeric = values
        .into_iter()
        .all(|v| is_absent(v) || as_number(v).is_some());
    if numeric {
        ColumnKind::Numeric
    } else {
        ColumnKind::Categorical
    }
}

/// Distinct non-absent category labels in first-seen order
pub fn categories<'a>(values: impl IntoIterator<Item = &'a Value>) -> Vec<String> {
    values
        .into_iter()
        .filter(|v| !is_absent(v))
        .map(as_category)
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn special_floats_are_numeric() {
        let values = [json!("inf"), json!("-inf"), json!("nan"), json!(" 2.5 "), json!(1)];
        assert_eq!(classify(&values), ColumnKind::Numeric);
        assert_eq!(as_number(&json!("-inf")), Some(f64::NEG_INFINITY));
        assert!(as_number(&json!("nan")).is_some_and(f64::is_nan));
    }

    #[test]
    fn absent_values_do_not_decide() {
        assert_eq!(classify(&[Value::Null, json!(""), json!(3)]), ColumnKind::Numeric);
        assert_eq!(classify(&Vec::<Value>::new()), ColumnKind::Numeric);
    }

    #[test]
    fn any_label_makes_it_categorical() {
        assert_eq!(classify(&[json!(1), json!("high")]), ColumnKind::Categorical);
        assert_eq!(classify(&[json!(true)]), ColumnKind::Categorical);
    }

    #[test]
    fn categories_keep_first_seen_order() {
        let values = [json!("b"), json!("a"), Value::Null, json!("b"), json!(3)];
        assert_eq!(categories(&values), vec!["b", "a", "3"]);
    }

    proptest! {
        #[test]
        fn prop_finite_numbers_are_numeric(xs in prop::collection::vec(-1e9f64..1e9, 0..20)) {
            let values: Vec<Value> = xs.iter().map(|x| json!(x)).collect();
            prop_assert_eq!(classify(&values), ColumnKind::Numeric);
        }

        #[test]
        fn prop_numeric_strings_are_numeric(xs in prop::collection::vec(-1e9f64..1e9, 0..20)) {
            let values: Vec<Value> = xs.iter().map(|x| json!(x.to_string())).collect();
            prop_assert_eq!(classify(&values), ColumnKind::Numeric);
        }
    }
}
