//! Answer comparator: expected vs. produced value sequences.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::language::Language;
use crate::languages;

/// First position at which two answer sequences disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerMismatch {
    pub index: usize,
    /// `None` when the expected sequence is shorter.
    pub expected: Option<Value>,
    /// `None` when the produced sequence is shorter.
    pub actual: Option<Value>,
}

impl std::fmt::Display for AnswerMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let show = |v: &Option<Value>| match v {
            Some(v) => v.to_string(),
            None => "<missing>".to_string(),
        };
        write!(
            f,
            "answer {}: expected {}, got {}",
            self.index,
            show(&self.expected),
            show(&self.actual)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Comparison {
    Equal,
    Mismatch(AnswerMismatch),
}

impl Comparison {
    pub fn is_equal(&self) -> bool {
        matches!(self, Comparison::Equal)
    }
}

/// Natural value equality: numbers compare numerically, containers
/// element-wise.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return x == y;
            }
            if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                return x == y;
            }
            match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Compare two answer sequences, reporting the first difference.
pub fn compare_answers(expected: &[Value], actual: &[Value]) -> Comparison {
    let len = expected.len().max(actual.len());
    for index in 0..len {
        let (e, a) = (expected.get(index), actual.get(index));
        let same = match (e, a) {
            (Some(e), Some(a)) => values_equal(e, a),
            _ => false,
        };
        if !same {
            return Comparison::Mismatch(AnswerMismatch {
                index,
                expected: e.cloned(),
                actual: a.cloned(),
            });
        }
    }
    Comparison::Equal
}

/// Turn an extracted literal into a comparable value.
///
/// Dialect-specific forms are tried first, then JSON; anything else is kept
/// as the raw text.
pub fn parse_answer_literal(expr: &str, language: Language) -> Value {
    let expr = expr.trim();
    if let Some(value) = languages::normalize_literal(language, expr) {
        return value;
    }
    serde_json::from_str(expr).unwrap_or_else(|_| Value::String(expr.to_string()))
}
