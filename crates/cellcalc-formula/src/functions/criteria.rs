//! COUNTIF criteria
//!
//! A criteria is an optional comparison prefix (`=`, `<>`, `<`, `<=`, `>`,
//! `>=`) followed by an operand. Numeric operands compare against numbers and
//! booleans; anything else compares case-insensitively against text, where
//! `=` and `<>` honour `*` and `?` wildcards. An empty criteria matches only
//! empty text.

use std::cmp::Ordering;

use crate::value::Value;

const EPSILON: f64 = 1e-10;

/// Longest prefix first so `>=` is not read as `>`
const OPERATORS: [(&str, Op); 6] = [
    (">=", Op::Ge),
    ("<=", Op::Le),
    ("<>", Op::Ne),
    (">", Op::Gt),
    ("<", Op::Lt),
    ("=", Op::Eq),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Op::Eq => ordering.is_eq(),
            Op::Ne => ordering.is_ne(),
            Op::Lt => ordering.is_lt(),
            Op::Le => ordering.is_le(),
            Op::Gt => ordering.is_gt(),
            Op::Ge => ordering.is_ge(),
        }
    }
}

#[derive(Debug)]
enum Operand {
    Number(f64),
    /// Lower-cased
    Text(Vec<char>),
}

/// A parsed criteria, applied cell by cell
#[derive(Debug)]
pub struct CriteriaMatcher {
    op: Op,
    /// `None` for the blank criteria
    operand: Option<Operand>,
}

impl CriteriaMatcher {
    /// Parse a scalar criteria; lists, matrices and errors give `None`
    pub fn new(criteria: &Value) -> Option<Self> {
        let operand = match criteria {
            Value::Number(n) => Operand::Number(*n),
            Value::Boolean(b) => Operand::Number(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => return Some(Self::parse(s)),
            Value::Error(..) | Value::List(_) | Value::Matrix(_) => return None,
        };
        Some(Self {
            op: Op::Eq,
            operand: Some(operand),
        })
    }

    fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return Self {
                op: Op::Eq,
                operand: None,
            };
        }

        let (op, rest) = OPERATORS
            .iter()
            .find_map(|(prefix, op)| text.strip_prefix(prefix).map(|rest| (*op, rest.trim())))
            .unwrap_or((Op::Eq, text));
        let operand = match rest.parse::<f64>() {
            Ok(n) => Operand::Number(n),
            Err(_) => Operand::Text(rest.to_lowercase().chars().collect()),
        };
        Self {
            op,
            operand: Some(operand),
        }
    }

    /// Error cells never match
    pub fn matches(&self, value: &Value) -> bool {
        if value.is_error() {
            return false;
        }
        let Some(operand) = &self.operand else {
            return matches!(value, Value::Text(s) if s.is_empty());
        };

        let ordering = match operand {
            Operand::Number(target) => numeric(value).map(|n| compare_numbers(n, *target)),
            Operand::Text(pattern) => {
                textual(value).map(|text| self.compare_text(&text, pattern))
            }
        };
        // A cell of the wrong kind is only ever "not equal"
        ordering.map_or(self.op == Op::Ne, |ordering| self.op.holds(ordering))
    }

    fn compare_text(&self, text: &[char], pattern: &[char]) -> Ordering {
        match self.op {
            Op::Eq | Op::Ne if wildcard_match(pattern, text) => Ordering::Equal,
            Op::Eq | Op::Ne => Ordering::Less,
            _ => text.cmp(pattern),
        }
    }
}

/// Text "5" is not the number 5
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(_) | Value::Boolean(_) => value.as_number(),
        _ => None,
    }
}

fn textual(value: &Value) -> Option<Vec<char>> {
    match value {
        Value::Text(_) | Value::Boolean(_) => {
            Some(value.to_string().to_lowercase().chars().collect())
        }
        _ => None,
    }
}

fn compare_numbers(n: f64, target: f64) -> Ordering {
    if (n - target).abs() < EPSILON {
        Ordering::Equal
    } else {
        n.total_cmp(&target)
    }
}

/// `*` matches any run of characters, `?` exactly one
fn wildcard_match(pattern: &[char], text: &[char]) -> bool {
    match (pattern.split_first(), text.split_first()) {
        (None, _) => text.is_empty(),
        (Some(('*', rest)), _) => {
            wildcard_match(rest, text) || (!text.is_empty() && wildcard_match(pattern, &text[1..]))
        }
        (Some(('?', rest)), Some((_, tail))) => wildcard_match(rest, tail),
        (Some((p, rest)), Some((t, tail))) if p == t => wildcard_match(rest, tail),
        _ => false,
    }
}
