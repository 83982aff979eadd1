//! Runtime values flowing through the evaluator

use std::fmt;

/// Why a value is an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Address text is empty or malformed
    InvalidAddress,
    /// Address coordinates or sheet do not exist
    AddressNotFound,
    /// Unknown function name
    NameNotFound,
    /// Operands of the wrong kind for an operator
    InvalidOperation,
    /// The function library rejected its arguments
    FunctionFailed,
    /// Operand stack invariant broken inside the evaluator
    InternalStackImbalance,
    /// A cell's formula depends on itself
    CircularReference,
    /// Reference chain nested deeper than the configured limit
    RecursionLimit,
    /// A referenced cell holds formula text that does not parse
    InvalidFormula,
    /// Division by zero
    DivisionByZero,
    /// A lookup found no match
    NotAvailable,
}

impl ErrorKind {
    /// Spreadsheet-style display code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidAddress | ErrorKind::AddressNotFound => "#REF!",
            ErrorKind::NameNotFound => "#NAME?",
            ErrorKind::InvalidOperation | ErrorKind::FunctionFailed => "#VALUE!",
            ErrorKind::InternalStackImbalance => "#INTERNAL!",
            ErrorKind::CircularReference => "#CIRC!",
            ErrorKind::RecursionLimit => "#DEPTH!",
            ErrorKind::InvalidFormula => "#PARSE!",
            ErrorKind::DivisionByZero => "#DIV/0!",
            ErrorKind::NotAvailable => "#N/A",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A value produced by evaluation
///
/// Values are immutable once produced and compare structurally.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// IEEE-754 double
    Number(f64),
    /// Text
    Text(String),
    /// TRUE / FALSE
    Boolean(bool),
    /// An error with its kind and a human-readable message
    Error(ErrorKind, String),
    /// A one-dimensional range, in storage order
    List(Vec<Value>),
    /// A two-dimensional range, row-major
    Matrix(Vec<Vec<Value>>),
}

impl Value {
    /// Build an error value
    pub fn error<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Value::Error(kind, message.into())
    }

    /// The error every failed lookup returns
    pub fn not_available() -> Self {
        Value::Error(ErrorKind::NotAvailable, "N/A".into())
    }

    /// Coerce raw cell text: numeric-looking text becomes a number, anything else text
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() && !raw.trim().is_empty() => Value::Number(n),
            _ => Value::Text(raw.to_string()),
        }
    }

    /// Whether this is an error value
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(..))
    }

    /// The error kind, if this is an error value
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Value::Error(kind, _) => Some(*kind),
            _ => None,
        }
    }

    /// Numeric view used by arithmetic: numbers as is, booleans as 1/0
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// IF condition semantics
    ///
    /// Errors are false, booleans are themselves, zero is false, the exact text
    /// `"FALSE"` is false, everything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Error(..) => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::Text(s) => s != "FALSE",
            Value::List(_) | Value::Matrix(_) => true,
        }
    }

    /// Scalar elements of a list or matrix in storage order; a scalar yields itself
    pub fn scalars(&self) -> Vec<&Value> {
        match self {
            Value::List(items) => items.iter().collect(),
            Value::Matrix(rows) => rows.iter().flatten().collect(),
            other => vec![other],
        }
    }

    /// Rows of a table-shaped argument
    ///
    /// A matrix is used as is, a list is read as a single column and a scalar as a
    /// 1x1 table.
    pub fn rows(&self) -> Vec<Vec<&Value>> {
        match self {
            Value::Matrix(rows) => rows.iter().map(|r| r.iter().collect()).collect(),
            Value::List(items) => items.iter().map(|v| vec![v]).collect(),
            other => vec![vec![other]],
        }
    }

    /// Type name for messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Boolean(_) => "boolean",
            Value::Error(..) => "error",
            Value::List(_) => "list",
            Value::Matrix(_) => "matrix",
        }
    }
}

/// Truthiness of a possibly absent value; absence is false
pub fn is_truthy(value: Option<&Value>) -> bool {
    value.is_some_and(Value::is_truthy)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Value::Error(kind, _) => f.write_str(kind.code()),
            Value::List(items) => {
                f.write_str("{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("}")
            }
            Value::Matrix(rows) => {
                f.write_str("{")?;
                for (r, row) in rows.iter().enumerate() {
                    if r > 0 {
                        f.write_str("; ")?;
                    }
                    for (c, item) in row.iter().enumerate() {
                        if c > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", item)?;
                    }
                }
                f.write_str("}")
            }
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}
