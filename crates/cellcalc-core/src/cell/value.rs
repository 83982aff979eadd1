//! Cell value types

use std::fmt;

/// What a cell holds
///
/// Formula cells keep their text (with the leading `=`); they are evaluated on
/// demand and never cache a result.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Boolean(bool),
    Number(f64),
    String(String),
    /// Formula text, e.g. "=SUM(A1:A10)"
    Formula(String),
}

impl CellValue {
    pub fn string<S: Into<String>>(s: S) -> Self {
        CellValue::String(s.into())
    }

    /// Formula cell, adding the leading `=` when missing
    pub fn formula<S: Into<String>>(text: S) -> Self {
        let text = text.into();
        match text.starts_with('=') {
            true => CellValue::Formula(text),
            false => CellValue::Formula(format!("={}", text)),
        }
    }

    /// Interpret raw user text the way a spreadsheet input box does
    ///
    /// `=...` is a formula, numeric text is a number, `""` is empty, anything
    /// else is a string.
    pub fn from_raw(raw: &str) -> Self {
        if raw.starts_with('=') {
            CellValue::Formula(raw.to_string())
        } else if raw.is_empty() {
            CellValue::Empty
        } else {
            match raw.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => CellValue::Number(n),
                _ => CellValue::String(raw.to_string()),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Raw text of a literal cell; `None` for formulas
    ///
    /// Numbers use the shortest round-trip form, booleans are `TRUE`/`FALSE`
    /// and empty cells are the empty string.
    pub fn raw_text(&self) -> Option<String> {
        match self {
            CellValue::Formula(_) => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Boolean(true) => f.write_str("TRUE"),
            CellValue::Boolean(false) => f.write_str("FALSE"),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::String(s) | CellValue::Formula(s) => f.write_str(s),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cell_value_conversions() {
        assert_eq!(CellValue::from(42), CellValue::Number(42.0));
        assert_eq!(CellValue::from(true), CellValue::Boolean(true));
        assert_eq!(CellValue::from("hi"), CellValue::String("hi".into()));
        assert_eq!(CellValue::formula("A1+1"), CellValue::Formula("=A1+1".into()));
    }

    #[test]
    fn test_from_raw() {
        assert_eq!(CellValue::from_raw("12.5"), CellValue::Number(12.5));
        assert_eq!(CellValue::from_raw(" 3 "), CellValue::Number(3.0));
        assert_eq!(CellValue::from_raw("Cheap"), CellValue::string("Cheap"));
        assert_eq!(CellValue::from_raw("NaN"), CellValue::string("NaN"));
        assert_eq!(CellValue::from_raw("=B2*2"), CellValue::formula("=B2*2"));
        assert_eq!(CellValue::from_raw(""), CellValue::Empty);
        assert!(CellValue::from_raw("").is_empty());
    }

    #[test]
    fn test_raw_text() {
        assert_eq!(CellValue::Number(10.0).raw_text().as_deref(), Some("10"));
        assert_eq!(CellValue::Number(2.5).raw_text().as_deref(), Some("2.5"));
        assert_eq!(CellValue::Boolean(false).raw_text().as_deref(), Some("FALSE"));
        assert_eq!(CellValue::Empty.raw_text().as_deref(), Some(""));
        assert_eq!(CellValue::formula("=1").raw_text(), None);
    }
}
