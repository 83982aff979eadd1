//! Logical functions

use super::{first_error, FunctionResult};
use crate::error::FunctionError;
use crate::value::Value;

/// Logical view of one scalar
///
/// Direct text must spell TRUE or FALSE; text inside a range is skipped.
fn logical(value: &Value, direct: bool, function: &str) -> Result<Option<bool>, FunctionError> {
    match value {
        Value::Boolean(b) => Ok(Some(*b)),
        Value::Number(n) => Ok(Some(*n != 0.0)),
        Value::Text(s) if direct => {
            if s.eq_ignore_ascii_case("TRUE") {
                Ok(Some(true))
            } else if s.eq_ignore_ascii_case("FALSE") {
                Ok(Some(false))
            } else {
                Err(FunctionError::Argument(format!(
                    "{} cannot use text '{}' as a logical value",
                    function, s
                )))
            }
        }
        _ => Ok(None),
    }
}

fn logicals(args: &[Value], function: &str) -> Result<Vec<bool>, FunctionError> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            Value::List(_) | Value::Matrix(_) => {
                for v in arg.scalars() {
                    if let Some(b) = logical(v, false, function)? {
                        out.push(b);
                    }
                }
            }
            other => {
                if let Some(b) = logical(other, true, function)? {
                    out.push(b);
                }
            }
        }
    }
    if out.is_empty() {
        return Err(FunctionError::Argument(format!(
            "{} has no logical values",
            function
        )));
    }
    Ok(out)
}

/// AND(logical1, ...)
pub fn fn_and(args: &[Value]) -> FunctionResult {
    if let Some(err) = first_error(args) {
        return Ok(err);
    }
    Ok(Value::Boolean(logicals(args, "AND")?.into_iter().all(|b| b)))
}

/// OR(logical1, ...)
pub fn fn_or(args: &[Value]) -> FunctionResult {
    if let Some(err) = first_error(args) {
        return Ok(err);
    }
    Ok(Value::Boolean(logicals(args, "OR")?.into_iter().any(|b| b)))
}

/// NOT(logical)
pub fn fn_not(args: &[Value]) -> FunctionResult {
    match &args[0] {
        err @ Value::Error(..) => Ok(err.clone()),
        Value::List(_) | Value::Matrix(_) => Err(FunctionError::Argument(
            "NOT expects a single value".into(),
        )),
        other => match logical(other, true, "NOT")? {
            Some(b) => Ok(Value::Boolean(!b)),
            None => Err(FunctionError::Argument("NOT expects a logical value".into())),
        },
    }
}

/// IFERROR(value, value_if_error)
pub fn fn_iferror(args: &[Value]) -> FunctionResult {
    match &args[0] {
        Value::Error(..) => Ok(args[1].clone()),
        value => Ok(value.clone()),
    }
}
