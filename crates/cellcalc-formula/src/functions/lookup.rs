//! Lookup functions
//!
//! A miss is the value [`Value::not_available`], never an `Err`.

use std::cmp::Ordering;

use super::{first_error, number_arg, FunctionResult};
use crate::error::FunctionError;
use crate::value::{ErrorKind, Value};

fn to_i64_trunc(function: &str, v: &Value) -> Result<i64, FunctionError> {
    Ok(number_arg(function, v)?.trunc() as i64)
}

/// Equality used by exact matches: text is case-insensitive, numeric text equals its number
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Text(x), Value::Text(y)) => x.eq_ignore_ascii_case(y),

        (Value::Number(x), Value::Text(s)) | (Value::Text(s), Value::Number(x)) => {
            s.trim().parse::<f64>().ok().is_some_and(|n| n == *x)
        }

        _ => false,
    }
}

/// Ordering used by approximate matches; values of different kinds do not compare
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y),
        (Value::Boolean(x), Value::Boolean(y)) => Some(x.cmp(y)),
        (Value::Text(x), Value::Text(y)) => {
            Some(x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase()))
        }
        _ => None,
    }
}

/// VLOOKUP(lookup_value, table, col_index, [exact])
///
/// A false or zero fourth argument asks for an exact match. Otherwise the last
/// row whose key is less than or equal to the lookup value wins.
pub fn fn_vlookup(args: &[Value]) -> FunctionResult {
    let lookup_value = &args[0];
    let table = &args[1];
    for v in [lookup_value, &args[2]] {
        if v.is_error() {
            return Ok(v.clone());
        }
    }
    if table.is_error() {
        return Ok(table.clone());
    }
    if matches!(lookup_value, Value::List(_) | Value::Matrix(_)) {
        return Err(FunctionError::Argument(
            "VLOOKUP lookup value must be a single value".into(),
        ));
    }

    let col = to_i64_trunc("VLOOKUP", &args[2])?;
    let exact = match args.get(3) {
        Some(v) if v.is_error() => return Ok(v.clone()),
        Some(v) => !v.is_truthy(),
        None => false,
    };

    let rows = table.rows();
    let width = rows.first().map(Vec::len).unwrap_or(0);
    if col < 1 || col as usize > width {
        return Err(FunctionError::Argument(format!(
            "VLOOKUP column {} is outside a table {} columns wide",
            col, width
        )));
    }
    let col = (col - 1) as usize;

    let found = if exact {
        rows.iter()
            .find(|row| row.first().is_some_and(|key| values_equal(key, lookup_value)))
    } else {
        rows.iter().rev().find(|row| {
            row.first().is_some_and(|key| {
                matches!(
                    compare_values(key, lookup_value),
                    Some(Ordering::Less | Ordering::Equal)
                )
            })
        })
    };

    Ok(found
        .and_then(|row| row.get(col))
        .map(|v| (*v).clone())
        .unwrap_or_else(Value::not_available))
}

/// MATCH(lookup_value, lookup_array, [match_type])
///
/// - `0`: first position equal to the value
/// - `1` (default): position of the largest value less than or equal to it
/// - `-1`: position of the smallest value greater than or equal to it
///
/// Positions are 1-based. Ties go to the earliest position.
pub fn fn_match(args: &[Value]) -> FunctionResult {
    if let Some(err) = first_error(&args[..1]) {
        return Ok(err);
    }
    if args[1].is_error() {
        return Ok(args[1].clone());
    }
    let lookup_value = &args[0];
    if matches!(lookup_value, Value::List(_) | Value::Matrix(_)) {
        return Err(FunctionError::Argument(
            "MATCH lookup value must be a single value".into(),
        ));
    }

    let match_type = match args.get(2) {
        Some(v) if v.is_error() => return Ok(v.clone()),
        Some(v) => to_i64_trunc("MATCH", v)?.signum(),
        None => 1,
    };

    // MATCH expects a vector (single row or single column)
    let items: Vec<&Value> = match &args[1] {
        Value::Matrix(rows) if rows.len() == 1 => rows[0].iter().collect(),
        Value::Matrix(rows) if rows.iter().all(|r| r.len() == 1) => {
            rows.iter().filter_map(|r| r.first()).collect()
        }
        Value::Matrix(_) => return Ok(Value::not_available()),
        other => other.scalars(),
    };

    let position = match match_type {
        0 => items.iter().position(|v| values_equal(v, lookup_value)),
        1 => best_position(&items, lookup_value, Ordering::Less),
        _ => best_position(&items, lookup_value, Ordering::Greater),
    };

    Ok(position
        .map(|i| Value::Number((i + 1) as f64))
        .unwrap_or_else(Value::not_available))
}

/// Position of the candidate closest to `target` from the `side` direction, or equal to it
fn best_position(items: &[&Value], target: &Value, side: Ordering) -> Option<usize> {
    let mut best: Option<(usize, &Value)> = None;
    for (i, item) in items.iter().enumerate() {
        match compare_values(item, target) {
            Some(Ordering::Equal) => return Some(i),
            Some(o) if o == side => {}
            _ => continue,
        }
        let better = match best {
            None => true,
            Some((_, current)) => compare_values(item, current) == Some(side.reverse()),
        };
        if better {
            best = Some((i, *item));
        }
    }
    best.map(|(i, _)| i)
}

/// INDEX(array, row_num, [column_num])
///
/// A one-dimensional range can be indexed by its single position.
pub fn fn_index(args: &[Value]) -> FunctionResult {
    // Propagate errors in the position arguments
    for v in &args[1..] {
        if v.is_error() {
            return Ok(v.clone());
        }
    }
    let array = &args[0];
    if array.is_error() {
        return Ok(array.clone());
    }

    let row_num = to_i64_trunc("INDEX", &args[1])?;
    let col_num = match args.get(2) {
        Some(v) => to_i64_trunc("INDEX", v)?,
        None => 1,
    };
    if row_num < 1 || col_num < 1 {
        return Err(FunctionError::Argument(
            "INDEX positions start at 1".into(),
        ));
    }
    let (r, c) = ((row_num - 1) as usize, (col_num - 1) as usize);

    let item = match array {
        Value::List(items) => match (r, c) {
            (i, 0) | (0, i) => items.get(i),
            _ => None,
        },
        Value::Matrix(rows) => rows.get(r).and_then(|row| row.get(c)),
        scalar => (r == 0 && c == 0).then_some(scalar),
    };

    Ok(item.cloned().unwrap_or_else(|| {
        Value::error(
            ErrorKind::AddressNotFound,
            format!("INDEX({}, {}) is outside the array", row_num, col_num),
        )
    }))
}
