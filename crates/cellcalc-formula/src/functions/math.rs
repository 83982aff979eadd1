//! Math functions

use super::{first_error, number_arg, FunctionResult};
use crate::error::FunctionError;
use crate::value::{ErrorKind, Value};

/// Numbers an aggregate sees
///
/// Direct arguments count when they are numbers, booleans or numeric text.
/// Inside lists and matrices only numbers count; text and booleans are skipped.
fn aggregate_numbers(args: &[Value]) -> Vec<f64> {
    let mut numbers = Vec::new();
    for arg in args {
        match arg {
            Value::Number(n) => numbers.push(*n),
            Value::Boolean(b) => numbers.push(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => {
                if let Ok(n) = s.trim().parse::<f64>() {
                    numbers.push(n);
                }
            }
            Value::List(_) | Value::Matrix(_) => {
                numbers.extend(arg.scalars().into_iter().filter_map(|v| match v {
                    Value::Number(n) => Some(*n),
                    _ => None,
                }));
            }
            Value::Error(..) => {}
        }
    }
    numbers
}

/// SUM(value1, ...)
pub fn fn_sum(args: &[Value]) -> FunctionResult {
    if let Some(err) = first_error(args) {
        return Ok(err);
    }
    Ok(Value::Number(aggregate_numbers(args).iter().sum()))
}

/// AVERAGE(value1, ...)
pub fn fn_average(args: &[Value]) -> FunctionResult {
    if let Some(err) = first_error(args) {
        return Ok(err);
    }
    let numbers = aggregate_numbers(args);
    if numbers.is_empty() {
        return Ok(Value::error(
            ErrorKind::DivisionByZero,
            "AVERAGE has no numbers",
        ));
    }
    Ok(Value::Number(
        numbers.iter().sum::<f64>() / numbers.len() as f64,
    ))
}

/// MIN(value1, ...); zero when there are no numbers
pub fn fn_min(args: &[Value]) -> FunctionResult {
    if let Some(err) = first_error(args) {
        return Ok(err);
    }
    let min = aggregate_numbers(args).into_iter().reduce(f64::min);
    Ok(Value::Number(min.unwrap_or(0.0)))
}

/// MAX(value1, ...); zero when there are no numbers
pub fn fn_max(args: &[Value]) -> FunctionResult {
    if let Some(err) = first_error(args) {
        return Ok(err);
    }
    let max = aggregate_numbers(args).into_iter().reduce(f64::max);
    Ok(Value::Number(max.unwrap_or(0.0)))
}

/// COUNT(value1, ...) - counts numbers; errors are not counted and do not propagate
pub fn fn_count(args: &[Value]) -> FunctionResult {
    let count = args
        .iter()
        .flat_map(Value::scalars)
        .filter(|v| matches!(v, Value::Number(_)))
        .count();
    Ok(Value::Number(count as f64))
}

/// ABS(number)
pub fn fn_abs(args: &[Value]) -> FunctionResult {
    if let Some(err) = first_error(args) {
        return Ok(err);
    }
    Ok(Value::Number(number_arg("ABS", &args[0])?.abs()))
}

/// ROUND(number, [num_digits])
///
/// Rounds half away from zero; negative digits round to the left of the point.
pub fn fn_round(args: &[Value]) -> FunctionResult {
    if let Some(err) = first_error(args) {
        return Ok(err);
    }
    let number = number_arg("ROUND", &args[0])?;
    let digits = match args.get(1) {
        Some(v) => number_arg("ROUND", v)?.trunc() as i32,
        None => 0,
    };

    let result = if digits >= 0 {
        let multiplier = 10_f64.powi(digits);
        (number * multiplier).round() / multiplier
    } else {
        let divisor = 10_f64.powi(-digits);
        (number / divisor).round() * divisor
    };
    Ok(Value::Number(result))
}

/// FLOOR(number, [significance])
///
/// Rounds down to the nearest multiple of `significance` (default 1).
pub fn fn_floor(args: &[Value]) -> FunctionResult {
    if let Some(err) = first_error(args) {
        return Ok(err);
    }
    let number = number_arg("FLOOR", &args[0])?;
    let significance = match args.get(1) {
        Some(v) => number_arg("FLOOR", v)?,
        None => 1.0,
    };

    if significance == 0.0 {
        if number == 0.0 {
            return Ok(Value::Number(0.0));
        }
        return Ok(Value::error(
            ErrorKind::DivisionByZero,
            "FLOOR significance is zero",
        ));
    }
    if number > 0.0 && significance < 0.0 {
        return Err(FunctionError::Argument(
            "FLOOR significance must be positive for a positive number".into(),
        ));
    }

    Ok(Value::Number((number / significance).floor() * significance))
}

/// POWER(number, power)
pub fn fn_power(args: &[Value]) -> FunctionResult {
    if let Some(err) = first_error(args) {
        return Ok(err);
    }
    let number = number_arg("POWER", &args[0])?;
    let power = number_arg("POWER", &args[1])?;

    let result = number.powf(power);
    // Cases like 0^(-1) or negative^(non-integer)
    if !result.is_finite() {
        return Err(FunctionError::Argument(format!(
            "POWER({}, {}) is not a finite number",
            number, power
        )));
    }
    Ok(Value::Number(result))
}
