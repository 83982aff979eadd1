//! Statistical functions

use super::criteria::CriteriaMatcher;
use super::FunctionResult;
use crate::error::FunctionError;
use crate::value::Value;

/// COUNTIF(range, criteria) - counts cells in a range that meet a criteria
///
/// Error cells in the range never match; an error as the criteria propagates.
pub fn fn_countif(args: &[Value]) -> FunctionResult {
    let range = &args[0];
    let criteria = &args[1];

    if criteria.is_error() {
        return Ok(criteria.clone());
    }
    if range.is_error() {
        return Ok(range.clone());
    }

    let matcher = CriteriaMatcher::new(criteria).ok_or_else(|| {
        FunctionError::Argument("COUNTIF criteria must be a single value".into())
    })?;

    let count = range
        .scalars()
        .into_iter()
        .filter(|v| matcher.matches(v))
        .count();

    Ok(Value::Number(count as f64))
}
