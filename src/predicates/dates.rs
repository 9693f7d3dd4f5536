//! Date predicates over UTC instants: ordering against a reference,
//! calendar-day checks, and the Gregorian leap-year rule.

use chrono::{DateTime, Datelike, Utc, Weekday};
use serde_json::Value;

use super::{
    as_instant, param, ParamSpec, PredicateCategory, PredicateDef, PredicateInput, PredicateResult,
};
use crate::error::EngineError;

pub(crate) fn defs() -> Vec<PredicateDef> {
    let reference_param = || vec![param("value", ParamSpec::Timestamp)];

    vec![
        PredicateDef::sync("isAfter", PredicateCategory::Date, reference_param(), |i| {
            ordered("isAfter", i, |value, reference| value > reference)
        }),
        PredicateDef::sync("isBefore", PredicateCategory::Date, reference_param(), |i| {
            ordered("isBefore", i, |value, reference| value < reference)
        }),
        PredicateDef::sync("isToday", PredicateCategory::Date, Vec::new(), |i| {
            calendar(i, |dt| dt.date_naive() == Utc::now().date_naive())
        }),
        PredicateDef::sync("isWeekend", PredicateCategory::Date, Vec::new(), |i| {
            calendar(i, |dt| {
                matches!(dt.weekday(), Weekday::Sat | Weekday::Sun)
            })
        }),
        PredicateDef::sync("isWeekday", PredicateCategory::Date, Vec::new(), |i| {
            calendar(i, |dt| {
                !matches!(dt.weekday(), Weekday::Sat | Weekday::Sun)
            })
        }),
        PredicateDef::sync("isLeapYear", PredicateCategory::Date, Vec::new(), |i| {
            calendar(i, |dt| is_leap_year(dt.year()))
        }),
    ]
}

fn ordered(
    op: &str,
    input: &PredicateInput<'_>,
    check: impl Fn(DateTime<Utc>, DateTime<Utc>) -> bool,
) -> PredicateResult {
    let reference = input
        .params
        .first()
        .and_then(as_instant)
        .ok_or_else(|| EngineError::predicate_internal(op, "reference is not a timestamp"))?;
    Ok(input
        .value
        .and_then(as_instant)
        .map(|value| check(value, reference))
        .unwrap_or(false))
}

fn calendar(
    input: &PredicateInput<'_>,
    check: impl Fn(DateTime<Utc>) -> bool,
) -> PredicateResult {
    Ok(input.value.and_then(as_instant).map(check).unwrap_or(false))
}

/// Divisible by 4 and not by 100, or divisible by 400.
fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}
