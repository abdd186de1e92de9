//! Human readable duration strings.
//!
//! Accepts the same shapes as Go's `time.ParseDuration`: an optional sign
//! followed by one or more decimal numbers each with a unit suffix, such as
//! `"500ms"`, `"1.5h"` or `"2h45m"`. Valid units are `ns`, `us` (or `µs`),
//! `ms`, `s`, `m` and `h`. A bare `"0"` is also accepted.

use chrono::TimeDelta;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{LogTestError, Result};

/// One `<number><unit>` group.
static DURATION_PART_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]+(?:\.[0-9]*)?|\.[0-9]+)(ns|us|µs|μs|ms|s|m|h)")
        .unwrap_or_else(|_| unreachable!())
});

const NANOS_PER_UNIT: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("us", 1e3),
    ("µs", 1e3),
    ("μs", 1e3),
    ("ms", 1e6),
    ("s", 1e9),
    ("m", 60e9),
    ("h", 3600e9),
];

/// Parses a duration string.
///
/// # Errors
///
/// Returns [`LogTestError::InvalidDuration`] if the string is not a valid
/// duration or does not fit in 64-bit nanoseconds.
pub fn parse_duration(input: &str) -> Result<TimeDelta> {
    let invalid = || LogTestError::InvalidDuration(input.to_string());

    let (negative, body) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    if body == "0" {
        return Ok(TimeDelta::zero());
    }
    if body.is_empty() {
        return Err(invalid());
    }

    let mut consumed = 0;
    let mut total = 0.0_f64;
    for caps in DURATION_PART_REGEX.captures_iter(body) {
        let (Some(whole), Some(number), Some(unit)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            return Err(invalid());
        };
        // Groups must follow each other without gaps.
        if whole.start() != consumed {
            return Err(invalid());
        }
        consumed = whole.end();

        let value: f64 = number.as_str().parse().map_err(|_| invalid())?;
        let scale = NANOS_PER_UNIT
            .iter()
            .find(|(name, _)| *name == unit.as_str())
            .map(|(_, scale)| *scale)
            .ok_or_else(invalid)?;
        total += value * scale;
    }
    if consumed != body.len() {
        return Err(invalid());
    }
    if !total.is_finite() || total > i64::MAX as f64 {
        return Err(invalid());
    }

    let nanos = total.round() as i64;
    Ok(TimeDelta::nanoseconds(if negative { -nanos } else { nanos }))
}

/// Parses a duration string which must not be negative.
///
/// # Errors
///
/// Returns [`LogTestError::InvalidDuration`] for malformed or negative input.
pub fn parse_timeout(input: &str) -> Result<std::time::Duration> {
    parse_duration(input)?
        .to_std()
        .map_err(|_| LogTestError::InvalidDuration(input.to_string()))
}
