//! Typed field lookups on decoded log entries.
//!
//! Every lookup distinguishes a missing field ([`FieldErrorKind::Missing`])
//! from a field of the wrong JSON type ([`FieldErrorKind::Type`]). Time
//! lookups additionally report unparsable values as [`FieldErrorKind::Format`].

use chrono::{DateTime, FixedOffset, TimeDelta};
use serde_json::{Map, Value};

use crate::config::TimeFormat;
use crate::entry::{Entry, FieldType};
use crate::error::{FieldError, FieldErrorKind};

fn lookup<'a>(entry: &'a Entry, field: &str, want: FieldType) -> Result<&'a Value, FieldError> {
    entry
        .fields()
        .get(field)
        .ok_or_else(|| FieldError::new(FieldErrorKind::Missing, field).with("type", want))
}

fn type_error(field: &str, want: FieldType, have: &Value) -> FieldError {
    FieldError::new(FieldErrorKind::Type, field).want_have(want, FieldType::of(have))
}

/// Looks up a string field.
///
/// # Errors
///
/// [`FieldErrorKind::Missing`] or [`FieldErrorKind::Type`].
pub fn has_str<'a>(entry: &'a Entry, field: &str) -> Result<&'a str, FieldError> {
    let val = lookup(entry, field, FieldType::String)?;
    val.as_str()
        .ok_or_else(|| type_error(field, FieldType::String, val))
}

/// Looks up a numeric field.
///
/// # Errors
///
/// [`FieldErrorKind::Missing`] or [`FieldErrorKind::Type`].
pub fn has_number(entry: &Entry, field: &str) -> Result<f64, FieldError> {
    let val = lookup(entry, field, FieldType::Number)?;
    val.as_f64()
        .ok_or_else(|| type_error(field, FieldType::Number, val))
}

/// Looks up a boolean field.
///
/// # Errors
///
/// [`FieldErrorKind::Missing`] or [`FieldErrorKind::Type`].
pub fn has_bool(entry: &Entry, field: &str) -> Result<bool, FieldError> {
    let val = lookup(entry, field, FieldType::Bool)?;
    val.as_bool()
        .ok_or_else(|| type_error(field, FieldType::Bool, val))
}

/// Looks up a time field formatted according to the entry's configuration.
///
/// # Errors
///
/// [`FieldErrorKind::Missing`], [`FieldErrorKind::Type`] or
/// [`FieldErrorKind::Format`].
pub fn has_time(entry: &Entry, field: &str) -> Result<DateTime<FixedOffset>, FieldError> {
    let have = has_str(entry, field)?;
    let format = &entry.config().time_format;
    let parsed = match format {
        TimeFormat::Rfc3339 => DateTime::parse_from_rfc3339(have),
        TimeFormat::Strftime(pattern) => DateTime::parse_from_str(have, pattern),
    };
    parsed.map_err(|_| {
        FieldError::new(FieldErrorKind::Format, field)
            .with("reason", "expected log entry field to have formatted time")
            .want_have(format, have)
    })
}

/// Looks up a numeric duration field expressed in the configured unit.
///
/// # Errors
///
/// [`FieldErrorKind::Missing`] or [`FieldErrorKind::Type`].
pub fn has_duration(entry: &Entry, field: &str) -> Result<TimeDelta, FieldError> {
    let units = has_number(entry, field)?;
    Ok(entry.config().duration_unit.to_delta(units))
}

/// Looks up an object field.
///
/// # Errors
///
/// [`FieldErrorKind::Missing`] or [`FieldErrorKind::Type`].
pub fn has_map<'a>(entry: &'a Entry, field: &str) -> Result<&'a Map<String, Value>, FieldError> {
    let val = lookup(entry, field, FieldType::Map)?;
    val.as_object()
        .ok_or_else(|| type_error(field, FieldType::Map, val))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogConfig;
    use crate::entry::test_entry;
    use chrono::TimeZone;

    #[test]
    fn str_found() {
        let ent = test_entry(r#"{"A":"abc"}"#);
        assert_eq!(has_str(&ent, "A"), Ok("abc"));
    }

    #[test]
    fn str_missing() {
        let ent = test_entry(r#"{"A":"abc"}"#);
        let err = has_str(&ent, "B").err();
        assert_eq!(err.as_ref().map(FieldError::kind), Some(FieldErrorKind::Missing));
        assert_eq!(
            err.map(|e| e.to_string()).unwrap_or_default(),
            "missing log entry field:\n  field: B\n  type: string"
        );
    }

    #[test]
    fn str_wrong_type() {
        let ent = test_entry(r#"{"A":1}"#);
        let err = has_str(&ent, "A").err();
        assert_eq!(err.as_ref().map(FieldError::kind), Some(FieldErrorKind::Type));
        assert_eq!(
            err.map(|e| e.to_string()).unwrap_or_default(),
            "invalid log entry field type:\n  field: A\n  want: string\n  have: number"
        );
    }

    #[test]
    fn number_found_and_wrong_type() {
        let ent = test_entry(r#"{"A":1.5,"B":"x"}"#);
        assert_eq!(has_number(&ent, "A"), Ok(1.5));
        assert_eq!(
            has_number(&ent, "B").err().map(|e| e.kind()),
            Some(FieldErrorKind::Type)
        );
        assert_eq!(
            has_number(&ent, "C").err().map(|e| e.kind()),
            Some(FieldErrorKind::Missing)
        );
    }

    #[test]
    fn bool_found_and_wrong_type() {
        let ent = test_entry(r#"{"A":true,"B":"true"}"#);
        assert_eq!(has_bool(&ent, "A"), Ok(true));
        assert_eq!(
            has_bool(&ent, "B").err().map(|e| e.kind()),
            Some(FieldErrorKind::Type)
        );
    }

    #[test]
    fn time_rfc3339() {
        let ent = test_entry(r#"{"time":"2022-01-24T16:39:09+01:00"}"#);
        let want = FixedOffset::east_opt(3600)
            .and_then(|tz| tz.with_ymd_and_hms(2022, 1, 24, 16, 39, 9).single());
        assert_eq!(has_time(&ent, "time").ok(), want);
    }

    #[test]
    fn time_bad_format() {
        let ent = test_entry(r#"{"time":"24 Jan 2022"}"#);
        let err = has_time(&ent, "time").err();
        assert_eq!(err.as_ref().map(FieldError::kind), Some(FieldErrorKind::Format));
        assert!(err
            .map(|e| e.to_string())
            .unwrap_or_default()
            .contains("want: RFC3339"));
    }

    #[test]
    fn time_strftime_config() {
        let cfg = LogConfig {
            time_format: TimeFormat::Strftime("%Y-%m-%d %H:%M:%S %z".to_string()),
            ..LogConfig::default()
        };
        let ent = crate::entry::test_entry_with(cfg, r#"{"t":"2022-01-24 16:39:09 +0000"}"#);
        assert!(has_time(&ent, "t").is_ok());
    }

    #[test]
    fn duration_uses_unit() {
        let ent = test_entry(r#"{"dur":1500}"#);
        assert_eq!(has_duration(&ent, "dur"), Ok(TimeDelta::milliseconds(1500)));
    }

    #[test]
    fn map_found_and_wrong_type() {
        let ent = test_entry(r#"{"m":{"a":1},"s":"x"}"#);
        assert_eq!(has_map(&ent, "m").map(Map::len), Ok(1));
        assert_eq!(
            has_map(&ent, "s").err().map(|e| e.kind()),
            Some(FieldErrorKind::Type)
        );
    }
}
