//! A single captured log line.
//!
//! An [`Entry`] is the raw text of one write together with its JSON decode,
//! its write index, the [`LogConfig`] used to interpret it and the reporter
//! its assertions report to. Entries are immutable; [`Entry::meta_all`]
//! always hands out a copy of the decoded fields.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeDelta};
use serde_json::{Map, Value};

use crate::check::Checker;
use crate::config::LogConfig;
use crate::duration::parse_duration;
use crate::error::{FieldError, LogTestError};
use crate::field;
use crate::reporter::SharedReporter;

/// JSON type of an entry field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// JSON string.
    String,
    /// JSON number.
    Number,
    /// JSON boolean.
    Bool,
    /// JSON object.
    Map,
    /// JSON array.
    Array,
    /// JSON null.
    Null,
}

impl FieldType {
    /// Returns the type of a JSON value.
    #[must_use]
    pub const fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => Self::String,
            Value::Number(_) => Self::Number,
            Value::Bool(_) => Self::Bool,
            Value::Object(_) => Self::Map,
            Value::Array(_) => Self::Array,
            Value::Null => Self::Null,
        }
    }

    /// Returns the type name used in failure messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Map => "map",
            Self::Array => "array",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decodes one log line into its field map.
///
/// # Errors
///
/// Returns the decoder error if the line is not a JSON object.
pub fn decode_line(raw: &str) -> serde_json::Result<Map<String, Value>> {
    serde_json::from_str(raw.trim())
}

/// One captured log line.
#[derive(Clone)]
pub struct Entry {
    config: Arc<LogConfig>,
    raw: String,
    fields: Arc<Map<String, Value>>,
    index: usize,
    reporter: SharedReporter,
}

impl Entry {
    /// Creates an entry from an already decoded line.
    #[must_use]
    pub fn new(
        config: Arc<LogConfig>,
        reporter: SharedReporter,
        index: usize,
        raw: &str,
        fields: Map<String, Value>,
    ) -> Self {
        Self {
            config,
            raw: raw.trim().to_string(),
            fields: Arc::new(fields),
            index,
            reporter,
        }
    }

    /// Decodes a raw line into an entry.
    ///
    /// # Errors
    ///
    /// Returns [`LogTestError::Decode`] if the line is not a JSON object.
    pub fn parse(
        config: Arc<LogConfig>,
        reporter: SharedReporter,
        index: usize,
        raw: &str,
    ) -> crate::error::Result<Self> {
        let fields = decode_line(raw).map_err(|source| LogTestError::Decode { index, source })?;
        Ok(Self::new(config, reporter, index, raw, fields))
    }

    /// Returns the "not found" entry.
    #[must_use]
    pub fn zero(config: Arc<LogConfig>, reporter: SharedReporter) -> Self {
        Self {
            config,
            raw: String::new(),
            fields: Arc::new(Map::new()),
            index: 0,
            reporter,
        }
    }

    /// Returns true for the "not found" entry.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the write index of the entry.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Returns the line as it was written, without surrounding whitespace.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns the line as bytes.
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        self.raw.as_bytes().to_vec()
    }

    /// Returns a copy of the decoded fields.
    #[must_use]
    pub fn meta_all(&self) -> Map<String, Value> {
        (*self.fields).clone()
    }

    /// Returns the configuration used to interpret this entry.
    #[must_use]
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    pub(crate) fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    fn fail(&self, err: impl Into<LogTestError>) -> bool {
        self.reporter.helper();
        self.reporter.report_failure(err.into());
        false
    }

    fn assert_check(&self, checker: &Checker) -> bool {
        match checker.check(self) {
            Ok(()) => true,
            Err(err) => self.fail(err),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the value of the configured level field.
    ///
    /// # Errors
    ///
    /// Missing or non-string fields fail as in [`field::has_str`]; an empty
    /// level fails with [`FieldErrorKind::Value`](crate::FieldErrorKind::Value).
    pub fn level(&self) -> Result<String, FieldError> {
        let name = &self.config.level_field;
        let val = field::has_str(self, name)?;
        if val.is_empty() {
            return Err(FieldError::new(crate::FieldErrorKind::Value, name.as_str())
                .with("reason", "empty level"));
        }
        Ok(val.to_string())
    }

    /// Returns a string field.
    ///
    /// # Errors
    ///
    /// See [`field::has_str`].
    pub fn str(&self, field: &str) -> Result<String, FieldError> {
        field::has_str(self, field).map(ToString::to_string)
    }

    /// Returns a numeric field.
    ///
    /// # Errors
    ///
    /// See [`field::has_number`].
    pub fn number(&self, field: &str) -> Result<f64, FieldError> {
        field::has_number(self, field)
    }

    /// Returns a boolean field.
    ///
    /// # Errors
    ///
    /// See [`field::has_bool`].
    pub fn bool(&self, field: &str) -> Result<bool, FieldError> {
        field::has_bool(self, field)
    }

    /// Returns a time field.
    ///
    /// # Errors
    ///
    /// See [`field::has_time`].
    pub fn time(&self, field: &str) -> Result<DateTime<FixedOffset>, FieldError> {
        field::has_time(self, field)
    }

    /// Returns a duration field.
    ///
    /// # Errors
    ///
    /// See [`field::has_duration`].
    pub fn duration(&self, field: &str) -> Result<TimeDelta, FieldError> {
        field::has_duration(self, field)
    }

    /// Returns a copy of an object field.
    ///
    /// # Errors
    ///
    /// See [`field::has_map`].
    pub fn map(&self, field: &str) -> Result<Map<String, Value>, FieldError> {
        field::has_map(self, field).cloned()
    }

    // ------------------------------------------------------------------
    // Assertions
    // ------------------------------------------------------------------

    /// Asserts the raw line is JSON-equivalent to `want`.
    pub fn assert_raw(&self, want: &str) -> bool {
        if json_equal(want, &self.raw) {
            return true;
        }
        self.fail(LogTestError::RawMismatch {
            index: self.index,
            want: want.to_string(),
            have: self.raw.clone(),
        })
    }

    /// Asserts the field is present.
    pub fn assert_exist(&self, field: &str) -> bool {
        if self.fields.contains_key(field) {
            return true;
        }
        self.fail(LogTestError::FieldPresence {
            field: field.to_string(),
            expected_present: true,
        })
    }

    /// Asserts the field is absent.
    pub fn assert_not_exist(&self, field: &str) -> bool {
        if !self.fields.contains_key(field) {
            return true;
        }
        self.fail(LogTestError::FieldPresence {
            field: field.to_string(),
            expected_present: false,
        })
    }

    /// Asserts the entry has exactly `want` top level fields.
    pub fn assert_field_count(&self, want: usize) -> bool {
        let have = self.fields.len();
        if have == want {
            return true;
        }
        self.fail(LogTestError::FieldCount { want, have })
    }

    /// Asserts the field is present and has the given JSON type.
    pub fn assert_field_type(&self, field: &str, want: FieldType) -> bool {
        if !self.assert_exist(field) {
            return false;
        }
        let have = self.fields.get(field).map_or(FieldType::Null, FieldType::of);
        if have == want {
            return true;
        }
        self.fail(LogTestError::FieldTypeMismatch {
            field: field.to_string(),
            want: want.to_string(),
            have: have.to_string(),
        })
    }

    /// Asserts the level field equals `want`.
    pub fn assert_level(&self, want: &str) -> bool {
        self.assert_check(&Checker::level(want))
    }

    /// Asserts the message field equals `want`.
    pub fn assert_msg(&self, want: &str) -> bool {
        self.assert_check(&Checker::msg(want))
    }

    /// Asserts the message field equals the error's message.
    pub fn assert_msg_err(&self, want: &dyn std::error::Error) -> bool {
        self.assert_msg(&want.to_string())
    }

    /// Asserts the error field equals `want`.
    pub fn assert_error(&self, want: &str) -> bool {
        let name = self.config.error_field.clone();
        self.assert_str(&name, want)
    }

    /// Asserts the error field equals the error's message.
    pub fn assert_err(&self, want: &dyn std::error::Error) -> bool {
        self.assert_error(&want.to_string())
    }

    /// Asserts a string field equals `want`.
    pub fn assert_str(&self, field: &str, want: &str) -> bool {
        self.assert_check(&Checker::str(field, want))
    }

    /// Asserts a string field contains `want`.
    pub fn assert_contain(&self, field: &str, want: &str) -> bool {
        self.assert_check(&Checker::contain(field, want))
    }

    /// Asserts a numeric field equals `want`.
    pub fn assert_number(&self, field: &str, want: f64) -> bool {
        self.assert_check(&Checker::number(field, want))
    }

    /// Asserts a boolean field equals `want`.
    pub fn assert_bool(&self, field: &str, want: bool) -> bool {
        self.assert_check(&Checker::bool(field, want))
    }

    /// Asserts a time field denotes the same instant as `want`.
    pub fn assert_time(&self, field: &str, want: impl Into<DateTime<FixedOffset>>) -> bool {
        self.assert_check(&Checker::time(field, want))
    }

    /// Asserts a time field is within `diff` of `want`.
    pub fn assert_within(
        &self,
        field: &str,
        want: impl Into<DateTime<FixedOffset>>,
        diff: &str,
    ) -> bool {
        let max = match parse_duration(diff) {
            Ok(max) => max.abs(),
            Err(err) => return self.fail(err),
        };
        let have = match field::has_time(self, field) {
            Ok(have) => have,
            Err(err) => return self.fail(err),
        };
        let want = want.into();
        if (have - want).abs() <= max {
            return true;
        }
        self.fail(LogTestError::Within {
            field: field.to_string(),
            want: want.to_rfc3339(),
            have: have.to_rfc3339(),
            diff: diff.to_string(),
        })
    }

    /// Asserts the configured time field is within `diff` of `want`.
    pub fn assert_logged_within(&self, want: impl Into<DateTime<FixedOffset>>, diff: &str) -> bool {
        let name = self.config.time_field.clone();
        self.assert_within(&name, want, diff)
    }

    /// Asserts a duration field equals `want`.
    pub fn assert_duration(&self, field: &str, want: TimeDelta) -> bool {
        self.assert_check(&Checker::duration(field, want))
    }

    /// Asserts an object field is deeply equal to `want`.
    pub fn assert_map(&self, field: &str, want: Map<String, Value>) -> bool {
        self.assert_check(&Checker::map(field, want))
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("index", &self.index)
            .field("raw", &self.raw)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.raw == other.raw && self.fields == other.fields
    }
}

/// Compares two JSON texts structurally, falling back to text comparison
/// when either side is not valid JSON.
pub(crate) fn json_equal(want: &str, have: &str) -> bool {
    match (
        serde_json::from_str::<Value>(want),
        serde_json::from_str::<Value>(have),
    ) {
        (Ok(want), Ok(have)) => want == have,
        _ => want.trim() == have.trim(),
    }
}

#[cfg(test)]
pub(crate) fn test_entry_with(config: LogConfig, raw: &str) -> Entry {
    let reporter: SharedReporter = crate::reporter::RecordingReporter::shared();
    Entry::new(
        Arc::new(config),
        reporter,
        0,
        raw,
        decode_line(raw).unwrap_or_default(),
    )
}

#[cfg(test)]
pub(crate) fn test_entry(raw: &str) -> Entry {
    test_entry_with(LogConfig::default(), raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::RecordingReporter;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn entry(raw: &str) -> (Entry, Arc<RecordingReporter>) {
        let reporter = RecordingReporter::shared();
        let shared: SharedReporter = reporter.clone();
        let ent = Entry::parse(Arc::new(LogConfig::default()), shared, 1, raw);
        assert!(ent.is_ok());
        let ent = ent.unwrap_or_else(|_| unreachable!());
        (ent, reporter)
    }

    #[test]
    fn parse_trims_raw() {
        let (ent, _) = entry("  {\"level\":\"info\"}\n");
        assert_eq!(ent.raw(), r#"{"level":"info"}"#);
        assert_eq!(ent.to_string(), r#"{"level":"info"}"#);
        assert_eq!(ent.bytes(), br#"{"level":"info"}"#.to_vec());
        assert_eq!(ent.index(), 1);
        assert!(!ent.is_zero());
    }

    #[test]
    fn parse_rejects_non_object() {
        let reporter: SharedReporter = RecordingReporter::shared();
        let res = Entry::parse(Arc::new(LogConfig::default()), reporter, 4, "[1,2]");
        assert!(matches!(res, Err(LogTestError::Decode { index: 4, .. })));
    }

    #[test]
    fn zero_entry() {
        let reporter: SharedReporter = RecordingReporter::shared();
        let ent = Entry::zero(Arc::new(LogConfig::default()), reporter);
        assert!(ent.is_zero());
        assert_eq!(ent.index(), 0);
        assert!(ent.meta_all().is_empty());
    }

    #[test]
    fn meta_all_is_a_copy() {
        let (ent, _) = entry(r#"{"A":1}"#);
        let mut copy = ent.meta_all();
        copy.insert("B".to_string(), json!(2));
        assert_eq!(ent.meta_all().len(), 1);
        assert!(ent.fields().get("B").is_none());
    }

    #[test]
    fn level_accessor() {
        let (ent, _) = entry(r#"{"level":"info"}"#);
        assert_eq!(ent.level().ok(), Some("info".to_string()));

        let (ent, _) = entry(r#"{"level":""}"#);
        assert_eq!(
            ent.level().err().map(|e| e.kind()),
            Some(crate::FieldErrorKind::Value)
        );

        let (ent, _) = entry(r#"{"lvl":"info"}"#);
        assert_eq!(
            ent.level().err().map(|e| e.kind()),
            Some(crate::FieldErrorKind::Missing)
        );
    }

    #[test]
    fn typed_accessors() {
        let (ent, _) = entry(
            r#"{"s":"abc","n":42,"b":false,"t":"2022-01-24T16:39:09Z","d":250,"m":{"k":"v"}}"#,
        );
        assert_eq!(ent.str("s").ok(), Some("abc".to_string()));
        assert_eq!(ent.number("n").ok(), Some(42.0));
        assert_eq!(ent.bool("b").ok(), Some(false));
        assert!(ent.time("t").is_ok());
        assert_eq!(ent.duration("d").ok(), Some(TimeDelta::milliseconds(250)));
        assert_eq!(ent.map("m").ok().map(|m| m.len()), Some(1));
    }

    #[test]
    fn assert_raw_is_json_equivalent() {
        let (ent, reporter) = entry(r#"{"A":1, "B":"x"}"#);
        assert!(ent.assert_raw(r#"{"B":"x","A":1}"#));
        assert!(!reporter.failed());

        assert!(!ent.assert_raw(r#"{"A":2}"#));
        assert_eq!(reporter.failures().len(), 1);
    }

    #[test]
    fn assert_exist_and_not_exist() {
        let (ent, reporter) = entry(r#"{"A":1}"#);
        assert!(ent.assert_exist("A"));
        assert!(ent.assert_not_exist("B"));
        assert!(!reporter.failed());

        assert!(!ent.assert_exist("B"));
        assert!(!ent.assert_not_exist("A"));
        assert_eq!(
            reporter.failures(),
            vec![
                "expected log entry field to be present:\n  field: B".to_string(),
                "expected log entry field not to be present:\n  field: A".to_string(),
            ]
        );
    }

    #[test]
    fn assert_field_count() {
        let (ent, reporter) = entry(r#"{"A":1,"B":2}"#);
        assert!(ent.assert_field_count(2));
        assert!(!ent.assert_field_count(3));
        assert_eq!(
            reporter.failures(),
            vec!["expected log entry to have N fields:\n  want: 3\n  have: 2".to_string()]
        );
    }

    #[test]
    fn assert_field_type() {
        let (ent, reporter) = entry(r#"{"A":1,"B":"x","C":[1],"D":null}"#);
        assert!(ent.assert_field_type("A", FieldType::Number));
        assert!(ent.assert_field_type("B", FieldType::String));
        assert!(ent.assert_field_type("C", FieldType::Array));
        assert!(ent.assert_field_type("D", FieldType::Null));
        assert!(!reporter.failed());

        assert!(!ent.assert_field_type("A", FieldType::Bool));
        assert!(!ent.assert_field_type("Z", FieldType::Bool));
        assert_eq!(reporter.failures().len(), 2);
    }

    #[test]
    fn assert_level_msg_and_error() {
        let (ent, reporter) =
            entry(r#"{"level":"error","message":"boom","error":"disk full"}"#);
        assert!(ent.assert_level("error"));
        assert!(ent.assert_msg("boom"));
        assert!(ent.assert_error("disk full"));

        let err = std::io::Error::other("disk full");
        assert!(ent.assert_err(&err));
        assert!(!ent.assert_msg_err(&err));
        assert_eq!(reporter.failures().len(), 1);
    }

    #[test]
    fn assert_typed_values() {
        let (ent, reporter) = entry(
            r#"{"s":"hello world","n":2,"b":true,"t":"2022-01-24T16:39:09Z","d":1000,"m":{"k":1}}"#,
        );
        let when = Utc.with_ymd_and_hms(2022, 1, 24, 16, 39, 9).single();
        assert!(when.is_some());
        let when = when.unwrap_or_default();

        assert!(ent.assert_str("s", "hello world"));
        assert!(ent.assert_contain("s", "world"));
        assert!(ent.assert_number("n", 2.0));
        assert!(ent.assert_bool("b", true));
        assert!(ent.assert_time("t", when));
        assert!(ent.assert_duration("d", TimeDelta::seconds(1)));
        let mut want = Map::new();
        want.insert("k".to_string(), json!(1));
        assert!(ent.assert_map("m", want));
        assert!(!reporter.failed());

        assert!(!ent.assert_number("n", 3.0));
        assert!(!ent.assert_contain("s", "moon"));
        assert_eq!(reporter.failures().len(), 2);
    }

    #[test]
    fn assert_within() {
        let (ent, reporter) = entry(r#"{"time":"2022-01-24T16:39:09Z"}"#);
        let when = Utc
            .with_ymd_and_hms(2022, 1, 24, 16, 39, 10)
            .single()
            .unwrap_or_default();

        assert!(ent.assert_within("time", when, "2s"));
        assert!(ent.assert_logged_within(when, "1s"));
        assert!(!reporter.failed());

        assert!(!ent.assert_logged_within(when, "500ms"));
        assert!(!ent.assert_within("time", when, "abc"));
        let failures = reporter.failures();
        assert_eq!(failures.len(), 2);
        assert!(failures[0].contains("max diff: 500ms"));
        assert_eq!(failures[1], "time: invalid duration \"abc\"");
    }

    #[test]
    fn field_type_of_values() {
        assert_eq!(FieldType::of(&json!("x")), FieldType::String);
        assert_eq!(FieldType::of(&json!(1)), FieldType::Number);
        assert_eq!(FieldType::of(&json!(true)), FieldType::Bool);
        assert_eq!(FieldType::of(&json!({})), FieldType::Map);
        assert_eq!(FieldType::of(&json!([])), FieldType::Array);
        assert_eq!(FieldType::of(&json!(null)), FieldType::Null);
    }

    #[test]
    fn json_equal_falls_back_to_text() {
        assert!(json_equal("not json", " not json "));
        assert!(!json_equal("not json", "{}"));
        assert!(json_equal(r#"{"a":[1,2]}"#, r#"{ "a" : [1, 2] }"#));
    }
}
