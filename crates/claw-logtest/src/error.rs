//! Error types for log capture and assertions.
//!
//! Field lookups fail with a [`FieldError`] classified by [`FieldErrorKind`].
//! Everything reported to a [`FailureReporter`](crate::reporter::FailureReporter)
//! is a [`LogTestError`].

use std::fmt;

use thiserror::Error;

/// Classification of a failed field lookup or comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldErrorKind {
    /// The field is absent from the decoded entry.
    Missing,
    /// The field is present but holds the wrong JSON type.
    Type,
    /// The field has the right JSON type but fails a secondary parse.
    Format,
    /// The field is present and well formed but has an unexpected value.
    Value,
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Missing => "missing log entry field",
            Self::Type => "invalid log entry field type",
            Self::Format => "invalid log entry field format",
            Self::Value => "invalid log entry field value",
        };
        f.write_str(s)
    }
}

/// A field lookup or comparison failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}:\n  field: {field}{detail}")]
pub struct FieldError {
    kind: FieldErrorKind,
    field: String,
    detail: String,
}

impl FieldError {
    /// Creates a new field error. `detail` lines are appended after the field name.
    #[must_use]
    pub fn new(kind: FieldErrorKind, field: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.into(),
            detail: String::new(),
        }
    }

    /// Appends a `name: value` detail line.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.detail.push_str(&format!("\n  {name}: {value}"));
        self
    }

    /// Appends the usual `want` / `have` pair.
    #[must_use]
    pub fn want_have(self, want: impl fmt::Display, have: impl fmt::Display) -> Self {
        self.with("want", want).with("have", have)
    }

    /// Returns the error classification.
    #[must_use]
    pub const fn kind(&self) -> FieldErrorKind {
        self.kind
    }

    /// Returns the name of the field the error is about.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns true if this error is of the given kind.
    #[must_use]
    pub fn is(&self, kind: FieldErrorKind) -> bool {
        self.kind == kind
    }
}

/// Errors reported by the capture sink, matchers and assertions.
#[derive(Debug, Error)]
pub enum LogTestError {
    /// A field check failed.
    #[error(transparent)]
    Check(#[from] FieldError),

    /// A captured line is not a JSON object.
    #[error("log entry {index}: {source}")]
    Decode {
        /// Write index of the offending line.
        index: usize,
        /// Underlying decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// A duration string could not be parsed.
    #[error("time: invalid duration \"{0}\"")]
    InvalidDuration(String),

    /// A blocking wait expired before a matching entry was written.
    #[error("timeout waiting for log entry reached:\n  timeout: {timeout}\n{summary}")]
    Timeout {
        /// The timeout as given by the caller.
        timeout: String,
        /// Dump of everything captured so far.
        summary: String,
    },

    /// No captured entry satisfied a matcher.
    #[error("log entry not found\n{summary}")]
    NotFound {
        /// Dump of everything captured so far.
        summary: String,
    },

    /// An entry was requested by an out of range position.
    #[error("[log entry] expected log entry to exist:\n  index: {index}")]
    MissingEntry {
        /// Requested position.
        index: usize,
    },

    /// The number of captured entries differs from the expected one.
    #[error("[log entry] expected N log entries:\n  want: {want}\n  have: {have}{log}")]
    EntryCount {
        /// Expected count.
        want: usize,
        /// Actual count.
        have: usize,
        /// Optional dump of the entries.
        log: String,
    },

    /// A raw entry is not JSON-equivalent to the expected text.
    #[error("[log entry] expected log entry to be equal:\n  index: {index}\n  want: {want}\n  have: {have}")]
    RawMismatch {
        /// Entry position.
        index: usize,
        /// Expected JSON text.
        want: String,
        /// Captured JSON text.
        have: String,
    },

    /// A field presence expectation was not met.
    #[error("expected log entry field {}to be present:\n  field: {field}", presence_word(.expected_present))]
    FieldPresence {
        /// Field name.
        field: String,
        /// Whether the field was expected to be present.
        expected_present: bool,
    },

    /// The entry has an unexpected number of fields.
    #[error("expected log entry to have N fields:\n  want: {want}\n  have: {have}")]
    FieldCount {
        /// Expected field count.
        want: usize,
        /// Actual field count.
        have: usize,
    },

    /// The field holds a different JSON type than expected.
    #[error("expected log entry field type:\n  field: {field}\n  want: {want}\n  have: {have}")]
    FieldTypeMismatch {
        /// Field name.
        field: String,
        /// Expected type name.
        want: String,
        /// Actual type name.
        have: String,
    },

    /// A time field is further from the expected time than allowed.
    #[error("[log entry] expected times to be within:\n  field: {field}\n  want: {want}\n  have: {have}\n  max diff: {diff}")]
    Within {
        /// Field name.
        field: String,
        /// Expected time.
        want: String,
        /// Captured time.
        have: String,
        /// Allowed difference as given by the caller.
        diff: String,
    },

    /// No entry in a snapshot satisfied an existential assertion.
    #[error("[log entry] no matching log entry found")]
    NoMatchingEntry,

    /// An entry satisfied a universal negative assertion.
    #[error("[log entry] matching log entry found")]
    MatchingEntryFound,

    /// The log was written to but never examined by the test.
    #[error("expected logs to be examined:\n  message cnt: {count}\n  log:\n{log}")]
    NotExamined {
        /// Number of captured lines.
        count: usize,
        /// The captured log.
        log: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn presence_word(expected_present: &bool) -> &'static str {
    if *expected_present { "" } else { "not " }
}

impl LogTestError {
    /// Returns the field error kind when this error wraps a field check failure.
    #[must_use]
    pub const fn field_kind(&self) -> Option<FieldErrorKind> {
        match self {
            Self::Check(err) => Some(err.kind),
            _ => None,
        }
    }
}

/// Result type alias for log test operations.
pub type Result<T> = std::result::Result<T, LogTestError>;
