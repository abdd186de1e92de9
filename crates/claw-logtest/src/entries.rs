//! Point in time snapshots of captured entries.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeDelta};
use serde_json::{Map, Value};

use crate::check::Checker;
use crate::config::LogConfig;
use crate::entry::{json_equal, Entry};
use crate::error::LogTestError;
use crate::reporter::SharedReporter;

/// An ordered snapshot of captured entries.
///
/// Later writes to the sink never show up in an `Entries` value obtained
/// before them. The `assert_*` methods are existential: they pass when at
/// least one entry satisfies the condition. The `assert_no_*` methods pass
/// when no entry does. Either kind reports at most one failure.
#[derive(Clone)]
pub struct Entries {
    config: Arc<LogConfig>,
    entries: Vec<Entry>,
    reporter: SharedReporter,
}

impl Entries {
    pub(crate) fn new(config: Arc<LogConfig>, entries: Vec<Entry>, reporter: SharedReporter) -> Self {
        Self {
            config,
            entries,
            reporter,
        }
    }

    /// Returns the entries.
    #[must_use]
    pub fn get(&self) -> &[Entry] {
        &self.entries
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the snapshot holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a copy of every entry's decoded fields.
    #[must_use]
    pub fn meta_all(&self) -> Vec<Map<String, Value>> {
        self.entries.iter().map(Entry::meta_all).collect()
    }

    fn fail(&self, err: LogTestError) -> bool {
        self.reporter.helper();
        self.reporter.report_failure(err);
        false
    }

    /// Returns the `n`th entry of the snapshot.
    ///
    /// Reports a failure and returns the zero entry when `n` is out of range.
    #[must_use]
    pub fn entry(&self, n: usize) -> Entry {
        if let Some(ent) = self.entries.get(n) {
            return ent.clone();
        }
        self.fail(LogTestError::MissingEntry { index: n });
        Entry::zero(Arc::clone(&self.config), Arc::clone(&self.reporter))
    }

    /// Asserts the snapshot holds exactly the given lines, compared as JSON.
    pub fn assert_raw(&self, want: &[&str]) -> bool {
        let mut ok = true;
        for (idx, line) in want.iter().enumerate() {
            let have = self.entry(idx);
            if have.is_zero() {
                return false;
            }
            if !json_equal(line, have.raw()) {
                ok = self.fail(LogTestError::RawMismatch {
                    index: idx,
                    want: (*line).to_string(),
                    have: have.raw().to_string(),
                });
            }
        }
        if !ok {
            return false;
        }
        if self.entries.len() == want.len() {
            return true;
        }
        self.fail(LogTestError::EntryCount {
            want: want.len(),
            have: self.entries.len(),
            log: format!("\n  have logs:\n{}", self.lines(4)),
        })
    }

    /// Asserts the snapshot holds exactly `want` entries.
    pub fn assert_len(&self, want: usize) -> bool {
        let have = self.entries.len();
        if have == want {
            return true;
        }
        self.fail(LogTestError::EntryCount {
            want,
            have,
            log: String::new(),
        })
    }

    /// Asserts at least one entry satisfies the checker.
    pub fn assert_any(&self, checker: &Checker) -> bool {
        if self.entries.iter().any(|ent| checker.matches(ent)) {
            return true;
        }
        self.fail(LogTestError::NoMatchingEntry)
    }

    /// Asserts no entry satisfies the checker.
    pub fn assert_none(&self, checker: &Checker) -> bool {
        if !self.entries.iter().any(|ent| checker.matches(ent)) {
            return true;
        }
        self.fail(LogTestError::MatchingEntryFound)
    }

    /// Asserts some entry has the message `want`.
    pub fn assert_msg(&self, want: &str) -> bool {
        self.assert_any(&Checker::msg(want))
    }

    /// Asserts no entry has the message `want`.
    pub fn assert_no_msg(&self, want: &str) -> bool {
        self.assert_none(&Checker::msg(want))
    }

    /// Asserts some entry's message contains `want`.
    pub fn assert_msg_contain(&self, want: &str) -> bool {
        self.assert_any(&Checker::msg_contain(want))
    }

    /// Asserts no entry's message contains `want`.
    pub fn assert_no_msg_contain(&self, want: &str) -> bool {
        self.assert_none(&Checker::msg_contain(want))
    }

    /// Asserts some entry has the error `want`.
    pub fn assert_error(&self, want: &str) -> bool {
        self.assert_any(&Checker::error(want))
    }

    /// Asserts no entry has the error `want`.
    pub fn assert_no_error(&self, want: &str) -> bool {
        self.assert_none(&Checker::error(want))
    }

    /// Asserts some entry's error contains `want`.
    pub fn assert_error_contain(&self, want: &str) -> bool {
        self.assert_any(&Checker::err_contain(want))
    }

    /// Asserts no entry's error contains `want`.
    pub fn assert_no_error_contain(&self, want: &str) -> bool {
        self.assert_none(&Checker::err_contain(want))
    }

    /// Asserts some entry's error equals the error's message.
    pub fn assert_err(&self, want: &dyn std::error::Error) -> bool {
        self.assert_error(&want.to_string())
    }

    /// Asserts no entry's error equals the error's message.
    pub fn assert_no_err(&self, want: &dyn std::error::Error) -> bool {
        self.assert_no_error(&want.to_string())
    }

    /// Asserts some entry's string field contains `want`.
    pub fn assert_contain(&self, field: &str, want: &str) -> bool {
        self.assert_any(&Checker::contain(field, want))
    }

    /// Asserts no entry's string field contains `want`.
    pub fn assert_no_contain(&self, field: &str, want: &str) -> bool {
        self.assert_none(&Checker::contain(field, want))
    }

    /// Asserts some entry's string field equals `want`.
    pub fn assert_str(&self, field: &str, want: &str) -> bool {
        self.assert_any(&Checker::str(field, want))
    }

    /// Asserts no entry's string field equals `want`.
    pub fn assert_no_str(&self, field: &str, want: &str) -> bool {
        self.assert_none(&Checker::str(field, want))
    }

    /// Asserts some entry's numeric field equals `want`.
    pub fn assert_number(&self, field: &str, want: f64) -> bool {
        self.assert_any(&Checker::number(field, want))
    }

    /// Asserts no entry's numeric field equals `want`.
    pub fn assert_no_number(&self, field: &str, want: f64) -> bool {
        self.assert_none(&Checker::number(field, want))
    }

    /// Asserts some entry's boolean field equals `want`.
    pub fn assert_bool(&self, field: &str, want: bool) -> bool {
        self.assert_any(&Checker::bool(field, want))
    }

    /// Asserts no entry's boolean field equals `want`.
    pub fn assert_no_bool(&self, field: &str, want: bool) -> bool {
        self.assert_none(&Checker::bool(field, want))
    }

    /// Asserts some entry's time field equals `want`.
    pub fn assert_time(&self, field: &str, want: impl Into<DateTime<FixedOffset>>) -> bool {
        self.assert_any(&Checker::time(field, want))
    }

    /// Asserts no entry's time field equals `want`.
    pub fn assert_no_time(&self, field: &str, want: impl Into<DateTime<FixedOffset>>) -> bool {
        self.assert_none(&Checker::time(field, want))
    }

    /// Asserts some entry's duration field equals `want`.
    pub fn assert_duration(&self, field: &str, want: TimeDelta) -> bool {
        self.assert_any(&Checker::duration(field, want))
    }

    /// Asserts no entry's duration field equals `want`.
    pub fn assert_no_duration(&self, field: &str, want: TimeDelta) -> bool {
        self.assert_none(&Checker::duration(field, want))
    }

    /// Returns every entry as a human readable listing.
    #[must_use]
    pub fn summary(&self) -> String {
        self.summary_indented(0)
    }

    /// Like [`Entries::summary`] with listed lines indented by `indent + 2`.
    pub(crate) fn summary_indented(&self, indent: usize) -> String {
        if self.entries.is_empty() {
            return format!("{}no entries logged so far", " ".repeat(indent));
        }
        format!("entries logged so far:\n{}", self.lines(indent + 2))
    }

    fn lines(&self, indent: usize) -> String {
        let pad = " ".repeat(indent);
        self.entries
            .iter()
            .map(|ent| format!("{pad}{}\n", ent.raw()))
            .collect()
    }

    /// Logs the summary at info level.
    pub fn print(&self) {
        tracing::info!(target: "claw_logtest", entries = self.entries.len(), "{}", self.summary());
    }
}

impl std::fmt::Debug for Entries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a Entries {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
pub(crate) fn test_entries(
    reporter: SharedReporter,
    lines: &[&str],
) -> Entries {
    let config = Arc::new(LogConfig::default());
    let entries = lines
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| {
            Entry::parse(Arc::clone(&config), Arc::clone(&reporter), idx, line).ok()
        })
        .collect();
    Entries::new(config, entries, reporter)
}
