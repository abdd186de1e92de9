//! Fails a test whose logs were written but never looked at.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::{Level, LogConfig};
use crate::error::LogTestError;
use crate::field;
use crate::reporter::SharedReporter;
use crate::sink::CaptureSink;

/// Owns a [`CaptureSink`] and checks on drop that its log was examined.
///
/// Dropping a guard whose sink received writes reports
/// [`LogTestError::NotExamined`] unless [`LogGuard::examine_log`] or
/// [`LogGuard::ignore_logs`] was called. With
/// [`LogGuard::ignore_non_error_logs`] only logs holding an error or panic
/// level entry are reported.
#[derive(Debug)]
pub struct LogGuard {
    sink: Arc<CaptureSink>,
    examined: AtomicBool,
    ignore_non_errors: AtomicBool,
}

impl LogGuard {
    /// Creates a guard around a new sink with the default configuration.
    #[must_use]
    pub fn new(reporter: SharedReporter) -> Self {
        Self::with_config(LogConfig::default(), reporter)
    }

    /// Creates a guard around a new sink with the given configuration.
    #[must_use]
    pub fn with_config(config: LogConfig, reporter: SharedReporter) -> Self {
        Self::from_sink(Arc::new(
            CaptureSink::builder()
                .with_config(config)
                .with_reporter(reporter)
                .build(),
        ))
    }

    /// Creates a guard around an existing sink.
    #[must_use]
    pub fn from_sink(sink: Arc<CaptureSink>) -> Self {
        Self {
            sink,
            examined: AtomicBool::new(false),
            ignore_non_errors: AtomicBool::new(false),
        }
    }

    /// Returns the sink loggers should write to.
    #[must_use]
    pub fn writer(&self) -> Arc<CaptureSink> {
        Arc::clone(&self.sink)
    }

    /// Marks the log examined and returns the sink.
    #[must_use]
    pub fn examine_log(&self) -> &CaptureSink {
        self.examined.store(true, Ordering::SeqCst);
        &self.sink
    }

    /// Never reports unexamined logs.
    pub fn ignore_logs(&self) -> &Self {
        self.examined.store(true, Ordering::SeqCst);
        self
    }

    /// Reports unexamined logs only when they hold an error or panic entry.
    pub fn ignore_non_error_logs(&self) -> &Self {
        self.ignore_non_errors.store(true, Ordering::SeqCst);
        self
    }

    /// Clears the log and the examined flag.
    pub fn reset_log(&self) -> &Self {
        self.examined.store(false, Ordering::SeqCst);
        self.sink.reset();
        self
    }

    fn has_errors(&self) -> bool {
        let cfg = self.sink.config();
        let error = cfg.level_value(Level::Error);
        let panic = cfg.level_value(Level::Panic);
        self.sink.entries().get().iter().any(|ent| {
            field::has_str(ent, &cfg.level_field).is_ok_and(|lvl| lvl == error || lvl == panic)
        })
    }
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        let count = self.sink.len();
        if *self.examined.get_mut() || count == 0 {
            return;
        }
        if *self.ignore_non_errors.get_mut() && !self.has_errors() {
            return;
        }
        let log = self
            .sink
            .to_string()
            .lines()
            .map(|line| format!(" {line}\n"))
            .collect();
        let reporter = self.sink.reporter();
        reporter.helper();
        reporter.report_failure(LogTestError::NotExamined { count, log });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::RecordingReporter;

    fn guard() -> (LogGuard, Arc<RecordingReporter>) {
        let reporter = RecordingReporter::shared();
        (LogGuard::new(reporter.clone()), reporter)
    }

    #[test]
    fn no_logs_written() {
        let (grd, reporter) = guard();
        drop(grd);
        assert!(!reporter.failed());
    }

    #[test]
    fn unexamined_logs_fail() {
        let (grd, reporter) = guard();
        grd.writer().write_line(br#"{"level":"info","message":"hello"}"#);
        drop(grd);
        assert_eq!(
            reporter.failures(),
            vec![
                "expected logs to be examined:\n  message cnt: 1\n  log:\n \
                 {\"level\":\"info\",\"message\":\"hello\"}\n"
                    .to_string()
            ]
        );
    }

    #[test]
    fn examined_logs_pass() {
        let (grd, reporter) = guard();
        grd.writer().write_line(br#"{"level":"info"}"#);
        assert_eq!(grd.examine_log().len(), 1);
        drop(grd);
        assert!(!reporter.failed());
    }

    #[test]
    fn ignored_logs_pass() {
        let (grd, reporter) = guard();
        grd.writer().write_line(br#"{"level":"error"}"#);
        grd.ignore_logs();
        drop(grd);
        assert!(!reporter.failed());
    }

    #[test]
    fn ignore_non_error_logs_still_reports_errors() {
        let (grd, reporter) = guard();
        grd.writer().write_line(br#"{"level":"info"}"#);
        grd.writer().write_line(br#"{"level":"error"}"#);
        grd.ignore_non_error_logs();
        drop(grd);
        assert_eq!(reporter.failures().len(), 1);
    }

    #[test]
    fn ignore_non_error_logs_without_errors() {
        let (grd, reporter) = guard();
        grd.writer().write_line(br#"{"level":"info"}"#);
        grd.writer().write_line(br#"{"level":"warn"}"#);
        grd.ignore_non_error_logs();
        drop(grd);
        assert!(!reporter.failed());
    }

    #[test]
    fn ignore_non_error_logs_uses_config_levels() {
        let reporter = RecordingReporter::shared();
        let grd = LogGuard::with_config(LogConfig::slog(), reporter.clone());
        grd.writer().write_line(br#"{"level":"ERROR"}"#);
        grd.ignore_non_error_logs();
        drop(grd);
        assert_eq!(reporter.failures().len(), 1);
    }

    #[test]
    fn reset_log_clears_examined_flag() {
        let (grd, reporter) = guard();
        grd.writer().write_line(br#"{"level":"info"}"#);
        let _ = grd.examine_log();
        grd.reset_log();
        assert!(grd.writer().is_empty());

        grd.writer().write_line(br#"{"level":"info"}"#);
        drop(grd);
        assert_eq!(reporter.failures().len(), 1);
    }
}
