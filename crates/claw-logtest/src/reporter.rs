//! Failure reporting capability.
//!
//! Assertions, decode failures and wait timeouts are not returned to the
//! caller as `Err`; they are handed to a [`FailureReporter`] so that a test
//! can keep going and inspect every failure at the end. This keeps entries,
//! matchers and the sink independent of any particular test harness.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::LogTestError;

/// Destination for failures detected while examining logs.
pub trait FailureReporter: Send + Sync {
    /// Records a failure. Implementations must not block.
    fn report_failure(&self, err: LogTestError);

    /// Marks the caller as a helper frame. Most reporters ignore it.
    fn helper(&self) {}
}

/// Shared, type-erased reporter handle.
pub type SharedReporter = Arc<dyn FailureReporter>;

/// Reporter that keeps every failure message for later inspection.
///
/// This is the reporter to use from `#[test]` functions: run the code under
/// test, then call [`RecordingReporter::assert_clean`] or inspect
/// [`RecordingReporter::failures`].
#[derive(Debug, Default)]
pub struct RecordingReporter {
    failures: Mutex<Vec<String>>,
}

impl RecordingReporter {
    /// Creates a new empty reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new reporter wrapped in an `Arc`.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns true if at least one failure was reported.
    #[must_use]
    pub fn failed(&self) -> bool {
        !self.failures.lock().is_empty()
    }

    /// Returns a copy of the reported failure messages, oldest first.
    #[must_use]
    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().clone()
    }

    /// Removes and returns every reported failure message.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.failures.lock())
    }

    /// Fails the current test if any failure was reported.
    pub fn assert_clean(&self) {
        let failures = self.failures();
        assert!(
            failures.is_empty(),
            "log assertions failed:\n{}",
            failures.join("\n")
        );
    }
}

impl FailureReporter for RecordingReporter {
    fn report_failure(&self, err: LogTestError) {
        self.failures.lock().push(err.to_string());
    }
}

/// Reporter that emits failures as `tracing` error events.
#[derive(Debug, Clone, Default)]
pub struct TracingReporter {
    prefix: Option<String>,
}

impl TracingReporter {
    /// Creates a new tracing reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new tracing reporter with a message prefix.
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

impl FailureReporter for TracingReporter {
    fn report_failure(&self, err: LogTestError) {
        let prefix = self.prefix.as_deref().unwrap_or("LOGTEST");
        tracing::error!(target: "claw_logtest", error = %err, "[{prefix}] log assertion failed");
    }
}
