//! # claw-logtest
//!
//! Structured log capture and assertions for Clawbernetes tests.
//!
//! This crate provides:
//!
//! - [`CaptureSink`]: Append-only log destination with ordered blocking waits
//! - [`Entry`] / [`Entries`]: Captured lines and point in time snapshots
//! - [`Checker`]: Pure predicates over entries
//! - [`Matcher`]: One-shot capture with match counting and delivery
//! - [`LogConfig`]: Field naming presets for common JSON loggers
//! - [`LogGuard`]: Fails a test whose logs were never examined
//! - [`FailureReporter`]: Where assertion failures go
//!
//! ## Example
//!
//! ```rust
//! use std::io::Write;
//! use std::sync::Arc;
//!
//! use claw_logtest::{CaptureSink, Checker, RecordingReporter};
//!
//! let reporter = RecordingReporter::shared();
//! let sink = Arc::new(CaptureSink::new(reporter.clone()));
//!
//! let mut w = &*sink;
//! w.write_all(br#"{"level":"info","message":"started","port":8080}"#).ok();
//!
//! let ets = sink.filter(&[Checker::msg("started")]);
//! assert_eq!(ets.len(), 1);
//! assert!(ets.entry(0).assert_number("port", 8080.0));
//! reporter.assert_clean();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod check;
pub mod config;
pub mod duration;
pub mod entries;
pub mod entry;
pub mod error;
pub mod field;
pub mod guard;
pub mod matcher;
pub mod reporter;
pub mod sink;

// Re-export main types
pub use check::{check_all, Checker};
pub use config::{DurationUnit, Level, LevelValues, LogConfig, Preset, TimeFormat};
pub use duration::{parse_duration, parse_timeout};
pub use entries::Entries;
pub use entry::{Entry, FieldType};
pub use error::{FieldError, FieldErrorKind, LogTestError, Result};
pub use guard::LogGuard;
pub use matcher::{Matcher, MatcherState};
pub use reporter::{FailureReporter, RecordingReporter, SharedReporter, TracingReporter};
pub use sink::{CaptureSink, CaptureSinkBuilder};
