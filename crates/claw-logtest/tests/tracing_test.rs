//! Integration tests feeding the capture sink from a `tracing` subscriber.

use std::sync::Arc;

use chrono::Utc;
use claw_logtest::{CaptureSink, Checker, Level, LogConfig, LogGuard, RecordingReporter};

// ==================== Helper Functions ====================

fn make_sink() -> (Arc<CaptureSink>, Arc<RecordingReporter>) {
    let reporter = RecordingReporter::shared();
    let sink = Arc::new(
        CaptureSink::builder()
            .with_config(LogConfig::tracing())
            .with_reporter(reporter.clone())
            .build(),
    );
    (sink, reporter)
}

// ==================== Subscriber Tests ====================

#[test]
fn test_tracing_events_are_captured() {
    let (sink, reporter) = make_sink();

    tracing::subscriber::with_default(sink.json_subscriber(), || {
        tracing::info!(port = 8080, "listener started");
        tracing::warn!(error = "connection reset", "peer dropped");
    });

    let ets = sink.entries();
    assert!(ets.assert_len(2));
    assert!(ets.assert_msg("listener started"));
    assert!(ets.assert_error("connection reset"));
    assert!(ets.assert_no_msg_contain("panic"));

    let first = sink.first_entry();
    assert!(first.assert_level("INFO"));
    assert!(first.assert_number("port", 8080.0));
    assert!(first.assert_logged_within(Utc::now(), "10s"));

    let warnings = sink.filter(&[Checker::level_is(Level::Warn)]);
    assert_eq!(warnings.len(), 1);
    reporter.assert_clean();
}

#[test]
fn test_internal_diagnostics_are_not_captured() {
    let (sink, reporter) = make_sink();

    tracing::subscriber::with_default(sink.json_subscriber(), || {
        tracing::info!(target: "claw_logtest", "internal");
        tracing::info!("visible");
    });

    let ets = sink.entries();
    assert!(ets.assert_len(1));
    assert!(ets.assert_msg("visible"));
    reporter.assert_clean();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_wait_for_tracing_event() {
    let (sink, reporter) = make_sink();

    let producer = {
        let subscriber = sink.json_subscriber();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            tracing::subscriber::with_default(subscriber, || {
                tracing::debug!(step = 1, "warming up");
                tracing::info!(step = 2, "ready");
            });
        })
    };

    let ent = sink.wait_for("2s", &[Checker::msg("ready")]).await;
    producer.await.expect("producer panicked");

    assert!(ent.assert_number("step", 2.0));
    assert_eq!(ent.index(), 1);
    reporter.assert_clean();
}

// ==================== Guard Tests ====================

#[test]
fn test_guard_reports_unexamined_tracing_output() {
    let reporter = RecordingReporter::shared();
    {
        let guard = LogGuard::with_config(LogConfig::tracing(), reporter.clone());
        let sink = guard.writer();
        tracing::subscriber::with_default(sink.json_subscriber(), || {
            tracing::error!("disk full");
        });
        guard.ignore_non_error_logs();
    }
    let failures = reporter.take();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].starts_with("expected logs to be examined:\n  message cnt: 1\n"));
}

#[test]
fn test_guard_examined_output_passes() {
    let reporter = RecordingReporter::shared();
    {
        let guard = LogGuard::with_config(LogConfig::tracing(), reporter.clone());
        let sink = guard.writer();
        tracing::subscriber::with_default(sink.json_subscriber(), || {
            tracing::info!(user = "alice", "login");
        });
        assert!(guard.examine_log().entries().assert_str("user", "alice"));
    }
    reporter.assert_clean();
}
