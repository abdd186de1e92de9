//! The capture sink.
//!
//! [`CaptureSink`] is an append-only destination for log lines. Every write
//! gets the next sequence index. Blocking waits register a [`Matcher`] at the
//! tail of a FIFO queue and each write is offered to the head of that queue
//! only, so waits are satisfied strictly in the order they were registered.
//! The index of the last write that satisfied a wait is kept as the sink's
//! *watermark*; a later [`CaptureSink::wait_for`] only considers entries past
//! it.
//!
//! ```ignore
//! let sink = Arc::new(CaptureSink::new(RecordingReporter::shared()));
//! let _guard = tracing::subscriber::set_default(sink.json_subscriber());
//!
//! tracing::info!(A = 1, "started");
//! let ent = sink.wait_for("1s", &[Checker::number("A", 1.0)]).await;
//! ent.assert_msg("started");
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use crate::check::{check_all, Checker};
use crate::config::LogConfig;
use crate::duration::parse_timeout;
use crate::entries::Entries;
use crate::entry::Entry;
use crate::error::{LogTestError, Result};
use crate::matcher::{Matcher, Outcome};
use crate::reporter::{SharedReporter, TracingReporter};

#[derive(Debug, Default)]
struct SinkState {
    buf: Vec<u8>,
    /// One element per write; the element index is the write index.
    lines: Vec<String>,
    pending: VecDeque<Arc<Matcher>>,
    watermark: Option<usize>,
}

impl SinkState {
    fn push(&mut self, bytes: &[u8]) -> usize {
        let index = self.lines.len();
        self.buf.extend_from_slice(bytes);
        self.lines.push(String::from_utf8_lossy(bytes).into_owned());
        index
    }

    fn next_unclaimed(&self) -> usize {
        self.watermark.map_or(0, |idx| idx + 1)
    }

    fn drop_discarded_head(&mut self) {
        while self.pending.front().is_some_and(|mcr| mcr.is_discarded()) {
            self.pending.pop_front();
        }
    }

    /// Offers an entry to the oldest live wait. Returns true if that wait
    /// captured it; the wait is then dequeued.
    fn offer(&mut self, ent: &Entry) -> bool {
        while let Some(head) = self.pending.front().map(Arc::clone) {
            match head.evaluate(ent) {
                Outcome::Captured => {
                    self.pending.pop_front();
                    return true;
                }
                Outcome::Rejected if !head.is_discarded() => return false,
                // Discarded while being offered; the next wait gets a turn.
                Outcome::Rejected | Outcome::Matched => {
                    self.pending.pop_front();
                }
            }
        }
        false
    }
}

/// Builder for [`CaptureSink`].
#[derive(Default)]
pub struct CaptureSinkBuilder {
    config: Option<LogConfig>,
    reporter: Option<SharedReporter>,
    initial: Vec<u8>,
}

impl CaptureSinkBuilder {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log configuration.
    #[must_use]
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the failure reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: SharedReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Pre-populates the sink. Each line counts as one write.
    #[must_use]
    pub fn with_bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.initial = bytes.into();
        self
    }

    /// Pre-populates the sink from text. Each line counts as one write.
    #[must_use]
    pub fn with_string(self, content: impl Into<String>) -> Self {
        self.with_bytes(content.into().into_bytes())
    }

    /// Builds the sink.
    #[must_use]
    pub fn build(self) -> CaptureSink {
        let mut state = SinkState::default();
        for line in self.initial.split_inclusive(|b| *b == b'\n') {
            state.push(line);
        }
        CaptureSink {
            config: Arc::new(self.config.unwrap_or_default()),
            reporter: self
                .reporter
                .unwrap_or_else(|| Arc::new(TracingReporter::new())),
            state: Mutex::new(state),
        }
    }
}

impl fmt::Debug for CaptureSinkBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSinkBuilder")
            .field("config", &self.config)
            .field("initial_len", &self.initial.len())
            .finish_non_exhaustive()
    }
}

/// Append-only destination for structured log lines.
///
/// `&CaptureSink` implements [`io::Write`], so `Arc<CaptureSink>` can be
/// handed to a `tracing_subscriber` formatter as its writer.
pub struct CaptureSink {
    config: Arc<LogConfig>,
    reporter: SharedReporter,
    state: Mutex<SinkState>,
}

/// Removes a wait's matcher from the queue however the wait ends.
struct PendingGuard<'a> {
    sink: &'a CaptureSink,
    matcher: Arc<Matcher>,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.sink.withdraw(&self.matcher);
    }
}

impl CaptureSink {
    /// Creates an empty sink with the default configuration.
    #[must_use]
    pub fn new(reporter: SharedReporter) -> Self {
        Self::builder().with_reporter(reporter).build()
    }

    /// Returns a sink builder.
    #[must_use]
    pub fn builder() -> CaptureSinkBuilder {
        CaptureSinkBuilder::new()
    }

    /// Creates a sink pre-populated with the contents of a log file.
    ///
    /// # Errors
    ///
    /// Read failures are reported and returned.
    pub fn load(path: impl AsRef<Path>, reporter: SharedReporter) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read(path) {
            Ok(bytes) => Ok(Self::builder()
                .with_reporter(reporter)
                .with_bytes(bytes)
                .build()),
            Err(err) => {
                tracing::debug!(target: "claw_logtest", path = %path.display(), error = %err, "log load failed");
                reporter.report_failure(LogTestError::Io(io::Error::new(err.kind(), err.to_string())));
                Err(err.into())
            }
        }
    }

    /// Returns the log configuration.
    #[must_use]
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Returns the failure reporter.
    #[must_use]
    pub fn reporter(&self) -> &SharedReporter {
        &self.reporter
    }

    fn fail(&self, err: LogTestError) {
        self.reporter.helper();
        self.reporter.report_failure(err);
    }

    fn zero_entry(&self) -> Entry {
        Entry::zero(Arc::clone(&self.config), Arc::clone(&self.reporter))
    }

    fn parse(&self, index: usize, line: &str) -> Result<Entry> {
        Entry::parse(
            Arc::clone(&self.config),
            Arc::clone(&self.reporter),
            index,
            line,
        )
    }

    /// Decodes the line written at `index`. Blank lines yield nothing;
    /// undecodable lines are reported and yield nothing.
    fn decode(&self, index: usize, line: &str) -> Option<Entry> {
        if line.trim().is_empty() {
            return None;
        }
        self.parse(index, line).map_err(|err| self.fail(err)).ok()
    }

    /// Appends one log line and offers it to the oldest pending wait.
    ///
    /// Returns the write index of the line.
    pub fn write_line(&self, bytes: &[u8]) -> usize {
        let mut decode_err = None;
        let (index, claimed) = {
            let mut state = self.state.lock();
            let index = state.push(bytes);
            state.drop_discarded_head();
            let mut claimed = false;
            if !state.pending.is_empty() && !state.lines[index].trim().is_empty() {
                match self.parse(index, &state.lines[index]) {
                    Ok(ent) => claimed = state.offer(&ent),
                    Err(err) => decode_err = Some(err),
                }
            }
            if claimed {
                state.watermark = Some(index);
            }
            (index, claimed)
        };
        // Reported outside the lock: a reporter may log into this sink.
        if let Some(err) = decode_err {
            self.fail(err);
        }
        tracing::trace!(target: "claw_logtest", index, len = bytes.len(), claimed, "log line captured");
        index
    }

    /// Takes a wait's matcher out of the queue and returns what it captured.
    ///
    /// An uncaptured matcher is discarded while the sink is locked, so no
    /// write can claim an entry for it afterwards.
    fn withdraw(&self, matcher: &Arc<Matcher>) -> Option<Entry> {
        let (captured, discarded) = {
            let mut state = self.state.lock();
            state.pending.retain(|mcr| !Arc::ptr_eq(mcr, matcher));
            let captured = matcher.captured();
            let discarded = match captured {
                Some(_) => None,
                None => matcher.close(),
            };
            (captured, discarded)
        };
        if let Some(matches) = discarded {
            tracing::debug!(target: "claw_logtest", matches, "matcher discarded");
        }
        captured
    }

    /// Returns the number of writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().lines.len()
    }

    /// Returns true if nothing was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy of everything written so far.
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        self.state.lock().buf.clone()
    }

    /// Returns the number of waits still queued.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state
            .lock()
            .pending
            .iter()
            .filter(|mcr| !mcr.is_discarded())
            .count()
    }

    /// Returns the index of the last entry claimed by a wait.
    #[must_use]
    pub fn watermark(&self) -> Option<usize> {
        self.state.lock().watermark
    }

    /// Forgets the watermark so the next wait considers every entry.
    pub fn reset_last_match(&self) {
        self.restore_watermark(None);
    }

    /// Sets the watermark to a value previously returned by
    /// [`CaptureSink::watermark`].
    pub fn restore_watermark(&self, watermark: Option<usize>) {
        self.state.lock().watermark = watermark;
    }

    /// Returns a snapshot of every decodable entry in write order.
    ///
    /// Lines that are not JSON objects are reported and left out; the
    /// remaining entries keep their write index.
    #[must_use]
    pub fn entries(&self) -> Entries {
        let lines = self.state.lock().lines.clone();
        self.entries_of(&lines)
    }

    fn entries_of(&self, lines: &[String]) -> Entries {
        let entries = lines
            .iter()
            .enumerate()
            .filter_map(|(idx, line)| self.decode(idx, line))
            .collect();
        Entries::new(Arc::clone(&self.config), entries, Arc::clone(&self.reporter))
    }

    /// Returns the entries satisfying every checker.
    #[must_use]
    pub fn filter(&self, checks: &[Checker]) -> Entries {
        let matched = self
            .entries()
            .get()
            .iter()
            .filter(|ent| check_all(ent, checks).is_ok())
            .cloned()
            .collect();
        Entries::new(Arc::clone(&self.config), matched, Arc::clone(&self.reporter))
    }

    /// Returns the first entry the matcher accepts.
    ///
    /// Reports a failure with every captured entry and returns the zero
    /// entry when none does. The matcher's state and count are updated.
    pub fn match_with(&self, matcher: &Matcher) -> Entry {
        let entries = self.entries();
        if let Some(ent) = entries.get().iter().find(|ent| matcher.match_entry(ent)) {
            return ent.clone();
        }
        self.fail(LogTestError::NotFound {
            summary: entries.summary_indented(1),
        });
        self.zero_entry()
    }

    /// Returns the first entry, or the zero entry if there is none.
    #[must_use]
    pub fn first_entry(&self) -> Entry {
        self.entries()
            .get()
            .first()
            .cloned()
            .unwrap_or_else(|| self.zero_entry())
    }

    /// Returns the last entry, or the zero entry if there is none.
    #[must_use]
    pub fn last_entry(&self) -> Entry {
        self.entries()
            .get()
            .last()
            .cloned()
            .unwrap_or_else(|| self.zero_entry())
    }

    /// Waits for an entry past the watermark that satisfies every checker.
    ///
    /// Entries captured before the call are considered first. Otherwise the
    /// wait is queued behind earlier waits and the matching write advances
    /// the watermark. When `timeout` passes, a failure listing every captured
    /// entry is reported and the zero entry is returned. A malformed timeout
    /// is reported and returns the zero entry immediately.
    pub async fn wait_for(&self, timeout: &str, checks: &[Checker]) -> Entry {
        let limit = match parse_timeout(timeout) {
            Ok(limit) => limit,
            Err(err) => {
                self.fail(err);
                return self.zero_entry();
            }
        };

        let matcher = Arc::new(Matcher::new(
            Arc::clone(&self.config),
            Arc::clone(&self.reporter),
            checks.to_vec(),
        ));

        let mut rx = matcher.listen();
        let mut decode_errs = Vec::new();
        let replayed = {
            let mut state = self.state.lock();
            let start = state.next_unclaimed();
            let replayed = state
                .lines
                .iter()
                .enumerate()
                .skip(start)
                .filter(|(_, line)| !line.trim().is_empty())
                .filter_map(|(idx, line)| {
                    self.parse(idx, line).map_err(|err| decode_errs.push(err)).ok()
                })
                .find(|ent| check_all(ent, checks).is_ok());
            match &replayed {
                Some(ent) => state.watermark = Some(ent.index()),
                None => state.pending.push_back(Arc::clone(&matcher)),
            }
            replayed
        };
        for err in decode_errs {
            self.fail(err);
        }
        if let Some(ent) = replayed {
            tracing::trace!(target: "claw_logtest", index = ent.index(), "wait satisfied by captured entry");
            return ent;
        }
        tracing::debug!(target: "claw_logtest", timeout, "wait registered");
        let _pending = PendingGuard {
            sink: self,
            matcher: Arc::clone(&matcher),
        };

        tokio::select! {
            Some(ent) = rx.recv() => return ent,
            () = tokio::time::sleep(limit) => {}
        }

        // The match may have landed just as the timer fired.
        if let Some(ent) = self.withdraw(&matcher) {
            return ent;
        }

        tracing::warn!(target: "claw_logtest", timeout, "timed out waiting for log entry");
        self.fail(LogTestError::Timeout {
            timeout: timeout.to_string(),
            summary: self.entries().summary_indented(1),
        });
        self.zero_entry()
    }

    /// Like [`CaptureSink::wait_for`] but leaves the watermark as it was, so
    /// repeated calls may match entries in any order.
    ///
    /// The watermark is put back only while it still points at the entry this
    /// call claimed. An advance made meanwhile by another wait is kept, and a
    /// cancelled call leaves the watermark wherever it is.
    pub async fn wait_for_any(&self, timeout: &str, checks: &[Checker]) -> Entry {
        let saved = self.watermark();
        let ent = self.wait_for(timeout, checks).await;
        if !ent.is_zero() {
            let mut state = self.state.lock();
            if state.watermark == Some(ent.index()) {
                state.watermark = saved;
            }
        }
        ent
    }

    /// Clears the captured lines, the write count, the wait queue and the
    /// watermark.
    ///
    /// Waits in progress are dequeued but not discarded; they end with their
    /// own timeout.
    pub fn reset(&self) {
        {
            let mut state = self.state.lock();
            state.buf.clear();
            state.lines.clear();
            state.pending.clear();
            state.watermark = None;
        }
        tracing::debug!(target: "claw_logtest", "capture sink reset");
    }

    /// Returns a JSON `tracing` subscriber writing into this sink.
    ///
    /// Events are flattened so their fields sit next to `level`, `message`
    /// and `timestamp`, which is the layout [`LogConfig::tracing`] expects.
    /// This crate's own diagnostics are filtered out.
    pub fn json_subscriber(self: &Arc<Self>) -> impl tracing::Subscriber + Send + Sync + use<> {
        tracing_subscriber::fmt()
            .json()
            .flatten_event(true)
            .with_env_filter(EnvFilter::new("trace,claw_logtest=off"))
            .with_writer(Arc::clone(self))
            .finish()
    }
}

impl io::Write for &CaptureSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_line(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for CaptureSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_line(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Display for CaptureSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.state.lock().buf))
    }
}

impl fmt::Debug for CaptureSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CaptureSink")
            .field("config", &self.config)
            .field("writes", &state.lines.len())
            .field("pending", &state.pending.len())
            .field("watermark", &state.watermark)
            .finish_non_exhaustive()
    }
}

impl Drop for CaptureSink {
    fn drop(&mut self) {
        for mcr in self.state.get_mut().pending.drain(..) {
            mcr.discard();
        }
    }
}
