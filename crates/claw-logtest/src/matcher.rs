//! Matching and notification state machine.
//!
//! A [`Matcher`] holds a set of [`Checker`]s and remembers the first entry
//! that satisfied all of them. It starts *armed*, becomes *satisfied* at most
//! once and can be *discarded* at any time; both terminal states release the
//! completion signal. Independently of that one-shot capture it counts every
//! successful evaluation.
//!
//! A waiter can ask for matched entries to be delivered over a channel with
//! [`Matcher::listen`]. The channel holds one entry and is filled without
//! blocking, so the thread that triggered the match (usually a producer
//! writing a log line) never waits for the receiver.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::check::{check_all, Checker};
use crate::config::LogConfig;
use crate::entry::Entry;
use crate::reporter::SharedReporter;

/// Lifecycle state of a [`Matcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherState {
    /// Waiting for a satisfying entry.
    Armed,
    /// An entry satisfied every checker.
    Satisfied,
    /// Cancelled before it was satisfied, or after its capture was dropped.
    Discarded,
}

/// What one evaluation did to a matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// A checker failed.
    Rejected,
    /// Every checker passed but the matcher was no longer armed.
    Matched,
    /// Every checker passed and this evaluation moved the matcher from armed
    /// to satisfied.
    Captured,
}

#[derive(Debug)]
enum State {
    Armed,
    Satisfied(Entry),
    Discarded,
}

#[derive(Debug)]
struct Inner {
    state: State,
    match_count: usize,
    listener: Option<mpsc::Sender<Entry>>,
}

/// Stateful predicate evaluator with one-shot capture.
pub struct Matcher {
    config: Arc<LogConfig>,
    reporter: SharedReporter,
    checks: Vec<Checker>,
    inner: Mutex<Inner>,
    done: CancellationToken,
}

impl Matcher {
    /// Creates an armed matcher. With no checks it matches every entry.
    #[must_use]
    pub fn new(config: Arc<LogConfig>, reporter: SharedReporter, checks: Vec<Checker>) -> Self {
        Self {
            config,
            reporter,
            checks,
            inner: Mutex::new(Inner {
                state: State::Armed,
                match_count: 0,
                listener: None,
            }),
            done: CancellationToken::new(),
        }
    }

    /// Returns the checkers.
    #[must_use]
    pub fn checks(&self) -> &[Checker] {
        &self.checks
    }

    /// Returns how many evaluations succeeded so far.
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.inner.lock().match_count
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> MatcherState {
        match self.inner.lock().state {
            State::Armed => MatcherState::Armed,
            State::Satisfied(_) => MatcherState::Satisfied,
            State::Discarded => MatcherState::Discarded,
        }
    }

    /// Returns true once the matcher is satisfied or discarded.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Returns true if the matcher was discarded.
    #[must_use]
    pub fn is_discarded(&self) -> bool {
        matches!(self.inner.lock().state, State::Discarded)
    }

    /// Returns the first entry that satisfied every checker.
    #[must_use]
    pub fn captured(&self) -> Option<Entry> {
        match &self.inner.lock().state {
            State::Satisfied(ent) => Some(ent.clone()),
            State::Armed | State::Discarded => None,
        }
    }

    /// Resolves once the matcher is satisfied or discarded.
    pub async fn done(&self) {
        self.done.cancelled().await;
    }

    /// Registers a delivery channel and returns its receiving half.
    ///
    /// A previously registered channel is closed. A discarded matcher hands
    /// out an already closed channel.
    pub fn listen(&self) -> mpsc::Receiver<Entry> {
        let (tx, rx) = mpsc::channel(1);
        let mut inner = self.inner.lock();
        if !matches!(inner.state, State::Discarded) {
            inner.listener = Some(tx);
        }
        rx
    }

    /// Closes the delivery channel. Calling it again has no effect.
    pub fn stop_listening(&self) {
        self.inner.lock().listener = None;
    }

    /// Runs every checker against `entry`.
    ///
    /// Returns true if they all pass. The first passing entry is captured and
    /// releases the completion signal; every pass increments the match count
    /// and is offered to the listener.
    pub fn match_entry(&self, entry: &Entry) -> bool {
        self.evaluate(entry) != Outcome::Rejected
    }

    /// Like [`Matcher::match_entry`], but tells a capturing evaluation apart
    /// from one that passed on a matcher already satisfied or discarded.
    pub(crate) fn evaluate(&self, entry: &Entry) -> Outcome {
        let mut inner = self.inner.lock();
        if check_all(entry, &self.checks).is_err() {
            return Outcome::Rejected;
        }

        inner.match_count += 1;
        let outcome = if matches!(inner.state, State::Armed) {
            inner.state = State::Satisfied(entry.clone());
            self.done.cancel();
            Outcome::Captured
        } else {
            Outcome::Matched
        };
        if let Some(tx) = &inner.listener {
            if let Err(err) = tx.try_send(entry.clone()) {
                tracing::warn!(
                    target: "claw_logtest",
                    index = entry.index(),
                    error = %err,
                    "matched entry not delivered to listener"
                );
            }
        }
        outcome
    }

    /// Decodes one captured line and evaluates it.
    ///
    /// Returns the entry when it satisfies every checker. A line that is not
    /// a JSON object is reported and never matches.
    pub fn match_line(&self, index: usize, raw: &str) -> Option<Entry> {
        let entry = match Entry::parse(
            Arc::clone(&self.config),
            Arc::clone(&self.reporter),
            index,
            raw,
        ) {
            Ok(entry) => entry,
            Err(err) => {
                self.reporter.report_failure(err);
                return None;
            }
        };
        self.match_entry(&entry).then_some(entry)
    }

    /// Cancels the matcher, drops any captured entry and closes the listener.
    ///
    /// Calling it again has no effect.
    pub fn discard(&self) {
        if let Some(matches) = self.close() {
            tracing::debug!(target: "claw_logtest", matches, "matcher discarded");
        }
    }

    /// Discards without logging. Returns the match count if this call did
    /// the discarding.
    pub(crate) fn close(&self) -> Option<usize> {
        let mut inner = self.inner.lock();
        inner.listener = None;
        self.done.cancel();
        if matches!(inner.state, State::Discarded) {
            return None;
        }
        inner.state = State::Discarded;
        Some(inner.match_count)
    }
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("checks", &self.checks)
            .field("inner", &*self.inner.lock())
            .finish_non_exhaustive()
    }
}
