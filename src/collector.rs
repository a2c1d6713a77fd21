// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The consolidated result store and run-completion tracker.

use crate::{
    errors::IngestError,
    parse::parse_report,
    report::{ReportEvent, TestResult},
};
use camino::Utf8Path;
use indexmap::IndexMap;
use std::{
    fs::{File, OpenOptions},
    io::{self, LineWriter, Write},
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tracing::{debug, warn};
use uuid::Uuid;

/// Collects per-test-case results from a stream of report fragments.
///
/// The runner host delivers one fragment per lifecycle event, possibly from
/// several threads at once. Each `test-case` fragment is merged into the
/// consolidated collection with last-write-wins semantics: when a failed test
/// is retried, the later report replaces the earlier one, so after the run the
/// collection holds only final outcomes. The run-level summary fragment flips
/// a one-shot completion signal that consumers can block on.
///
/// A collector is an ordinary owned value; independent runs use independent
/// collectors.
pub struct RunCollector {
    state: Mutex<CollectorState>,
    completion: Condvar,
    sink: Option<Mutex<Box<dyn ResultSink>>>,
}

#[derive(Debug, Default)]
struct CollectorState {
    results: IndexMap<String, TestResult>,
    complete: bool,
}

/// What [`RunCollector::ingest`] did with a fragment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Ingested {
    /// A test-case record was merged into the collection under this key.
    TestCase {
        /// The key the record was stored under: the test case's name, or a
        /// generated `unnamed-` key if the fragment carried none.
        key: String,
    },

    /// The run-complete marker was observed and the completion signal is now
    /// set.
    RunComplete,

    /// The fragment carried no result data and produced no state change.
    Ignored,
}

impl RunCollector {
    /// Creates a new collector with no result sink.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CollectorState::default()),
            completion: Condvar::new(),
            sink: None,
        }
    }

    /// Creates a new collector that also records each processed test-case
    /// result to the given sink.
    pub fn with_sink(sink: impl ResultSink + 'static) -> Self {
        Self {
            state: Mutex::new(CollectorState::default()),
            completion: Condvar::new(),
            sink: Some(Mutex::new(Box::new(sink))),
        }
    }

    /// Ingests one report fragment.
    ///
    /// The fragment is parsed, classified, and fully applied before this
    /// method returns: a `test-case` fragment is merged into the consolidated
    /// collection, the run-complete marker sets the completion signal
    /// (idempotently), and anything else is ignored. A rejected fragment
    /// produces no state change and does not affect later fragments.
    ///
    /// May be called concurrently from multiple threads; the merge is atomic
    /// with respect to [`snapshot`](Self::snapshot).
    pub fn ingest(&self, fragment: &str) -> Result<Ingested, IngestError> {
        let root = parse_report(fragment)?;
        match ReportEvent::classify(&root)? {
            ReportEvent::RunComplete => {
                let mut state = self.lock_state();
                if !state.complete {
                    state.complete = true;
                    debug!("run-complete marker observed, signaling completion");
                }
                drop(state);
                self.completion.notify_all();
                Ok(Ingested::RunComplete)
            }
            ReportEvent::TestCase(result) => {
                let key = dedup_key(&result);
                {
                    let mut state = self.lock_state();
                    // Last write wins: a retried test case supersedes its
                    // earlier outcome and moves to the end of the collection.
                    state.results.shift_remove(&key);
                    state.results.insert(key.clone(), result.clone());
                }
                self.record_to_sink(&result);
                Ok(Ingested::TestCase { key })
            }
            ReportEvent::Ignored => {
                debug!(tag = %root.name, "ignoring report fragment");
                Ok(Ingested::Ignored)
            }
        }
    }

    /// Blocks until the run-complete marker has been ingested, or until the
    /// timeout elapses if one is given.
    ///
    /// Returns whether completion was observed. Returns `true` immediately if
    /// the signal is already set; callable before, during and after
    /// ingestion, from any thread.
    pub fn wait_for_completion(&self, timeout: Option<Duration>) -> bool {
        let state = self.lock_state();
        match timeout {
            Some(timeout) => {
                let (state, _) = self
                    .completion
                    .wait_timeout_while(state, timeout, |state| !state.complete)
                    .unwrap_or_else(PoisonError::into_inner);
                state.complete
            }
            None => {
                let state = self
                    .completion
                    .wait_while(state, |state| !state.complete)
                    .unwrap_or_else(PoisonError::into_inner);
                state.complete
            }
        }
    }

    /// Returns whether the run-complete marker has been ingested.
    pub fn is_complete(&self) -> bool {
        self.lock_state().complete
    }

    /// Returns a copy of the consolidated collection, keyed by test-case
    /// name.
    ///
    /// Iteration order is insertion order; a superseded test case sits at the
    /// position of its most recent report. Safe to call concurrently with
    /// ingestion, but the contents are only final once
    /// [`wait_for_completion`](Self::wait_for_completion) has returned
    /// `true`.
    pub fn snapshot(&self) -> IndexMap<String, TestResult> {
        self.lock_state().results.clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, CollectorState> {
        // No panic can occur while the lock is held, so a poisoned guard
        // still protects a consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_to_sink(&self, result: &TestResult) {
        let Some(sink) = &self.sink else { return };
        let mut sink = sink.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(error) = sink.record(result) {
            // Sink failures must not abort ingestion.
            warn!("failed to record test result to sink: {error}");
        }
    }
}

impl Default for RunCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the key a result is consolidated under.
///
/// A test case that reported no name is admitted under a generated key, so
/// distinct nameless reports neither merge with each other nor collide with
/// named ones.
fn dedup_key(result: &TestResult) -> String {
    match &result.name {
        Some(name) => name.clone(),
        None => format!("unnamed-{}", Uuid::new_v4()),
    }
}

/// An append-only sink receiving one line per processed test-case record.
///
/// Every processed report is recorded, including ones later superseded by a
/// retry, so the sink doubles as a trace of delivery order.
pub trait ResultSink: Send {
    /// Records one processed test-case result.
    fn record(&mut self, result: &TestResult) -> io::Result<()>;
}

/// A [`ResultSink`] appending the JSON rendering of each record, one per
/// line, to a file.
pub struct FileSink {
    out: LineWriter<File>,
}

impl FileSink {
    /// Opens the file at `path` for appending, creating it if needed.
    pub fn append(path: &Utf8Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            out: LineWriter::new(file),
        })
    }
}

impl ResultSink for FileSink {
    fn record(&mut self, result: &TestResult) -> io::Result<()> {
        let line = result.to_json().map_err(io::Error::other)?;
        writeln!(self.out, "{line}")
    }
}
