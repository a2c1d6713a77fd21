// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collect NUnit test event reports in Rust.
//!
//! NUnit-based runners can notify an extension of every lifecycle event by
//! handing it one XML report fragment per event. This crate ingests that
//! stream: it parses each fragment, extracts a [`TestResult`] from every
//! `test-case` report, and maintains a consolidated view with one final
//! record per test case. When a failed test is retried, the later report
//! supersedes the earlier one, so the consolidated view reflects final
//! outcomes only. The run-level summary fragment flips a completion signal
//! that downstream consumers can block on.
//!
//! # Example
//!
//! ```
//! use quick_nunit::RunCollector;
//!
//! let collector = RunCollector::new();
//!
//! // The first attempt fails; the retry passes and supersedes it.
//! collector.ingest(r#"<test-case name="T1" result="Failed" duration="0.8"/>"#)?;
//! collector.ingest(r#"<test-case name="T1" result="Passed" duration="0.7"/>"#)?;
//! collector.ingest(r#"<test-run id="2" result="Passed"/>"#)?;
//!
//! assert!(collector.wait_for_completion(None));
//! let results = collector.snapshot();
//! assert_eq!(results.len(), 1);
//! assert_eq!(results["T1"].outcome.as_deref(), Some("Passed"));
//! # Ok::<(), quick_nunit::IngestError>(())
//! ```

mod collector;
mod errors;
mod parse;
mod report;

pub use collector::*;
pub use errors::*;
pub use parse::*;
pub use report::*;
