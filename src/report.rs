// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification of report fragments and the extracted result record.

use crate::{errors::DurationParseError, parse::Element};
use serde::Serialize;

static TEST_RUN_TAG: &str = "test-run";
static TEST_CASE_TAG: &str = "test-case";
static PROPERTIES_TAG: &str = "properties";
static PROPERTY_TAG: &str = "property";
static FAILURE_TAG: &str = "failure";
static MESSAGE_TAG: &str = "message";
static STACK_TRACE_TAG: &str = "stack-trace";

static NAME_ATTR: &str = "name";
static RESULT_ATTR: &str = "result";
static START_TIME_ATTR: &str = "start-time";
static END_TIME_ATTR: &str = "end-time";
static DURATION_ATTR: &str = "duration";
static VALUE_ATTR: &str = "value";

/// The property key carrying the Zephyr test-management identifier.
pub static ZEPHYR_TEST_ID_PROPERTY: &str = "ZephyrTestId";

/// The property key carrying the TestRail identifier.
pub static TESTRAIL_ID_PROPERTY: &str = "TestRailId";

/// A classified report fragment.
///
/// NUnit emits one fragment per lifecycle event; only two kinds carry state
/// for the consolidated view. Everything else (suites, fixtures, run-start
/// markers) is ignored.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReportEvent {
    /// The run-level summary of a finished run.
    RunComplete,

    /// The outcome of one (possibly retried) test case.
    TestCase(TestResult),

    /// Any other lifecycle event; produces no record and no state change.
    Ignored,
}

impl ReportEvent {
    /// Classifies a parsed fragment, extracting the result record for test
    /// cases.
    pub fn classify(element: &Element) -> Result<Self, DurationParseError> {
        if element.name == TEST_RUN_TAG {
            // A `test-run` node carries a `result` attribute only once the
            // run has finished; without it the run is still in progress.
            return Ok(if element.attr(RESULT_ATTR).is_some() {
                ReportEvent::RunComplete
            } else {
                ReportEvent::Ignored
            });
        }
        if element.name == TEST_CASE_TAG {
            return Ok(ReportEvent::TestCase(TestResult::from_test_case(element)?));
        }
        Ok(ReportEvent::Ignored)
    }
}

/// The durable record extracted from one `test-case` fragment.
///
/// All attributes other than the duration are optional and degrade to `None`
/// when absent. Timestamps are carried as the opaque strings the runner
/// reported; they are never reparsed.
///
/// The record serializes to JSON with PascalCase field names, providing a
/// stable textual rendering for external tooling (see
/// [`to_json`](Self::to_json)).
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestResult {
    /// The name of the test case. This is the identity under which results
    /// are consolidated.
    pub name: Option<String>,

    /// The reported outcome, e.g. `Passed` or `Failed`. Free-form as reported
    /// by the runner.
    pub outcome: Option<String>,

    /// The reported start time of the test case.
    pub start_time: Option<String>,

    /// The reported end time of the test case.
    pub end_time: Option<String>,

    /// The reported duration, rounded to whole seconds with
    /// round-half-to-even semantics.
    pub duration_seconds: i64,

    /// The Zephyr test-management identifier, from the
    /// [`ZEPHYR_TEST_ID_PROPERTY`] custom property.
    pub zephyr_test_id: Option<String>,

    /// The TestRail identifier, from the [`TESTRAIL_ID_PROPERTY`] custom
    /// property.
    pub test_rail_id: Option<String>,

    /// The failure message, present only if the fragment carried a failure
    /// section.
    pub failure_message: Option<String>,

    /// The stack trace, present only if the fragment carried a failure
    /// section.
    pub stack_trace: Option<String>,

    /// A human-readable description of the test case. Reserved: not populated
    /// by extraction.
    pub description: Option<String>,
}

impl TestResult {
    /// Extracts a result record from a parsed `test-case` element.
    ///
    /// Fails only on a missing or non-numeric `duration` attribute; every
    /// other absent attribute or child element yields an absent field.
    pub fn from_test_case(element: &Element) -> Result<Self, DurationParseError> {
        let name = element.attr(NAME_ATTR).map(str::to_owned);
        let duration_seconds = parse_duration(element, &name)?;
        let failure = element.child(FAILURE_TAG);

        Ok(TestResult {
            outcome: element.attr(RESULT_ATTR).map(str::to_owned),
            start_time: element.attr(START_TIME_ATTR).map(str::to_owned),
            end_time: element.attr(END_TIME_ATTR).map(str::to_owned),
            duration_seconds,
            zephyr_test_id: property_value(element, ZEPHYR_TEST_ID_PROPERTY),
            test_rail_id: property_value(element, TESTRAIL_ID_PROPERTY),
            failure_message: failure
                .and_then(|failure| failure.child(MESSAGE_TAG))
                .map(|message| message.text.clone()),
            stack_trace: failure
                .and_then(|failure| failure.child(STACK_TRACE_TAG))
                .map(|stack_trace| stack_trace.text.clone()),
            description: None,
            name,
        })
    }

    /// Serializes this record to its stable JSON rendering.
    ///
    /// Field order matches declaration order and absent fields are rendered
    /// as `null`, so the output is reproducible for a given record.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn parse_duration(element: &Element, name: &Option<String>) -> Result<i64, DurationParseError> {
    let value = element
        .attr(DURATION_ATTR)
        .ok_or_else(|| DurationParseError::Missing { name: name.clone() })?;
    let seconds: f64 = value.parse().map_err(|error| DurationParseError::Invalid {
        name: name.clone(),
        value: value.to_owned(),
        error,
    })?;
    Ok(seconds.round_ties_even() as i64)
}

fn property_value(element: &Element, key: &str) -> Option<String> {
    element
        .child(PROPERTIES_TAG)?
        .children_named(PROPERTY_TAG)
        .find(|property| property.attr(NAME_ATTR) == Some(key))
        .and_then(|property| property.attr(VALUE_ATTR))
        .map(str::to_owned)
}
