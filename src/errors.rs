// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::num::ParseFloatError;
use thiserror::Error;

/// An error that occurs while parsing a report fragment.
///
/// Returned by [`parse_report`](crate::parse_report) and
/// [`RunCollector::ingest`](crate::RunCollector::ingest). The whole fragment is
/// rejected: no partial element tree is ever produced.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MalformedReportError {
    /// The fragment is not well-formed XML.
    #[error("report fragment is not well-formed XML")]
    Xml(#[source] quick_xml::Error),

    /// The fragment contains no root element at all.
    #[error("report fragment has no root element")]
    NoRootElement,

    /// Text or a second element appeared outside the root element.
    #[error("report fragment has content outside the root element")]
    ContentOutsideRoot,

    /// An end tag was seen with no matching open element.
    #[error("end tag `{found}` does not match any open element")]
    UnmatchedEndTag {
        /// The name of the offending end tag.
        found: String,
    },

    /// The fragment ended while an element was still open.
    #[error("element `{name}` is not closed")]
    UnclosedElement {
        /// The name of the element left open.
        name: String,
    },
}

/// An error that occurs while extracting the duration of a test case.
///
/// Every other attribute of a `test-case` node degrades to an absent value when
/// missing; the duration is required and must be numeric.
#[derive(Clone, Debug, Error)]
pub enum DurationParseError {
    /// The `duration` attribute is absent.
    #[error("test case `{}` has no duration attribute", fmt_test_name(.name))]
    Missing {
        /// The name of the test case, if it carried one.
        name: Option<String>,
    },

    /// The `duration` attribute is not a valid floating-point number.
    #[error("test case `{}` has invalid duration `{value}`", fmt_test_name(.name))]
    Invalid {
        /// The name of the test case, if it carried one.
        name: Option<String>,
        /// The attribute value that failed to parse.
        value: String,
        #[source]
        error: ParseFloatError,
    },
}

/// An error returned by [`RunCollector::ingest`](crate::RunCollector::ingest).
///
/// A failed fragment produces no record and no state change; subsequent
/// fragments are unaffected.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The fragment could not be parsed.
    #[error(transparent)]
    MalformedReport(#[from] MalformedReportError),

    /// The fragment was a test case with a missing or invalid duration.
    #[error(transparent)]
    Duration(#[from] DurationParseError),
}

fn fmt_test_name(name: &Option<String>) -> &str {
    name.as_deref().unwrap_or("<unnamed>")
}
