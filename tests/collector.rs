// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use pretty_assertions::assert_eq;
use quick_nunit::{FileSink, IngestError, Ingested, RunCollector};
use std::{thread, time::Duration};

fn test_case_fragment(name: &str, result: &str, duration: &str) -> String {
    format!(r#"<test-case name="{name}" result="{result}" duration="{duration}"/>"#)
}

#[test]
fn retried_test_case_is_superseded_by_its_last_report() {
    let collector = RunCollector::new();
    collector
        .ingest(&test_case_fragment("T1", "Failed", "0.1"))
        .expect("first report ingests");
    collector
        .ingest(&test_case_fragment("T1", "Passed", "0.2"))
        .expect("retry report ingests");

    let results = collector.snapshot();
    assert_eq!(results.len(), 1);
    assert_eq!(results["T1"].outcome.as_deref(), Some("Passed"));
}

#[test]
fn superseded_test_case_moves_to_the_end() {
    let collector = RunCollector::new();
    collector
        .ingest(&test_case_fragment("T1", "Failed", "0.1"))
        .unwrap();
    collector
        .ingest(&test_case_fragment("T2", "Passed", "0.1"))
        .unwrap();
    collector
        .ingest(&test_case_fragment("T1", "Passed", "0.1"))
        .unwrap();

    let keys: Vec<_> = collector.snapshot().keys().cloned().collect();
    assert_eq!(keys, ["T2", "T1"]);
}

#[test]
fn run_marker_without_result_does_not_complete() {
    let collector = RunCollector::new();
    let ingested = collector
        .ingest(r#"<test-run id="2" total="10"/>"#)
        .expect("in-progress run marker ingests");
    assert_eq!(ingested, Ingested::Ignored);
    assert!(!collector.is_complete());
    assert!(!collector.wait_for_completion(Some(Duration::from_millis(10))));
}

#[test]
fn run_marker_with_result_completes_idempotently() {
    let collector = RunCollector::new();
    for _ in 0..3 {
        let ingested = collector
            .ingest(r#"<test-run id="2" result="Passed"/>"#)
            .expect("run-complete marker ingests");
        assert_eq!(ingested, Ingested::RunComplete);
        assert!(collector.is_complete());
    }
    // Already-set signal: an immediate true, with or without a timeout.
    assert!(collector.wait_for_completion(None));
    assert!(collector.wait_for_completion(Some(Duration::ZERO)));
}

#[test]
fn wait_unblocks_when_completion_arrives() {
    let collector = RunCollector::new();
    thread::scope(|scope| {
        scope.spawn(|| {
            thread::sleep(Duration::from_millis(50));
            collector
                .ingest(r#"<test-run id="2" result="Passed"/>"#)
                .expect("run-complete marker ingests");
        });
        assert!(collector.wait_for_completion(Some(Duration::from_secs(60))));
    });
}

#[test]
fn suite_and_fixture_fragments_change_nothing() {
    let collector = RunCollector::new();
    let ingested = collector
        .ingest(r#"<test-suite type="TestFixture" name="Fixture1" result="Passed"/>"#)
        .expect("suite fragment ingests");
    assert_eq!(ingested, Ingested::Ignored);
    assert!(collector.snapshot().is_empty());
    assert!(!collector.is_complete());
}

#[test]
fn malformed_fragment_leaves_the_collection_unchanged() {
    let collector = RunCollector::new();
    collector
        .ingest(&test_case_fragment("T1", "Passed", "0.1"))
        .unwrap();

    let error = collector
        .ingest(r#"<test-case name="T2"><failure></test-case>"#)
        .unwrap_err();
    assert!(matches!(error, IngestError::MalformedReport(_)), "{error:?}");

    let results = collector.snapshot();
    assert_eq!(results.len(), 1);
    assert!(results.contains_key("T1"));
}

#[test]
fn bad_duration_rejects_only_that_fragment() {
    let collector = RunCollector::new();
    let error = collector
        .ingest(r#"<test-case name="T1" result="Passed"/>"#)
        .unwrap_err();
    assert!(matches!(error, IngestError::Duration(_)), "{error:?}");
    assert!(collector.snapshot().is_empty());

    // The stream continues unaffected.
    collector
        .ingest(&test_case_fragment("T2", "Passed", "0.1"))
        .unwrap();
    assert_eq!(collector.snapshot().len(), 1);
}

#[test]
fn nameless_test_cases_are_kept_under_distinct_keys() {
    let collector = RunCollector::new();
    for _ in 0..2 {
        let ingested = collector
            .ingest(r#"<test-case result="Passed" duration="0.1"/>"#)
            .expect("nameless test case ingests");
        let Ingested::TestCase { key } = ingested else {
            panic!("expected a test case, got {ingested:?}");
        };
        assert!(key.starts_with("unnamed-"), "unexpected key {key}");
    }

    let results = collector.snapshot();
    assert_eq!(results.len(), 2);
    for result in results.values() {
        assert_eq!(result.name, None);
    }
}

#[test]
fn concurrent_ingestion_keeps_every_distinct_test_case() {
    let collector = RunCollector::new();
    thread::scope(|scope| {
        for i in 0..100 {
            let collector = &collector;
            scope.spawn(move || {
                collector
                    .ingest(&test_case_fragment(&format!("case-{i}"), "Passed", "0.5"))
                    .expect("fragment ingests");
            });
        }
    });
    collector
        .ingest(r#"<test-run id="2" result="Passed"/>"#)
        .unwrap();
    assert!(collector.wait_for_completion(Some(Duration::from_secs(5))));

    let results = collector.snapshot();
    assert_eq!(results.len(), 100);
    for i in 0..100 {
        let result = &results[&format!("case-{i}")];
        assert_eq!(result.outcome.as_deref(), Some("Passed"));
        assert_eq!(result.duration_seconds, 0);
    }
}

#[test]
fn file_sink_records_every_processed_report() {
    let dir = camino_tempfile::tempdir().expect("temp dir is created");
    let log_path = dir.path().join("test-events.log");

    let collector =
        RunCollector::with_sink(FileSink::append(&log_path).expect("sink file opens"));
    collector
        .ingest(&test_case_fragment("T1", "Failed", "0.1"))
        .unwrap();
    collector
        .ingest(&test_case_fragment("T1", "Passed", "0.2"))
        .unwrap();
    drop(collector);

    let contents = std::fs::read_to_string(&log_path).expect("log file is readable");
    let lines: Vec<_> = contents.lines().collect();
    // Both reports are recorded, even though only one survives consolidation.
    assert_eq!(lines.len(), 2);
    for line in &lines {
        let value: serde_json::Value = serde_json::from_str(line).expect("line is valid JSON");
        assert_eq!(value["Name"], "T1");
    }
}
