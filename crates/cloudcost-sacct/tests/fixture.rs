//! Reads a captured sacct dump end to end.

use std::path::PathBuf;

use cloudcost_sacct::{JobRecord, ParseError, ParseOptions, RecordOutcome, SacctReader, SkipReason};

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sample.sacct")
}

struct Summary {
    jobs: Vec<JobRecord>,
    skipped: Vec<(usize, SkipReason)>,
    errors: Vec<(usize, ParseError)>,
}

fn read(include_failed: bool) -> Summary {
    let options = ParseOptions {
        include_failed,
        ..ParseOptions::default()
    };
    let mut summary = Summary {
        jobs: Vec::new(),
        skipped: Vec::new(),
        errors: Vec::new(),
    };
    for (line, outcome) in SacctReader::open(&fixture(), options).unwrap() {
        match outcome {
            Ok(RecordOutcome::Job(job)) => summary.jobs.push(job),
            Ok(RecordOutcome::Skipped(reason)) => summary.skipped.push((line, reason)),
            Err(e) => summary.errors.push((line, e)),
        }
    }
    summary
}

#[test]
fn completed_jobs_only_by_default() {
    let summary = read(false);
    let ids: Vec<&str> = summary.jobs.iter().map(|j| j.job_id.as_str()).collect();
    assert_eq!(ids, ["1001.batch", "1002.0"]);

    let gpu_job = &summary.jobs[1];
    assert_eq!(gpu_job.gpus, 2);
    assert_eq!(gpu_job.cpus, 16);
    assert_eq!(gpu_job.nodes, 2);
    assert_eq!(gpu_job.max_rss_mb, 58_000.0);
    assert_eq!(gpu_job.elapsed_minutes, 1560.0);

    let first = &summary.jobs[0];
    assert_eq!(first.elapsed_minutes, 12.5);
    assert_eq!(first.billed_minutes, 13.0);
}

#[test]
fn skips_are_classified() {
    let summary = read(false);
    let reasons: Vec<&SkipReason> = summary.skipped.iter().map(|(_, r)| r).collect();
    assert_eq!(
        reasons,
        [
            &SkipReason::Initiator,
            &SkipReason::Initiator,
            &SkipReason::State("CANCELLED".to_string()),
            &SkipReason::State("OUT_OF_MEMORY".to_string()),
            &SkipReason::ZeroDuration,
            &SkipReason::ZeroDuration,
        ]
    );
}

#[test]
fn malformed_lines_are_reported_with_line_numbers() {
    let summary = read(true);
    assert_eq!(summary.errors.len(), 2);
    assert_eq!(summary.errors[0].0, 11);
    assert!(matches!(summary.errors[0].1, ParseError::InvalidNumber { field: "cpu", .. }));
    assert_eq!(summary.errors[1].0, 12);
    assert!(matches!(summary.errors[1].1, ParseError::ShortRecord { expected: 9, found: 4 }));
}

#[test]
fn include_failed_adds_failed_states() {
    let summary = read(true);
    let ids: Vec<&str> = summary.jobs.iter().map(|j| j.job_id.as_str()).collect();
    assert_eq!(ids, ["1001.batch", "1002.0", "1003.0", "1004.0"]);

    let oom = &summary.jobs[3];
    assert_eq!(oom.max_rss_mb, 31_500.0);
    let demand = oom.to_demand().unwrap();
    assert!(demand.mem_mb() > 34_000.0);
}
