//! Tests for retry-queue, quality, match, records, run-status.

use super::parse;
use crate::cli::CliCommand;
use bidradar_core::normalize::RecordKind;
use std::path::PathBuf;

#[test]
fn cli_parse_retry_queue() {
    match parse(&["bidradar", "retry-queue", "awards", "--output-dir", "out"]) {
        CliCommand::RetryQueue { kind, output_dir } => {
            assert_eq!(kind, RecordKind::Award);
            assert_eq!(output_dir, Some(PathBuf::from("out")));
        }
        _ => panic!("expected RetryQueue"),
    }
}

#[test]
fn cli_parse_quality() {
    match parse(&["bidradar", "quality", "collected_bids_mock_r1.json", "--json"]) {
        CliCommand::Quality { artifact, json } => {
            assert_eq!(artifact, PathBuf::from("collected_bids_mock_r1.json"));
            assert!(json);
        }
        _ => panic!("expected Quality"),
    }
}

#[test]
fn cli_parse_match() {
    match parse(&["bidradar", "match", "awards.json", "bids.json"]) {
        CliCommand::Match { awards, bids } => {
            assert_eq!(awards, PathBuf::from("awards.json"));
            assert_eq!(bids, PathBuf::from("bids.json"));
        }
        _ => panic!("expected Match"),
    }
}

#[test]
fn cli_parse_records() {
    match parse(&["bidradar", "records", "bids"]) {
        CliCommand::Records { kind, limit } => {
            assert_eq!(kind, RecordKind::Bid);
            assert_eq!(limit, 10);
        }
        _ => panic!("expected Records"),
    }
    match parse(&["bidradar", "records", "awards", "--limit", "3"]) {
        CliCommand::Records { limit, .. } => assert_eq!(limit, 3),
        _ => panic!("expected Records"),
    }
}

#[test]
fn cli_parse_run_status() {
    match parse(&["bidradar", "run-status", "awards_20240115_103000", "--kind", "awards"]) {
        CliCommand::RunStatus {
            run_id,
            kind,
            output_dir,
        } => {
            assert_eq!(run_id, "awards_20240115_103000");
            assert_eq!(kind, RecordKind::Award);
            assert!(output_dir.is_none());
        }
        _ => panic!("expected RunStatus"),
    }
}
