//! End-to-end tests: switch connection in, storage artifacts and sender
//! invocations out.
#![cfg(unix)]

mod common;

use cdr_collect::{CallRecord, FailurePolicy};
use common::{Collector, REJECTED_CALLER, framed, record_line};
use futures::future::join_all;

fn csv(line: &str) -> String {
    cdr_collect::record::parse_line(line)
        .map(|record: CallRecord| record.to_csv())
        .expect("valid record")
}

#[tokio::test]
async fn exports_records_to_csv_and_sender() {
    let collector = Collector::start(FailurePolicy::Abort, false).await;
    let first = record_line("5551234", "77");
    let second = record_line("5551235", "");
    let chunk = format!("PBX HEADER\n{first}\n{second}");

    collector.deliver(&framed(&[chunk.as_str()])).await;

    assert_eq!(collector.lines("cdr.raw"), chunk.lines().collect::<Vec<_>>());
    assert_eq!(collector.lines("cdr.csv"), vec![csv(&first), csv(&second)]);
    assert_eq!(
        collector.lines("sent.log"),
        vec![
            "5551234;5556789;0012;15-03-24 09:30:00".to_owned(),
            "5551235;5556789;0012;15-03-24 09:30:00".to_owned(),
        ]
    );
    // Nine-token lines leave `code_dial` empty.
    assert!(csv(&second).split(';').nth(9).is_some_and(str::is_empty));
    assert_eq!(collector.sender_files().len(), 2);
    collector.stop().await;
}

#[tokio::test]
async fn stream_without_delimiter_writes_nothing() {
    let collector = Collector::start(FailurePolicy::Abort, false).await;

    collector.deliver(record_line("5551234", "77").as_bytes()).await;

    assert!(!collector.exists("cdr.raw"));
    assert!(!collector.exists("cdr.csv"));
    assert!(!collector.exists("sent.log"));
    assert!(collector.sender_files().is_empty());
    collector.stop().await;
}

#[tokio::test]
async fn abort_stops_at_first_rejected_record() {
    let collector = Collector::start(FailurePolicy::Abort, false).await;
    let chunk = [
        record_line("5551234", "77"),
        record_line(REJECTED_CALLER, "77"),
        record_line("5551236", "77"),
    ]
    .join("\n");

    collector
        .deliver(&framed(&[chunk.as_str(), record_line("5551237", "77").as_str()]))
        .await;

    // The rejected record's CSV line is written before the sender runs.
    assert_eq!(collector.lines("cdr.csv").len(), 2);
    assert_eq!(collector.lines("sent.log").len(), 1);
    assert_eq!(collector.lines("cdr.raw").len(), 3);
    collector.stop().await;
}

#[tokio::test]
async fn continue_attempts_every_record() {
    let collector = Collector::start(FailurePolicy::Continue, false).await;
    let chunk = [
        record_line("5551234", "77"),
        record_line(REJECTED_CALLER, "77"),
        record_line("5551236", "77"),
    ]
    .join("\n");

    collector.deliver(&framed(&[chunk.as_str()])).await;

    assert_eq!(collector.lines("cdr.csv").len(), 3);
    let sent = collector.lines("sent.log");
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|line| !line.starts_with(REJECTED_CALLER)));
    collector.stop().await;
}

#[tokio::test]
async fn sent_files_are_removed_when_requested() {
    let collector = Collector::start(FailurePolicy::Abort, true).await;

    collector
        .deliver(&framed(&[record_line("5551234", "77").as_str()]))
        .await;

    assert_eq!(collector.lines("sent.log").len(), 1);
    assert!(collector.sender_files().is_empty());
    collector.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_connections_keep_every_append() {
    const CONNECTIONS: usize = 8;
    const RECORDS: usize = 5;

    let collector = Collector::start(FailurePolicy::Abort, false).await;
    let streams: Vec<Vec<u8>> = (0..CONNECTIONS)
        .map(|conn| {
            let chunks: Vec<String> = (0..RECORDS)
                .map(|rec| record_line(&format!("7{conn:03}{rec:03}"), "77"))
                .collect();
            framed(&chunks.iter().map(String::as_str).collect::<Vec<_>>())
        })
        .collect();

    join_all(streams.iter().map(|bytes| collector.deliver(bytes))).await;

    let mut csv_lines = collector.lines("cdr.csv");
    assert_eq!(csv_lines.len(), CONNECTIONS * RECORDS);
    csv_lines.sort();
    csv_lines.dedup();
    assert_eq!(csv_lines.len(), CONNECTIONS * RECORDS);
    assert!(csv_lines.iter().all(|line| line.split(';').count() == 13));
    assert_eq!(collector.lines("cdr.raw").len(), CONNECTIONS * RECORDS);
    assert_eq!(collector.lines("sent.log").len(), CONNECTIONS * RECORDS);
    assert_eq!(collector.path().read_dir().map(Iterator::count).ok(), Some(CONNECTIONS * RECORDS + 3));
    collector.stop().await;
}
