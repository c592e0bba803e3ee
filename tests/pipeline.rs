//! End-to-end scenarios exercising the full parse -> dedup -> write path
//! against a real temporary directory.

use std::sync::Arc;
use std::time::Duration;

use syslog_mamont::dedup::WindowedDeduplicator;
use syslog_mamont::pipeline::Pipeline;
use syslog_mamont::writer::FileWriter;

fn read_lines(dir: &std::path::Path, file: &str) -> Vec<String> {
    std::fs::read_to_string(dir.join(file))
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn rfc3164_message_lands_in_its_severity_file_tagged_with_source() {
    let dir = tempfile::tempdir().unwrap();
    let dedup = Arc::new(WindowedDeduplicator::with_default_window());
    let writer = Arc::new(FileWriter::with_defaults(dir.path()).unwrap());
    let pipeline = Pipeline::new(dedup, writer.clone());

    pipeline.ingest("<11>Jan 15 10:30:48 server1 app: Failed to connect", "203.0.113.9").await;
    writer.close().await;

    let lines = read_lines(dir.path(), "error.log");
    assert_eq!(lines.len(), 1);
    let record: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(record["source_ip"], "203.0.113.9");
    assert_eq!(record["hostname"], "server1");
    assert_eq!(record["priority"], 11);
}

#[tokio::test]
async fn duplicate_suppressed_then_writes_again_after_window_expires() {
    let dir = tempfile::tempdir().unwrap();
    let dedup = Arc::new(WindowedDeduplicator::new(Duration::from_millis(300)));
    let writer = Arc::new(FileWriter::with_defaults(dir.path()).unwrap());
    let pipeline = Pipeline::new(dedup, writer.clone());

    let message = "<14>Jan 15 10:30:48 server1 app: heartbeat";
    pipeline.ingest(message, "203.0.113.9").await;
    pipeline.ingest(message, "203.0.113.9").await;
    assert_eq!(read_lines(dir.path(), "info.log").len(), 1);

    tokio::time::sleep(Duration::from_millis(350)).await;
    pipeline.ingest(message, "203.0.113.9").await;
    writer.close().await;

    assert_eq!(read_lines(dir.path(), "info.log").len(), 2);
}

#[tokio::test]
async fn unparseable_noise_is_recorded_as_plain_fallback_not_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let dedup = Arc::new(WindowedDeduplicator::with_default_window());
    let writer = Arc::new(FileWriter::with_defaults(dir.path()).unwrap());
    let pipeline = Pipeline::new(dedup, writer.clone());

    pipeline.ingest("this has no priority marker at all", "10.1.1.1").await;
    writer.close().await;

    let lines = read_lines(dir.path(), "notice.log");
    assert_eq!(lines.len(), 1);
    let record: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(record["message"], "this has no priority marker at all");
}

#[tokio::test]
async fn small_rotation_threshold_spreads_records_across_backups() {
    let dir = tempfile::tempdir().unwrap();
    let dedup = Arc::new(WindowedDeduplicator::with_default_window());
    let writer = Arc::new(FileWriter::new(dir.path(), 512, 3).unwrap());
    let pipeline = Pipeline::new(dedup, writer.clone());

    for i in 0..80 {
        let message = format!("<14>Jan 15 10:30:48 server1 app: heartbeat number {i}");
        pipeline.ingest(&message, &format!("10.0.0.{}", i % 5)).await;
    }
    writer.close().await;

    assert!(dir.path().join("info.log.1").exists());

    let mut total = 0usize;
    for entry in std::fs::read_dir(dir.path()).unwrap() {
        let entry = entry.unwrap();
        if entry.file_name().to_string_lossy().starts_with("info.log") {
            total += read_lines(dir.path(), &entry.file_name().to_string_lossy()).len();
        }
    }
    assert_eq!(total, 80);
}

#[tokio::test]
async fn concurrent_senders_do_not_lose_or_corrupt_records() {
    let dir = tempfile::tempdir().unwrap();
    let dedup = Arc::new(WindowedDeduplicator::with_default_window());
    let writer = Arc::new(FileWriter::with_defaults(dir.path()).unwrap());
    let pipeline = Arc::new(Pipeline::new(dedup, writer.clone()));

    let mut handles = Vec::new();
    for sender in 0..3 {
        let pipeline = pipeline.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..50 {
                let message = format!("<14>Jan 15 10:30:48 host{sender} app: message {i}");
                pipeline.ingest(&message, &format!("10.0.{sender}.1")).await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    writer.close().await;

    let lines = read_lines(dir.path(), "info.log");
    assert_eq!(lines.len(), 150);
    for line in &lines {
        let _: serde_json::Value = serde_json::from_str(line).unwrap();
    }
}
