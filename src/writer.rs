//! Severity-partitioned writer (C4).
//!
//! Maintains one append-only JSON Lines file per severity plus an
//! `unknown.log` catch-all, with size-triggered rotation, per-severity
//! locking, and a shutdown path that is safe to call more than once.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::record::Record;
use crate::severity::Severity;

/// Default rotation threshold: 10 MiB.
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;
/// Default number of rotated backups to retain.
pub const DEFAULT_BACKUP_COUNT: u32 = 5;

/// Index of the catch-all bucket for unrecognised severities, one past the
/// eight named severities.
const UNKNOWN_IDX: usize = 8;
const BUCKET_COUNT: usize = 9;

/// The persistence half of the pipeline, as a narrow capability contract
/// (§9) so receivers can depend on `Arc<dyn Writer>` and tests can
/// substitute a recording stub.
#[async_trait]
pub trait Writer: Send + Sync {
    /// Appends `record` to the file for its severity bucket, rotating
    /// first if the active file has reached the size ceiling.
    async fn write(&self, record: &Record);

    /// Flushes and closes every open file handle. Safe to call more than
    /// once; writes after the first call are no-ops.
    async fn close(&self);
}

struct SeverityFile {
    handle: Option<File>,
}

/// Writer backend that persists to `<severity>.log` files under a
/// configured directory.
pub struct FileWriter {
    dir: PathBuf,
    max_bytes: u64,
    backup_count: u32,
    files: [Mutex<SeverityFile>; BUCKET_COUNT],
    closed: AtomicBool,
    master_lock: Mutex<()>,
}

impl FileWriter {
    /// Creates the writer, creating `dir` if it does not already exist.
    pub fn new(dir: impl Into<PathBuf>, max_bytes: u64, backup_count: u32) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            max_bytes,
            backup_count,
            files: std::array::from_fn(|_| Mutex::new(SeverityFile { handle: None })),
            closed: AtomicBool::new(false),
            master_lock: Mutex::new(()),
        })
    }

    /// Creates a writer with the default rotation thresholds (§4.4).
    pub fn with_defaults(dir: impl Into<PathBuf>) -> io::Result<Self> {
        Self::new(dir, DEFAULT_MAX_BYTES, DEFAULT_BACKUP_COUNT)
    }

    fn bucket_index(severity: &str) -> usize {
        Severity::from_name(severity).map(|s| s as usize).unwrap_or(UNKNOWN_IDX)
    }

    fn bucket_name(idx: usize) -> &'static str {
        if idx == UNKNOWN_IDX {
            "unknown"
        } else {
            Severity::all()[idx].name()
        }
    }

    fn active_path(&self, idx: usize) -> PathBuf {
        self.dir.join(format!("{}.log", Self::bucket_name(idx)))
    }

    fn backup_path(&self, idx: usize, generation: u32) -> PathBuf {
        self.dir.join(format!("{}.log.{}", Self::bucket_name(idx), generation))
    }

    fn should_rotate(&self, idx: usize) -> io::Result<bool> {
        match fs::metadata(self.active_path(idx)) {
            Ok(meta) => Ok(meta.len() >= self.max_bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Rotation protocol (§4.4): shift existing backups up by one
    /// generation, then demote the active file to `.1`. Must be called
    /// with the bucket's slot already locked.
    fn rotate(&self, idx: usize, slot: &mut SeverityFile) -> io::Result<()> {
        slot.handle = None;

        for generation in (1..self.backup_count).rev() {
            let from = self.backup_path(idx, generation);
            if from.exists() {
                let to = self.backup_path(idx, generation + 1);
                if to.exists() {
                    fs::remove_file(&to)?;
                }
                fs::rename(&from, &to)?;
            }
        }

        let active = self.active_path(idx);
        if active.exists() {
            fs::rename(&active, self.backup_path(idx, 1))?;
        }

        info!(bucket = Self::bucket_name(idx), backups = self.backup_count, "rotated log file");
        Ok(())
    }

    fn ensure_open(&self, idx: usize, slot: &mut SeverityFile) -> io::Result<()> {
        if slot.handle.is_none() {
            let file = OpenOptions::new().create(true).append(true).open(self.active_path(idx))?;
            slot.handle = Some(file);
        }
        Ok(())
    }
}

#[async_trait]
impl Writer for FileWriter {
    async fn write(&self, record: &Record) {
        if self.closed.load(Ordering::SeqCst) {
            warn!("attempted write to closed writer");
            return;
        }

        let idx = Self::bucket_index(record.severity_or_unknown());
        let mut slot = self.files[idx].lock().unwrap();

        if self.closed.load(Ordering::SeqCst) {
            return;
        }

        match self.should_rotate(idx) {
            Ok(true) => {
                if let Err(e) = self.rotate(idx, &mut slot) {
                    error!(bucket = Self::bucket_name(idx), error = %e, "rotation failed");
                }
            }
            Ok(false) => {}
            Err(e) => error!(bucket = Self::bucket_name(idx), error = %e, "could not stat log file"),
        }

        if let Err(e) = self.ensure_open(idx, &mut slot) {
            error!(bucket = Self::bucket_name(idx), error = %e, "failed to open log file");
            return;
        }

        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                error!(bucket = Self::bucket_name(idx), error = %e, "failed to serialise record");
                return;
            }
        };

        let handle = slot.handle.as_mut().expect("handle opened above");
        if let Err(e) = writeln!(handle, "{line}") {
            error!(bucket = Self::bucket_name(idx), error = %e, "write failed");
            return;
        }
        if let Err(e) = handle.flush() {
            error!(bucket = Self::bucket_name(idx), error = %e, "flush failed");
        }
    }

    async fn close(&self) {
        let _guard = self.master_lock.lock().unwrap();
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("writer already closed");
            return;
        }

        for (idx, slot_lock) in self.files.iter().enumerate() {
            let mut slot = slot_lock.lock().unwrap();
            if let Some(mut handle) = slot.handle.take() {
                if let Err(e) = handle.flush() {
                    error!(bucket = Self::bucket_name(idx), error = %e, "flush on close failed");
                } else {
                    info!(bucket = Self::bucket_name(idx), "closed log file");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;

    fn lines_of(path: &std::path::Path) -> Vec<String> {
        let file = File::open(path).unwrap();
        io::BufReader::new(file).lines().map(|l| l.unwrap()).collect()
    }

    fn record_with_severity(severity: &str) -> Record {
        Record { severity: Some(severity.to_string()), message: Some("hi".to_string()), ..Default::default() }
    }

    #[tokio::test]
    async fn routes_each_severity_to_its_own_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileWriter::with_defaults(dir.path()).unwrap();
        for name in ["emergency", "alert", "critical", "error", "warning", "notice", "info", "debug"] {
            writer.write(&record_with_severity(name)).await;
        }
        for name in ["emergency", "alert", "critical", "error", "warning", "notice", "info", "debug"] {
            let path = dir.path().join(format!("{name}.log"));
            let lines = lines_of(&path);
            assert_eq!(lines.len(), 1);
            let parsed: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
            assert_eq!(parsed["severity"], name);
        }
    }

    #[tokio::test]
    async fn unrecognised_severity_routes_to_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileWriter::with_defaults(dir.path()).unwrap();
        writer.write(&record_with_severity("bogus")).await;
        let lines = lines_of(&dir.path().join("unknown.log"));
        assert_eq!(lines.len(), 1);
    }

    #[tokio::test]
    async fn rotation_preserves_all_records_across_backups() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileWriter::new(dir.path(), 1024, 5).unwrap();
        for _ in 0..100 {
            let record = Record {
                severity: Some("info".to_string()),
                message: Some("x".repeat(180)),
                ..Default::default()
            };
            writer.write(&record).await;
        }

        assert!(dir.path().join("info.log.1").exists());

        let mut total_lines = 0usize;
        for entry in fs::read_dir(dir.path()).unwrap() {
            let entry = entry.unwrap();
            let name = entry.file_name().into_string().unwrap();
            if name.starts_with("info.log") {
                total_lines += lines_of(&entry.path()).len();
            }
        }
        assert_eq!(total_lines, 100);
    }

    #[tokio::test]
    async fn writes_after_close_are_noops() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileWriter::with_defaults(dir.path()).unwrap();
        writer.write(&record_with_severity("info")).await;
        writer.close().await;
        writer.close().await; // idempotent
        writer.write(&record_with_severity("info")).await;
        assert_eq!(lines_of(&dir.path().join("info.log")).len(), 1);
    }

    #[tokio::test]
    async fn concurrent_writers_to_distinct_severities() {
        use std::sync::Arc;
        let dir = tempfile::tempdir().unwrap();
        let writer: Arc<dyn Writer> = Arc::new(FileWriter::with_defaults(dir.path()).unwrap());

        let mut handles = Vec::new();
        for severity in ["info", "warning", "error"] {
            let writer = writer.clone();
            let severity = severity.to_string();
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    writer.write(&record_with_severity(&severity)).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for severity in ["info", "warning", "error"] {
            let lines = lines_of(&dir.path().join(format!("{severity}.log")));
            assert_eq!(lines.len(), 50);
            for line in &lines {
                let _: serde_json::Value = serde_json::from_str(line).unwrap();
            }
        }
    }
}
