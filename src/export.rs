//! Per-chunk and per-record export sequence.
//!
//! For every chunk the raw text is appended to `cdr.raw` first, before any
//! line is decoded. Each decoded record then goes through three steps, in
//! order: append the CSV line, write a sender file, run the sender on it.
//! The first failing step ends that record's export.

use std::{fmt, sync::Arc};

use crate::{
    codec::Chunk,
    error::{ExportError, Result},
    metrics,
    record::{self, CallRecord},
    sender::CdrSender,
    storage::StorageLocation,
};

/// What to do when a record fails to export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop exporting the connection's remaining records and chunks.
    #[default]
    Abort,
    /// Log the failure and carry on with the next record.
    Continue,
}

/// Outcome of exporting one chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkReport {
    /// Records delivered to the sender.
    pub exported: usize,
    /// Failures tolerated under [`FailurePolicy::Continue`].
    pub failed: usize,
    /// Non-empty lines skipped because they are not record-shaped.
    pub skipped: usize,
}

impl fmt::Display for ChunkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "exported={}, failed={}, skipped={}",
            self.exported, self.failed, self.skipped
        )
    }
}

/// Exports decoded records into a storage directory and the billing sender.
#[derive(Clone)]
pub struct Exporter {
    storage: StorageLocation,
    sender: Arc<dyn CdrSender>,
    policy: FailurePolicy,
    remove_sent_files: bool,
}

impl fmt::Debug for Exporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exporter")
            .field("storage", &self.storage)
            .field("sender", &"<sender>")
            .field("policy", &self.policy)
            .field("remove_sent_files", &self.remove_sent_files)
            .finish()
    }
}

impl Exporter {
    /// Create an exporter with the default [`FailurePolicy::Abort`] policy
    /// that leaves sender files on disk.
    #[must_use]
    pub fn new(storage: StorageLocation, sender: Arc<dyn CdrSender>) -> Self {
        Self {
            storage,
            sender,
            policy: FailurePolicy::default(),
            remove_sent_files: false,
        }
    }

    /// Set the policy applied when a record fails.
    #[must_use]
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Delete each sender file once the sender has accepted it.
    #[must_use]
    pub fn remove_sent_files(mut self, remove: bool) -> Self {
        self.remove_sent_files = remove;
        self
    }

    /// Policy applied when a record fails.
    #[must_use]
    pub fn policy(&self) -> FailurePolicy { self.policy }

    /// Whether sender files are deleted after a successful send.
    #[must_use]
    pub fn removes_sent_files(&self) -> bool { self.remove_sent_files }

    /// Storage directory receiving the artifacts.
    #[must_use]
    pub fn storage(&self) -> &StorageLocation { &self.storage }

    /// Export a single record.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Io`] if the CSV line or sender file cannot be
    /// written, or [`ExportError::Send`] if the sender fails. No step is
    /// retried and nothing already written is rolled back.
    pub async fn export_record(&self, record: &CallRecord) -> Result<()> {
        self.storage
            .append_csv(&record.to_csv())
            .await
            .map_err(ExportError::io(self.storage.csv_log()))?;

        let file = self
            .storage
            .write_sender_file(&record.to_sender_input())
            .await
            .map_err(ExportError::io(self.storage.root()))?;

        self.sender.send(&file).await?;

        if self.remove_sent_files
            && let Err(e) = tokio::fs::remove_file(&file).await
        {
            tracing::warn!(file = %file.display(), error = %e, "failed to remove sender file");
        }
        metrics::inc_records_exported();
        Ok(())
    }

    /// Export every record in `chunk`.
    ///
    /// The chunk text is appended to the raw log before any line is decoded,
    /// so record-free chunks are still archived.
    ///
    /// # Errors
    ///
    /// Under [`FailurePolicy::Abort`], returns the first failure and leaves
    /// the chunk's remaining records untouched. Under
    /// [`FailurePolicy::Continue`], never fails.
    pub async fn export_chunk(&self, chunk: &Chunk) -> Result<ChunkReport> {
        let text = chunk.as_str();
        let mut report = ChunkReport {
            skipped: record::lines(text)
                .filter(|line| !line.is_empty() && !record::is_candidate(line))
                .count(),
            ..ChunkReport::default()
        };

        if let Err(e) = self.storage.append_raw(text).await {
            self.handle_failure(ExportError::io(self.storage.raw_log())(e), &mut report)?;
        }

        for decoded in record::decode_chunk(text) {
            let outcome = match decoded {
                Ok(record) => self.export_record(&record).await,
                Err(e) => Err(e.into()),
            };
            match outcome {
                Ok(()) => report.exported += 1,
                Err(e) => self.handle_failure(e, &mut report)?,
            }
        }
        Ok(report)
    }

    fn handle_failure(&self, err: ExportError, report: &mut ChunkReport) -> Result<()> {
        metrics::inc_errors(err.error_type());
        match self.policy {
            FailurePolicy::Abort => Err(err),
            FailurePolicy::Continue => {
                tracing::warn!(error = %err, kind = err.error_type(), "record export failed, continuing");
                report.failed += 1;
                Ok(())
            }
        }
    }
}
