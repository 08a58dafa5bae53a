//! Run statistics and the end-of-run report.

use serde::Serialize;
use std::time::{Duration, Instant};

use crate::error::{Result, SyncError};
use crate::sync::compare::SyncDecision;

/// Transfer statistics for one run.
#[derive(Debug, Clone, Default)]
pub struct TransferStats {
    /// Bytes transferred, dry-run bytes included.
    pub bytes_transferred: u64,
    /// Objects returned by the listing.
    pub objects_listed: usize,
    /// Objects skipped on a digest match.
    pub hash_matches: usize,
    /// Objects skipped on a size match.
    pub size_matches: usize,
    /// Objects copied.
    pub transferred: usize,
    /// Objects that would have been copied.
    pub dry_run: usize,
    /// Objects filtered out by exclude patterns.
    pub excluded: usize,
    /// Run start time.
    pub start_time: Option<Instant>,
    /// Run end time.
    pub end_time: Option<Instant>,
}

impl TransferStats {
    /// Create new transfer stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking.
    pub fn start(&mut self) {
        *self = Self {
            start_time: Some(Instant::now()),
            ..Self::default()
        };
    }

    /// Stop tracking.
    pub fn stop(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Record a completed decision for an object of `size` bytes.
    pub fn record(&mut self, decision: SyncDecision, size: u64) {
        match decision {
            SyncDecision::SkipHashMatch => self.hash_matches += 1,
            SyncDecision::SkipSizeMatch => self.size_matches += 1,
            SyncDecision::Transfer => self.transferred += 1,
            SyncDecision::TransferDryRun => self.dry_run += 1,
        }
        if decision.counts_bytes() {
            self.bytes_transferred += size;
        }
    }

    pub fn record_excluded(&mut self) {
        self.excluded += 1;
    }

    /// Get elapsed duration.
    pub fn elapsed(&self) -> Duration {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Get average transfer rate in bytes per second.
    pub fn rate(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.bytes_transferred as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Bytes transferred in a binary human-readable unit
    pub fn bytes_display(&self) -> String {
        humansize::format_size(self.bytes_transferred, humansize::BINARY)
    }

    /// Format rate as human-readable string.
    pub fn rate_display(&self) -> String {
        format!("{}/s", humansize::format_size(self.rate() as u64, humansize::BINARY))
    }
}

/// What happened to one listed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "decision")]
pub enum SyncAction {
    /// Filtered out by an exclude pattern.
    Excluded,
    /// Compared and handled according to the decision.
    Decided(SyncDecision),
}

/// One processed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncEntry {
    pub key: String,
    pub size: u64,
    #[serde(flatten)]
    pub action: SyncAction,
}

/// An object whose pipeline failed while continue-on-error was enabled.
#[derive(Debug, Clone, Serialize)]
pub struct FailedObject {
    pub key: String,
    pub error: String,
}

/// Result of a sync run.
#[derive(Debug)]
pub struct SyncReport {
    /// Processed objects, in listing order.
    pub entries: Vec<SyncEntry>,
    /// Objects that failed (continue-on-error only).
    pub failures: Vec<FailedObject>,
    /// Statistics.
    pub stats: TransferStats,
    /// Whether this was a dry run.
    pub dry_run: bool,
}

impl SyncReport {
    /// Decision taken for a key, if it was compared.
    pub fn decision_for(&self, key: &str) -> Option<SyncDecision> {
        self.entries.iter().find(|e| e.key == key).and_then(|e| match e.action {
            SyncAction::Decided(decision) => Some(decision),
            SyncAction::Excluded => None,
        })
    }

    /// Fail with [`SyncError::PartialFailure`] if any object failed.
    pub fn ensure_success(&self) -> Result<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(SyncError::PartialFailure {
                failed: self.failures.len(),
                total: self.stats.objects_listed,
            })
        }
    }

    /// Serializable summary of the run.
    pub fn summary(&self) -> ReportSummary<'_> {
        ReportSummary {
            dry_run: self.dry_run,
            objects_listed: self.stats.objects_listed,
            hash_matches: self.stats.hash_matches,
            size_matches: self.stats.size_matches,
            transferred: self.stats.transferred,
            would_transfer: self.stats.dry_run,
            excluded: self.stats.excluded,
            failed: self.failures.len(),
            bytes_transferred: self.stats.bytes_transferred,
            elapsed_ms: self.stats.elapsed().as_millis() as u64,
            entries: &self.entries,
            failures: &self.failures,
        }
    }
}

/// JSON shape of a [`SyncReport`].
#[derive(Debug, Serialize)]
pub struct ReportSummary<'a> {
    pub dry_run: bool,
    pub objects_listed: usize,
    pub hash_matches: usize,
    pub size_matches: usize,
    pub transferred: usize,
    pub would_transfer: usize,
    pub excluded: usize,
    pub failed: usize,
    pub bytes_transferred: u64,
    pub elapsed_ms: u64,
    pub entries: &'a [SyncEntry],
    pub failures: &'a [FailedObject],
}
