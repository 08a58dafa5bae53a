//! Sync engine for one-way object mirroring.
//!
//! Lists the source prefix and walks it sequentially. Each object is compared
//! with its destination copy and either skipped or pushed through
//! stage → download → upload → verify → release before the next one starts.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::error::{Result, SyncError};
use crate::fs::{ObjectStore, RemoteObject, StoreError};
use crate::sync::compare::{decide, SyncDecision};
use crate::sync::exclude::ExcludePatterns;
use crate::sync::staging::{Stager, StagingLayout};
use crate::sync::stats::{FailedObject, SyncAction, SyncEntry, SyncReport, TransferStats};
use crate::sync::throttle::{BandwidthLimit, BandwidthLimiter};
use crate::sync::transfer::TransferExecutor;
use crate::sync::verify::verify_upload;

/// Sync configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Source key prefix.
    pub prefix: String,
    /// Local staging root.
    pub staging_root: PathBuf,
    /// How keys map onto staging paths.
    pub staging_layout: StagingLayout,
    /// Whether this is a dry run (no actual changes).
    pub dry_run: bool,
    /// Exclude patterns.
    pub exclude: ExcludePatterns,
    /// Bandwidth limit.
    pub bandwidth_limit: BandwidthLimit,
    /// Deadline for one object's transfer pipeline.
    pub object_timeout: Option<Duration>,
    /// Extra attempts for retryable transfer failures.
    pub max_retries: u32,
    /// Record per-object failures and keep going.
    pub continue_on_error: bool,
    /// Fail on destination stat errors other than not-found.
    pub strict_stat: bool,
    /// Compare the destination digest with the uploaded bytes' MD5.
    pub verify_checksum: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            staging_root: std::env::temp_dir().join("bucketsync"),
            staging_layout: StagingLayout::Flat,
            dry_run: false,
            exclude: ExcludePatterns::new(),
            bandwidth_limit: BandwidthLimit::unlimited(),
            object_timeout: None,
            max_retries: 0,
            continue_on_error: false,
            strict_stat: false,
            verify_checksum: false,
        }
    }
}

/// Progress update for sync operations.
#[derive(Debug, Clone)]
pub struct SyncProgress {
    /// Current phase.
    pub phase: SyncPhase,
    /// Current key being processed.
    pub current_key: String,
    /// Objects processed so far.
    pub objects_done: usize,
    /// Total objects listed.
    pub total_objects: usize,
    /// Bytes transferred so far.
    pub bytes_done: u64,
}

/// Current sync phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Listing,
    Processing,
    Complete,
}

/// Sync engine for orchestrating sync operations.
pub struct SyncEngine {
    /// Source store.
    source: Arc<dyn ObjectStore>,
    /// Destination store.
    dest: Arc<dyn ObjectStore>,
    /// Configuration.
    config: SyncConfig,
    stager: Stager,
    executor: TransferExecutor,
    /// Progress callback.
    progress_tx: Option<tokio::sync::mpsc::Sender<SyncProgress>>,
}

impl SyncEngine {
    /// Create a new sync engine.
    pub fn new(source: Arc<dyn ObjectStore>, dest: Arc<dyn ObjectStore>, config: SyncConfig) -> Self {
        let stager = Stager::new(config.staging_root.clone(), config.staging_layout);
        let executor = TransferExecutor::new(BandwidthLimiter::new(config.bandwidth_limit));

        Self {
            source,
            dest,
            config,
            stager,
            executor,
            progress_tx: None,
        }
    }

    /// Create a sync engine with progress reporting.
    pub fn with_progress(
        source: Arc<dyn ObjectStore>,
        dest: Arc<dyn ObjectStore>,
        config: SyncConfig,
        progress_tx: tokio::sync::mpsc::Sender<SyncProgress>,
    ) -> Self {
        let mut engine = Self::new(source, dest, config);
        engine.progress_tx = Some(progress_tx);
        engine
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Send a progress update.
    async fn send_progress(&self, progress: SyncProgress) {
        if let Some(ref tx) = self.progress_tx {
            let _ = tx.send(progress).await;
        }
    }

    /// Run one full sync pass.
    pub async fn run(&self) -> Result<SyncReport> {
        let mut stats = TransferStats::new();
        stats.start();

        self.send_progress(SyncProgress {
            phase: SyncPhase::Listing,
            current_key: self.config.prefix.clone(),
            objects_done: 0,
            total_objects: 0,
            bytes_done: 0,
        }).await;

        let objects = self.source.list(&self.config.prefix).await
            .map_err(|e| SyncError::Listing {
                prefix: self.config.prefix.clone(),
                reason: e.to_string(),
            })?;

        stats.objects_listed = objects.len();
        info!(
            count = objects.len(),
            source = %self.source.display_path(&self.config.prefix),
            staging = %self.stager.root().display(),
            "Listed source objects"
        );

        let mut entries = Vec::with_capacity(objects.len());
        let mut failures = Vec::new();

        for (index, object) in objects.iter().enumerate() {
            if self.config.exclude.is_excluded(&object.key) {
                info!("Excluded by pattern, skipping {}", object.key);
                stats.record_excluded();
                entries.push(SyncEntry {
                    key: object.key.clone(),
                    size: object.size,
                    action: SyncAction::Excluded,
                });
                continue;
            }

            self.send_progress(SyncProgress {
                phase: SyncPhase::Processing,
                current_key: object.key.clone(),
                objects_done: index,
                total_objects: objects.len(),
                bytes_done: stats.bytes_transferred,
            }).await;

            match self.sync_object(object).await {
                Ok(decision) => {
                    stats.record(decision, object.size);
                    entries.push(SyncEntry {
                        key: object.key.clone(),
                        size: object.size,
                        action: SyncAction::Decided(decision),
                    });
                }
                Err(err) if self.config.continue_on_error => {
                    error!(key = %object.key, "{}", err);
                    failures.push(FailedObject {
                        key: object.key.clone(),
                        error: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        stats.stop();

        self.send_progress(SyncProgress {
            phase: SyncPhase::Complete,
            current_key: String::new(),
            objects_done: objects.len(),
            total_objects: objects.len(),
            bytes_done: stats.bytes_transferred,
        }).await;

        info!(
            bytes = stats.bytes_transferred,
            elapsed_ms = stats.elapsed().as_millis() as u64,
            failed = failures.len(),
            "Amount transferred {}",
            stats.bytes_display()
        );

        Ok(SyncReport {
            entries,
            failures,
            stats,
            dry_run: self.config.dry_run,
        })
    }

    /// Decide on one object and carry the decision out.
    async fn sync_object(&self, object: &RemoteObject) -> Result<SyncDecision> {
        let dest = self.destination_metadata(&object.key).await?;
        let decision = decide(object, dest.as_ref(), self.config.dry_run);

        info!(size = %object.format_size(), "{}", decision.notice(&object.key));
        if decision == SyncDecision::Transfer {
            self.transfer_with_retries(object).await?;
        }

        Ok(decision)
    }

    /// Destination metadata, `None` when the object is absent.
    ///
    /// Stat failures other than not-found are treated as absent unless
    /// strict stat is enabled.
    async fn destination_metadata(&self, key: &str) -> Result<Option<RemoteObject>> {
        match self.dest.stat(key).await {
            Ok(object) => Ok(Some(object)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(err) if self.config.strict_stat => Err(SyncError::Stat {
                key: key.to_string(),
                reason: err.to_string(),
            }),
            Err(err) => {
                warn!(key, error = %err, "Destination stat failed, treating object as missing");
                Ok(None)
            }
        }
    }

    async fn transfer_with_retries(&self, object: &RemoteObject) -> Result<()> {
        let mut attempt = 0;
        loop {
            match self.transfer_with_deadline(object).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(key = %object.key, attempt, error = %err, "Retrying transfer");
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn transfer_with_deadline(&self, object: &RemoteObject) -> Result<()> {
        match self.config.object_timeout {
            Some(after) => tokio::time::timeout(after, self.transfer_object(object)).await
                .map_err(|_| SyncError::Timeout {
                    key: object.key.clone(),
                    after,
                })?,
            None => self.transfer_object(object).await,
        }
    }

    /// Stage, download, upload, verify and release one object.
    async fn transfer_object(&self, object: &RemoteObject) -> Result<()> {
        let staged = self.stager.stage(&object.key).await?;

        info!(
            "Downloading {} to {}",
            self.source.display_path(&object.key),
            staged.path().display()
        );
        self.executor.download(&*self.source, object, &staged).await?;

        info!(
            "Uploading {} to {}",
            staged.path().display(),
            self.dest.display_path(&object.key)
        );
        let receipt = self.executor.upload(&*self.dest, &object.key, &staged).await?;

        verify_upload(&*self.dest, object, &receipt, self.config.verify_checksum).await?;

        info!("Removing {}", staged.path().display());
        self.stager.release(staged).await;
        Ok(())
    }
}
