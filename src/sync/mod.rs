//! One-way object sync.
//!
//! Decides per object whether the destination already holds an equivalent
//! copy and, when it does not, moves the bytes through a local staging file.

pub mod compare;
pub mod engine;
pub mod exclude;
pub mod hash;
pub mod sniff;
pub mod staging;
pub mod stats;
pub mod throttle;
pub mod transfer;
pub mod verify;

pub use compare::{compare, decide, Comparison, SyncDecision};
pub use engine::{SyncConfig, SyncEngine, SyncPhase, SyncProgress};
pub use exclude::ExcludePatterns;
pub use hash::{digests_match, md5_hex, normalize_digest, Md5Stream};
pub use sniff::detect_content_type;
pub use staging::{StagedFile, Stager, StagingLayout};
pub use stats::{FailedObject, ReportSummary, SyncAction, SyncEntry, SyncReport, TransferStats};
pub use throttle::{BandwidthLimit, BandwidthLimiter};
pub use transfer::{TransferExecutor, UploadReceipt, SNIFF_BUFFER_SIZE};
pub use verify::verify_upload;
