//! Equivalence check between a source object and its destination copy.
//!
//! The policy, in order:
//! 1. destination absent: transfer
//! 2. digests equal (case-insensitive): skip, whatever the sizes say
//! 3. sizes equal: skip, accepted as the weaker signal when digests are
//!    encoded differently across providers
//! 4. otherwise transfer

use serde::Serialize;

use crate::fs::RemoteObject;
use crate::sync::hash::digests_match;

/// How a destination object relates to its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    HashMatch,
    SizeMatch,
    Missing,
    Differs,
}

impl Comparison {
    /// Map this comparison onto the action to take.
    pub fn decision(self, dry_run: bool) -> SyncDecision {
        match self {
            Comparison::HashMatch => SyncDecision::SkipHashMatch,
            Comparison::SizeMatch => SyncDecision::SkipSizeMatch,
            Comparison::Missing | Comparison::Differs if dry_run => SyncDecision::TransferDryRun,
            Comparison::Missing | Comparison::Differs => SyncDecision::Transfer,
        }
    }
}

/// Action taken for one source object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDecision {
    SkipHashMatch,
    SkipSizeMatch,
    Transfer,
    TransferDryRun,
}

impl SyncDecision {
    /// Check if this is a skip decision.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::SkipHashMatch | Self::SkipSizeMatch)
    }

    /// Whether the object's size counts towards the transferred total.
    pub fn counts_bytes(&self) -> bool {
        matches!(self, Self::Transfer | Self::TransferDryRun)
    }

    /// User-facing notice for this decision.
    pub fn notice(&self, key: &str) -> String {
        match self {
            Self::SkipHashMatch => format!("Hash matches, skipping {}", key),
            Self::SkipSizeMatch => format!("Size matches, skipping {}", key),
            Self::Transfer => format!("Transferring {}", key),
            Self::TransferDryRun => format!("Would download/upload {}", key),
        }
    }
}

/// Classify a destination object against its source.
pub fn compare(source: &RemoteObject, dest: Option<&RemoteObject>) -> Comparison {
    let Some(dest) = dest else {
        return Comparison::Missing;
    };

    if digests_match(source.hash.as_deref(), dest.hash.as_deref()) {
        Comparison::HashMatch
    } else if source.size == dest.size {
        Comparison::SizeMatch
    } else {
        Comparison::Differs
    }
}

/// Decide what to do with one source object.
pub fn decide(source: &RemoteObject, dest: Option<&RemoteObject>, dry_run: bool) -> SyncDecision {
    compare(source, dest).decision(dry_run)
}
