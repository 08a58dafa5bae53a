//! Post-upload consistency check.

use tracing::debug;

use crate::error::{Result, SyncError};
use crate::fs::{ObjectStore, RemoteObject};
use crate::sync::hash::digests_match;
use crate::sync::transfer::UploadReceipt;

/// Confirm the destination now holds a copy of `source`.
///
/// The destination is re-stated and its size must equal the source size.
/// With `check_digest`, a digest reported by the destination must also equal
/// the MD5 of the uploaded bytes; destinations reporting no digest pass on
/// size alone.
pub async fn verify_upload(
    dest: &dyn ObjectStore,
    source: &RemoteObject,
    receipt: &UploadReceipt,
    check_digest: bool,
) -> Result<RemoteObject> {
    let key = source.key.as_str();

    let uploaded = dest.stat(key).await.map_err(|e| SyncError::Verification {
        key: key.to_string(),
        reason: format!("destination stat failed: {}", e),
    })?;

    if uploaded.size != source.size {
        return Err(SyncError::Verification {
            key: key.to_string(),
            reason: format!(
                "destination reports {} bytes, source has {}",
                uploaded.size, source.size
            ),
        });
    }

    if check_digest {
        if let Some(hash) = uploaded.hash.as_deref() {
            if !digests_match(Some(hash), Some(&receipt.md5)) {
                return Err(SyncError::Verification {
                    key: key.to_string(),
                    reason: format!("destination digest {} does not match uploaded {}", hash, receipt.md5),
                });
            }
        }
    }

    debug!(key, size = uploaded.size, "Upload verified");
    Ok(uploaded)
}
