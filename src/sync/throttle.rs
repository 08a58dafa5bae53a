//! Bandwidth throttling for transfers.
//!
//! Provides rate limiting using a token bucket algorithm.

use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Bytes represented by one token
const TOKEN_BYTES: u64 = 1024;

/// Bandwidth limit configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandwidthLimit {
    /// Bytes per second limit.
    pub bytes_per_second: u64,
}

impl BandwidthLimit {
    /// Smallest enforceable limit; the limiter meters whole tokens.
    pub const MIN_BYTES_PER_SECOND: u64 = TOKEN_BYTES;

    /// Create a new bandwidth limit.
    pub fn new(bytes_per_second: u64) -> Self {
        Self { bytes_per_second }
    }

    /// No limit.
    pub fn unlimited() -> Self {
        Self { bytes_per_second: 0 }
    }

    /// Check if there's a limit.
    pub fn is_limited(&self) -> bool {
        self.bytes_per_second > 0
    }

    /// Format as human-readable string.
    pub fn display(&self) -> String {
        if !self.is_limited() {
            return "unlimited".to_string();
        }

        format!(
            "{}/s",
            humansize::format_size(self.bytes_per_second, humansize::DECIMAL)
        )
    }
}

impl Default for BandwidthLimit {
    fn default() -> Self {
        Self::unlimited()
    }
}

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Bandwidth limiter using token bucket algorithm.
#[derive(Clone)]
pub struct BandwidthLimiter {
    limiter: Option<Arc<DirectLimiter>>,
    limit: BandwidthLimit,
}

impl std::fmt::Debug for BandwidthLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BandwidthLimiter")
            .field("limit", &self.limit)
            .finish()
    }
}

impl BandwidthLimiter {
    /// Create a new bandwidth limiter.
    pub fn new(limit: BandwidthLimit) -> Self {
        let limiter = if limit.is_limited() {
            // One token per KiB for smoother limiting
            let tokens_per_second = (limit.bytes_per_second / TOKEN_BYTES).clamp(1, u32::MAX as u64) as u32;
            NonZeroU32::new(tokens_per_second)
                .map(|rate| Arc::new(RateLimiter::direct(Quota::per_second(rate))))
        } else {
            None
        };

        Self { limiter, limit }
    }

    /// Create an unlimited limiter.
    pub fn unlimited() -> Self {
        Self::new(BandwidthLimit::unlimited())
    }

    /// Get the current limit.
    pub fn limit(&self) -> BandwidthLimit {
        self.limit
    }

    /// Wait for permission to transfer `bytes` bytes.
    /// This is a no-op if no limit is set.
    pub async fn acquire(&self, bytes: usize) {
        if let Some(limiter) = &self.limiter {
            let tokens = (bytes as u64).div_ceil(TOKEN_BYTES).max(1);

            for _ in 0..tokens {
                limiter.until_ready().await;
            }
        }
    }
}

impl Default for BandwidthLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}
