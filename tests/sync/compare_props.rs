// Property tests for the comparison policy

use bucketsync::fs::RemoteObject;
use bucketsync::sync::{compare, decide, Comparison, SyncDecision};
use proptest::prelude::*;

fn digest() -> impl Strategy<Value = String> {
    "[0-9a-f]{32}"
}

proptest! {
    #[test]
    fn prop_equal_digests_skip_regardless_of_size(
        hash in digest(),
        src_size in any::<u64>(),
        dst_size in any::<u64>(),
        dry_run in any::<bool>(),
    ) {
        let src = RemoteObject::new("k", src_size, Some(hash.clone()));
        let dst = RemoteObject::new("k", dst_size, Some(hash.to_uppercase()));

        prop_assert_eq!(compare(&src, Some(&dst)), Comparison::HashMatch);
        prop_assert_eq!(decide(&src, Some(&dst), dry_run), SyncDecision::SkipHashMatch);
    }

    #[test]
    fn prop_equal_sizes_skip_when_digests_differ(
        a in digest(),
        b in digest(),
        size in any::<u64>(),
    ) {
        prop_assume!(a != b);
        let src = RemoteObject::new("k", size, Some(a));
        let dst = RemoteObject::new("k", size, Some(b));

        prop_assert_eq!(decide(&src, Some(&dst), false), SyncDecision::SkipSizeMatch);
    }

    #[test]
    fn prop_missing_always_transfers(
        hash in proptest::option::of(digest()),
        size in any::<u64>(),
        dry_run in any::<bool>(),
    ) {
        let src = RemoteObject::new("k", size, hash);
        let expected = if dry_run { SyncDecision::TransferDryRun } else { SyncDecision::Transfer };

        prop_assert_eq!(decide(&src, None, dry_run), expected);
    }

    #[test]
    fn prop_both_differ_transfers(
        a in digest(),
        b in digest(),
        src_size in 0u64..1_000_000,
        dst_size in 0u64..1_000_000,
    ) {
        prop_assume!(a != b && src_size != dst_size);
        let src = RemoteObject::new("k", src_size, Some(a));
        let dst = RemoteObject::new("k", dst_size, Some(b));

        prop_assert_eq!(compare(&src, Some(&dst)), Comparison::Differs);
        prop_assert!(decide(&src, Some(&dst), false).counts_bytes());
    }

    #[test]
    fn prop_skips_never_count_bytes(
        src_hash in proptest::option::of(digest()),
        dst_hash in proptest::option::of(digest()),
        size in any::<u64>(),
        dry_run in any::<bool>(),
    ) {
        let src = RemoteObject::new("k", size, src_hash);
        let dst = RemoteObject::new("k", size, dst_hash);
        let decision = decide(&src, Some(&dst), dry_run);

        prop_assert!(decision.is_skip());
        prop_assert!(!decision.counts_bytes());
    }
}
