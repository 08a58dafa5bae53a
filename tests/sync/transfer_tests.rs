// Tests for the staged download/upload executor and the upload verifier

use bucketsync::error::{SyncError, TransferStep};
use bucketsync::fs::RemoteObject;
use bucketsync::sync::{
    md5_hex, verify_upload, Stager, StagingLayout, TransferExecutor, SNIFF_BUFFER_SIZE,
};

use crate::common::FakeStore;

fn stager(root: &std::path::Path) -> Stager {
    Stager::new(root.join("stage"), StagingLayout::Flat)
}

async fn roundtrip(key: &str, data: &[u8]) -> (FakeStore, bucketsync::sync::UploadReceipt) {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeStore::new();
    let dest = FakeStore::new();
    source.insert(key, data);

    let stager = stager(dir.path());
    let executor = TransferExecutor::default();
    let object = RemoteObject::new(key, data.len() as u64, None);

    let staged = stager.stage(key).await.unwrap();
    let downloaded = executor.download(&source, &object, &staged).await.unwrap();
    assert_eq!(downloaded, data.len() as u64);

    let receipt = executor.upload(&dest, key, &staged).await.unwrap();
    stager.release(staged).await;
    (dest, receipt)
}

#[tokio::test]
async fn test_html_content_type_is_sniffed() {
    let page = b"<!DOCTYPE html><html><body>hi</body></html>";
    let (dest, receipt) = roundtrip("site/index", page).await;

    assert_eq!(receipt.content_type, "text/html; charset=utf-8");
    assert_eq!(dest.content_type("site/index").as_deref(), Some("text/html; charset=utf-8"));
    assert_eq!(dest.get("site/index"), Some(page.to_vec()));
}

#[tokio::test]
async fn test_png_content_type_is_sniffed() {
    let mut image = b"\x89PNG\x0D\x0A\x1A\x0A".to_vec();
    image.extend_from_slice(&[0u8; 64]);
    let (_, receipt) = roundtrip("img/logo.png", &image).await;

    assert_eq!(receipt.content_type, "image/png");
}

#[tokio::test]
async fn test_empty_object_roundtrip() {
    let (dest, receipt) = roundtrip("empty", b"").await;

    assert_eq!(receipt.bytes_written, 0);
    assert_eq!(receipt.content_type, "text/plain; charset=utf-8");
    assert_eq!(dest.get("empty"), Some(Vec::new()));
}

#[tokio::test]
async fn test_large_object_streams_past_sniff_buffer() {
    let data: Vec<u8> = (0..SNIFF_BUFFER_SIZE * 2 + 12345).map(|i| (i % 251) as u8).collect();
    let (dest, receipt) = roundtrip("big.bin", &data).await;

    assert_eq!(receipt.bytes_written, data.len() as u64);
    assert_eq!(receipt.md5, md5_hex(&data));
    assert_eq!(receipt.content_type, "application/octet-stream");
    assert_eq!(dest.get("big.bin"), Some(data));
}

#[tokio::test]
async fn test_write_error_wins_over_close_error() {
    let dir = tempfile::tempdir().unwrap();
    let dest = FakeStore::new();
    dest.faults(|f| {
        f.fail_write.insert("a.txt".to_string());
        f.fail_close.insert("a.txt".to_string());
    });

    let stager = stager(dir.path());
    let staged = stager.stage("a.txt").await.unwrap();
    tokio::fs::write(staged.path(), b"contents").await.unwrap();

    let err = TransferExecutor::default()
        .upload(&dest, "a.txt", &staged)
        .await
        .unwrap_err();

    match err {
        SyncError::Transfer { step, reason, .. } => {
            assert_eq!(step, TransferStep::Upload);
            assert!(reason.contains("write refused"), "{}", reason);
        }
        other => panic!("unexpected: {:?}", other),
    }
    assert!(dest.get("a.txt").is_none());
}

#[tokio::test]
async fn test_close_error_reported_alone() {
    let dir = tempfile::tempdir().unwrap();
    let dest = FakeStore::new();
    dest.faults(|f| {
        f.fail_close.insert("a.txt".to_string());
    });

    let stager = stager(dir.path());
    let staged = stager.stage("a.txt").await.unwrap();
    tokio::fs::write(staged.path(), b"contents").await.unwrap();

    let err = TransferExecutor::default()
        .upload(&dest, "a.txt", &staged)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("close refused"));
    assert_eq!(dest.puts(), 0);
}

#[tokio::test]
async fn test_short_download_fails() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeStore::new();
    source.insert("a.txt", b"ten bytes!");

    let stager = stager(dir.path());
    let staged = stager.stage("a.txt").await.unwrap();
    let listed = RemoteObject::new("a.txt", 99, None);

    let err = TransferExecutor::default()
        .download(&source, &listed, &staged)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::Transfer { step: TransferStep::Download, retryable: false, .. }
    ));
}

#[tokio::test]
async fn test_missing_source_object() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeStore::new();

    let stager = stager(dir.path());
    let staged = stager.stage("gone.txt").await.unwrap();
    let listed = RemoteObject::new("gone.txt", 4, None);

    let err = TransferExecutor::default()
        .download(&source, &listed, &staged)
        .await
        .unwrap_err();

    assert!(!err.is_retryable());
    assert!(err.to_string().contains("gone.txt"));
}

#[tokio::test]
async fn test_verify_checks_size() {
    let (dest, receipt) = roundtrip("a.txt", b"0123456789").await;
    let source = RemoteObject::new("a.txt", 10, None);

    let verified = verify_upload(&dest, &source, &receipt, true).await.unwrap();
    assert_eq!(verified.size, 10);

    let larger = RemoteObject::new("a.txt", 11, None);
    let err = verify_upload(&dest, &larger, &receipt, false).await.unwrap_err();
    assert!(matches!(err, SyncError::Verification { .. }));
}

#[tokio::test]
async fn test_verify_checks_digest_when_requested() {
    let (dest, mut receipt) = roundtrip("a.txt", b"0123456789").await;
    let source = RemoteObject::new("a.txt", 10, None);
    receipt.md5 = md5_hex(b"something else");

    assert!(verify_upload(&dest, &source, &receipt, false).await.is_ok());

    let err = verify_upload(&dest, &source, &receipt, true).await.unwrap_err();
    assert!(err.to_string().contains("digest"));
}

#[tokio::test]
async fn test_verify_missing_destination() {
    let dest = FakeStore::new();
    let source = RemoteObject::new("a.txt", 10, None);
    let receipt = bucketsync::sync::UploadReceipt {
        bytes_written: 10,
        content_type: "text/plain; charset=utf-8".to_string(),
        md5: md5_hex(b"0123456789"),
    };

    let err = verify_upload(&dest, &source, &receipt, false).await.unwrap_err();
    assert!(err.to_string().starts_with("Upload failed for a.txt"));
}
