//! Staged download and re-upload of a single object.

use bytes::Bytes;
use futures::TryStreamExt;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::error::{Result, SyncError, TransferStep};
use crate::fs::{ObjectStore, ObjectWriter, RemoteObject};
use crate::sync::hash::Md5Stream;
use crate::sync::sniff::detect_content_type;
use crate::sync::staging::StagedFile;
use crate::sync::throttle::BandwidthLimiter;

/// Leading bytes buffered before the destination write is opened
pub const SNIFF_BUFFER_SIZE: usize = 1 << 20;

/// Read size for streaming the rest of a staged file
const CHUNK_SIZE: usize = 256 * 1024;

/// Outcome of a finished upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub bytes_written: u64,
    pub content_type: String,
    /// MD5 of the uploaded bytes, lowercase hex
    pub md5: String,
}

/// Moves object bytes between stores through a staged local file.
#[derive(Debug, Clone, Default)]
pub struct TransferExecutor {
    limiter: BandwidthLimiter,
}

impl TransferExecutor {
    pub fn new(limiter: BandwidthLimiter) -> Self {
        Self { limiter }
    }

    /// Stream `object` from `source` into the staged file.
    ///
    /// Returns the number of bytes written. A count that differs from the
    /// listed size fails the download.
    pub async fn download(
        &self,
        source: &dyn ObjectStore,
        object: &RemoteObject,
        staged: &StagedFile,
    ) -> Result<u64> {
        let key = object.key.as_str();

        let mut stream = source.reader(key).await
            .map_err(|e| SyncError::from_store(key, TransferStep::Download, e))?;

        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(staged.path())
            .await
            .map_err(|e| SyncError::download_io(key, e))?;

        let mut written = 0u64;
        while let Some(chunk) = stream.try_next().await
            .map_err(|e| SyncError::from_store(key, TransferStep::Download, e))?
        {
            self.limiter.acquire(chunk.len()).await;
            file.write_all(&chunk).await
                .map_err(|e| SyncError::download_io(key, e))?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| SyncError::download_io(key, e))?;
        file.sync_all().await.map_err(|e| SyncError::download_io(key, e))?;

        if written != object.size {
            return Err(SyncError::Transfer {
                key: key.to_string(),
                step: TransferStep::Download,
                reason: format!("expected {} bytes, received {}", object.size, written),
                retryable: false,
            });
        }

        debug!(key, bytes = written, "Download complete");
        Ok(written)
    }

    /// Upload the staged file to `dest` under `key`.
    ///
    /// The content type is sniffed from the first [`SNIFF_BUFFER_SIZE`] bytes.
    /// When both a write and the final close fail, the write error wins.
    pub async fn upload(
        &self,
        dest: &dyn ObjectStore,
        key: &str,
        staged: &StagedFile,
    ) -> Result<UploadReceipt> {
        let mut file = File::open(staged.path()).await
            .map_err(|e| SyncError::upload_io(key, e))?;

        let mut prefix = Vec::new();
        (&mut file)
            .take(SNIFF_BUFFER_SIZE as u64)
            .read_to_end(&mut prefix)
            .await
            .map_err(|e| SyncError::upload_io(key, e))?;

        let content_type = detect_content_type(&prefix).to_string();

        let mut writer = dest.writer(key, &content_type).await
            .map_err(|e| SyncError::from_store(key, TransferStep::Upload, e))?;

        let written = self.stream_to(&mut *writer, key, prefix, &mut file).await;
        let closed = writer.close().await
            .map_err(|e| SyncError::from_store(key, TransferStep::Upload, e));

        let (bytes_written, md5) = match (written, closed) {
            (Err(err), Err(close_err)) => {
                debug!(key, error = %close_err, "Close failed after write error");
                return Err(err);
            }
            (Err(err), Ok(())) | (Ok(_), Err(err)) => return Err(err),
            (Ok(result), Ok(())) => result,
        };

        debug!(key, bytes = bytes_written, content_type = %content_type, "Upload complete");

        Ok(UploadReceipt {
            bytes_written,
            content_type,
            md5,
        })
    }

    /// Write the buffered prefix, then the rest of the file.
    async fn stream_to(
        &self,
        writer: &mut dyn ObjectWriter,
        key: &str,
        prefix: Vec<u8>,
        file: &mut File,
    ) -> Result<(u64, String)> {
        let mut hasher = Md5Stream::new();
        let mut written = 0u64;

        if !prefix.is_empty() {
            hasher.update(&prefix);
            written += prefix.len() as u64;
            self.limiter.acquire(prefix.len()).await;
            writer.write(Bytes::from(prefix)).await
                .map_err(|e| SyncError::from_store(key, TransferStep::Upload, e))?;
        }

        loop {
            let mut buf = vec![0u8; CHUNK_SIZE];
            let n = file.read(&mut buf).await
                .map_err(|e| SyncError::upload_io(key, e))?;
            if n == 0 {
                break;
            }
            buf.truncate(n);

            hasher.update(&buf);
            written += n as u64;
            self.limiter.acquire(n).await;
            writer.write(Bytes::from(buf)).await
                .map_err(|e| SyncError::from_store(key, TransferStep::Upload, e))?;
        }

        Ok((written, hasher.finish()))
    }
}
