use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use opendal::{services::Memory, ErrorKind, Metadata, Operator, Writer};

use crate::fs::backend::{BackendType, ObjectReader, ObjectStore, ObjectWriter, StoreError};
use crate::fs::types::RemoteObject;
use crate::sync::hash::normalize_digest;

/// Which metadata field carries the provider's content digest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestField {
    /// S3 ETag (quoted hex MD5 for single-part uploads)
    ETag,
    /// GCS md5Hash (base64 MD5), falling back to the ETag
    ContentMd5,
}

/// Object store backed by an OpenDAL operator
pub struct OpendalStore {
    operator: Operator,
    backend: BackendType,
    digest: DigestField,
}

impl OpendalStore {
    pub fn new(operator: Operator, backend: BackendType, digest: DigestField) -> Self {
        Self {
            operator,
            backend,
            digest,
        }
    }

    /// Create an in-process store, handy for local runs and tests
    pub fn memory() -> Result<Self> {
        let operator = Operator::new(Memory::default())?
            .finish();

        Ok(Self::new(operator, BackendType::Memory, DigestField::ETag))
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    fn remote_object(&self, key: &str, meta: &Metadata) -> RemoteObject {
        let raw = match self.digest {
            DigestField::ETag => meta.etag(),
            DigestField::ContentMd5 => meta.content_md5().or_else(|| meta.etag()),
        };

        RemoteObject::new(key, meta.content_length(), raw.and_then(normalize_digest))
    }
}

fn store_error(key: &str, err: opendal::Error) -> StoreError {
    if err.kind() == ErrorKind::NotFound {
        StoreError::NotFound(key.to_string())
    } else {
        StoreError::Backend {
            temporary: err.is_temporary(),
            message: format!("{}: {}", key, err),
        }
    }
}

#[async_trait]
impl ObjectStore for OpendalStore {
    async fn list(&self, prefix: &str) -> Result<Vec<RemoteObject>, StoreError> {
        let prefix = prefix.trim_start_matches('/');

        let entries = self.operator.list_with(prefix).recursive(true).await
            .map_err(|e| store_error(prefix, e))?;

        let mut result = Vec::new();

        for entry in entries {
            let meta = entry.metadata();

            // Skip directory markers
            if meta.mode().is_dir() || entry.path().ends_with('/') {
                continue;
            }

            // Some services list paths only; complete those with a stat
            if meta.etag().is_none() && meta.content_md5().is_none() && meta.content_length() == 0 {
                result.push(self.stat(entry.path()).await?);
            } else {
                result.push(self.remote_object(entry.path(), meta));
            }
        }

        result.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(result)
    }

    async fn stat(&self, key: &str) -> Result<RemoteObject, StoreError> {
        let key = key.trim_start_matches('/');

        let meta = self.operator.stat(key).await
            .map_err(|e| store_error(key, e))?;

        if meta.mode().is_dir() {
            return Err(StoreError::NotFound(key.to_string()));
        }

        Ok(self.remote_object(key, &meta))
    }

    async fn reader(&self, key: &str) -> Result<ObjectReader, StoreError> {
        let key = key.trim_start_matches('/').to_string();

        let reader = self.operator.reader(&key).await
            .map_err(|e| store_error(&key, e))?;
        let stream = reader.into_bytes_stream(..).await
            .map_err(|e| store_error(&key, e))?;

        Ok(stream
            .map_err(move |e| StoreError::Backend {
                message: format!("{}: {}", key, e),
                temporary: true,
            })
            .boxed())
    }

    async fn writer(&self, key: &str, content_type: &str) -> Result<Box<dyn ObjectWriter>, StoreError> {
        let key = key.trim_start_matches('/');

        let mut request = self.operator.writer_with(key);
        if self.operator.info().full_capability().write_with_content_type {
            request = request.content_type(content_type);
        }
        let writer = request.await
            .map_err(|e| store_error(key, e))?;

        Ok(Box::new(OpendalWriter {
            key: key.to_string(),
            writer,
        }))
    }

    fn backend_type(&self) -> BackendType {
        self.backend.clone()
    }
}

struct OpendalWriter {
    key: String,
    writer: Writer,
}

#[async_trait]
impl ObjectWriter for OpendalWriter {
    async fn write(&mut self, chunk: Bytes) -> Result<(), StoreError> {
        self.writer.write(chunk).await
            .map_err(|e| store_error(&self.key, e))
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.writer.close().await
            .map(|_| ())
            .map_err(|e| store_error(&self.key, e))
    }
}
