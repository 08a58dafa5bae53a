use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::fs::types::RemoteObject;

/// Backend type information for display and identification
#[derive(Debug, Clone, PartialEq)]
pub enum BackendType {
    S3 { bucket: String, region: String, provider: S3Provider },
    Gcs { bucket: String },
    Memory,
}

impl BackendType {
    /// Get a short display name for the backend
    pub fn short_name(&self) -> &'static str {
        match self {
            BackendType::S3 { .. } => "S3",
            BackendType::Gcs { .. } => "GCS",
            BackendType::Memory => "Memory",
        }
    }

    /// URL-style location of a key, used in log lines
    pub fn display_path(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        match self {
            BackendType::S3 { bucket, .. } => format!("s3://{}/{}", bucket, key),
            BackendType::Gcs { bucket } => format!("gs://{}/{}", bucket, key),
            BackendType::Memory => format!("memory:///{}", key),
        }
    }
}

/// S3-compatible storage providers
#[derive(Debug, Clone, PartialEq)]
pub enum S3Provider {
    Aws,
    DigitalOcean,
    Hetzner,
    MinIO,
    CloudflareR2,
    Wasabi,
    Custom { name: String, endpoint: String },
}

impl S3Provider {
    /// Get the endpoint URL for this provider
    pub fn endpoint(&self, region: &str) -> Option<String> {
        match self {
            S3Provider::Aws => None, // Use default AWS endpoint
            S3Provider::DigitalOcean => Some(format!("https://{}.digitaloceanspaces.com", region)),
            S3Provider::Hetzner => Some(format!("https://{}.your-objectstorage.com", region)),
            S3Provider::MinIO => Some("http://localhost:9000".to_string()),
            S3Provider::CloudflareR2 => Some(format!("https://{}.r2.cloudflarestorage.com", region)),
            S3Provider::Wasabi => Some(format!("https://s3.{}.wasabisys.com", region)),
            S3Provider::Custom { endpoint, .. } => Some(endpoint.clone()),
        }
    }

    /// Get display name for the provider
    pub fn display_name(&self) -> &str {
        match self {
            S3Provider::Aws => "AWS S3",
            S3Provider::DigitalOcean => "DigitalOcean Spaces",
            S3Provider::Hetzner => "Hetzner Object Storage",
            S3Provider::MinIO => "MinIO",
            S3Provider::CloudflareR2 => "Cloudflare R2",
            S3Provider::Wasabi => "Wasabi",
            S3Provider::Custom { name, .. } => name,
        }
    }

    /// Parse a provider name as accepted on the command line and in config files.
    ///
    /// An explicit endpoint always yields [`S3Provider::Custom`].
    pub fn from_name(name: &str, endpoint: Option<&str>) -> Option<Self> {
        if let Some(endpoint) = endpoint {
            return Some(S3Provider::Custom {
                name: name.to_string(),
                endpoint: endpoint.to_string(),
            });
        }

        match name.to_ascii_lowercase().as_str() {
            "aws" | "s3" => Some(S3Provider::Aws),
            "digitalocean" | "spaces" => Some(S3Provider::DigitalOcean),
            "hetzner" => Some(S3Provider::Hetzner),
            "minio" => Some(S3Provider::MinIO),
            "r2" | "cloudflare" => Some(S3Provider::CloudflareR2),
            "wasabi" => Some(S3Provider::Wasabi),
            _ => None,
        }
    }
}

/// Failure reported by an [`ObjectStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("{message}")]
    Backend { message: String, temporary: bool },
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend {
            message: message.into(),
            temporary: false,
        }
    }

    pub fn temporary(message: impl Into<String>) -> Self {
        StoreError::Backend {
            message: message.into(),
            temporary: true,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, StoreError::Backend { temporary: true, .. })
    }
}

/// Byte chunks of one object, in order
pub type ObjectReader = BoxStream<'static, Result<Bytes, StoreError>>;

/// Streaming write of one object. Nothing is visible at the destination
/// until [`ObjectWriter::close`] succeeds.
#[async_trait]
pub trait ObjectWriter: Send {
    async fn write(&mut self, chunk: Bytes) -> Result<(), StoreError>;

    async fn close(&mut self) -> Result<(), StoreError>;
}

/// Object storage seen by the sync engine
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object under a key prefix, recursively
    async fn list(&self, prefix: &str) -> Result<Vec<RemoteObject>, StoreError>;

    /// Fetch current metadata of one object
    async fn stat(&self, key: &str) -> Result<RemoteObject, StoreError>;

    /// Open a byte stream over one object
    async fn reader(&self, key: &str) -> Result<ObjectReader, StoreError>;

    /// Start writing one object with the given content type
    async fn writer(&self, key: &str, content_type: &str) -> Result<Box<dyn ObjectWriter>, StoreError>;

    /// Get the backend type
    fn backend_type(&self) -> BackendType;

    /// Get display path for a key
    fn display_path(&self, key: &str) -> String {
        self.backend_type().display_path(key)
    }
}
