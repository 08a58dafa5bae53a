use anyhow::{Context, Result};
use opendal::{services::Gcs, Operator};
use std::path::{Path, PathBuf};

use crate::fs::backend::BackendType;
use crate::fs::operator::{DigestField, OpendalStore};

/// Where the destination bucket lives and how to authenticate against it
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationConfig {
    pub bucket: String,
    /// GCP project owning the bucket. Object operations do not need it.
    pub project_id: Option<String>,
    /// Service account JSON file
    pub credential: Option<PathBuf>,
}

impl OpendalStore {
    /// Create a new GCS store
    ///
    /// Uses Application Default Credentials if no service account is provided.
    /// Set GOOGLE_APPLICATION_CREDENTIALS env var or provide a service account file.
    pub fn new_gcs(bucket: &str, credential_path: Option<&Path>) -> Result<Self> {
        let mut builder = Gcs::default()
            .bucket(bucket);

        if let Some(path) = credential_path {
            if !path.is_file() {
                anyhow::bail!("Service account file not found: {}", path.display());
            }
            let path = path.to_str()
                .context("Service account path is not valid UTF-8")?;
            builder = builder.credential_path(path);
        }

        let operator = Operator::new(builder)?
            .finish();

        let backend = BackendType::Gcs {
            bucket: bucket.to_string(),
        };
        Ok(Self::new(operator, backend, DigestField::ContentMd5))
    }

    /// Create the destination store described by `config`
    pub fn open_destination(config: &DestinationConfig) -> Result<Self> {
        Self::new_gcs(&config.bucket, config.credential.as_deref())
    }
}
