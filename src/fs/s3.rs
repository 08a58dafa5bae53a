use anyhow::Result;
use opendal::{services::S3, Operator};

use crate::fs::backend::{BackendType, S3Provider};
use crate::fs::credentials::{self, AwsCredentials};
use crate::fs::operator::{DigestField, OpendalStore};

/// Where the source bucket lives and how to authenticate against it
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub bucket: String,
    pub region: String,
    pub provider: S3Provider,
    /// Named AWS profile from the shared config and credentials files
    pub profile: Option<String>,
}

impl OpendalStore {
    /// Create a new S3 store using IAM role (EC2/ECS/EKS instance profile)
    ///
    /// Uses the standard AWS credential chain:
    /// 1. Environment variables (AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY)
    /// 2. Shared credentials file (~/.aws/credentials)
    /// 3. EC2 Instance Profile / ECS Task Role / EKS Pod Identity
    pub fn new_s3_with_iam(bucket: &str, region: &str, provider: S3Provider) -> Result<Self> {
        let mut builder = S3::default()
            .bucket(bucket)
            .region(region);
        // Don't set access_key_id/secret_access_key - let OpenDAL auto-detect

        if let Some(endpoint) = provider.endpoint(region) {
            builder = builder.endpoint(&endpoint);
        }

        let operator = Operator::new(builder)?
            .finish();

        Ok(Self::s3_store(operator, bucket, region, provider))
    }

    /// Create a new S3-compatible store with explicit credentials
    pub fn new_s3(
        bucket: &str,
        region: &str,
        credentials: &AwsCredentials,
        provider: S3Provider,
    ) -> Result<Self> {
        let mut builder = S3::default()
            .bucket(bucket)
            .region(region)
            .access_key_id(&credentials.access_key_id)
            .secret_access_key(&credentials.secret_access_key);

        if let Some(token) = &credentials.session_token {
            builder = builder.session_token(token);
        }

        // Set custom endpoint for S3-compatible providers
        if let Some(endpoint) = provider.endpoint(region) {
            builder = builder.endpoint(&endpoint);
        }

        let operator = Operator::new(builder)?
            .finish();

        Ok(Self::s3_store(operator, bucket, region, provider))
    }

    /// Create the source store described by `config`
    pub async fn open_source(config: &SourceConfig) -> Result<Self> {
        match &config.profile {
            Some(profile) => {
                let creds = credentials::load_profile(profile).await?;
                Self::new_s3(&config.bucket, &config.region, &creds, config.provider.clone())
            }
            None => Self::new_s3_with_iam(&config.bucket, &config.region, config.provider.clone()),
        }
    }

    fn s3_store(operator: Operator, bucket: &str, region: &str, provider: S3Provider) -> Self {
        let backend = BackendType::S3 {
            bucket: bucket.to_string(),
            region: region.to_string(),
            provider,
        };
        Self::new(operator, backend, DigestField::ETag)
    }
}
