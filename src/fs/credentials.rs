//! Named-profile credential resolution through the AWS SDK config loader.
//!
//! Profiles are read from the shared config and credentials files, so
//! static keys, `role_arn` chains, SSO sessions and `credential_process`
//! all resolve the same way the AWS CLI resolves them.

use std::path::Path;

use anyhow::{Context, Result};
use aws_config::profile::profile_file::{ProfileFileKind, ProfileFiles};
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::Credentials;
use tracing::debug;

/// Resolved credentials for one profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl From<Credentials> for AwsCredentials {
    fn from(creds: Credentials) -> Self {
        Self {
            access_key_id: creds.access_key_id().to_string(),
            secret_access_key: creds.secret_access_key().to_string(),
            session_token: creds.session_token().map(str::to_string),
        }
    }
}

/// Resolve `profile` from the default shared config and credentials files.
///
/// `AWS_CONFIG_FILE` and `AWS_SHARED_CREDENTIALS_FILE` move those files.
pub async fn load_profile(profile: &str) -> Result<AwsCredentials> {
    let provider = ProfileFileCredentialsProvider::builder()
        .profile_name(profile)
        .build();
    resolve(&provider, profile).await
}

/// Resolve `profile` from one explicit credentials file only.
pub async fn load_profile_from(profile: &str, credentials_file: &Path) -> Result<AwsCredentials> {
    let files = ProfileFiles::builder()
        .with_file(ProfileFileKind::Credentials, credentials_file)
        .build();
    let provider = ProfileFileCredentialsProvider::builder()
        .profile_name(profile)
        .profile_files(files)
        .build();
    resolve(&provider, profile).await
}

async fn resolve(provider: &ProfileFileCredentialsProvider, profile: &str) -> Result<AwsCredentials> {
    let creds = provider
        .provide_credentials()
        .await
        .with_context(|| format!("Failed to resolve credentials for profile '{}'", profile))?;

    debug!(profile, temporary = creds.session_token().is_some(), "Resolved AWS profile");
    Ok(creds.into())
}
