//! Command line flags, the optional TOML config file, and their resolution
//! into the immutable settings a run is started with.
//!
//! Precedence is CLI over file over built-in defaults. Boolean switches are
//! enabled when either the CLI or the file enables them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgAction, Parser};
use serde::Deserialize;

use crate::error::{Result, SyncError};
use crate::fs::{DestinationConfig, S3Provider, SourceConfig};
use crate::sync::{BandwidthLimit, ExcludePatterns, StagingLayout, SyncConfig};

/// Region used when neither the CLI nor the config file names one
pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Parser, Debug, Default)]
#[command(name = "bucketsync")]
#[command(version, about = "One-way sync of an S3 prefix into a GCS bucket")]
pub struct Args {
    /// Profile in the AWS shared credentials file
    #[arg(long)]
    pub aws_profile: Option<String>,

    /// Source S3 bucket
    #[arg(long)]
    pub s3_bucket: Option<String>,

    /// Key prefix to sync
    #[arg(long)]
    pub s3_prefix: Option<String>,

    /// Source bucket region [default: us-east-1]
    #[arg(long)]
    pub aws_region: Option<String>,

    /// S3-compatible provider (aws, digitalocean, hetzner, minio, r2, wasabi)
    #[arg(long)]
    pub s3_provider: Option<String>,

    /// Custom S3 endpoint URL
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// GCP project owning the destination bucket
    #[arg(long)]
    pub gcp_project_id: Option<String>,

    /// Destination GCS bucket
    #[arg(long)]
    pub gs_bucket: Option<String>,

    /// Service account JSON file for GCS
    #[arg(long)]
    pub gcs_credential: Option<PathBuf>,

    /// Local staging directory
    #[arg(long)]
    pub local_dir: Option<PathBuf>,

    /// Report decisions without transferring anything
    #[arg(long)]
    pub dry_run: bool,

    /// Config file [default: <config dir>/bucketsync/config.toml]
    #[arg(long, env = "BUCKETSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Glob pattern of keys to skip (repeatable)
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// File of exclude patterns, one per line
    #[arg(long)]
    pub exclude_from: Option<PathBuf>,

    /// Transfer rate cap in bytes per second (minimum 1024, 0 for none)
    #[arg(long, value_name = "BYTES")]
    pub bandwidth_limit: Option<u64>,

    /// Per-object transfer deadline in seconds
    #[arg(long, value_name = "SECS")]
    pub object_timeout: Option<u64>,

    /// Extra attempts for transient transfer failures
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Record failed objects and keep going
    #[arg(long)]
    pub continue_on_error: bool,

    /// Fail when the destination stat errors for reasons other than not-found
    #[arg(long)]
    pub strict_stat: bool,

    /// Stage objects under their full key path instead of the base name
    #[arg(long)]
    pub mirror_key_paths: bool,

    /// Compare the destination digest with the uploaded bytes
    #[arg(long)]
    pub verify_checksum: bool,

    /// Print the report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Contents of the TOML config file.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub source: SourceSection,
    pub destination: DestinationSection,
    pub sync: SyncSection,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SourceSection {
    pub bucket: Option<String>,
    pub prefix: Option<String>,
    pub region: Option<String>,
    pub profile: Option<String>,
    pub provider: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DestinationSection {
    pub bucket: Option<String>,
    pub project_id: Option<String>,
    pub credential: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSection {
    pub local_dir: Option<PathBuf>,
    pub dry_run: bool,
    pub exclude: Vec<String>,
    pub exclude_from: Option<PathBuf>,
    pub bandwidth_limit: Option<u64>,
    pub object_timeout: Option<u64>,
    pub max_retries: Option<u32>,
    pub continue_on_error: bool,
    pub strict_stat: bool,
    pub mirror_key_paths: bool,
    pub verify_checksum: bool,
}

impl FileConfig {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SyncError::Config(format!("invalid config file: {}", e)))
    }
}

/// Default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("bucketsync").join("config.toml"))
}

/// Load the config file.
///
/// An explicitly named file must exist. The default file is optional.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.is_file() => path,
            _ => return Ok(FileConfig::default()),
        },
    };

    let content = std::fs::read_to_string(&path).map_err(|e| {
        SyncError::Config(format!("cannot read config file {}: {}", path.display(), e))
    })?;
    FileConfig::parse(&content)
}

/// Everything needed to open both stores and run the engine.
#[derive(Debug, Clone)]
pub struct Settings {
    pub source: SourceConfig,
    pub destination: DestinationConfig,
    pub sync: SyncConfig,
    pub json: bool,
    pub verbose: u8,
}

impl Settings {
    /// Merge CLI flags over the config file.
    pub fn resolve(args: &Args, file: FileConfig) -> Result<Self> {
        let FileConfig {
            source: src,
            destination: dst,
            sync,
        } = file;

        let provider_name = args
            .s3_provider
            .clone()
            .or(src.provider)
            .unwrap_or_else(|| "aws".to_string());
        let endpoint = args.s3_endpoint.clone().or(src.endpoint);
        let provider = S3Provider::from_name(&provider_name, endpoint.as_deref())
            .ok_or_else(|| SyncError::Config(format!("unknown S3 provider: {}", provider_name)))?;

        let source = SourceConfig {
            bucket: required(args.s3_bucket.clone().or(src.bucket), "--s3-bucket")?,
            region: args
                .aws_region
                .clone()
                .or(src.region)
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            provider,
            profile: args.aws_profile.clone().or(src.profile),
        };

        let destination = DestinationConfig {
            bucket: required(args.gs_bucket.clone().or(dst.bucket), "--gs-bucket")?,
            project_id: args.gcp_project_id.clone().or(dst.project_id),
            credential: args.gcs_credential.clone().or(dst.credential),
        };

        let mut patterns = args.exclude.clone();
        patterns.extend(sync.exclude.iter().cloned());
        let mut exclude = ExcludePatterns::from_patterns(&patterns)
            .map_err(|e| SyncError::Config(format!("invalid exclude pattern: {}", e)))?;
        if let Some(path) = args.exclude_from.as_ref().or(sync.exclude_from.as_ref()) {
            exclude = exclude
                .merge(&load_exclude_file(path)?)
                .map_err(|e| SyncError::Config(format!("invalid exclude pattern: {}", e)))?;
        }

        let defaults = SyncConfig::default();
        let bandwidth_limit = match args.bandwidth_limit.or(sync.bandwidth_limit) {
            None | Some(0) => defaults.bandwidth_limit,
            Some(bps) if bps < BandwidthLimit::MIN_BYTES_PER_SECOND => {
                return Err(SyncError::Config(format!(
                    "bandwidth limit must be at least {} bytes per second, got {}",
                    BandwidthLimit::MIN_BYTES_PER_SECOND,
                    bps
                )));
            }
            Some(bps) => BandwidthLimit::new(bps),
        };

        let sync = SyncConfig {
            prefix: args.s3_prefix.clone().or(src.prefix).unwrap_or_default(),
            staging_root: args
                .local_dir
                .clone()
                .or(sync.local_dir)
                .unwrap_or(defaults.staging_root),
            staging_layout: if args.mirror_key_paths || sync.mirror_key_paths {
                StagingLayout::Mirrored
            } else {
                StagingLayout::Flat
            },
            dry_run: args.dry_run || sync.dry_run,
            exclude,
            bandwidth_limit,
            object_timeout: args
                .object_timeout
                .or(sync.object_timeout)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            max_retries: args.max_retries.or(sync.max_retries).unwrap_or(defaults.max_retries),
            continue_on_error: args.continue_on_error || sync.continue_on_error,
            strict_stat: args.strict_stat || sync.strict_stat,
            verify_checksum: args.verify_checksum || sync.verify_checksum,
        };

        Ok(Self {
            source,
            destination,
            sync,
            json: args.json,
            verbose: args.verbose,
        })
    }
}

fn required(value: Option<String>, flag: &str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SyncError::Config(format!("{} is required", flag)))
}

fn load_exclude_file(path: &Path) -> Result<ExcludePatterns> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SyncError::Config(format!("cannot read exclude file {}: {}", path.display(), e))
    })?;
    ExcludePatterns::parse_gitignore(&content)
        .map_err(|e| SyncError::Config(format!("invalid pattern in {}: {}", path.display(), e)))
}
