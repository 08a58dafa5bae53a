pub mod backend;
pub mod credentials;
pub mod gcs;
pub mod operator;
pub mod s3;
pub mod types;

pub use backend::{BackendType, ObjectReader, ObjectStore, ObjectWriter, S3Provider, StoreError};
pub use gcs::DestinationConfig;
pub use operator::{DigestField, OpendalStore};
pub use s3::SourceConfig;
pub use types::*;
