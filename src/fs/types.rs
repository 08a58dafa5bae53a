use serde::Serialize;

/// Snapshot of one object as reported by a list or stat call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteObject {
    pub key: String,
    /// Normalized lowercase hex digest, if the provider supplied one
    pub hash: Option<String>,
    pub size: u64,
}

impl RemoteObject {
    pub fn new(key: impl Into<String>, size: u64, hash: Option<String>) -> Self {
        Self {
            key: key.into(),
            hash,
            size,
        }
    }

    pub fn format_size(&self) -> String {
        humansize::format_size(self.size, humansize::BINARY)
    }
}
