// In-memory object store with fault injection for engine tests

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use bucketsync::fs::{BackendType, ObjectReader, ObjectStore, ObjectWriter, RemoteObject, StoreError};
use bucketsync::sync::{md5_hex, SyncConfig};

#[derive(Debug, Clone)]
struct Entry {
    data: Vec<u8>,
    hash: Option<String>,
    content_type: Option<String>,
    written: bool,
}

/// Faults applied by a [`FakeStore`].
#[derive(Debug, Default)]
pub struct Faults {
    /// Fail listing outright
    pub fail_list: bool,
    /// Number of upcoming stat calls failing with a transient error
    pub transient_stats: usize,
    /// Number of upcoming reader calls failing with a transient error
    pub transient_reads: usize,
    /// Objects written through a writer report this many extra bytes on stat
    pub stale_size_after_put: bool,
    /// Keys whose writes fail
    pub fail_write: HashSet<String>,
    /// Keys whose close fails
    pub fail_close: HashSet<String>,
    /// Delay before a reader is handed out
    pub read_delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<String, Entry>,
    faults: Faults,
    puts: usize,
    stats: usize,
}

#[derive(Debug, Default, Clone)]
pub struct FakeStore {
    state: Arc<Mutex<State>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under `key` with its MD5 as the digest
    pub fn insert(&self, key: &str, data: &[u8]) {
        self.insert_with_hash(key, data, Some(md5_hex(data)));
    }

    pub fn insert_with_hash(&self, key: &str, data: &[u8], hash: Option<String>) {
        self.state.lock().unwrap().objects.insert(
            key.to_string(),
            Entry {
                data: data.to_vec(),
                hash,
                content_type: None,
                written: false,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().objects.get(key).map(|e| e.data.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.state.lock().unwrap().objects.get(key).and_then(|e| e.content_type.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.lock().unwrap().objects.keys().cloned().collect()
    }

    /// Objects completed through a writer
    pub fn puts(&self) -> usize {
        self.state.lock().unwrap().puts
    }

    pub fn stat_calls(&self) -> usize {
        self.state.lock().unwrap().stats
    }

    pub fn faults<F: FnOnce(&mut Faults)>(&self, f: F) {
        f(&mut self.state.lock().unwrap().faults);
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn list(&self, prefix: &str) -> Result<Vec<RemoteObject>, StoreError> {
        let state = self.state.lock().unwrap();
        if state.faults.fail_list {
            return Err(StoreError::backend("access denied"));
        }

        Ok(state
            .objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, e)| RemoteObject::new(key.clone(), e.data.len() as u64, e.hash.clone()))
            .collect())
    }

    async fn stat(&self, key: &str) -> Result<RemoteObject, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.stats += 1;
        if state.faults.transient_stats > 0 {
            state.faults.transient_stats -= 1;
            return Err(StoreError::temporary("connection reset by peer"));
        }

        let stale = state.faults.stale_size_after_put;
        let entry = state
            .objects
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        let mut size = entry.data.len() as u64;
        if stale && entry.written {
            size += 1;
        }
        Ok(RemoteObject::new(key, size, entry.hash.clone()))
    }

    async fn reader(&self, key: &str) -> Result<ObjectReader, StoreError> {
        let delay = self.state.lock().unwrap().faults.read_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if state.faults.transient_reads > 0 {
            state.faults.transient_reads -= 1;
            return Err(StoreError::temporary("read timed out"));
        }

        let data = state
            .objects
            .get(key)
            .map(|e| e.data.clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        // Serve in small chunks to exercise streaming
        let chunks: Vec<Result<Bytes, StoreError>> = data
            .chunks(7)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(futures::stream::iter(chunks).boxed())
    }

    async fn writer(&self, key: &str, content_type: &str) -> Result<Box<dyn ObjectWriter>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(Box::new(FakeWriter {
            key: key.to_string(),
            content_type: content_type.to_string(),
            buf: Vec::new(),
            fail_write: state.faults.fail_write.contains(key),
            fail_close: state.faults.fail_close.contains(key),
            failed: false,
            state: self.state.clone(),
        }))
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Memory
    }
}

struct FakeWriter {
    key: String,
    content_type: String,
    buf: Vec<u8>,
    fail_write: bool,
    fail_close: bool,
    failed: bool,
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl ObjectWriter for FakeWriter {
    async fn write(&mut self, chunk: Bytes) -> Result<(), StoreError> {
        if self.fail_write {
            self.failed = true;
            return Err(StoreError::backend("write refused"));
        }
        self.buf.extend_from_slice(&chunk);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        if self.fail_close {
            return Err(StoreError::backend("close refused"));
        }
        if self.failed {
            return Err(StoreError::backend("writer already failed"));
        }

        let data = std::mem::take(&mut self.buf);
        let mut state = self.state.lock().unwrap();
        state.puts += 1;
        state.objects.insert(
            self.key.clone(),
            Entry {
                hash: Some(md5_hex(&data)),
                data,
                content_type: Some(self.content_type.clone()),
                written: true,
            },
        );
        Ok(())
    }
}

/// Sync config staging under `root`
pub fn config(root: &std::path::Path) -> SyncConfig {
    SyncConfig {
        staging_root: root.join("stage"),
        ..SyncConfig::default()
    }
}
