//! Document store boundary: the external collection store interface, the
//! batching adapter in front of it, and the collect-and-store reducer.

use crate::api::Reducer;
use crate::constants::MAX_SINK_BATCH;
use crate::domain::ContainerDomain;
use crate::io::ensure_dir;
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub type Document = serde_json::Value;

/// The external collection store, reduced to what the pipelines need.
/// `create_container` fails on an already-existing container; callers are
/// expected to probe via `list_containers` first. Two task instances
/// racing through probe-then-create surface that failure as a conflict.
pub trait DocumentStore: Send + Sync {
    fn list_containers(&self) -> Result<Vec<String>>;
    fn create_container(&self, name: &str) -> Result<()>;
    fn insert_many(&self, container: &str, docs: &[Document]) -> Result<()>;
}

/// Store access with the write-size policy applied: inserts are sliced
/// into order-preserving chunks of at most `max_batch` documents, so an
/// oversized batch is never forwarded to the store.
pub struct SinkAdapter<S> {
    store: S,
    max_batch: usize,
}

impl<S: DocumentStore> SinkAdapter<S> {
    pub fn new(store: S) -> Self {
        Self::with_max_batch(store, MAX_SINK_BATCH)
    }

    pub fn with_max_batch(store: S, max_batch: usize) -> Self {
        assert!(max_batch > 0, "batch bound must be positive");
        SinkAdapter { store, max_batch }
    }

    pub fn max_batch(&self) -> usize {
        self.max_batch
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ensure_container(&self, name: &str) -> Result<()> {
        self.ensure_containers(&[name])
    }

    /// Probe existing containers once and create the absent ones. Called
    /// once per task instance, not once per record.
    pub fn ensure_containers(&self, names: &[&str]) -> Result<()> {
        let existing = self.store.list_containers()?;
        for name in names {
            if !existing.iter().any(|e| e == name) {
                debug!(container = name, "creating absent container");
                self.store.create_container(name)?;
            }
        }
        Ok(())
    }

    pub fn bulk_insert(&self, container: &str, docs: &[Document]) -> Result<()> {
        for chunk in docs.chunks(self.max_batch) {
            self.store
                .insert_many(container, chunk)
                .with_context(|| format!("bulk insert into {}", container))?;
        }
        Ok(())
    }
}

/// Collect-and-store aggregation: values of a key group are serialized
/// records; each is decoded, buffered, and flushed to the key's container
/// whenever the buffer reaches the batch bound or the group ends. One
/// store handle per task instance, owned by the reducer and released with
/// it.
pub struct SinkReducer<K, S> {
    adapter: SinkAdapter<S>,
    pending: Vec<Document>,
    _key: PhantomData<fn() -> K>,
}

impl<K, S: DocumentStore> SinkReducer<K, S> {
    pub fn new(adapter: SinkAdapter<S>) -> Self {
        SinkReducer {
            adapter,
            pending: Vec::new(),
            _key: PhantomData,
        }
    }
}

impl<K, S> Reducer for SinkReducer<K, S>
where
    K: ContainerDomain,
    S: DocumentStore + 'static,
{
    type Key = K;
    type ValueIn = String;

    fn setup(&mut self) -> Result<()> {
        // Provision the whole domain table up front so later key groups
        // never probe again.
        self.adapter.ensure_containers(K::containers())
    }

    fn do_reduce<I, F>(&mut self, key: &K, values: I, _emit: &mut F) -> Result<()>
    where
        I: IntoIterator<Item = String>,
        F: FnMut(String),
    {
        let container = key.container();
        let mut stored: u64 = 0;
        for wire in values {
            let doc: Document = serde_json::from_str(&wire)
                .with_context(|| format!("undecodable record for {}", container))?;
            self.pending.push(doc);
            if self.pending.len() >= self.adapter.max_batch() {
                let batch = std::mem::take(&mut self.pending);
                stored += batch.len() as u64;
                self.adapter.bulk_insert(container, &batch)?;
            }
        }
        if !self.pending.is_empty() {
            let batch = std::mem::take(&mut self.pending);
            stored += batch.len() as u64;
            self.adapter.bulk_insert(container, &batch)?;
        }
        info!(container, stored, "key group persisted");
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        self.pending.clear();
        Ok(())
    }
}

/// Directory-of-JSONL stand-in for the external store: one append-only
/// `<container>.jsonl` file per container under a root directory. The
/// root is created on first write, so construction never fails.
pub struct JsonlStore {
    root: PathBuf,
}

impl JsonlStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        JsonlStore { root: root.into() }
    }

    fn container_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.jsonl", name))
    }
}

impl DocumentStore for JsonlStore {
    fn list_containers(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)
            .with_context(|| format!("read store dir {}", self.root.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn create_container(&self, name: &str) -> Result<()> {
        ensure_dir(&self.root)?;
        let path = self.container_path(name);
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| format!("create container {}", name))?;
        Ok(())
    }

    fn insert_many(&self, container: &str, docs: &[Document]) -> Result<()> {
        ensure_dir(&self.root)?;
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.container_path(container))
            .with_context(|| format!("open container {}", container))?;
        let mut writer = BufWriter::new(file);
        for doc in docs {
            serde_json::to_writer(&mut writer, doc)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// In-memory store for tests. Cloning shares the underlying state, so a
/// pipeline's task instances can each hold "their own" handle while the
/// test inspects the merged result.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    containers: BTreeMap<String, Vec<Document>>,
    insert_sizes: Vec<(String, usize)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self, container: &str) -> Vec<Document> {
        self.inner
            .lock()
            .unwrap()
            .containers
            .get(container)
            .cloned()
            .unwrap_or_default()
    }

    /// Every `insert_many` call observed, as (container, batch size).
    pub fn insert_sizes(&self) -> Vec<(String, usize)> {
        self.inner.lock().unwrap().insert_sizes.clone()
    }

    pub fn container_names(&self) -> Vec<String> {
        self.inner.lock().unwrap().containers.keys().cloned().collect()
    }
}

impl DocumentStore for MemoryStore {
    fn list_containers(&self) -> Result<Vec<String>> {
        Ok(self.container_names())
    }

    fn create_container(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.containers.contains_key(name) {
            bail!("container {} already exists", name);
        }
        inner.containers.insert(name.to_string(), Vec::new());
        Ok(())
    }

    fn insert_many(&self, container: &str, docs: &[Document]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .insert_sizes
            .push((container.to_string(), docs.len()));
        inner
            .containers
            .entry(container.to_string())
            .or_default()
            .extend(docs.iter().cloned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(i: usize) -> Document {
        json!({ "seq": i })
    }

    #[test]
    fn bulk_insert_slices_into_bounded_ordered_chunks() {
        let store = MemoryStore::new();
        let adapter = SinkAdapter::with_max_batch(store.clone(), 50_000);
        let docs: Vec<Document> = (0..120_000).map(doc).collect();

        adapter.bulk_insert("LOG_01", &docs).unwrap();

        let sizes: Vec<usize> = store.insert_sizes().iter().map(|(_, n)| *n).collect();
        assert_eq!(sizes, vec![50_000, 50_000, 20_000]);

        let stored = store.documents("LOG_01");
        assert_eq!(stored.len(), 120_000);
        for (i, d) in stored.iter().enumerate() {
            assert_eq!(d["seq"], i);
        }
    }

    #[test]
    fn ensure_containers_probes_once_and_creates_absent() {
        let store = MemoryStore::new();
        store.create_container("LOG_01").unwrap();
        let adapter = SinkAdapter::new(store.clone());

        adapter.ensure_containers(&["LOG_01", "LOG_02"]).unwrap();
        assert_eq!(store.container_names(), vec!["LOG_01", "LOG_02"]);

        // Idempotent across task instances probing the same table.
        adapter.ensure_containers(&["LOG_01", "LOG_02"]).unwrap();
        assert_eq!(store.container_names(), vec!["LOG_01", "LOG_02"]);
    }

    #[test]
    fn create_existing_container_is_a_conflict() {
        let store = MemoryStore::new();
        store.create_container("ACCESS_LOG").unwrap();
        assert!(store.create_container("ACCESS_LOG").is_err());
    }

    #[test]
    fn sink_reducer_flushes_at_bound_and_stream_end() {
        use crate::api::Reducer;
        use crate::domain::Month;

        let store = MemoryStore::new();
        let adapter = SinkAdapter::with_max_batch(store.clone(), 3);
        let mut reducer: SinkReducer<Month, MemoryStore> = SinkReducer::new(adapter);
        reducer.setup().unwrap();
        assert_eq!(store.container_names().len(), 12);

        let wires: Vec<String> = (0..7).map(|i| format!("{{\"seq\":{}}}", i)).collect();
        reducer
            .do_reduce(&Month::Apr, wires, &mut |_| {})
            .unwrap();
        reducer.cleanup().unwrap();

        let sizes: Vec<usize> = store
            .insert_sizes()
            .iter()
            .filter(|(c, _)| c == "LOG_04")
            .map(|(_, n)| *n)
            .collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(store.documents("LOG_04").len(), 7);
    }

    #[test]
    fn jsonl_store_round_trips_containers() {
        let root = std::env::temp_dir().join(format!("logmill-sink-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        let store = JsonlStore::new(&root);

        assert!(store.list_containers().unwrap().is_empty());
        store.create_container("LOG_01").unwrap();
        assert!(store.create_container("LOG_01").is_err());
        store.insert_many("LOG_01", &[doc(0), doc(1)]).unwrap();

        assert_eq!(store.list_containers().unwrap(), vec!["LOG_01"]);
        let text = std::fs::read_to_string(root.join("LOG_01.jsonl")).unwrap();
        assert_eq!(text.lines().count(), 2);
        let _ = std::fs::remove_dir_all(&root);
    }
}
