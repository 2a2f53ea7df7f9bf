//! In-memory storage backend and dispatch store.
//!
//! [`InMemoryBackend`] provides a thread-safe [`StorageBackend`] implementation
//! using `DashMap<String, Vec<Vec<u8>>>` — one ordered document list per
//! collection. It is a dumb store with no domain logic.
//!
//! [`InMemoryDispatchStore`] is a thin wrapper around
//! [`GenericLedgerStore<InMemoryBackend>`](crate::store::generic::GenericLedgerStore)
//! that provides a zero-argument `new()` constructor and a `Default` impl.
//! All domain logic (validation, identity assignment, capacity limits, drain
//! versioning) is handled by `GenericLedgerStore`.
//!
//! # Concurrency
//!
//! Each collection's document list lives under one `DashMap` entry, so every
//! mutation holds that entry's shard write lock. `drain` swaps the list out
//! under the lock (`mem::take`), making it linearizable with concurrent
//! `append` calls on the same collection: a document appended during a drain
//! lands in exactly one of the drained batch or the list afterward.
//!
//! # Examples
//!
//! ```
//! use listenpost_tasks::store::memory::InMemoryDispatchStore;
//! use listenpost_tasks::store::StoreConfig;
//!
//! let store = InMemoryDispatchStore::new().with_config(StoreConfig::default());
//! ```

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::DispatchError;
use crate::store::backend::{StorageBackend, StorageError};
use crate::store::generic::GenericLedgerStore;
use crate::types::{HistoryEntry, ResultRecord, Task, TaskSpec};

use super::{DispatchStore, DrainBatch, StoreConfig};

// ---- InMemoryBackend: dumb document collections using DashMap ----

/// Thread-safe in-memory storage backend using [`DashMap`].
///
/// Stores each collection as an insertion-ordered `Vec<Vec<u8>>` of opaque
/// serialized documents. Contains **no domain logic**; all intelligence
/// lives in [`GenericLedgerStore`].
///
/// # Examples
///
/// ```
/// use listenpost_tasks::store::memory::InMemoryBackend;
/// use listenpost_tasks::store::generic::GenericLedgerStore;
///
/// let backend = InMemoryBackend::new();
/// let store = GenericLedgerStore::new(backend);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    collections: DashMap<String, Vec<Vec<u8>>>,
}

impl InMemoryBackend {
    /// Creates an empty in-memory backend.
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
        }
    }

    /// Returns the total number of documents across all collections.
    ///
    /// # Examples
    ///
    /// ```
    /// use listenpost_tasks::store::memory::InMemoryBackend;
    ///
    /// let backend = InMemoryBackend::new();
    /// assert_eq!(backend.len(), 0);
    /// assert!(backend.is_empty());
    /// ```
    pub fn len(&self) -> usize {
        self.collections.iter().map(|entry| entry.value().len()).sum()
    }

    /// Returns `true` if no collection holds any documents.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn append(&self, collection: &str, doc: &[u8]) -> Result<(), StorageError> {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(doc.to_vec());
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Vec<u8>>, StorageError> {
        Ok(self
            .collections
            .get(collection)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn drain(&self, collection: &str) -> Result<Vec<Vec<u8>>, StorageError> {
        // get_mut holds the shard write lock for the swap, so the take is
        // indivisible with respect to concurrent appends on this collection.
        Ok(self
            .collections
            .get_mut(collection)
            .map(|mut entry| std::mem::take(entry.value_mut()))
            .unwrap_or_default())
    }

    async fn count(&self, collection: &str) -> Result<usize, StorageError> {
        Ok(self
            .collections
            .get(collection)
            .map(|entry| entry.value().len())
            .unwrap_or_default())
    }
}

// ---- InMemoryDispatchStore: thin wrapper around GenericLedgerStore ----

/// Thread-safe in-memory dispatch store using [`GenericLedgerStore`] with
/// [`InMemoryBackend`].
///
/// The default store for tests and single-process deployments. For a
/// persistent queue, use the Redis backend behind the `redis` feature.
///
/// # Examples
///
/// ```
/// use listenpost_tasks::store::memory::InMemoryDispatchStore;
/// use listenpost_tasks::store::StoreConfig;
///
/// let store = InMemoryDispatchStore::new().with_config(StoreConfig {
///     max_pending_tasks: 100,
///     ..StoreConfig::default()
/// });
/// ```
#[derive(Debug)]
pub struct InMemoryDispatchStore {
    inner: GenericLedgerStore<InMemoryBackend>,
}

impl Default for InMemoryDispatchStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDispatchStore {
    /// Creates a new in-memory dispatch store with default configuration.
    pub fn new() -> Self {
        Self {
            inner: GenericLedgerStore::new(InMemoryBackend::new()),
        }
    }

    /// Sets the storage configuration (builder pattern).
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.inner = self.inner.with_config(config);
        self
    }
}

#[async_trait]
impl DispatchStore for InMemoryDispatchStore {
    async fn enqueue(&self, spec: TaskSpec) -> Result<Task, DispatchError> {
        self.inner.enqueue(spec).await
    }

    async fn list_pending(&self) -> Result<Vec<Task>, DispatchError> {
        self.inner.list_pending().await
    }

    async fn drain_pending(&self) -> Result<DrainBatch, DispatchError> {
        self.inner.drain_pending().await
    }

    async fn record_history(&self, entry: HistoryEntry) -> Result<(), DispatchError> {
        self.inner.record_history(entry).await
    }

    async fn list_history(&self) -> Result<Vec<HistoryEntry>, DispatchError> {
        self.inner.list_history().await
    }

    async fn insert_result(&self, record: ResultRecord) -> Result<(), DispatchError> {
        self.inner.insert_result(record).await
    }

    async fn list_results(&self) -> Result<Vec<ResultRecord>, DispatchError> {
        self.inner.list_results().await
    }

    fn config(&self) -> &StoreConfig {
        self.inner.config()
    }
}
