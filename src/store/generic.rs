//! Generic ledger store with all domain logic delegating to a [`StorageBackend`].
//!
//! [`GenericLedgerStore`] implements every domain operation (spec validation,
//! identity generation, capacity enforcement, drain versioning, JSON
//! serialization at the storage boundary) on top of any [`StorageBackend`]
//! implementation.
//!
//! Backends remain dumb document collections; all intelligence lives here.
//!
//! # Drain versioning
//!
//! Every `drain_pending` call allocates a fresh token from a process-local
//! monotonic counter, including drains that come back empty. The token is
//! bound to the batch it delivered, so a transport that retries or overlaps
//! responses can tell two drains apart. Tokens order allocation, not the
//! interleaving of the underlying swap-and-clear.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::constants::{HISTORY_COLLECTION, RESULTS_COLLECTION, TASKS_COLLECTION};
use crate::error::DispatchError;
use crate::store::backend::{StorageBackend, StorageError};
use crate::store::{DrainBatch, StoreConfig};
use crate::types::{HistoryEntry, ResultRecord, Task, TaskSpec};

/// Generic ledger store that delegates all storage to a [`StorageBackend`].
///
/// All domain logic lives here: spec validation, UUID assignment, pending
/// capacity enforcement, result size limits, drain version allocation, and
/// JSON serialization of ledger records.
///
/// # Type Parameters
///
/// * `B` - A [`StorageBackend`] implementation (in-memory, Redis, etc.)
///
/// # Construction
///
/// ```
/// use listenpost_tasks::store::generic::GenericLedgerStore;
/// use listenpost_tasks::store::memory::InMemoryBackend;
/// use listenpost_tasks::store::StoreConfig;
///
/// let store = GenericLedgerStore::new(InMemoryBackend::new())
///     .with_config(StoreConfig::default());
/// ```
#[derive(Debug)]
pub struct GenericLedgerStore<B: StorageBackend> {
    backend: B,
    config: StoreConfig,
    drain_version: AtomicU64,
}

impl<B: StorageBackend> GenericLedgerStore<B> {
    /// Creates a new ledger store backed by the given backend, with
    /// `StoreConfig::default()`.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            config: StoreConfig::default(),
            drain_version: AtomicU64::new(0),
        }
    }

    /// Sets the storage configuration (builder pattern).
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns a reference to the store's configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ---- Serialization helpers (private) ----

    fn serialize<T: Serialize>(record: &T, what: &str) -> Result<Vec<u8>, DispatchError> {
        serde_json::to_vec(record)
            .map_err(|e| DispatchError::Storage(format!("failed to serialize {what}: {e}")))
    }

    fn deserialize_all<T: DeserializeOwned>(
        docs: Vec<Vec<u8>>,
        what: &str,
    ) -> Result<Vec<T>, DispatchError> {
        docs.iter()
            .map(|doc| {
                serde_json::from_slice(doc).map_err(|e| {
                    DispatchError::Storage(format!("failed to deserialize {what}: {e}"))
                })
            })
            .collect()
    }

    fn map_storage_error(err: StorageError) -> DispatchError {
        DispatchError::Storage(err.to_string())
    }

    // ---- Domain operations (public) ----

    /// Validates a spec, assigns identity, and appends the task to the
    /// pending collection.
    ///
    /// Validation runs before any mutation; a rejected spec writes nothing.
    pub async fn enqueue(&self, spec: TaskSpec) -> Result<Task, DispatchError> {
        spec.validate()?;

        let pending = self
            .backend
            .count(TASKS_COLLECTION)
            .await
            .map_err(Self::map_storage_error)?;
        if pending >= self.config.max_pending_tasks {
            return Err(DispatchError::CapacityExceeded {
                message: format!(
                    "pending queue at capacity (limit {})",
                    self.config.max_pending_tasks
                ),
            });
        }

        let task = Task::new(spec);
        let bytes = Self::serialize(&task, "Task")?;
        self.backend
            .append(TASKS_COLLECTION, &bytes)
            .await
            .map_err(Self::map_storage_error)?;

        tracing::debug!(
            task_id = %task.task_id,
            task_type = %task.task_type,
            "task enqueued"
        );
        Ok(task)
    }

    /// Returns a snapshot of the pending collection, insertion order.
    pub async fn list_pending(&self) -> Result<Vec<Task>, DispatchError> {
        let docs = self
            .backend
            .list(TASKS_COLLECTION)
            .await
            .map_err(Self::map_storage_error)?;
        Self::deserialize_all(docs, "Task")
    }

    /// Atomically takes the entire pending collection and clears it.
    ///
    /// The backend's `drain` provides the swap-and-clear; this layer
    /// deserializes the batch and binds it to a fresh version token.
    pub async fn drain_pending(&self) -> Result<DrainBatch, DispatchError> {
        let docs = self
            .backend
            .drain(TASKS_COLLECTION)
            .await
            .map_err(Self::map_storage_error)?;
        let tasks = Self::deserialize_all(docs, "Task")?;
        let version = self.drain_version.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::debug!(version, count = tasks.len(), "pending queue drained");
        Ok(DrainBatch { version, tasks })
    }

    /// Appends an entry to the history ledger.
    pub async fn record_history(&self, entry: HistoryEntry) -> Result<(), DispatchError> {
        let bytes = Self::serialize(&entry, "HistoryEntry")?;
        self.backend
            .append(HISTORY_COLLECTION, &bytes)
            .await
            .map_err(Self::map_storage_error)?;

        tracing::debug!(task_id = %entry.task_id, "history entry recorded");
        Ok(())
    }

    /// Returns all history entries, insertion order.
    pub async fn list_history(&self) -> Result<Vec<HistoryEntry>, DispatchError> {
        let docs = self
            .backend
            .list(HISTORY_COLLECTION)
            .await
            .map_err(Self::map_storage_error)?;
        Self::deserialize_all(docs, "HistoryEntry")
    }

    /// Appends a result record, enforcing the serialized size limit.
    ///
    /// The record's `task_id` is not checked against issued tasks.
    pub async fn insert_result(&self, record: ResultRecord) -> Result<(), DispatchError> {
        let bytes = Self::serialize(&record, "ResultRecord")?;
        if bytes.len() > self.config.max_result_bytes {
            return Err(DispatchError::PayloadTooLarge {
                limit_bytes: self.config.max_result_bytes,
                actual_bytes: bytes.len(),
            });
        }
        self.backend
            .append(RESULTS_COLLECTION, &bytes)
            .await
            .map_err(Self::map_storage_error)?;

        tracing::debug!(
            result_id = %record.result_id,
            task_id = %record.task_id,
            "result recorded"
        );
        Ok(())
    }

    /// Returns all result records, insertion order.
    pub async fn list_results(&self) -> Result<Vec<ResultRecord>, DispatchError> {
        let docs = self
            .backend
            .list(RESULTS_COLLECTION)
            .await
            .map_err(Self::map_storage_error)?;
        Self::deserialize_all(docs, "ResultRecord")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryBackend;
    use crate::types::{ResultSubmission, TaskSpec};

    fn test_store() -> GenericLedgerStore<InMemoryBackend> {
        GenericLedgerStore::new(InMemoryBackend::new())
    }

    #[tokio::test]
    async fn enqueue_rejects_empty_type_before_mutation() {
        let store = test_store();
        let err = store.enqueue(TaskSpec::new("")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Validation { .. }));
        assert!(store.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn enqueue_enforces_pending_capacity() {
        let store = GenericLedgerStore::new(InMemoryBackend::new()).with_config(StoreConfig {
            max_pending_tasks: 1,
            ..StoreConfig::default()
        });
        store.enqueue(TaskSpec::new("shell")).await.unwrap();
        let err = store.enqueue(TaskSpec::new("shell")).await.unwrap_err();
        assert!(matches!(err, DispatchError::CapacityExceeded { .. }));
    }

    #[tokio::test]
    async fn capacity_frees_up_after_drain() {
        let store = GenericLedgerStore::new(InMemoryBackend::new()).with_config(StoreConfig {
            max_pending_tasks: 1,
            ..StoreConfig::default()
        });
        store.enqueue(TaskSpec::new("shell")).await.unwrap();
        store.drain_pending().await.unwrap();
        assert!(store.enqueue(TaskSpec::new("shell")).await.is_ok());
    }

    #[tokio::test]
    async fn drain_versions_strictly_increase() {
        let store = test_store();
        let first = store.drain_pending().await.unwrap();
        let second = store.drain_pending().await.unwrap();
        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);
    }

    #[tokio::test]
    async fn empty_drain_still_consumes_a_version() {
        let store = test_store();
        let empty = store.drain_pending().await.unwrap();
        assert!(empty.tasks.is_empty());
        store.enqueue(TaskSpec::new("shell")).await.unwrap();
        let full = store.drain_pending().await.unwrap();
        assert_eq!(full.version, empty.version + 1);
        assert_eq!(full.tasks.len(), 1);
    }

    #[tokio::test]
    async fn insert_result_enforces_size_limit() {
        let store = GenericLedgerStore::new(InMemoryBackend::new()).with_config(StoreConfig {
            max_result_bytes: 64,
            ..StoreConfig::default()
        });
        let record = ResultRecord::new(
            ResultSubmission::new("task-1").with_field("contents", "x".repeat(256)),
        );
        let err = store.insert_result(record).await.unwrap_err();
        assert!(matches!(err, DispatchError::PayloadTooLarge { .. }));
        assert!(store.list_results().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn results_preserve_insertion_order() {
        let store = test_store();
        for n in 0..3 {
            let record =
                ResultRecord::new(ResultSubmission::new(format!("task-{n}")));
            store.insert_result(record).await.unwrap();
        }
        let results = store.list_results().await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.task_id.as_str()).collect();
        assert_eq!(ids, vec!["task-0", "task-1", "task-2"]);
    }
}
