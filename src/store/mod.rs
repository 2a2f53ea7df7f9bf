//! Dispatch store trait, generic implementation, and supporting types.
//!
//! # Architecture
//!
//! The storage system has three layers:
//!
//! 1. **[`DispatchStore`]** -- A type-erasure interface for use with
//!    `Arc<dyn DispatchStore>` in [`Dispatcher`](crate::dispatch::Dispatcher)
//!    and [`ResultCorrelator`](crate::correlate::ResultCorrelator).
//!
//! 2. **[`GenericLedgerStore<B>`](generic::GenericLedgerStore)** -- All domain
//!    logic (validation, identity generation, capacity limits, drain
//!    versioning, serialization). Has a blanket `DispatchStore` impl.
//!
//! 3. **[`StorageBackend`]** -- Dumb ordered document-collection trait that
//!    backends implement (in-memory, Redis). No domain logic.
//!
//! To create a store: `GenericLedgerStore::new(backend)` and wrap in
//! `Arc<dyn DispatchStore>` for use with `Dispatcher`.
//!
//! # Backends
//!
//! - [`InMemoryBackend`](crate::store::memory::InMemoryBackend) -- Thread-safe
//!   in-memory backend using `DashMap`. Used by
//!   [`InMemoryDispatchStore`](crate::store::memory::InMemoryDispatchStore).
//! - [`RedisBackend`](crate::store::redis::RedisBackend) -- Redis backend for
//!   long-running server deployments. Available behind the `redis` feature flag.

pub mod backend;
pub mod generic;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

use async_trait::async_trait;

pub use backend::{StorageBackend, StorageError};

use crate::error::DispatchError;
use crate::types::{HistoryEntry, ResultRecord, Task, TaskSpec};

/// Configuration for batch and capacity limits.
///
/// Applied by [`GenericLedgerStore`](generic::GenericLedgerStore) and the
/// [`Dispatcher`](crate::dispatch::Dispatcher) regardless of backend.
///
/// # Defaults
///
/// | Setting             | Default | Description                          |
/// |---------------------|---------|--------------------------------------|
/// | `max_pending_tasks` | 4,096   | Pending queue capacity               |
/// | `max_batch_items`   | 256     | Items per submission/result batch    |
/// | `max_result_bytes`  | 65,536  | Serialized size of one result record |
///
/// # Examples
///
/// ```
/// use listenpost_tasks::store::StoreConfig;
///
/// let config = StoreConfig::default();
/// assert_eq!(config.max_pending_tasks, 4096);
/// assert_eq!(config.max_batch_items, 256);
/// assert_eq!(config.max_result_bytes, 65_536);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum number of tasks the pending collection may hold. An enqueue
    /// that would exceed this fails with
    /// [`DispatchError::CapacityExceeded`].
    pub max_pending_tasks: usize,

    /// Maximum number of items accepted in a single submission or result
    /// batch.
    pub max_batch_items: usize,

    /// Maximum serialized size in bytes for a single result record. An
    /// oversized result fails with [`DispatchError::PayloadTooLarge`].
    pub max_result_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_pending_tasks: 4096,
            max_batch_items: 256,
            max_result_bytes: 65_536, // 64 KB
        }
    }
}

/// A drained batch of tasks paired with its version token.
///
/// Every call to [`DispatchStore::drain_pending`] allocates a fresh,
/// strictly increasing version — including drains that return no tasks —
/// so duplicate or overlapping drains are distinguishable downstream
/// instead of relying on lock timing alone.
///
/// # Examples
///
/// ```
/// use listenpost_tasks::store::DrainBatch;
///
/// let batch = DrainBatch { version: 1, tasks: vec![] };
/// assert!(batch.tasks.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainBatch {
    /// Strictly increasing drain token, starting at 1.
    pub version: u64,

    /// The tasks delivered by this drain, insertion order. May be empty.
    pub tasks: Vec<Task>,
}

/// Type-erasure interface for the three dispatch ledgers.
///
/// This trait serves as the dynamic dispatch interface for
/// [`GenericLedgerStore<B>`](generic::GenericLedgerStore). Domain logic
/// lives in `GenericLedgerStore`, not in trait implementations. A blanket
/// implementation is provided for `GenericLedgerStore<B>` where
/// `B: StorageBackend + 'static`.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync` to support concurrent access from
/// multiple request handlers.
///
/// # Atomicity
///
/// [`drain_pending`](DispatchStore::drain_pending) must be linearizable
/// with all [`enqueue`](DispatchStore::enqueue) calls: a task enqueued
/// during a drain appears in exactly one of the returned batch or the
/// pending set afterward.
#[async_trait]
pub trait DispatchStore: Send + Sync {
    /// Validates a spec, assigns a fresh task id, and appends the task to
    /// the pending collection.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::Validation`] if `task_type` is empty or missing.
    ///   Rejected before any mutation.
    /// - [`DispatchError::CapacityExceeded`] if the pending collection is
    ///   at `max_pending_tasks`.
    /// - [`DispatchError::Storage`] on backend failures.
    async fn enqueue(&self, spec: TaskSpec) -> Result<Task, DispatchError>;

    /// Returns a read-only snapshot of the pending collection, insertion
    /// order. Does not mutate state.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Storage`] on backend failures.
    async fn list_pending(&self) -> Result<Vec<Task>, DispatchError>;

    /// Atomically returns the entire pending collection and clears it,
    /// tagging the batch with a fresh drain version.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Storage`] on backend failures.
    async fn drain_pending(&self) -> Result<DrainBatch, DispatchError>;

    /// Appends an entry to the history ledger.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Storage`] on backend failures. Never retried
    /// internally.
    async fn record_history(&self, entry: HistoryEntry) -> Result<(), DispatchError>;

    /// Returns all history entries, insertion order. Does not mutate state.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Storage`] on backend failures.
    async fn list_history(&self) -> Result<Vec<HistoryEntry>, DispatchError>;

    /// Appends a result record to the results collection.
    ///
    /// The record's `task_id` is **not** checked against issued tasks;
    /// unresolved correlation is accepted by design.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::PayloadTooLarge`] if the serialized record
    ///   exceeds `max_result_bytes`.
    /// - [`DispatchError::Storage`] on backend failures.
    async fn insert_result(&self, record: ResultRecord) -> Result<(), DispatchError>;

    /// Returns all result records, insertion order. Does not mutate state.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Storage`] on backend failures.
    async fn list_results(&self) -> Result<Vec<ResultRecord>, DispatchError>;

    /// Returns a reference to the store's configuration.
    ///
    /// Synchronous: configuration access requires no I/O.
    fn config(&self) -> &StoreConfig;
}

// ---- Blanket impl for GenericLedgerStore<B> ----

#[async_trait]
impl<B: StorageBackend + 'static> DispatchStore for generic::GenericLedgerStore<B> {
    async fn enqueue(&self, spec: TaskSpec) -> Result<Task, DispatchError> {
        self.enqueue(spec).await
    }

    async fn list_pending(&self) -> Result<Vec<Task>, DispatchError> {
        self.list_pending().await
    }

    async fn drain_pending(&self) -> Result<DrainBatch, DispatchError> {
        self.drain_pending().await
    }

    async fn record_history(&self, entry: HistoryEntry) -> Result<(), DispatchError> {
        self.record_history(entry).await
    }

    async fn list_history(&self) -> Result<Vec<HistoryEntry>, DispatchError> {
        self.list_history().await
    }

    async fn insert_result(&self, record: ResultRecord) -> Result<(), DispatchError> {
        self.insert_result(record).await
    }

    async fn list_results(&self) -> Result<Vec<ResultRecord>, DispatchError> {
        self.list_results().await
    }

    fn config(&self) -> &StoreConfig {
        self.config()
    }
}
