//! The dispatch protocol: task submission and the check-in state machine.
//!
//! [`Dispatcher`] is the facade the transport layer binds to. It exposes the
//! five logical operations: [`submit`](Dispatcher::submit),
//! [`check_in`](Dispatcher::check_in), [`list_pending`](Dispatcher::list_pending),
//! [`list_results`](Dispatcher::list_results), and
//! [`list_history`](Dispatcher::list_history).
//!
//! # Check-in
//!
//! A check-in is one request/response exchange combining optional result
//! submission with a full drain of pending tasks. Per call it moves through
//! `Idle -> ResultsIngested (optional) -> Drained -> Responded`:
//!
//! 1. Receive zero or more result items.
//! 2. Non-empty list: ingest through the [`ResultCorrelator`]. Empty list:
//!    skip (the agent is just polling).
//! 3. Either way, drain the pending queue.
//! 4. Return the drained batch as the response payload.
//!
//! Conflating "submit results" and "fetch next work" into one exchange
//! keeps a polling agent at one round trip and gives every task exactly one
//! delivery per successful drain. Steps 2 and 3 are **not** one atomic unit
//! across the call: a failure between them loses neither results nor tasks
//! individually, and the only cross-call hazard — an enqueue racing the
//! drain — is handled by the ledger's linearizable drain.
//!
//! # Submission
//!
//! Task submission is its own short sequence: validate every spec, then per
//! task enqueue and append the paired history entry. The pairing must never
//! diverge silently; a history append failing after its enqueue succeeded
//! surfaces as [`DispatchError::HistoryDiverged`].

use std::sync::Arc;

use crate::correlate::ResultCorrelator;
use crate::error::DispatchError;
use crate::store::{DispatchStore, DrainBatch};
use crate::types::{HistoryEntry, ResultRecord, ResultSubmission, Task, TaskSpec};

/// The outcome of one check-in exchange.
///
/// `batch` is the drained pending set — the response payload for the agent.
/// `ingested` holds the persisted records for whatever the agent reported,
/// which the transport may log or discard.
#[derive(Debug, Clone)]
pub struct CheckInReport {
    /// Records persisted from the agent's reported results (empty for a
    /// pure poll).
    pub ingested: Vec<ResultRecord>,

    /// The drained batch, tagged with its drain version.
    pub batch: DrainBatch,
}

impl CheckInReport {
    /// The tasks to hand to the agent, insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.batch.tasks
    }
}

/// Orchestrates the dispatch protocol over an injected [`DispatchStore`].
///
/// Owns no state of its own beyond the store handle; all persistence and
/// the drain's concurrency discipline live behind the store. Construction
/// is cheap and the dispatcher is `Send + Sync`, so one instance can serve
/// all request handlers.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use listenpost_tasks::{Dispatcher, TaskSpec};
/// use listenpost_tasks::store::memory::InMemoryDispatchStore;
///
/// # async fn example() -> Result<(), listenpost_tasks::DispatchError> {
/// let dispatcher = Dispatcher::new(Arc::new(InMemoryDispatchStore::new()));
///
/// let issued = dispatcher
///     .submit(vec![TaskSpec::new("shell").with_option("cmd", "whoami")])
///     .await?;
/// assert_eq!(issued.len(), 1);
///
/// // Agent polls with nothing to report:
/// let report = dispatcher.check_in(Vec::new()).await?;
/// assert_eq!(report.tasks().len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct Dispatcher {
    store: Arc<dyn DispatchStore>,
    correlator: ResultCorrelator,
}

impl Dispatcher {
    /// Creates a dispatcher over the given store.
    pub fn new(store: Arc<dyn DispatchStore>) -> Self {
        let correlator = ResultCorrelator::new(Arc::clone(&store));
        Self { store, correlator }
    }

    /// Returns a reference to the underlying store.
    ///
    /// Useful for direct store access in tests or composition roots.
    pub fn store(&self) -> &Arc<dyn DispatchStore> {
        &self.store
    }

    /// Submits a batch of task specifications.
    ///
    /// Every spec is validated before anything is written, so a validation
    /// failure leaves no partial state. Each accepted spec is enqueued and
    /// paired with one history entry carrying the display options and a
    /// snapshot of the whole submitted batch. Returns the issued tasks in
    /// submission order. An empty batch is an accepted no-op.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::Validation`] if any spec has an empty or missing
    ///   `task_type`, or the batch exceeds `max_batch_items`. Nothing is
    ///   written.
    /// - [`DispatchError::CapacityExceeded`] / [`DispatchError::Storage`]
    ///   from mid-batch enqueues; earlier items remain applied, each with
    ///   its paired history entry intact.
    /// - [`DispatchError::HistoryDiverged`] if a history append fails after
    ///   its enqueue succeeded. The ledgers are inconsistent and the caller
    ///   must know.
    pub async fn submit(&self, specs: Vec<TaskSpec>) -> Result<Vec<Task>, DispatchError> {
        if specs.is_empty() {
            return Ok(Vec::new());
        }
        let limit = self.store.config().max_batch_items;
        if specs.len() > limit {
            return Err(DispatchError::Validation {
                field: "tasks".to_string(),
                reason: format!("batch of {} exceeds limit of {limit}", specs.len()),
            });
        }
        for spec in &specs {
            spec.validate()?;
        }

        // One snapshot of the whole submitted batch, shared by every entry.
        let snapshot = serde_json::to_string(&specs)
            .map_err(|e| DispatchError::Storage(format!("failed to serialize batch: {e}")))?;

        let mut issued = Vec::with_capacity(specs.len());
        for spec in specs {
            let task = self.store.enqueue(spec).await?;
            let entry = HistoryEntry::for_task(&task, snapshot.clone());
            if let Err(err) = self.store.record_history(entry).await {
                tracing::error!(
                    task_id = %task.task_id,
                    error = %err,
                    "history append failed after enqueue; ledgers diverged"
                );
                return Err(DispatchError::HistoryDiverged {
                    task_id: task.task_id,
                    message: err.to_string(),
                });
            }
            issued.push(task);
        }

        tracing::info!(count = issued.len(), "task batch submitted");
        Ok(issued)
    }

    /// Handles one agent check-in: optional result ingest, then a full
    /// drain of the pending queue.
    ///
    /// An empty `results` list models a pure poll and skips the ingest
    /// step entirely. The drained batch is returned either way; it may be
    /// empty if nothing was queued since the last drain.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::MalformedBatch`] / [`DispatchError::Validation`]
    ///   from the ingest step; the drain does not run and no task is lost.
    /// - [`DispatchError::Storage`] from either step. If the ingest
    ///   succeeded and the drain failed, the results are persisted and the
    ///   tasks remain pending for the next check-in.
    pub async fn check_in(
        &self,
        results: Vec<ResultSubmission>,
    ) -> Result<CheckInReport, DispatchError> {
        let ingested = if results.is_empty() {
            Vec::new()
        } else {
            let records = self.correlator.ingest(results).await?;
            tracing::debug!(count = records.len(), "check-in results ingested");
            records
        };

        let batch = self.store.drain_pending().await?;
        tracing::info!(
            reported = ingested.len(),
            delivered = batch.tasks.len(),
            drain_version = batch.version,
            "check-in served"
        );
        Ok(CheckInReport { ingested, batch })
    }

    /// Returns the pending tasks without draining them. Does not mutate
    /// state.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Storage`] on backend failures.
    pub async fn list_pending(&self) -> Result<Vec<Task>, DispatchError> {
        self.store.list_pending().await
    }

    /// Returns all persisted results, insertion order. Does not mutate
    /// state.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Storage`] on backend failures.
    pub async fn list_results(&self) -> Result<Vec<ResultRecord>, DispatchError> {
        self.correlator.list().await
    }

    /// Returns the full history ledger, insertion order. Does not mutate
    /// state.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Storage`] on backend failures.
    pub async fn list_history(&self) -> Result<Vec<HistoryEntry>, DispatchError> {
        self.store.list_history().await
    }
}
