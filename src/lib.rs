//! Task dispatch and result correlation core for the Listenpost agent server.
//!
//! This crate implements the command/response exchange that drives remote
//! agents: an operator enqueues tasks, agents periodically check in, pick up
//! pending work, and report results. The surrounding HTTP transport and the
//! operator GUI are external callers; this crate owns the state and the
//! concurrency discipline.
//!
//! # Overview
//!
//! A [`Dispatcher`] orchestrates three ledgers behind one
//! [`DispatchStore`](store::DispatchStore):
//!
//! - the **pending collection** of tasks awaiting delivery, cleared
//!   atomically by each check-in's drain;
//! - the **results collection**, append-only, correlated to tasks by id;
//! - the **history ledger**, an append-only record of every task ever
//!   issued, one entry per task at submission time.
//!
//! A check-in is a single exchange: the agent's reported results (possibly
//! none) are ingested, then the entire pending queue is drained and returned
//! as the agent's next work batch.
//!
//! # Module Organization
//!
//! - [`types`] - Wire types (task specs, tasks, results, history entries)
//! - [`store`] - The three-layer storage stack and its backends
//! - [`dispatch`] - The check-in state machine and submission pairing
//! - [`correlate`] - Inbound result-batch parsing and ingestion
//! - [`error`] - Rich error types with HTTP status-code mapping
//! - [`constants`] - Collection and wire field-name constants
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use listenpost_tasks::store::memory::InMemoryDispatchStore;
//! use listenpost_tasks::{Dispatcher, ResultSubmission, TaskSpec};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), listenpost_tasks::DispatchError> {
//! let dispatcher = Dispatcher::new(Arc::new(InMemoryDispatchStore::new()));
//!
//! // Operator submits work.
//! let issued = dispatcher
//!     .submit(vec![TaskSpec::new("shell").with_option("cmd", "whoami")])
//!     .await?;
//!
//! // Agent checks in empty-handed and receives the batch.
//! let report = dispatcher.check_in(Vec::new()).await?;
//! assert_eq!(report.tasks().len(), 1);
//!
//! // Next check-in carries the result; nothing new is pending.
//! let report = dispatcher
//!     .check_in(vec![ResultSubmission::new(&issued[0].task_id)
//!         .with_field("contents", "root")
//!         .with_field("success", "true")])
//!     .await?;
//! assert!(report.tasks().is_empty());
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod correlate;
pub mod dispatch;
pub mod error;
pub mod store;
pub mod types;

// Re-exports for ergonomic access
pub use correlate::{parse_result_batch, ResultCorrelator};
pub use dispatch::{CheckInReport, Dispatcher};
pub use error::DispatchError;
pub use types::{
    display_options, parse_options_str, HistoryEntry, ResultRecord, ResultSubmission, Task,
    TaskSpec,
};
