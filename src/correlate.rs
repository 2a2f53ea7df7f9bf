//! Result correlation: parsing inbound result batches, assigning identity,
//! and persisting records.
//!
//! # Wire format
//!
//! Agents report results as a JSON array of single-key objects, the key
//! being the task id and the value the payload:
//!
//! ```json
//! [{"d9b1...-uuid": {"contents": "root", "success": "true"}}]
//! ```
//!
//! [`parse_result_batch`] turns that into typed [`ResultSubmission`]s;
//! [`ResultCorrelator::ingest`] assigns each one a `result_id` and persists
//! it. A malformed item rejects the **whole** batch before anything is
//! persisted — the alternative (skip just the bad item) would make partial
//! writes invisible to the agent.
//!
//! # Unresolved correlation
//!
//! A submission's `task_id` is stored as-is. It is not checked against the
//! pending set or the history ledger: a result for a task that was never
//! issued, or one long since drained, is accepted and retrievable. This is
//! deliberate minimalism, not referential integrity.

use std::sync::Arc;

use serde_json::Value;

use crate::error::DispatchError;
use crate::store::DispatchStore;
use crate::types::{ResultRecord, ResultSubmission};

/// Parses the agent wire form of a result batch.
///
/// Accepts `null` (a pure poll, nothing to report) as the empty batch.
/// Otherwise the body must be an array of single-key objects mapping a task
/// id to a payload object. Scalar payload values (string, bool, number) are
/// coerced to strings; `null`, arrays, and nested objects are rejected.
///
/// # Errors
///
/// [`DispatchError::MalformedBatch`] with the item's index when the body is
/// not an array, an item is not an object, an item has zero or more than
/// one top-level key, the task-id key is empty, or a payload value is not
/// a scalar.
///
/// # Examples
///
/// ```
/// use listenpost_tasks::correlate::parse_result_batch;
/// use serde_json::json;
///
/// let batch = parse_result_batch(&json!([
///     {"task-1": {"contents": "root", "success": "true"}}
/// ]))
/// .unwrap();
/// assert_eq!(batch.len(), 1);
/// assert_eq!(batch[0].task_id, "task-1");
/// assert_eq!(batch[0].fields["contents"], "root");
///
/// assert!(parse_result_batch(&serde_json::Value::Null).unwrap().is_empty());
/// assert!(parse_result_batch(&json!([{}])).is_err());
/// ```
pub fn parse_result_batch(body: &Value) -> Result<Vec<ResultSubmission>, DispatchError> {
    let items = match body {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => {
            return Err(DispatchError::MalformedBatch {
                index: 0,
                reason: format!("result batch must be an array, got {}", json_kind(other)),
            })
        }
    };

    let mut batch = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Value::Object(map) = item else {
            return Err(DispatchError::MalformedBatch {
                index,
                reason: format!("result item must be an object, got {}", json_kind(item)),
            });
        };
        let mut entries = map.iter();
        let Some((task_id, payload)) = entries.next() else {
            return Err(DispatchError::MalformedBatch {
                index,
                reason: "result item is missing its task id key".to_string(),
            });
        };
        if entries.next().is_some() {
            return Err(DispatchError::MalformedBatch {
                index,
                reason: "result item has more than one task id key".to_string(),
            });
        }
        if task_id.is_empty() {
            return Err(DispatchError::MalformedBatch {
                index,
                reason: "result item has an empty task id key".to_string(),
            });
        }

        let Value::Object(payload) = payload else {
            return Err(DispatchError::MalformedBatch {
                index,
                reason: format!("result payload must be an object, got {}", json_kind(payload)),
            });
        };

        let mut submission = ResultSubmission::new(task_id.clone());
        for (key, value) in payload {
            let coerced = match value {
                Value::String(s) => s.clone(),
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                other => {
                    return Err(DispatchError::MalformedBatch {
                        index,
                        reason: format!(
                            "payload field '{key}' must be a scalar, got {}",
                            json_kind(other)
                        ),
                    })
                }
            };
            submission.fields.insert(key.clone(), coerced);
        }
        batch.push(submission);
    }
    Ok(batch)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Persists agent result batches with server-assigned identity.
///
/// Thin domain component over an [`Arc<dyn DispatchStore>`]: it validates
/// the batch shape, assigns each item a fresh `result_id`, and appends the
/// records to the results collection.
pub struct ResultCorrelator {
    store: Arc<dyn DispatchStore>,
}

impl ResultCorrelator {
    /// Creates a correlator over the given store.
    pub fn new(store: Arc<dyn DispatchStore>) -> Self {
        Self { store }
    }

    /// Persists a batch of result submissions, assigning each a fresh id.
    ///
    /// An empty batch is a no-op returning an empty vec — this is how a
    /// pure poll (agent with nothing to report) flows through the check-in
    /// path. The whole batch is validated before anything is written.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::Validation`] if the batch exceeds
    ///   `max_batch_items`.
    /// - [`DispatchError::MalformedBatch`] if an item has an empty
    ///   `task_id`; nothing from the batch is persisted.
    /// - [`DispatchError::PayloadTooLarge`] / [`DispatchError::Storage`]
    ///   from the store. Items before the failing one may already be
    ///   persisted; the error is surfaced, never swallowed.
    pub async fn ingest(
        &self,
        batch: Vec<ResultSubmission>,
    ) -> Result<Vec<ResultRecord>, DispatchError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let limit = self.store.config().max_batch_items;
        if batch.len() > limit {
            return Err(DispatchError::Validation {
                field: "results".to_string(),
                reason: format!("batch of {} exceeds limit of {limit}", batch.len()),
            });
        }
        for (index, submission) in batch.iter().enumerate() {
            if submission.task_id.is_empty() {
                return Err(DispatchError::MalformedBatch {
                    index,
                    reason: "result item has an empty task id".to_string(),
                });
            }
        }

        let mut records = Vec::with_capacity(batch.len());
        for submission in batch {
            let record = ResultRecord::new(submission);
            self.store.insert_result(record.clone()).await?;
            records.push(record);
        }
        tracing::debug!(count = records.len(), "result batch ingested");
        Ok(records)
    }

    /// Returns all persisted results, insertion order. Does not mutate
    /// state.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Storage`] on backend failures.
    pub async fn list(&self) -> Result<Vec<ResultRecord>, DispatchError> {
        self.store.list_results().await
    }
}
