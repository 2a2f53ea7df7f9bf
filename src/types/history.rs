//! History entry type — the append-only record of every task ever issued.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::task::{display_options, Task};

/// A single history ledger entry, appended once per task at submission time
/// and never mutated afterward.
///
/// The history ledger is independent of the pending collection: draining a
/// task removes its pending record but its history entry remains, so the
/// ledger never shrinks and is never smaller than the number of tasks ever
/// submitted.
///
/// `task_results` is always empty: agent results are correlated by
/// `task_id` through the results collection (see
/// [`ResultCorrelator`](crate::correlate::ResultCorrelator)), not written
/// back into history. The field is kept on the wire for compatibility with
/// the original schema.
///
/// # Examples
///
/// ```
/// use listenpost_tasks::{HistoryEntry, Task, TaskSpec};
///
/// let task = Task::new(TaskSpec::new("shell").with_option("cmd", "whoami"));
/// let entry = HistoryEntry::for_task(&task, "[{\"task_type\":\"shell\"}]".to_string());
/// assert_eq!(entry.task_id, task.task_id);
/// assert_eq!(entry.task_options, vec!["cmd: whoami"]);
/// assert!(entry.task_results.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The id of the task this entry records.
    pub task_id: String,

    /// The task's type at submission.
    pub task_type: String,

    /// Display form of the task's options: `"key: value"`, sorted by key.
    pub task_options: Vec<String>,

    /// Opaque serialized snapshot of the whole submitted batch.
    pub task_object: String,

    /// Always empty; results live in the results collection.
    pub task_results: String,

    /// RFC 3339 timestamp of when the entry was recorded.
    pub recorded_at: String,
}

impl HistoryEntry {
    /// Builds the history entry for a just-enqueued task.
    ///
    /// `batch_snapshot` is the serialized form of the entire submission
    /// batch the task arrived in; every task in a batch carries the same
    /// snapshot.
    pub fn for_task(task: &Task, batch_snapshot: String) -> Self {
        Self {
            task_id: task.task_id.clone(),
            task_type: task.task_type.clone(),
            task_options: display_options(&task.options),
            task_object: batch_snapshot,
            task_results: String::new(),
            recorded_at: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}
