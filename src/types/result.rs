//! Result wire types.
//!
//! [`ResultSubmission`] is what an agent reports at check-in (after parsing,
//! see [`parse_result_batch`](crate::correlate::parse_result_batch));
//! [`ResultRecord`] is the persisted form with its server-generated identity.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single parsed result item from an agent's check-in batch.
///
/// `task_id` is a back-reference to the task the agent executed. It is a
/// lookup key only: the correlator does not verify that it names a task
/// that was ever issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSubmission {
    /// The task this result answers.
    pub task_id: String,

    /// Arbitrary payload fields (e.g. `contents`, `success`).
    pub fields: HashMap<String, String>,
}

impl ResultSubmission {
    /// Creates a submission with the given task id and no payload fields.
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            fields: HashMap::new(),
        }
    }

    /// Adds a payload field (builder pattern).
    ///
    /// # Examples
    ///
    /// ```
    /// use listenpost_tasks::ResultSubmission;
    ///
    /// let submission = ResultSubmission::new("task-1")
    ///     .with_field("contents", "root")
    ///     .with_field("success", "true");
    /// assert_eq!(submission.fields.len(), 2);
    /// ```
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// A persisted result: a [`ResultSubmission`] plus its server-generated
/// identity. Never updated or deleted.
///
/// # Serialization
///
/// The wire format is flat: `result_id` and `task_id` are named fields and
/// the payload fields sit alongside them, matching the original schema-less
/// documents.
///
/// # Examples
///
/// ```
/// use listenpost_tasks::{ResultRecord, ResultSubmission};
///
/// let record = ResultRecord::new(ResultSubmission::new("task-1").with_field("contents", "root"));
/// assert_eq!(record.result_id.len(), 36); // UUID v4
/// assert_eq!(record.task_id, "task-1");
///
/// let value = serde_json::to_value(&record).unwrap();
/// assert_eq!(value["contents"], "root");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Server-generated UUID v4, globally unique.
    pub result_id: String,

    /// The task this result answers. Lookup key only; existence is not
    /// enforced.
    pub task_id: String,

    /// Arbitrary payload fields carried through from the submission.
    #[serde(flatten)]
    pub fields: HashMap<String, String>,
}

impl ResultRecord {
    /// Creates a record from a submission, assigning a fresh UUID v4 identity.
    pub fn new(submission: ResultSubmission) -> Self {
        Self {
            result_id: Uuid::new_v4().to_string(),
            task_id: submission.task_id,
            fields: submission.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_assigns_uuid_v4() {
        let record = ResultRecord::new(ResultSubmission::new("t1"));
        let parsed = Uuid::parse_str(&record.result_id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn record_ids_are_distinct() {
        let a = ResultRecord::new(ResultSubmission::new("t1"));
        let b = ResultRecord::new(ResultSubmission::new("t1"));
        assert_ne!(a.result_id, b.result_id);
    }

    #[test]
    fn record_serializes_fields_flat() {
        let record = ResultRecord::new(
            ResultSubmission::new("t1")
                .with_field("contents", "root")
                .with_field("success", "true"),
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["task_id"], "t1");
        assert_eq!(value["contents"], "root");
        assert_eq!(value["success"], "true");
        assert!(value.get("fields").is_none());
    }

    #[test]
    fn record_round_trips_through_json() {
        let record = ResultRecord::new(ResultSubmission::new("t1").with_field("contents", "root"));
        let json = serde_json::to_string(&record).unwrap();
        let back: ResultRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
