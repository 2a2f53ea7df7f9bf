//! Collection names and wire field-name constants.

/// Collection holding pending (not yet drained) tasks.
pub const TASKS_COLLECTION: &str = "tasks";

/// Append-only collection of agent-reported results.
pub const RESULTS_COLLECTION: &str = "results";

/// Append-only collection of every task ever issued.
pub const HISTORY_COLLECTION: &str = "history";

/// Wire field carrying the task identifier.
pub const TASK_ID_FIELD: &str = "task_id";

/// Wire field carrying the task type.
pub const TASK_TYPE_FIELD: &str = "task_type";

/// Wire field carrying the result identifier.
pub const RESULT_ID_FIELD: &str = "result_id";
