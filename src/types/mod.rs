//! Wire and ledger types for the dispatch protocol.
//!
//! - [`task`] — task specifications and stored tasks.
//! - [`history`] — append-only history ledger entries.
//! - [`result`] — agent result submissions and persisted records.

pub mod history;
pub mod result;
pub mod task;

pub use history::HistoryEntry;
pub use result::{ResultRecord, ResultSubmission};
pub use task::{display_options, parse_options_str, Task, TaskSpec};
