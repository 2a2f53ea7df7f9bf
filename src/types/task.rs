//! Task wire types and option-string helpers.
//!
//! This module defines [`TaskSpec`] (what an operator submits) and [`Task`]
//! (what the server stores and delivers to agents).
//!
//! # Serialization
//!
//! The wire format is a flat JSON object: `task_type` (and `task_id` on a
//! stored [`Task`]) are named fields, and every other key is an option.
//! The original listening post stored these as schema-less documents; here
//! the open-ended part is an explicit `#[serde(flatten)]` string map and
//! only the required core is validated.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DispatchError;

/// An operator-submitted task specification.
///
/// `task_type` names the operation the agent should perform (e.g. `"shell"`);
/// everything else in the submitted object is an option. A missing
/// `task_type` deserializes as the empty string and is rejected by
/// [`enqueue`](crate::store::DispatchStore::enqueue) validation rather than
/// by serde, so "missing" and "empty" surface as the same `ValidationError`.
///
/// # Examples
///
/// ```
/// use listenpost_tasks::TaskSpec;
///
/// let spec: TaskSpec =
///     serde_json::from_str(r#"{"task_type": "shell", "cmd": "whoami"}"#).unwrap();
/// assert_eq!(spec.task_type, "shell");
/// assert_eq!(spec.options.get("cmd").map(String::as_str), Some("whoami"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// The operation the agent should perform. Required, non-empty.
    #[serde(default)]
    pub task_type: String,

    /// Unordered extra fields. Anything that is not `task_type` is an option.
    #[serde(flatten)]
    pub options: HashMap<String, String>,
}

impl TaskSpec {
    /// Creates a spec with the given type and no options.
    pub fn new(task_type: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            options: HashMap::new(),
        }
    }

    /// Adds an option (builder pattern).
    ///
    /// # Examples
    ///
    /// ```
    /// use listenpost_tasks::TaskSpec;
    ///
    /// let spec = TaskSpec::new("shell").with_option("cmd", "whoami");
    /// assert_eq!(spec.options.len(), 1);
    /// ```
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Validates the required core of the spec.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Validation`] if `task_type` is empty or whitespace.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.task_type.trim().is_empty() {
            return Err(DispatchError::Validation {
                field: "task_type".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// A stored task: a [`TaskSpec`] plus its server-generated identity.
///
/// Immutable once created. A task lives in the pending collection until a
/// drain delivers it to an agent, at which point its record is removed.
///
/// # Examples
///
/// ```
/// use listenpost_tasks::{Task, TaskSpec};
///
/// let task = Task::new(TaskSpec::new("shell").with_option("cmd", "whoami"));
/// assert_eq!(task.task_id.len(), 36); // UUID v4
/// assert_eq!(task.task_type, "shell");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Server-generated UUID v4, globally unique.
    pub task_id: String,

    /// The operation the agent should perform.
    pub task_type: String,

    /// Unordered extra fields carried through from the spec.
    #[serde(flatten)]
    pub options: HashMap<String, String>,
}

impl Task {
    /// Creates a task from a spec, assigning a fresh UUID v4 identity.
    ///
    /// Validation is the caller's responsibility; see [`TaskSpec::validate`].
    pub fn new(spec: TaskSpec) -> Self {
        Self {
            task_id: Uuid::new_v4().to_string(),
            task_type: spec.task_type,
            options: spec.options,
        }
    }
}

/// Parses an operator option string of the form `"k1=v1,k2=v2"`.
///
/// Keys and values are trimmed. An empty input yields an empty map. A
/// segment without a `=` separator rejects the whole string.
///
/// # Errors
///
/// [`DispatchError::MalformedBatch`] with the zero-based segment index if
/// a segment has no `=` separator or an empty key.
///
/// # Examples
///
/// ```
/// use listenpost_tasks::parse_options_str;
///
/// let options = parse_options_str("cmd=whoami, timeout=5").unwrap();
/// assert_eq!(options.get("cmd").map(String::as_str), Some("whoami"));
/// assert_eq!(options.get("timeout").map(String::as_str), Some("5"));
///
/// assert!(parse_options_str("no-separator").is_err());
/// assert!(parse_options_str("").unwrap().is_empty());
/// ```
pub fn parse_options_str(input: &str) -> Result<HashMap<String, String>, DispatchError> {
    let mut options = HashMap::new();
    if input.trim().is_empty() {
        return Ok(options);
    }
    for (index, segment) in input.split(',').enumerate() {
        let Some((key, value)) = segment.split_once('=') else {
            return Err(DispatchError::MalformedBatch {
                index,
                reason: format!("option '{}' has no key=value separator", segment.trim()),
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(DispatchError::MalformedBatch {
                index,
                reason: "option has an empty key".to_string(),
            });
        }
        options.insert(key.to_string(), value.trim().to_string());
    }
    Ok(options)
}

/// Renders an options map as the history display form: `"key: value"`
/// strings, sorted by key.
///
/// The options map is unordered, so the display form sorts by key to keep
/// history entries deterministic.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use listenpost_tasks::display_options;
///
/// let mut options = HashMap::new();
/// options.insert("cmd".to_string(), "whoami".to_string());
/// options.insert("args".to_string(), "-a".to_string());
/// assert_eq!(display_options(&options), vec!["args: -a", "cmd: whoami"]);
/// ```
pub fn display_options(options: &HashMap<String, String>) -> Vec<String> {
    let mut entries: Vec<_> = options.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
        .into_iter()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect()
}
