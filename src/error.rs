//! Error types for dispatch operations.
//!
//! Provides [`DispatchError`], a rich error enum with context fields and
//! HTTP status-code mapping for the transport layer.

use std::fmt;

/// Errors that can occur during dispatch operations.
///
/// Each variant carries contextual information (field name, batch index,
/// task ID) to aid debugging. Use [`status_code`](DispatchError::status_code)
/// to map to the appropriate HTTP status for wire responses.
///
/// Unresolved correlation — a result naming a task that was never issued, or
/// one already drained — is deliberately **not** an error: the result is
/// accepted and stored as-is. See [`ResultCorrelator`](crate::correlate::ResultCorrelator).
///
/// # Examples
///
/// ```
/// use listenpost_tasks::DispatchError;
///
/// let err = DispatchError::Validation {
///     field: "task_type".to_string(),
///     reason: "must not be empty".to_string(),
/// };
/// assert_eq!(err.status_code(), 400);
/// assert!(err.to_string().contains("task_type"));
/// ```
#[derive(Debug)]
pub enum DispatchError {
    /// A required field is missing or empty. Rejected before any mutation.
    Validation {
        /// The offending field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A result batch item (or operator option string) is structurally
    /// malformed. The whole request is rejected; nothing from the batch
    /// is persisted.
    MalformedBatch {
        /// Zero-based index of the offending item.
        index: usize,
        /// Why the item was rejected.
        reason: String,
    },

    /// A result payload exceeds the configured size limit.
    PayloadTooLarge {
        /// The configured limit in bytes.
        limit_bytes: usize,
        /// The actual serialized size in bytes.
        actual_bytes: usize,
    },

    /// The pending queue is at capacity.
    CapacityExceeded {
        /// Human-readable description of the limit that was hit.
        message: String,
    },

    /// A task was enqueued but its paired history append failed. The
    /// ledgers have diverged; the caller must be told.
    HistoryDiverged {
        /// The task whose history entry is missing.
        task_id: String,
        /// The underlying storage failure.
        message: String,
    },

    /// Backend storage unavailable. Fatal for the current operation;
    /// never retried by this crate.
    Storage(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { field, reason } => {
                write!(f, "invalid {field}: {reason}")
            }
            Self::MalformedBatch { index, reason } => {
                write!(f, "malformed batch item {index}: {reason}")
            }
            Self::PayloadTooLarge {
                limit_bytes,
                actual_bytes,
            } => write!(
                f,
                "payload too large: {actual_bytes} bytes exceeds {limit_bytes} byte limit"
            ),
            Self::CapacityExceeded { message } => {
                write!(f, "capacity exceeded: {message}")
            }
            Self::HistoryDiverged { task_id, message } => write!(
                f,
                "history append failed after enqueue of task {task_id}: {message}"
            ),
            Self::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for DispatchError {}

impl DispatchError {
    /// Maps this error to an HTTP status code for the transport layer.
    ///
    /// - `400` (Bad Request): `Validation`, `MalformedBatch`, `PayloadTooLarge`
    /// - `503` (Service Unavailable): `CapacityExceeded`
    /// - `500` (Internal Server Error): `HistoryDiverged`, `Storage`
    ///
    /// # Examples
    ///
    /// ```
    /// use listenpost_tasks::DispatchError;
    ///
    /// let err = DispatchError::MalformedBatch {
    ///     index: 2,
    ///     reason: "missing task id key".to_string(),
    /// };
    /// assert_eq!(err.status_code(), 400);
    ///
    /// let err = DispatchError::Storage("connection refused".to_string());
    /// assert_eq!(err.status_code(), 500);
    /// ```
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } | Self::MalformedBatch { .. } | Self::PayloadTooLarge { .. } => {
                400
            }
            Self::CapacityExceeded { .. } => 503,
            Self::HistoryDiverged { .. } | Self::Storage(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = DispatchError::Validation {
            field: "task_type".to_string(),
            reason: "must not be empty".to_string(),
        };
        assert_eq!(err.to_string(), "invalid task_type: must not be empty");

        let err = DispatchError::MalformedBatch {
            index: 3,
            reason: "missing task id key".to_string(),
        };
        assert!(err.to_string().contains("item 3"));
        assert!(err.to_string().contains("missing task id key"));

        let err = DispatchError::HistoryDiverged {
            task_id: "abc".to_string(),
            message: "timeout".to_string(),
        };
        assert!(err.to_string().contains("abc"));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            DispatchError::Validation {
                field: "f".to_string(),
                reason: "r".to_string(),
            }
            .status_code(),
            400
        );
        assert_eq!(
            DispatchError::PayloadTooLarge {
                limit_bytes: 10,
                actual_bytes: 20,
            }
            .status_code(),
            400
        );
        assert_eq!(
            DispatchError::CapacityExceeded {
                message: "full".to_string()
            }
            .status_code(),
            503
        );
        assert_eq!(
            DispatchError::HistoryDiverged {
                task_id: "t".to_string(),
                message: "m".to_string(),
            }
            .status_code(),
            500
        );
        assert_eq!(DispatchError::Storage("fail".to_string()).status_code(), 500);
    }

    #[test]
    fn payload_too_large_display() {
        let err = DispatchError::PayloadTooLarge {
            limit_bytes: 65_536,
            actual_bytes: 70_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("70000"));
        assert!(msg.contains("65536"));
    }
}
