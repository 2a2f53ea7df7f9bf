//! Low-level document-collection storage trait and supporting types.
//!
//! The [`StorageBackend`] trait defines the contract that all storage engines
//! implement. It exposes 4 collection operations: [`append`](StorageBackend::append),
//! [`list`](StorageBackend::list), [`drain`](StorageBackend::drain), and
//! [`count`](StorageBackend::count).
//!
//! Domain logic (validation, identity generation, capacity limits, drain
//! versioning, serialization) does **not** belong here. Backends are dumb
//! ordered document collections; domain logic lives in
//! [`GenericLedgerStore`](crate::store::generic::GenericLedgerStore).
//!
//! # Atomicity
//!
//! [`drain`](StorageBackend::drain) is the one operation with a hard
//! concurrency requirement: it must return the collection's entire current
//! contents and clear them as a single indivisible step, linearizable with
//! concurrent [`append`](StorageBackend::append) calls on the same
//! collection. A document appended during a drain lands in exactly one of
//! "drained now" or "pending after" — never both, never neither.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during raw storage operations.
///
/// These are low-level errors from the storage engine. `GenericLedgerStore`
/// maps them to domain-aware [`DispatchError`](crate::error::DispatchError)
/// variants before surfacing to callers.
///
/// # Examples
///
/// ```
/// use listenpost_tasks::store::backend::StorageError;
///
/// let err = StorageError::Backend {
///     message: "connection refused".to_string(),
///     source: None,
/// };
/// assert!(err.to_string().contains("connection refused"));
/// ```
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O or engine-specific error occurred (network failure, database
    /// timeout, corrupt stored document).
    #[error("backend error: {message}")]
    Backend {
        /// Human-readable description of the error.
        message: String,
        /// The underlying error, if available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StorageError {
    /// Convenience constructor for a backend error without a source.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            source: None,
        }
    }
}

/// Ordered document-collection storage for the three dispatch ledgers.
///
/// Implementations provide raw storage primitives over named collections
/// (`tasks`, `results`, `history` — see [`crate::constants`]). Documents are
/// opaque serialized blobs; backends never interpret them. All domain logic
/// lives in [`GenericLedgerStore`](crate::store::generic::GenericLedgerStore),
/// **not** in the backend.
///
/// # Ordering
///
/// Collections preserve insertion order: [`list`](StorageBackend::list) and
/// [`drain`](StorageBackend::drain) return documents in the order they were
/// appended.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync` to support concurrent access from
/// multiple request handlers.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Appends a document to the end of a collection.
    ///
    /// # Errors
    ///
    /// [`StorageError::Backend`] on I/O or engine-specific failures.
    async fn append(&self, collection: &str, doc: &[u8]) -> Result<(), StorageError>;

    /// Returns a snapshot of all documents in a collection, insertion order.
    ///
    /// Read-only; a missing collection reads as empty.
    ///
    /// # Errors
    ///
    /// [`StorageError::Backend`] on I/O or engine-specific failures.
    async fn list(&self, collection: &str) -> Result<Vec<Vec<u8>>, StorageError>;

    /// Atomically returns a collection's entire contents and clears it.
    ///
    /// Must be linearizable with concurrent [`append`](StorageBackend::append)
    /// calls on the same collection. A missing collection drains as empty.
    ///
    /// # Errors
    ///
    /// [`StorageError::Backend`] on I/O or engine-specific failures.
    async fn drain(&self, collection: &str) -> Result<Vec<Vec<u8>>, StorageError>;

    /// Returns the number of documents currently in a collection.
    ///
    /// # Errors
    ///
    /// [`StorageError::Backend`] on I/O or engine-specific failures.
    async fn count(&self, collection: &str) -> Result<usize, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_display() {
        let err = StorageError::backend("db timeout");
        assert_eq!(err.to_string(), "backend error: db timeout");
    }

    #[test]
    fn backend_error_source_exposed() {
        let inner = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = StorageError::Backend {
            message: "db failed".to_string(),
            source: Some(Box::new(inner)),
        };
        let source = std::error::Error::source(&err);
        assert!(source.unwrap().to_string().contains("timed out"));
    }

    #[test]
    fn backend_error_without_source() {
        let err = StorageError::backend("unknown");
        assert!(std::error::Error::source(&err).is_none());
    }
}
