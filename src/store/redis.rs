//! Redis storage backend for the dispatch ledgers.
//!
//! [`RedisBackend`] implements [`StorageBackend`] using Redis lists as the
//! underlying collections. It maps the 4 trait methods to Redis operations:
//! `RPUSH` for appends, `LRANGE` for reads, `LLEN` for counts, and a Lua
//! script (`redis::Script`) for the atomic read-and-clear drain.
//!
//! # Key Schema
//!
//! | Key Pattern | Type | Purpose |
//! |-------------|------|---------|
//! | `{prefix}:{collection}` | List | Ordered document collection |
//!
//! Collections are the three ledgers (`tasks`, `results`, `history`); each
//! list element is one serialized record blob.
//!
//! # Atomicity
//!
//! Redis executes a Lua script as a single isolated unit, so the drain's
//! `LRANGE` + `DEL` pair cannot interleave with a concurrent `RPUSH` on the
//! same key. This is the swap-and-clear primitive the pending queue needs.
//!
//! # Relationship to GenericLedgerStore
//!
//! This backend is a **dumb collection adapter**. It stores and retrieves
//! opaque byte blobs and never interprets them. All domain logic lives in
//! [`GenericLedgerStore`](crate::store::generic::GenericLedgerStore).
//!
//! # Usage
//!
//! ```rust,no_run
//! use listenpost_tasks::store::redis::RedisBackend;
//! use listenpost_tasks::store::generic::GenericLedgerStore;
//!
//! # async fn example() {
//! let backend = RedisBackend::new("redis://127.0.0.1:6379").await.unwrap();
//! let store = GenericLedgerStore::new(backend);
//! # }
//! ```

use ::redis::aio::MultiplexedConnection;
use ::redis::{AsyncCommands, Script};
use async_trait::async_trait;

use crate::store::backend::{StorageBackend, StorageError};

/// Drain: read the whole list and delete it in one isolated script.
///
/// KEYS[1] = collection list key.
/// Returns: the list contents (possibly empty).
const LUA_DRAIN: &str = r"
local items = redis.call('LRANGE', KEYS[1], 0, -1)
redis.call('DEL', KEYS[1])
return items
";

/// Redis storage backend for the dispatch ledgers.
///
/// Stores each collection as a Redis list of serialized record blobs. The
/// drain operation runs as a Lua script so read-and-clear is atomic with
/// respect to concurrent appends.
///
/// # Connection Model
///
/// `RedisBackend` holds a [`MultiplexedConnection`], which is designed to be
/// cloned cheaply — all clones share the same underlying TCP connection.
/// Each method clones the connection for concurrent safety.
///
/// # Examples
///
/// ```rust,no_run
/// use listenpost_tasks::store::redis::RedisBackend;
///
/// # async fn example() {
/// // Connect to local Redis:
/// let backend = RedisBackend::new("redis://127.0.0.1:6379").await.unwrap();
///
/// // With custom prefix for isolation:
/// let backend = RedisBackend::new("redis://127.0.0.1:6379")
///     .await
///     .unwrap()
///     .with_prefix("listenpost-test");
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RedisBackend {
    conn: MultiplexedConnection,
    key_prefix: String,
}

impl RedisBackend {
    /// Creates a backend by connecting to Redis at the given URL.
    ///
    /// The URL format is `redis://[:<password>@]<host>:<port>[/<db>]`.
    /// Uses the default key prefix `"listenpost"`. Fails fast if the
    /// connection cannot be established.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if the Redis client cannot be
    /// created or the connection cannot be established.
    pub async fn new(url: &str) -> Result<Self, StorageError> {
        let client = ::redis::Client::open(url).map_err(|e| StorageError::Backend {
            message: format!("failed to create Redis client: {e}"),
            source: Some(Box::new(e)),
        })?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StorageError::Backend {
                message: format!("failed to connect to Redis: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            conn,
            key_prefix: "listenpost".to_string(),
        })
    }

    /// Creates a backend with a pre-built multiplexed connection.
    ///
    /// Useful when the caller manages connection lifecycle. Uses the
    /// default key prefix `"listenpost"`.
    pub fn with_connection(conn: MultiplexedConnection) -> Self {
        Self {
            conn,
            key_prefix: "listenpost".to_string(),
        }
    }

    /// Sets a custom key prefix (builder pattern).
    ///
    /// Useful for test isolation: each test run can use a unique prefix to
    /// avoid key collisions.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Constructs the Redis list key for a collection.
    fn collection_key(&self, collection: &str) -> String {
        format!("{}:{}", self.key_prefix, collection)
    }
}

fn redis_error(op: &str, err: ::redis::RedisError) -> StorageError {
    StorageError::Backend {
        message: format!("redis {op} failed: {err}"),
        source: Some(Box::new(err)),
    }
}

#[async_trait]
impl StorageBackend for RedisBackend {
    async fn append(&self, collection: &str, doc: &[u8]) -> Result<(), StorageError> {
        let key = self.collection_key(collection);
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .rpush(&key, doc)
            .await
            .map_err(|e| redis_error("RPUSH", e))?;
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Vec<u8>>, StorageError> {
        let key = self.collection_key(collection);
        let mut conn = self.conn.clone();
        let docs: Vec<Vec<u8>> = conn
            .lrange(&key, 0, -1)
            .await
            .map_err(|e| redis_error("LRANGE", e))?;
        Ok(docs)
    }

    async fn drain(&self, collection: &str) -> Result<Vec<Vec<u8>>, StorageError> {
        let key = self.collection_key(collection);
        let mut conn = self.conn.clone();
        let docs: Vec<Vec<u8>> = Script::new(LUA_DRAIN)
            .key(&key)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| redis_error("drain script", e))?;
        Ok(docs)
    }

    async fn count(&self, collection: &str) -> Result<usize, StorageError> {
        let key = self.collection_key(collection);
        let mut conn = self.conn.clone();
        let len: i64 = conn
            .llen(&key)
            .await
            .map_err(|e| redis_error("LLEN", e))?;
        Ok(usize::try_from(len).unwrap_or(0))
    }
}
