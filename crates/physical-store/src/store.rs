//! Refresh-token store abstraction.

use crate::record::{RefreshTokenRecord, TokenHash};
use async_trait::async_trait;
use thiserror::Error;

/// Token store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend could not be reached
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Backend rejected or failed the operation
    #[error("Backend error: {0}")]
    BackendError(String),

    /// Stored value could not be decoded
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

/// Result type for token store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent single-use ledger of refresh-token hashes.
///
/// Operations on distinct hashes never contend. Implementations must make
/// [`take`](RefreshTokenStore::take) a single atomic consume: of any number of
/// concurrent `take` calls for the same hash, at most one observes the
/// record.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Store a record, overwriting any record with the same hash.
    async fn put(&self, record: RefreshTokenRecord) -> StoreResult<()>;

    /// Look up a record without consuming it.
    async fn get(&self, hash: &TokenHash) -> StoreResult<Option<RefreshTokenRecord>>;

    /// Atomically remove a record and return it.
    ///
    /// Returns `None` if no record exists (never issued or already consumed).
    async fn take(&self, hash: &TokenHash) -> StoreResult<Option<RefreshTokenRecord>>;

    /// Remove a record. Deleting a missing record is not an error.
    async fn delete(&self, hash: &TokenHash) -> StoreResult<()>;
}
