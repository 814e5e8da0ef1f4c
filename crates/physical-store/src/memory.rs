//! In-memory refresh-token store.

use crate::record::{RefreshTokenRecord, TokenHash};
use crate::store::{RefreshTokenStore, StoreResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Process-local refresh-token store.
///
/// Suitable for tests and single-instance deployments. Records do not
/// survive a restart; use the Redis backend when several instances share a
/// ledger.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    records: Arc<RwLock<HashMap<TokenHash, String>>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of outstanding refresh tokens.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether no refresh tokens are outstanding.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryTokenStore {
    async fn put(&self, record: RefreshTokenRecord) -> StoreResult<()> {
        let mut records = self.records.write().await;
        records.insert(record.token_hash, record.subject);
        Ok(())
    }

    async fn get(&self, hash: &TokenHash) -> StoreResult<Option<RefreshTokenRecord>> {
        let records = self.records.read().await;
        Ok(records
            .get(hash)
            .map(|subject| RefreshTokenRecord::new(hash.clone(), subject.clone())))
    }

    async fn take(&self, hash: &TokenHash) -> StoreResult<Option<RefreshTokenRecord>> {
        // Lookup and removal happen under one write guard.
        let mut records = self.records.write().await;
        let taken = records.remove(hash);
        debug!(token = hash.short(), found = taken.is_some(), "Took refresh token record");
        Ok(taken.map(|subject| RefreshTokenRecord::new(hash.clone(), subject)))
    }

    async fn delete(&self, hash: &TokenHash) -> StoreResult<()> {
        self.records.write().await.remove(hash);
        Ok(())
    }
}
