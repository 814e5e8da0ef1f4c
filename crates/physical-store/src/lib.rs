//! # Physical Token Store
//!
//! Persistent ledger of issued refresh tokens for the Physical API.
//!
//! ## Overview
//!
//! Refresh tokens are opaque random strings handed to the client exactly
//! once. The ledger never sees the raw token: it stores the SHA-256 digest
//! of the token together with the subject it was issued for. Presenting a
//! refresh token consumes its record, so a token can be exchanged at most
//! once.
//!
//! ## Backends
//!
//! - `memory` (default): [`MemoryTokenStore`], a process-local map for tests
//!   and single-instance deployments
//! - `redis`: [`RedisTokenStore`], backed by `SET` / `GETDEL`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use physical_store::{MemoryTokenStore, RefreshTokenRecord, RefreshTokenStore, TokenHash};
//!
//! async fn example() -> physical_store::StoreResult<()> {
//!     let store = MemoryTokenStore::new();
//!     let hash = TokenHash::of("3f9c0d...");
//!     store.put(RefreshTokenRecord::new(hash.clone(), "user-42")).await?;
//!
//!     // First exchange wins, any later one sees `None`.
//!     assert!(store.take(&hash).await?.is_some());
//!     assert!(store.take(&hash).await?.is_none());
//!     Ok(())
//! }
//! ```

pub mod record;
pub mod store;

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "redis")]
pub mod redis;

pub use record::{RefreshTokenRecord, TokenHash};
pub use store::{RefreshTokenStore, StoreError, StoreResult};

#[cfg(feature = "memory")]
pub use memory::MemoryTokenStore;

#[cfg(feature = "redis")]
pub use crate::redis::RedisTokenStore;
