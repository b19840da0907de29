//! # Key-Value Store Trait
//!
//! The seam between the session manager and durable storage.
//!
//! Reading a key that was never written is `Ok(None)`, not an error:
//! absence is the normal state before the first login.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreResult;

/// Well-known keys. Only the session manager writes them.
pub mod keys {
    /// Opaque bearer token.
    pub const TOKEN: &str = "token";
    /// JSON-serialized user record.
    pub const USER: &str = "user";

    /// Both session keys, in the order they are written.
    pub const SESSION: [&str; 2] = [TOKEN, USER];
}

/// Async string key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a key. `Ok(None)` when absent.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Writes a single key, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Writes several keys atomically: either all are stored or none is.
    async fn set_many(&self, entries: &[(&str, &str)]) -> StoreResult<()>;

    /// Removes a key. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Removes several keys.
    async fn delete_many(&self, keys: &[&str]) -> StoreResult<()>;
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set(key, value).await
    }

    async fn set_many(&self, entries: &[(&str, &str)]) -> StoreResult<()> {
        (**self).set_many(entries).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key).await
    }

    async fn delete_many(&self, keys: &[&str]) -> StoreResult<()> {
        (**self).delete_many(keys).await
    }
}
