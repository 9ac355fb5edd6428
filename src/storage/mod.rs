//! Persistent key-value store adapters.
//!
//! `KeyValueStore` mirrors the browser storage surface the offline layer was
//! written against: string values addressed by string keys, whole-value
//! reads and writes, no partial updates.

mod memory;
mod sqlite;

pub use memory::MemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns `Ok(None)` when nothing is stored under `key`.
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    async fn set_item(&self, key: &str, value: String) -> Result<()>;

    /// Removing a missing key is not an error.
    async fn remove_item(&self, key: &str) -> Result<()>;

    /// Backend name for log lines.
    fn name(&self) -> &'static str;
}
