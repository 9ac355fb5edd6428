use anyhow::Result;
use async_trait::async_trait;

use super::KeyValueStore;
use crate::db::Database;

/// `KeyValueStore` over the `kv_entries` table.
#[derive(Clone)]
pub struct SqliteKeyValueStore {
    db: Database,
}

impl SqliteKeyValueStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.db.get_kv_entry(key).await?.map(|entry| entry.value))
    }

    async fn set_item(&self, key: &str, value: String) -> Result<()> {
        self.db.put_kv_entry(key, value).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.db.delete_kv_entry(key).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
