use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Row};

use crate::db::{connection::Database, helpers::parse_datetime, models::KvEntry};

fn row_to_kv_entry(row: &Row) -> Result<KvEntry> {
    let updated_at: String = row.get("updated_at")?;

    Ok(KvEntry {
        key: row.get("key")?,
        value: row.get("value")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    /// Get a single entry by key
    pub async fn get_kv_entry(&self, key: &str) -> Result<Option<KvEntry>> {
        let key = key.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT key, value, updated_at
                 FROM kv_entries
                 WHERE key = ?1",
            )?;

            let mut rows = stmt.query(params![key])?;
            let entry = match rows.next()? {
                Some(row) => Some(row_to_kv_entry(row)?),
                None => None,
            };
            Ok(entry)
        })
        .await
    }

    /// Insert or replace the value stored under `key`
    pub async fn put_kv_entry(&self, key: &str, value: String) -> Result<()> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO kv_entries (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("failed to write entry '{key}'"))?;
            Ok(())
        })
        .await
    }

    /// Delete the entry under `key`. Returns whether a row was removed.
    pub async fn delete_kv_entry(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.execute(move |conn| {
            let rows_affected = conn
                .execute("DELETE FROM kv_entries WHERE key = ?1", params![key])
                .with_context(|| format!("failed to delete entry '{key}'"))?;
            Ok(rows_affected > 0)
        })
        .await
    }
}
