use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One answer (or any other payload) queued while the app is offline.
///
/// Serialized as a two-element array `[key, value]`, which is the layout the
/// namespaced storage entry holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(String, Value)", into = "(String, Value)")]
pub struct OfflineRecord {
    pub key: String,
    pub value: Value,
}

impl OfflineRecord {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

impl From<(String, Value)> for OfflineRecord {
    fn from((key, value): (String, Value)) -> Self {
        Self { key, value }
    }
}

impl From<OfflineRecord> for (String, Value) {
    fn from(record: OfflineRecord) -> Self {
        (record.key, record.value)
    }
}

/// What `store_offline_data` does when the key is already present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DuplicateKeyPolicy {
    /// Keep every write; the collection grows by one pair per call.
    #[default]
    Append,
    /// Drop earlier pairs with the same key before appending.
    ReplaceExisting,
}

impl DuplicateKeyPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateKeyPolicy::Append => "append",
            DuplicateKeyPolicy::ReplaceExisting => "replace",
        }
    }
}

impl fmt::Display for DuplicateKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DuplicateKeyPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "append" => Ok(DuplicateKeyPolicy::Append),
            "replace" | "replaceExisting" => Ok(DuplicateKeyPolicy::ReplaceExisting),
            other => Err(format!(
                "unknown duplicate key policy '{other}' (expected 'append' or 'replace')"
            )),
        }
    }
}

/// Result of handing the stored records to a `RemoteSynchronizer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The remote side accepted every record.
    Accepted,
    /// Nothing was transferred; records stay queued.
    Deferred,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub attempted: usize,
    pub pushed: usize,
    pub cleared: usize,
    pub skipped_offline: bool,
}

impl SyncReport {
    pub fn offline() -> Self {
        Self {
            skipped_offline: true,
            ..Self::default()
        }
    }
}
