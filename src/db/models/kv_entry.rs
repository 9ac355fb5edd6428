//! Raw key-value rows.
//!
//! The value column is opaque text; callers decide how it is encoded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KvEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}
