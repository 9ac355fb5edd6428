use anyhow::Result;
use async_trait::async_trait;

use super::types::{OfflineRecord, SyncOutcome};
use crate::log_debug;

const ENABLE_LOGS: bool = true;

/// Capability the offline store uses to reach the hosted database.
///
/// Transport, authentication and conflict resolution belong to the
/// implementation. A returned error leaves every record queued.
#[async_trait]
pub trait RemoteSynchronizer: Send + Sync {
    /// Sync is skipped entirely while this reports `false`.
    async fn is_online(&self) -> bool {
        true
    }

    async fn push(&self, records: &[OfflineRecord]) -> Result<SyncOutcome>;

    fn name(&self) -> &'static str;
}

/// Default synchronizer: no remote is configured, so nothing is sent and
/// records stay queued.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSynchronizer;

#[async_trait]
impl RemoteSynchronizer for NoopSynchronizer {
    async fn push(&self, records: &[OfflineRecord]) -> Result<SyncOutcome> {
        log_debug!(
            "No remote synchronizer configured; deferring {} record(s)",
            records.len()
        );
        Ok(SyncOutcome::Deferred)
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
