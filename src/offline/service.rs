use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use super::{
    sync::{NoopSynchronizer, RemoteSynchronizer},
    types::{DuplicateKeyPolicy, OfflineRecord, SyncOutcome, SyncReport},
};
use crate::{
    error::{ServiceError, ServiceResult},
    log_info, log_warn,
    settings::ServiceSettings,
    storage::KeyValueStore,
};

const ENABLE_LOGS: bool = true;

pub const DEFAULT_STORAGE_KEY: &str = "practice_assessment_offline_data";

/// Queue of answers captured while offline.
///
/// The whole collection lives in a single namespaced entry of the backing
/// store and is rewritten on every mutation. Reads are best-effort: a
/// missing, failing or corrupt entry reads as an empty collection.
pub struct OfflineDataService {
    store: Arc<dyn KeyValueStore>,
    synchronizer: Arc<dyn RemoteSynchronizer>,
    storage_key: String,
    policy: DuplicateKeyPolicy,
    clear_after_sync: bool,
    // Held across each read-modify-write of the entry, and for the whole of a sync.
    write_lock: Mutex<()>,
}

impl OfflineDataService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            synchronizer: Arc::new(NoopSynchronizer),
            storage_key: DEFAULT_STORAGE_KEY.into(),
            policy: DuplicateKeyPolicy::default(),
            clear_after_sync: false,
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_settings(store: Arc<dyn KeyValueStore>, settings: &ServiceSettings) -> Self {
        Self::new(store)
            .with_storage_key(settings.storage_key.clone())
            .with_duplicate_key_policy(settings.duplicate_key_policy)
            .with_clear_after_sync(settings.clear_after_sync)
    }

    pub fn with_synchronizer(mut self, synchronizer: Arc<dyn RemoteSynchronizer>) -> Self {
        self.synchronizer = synchronizer;
        self
    }

    pub fn with_storage_key(mut self, storage_key: impl Into<String>) -> Self {
        self.storage_key = storage_key.into();
        self
    }

    pub fn with_duplicate_key_policy(mut self, policy: DuplicateKeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clear_after_sync(mut self, clear_after_sync: bool) -> Self {
        self.clear_after_sync = clear_after_sync;
        self
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn duplicate_key_policy(&self) -> DuplicateKeyPolicy {
        self.policy
    }

    pub fn synchronizer_name(&self) -> &'static str {
        self.synchronizer.name()
    }

    /// Appends `(key, data)` and rewrites the stored collection.
    pub async fn store_offline_data(
        &self,
        key: impl Into<String>,
        data: Value,
    ) -> ServiceResult<()> {
        let key = key.into();
        let _guard = self.write_lock.lock().await;

        let mut records = self.load_records().await;
        if self.policy == DuplicateKeyPolicy::ReplaceExisting {
            records.retain(|record| record.key != key);
        }
        records.push(OfflineRecord::new(key, data));

        self.persist_records(&records).await
    }

    /// Value of the most recent pair stored under `key`.
    pub async fn get_offline_data(&self, key: &str) -> Option<Value> {
        self.load_records()
            .await
            .into_iter()
            .rev()
            .find(|record| record.key == key)
            .map(|record| record.value)
    }

    pub async fn get_all_offline_data(&self) -> Vec<OfflineRecord> {
        self.load_records().await
    }

    /// Drops every pair stored under `key`. Missing keys are a no-op.
    pub async fn remove_offline_data(&self, key: &str) -> ServiceResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load_records().await;
        let before = records.len();
        records.retain(|record| record.key != key);
        if records.len() == before {
            return Ok(());
        }

        self.persist_records(&records).await
    }

    /// Deletes the namespaced entry itself.
    pub async fn clear_offline_data(&self) -> ServiceResult<()> {
        let _guard = self.write_lock.lock().await;
        self.store
            .remove_item(&self.storage_key)
            .await
            .map_err(ServiceError::storage)
    }

    /// Strict read of the stored collection. Unlike every other read, backend
    /// and decode failures are returned instead of reading as empty.
    pub async fn check_storage(&self) -> ServiceResult<usize> {
        Ok(self.read_records().await?.len())
    }

    pub async fn pending_count(&self) -> usize {
        self.load_records().await.len()
    }

    /// Distinct keys in first-seen order.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for record in self.load_records().await {
            if !keys.contains(&record.key) {
                keys.push(record.key);
            }
        }
        keys
    }

    /// Hands the queued records to the configured `RemoteSynchronizer`.
    ///
    /// Writes issued while a sync is in flight wait for it to finish, so a
    /// clear after an accepted push only ever removes what was pushed.
    pub async fn sync_offline_data(&self) -> ServiceResult<SyncReport> {
        let _guard = self.write_lock.lock().await;

        if !self.synchronizer.is_online().await {
            log_info!(
                "Skipping offline sync: {} synchronizer reports offline",
                self.synchronizer.name()
            );
            return Ok(SyncReport::offline());
        }

        let records = self.load_records().await;
        let mut report = SyncReport {
            attempted: records.len(),
            ..SyncReport::default()
        };
        if records.is_empty() {
            return Ok(report);
        }

        let outcome = self.synchronizer.push(&records).await.map_err(|err| {
            log_warn!(
                "Offline sync via {} failed: {err:#}",
                self.synchronizer.name()
            );
            ServiceError::Sync(format!("{err:#}"))
        })?;

        if outcome == SyncOutcome::Accepted {
            report.pushed = records.len();
            if self.clear_after_sync {
                self.store
                    .remove_item(&self.storage_key)
                    .await
                    .map_err(ServiceError::storage)?;
                report.cleared = records.len();
            }
        }

        log_info!(
            "Offline sync via {}: attempted={} pushed={} cleared={}",
            self.synchronizer.name(),
            report.attempted,
            report.pushed,
            report.cleared
        );

        Ok(report)
    }

    async fn read_records(&self) -> ServiceResult<Vec<OfflineRecord>> {
        let raw = match self
            .store
            .get_item(&self.storage_key)
            .await
            .map_err(ServiceError::storage)?
        {
            Some(raw) => raw,
            None => return Ok(Vec::new()),
        };

        serde_json::from_str(&raw).map_err(|err| {
            ServiceError::MalformedStoredData(format!("entry '{}': {err}", self.storage_key))
        })
    }

    async fn load_records(&self) -> Vec<OfflineRecord> {
        match self.read_records().await {
            Ok(records) => records,
            Err(err) => {
                log_warn!(
                    "Offline data in {} store unreadable, treating as empty: {err}",
                    self.store.name()
                );
                Vec::new()
            }
        }
    }

    async fn persist_records(&self, records: &[OfflineRecord]) -> ServiceResult<()> {
        let serialized = serde_json::to_string(records)?;
        self.store
            .set_item(&self.storage_key, serialized)
            .await
            .map_err(|err| {
                log_warn!(
                    "Failed to persist {} offline record(s) to {}: {err:#}",
                    records.len(),
                    self.store.name()
                );
                ServiceError::storage(err)
            })
    }
}
