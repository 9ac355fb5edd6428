pub mod db;
pub mod error;
pub mod offline;
pub mod settings;
pub mod storage;
pub mod tooltip_testing;
pub mod utils;

use std::sync::Arc;

use anyhow::Result;
use log::info;

pub use db::Database;
pub use error::{ServiceError, ServiceResult};
pub use offline::{
    DuplicateKeyPolicy, NoopSynchronizer, OfflineDataService, OfflineRecord, RemoteSynchronizer,
    SyncOutcome, SyncReport,
};
pub use settings::{ServiceSettings, SettingsStore};
pub use storage::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore};
pub use tooltip_testing::{
    AggregatedMetrics, FeedbackEntry, FeedbackSubmission, TestingExport, TooltipTestingService,
    UsabilityMetricSample,
};
pub use utils::init_logging;

/// Everything a front end needs, wired from one settings file.
pub struct AppState {
    pub db: Database,
    pub offline: OfflineDataService,
    pub testing: TooltipTestingService,
    pub settings: SettingsStore,
}

impl AppState {
    pub fn open(settings: SettingsStore) -> Result<Self> {
        Self::open_with_synchronizer(settings, Arc::new(NoopSynchronizer))
    }

    pub fn open_with_synchronizer(
        settings: SettingsStore,
        synchronizer: Arc<dyn RemoteSynchronizer>,
    ) -> Result<Self> {
        let current = settings.current();
        let db = Database::new(current.database_path.clone())?;

        let store = Arc::new(SqliteKeyValueStore::new(db.clone()));
        let offline =
            OfflineDataService::from_settings(store, &current).with_synchronizer(synchronizer);

        info!(
            "Offline store ready (key '{}', duplicate policy {}, synchronizer {})",
            current.storage_key,
            current.duplicate_key_policy,
            offline.synchronizer_name(),
        );

        Ok(Self {
            db,
            offline,
            testing: TooltipTestingService::new(),
            settings,
        })
    }
}
