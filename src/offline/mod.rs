mod service;
mod sync;
mod types;

pub use service::{OfflineDataService, DEFAULT_STORAGE_KEY};
pub use sync::{NoopSynchronizer, RemoteSynchronizer};
pub use types::{DuplicateKeyPolicy, OfflineRecord, SyncOutcome, SyncReport};
