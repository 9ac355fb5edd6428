use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::offline::{DuplicateKeyPolicy, DEFAULT_STORAGE_KEY};

/// Overrides `database_path` when set.
pub const DATABASE_PATH_ENV: &str = "ASSESSMENT_SYNC_DB";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceSettings {
    pub database_path: PathBuf,
    pub storage_key: String,
    pub duplicate_key_policy: DuplicateKeyPolicy,
    pub clear_after_sync: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("assessment-sync.sqlite3"),
            storage_key: DEFAULT_STORAGE_KEY.into(),
            duplicate_key_policy: DuplicateKeyPolicy::default(),
            clear_after_sync: false,
        }
    }
}

fn database_override_from_env() -> Option<PathBuf> {
    std::env::var(DATABASE_PATH_ENV)
        .ok()
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
}

/// Settings persisted as pretty JSON next to the database.
///
/// A missing or unreadable file yields defaults; the file is only written
/// on `update`. The `ASSESSMENT_SYNC_DB` override is applied to what
/// `current` returns and never written back.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<ServiceSettings>,
    database_override: Option<PathBuf>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        Self::load(path, database_override_from_env())
    }

    fn load(path: PathBuf, database_override: Option<PathBuf>) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring malformed settings file {}: {err}",
                    path.display()
                );
                ServiceSettings::default()
            })
        } else {
            ServiceSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
            database_override,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persisted settings with the environment override applied.
    pub fn current(&self) -> ServiceSettings {
        let mut settings = self.read().clone();
        if let Some(path) = &self.database_override {
            settings.database_path = path.clone();
        }
        settings
    }

    /// Persist `settings`. While an override is active, `database_path`
    /// keeps its persisted value.
    pub fn update(&self, mut settings: ServiceSettings) -> Result<()> {
        let mut guard = self.write();
        if self.database_override.is_some() {
            settings.database_path = guard.database_path.clone();
        }
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    fn persist(&self, data: &ServiceSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, ServiceSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, ServiceSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();

        let settings = store.current();
        assert_eq!(settings.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(settings.duplicate_key_policy, DuplicateKeyPolicy::Append);
        assert!(!settings.clear_after_sync);
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut settings = store.current();
        settings.duplicate_key_policy = DuplicateKeyPolicy::ReplaceExisting;
        settings.clear_after_sync = true;
        store.update(settings.clone()).unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        assert_eq!(
            reloaded.current().duplicate_key_policy,
            DuplicateKeyPolicy::ReplaceExisting
        );
        assert!(reloaded.current().clear_after_sync);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.current().storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn partial_file_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "clearAfterSync": true }"#).unwrap();

        let store = SettingsStore::new(path).unwrap();
        let settings = store.current();
        assert!(settings.clear_after_sync);
        assert_eq!(settings.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn database_override_is_applied_but_never_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let override_path = dir.path().join("override.sqlite3");
        let store = SettingsStore::load(path.clone(), Some(override_path.clone())).unwrap();

        let mut settings = store.current();
        assert_eq!(settings.database_path, override_path);
        settings.clear_after_sync = true;
        store.update(settings).unwrap();

        let on_disk: ServiceSettings =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.database_path, ServiceSettings::default().database_path);
        assert!(on_disk.clear_after_sync);
        assert_eq!(store.current().database_path, override_path);

        let without_override = SettingsStore::load(path, None).unwrap();
        assert_eq!(
            without_override.current().database_path,
            ServiceSettings::default().database_path
        );
        assert!(without_override.current().clear_after_sync);
    }
}
