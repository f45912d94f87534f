use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::dataset::Dataset;
use crate::models::settings::Settings;

use super::manager::{Snapshot, StorageManager};
use super::repository::DatasetRepository;

/// Repository backed by a single snapshot file on disk.
///
/// Every write reads the current snapshot, applies the change and rewrites
/// the file. A missing file behaves as an empty store.
#[derive(Debug)]
pub struct FileRepository {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn modify(&self, f: impl FnOnce(&mut Snapshot)) -> Result<(), CoreError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| CoreError::Persistence("file repository lock poisoned".into()))?;
        let mut snapshot = StorageManager::load_from_file(&self.path)?;
        f(&mut snapshot);
        StorageManager::save_to_file(&snapshot, &self.path)?;
        debug!(path = %self.path.display(), datasets = snapshot.datasets.len(), "snapshot written");
        Ok(())
    }

    fn has_file(&self) -> bool {
        self.path.exists()
    }
}

#[async_trait]
impl DatasetRepository for FileRepository {
    async fn load_all(&self) -> Result<Vec<Dataset>, CoreError> {
        Ok(StorageManager::load_from_file(&self.path)?.datasets)
    }

    async fn upsert(&self, dataset: &Dataset) -> Result<(), CoreError> {
        self.modify(|snapshot| snapshot.upsert(dataset.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<(), CoreError> {
        self.modify(|snapshot| snapshot.datasets.retain(|d| d.id != id))
    }

    async fn delete_all(&self) -> Result<(), CoreError> {
        self.modify(|snapshot| snapshot.datasets.clear())
    }

    async fn load_settings(&self) -> Result<Option<Settings>, CoreError> {
        if !self.has_file() {
            return Ok(None);
        }
        Ok(Some(StorageManager::load_from_file(&self.path)?.settings))
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), CoreError> {
        self.modify(|snapshot| snapshot.settings = settings.clone())
    }
}
