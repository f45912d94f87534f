use async_trait::async_trait;
use std::sync::RwLock;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::dataset::Dataset;
use crate::models::settings::Settings;

use super::manager::Snapshot;

/// Persistence collaborator for the dataset collection, keyed by dataset id.
///
/// The core never depends on these calls succeeding: in-memory state is the
/// source of truth for every computation.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait DatasetRepository: Send + Sync {
    /// Every stored dataset, in insertion order.
    async fn load_all(&self) -> Result<Vec<Dataset>, CoreError>;

    /// Insert or replace a dataset by id.
    async fn upsert(&self, dataset: &Dataset) -> Result<(), CoreError>;

    /// Remove a dataset by id. Unknown ids are not an error.
    async fn delete(&self, id: Uuid) -> Result<(), CoreError>;

    /// Remove every dataset. Settings are kept.
    async fn delete_all(&self) -> Result<(), CoreError>;

    /// Stored settings, if any were ever saved.
    async fn load_settings(&self) -> Result<Option<Settings>, CoreError>;

    async fn save_settings(&self, settings: &Settings) -> Result<(), CoreError>;
}

/// In-process repository, useful for tests and embedding without storage.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: RwLock<(Snapshot, bool)>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Snapshot, bool) -> T) -> Result<T, CoreError> {
        let guard = self
            .state
            .read()
            .map_err(|_| CoreError::Persistence("memory repository lock poisoned".into()))?;
        Ok(f(&guard.0, guard.1))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Snapshot, &mut bool) -> T) -> Result<T, CoreError> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| CoreError::Persistence("memory repository lock poisoned".into()))?;
        let (snapshot, settings_saved) = &mut *guard;
        Ok(f(snapshot, settings_saved))
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl DatasetRepository for MemoryRepository {
    async fn load_all(&self) -> Result<Vec<Dataset>, CoreError> {
        self.read(|snapshot, _| snapshot.datasets.clone())
    }

    async fn upsert(&self, dataset: &Dataset) -> Result<(), CoreError> {
        self.write(|snapshot, _| snapshot.upsert(dataset.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<(), CoreError> {
        self.write(|snapshot, _| snapshot.datasets.retain(|d| d.id != id))
    }

    async fn delete_all(&self) -> Result<(), CoreError> {
        self.write(|snapshot, _| snapshot.datasets.clear())
    }

    async fn load_settings(&self) -> Result<Option<Settings>, CoreError> {
        self.read(|snapshot, saved| saved.then(|| snapshot.settings.clone()))
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), CoreError> {
        self.write(|snapshot, saved| {
            snapshot.settings = settings.clone();
            *saved = true;
        })
    }
}
