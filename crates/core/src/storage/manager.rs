use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::models::dataset::Dataset;
use crate::models::settings::Settings;

use super::format;

/// Everything that survives a restart: the uploaded datasets and the settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub datasets: Vec<Dataset>,
    pub settings: Settings,
}

impl Snapshot {
    /// Replace the dataset with the same id in place, or append it.
    pub fn upsert(&mut self, dataset: Dataset) {
        match self.datasets.iter_mut().find(|d| d.id == dataset.id) {
            Some(slot) => *slot = dataset,
            None => self.datasets.push(dataset),
        }
    }
}

/// High-level storage operations: snapshot to/from bytes or files.
pub struct StorageManager;

impl StorageManager {
    /// Flow: Snapshot → bincode → SKIN format bytes
    pub fn save_to_bytes(snapshot: &Snapshot) -> Result<Vec<u8>, CoreError> {
        let payload = bincode::serialize(snapshot)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize snapshot: {e}")))?;
        Ok(format::write_file(format::CURRENT_VERSION, &payload))
    }

    /// Flow: SKIN bytes → parse header → bincode → Snapshot
    pub fn load_from_bytes(data: &[u8]) -> Result<Snapshot, CoreError> {
        let (_header, payload) = format::read_file(data)?;
        bincode::deserialize(payload)
            .map_err(|e| CoreError::Deserialization(format!("Failed to deserialize snapshot: {e}")))
    }

    /// Write a snapshot to disk via a temporary file and rename (native only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_file(snapshot: &Snapshot, path: &std::path::Path) -> Result<(), CoreError> {
        let bytes = Self::save_to_bytes(snapshot)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read a snapshot from disk. A missing file is an empty snapshot (native only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_file(path: &std::path::Path) -> Result<Snapshot, CoreError> {
        match std::fs::read(path) {
            Ok(bytes) => Self::load_from_bytes(&bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Snapshot::default()),
            Err(e) => Err(e.into()),
        }
    }
}
