use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::dataset::{Dataset, DatasetRole, TradingDate};

/// The in-memory set of uploaded datasets, in upload order.
///
/// Computations borrow it immutably; only explicit user actions
/// (upload batch, delete one, delete all) mutate it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetCollection {
    datasets: Vec<Dataset>,
}

impl DatasetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_datasets(datasets: Vec<Dataset>) -> Self {
        Self { datasets }
    }

    /// Append every dataset of one upload batch at once.
    pub fn add_batch(&mut self, batch: Vec<Dataset>) {
        self.datasets.extend(batch);
    }

    /// Remove a dataset by id, returning it if it existed.
    pub fn remove(&mut self, id: Uuid) -> Option<Dataset> {
        let idx = self.datasets.iter().position(|d| d.id == id)?;
        Some(self.datasets.remove(idx))
    }

    pub fn clear(&mut self) {
        self.datasets.clear();
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.id == id)
    }

    #[must_use]
    pub fn all(&self) -> &[Dataset] {
        &self.datasets
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn by_role(&self, role: DatasetRole) -> impl Iterator<Item = &Dataset> {
        self.datasets.iter().filter(move |d| d.role == role)
    }

    /// The active roster: the first roster dataset in upload order.
    #[must_use]
    pub fn roster(&self) -> Option<&Dataset> {
        self.by_role(DatasetRole::Roster).next()
    }

    /// First dataset of `role` whose trading date key equals `key`.
    #[must_use]
    pub fn find_dated(&self, role: DatasetRole, key: &TradingDate) -> Option<&Dataset> {
        self.by_role(role)
            .find(|d| d.trading_date.as_ref() == Some(key))
    }

    /// Distinct trading date keys across the time-series roles, ascending.
    #[must_use]
    pub fn trading_dates(&self) -> Vec<TradingDate> {
        self.datasets
            .iter()
            .filter(|d| d.role.is_time_series())
            .filter_map(|d| d.trading_date.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Roles that have no dataset yet.
    #[must_use]
    pub fn missing_roles(&self) -> Vec<DatasetRole> {
        DatasetRole::ALL
            .into_iter()
            .filter(|role| self.by_role(*role).next().is_none())
            .collect()
    }

    /// True once every role has at least one dataset.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.missing_roles().is_empty()
    }

    /// Total rows across all datasets.
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.datasets.iter().map(|d| d.row_count).sum()
    }
}
