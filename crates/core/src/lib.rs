pub mod errors;
pub mod logging;
pub mod models;
pub mod services;
pub mod storage;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use errors::CoreError;
use models::{
    collection::DatasetCollection,
    dataset::{Dataset, DatasetRole, DecodedSheet, TradingDate},
    query::{AnalysisParams, DateRange, FlowMetric},
    series::{SeriesMode, SeriesPoint},
    settings::Settings,
    stock_row::StockRow,
};
use services::{
    export_service::ExportService, identity, ingest_service::IngestService,
    pipeline_service::PipelineService, reconcile_service::ReconcileService,
    series_service::SeriesService,
};
use storage::manager::Snapshot;
use storage::repository::DatasetRepository;

/// Result of a user action that changed in-memory state and then tried to
/// persist it.
///
/// The in-memory change always stands; `persistence_error` tells the caller
/// whether storage may now lag behind.
#[derive(Debug)]
#[must_use]
pub struct SyncOutcome<T> {
    pub value: T,
    pub persistence_error: Option<CoreError>,
}

impl<T> SyncOutcome<T> {
    fn new(value: T, persistence_error: Option<CoreError>) -> Self {
        Self {
            value,
            persistence_error,
        }
    }

    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.persistence_error.is_none()
    }
}

/// Main entry point for the StockInsight core library.
/// Holds the uploaded datasets and settings plus the services that derive
/// dashboard tables and chart series from them.
#[must_use]
pub struct StockInsight {
    datasets: DatasetCollection,
    settings: Settings,
    ingest_service: IngestService,
    reconcile_service: ReconcileService,
    series_service: SeriesService,
    pipeline_service: PipelineService,
    /// Tracks in-memory changes not yet confirmed persisted.
    dirty: bool,
}

impl std::fmt::Debug for StockInsight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockInsight")
            .field("datasets", &self.datasets.len())
            .field("rows", &self.datasets.total_rows())
            .field("settings", &self.settings)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl StockInsight {
    /// Empty session with default settings.
    pub fn create_new() -> Self {
        Self::build(DatasetCollection::new(), Settings::default())
    }

    /// Empty session with custom settings.
    pub fn with_settings(settings: Settings) -> Result<Self, CoreError> {
        settings.validate()?;
        Ok(Self::build(DatasetCollection::new(), settings))
    }

    /// Restore a session from a stored snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self::build(
            DatasetCollection::from_datasets(snapshot.datasets),
            snapshot.settings,
        )
    }

    /// Restore a session from a repository.
    pub async fn load(repo: &dyn DatasetRepository) -> Result<Self, CoreError> {
        let datasets = repo.load_all().await?;
        let settings = repo.load_settings().await?.unwrap_or_default();
        info!(datasets = datasets.len(), "loaded datasets from repository");
        Ok(Self::build(DatasetCollection::from_datasets(datasets), settings))
    }

    /// Copy of the persistable state.
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            datasets: self.datasets.all().to_vec(),
            settings: self.settings.clone(),
        }
    }

    // ── Dataset Management ──────────────────────────────────────────

    /// Ingest a batch of decoded sheets dropped on the `slot` upload slot.
    /// All datasets become visible together. Returns their ids.
    pub fn add_sheets(&mut self, sheets: Vec<DecodedSheet>, slot: DatasetRole) -> Vec<Uuid> {
        let batch = self.ingest_service.ingest_batch(sheets, slot);
        let ids = batch.iter().map(|d| d.id).collect();
        self.datasets.add_batch(batch);
        self.dirty = true;
        ids
    }

    /// [`add_sheets`](Self::add_sheets), then store every new dataset.
    /// Stops at the first storage failure; the datasets stay in memory regardless.
    pub async fn upload_batch(
        &mut self,
        repo: &dyn DatasetRepository,
        sheets: Vec<DecodedSheet>,
        slot: DatasetRole,
    ) -> SyncOutcome<Vec<Uuid>> {
        let was_synced = !self.dirty;
        let ids = self.add_sheets(sheets, slot);
        let mut error = None;
        for id in &ids {
            if let Some(dataset) = self.datasets.get(*id) {
                if let Err(e) = repo.upsert(dataset).await {
                    warn!(dataset = %dataset.name, error = %e, "failed to persist uploaded dataset");
                    error = Some(e);
                    break;
                }
            }
        }
        self.mark_synced(was_synced && error.is_none());
        SyncOutcome::new(ids, error)
    }

    /// Remove one dataset from memory.
    pub fn remove_dataset(&mut self, id: Uuid) -> Result<Dataset, CoreError> {
        let removed = self
            .datasets
            .remove(id)
            .ok_or_else(|| CoreError::DatasetNotFound(id.to_string()))?;
        self.dirty = true;
        Ok(removed)
    }

    /// [`remove_dataset`](Self::remove_dataset), then delete it from storage.
    pub async fn delete_dataset(
        &mut self,
        repo: &dyn DatasetRepository,
        id: Uuid,
    ) -> Result<SyncOutcome<Dataset>, CoreError> {
        let was_synced = !self.dirty;
        let removed = self.remove_dataset(id)?;
        let error = repo.delete(id).await.err();
        if let Some(e) = &error {
            warn!(dataset = %removed.name, error = %e, "failed to delete dataset from storage");
        }
        self.mark_synced(was_synced && error.is_none());
        Ok(SyncOutcome::new(removed, error))
    }

    /// Drop every dataset from memory.
    pub fn clear(&mut self) {
        if !self.datasets.is_empty() {
            self.datasets.clear();
            self.dirty = true;
        }
    }

    /// [`clear`](Self::clear), then clear storage.
    pub async fn clear_all(&mut self, repo: &dyn DatasetRepository) -> SyncOutcome<()> {
        let was_synced = !self.dirty;
        self.datasets.clear();
        self.dirty = true;
        let error = repo.delete_all().await.err();
        if let Some(e) = &error {
            warn!(error = %e, "failed to clear storage");
        }
        self.mark_synced(was_synced && error.is_none());
        SyncOutcome::new((), error)
    }

    /// Make `repo` match memory: upsert every dataset, then delete stored
    /// datasets no longer held in memory, then save settings.
    ///
    /// Stored datasets are only deleted once every upsert succeeded, so a
    /// failure part-way never leaves storage with less than it had. Clears
    /// the unsaved-changes flag on success.
    pub async fn save_all(&mut self, repo: &dyn DatasetRepository) -> Result<(), CoreError> {
        for dataset in self.datasets.all() {
            repo.upsert(dataset).await?;
        }
        let stale: Vec<Uuid> = repo
            .load_all()
            .await?
            .into_iter()
            .map(|d| d.id)
            .filter(|id| self.datasets.get(*id).is_none())
            .collect();
        for id in &stale {
            repo.delete(*id).await?;
        }
        repo.save_settings(&self.settings).await?;
        info!(
            datasets = self.datasets.len(),
            removed = stale.len(),
            "storage resynchronized"
        );
        self.dirty = false;
        Ok(())
    }

    #[must_use]
    pub fn datasets(&self) -> &DatasetCollection {
        &self.datasets
    }

    #[must_use]
    pub fn get_dataset(&self, id: Uuid) -> Option<&Dataset> {
        self.datasets.get(id)
    }

    /// Every role has at least one dataset, so the dashboard can open.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.datasets.is_ready()
    }

    #[must_use]
    pub fn missing_roles(&self) -> Vec<DatasetRole> {
        self.datasets.missing_roles()
    }

    /// Distinct trading dates across all daily datasets, ascending.
    #[must_use]
    pub fn trading_dates(&self) -> Vec<TradingDate> {
        self.datasets.trading_dates()
    }

    /// `(code, name)` of every roster stock, in roster order, for chart selection.
    #[must_use]
    pub fn stock_choices(&self) -> Vec<(String, String)> {
        self.datasets
            .roster()
            .map(|roster| {
                roster
                    .rows
                    .iter()
                    .filter_map(|row| {
                        identity::stock_code(row).map(|code| (code, identity::stock_name(row)))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    // ── Settings ────────────────────────────────────────────────────

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace settings. Affects how later uploads are classified; existing
    /// datasets keep their role.
    pub fn set_settings(&mut self, settings: Settings) -> Result<(), CoreError> {
        settings.validate()?;
        self.ingest_service = IngestService::new(settings.clone());
        self.settings = settings;
        self.dirty = true;
        Ok(())
    }

    /// Parameter bundle seeded from settings.
    pub fn default_params(&self) -> AnalysisParams {
        AnalysisParams::from_settings(&self.settings)
    }

    // ── Analysis ────────────────────────────────────────────────────

    /// One reconciled row per roster stock, in roster order, unfiltered.
    #[must_use]
    pub fn reconcile(&self, params: &AnalysisParams) -> Vec<StockRow> {
        self.reconcile_service.reconcile(
            &self.datasets,
            &params.range,
            &params.specific_date,
            params.metric,
        )
    }

    /// Reconciled rows after the filters and ordering in `params`.
    #[must_use]
    pub fn snapshot_table(&self, params: &AnalysisParams) -> Vec<StockRow> {
        let rows = self.reconcile(params);
        self.pipeline_service.apply(&rows, &params.filters, &params.sort)
    }

    /// Date-aligned chart series for the selected stock codes.
    #[must_use]
    pub fn build_series(
        &self,
        selected_codes: &[String],
        range: &DateRange,
        metric: FlowMetric,
        mode: SeriesMode,
    ) -> Vec<SeriesPoint> {
        self.series_service
            .build_series(&self.datasets, selected_codes, range, metric, mode)
    }

    // ── Export ──────────────────────────────────────────────────────

    /// The filtered, sorted table as CSV.
    #[must_use]
    pub fn export_csv(&self, params: &AnalysisParams) -> String {
        ExportService::to_csv(&self.snapshot_table(params))
    }

    /// The filtered, sorted table as JSON.
    pub fn export_json(&self, params: &AnalysisParams) -> Result<String, CoreError> {
        ExportService::to_json(&self.snapshot_table(params))
    }

    /// Suggested download name for an export made today.
    #[must_use]
    pub fn export_file_name(&self) -> String {
        ExportService::default_file_name(Utc::now().date_naive())
    }

    // ── Dirty State ─────────────────────────────────────────────────

    /// Returns `true` if memory holds changes storage has not confirmed.
    ///
    /// Once set, only [`save_all`](Self::save_all) clears it: a later
    /// incremental sync that succeeds says nothing about earlier failures.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    /// Incremental syncs keep memory and storage aligned only if they started
    /// aligned and every storage call succeeded.
    fn mark_synced(&mut self, in_sync: bool) {
        self.dirty = !in_sync;
    }

    fn build(datasets: DatasetCollection, settings: Settings) -> Self {
        Self {
            datasets,
            ingest_service: IngestService::new(settings.clone()),
            settings,
            reconcile_service: ReconcileService::new(),
            series_service: SeriesService::new(),
            pipeline_service: PipelineService::new(),
            dirty: false,
        }
    }
}
