use tracing::{debug, info};

use crate::models::dataset::{Dataset, DatasetRole, DecodedSheet};
use crate::models::settings::Settings;
use crate::services::identity;

/// Turns decoded spreadsheets into role-tagged, dated datasets.
///
/// Pure: the decoding itself happens outside the core.
pub struct IngestService {
    settings: Settings,
}

impl IngestService {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Classify one sheet. `slot` is the role of the upload slot it was dropped
    /// on; a recognised file-name prefix overrides it.
    pub fn ingest(&self, sheet: DecodedSheet, slot: DatasetRole) -> Dataset {
        let role = identity::infer_role(&sheet.file_name, slot, &self.settings);
        let trading_date = identity::extract_trading_date(&sheet.file_name);

        if role != slot {
            debug!(
                file = %sheet.file_name,
                %slot,
                %role,
                "file-name prefix overrides upload slot"
            );
        }
        if role.is_time_series() && trading_date.is_none() {
            debug!(file = %sheet.file_name, %role, "no trading date in file name");
        }

        Dataset::new(role, sheet.file_name, trading_date, sheet.rows)
    }

    /// Classify a whole multi-file upload. The result is meant to be added to
    /// the collection in one step.
    pub fn ingest_batch(&self, sheets: Vec<DecodedSheet>, slot: DatasetRole) -> Vec<Dataset> {
        let batch: Vec<Dataset> = sheets
            .into_iter()
            .map(|sheet| self.ingest(sheet, slot))
            .collect();
        info!(
            files = batch.len(),
            rows = batch.iter().map(|d| d.row_count).sum::<usize>(),
            %slot,
            "ingested upload batch"
        );
        batch
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl Default for IngestService {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
