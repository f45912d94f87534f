use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::models::collection::DatasetCollection;
use crate::models::dataset::TradingDate;
use crate::models::query::{DateRange, FlowMetric};
use crate::models::series::{SeriesMode, SeriesPoint};
use crate::services::identity;
use crate::services::metrics;

/// Generates chart-ready, date-aligned series for a selection of stocks.
///
/// The date axis is the union of trading dates of all in-range daily
/// datasets (any feed), so every selected stock gets a value on every date,
/// 0 where the chosen feed has no dataset or no row for it.
pub struct SeriesService;

impl SeriesService {
    pub fn new() -> Self {
        Self
    }

    /// Build one [`SeriesPoint`] per date, ascending.
    ///
    /// In [`SeriesMode::Cumulative`] each code carries its own running total,
    /// starting from zero on every call.
    pub fn build_series(
        &self,
        datasets: &DatasetCollection,
        selected_codes: &[String],
        range: &DateRange,
        metric: FlowMetric,
        mode: SeriesMode,
    ) -> Vec<SeriesPoint> {
        if selected_codes.is_empty() {
            return Vec::new();
        }

        let codes: BTreeSet<&str> = selected_codes.iter().map(String::as_str).collect();
        let dates = self.dates_in_range(datasets, range);

        let mut running: BTreeMap<&str, f64> = codes.iter().map(|c| (*c, 0.0)).collect();
        let mut series = Vec::with_capacity(dates.len());

        for date in dates {
            let index = datasets
                .find_dated(metric.role(), &date)
                .map(identity::index_by_code);

            let mut values = BTreeMap::new();
            for code in &codes {
                let row = index.as_ref().and_then(|idx| idx.get(*code).copied());
                let daily = metrics::trade_value_of(row);
                let value = match mode {
                    SeriesMode::Daily => daily,
                    SeriesMode::Cumulative => {
                        let total = running.entry(*code).or_insert(0.0);
                        *total += daily;
                        *total
                    }
                };
                values.insert((*code).to_string(), value);
            }

            series.push(SeriesPoint {
                calendar_date: date.to_naive_date(),
                date,
                values,
            });
        }

        debug!(
            codes = codes.len(),
            points = series.len(),
            metric = %metric.role(),
            ?mode,
            "built series"
        );
        series
    }

    /// Distinct trading dates of in-range daily datasets, sorted ascending.
    /// Zero-padded `YYMMDD` keys sort correctly as text.
    pub fn dates_in_range(&self, datasets: &DatasetCollection, range: &DateRange) -> Vec<TradingDate> {
        datasets
            .all()
            .iter()
            .filter(|d| d.role.is_time_series())
            .filter_map(|d| d.trading_date.as_ref())
            .filter(|key| range.contains(key))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl Default for SeriesService {
    fn default() -> Self {
        Self::new()
    }
}
