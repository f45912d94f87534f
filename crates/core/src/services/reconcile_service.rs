use std::collections::HashMap;

use tracing::debug;

use crate::models::collection::DatasetCollection;
use crate::models::dataset::{DatasetRole, TradingDate};
use crate::models::query::{DateRange, FlowMetric};
use crate::models::record::Record;
use crate::models::stock_row::StockRow;
use crate::services::identity;
use crate::services::metrics;

/// Joins the roster against the daily flow datasets.
///
/// Pure business logic: every lookup that finds nothing contributes 0,
/// so the only way to get no rows is to have no (or an empty) roster.
pub struct ReconcileService;

impl ReconcileService {
    pub fn new() -> Self {
        Self
    }

    /// One [`StockRow`] per roster row, in roster order.
    ///
    /// - `range_aggregate`: `metric`'s trade value summed over every dataset of
    ///   that feed dated inside `range` (inclusive)
    /// - `specific_institutional` / `specific_market`: institutional and
    ///   total-market trade value on `specific_date`
    pub fn reconcile(
        &self,
        datasets: &DatasetCollection,
        range: &DateRange,
        specific_date: &TradingDate,
        metric: FlowMetric,
    ) -> Vec<StockRow> {
        let Some(roster) = datasets.roster() else {
            debug!("no roster dataset, nothing to reconcile");
            return Vec::new();
        };

        // Build each code index once per computation, not once per stock
        let range_indexes: Vec<HashMap<String, &Record>> = datasets
            .by_role(metric.role())
            .filter(|d| d.trading_date.as_ref().is_some_and(|key| range.contains(key)))
            .map(identity::index_by_code)
            .collect();

        let institutional_on_date = datasets
            .find_dated(DatasetRole::InstitutionalFlow, specific_date)
            .map(identity::index_by_code);
        let market_on_date = datasets
            .find_dated(DatasetRole::MarketTotal, specific_date)
            .map(identity::index_by_code);

        debug!(
            roster = %roster.name,
            stocks = roster.rows.len(),
            in_range = range_indexes.len(),
            metric = %metric.role(),
            specific_date = %specific_date,
            institutional_found = institutional_on_date.is_some(),
            market_found = market_on_date.is_some(),
            "reconciling roster"
        );

        roster
            .rows
            .iter()
            .map(|stock| {
                let code = identity::stock_code(stock);
                let lookup = |index: &HashMap<String, &Record>| -> f64 {
                    let row = code.as_ref().and_then(|c| index.get(c).copied());
                    metrics::trade_value_of(row)
                };

                let range_aggregate = range_indexes.iter().map(lookup).sum();
                let specific_institutional = institutional_on_date.as_ref().map_or(0.0, lookup);
                let specific_market = market_on_date.as_ref().map_or(0.0, lookup);

                StockRow {
                    code: code.clone().unwrap_or_default(),
                    name: identity::stock_name(stock),
                    change_rate: metrics::change_rate_of(stock),
                    range_aggregate,
                    specific_institutional,
                    specific_market,
                }
            })
            .collect()
    }
}

impl Default for ReconcileService {
    fn default() -> Self {
        Self::new()
    }
}
