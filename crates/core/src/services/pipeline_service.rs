use std::cmp::Ordering;

use tracing::debug;

use crate::models::query::{FilterSet, NumericField, SortKey, SortOrder, SortState};
use crate::models::stock_row::StockRow;

/// Range filters followed by a single-key ordering over reconciled rows.
pub struct PipelineService;

impl PipelineService {
    pub fn new() -> Self {
        Self
    }

    /// Filter, then sort. Without an active sort the filtered rows keep
    /// their incoming order; ties keep it too (the sort is stable).
    pub fn apply(&self, rows: &[StockRow], filters: &FilterSet, sort: &SortState) -> Vec<StockRow> {
        let mut result = self.filter(rows, filters);
        if let Some((key, order)) = sort.active() {
            Self::sort(&mut result, key, order);
        }
        debug!(input = rows.len(), output = result.len(), "applied filter/sort pipeline");
        result
    }

    /// Keep rows whose every bounded column satisfies `min <= value <= max`.
    pub fn filter(&self, rows: &[StockRow], filters: &FilterSet) -> Vec<StockRow> {
        rows.iter()
            .filter(|row| {
                NumericField::ALL
                    .iter()
                    .all(|field| filters.bound(*field).accepts(row.numeric(*field)))
            })
            .cloned()
            .collect()
    }

    /// Stable in-place sort on one key.
    pub fn sort(rows: &mut [StockRow], key: SortKey, order: SortOrder) {
        match order {
            SortOrder::Asc => rows.sort_by(|a, b| Self::compare(a, b, key)),
            SortOrder::Desc => rows.sort_by(|a, b| Self::compare(b, a, key)),
        }
    }

    fn compare(a: &StockRow, b: &StockRow, key: SortKey) -> Ordering {
        let numeric = |field: NumericField| {
            a.numeric(field)
                .partial_cmp(&b.numeric(field))
                .unwrap_or(Ordering::Equal)
        };
        match key {
            SortKey::Code => a.code.cmp(&b.code),
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::ChangeRate => numeric(NumericField::ChangeRate),
            SortKey::RangeAggregate => numeric(NumericField::RangeAggregate),
            SortKey::SpecificInstitutional => numeric(NumericField::SpecificInstitutional),
            SortKey::SpecificMarket => numeric(NumericField::SpecificMarket),
        }
    }
}

impl Default for PipelineService {
    fn default() -> Self {
        Self::new()
    }
}
