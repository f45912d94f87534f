use serde::{Deserialize, Serialize};

use super::query::NumericField;

/// One reconciled row per roster entry, recomputed on every parameter change.
///
/// Field order is the export column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRow {
    /// Canonical stock code (empty when the roster row had none)
    pub code: String,

    /// Display name
    pub name: String,

    /// Daily change in percent (e.g. `2.34` for +2.34%)
    pub change_rate: f64,

    /// Sum of the chosen feed's trade value across the date range
    pub range_aggregate: f64,

    /// Institutional trade value on the specific date
    pub specific_institutional: f64,

    /// Total-market trade value on the specific date
    pub specific_market: f64,
}

impl StockRow {
    /// Value of a numeric column, for filtering and sorting.
    #[must_use]
    pub fn numeric(&self, field: NumericField) -> f64 {
        match field {
            NumericField::ChangeRate => self.change_rate,
            NumericField::RangeAggregate => self.range_aggregate,
            NumericField::SpecificInstitutional => self.specific_institutional,
            NumericField::SpecificMarket => self.specific_market,
        }
    }
}
