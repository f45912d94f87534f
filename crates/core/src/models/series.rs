use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::dataset::TradingDate;

/// How per-date values are presented on a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SeriesMode {
    /// Value observed on each date
    #[default]
    Daily,
    /// Running sum up to and including each date
    Cumulative,
}

/// A single chart row: one date, one value per selected stock code.
///
/// Serializes flat, `{"date": .., "calendar_date": .., "<code>": value}`, the
/// shape chart components consume. Codes share that key space, so a code
/// spelled `date` or `calendar_date` would collide with the fixed fields;
/// exchange codes never are. Read values through [`SeriesPoint::value`] or
/// `values`, which stay unambiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Trading date key (`YYMMDD`)
    pub date: TradingDate,

    /// Calendar date, when the key is well formed
    pub calendar_date: Option<NaiveDate>,

    /// Stock code -> value
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

impl SeriesPoint {
    /// Value for `code`, 0 when the code was not selected.
    #[must_use]
    pub fn value(&self, code: &str) -> f64 {
        self.values.get(code).copied().unwrap_or(0.0)
    }
}
