use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::dataset::{DatasetRole, TradingDate};
use super::settings::Settings;

const ISO_FORMAT: &str = "%Y-%m-%d";

/// Inclusive calendar range chosen by the analyst.
///
/// An endpoint that failed to parse is kept as `None`, and a range with a
/// missing endpoint contains nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Build from ISO strings as typed into a date picker.
    pub fn from_iso(start: &str, end: &str) -> Self {
        Self {
            start: NaiveDate::parse_from_str(start.trim(), ISO_FORMAT).ok(),
            end: NaiveDate::parse_from_str(end.trim(), ISO_FORMAT).ok(),
        }
    }

    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => date >= start && date <= end,
            _ => false,
        }
    }

    /// Whether a dataset date key falls inside the range. Malformed keys never do.
    #[must_use]
    pub fn contains(&self, key: &TradingDate) -> bool {
        key.to_naive_date()
            .is_some_and(|date| self.contains_date(date))
    }
}

/// Which time-series feed a computation reads its trade value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FlowMetric {
    MarketTotal,
    ForeignFlow,
    #[default]
    InstitutionalFlow,
}

impl FlowMetric {
    #[must_use]
    pub fn role(&self) -> DatasetRole {
        match self {
            FlowMetric::MarketTotal => DatasetRole::MarketTotal,
            FlowMetric::ForeignFlow => DatasetRole::ForeignFlow,
            FlowMetric::InstitutionalFlow => DatasetRole::InstitutionalFlow,
        }
    }
}

/// Numeric columns of a reconciled row that can be range-filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericField {
    ChangeRate,
    RangeAggregate,
    SpecificInstitutional,
    SpecificMarket,
}

impl NumericField {
    pub const ALL: [NumericField; 4] = [
        NumericField::ChangeRate,
        NumericField::RangeAggregate,
        NumericField::SpecificInstitutional,
        NumericField::SpecificMarket,
    ];
}

/// Optional inclusive bounds on one numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bound {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bound {
    #[must_use]
    pub fn is_unset(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    #[must_use]
    pub fn accepts(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// Range filters across the numeric columns, applied as a conjunction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterSet {
    pub change_rate: Bound,
    pub range_aggregate: Bound,
    pub specific_institutional: Bound,
    pub specific_market: Bound,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn bound(&self, field: NumericField) -> &Bound {
        match field {
            NumericField::ChangeRate => &self.change_rate,
            NumericField::RangeAggregate => &self.range_aggregate,
            NumericField::SpecificInstitutional => &self.specific_institutional,
            NumericField::SpecificMarket => &self.specific_market,
        }
    }

    pub fn bound_mut(&mut self, field: NumericField) -> &mut Bound {
        match field {
            NumericField::ChangeRate => &mut self.change_rate,
            NumericField::RangeAggregate => &mut self.range_aggregate,
            NumericField::SpecificInstitutional => &mut self.specific_institutional,
            NumericField::SpecificMarket => &mut self.specific_market,
        }
    }

    /// Builder-style: set the lower bound of `field`.
    #[must_use]
    pub fn with_min(mut self, field: NumericField, min: f64) -> Self {
        self.bound_mut(field).min = Some(min);
        self
    }

    /// Builder-style: set the upper bound of `field`.
    #[must_use]
    pub fn with_max(mut self, field: NumericField, max: f64) -> Self {
        self.bound_mut(field).max = Some(max);
        self
    }

    /// Parse a bound typed into a filter box. Blank or non-numeric input is unset.
    #[must_use]
    pub fn parse_bound(input: &str) -> Option<f64> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        NumericField::ALL.iter().all(|f| self.bound(*f).is_unset())
    }
}

/// Column a reconciled table can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortKey {
    Code,
    Name,
    ChangeRate,
    RangeAggregate,
    SpecificInstitutional,
    SpecificMarket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// The single active ordering. Without both a key and an order, rows keep
/// their filtered order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortState {
    pub key: Option<SortKey>,
    pub order: Option<SortOrder>,
}

impl SortState {
    pub fn new(key: SortKey, order: SortOrder) -> Self {
        Self {
            key: Some(key),
            order: Some(order),
        }
    }

    pub fn unsorted() -> Self {
        Self::default()
    }

    /// Column header click: select `key` and flip the order (unset -> ascending).
    pub fn toggle(&mut self, key: SortKey) {
        self.key = Some(key);
        self.order = Some(match self.order {
            Some(SortOrder::Asc) => SortOrder::Desc,
            _ => SortOrder::Asc,
        });
    }

    /// Active `(key, order)` pair, if the table is sorted at all.
    #[must_use]
    pub fn active(&self) -> Option<(SortKey, SortOrder)> {
        Some((self.key?, self.order?))
    }
}

/// Immutable parameter bundle for one dashboard computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Range for the aggregated column
    pub range: DateRange,

    /// Day for the snapshot columns
    pub specific_date: TradingDate,

    /// Feed summed across `range`
    pub metric: FlowMetric,

    pub filters: FilterSet,

    pub sort: SortState,
}

impl AnalysisParams {
    pub fn new(range: DateRange, specific_date: TradingDate) -> Self {
        Self {
            range,
            specific_date,
            metric: FlowMetric::default(),
            filters: FilterSet::default(),
            sort: SortState::default(),
        }
    }

    /// Defaults from user settings: configured range, snapshot day and ordering.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            range: DateRange::from_iso(&settings.default_range_start, &settings.default_range_end),
            specific_date: TradingDate::from_iso(&settings.default_specific_date),
            metric: FlowMetric::default(),
            filters: FilterSet::default(),
            sort: SortState::new(settings.default_sort_key, settings.default_sort_order),
        }
    }

    #[must_use]
    pub fn with_metric(mut self, metric: FlowMetric) -> Self {
        self.metric = metric;
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: FilterSet) -> Self {
        self.filters = filters;
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: SortState) -> Self {
        self.sort = sort;
        self
    }
}
