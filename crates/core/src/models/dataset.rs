use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::Record;

/// Functional category of an uploaded dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetRole {
    /// The selected-stock list that anchors every join
    Roster,
    /// Total-market trade value, one file per trading day
    MarketTotal,
    /// Foreign-investor trade value, one file per trading day
    ForeignFlow,
    /// Institutional-investor trade value, one file per trading day
    InstitutionalFlow,
}

impl DatasetRole {
    /// Every role, in upload-slot order.
    pub const ALL: [DatasetRole; 4] = [
        DatasetRole::Roster,
        DatasetRole::MarketTotal,
        DatasetRole::ForeignFlow,
        DatasetRole::InstitutionalFlow,
    ];

    /// Roles that carry one dataset per trading day.
    pub const TIME_SERIES: [DatasetRole; 3] = [
        DatasetRole::MarketTotal,
        DatasetRole::ForeignFlow,
        DatasetRole::InstitutionalFlow,
    ];

    #[must_use]
    pub fn is_time_series(&self) -> bool {
        Self::TIME_SERIES.contains(self)
    }
}

impl std::fmt::Display for DatasetRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetRole::Roster => write!(f, "Roster"),
            DatasetRole::MarketTotal => write!(f, "MarketTotal"),
            DatasetRole::ForeignFlow => write!(f, "ForeignFlow"),
            DatasetRole::InstitutionalFlow => write!(f, "InstitutionalFlow"),
        }
    }
}

/// A trading day key in `YYMMDD` form, as found in export file names.
///
/// The key is kept verbatim; [`TradingDate::to_naive_date`] expands it to a
/// calendar date in the 2000-2099 window when it is well formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TradingDate(String);

impl TradingDate {
    /// Wrap a raw key without validation.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Accept only a 6-character ASCII digit key.
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        if key.len() == 6 && key.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(key.to_string()))
        } else {
            None
        }
    }

    /// Convert a user-chosen ISO date (`2024-01-15`) to its key (`240115`)
    /// by stripping separators and dropping the two century digits.
    ///
    /// Malformed input still yields a key; it simply never matches a dataset.
    pub fn from_iso(iso: &str) -> Self {
        let compact: String = iso.chars().filter(|c| *c != '-').collect();
        Self(compact.chars().skip(2).collect())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format("%y%m%d").to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Expand `YYMMDD` to `20YY-MM-DD`. `None` for malformed keys or impossible dates.
    #[must_use]
    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        if Self::parse(&self.0).is_none() {
            return None;
        }
        let iso = format!("20{}-{}-{}", &self.0[0..2], &self.0[2..4], &self.0[4..6]);
        NaiveDate::parse_from_str(&iso, "%Y-%m-%d").ok()
    }
}

impl std::fmt::Display for TradingDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the external spreadsheet decoder hands over for one uploaded file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecodedSheet {
    /// Original file name, used to infer role and trading date
    pub file_name: String,

    /// Rows of the first worksheet, header row already applied as labels
    pub rows: Vec<Record>,
}

impl DecodedSheet {
    pub fn new(file_name: impl Into<String>, rows: Vec<Record>) -> Self {
        Self {
            file_name: file_name.into(),
            rows,
        }
    }
}

/// An uploaded, decoded spreadsheet. Rows are never mutated after ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Unique identifier, assigned at ingestion
    pub id: Uuid,

    pub role: DatasetRole,

    /// Original file name
    pub name: String,

    pub row_count: usize,

    pub uploaded_at: DateTime<Utc>,

    /// Trading day this dataset represents (absent for the roster)
    #[serde(default)]
    pub trading_date: Option<TradingDate>,

    pub rows: Vec<Record>,
}

impl Dataset {
    pub fn new(
        role: DatasetRole,
        name: impl Into<String>,
        trading_date: Option<TradingDate>,
        rows: Vec<Record>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            name: name.into(),
            row_count: rows.len(),
            uploaded_at: Utc::now(),
            trading_date,
            rows,
        }
    }

    /// Trading date expanded to a calendar date, when present and well formed.
    #[must_use]
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        self.trading_date.as_ref().and_then(TradingDate::to_naive_date)
    }
}
