use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::models::dataset::{Dataset, DatasetRole, TradingDate};
use crate::models::record::{CellValue, Record};
use crate::models::settings::Settings;

use super::schema;

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[0-9]{6}").expect("static date pattern is valid"))
}

/// Canonical stock code of a row.
///
/// Integral numeric cells drop their fractional part, text is trimmed.
/// Rows without a usable code return `None` and never join with anything.
#[must_use]
pub fn stock_code(record: &Record) -> Option<String> {
    let code = match schema::STOCK_CODE.resolve(record)? {
        CellValue::Empty => return None,
        CellValue::Text(s) => s.trim().to_string(),
        other => other.display_text(),
    };
    if code.is_empty() {
        None
    } else {
        Some(code)
    }
}

/// Display name of a row, empty when absent.
#[must_use]
pub fn stock_name(record: &Record) -> String {
    schema::STOCK_NAME
        .resolve(record)
        .map(|v| v.display_text().trim().to_string())
        .unwrap_or_default()
}

/// Index a dataset's rows by canonical code. The first row for a code wins.
#[must_use]
pub fn index_by_code(dataset: &Dataset) -> HashMap<String, &Record> {
    let mut index = HashMap::with_capacity(dataset.rows.len());
    for row in &dataset.rows {
        if let Some(code) = stock_code(row) {
            index.entry(code).or_insert(row);
        }
    }
    index
}

/// The first run of six ASCII digits anywhere in a file name, e.g.
/// `inst_240115.xlsx` -> `240115`.
#[must_use]
pub fn extract_trading_date(file_name: &str) -> Option<TradingDate> {
    date_pattern()
        .find(file_name)
        .map(|m| TradingDate::new(m.as_str()))
}

/// Classify an upload by its file name; the upload slot is the fallback.
#[must_use]
pub fn infer_role(file_name: &str, slot: DatasetRole, settings: &Settings) -> DatasetRole {
    let lower = file_name.to_lowercase();
    if lower.starts_with(&settings.foreign_prefix.to_lowercase()) {
        DatasetRole::ForeignFlow
    } else if lower.starts_with(&settings.institutional_prefix.to_lowercase()) {
        DatasetRole::InstitutionalFlow
    } else {
        slot
    }
}
