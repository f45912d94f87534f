use regex::Regex;
use std::sync::OnceLock;

use crate::models::record::{CellValue, Record};

use super::schema;

fn leading_number() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?")
            .expect("static number pattern is valid")
    })
}

/// Longest numeric prefix of `text`, like a lenient float parser: `"2.3x"` -> `2.3`.
fn parse_leading_float(text: &str) -> Option<f64> {
    leading_number()
        .find(text)
        .and_then(|m| m.as_str().trim().parse::<f64>().ok())
}

/// Normalize a change-rate cell to percent.
///
/// Text has `%` and `,` stripped before parsing; anything unparsable is 0.
/// A non-zero magnitude below 1 is treated as a fraction and scaled by 100,
/// so `0.0234` and `2.34` both come out as `2.34`. A genuine sub-1% move
/// (`0.8`) is scaled too; the exports carry no flag to tell them apart.
#[must_use]
pub fn normalize_change_rate(cell: Option<&CellValue>) -> f64 {
    let num = match cell {
        Some(CellValue::Number(n)) if n.is_finite() => *n,
        Some(CellValue::Text(s)) => {
            let cleaned: String = s.chars().filter(|c| *c != '%' && *c != ',').collect();
            parse_leading_float(&cleaned).unwrap_or(0.0)
        }
        _ => 0.0,
    };
    if num != 0.0 && num.abs() < 1.0 {
        num * 100.0
    } else {
        num
    }
}

/// Plain numeric value of a trade-value cell; missing or unparsable is 0.
#[must_use]
pub fn parse_trade_value(cell: Option<&CellValue>) -> f64 {
    match cell.map(CellValue::as_number) {
        Some(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

/// Change rate of a roster row, in percent.
#[must_use]
pub fn change_rate_of(record: &Record) -> f64 {
    normalize_change_rate(schema::CHANGE_RATE.resolve(record))
}

/// Trade value of a flow row; `None` (no matching row) contributes 0.
#[must_use]
pub fn trade_value_of(record: Option<&Record>) -> f64 {
    record
        .map(|r| parse_trade_value(schema::TRADE_VALUE.resolve(r)))
        .unwrap_or(0.0)
}
