use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::stock_row::StockRow;

/// Fixed export header, one label per [`StockRow`] field in field order.
pub const EXPORT_HEADERS: [&str; 6] = [
    "종목코드",
    "종목명",
    "등락률(%)",
    "누적 거래대금",
    "특정일 기관 거래대금",
    "특정일 전체 거래대금",
];

/// Produces downloadable tables from pipeline output.
pub struct ExportService;

impl ExportService {
    /// CSV with [`EXPORT_HEADERS`] and one line per row.
    #[must_use]
    pub fn to_csv(rows: &[StockRow]) -> String {
        let mut csv = EXPORT_HEADERS.join(",");
        csv.push('\n');
        for row in rows {
            csv.push_str(&format!(
                "{},{},{},{},{},{}\n",
                escape(&row.code),
                escape(&row.name),
                row.change_rate,
                row.range_aggregate,
                row.specific_institutional,
                row.specific_market,
            ));
        }
        csv
    }

    /// Pretty JSON array of rows.
    pub fn to_json(rows: &[StockRow]) -> Result<String, CoreError> {
        serde_json::to_string_pretty(rows)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize rows to JSON: {e}")))
    }

    /// `주식분석결과_2024-01-15.csv`
    #[must_use]
    pub fn default_file_name(date: NaiveDate) -> String {
        format!("주식분석결과_{}.csv", date.format("%Y-%m-%d"))
    }
}

/// Quote fields containing commas, quotes or line breaks.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
