use crate::models::record::{CellValue, Record};

/// Where to find one logical field in rows from exporters that disagree on
/// header labels but agree on column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Accepted header labels, tried in order
    pub aliases: &'static [&'static str],

    /// Zero-based column used when no alias is present
    pub position: usize,
}

/// Stock code column.
pub const STOCK_CODE: FieldSpec = FieldSpec {
    aliases: &["종목코드", "Code"],
    position: 0,
};

/// Stock display name column.
pub const STOCK_NAME: FieldSpec = FieldSpec {
    aliases: &["종목명", "Name"],
    position: 1,
};

/// Daily change rate column.
pub const CHANGE_RATE: FieldSpec = FieldSpec {
    aliases: &["등락률", "ChangeRate"],
    position: 5,
};

/// Trade value column of the daily flow exports.
pub const TRADE_VALUE: FieldSpec = FieldSpec {
    aliases: &["거래대금"],
    position: 7,
};

impl FieldSpec {
    /// Resolve this field in `record`.
    pub fn resolve<'a>(&self, record: &'a Record) -> Option<&'a CellValue> {
        resolve(record, self.aliases, self.position)
    }
}

/// First alias present in `record`; otherwise the value at `position` in
/// column order; otherwise `None`.
pub fn resolve<'a>(record: &'a Record, aliases: &[&str], position: usize) -> Option<&'a CellValue> {
    aliases
        .iter()
        .find_map(|alias| record.get(alias))
        .or_else(|| record.value_at(position))
}
