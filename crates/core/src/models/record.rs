use serde::{Deserialize, Serialize};

/// A single scalar cell decoded from a spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Bool(bool),
    #[default]
    Empty,
}

impl CellValue {
    /// Numeric coercion with spreadsheet semantics.
    ///
    /// Numbers pass through, booleans become 1/0, text is trimmed and parsed
    /// as a whole (blank text is 0). Anything else is `NaN`.
    #[must_use]
    pub fn as_number(&self) -> f64 {
        match self {
            CellValue::Number(n) => *n,
            CellValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return 0.0;
                }
                match trimmed.parse::<f64>() {
                    Ok(n) if n.is_finite() => n,
                    _ => f64::NAN,
                }
            }
            CellValue::Empty => f64::NAN,
        }
    }

    /// Render the cell the way it would be shown in a table.
    /// Integral numbers lose their fractional part (`5930.0` -> `"5930"`).
    #[must_use]
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            CellValue::Text(s) => s.clone(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Empty => String::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

/// One spreadsheet row: column labels mapped to cells, in sheet column order.
///
/// Field order matters, positional lookups fall back to it when an exporter
/// used an unexpected header label.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, CellValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(label, value)` pairs, keeping their order.
    pub fn from_pairs<L, V, I>(pairs: I) -> Self
    where
        L: Into<String>,
        V: Into<CellValue>,
        I: IntoIterator<Item = (L, V)>,
    {
        let mut record = Self::new();
        for (label, value) in pairs {
            record.insert(label, value);
        }
        record
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, label: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(label, value);
        self
    }

    /// Insert a cell. Re-inserting an existing label replaces its value in place.
    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<CellValue>) {
        let label = label.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(l, _)| *l == label) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((label, value)),
        }
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<&CellValue> {
        self.fields.iter().find(|(l, _)| l == label).map(|(_, v)| v)
    }

    /// Value at a zero-based column position.
    #[must_use]
    pub fn value_at(&self, index: usize) -> Option<&CellValue> {
        self.fields.get(index).map(|(_, v)| v)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(l, _)| l.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
