use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

use super::query::{SortKey, SortOrder};

/// User-configurable settings, persisted together with the datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// File-name prefix that marks a foreign-investor export (case-insensitive)
    pub foreign_prefix: String,

    /// File-name prefix that marks an institutional-investor export (case-insensitive)
    pub institutional_prefix: String,

    /// Initial range start, ISO `YYYY-MM-DD`
    pub default_range_start: String,

    /// Initial range end, ISO `YYYY-MM-DD`
    pub default_range_end: String,

    /// Initial snapshot day, ISO `YYYY-MM-DD`
    pub default_specific_date: String,

    pub default_sort_key: SortKey,

    pub default_sort_order: SortOrder,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            foreign_prefix: "f_".to_string(),
            institutional_prefix: "inst_".to_string(),
            default_range_start: "2024-01-01".to_string(),
            default_range_end: "2024-12-31".to_string(),
            default_specific_date: "2024-01-15".to_string(),
            default_sort_key: SortKey::ChangeRate,
            default_sort_order: SortOrder::Desc,
        }
    }
}

impl Settings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize settings: {e}")))
    }

    /// Prefixes are checked as file names are matched against them: compared
    /// lowercase, without trimming. Each must be non-empty, free of
    /// surrounding whitespace, and neither may start with the other, or one
    /// role could never be inferred.
    pub fn validate(&self) -> Result<(), CoreError> {
        for prefix in [&self.foreign_prefix, &self.institutional_prefix] {
            if prefix.is_empty() {
                return Err(CoreError::ValidationError(
                    "File-name prefixes must not be empty".into(),
                ));
            }
            if prefix.trim() != prefix.as_str() {
                return Err(CoreError::ValidationError(format!(
                    "File-name prefix '{prefix}' has surrounding whitespace"
                )));
            }
        }

        let foreign = self.foreign_prefix.to_lowercase();
        let institutional = self.institutional_prefix.to_lowercase();
        if foreign.starts_with(&institutional) || institutional.starts_with(&foreign) {
            return Err(CoreError::ValidationError(format!(
                "Foreign prefix '{foreign}' and institutional prefix '{institutional}' overlap"
            )));
        }
        Ok(())
    }
}
