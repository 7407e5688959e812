use crate::ingestion::spreadsheet::DEFAULT_WORKSHEET;
use crate::services::reconciliation_service::DEFAULT_SORT_ORDER_STEP;

pub const DEFAULT_DATABASE_PATH: &str = "intent-catalogue.db";

/// Runtime settings for imports. CLI flags take precedence over these values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueConfig {
    /// SQLite file backing the catalogue; `:memory:` for a throwaway store.
    pub database_path: String,
    /// Gap between sort-order values assigned to newly added columns.
    pub sort_order_step: i32,
    /// Worksheet read from workbooks when present, matched ignoring case.
    pub preferred_worksheet: String,
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            sort_order_step: DEFAULT_SORT_ORDER_STEP,
            preferred_worksheet: DEFAULT_WORKSHEET.to_string(),
        }
    }
}

impl CatalogueConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_path: std::env::var("INTENT_CATALOGUE_DB")
                .ok()
                .filter(|path| !path.trim().is_empty())
                .unwrap_or(defaults.database_path),
            sort_order_step: std::env::var("INTENT_CATALOGUE_SORT_STEP")
                .ok()
                .and_then(|value| parse_sort_order_step(&value))
                .unwrap_or(defaults.sort_order_step),
            preferred_worksheet: defaults.preferred_worksheet,
        }
    }

    pub fn with_database_path(mut self, path: impl Into<String>) -> Self {
        self.database_path = path.into();
        self
    }
}

fn parse_sort_order_step(value: &str) -> Option<i32> {
    value.trim().parse::<i32>().ok().filter(|step| *step >= 1)
}
