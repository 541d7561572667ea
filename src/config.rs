use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::schema::codes;

/// What enrich does with a taxonomic order outside the label lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnclassifiedOrders {
    /// Leave `Animal order` null; null forms its own group when aggregating.
    #[default]
    Keep,
    /// Drop unlabelled rows from animal-order groupings.
    Drop,
    /// Write the given label instead of null.
    Label(String),
}

/// Configuration for the trade record processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Directory that relative CSV paths are resolved against.
    pub base_path: PathBuf,
    /// Reporting years removed by clean.
    pub excluded_years: Vec<i64>,
    /// Only records with this source code survive clean.
    pub source_code: String,
    pub unclassified: UnclassifiedOrders,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            excluded_years: vec![codes::INCOMPLETE_YEAR],
            source_code: codes::WILD.to_string(),
            unclassified: UnclassifiedOrders::Keep,
        }
    }
}

impl ProcessorConfig {
    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_excluded_years(mut self, years: Vec<i64>) -> Self {
        self.excluded_years = years;
        self
    }

    pub fn with_source_code(mut self, code: impl Into<String>) -> Self {
        self.source_code = code.into();
        self
    }

    pub fn with_unclassified(mut self, policy: UnclassifiedOrders) -> Self {
        self.unclassified = policy;
        self
    }
}
