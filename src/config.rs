//! Engine configuration
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration and partial files only override what they name.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::types::{Category, LedgerError, LedgerResult};

/// Top level configuration for the engine
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub session: SessionConfig,
    pub reconciliation: ReconciliationConfig,
    pub alerts: AlertConfig,
    pub export: ExportConfig,
}

impl EngineConfig {
    /// Parse a configuration from a JSON document
    pub fn from_json_str(raw: &str) -> LedgerResult<Self> {
        serde_json::from_str(raw).map_err(|err| LedgerError::Config(err.to_string()))
    }

    /// Load a configuration file from disk
    pub fn load(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|err| LedgerError::Config(format!("{}: {}", path.display(), err)))?;
        Self::from_json_str(&raw)
    }
}

/// Refresh timings for [`crate::session::LedgerSession`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub poll_interval_ms: u64,
    pub debounce_ms: u64,
    pub cache_ttl_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            debounce_ms: 100,
            cache_ttl_ms: 500,
        }
    }
}

impl SessionConfig {
    pub fn poll_interval(&self) -> Duration {
        // tokio intervals panic on a zero period
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Category given to income posted when a project completes
    pub project_category: String,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            project_category: "Projects".to_string(),
        }
    }
}

impl ReconciliationConfig {
    pub fn project_category(&self) -> Category {
        Category::new(&self.project_category)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// How far ahead an unpaid item counts as upcoming
    pub upcoming_window_days: i64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            upcoming_window_days: 7,
        }
    }
}

impl AlertConfig {
    pub fn upcoming_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.upcoming_window_days.max(0))
    }
}

/// Layout and naming of exported reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub title: String,
    pub file_stem: String,
    pub currency_symbol: String,
    pub max_transaction_rows: usize,
    pub max_client_rows: usize,
    pub max_project_rows: usize,
    pub top_categories: usize,
    pub widths: DisplayWidths,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: "Financial Report".to_string(),
            file_stem: "ledger-report".to_string(),
            currency_symbol: "$".to_string(),
            max_transaction_rows: 20,
            max_client_rows: 15,
            max_project_rows: 15,
            top_categories: 5,
            widths: DisplayWidths::default(),
        }
    }
}

/// Character widths free text is cut to in the printable layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayWidths {
    pub description: usize,
    pub category: usize,
    pub client_name: usize,
    pub email: usize,
    pub phone: usize,
    pub project_title: usize,
    pub project_client: usize,
}

impl Default for DisplayWidths {
    fn default() -> Self {
        Self {
            description: 25,
            category: 15,
            client_name: 25,
            email: 20,
            phone: 15,
            project_title: 25,
            project_client: 20,
        }
    }
}
