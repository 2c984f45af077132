//! Report export: one summary computed once, rendered into a paginated
//! printable document and a multi-sheet workbook.

pub mod printable;
pub mod sanitize;
pub mod workbook;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::ExportConfig;
use crate::reports::aggregation::{category_breakdown, period_totals, top_categories};
use crate::reports::aggregation::{CategoryStats, PeriodTotals};
use crate::reports::filter::{DateInterval, ReportFilter};
use crate::types::*;

pub use printable::*;
pub use workbook::*;

/// Records handed to the generator. `transactions` are already filtered by
/// period and kind; `clients` is the full client list so project rows can
/// show client names even when the client section is excluded.
#[derive(Debug, Clone, Default)]
pub struct ExportDataset {
    pub transactions: Vec<Transaction>,
    pub clients: Vec<Client>,
    pub projects: Vec<Project>,
}

/// Numbers shared by both document formats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub generated_at: DateTime<Utc>,
    pub interval: DateInterval,
    pub period_label: String,
    pub totals: PeriodTotals,
    pub breakdown: Vec<CategoryStats>,
    pub top_categories: Vec<CategoryStats>,
    pub client_count: usize,
    pub project_count: usize,
}

/// The two generated documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub summary: ExportSummary,
    pub printable: PrintableDocument,
    pub workbook: Workbook,
}

/// Builds export documents from a filtered dataset
#[derive(Debug, Clone, Default)]
pub struct ExportGenerator {
    config: ExportConfig,
}

impl ExportGenerator {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// File name for a document generated on `generated_at`'s date. Same-day
    /// regeneration yields the same name.
    pub fn file_name(&self, generated_at: DateTime<Utc>, extension: &str) -> String {
        format!(
            "{}-{}.{}",
            self.config.file_stem,
            generated_at.format("%Y-%m-%d"),
            extension
        )
    }

    /// Compute totals and category rankings once for both formats
    pub fn summarize(
        &self,
        filter: &ReportFilter,
        interval: DateInterval,
        dataset: &ExportDataset,
        generated_at: DateTime<Utc>,
    ) -> ExportSummary {
        let breakdown = category_breakdown(&dataset.transactions);
        let top = top_categories(&breakdown, self.config.top_categories);
        ExportSummary {
            generated_at,
            interval,
            period_label: interval.describe(),
            totals: period_totals(&dataset.transactions),
            breakdown,
            top_categories: top,
            client_count: if filter.include_clients { dataset.clients.len() } else { 0 },
            project_count: if filter.include_projects { dataset.projects.len() } else { 0 },
        }
    }

    /// Generate both documents
    pub fn generate(
        &self,
        filter: &ReportFilter,
        interval: DateInterval,
        dataset: &ExportDataset,
        generated_at: DateTime<Utc>,
    ) -> ExportBundle {
        let summary = self.summarize(filter, interval, dataset, generated_at);
        let client_names: HashMap<&str, &str> = dataset
            .clients
            .iter()
            .map(|c| (c.id.as_str(), c.name.as_str()))
            .collect();

        let printable = printable::build_document(&self.config, filter, &summary, dataset, &client_names)
            .with_file_name(self.file_name(generated_at, "pdf"));
        let workbook = workbook::build_workbook(filter, &summary, dataset, &client_names)
            .with_file_name(self.file_name(generated_at, "xlsx"));

        tracing::info!(
            transactions = summary.totals.count,
            pages = printable.pages.len(),
            sheets = workbook.sheets.len(),
            "report generated"
        );

        ExportBundle {
            summary,
            printable,
            workbook,
        }
    }
}

impl ExportBundle {
    /// Write both documents as JSON into `dir`, overwriting same-named files.
    ///
    /// Both payloads are serialized and staged as temp files before either
    /// final name is touched; on failure the staged files are removed.
    pub fn save_to(&self, dir: impl AsRef<Path>) -> LedgerResult<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let payloads = [
            (
                format!("{}.json", self.printable.file_name),
                serde_json::to_vec_pretty(&self.printable),
            ),
            (
                format!("{}.json", self.workbook.file_name),
                serde_json::to_vec_pretty(&self.workbook),
            ),
        ];

        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::new();
        for (name, payload) in payloads {
            let result = payload
                .map_err(|err| LedgerError::Export(err.to_string()))
                .and_then(|bytes| {
                    let temp = dir.join(format!(".{}.tmp", name));
                    std::fs::write(&temp, bytes)
                        .map(|_| temp)
                        .map_err(|err| LedgerError::Export(format!("{}: {}", name, err)))
                });
            match result {
                Ok(temp) => staged.push((temp, dir.join(name))),
                Err(err) => {
                    discard(&staged);
                    tracing::warn!(error = %err, "export aborted");
                    return Err(err);
                }
            }
        }

        let mut written = Vec::new();
        for (index, (temp, target)) in staged.iter().enumerate() {
            if let Err(err) = std::fs::rename(temp, target) {
                discard(&staged[index..]);
                for path in &written {
                    let _ = std::fs::remove_file(path);
                }
                return Err(LedgerError::Export(format!("{}: {}", target.display(), err)));
            }
            written.push(target.clone());
        }

        tracing::info!(dir = %dir.display(), files = written.len(), "report saved");
        Ok(written)
    }
}

fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (temp, _) in staged {
        let _ = std::fs::remove_file(temp);
    }
}
