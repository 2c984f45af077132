//! Multi-sheet spreadsheet model. Unlike the printable document, sheets are
//! not row-capped and text is kept as entered.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::reports::aggregation::PeriodTotals;
use crate::reports::export::{ExportDataset, ExportSummary};
use crate::reports::filter::ReportFilter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Cell {
    Text(String),
    Number(BigDecimal),
    Count(usize),
    Empty,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    fn optional(value: Option<&str>, fallback: &str) -> Self {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Cell::text(v),
            _ => Cell::text(fallback),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub header: String,
    /// Width in characters
    pub width: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    fn new(name: &str, columns: &[(&str, u16)]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns
                .iter()
                .map(|(header, width)| Column {
                    header: header.to_string(),
                    width: *width,
                })
                .collect(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    pub file_name: String,
    pub totals: PeriodTotals,
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub(crate) fn with_file_name(mut self, file_name: String) -> Self {
        self.file_name = file_name;
        self
    }

    /// Look up a sheet by name
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

pub(crate) fn build_workbook(
    filter: &ReportFilter,
    summary: &ExportSummary,
    dataset: &ExportDataset,
    client_names: &HashMap<&str, &str>,
) -> Workbook {
    let mut sheets = vec![summary_sheet(filter, summary)];

    if filter.include_transactions && !dataset.transactions.is_empty() {
        let mut sheet = Sheet::new(
            "Transactions",
            &[
                ("Date", 12),
                ("Description", 30),
                ("Category", 18),
                ("Kind", 10),
                ("Amount", 14),
                ("Created At", 18),
            ],
        );
        for t in &dataset.transactions {
            sheet.push(vec![
                Cell::text(t.date.format("%d/%m/%Y").to_string()),
                Cell::text(t.description.clone()),
                Cell::text(t.category.as_str()),
                Cell::text(t.kind.label()),
                Cell::Number(t.amount.clone()),
                Cell::text(t.created_at.format("%d/%m/%Y %H:%M").to_string()),
            ]);
        }
        sheets.push(sheet);

        let mut analysis = Sheet::new(
            "Category Analysis",
            &[
                ("Category", 20),
                ("Income", 14),
                ("Expenses", 14),
                ("Net", 14),
                ("Count", 8),
                ("Average", 14),
            ],
        );
        for stats in &summary.breakdown {
            analysis.push(vec![
                Cell::text(stats.category.as_str()),
                Cell::Number(stats.income.clone()),
                Cell::Number(stats.expenses.clone()),
                Cell::Number(stats.net.clone()),
                Cell::Count(stats.count),
                Cell::Number(stats.average.round(2)),
            ]);
        }
        sheets.push(analysis);
    }

    if filter.include_clients && !dataset.clients.is_empty() {
        let mut sheet = Sheet::new(
            "Clients",
            &[("Name", 25), ("Email", 30), ("Phone", 16), ("Notes", 40), ("Created", 12)],
        );
        for c in &dataset.clients {
            sheet.push(vec![
                Cell::text(c.name.clone()),
                Cell::optional(c.email.as_deref(), "Not provided"),
                Cell::optional(c.phone.as_deref(), "Not provided"),
                Cell::optional(c.notes.as_deref(), "No notes"),
                Cell::text(c.created_at.format("%d/%m/%Y").to_string()),
            ]);
        }
        sheets.push(sheet);
    }

    if filter.include_projects && !dataset.projects.is_empty() {
        let mut sheet = Sheet::new(
            "Projects",
            &[
                ("Title", 25),
                ("Description", 35),
                ("Client", 25),
                ("Status", 14),
                ("Value", 14),
                ("Deadline", 12),
                ("Created", 12),
            ],
        );
        for p in &dataset.projects {
            sheet.push(vec![
                Cell::text(p.title.clone()),
                Cell::optional(Some(p.description.as_str()), "No description"),
                Cell::optional(client_names.get(p.client_id.as_str()).copied(), "No client linked"),
                Cell::text(p.status.label()),
                Cell::Number(p.value.clone()),
                match p.deadline {
                    Some(deadline) => Cell::text(deadline.format("%d/%m/%Y").to_string()),
                    None => Cell::text("Not set"),
                },
                Cell::text(p.created_at.format("%d/%m/%Y").to_string()),
            ]);
        }
        sheets.push(sheet);
    }

    Workbook {
        file_name: String::new(),
        totals: summary.totals.clone(),
        sheets,
    }
}

fn summary_sheet(filter: &ReportFilter, summary: &ExportSummary) -> Sheet {
    let mut sheet = Sheet::new("Summary", &[("Metric", 28), ("Value", 30)]);
    let totals = &summary.totals;

    sheet.push(vec![Cell::text("Report Period"), Cell::text(summary.period_label.clone())]);
    sheet.push(vec![
        Cell::text("Generated At"),
        Cell::text(summary.generated_at.format("%d/%m/%Y %H:%M").to_string()),
    ]);
    sheet.push(vec![Cell::text("Period Mode"), Cell::text(filter.period.as_str())]);
    sheet.push(vec![Cell::Empty, Cell::Empty]);
    sheet.push(vec![Cell::text("Total Income"), Cell::Number(totals.income.clone())]);
    sheet.push(vec![Cell::text("Total Expenses"), Cell::Number(totals.expenses.clone())]);
    sheet.push(vec![Cell::text("Final Balance"), Cell::Number(totals.balance.clone())]);
    sheet.push(vec![Cell::text("Transactions"), Cell::Count(totals.count)]);
    if filter.include_clients {
        sheet.push(vec![Cell::text("Clients"), Cell::Count(summary.client_count)]);
    }
    if filter.include_projects {
        sheet.push(vec![Cell::text("Projects"), Cell::Count(summary.project_count)]);
    }

    if !summary.top_categories.is_empty() {
        sheet.push(vec![Cell::Empty, Cell::Empty]);
        sheet.push(vec![Cell::text("Top Categories"), Cell::Empty]);
        for (index, stats) in summary.top_categories.iter().enumerate() {
            sheet.push(vec![
                Cell::text(format!("{}. {}", index + 1, stats.category)),
                Cell::Number(stats.net.clone()),
            ]);
        }
    }
    sheet
}
