//! Paginated A4 document model.
//!
//! Positions are millimetres from the top of the page. Content flows down a
//! cursor and breaks onto a new page at fixed thresholds, so the page count is
//! a pure function of the dataset and the row caps.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::ExportConfig;
use crate::reports::aggregation::PeriodTotals;
use crate::reports::export::sanitize::{format_money, printable_label, printable_text};
use crate::reports::export::{ExportDataset, ExportSummary};
use crate::reports::filter::ReportFilter;
use crate::types::*;

const PAGE_TOP: u32 = 30;
const SUMMARY_TOP: u32 = 55;
const ROW_HEIGHT: u32 = 10;
const RANK_HEIGHT: u32 = 8;
/// Rows below this line continue on a new page
const ROW_LIMIT: u32 = 250;
const CATEGORY_SECTION_LIMIT: u32 = 220;
const TABLE_SECTION_LIMIT: u32 = 200;
const FOOTER_Y: u32 = 285;

/// Color hint for renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Positive,
    Negative,
}

impl Tone {
    fn of_kind(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Income => Tone::Positive,
            TransactionKind::Expense => Tone::Negative,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockContent {
    TitleBand {
        text: String,
    },
    Text {
        text: String,
    },
    SummaryBox {
        income: String,
        expenses: String,
        balance: String,
        balance_tone: Tone,
    },
    Heading {
        text: String,
    },
    TableHeader {
        columns: Vec<String>,
    },
    TableRow {
        cells: Vec<String>,
        /// Zebra striping, every other row starting with the first
        shaded: bool,
        tone: Option<Tone>,
    },
    RankedItem {
        rank: usize,
        label: String,
        amount: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub y: u32,
    pub content: BlockContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub number: usize,
    pub blocks: Vec<Block>,
    /// `"Page i of n | title"`, drawn at the bottom of every page
    pub footer: String,
    pub footer_y: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintableDocument {
    pub file_name: String,
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub period_label: String,
    /// The shared totals the summary box was rendered from
    pub totals: PeriodTotals,
    pub pages: Vec<Page>,
}

impl PrintableDocument {
    pub(crate) fn with_file_name(mut self, file_name: String) -> Self {
        self.file_name = file_name;
        self
    }

    /// All blocks in reading order
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.pages.iter().flat_map(|p| p.blocks.iter())
    }

    /// Table rows that follow the heading `heading`, across page breaks
    pub fn section_rows(&self, heading: &str) -> Vec<&Vec<String>> {
        let mut rows = Vec::new();
        let mut inside = false;
        for block in self.blocks() {
            match &block.content {
                BlockContent::Heading { text } => inside = text == heading,
                BlockContent::TableRow { cells, .. } if inside => rows.push(cells),
                _ => {}
            }
        }
        rows
    }
}

struct Cursor {
    pages: Vec<Vec<Block>>,
    y: u32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: 0,
        }
    }

    fn place(&mut self, y: u32, content: BlockContent) {
        if let Some(page) = self.pages.last_mut() {
            page.push(Block { y, content });
        }
    }

    fn put(&mut self, content: BlockContent) {
        self.place(self.y, content);
    }

    fn advance(&mut self, by: u32) {
        self.y += by;
    }

    fn break_if_past(&mut self, limit: u32) {
        if self.y > limit {
            self.pages.push(Vec::new());
            self.y = PAGE_TOP;
        }
    }

    fn table(&mut self, heading: &str, columns: &[&str], rows: Vec<(Vec<String>, Option<Tone>)>) {
        self.advance(20);
        self.break_if_past(TABLE_SECTION_LIMIT);
        self.rows(heading, columns, rows);
    }

    fn rows(&mut self, heading: &str, columns: &[&str], rows: Vec<(Vec<String>, Option<Tone>)>) {
        self.put(BlockContent::Heading {
            text: heading.to_string(),
        });
        self.advance(15);
        self.put(BlockContent::TableHeader {
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
        self.advance(ROW_HEIGHT);
        for (index, (cells, tone)) in rows.into_iter().enumerate() {
            self.break_if_past(ROW_LIMIT);
            self.put(BlockContent::TableRow {
                cells,
                shaded: index % 2 == 0,
                tone,
            });
            self.advance(ROW_HEIGHT);
        }
    }
}

pub(crate) fn build_document(
    config: &ExportConfig,
    filter: &ReportFilter,
    summary: &ExportSummary,
    dataset: &ExportDataset,
    client_names: &HashMap<&str, &str>,
) -> PrintableDocument {
    let widths = &config.widths;
    let money = |amount: &BigDecimal| format_money(&config.currency_symbol, amount);
    let mut cursor = Cursor::new();

    cursor.place(0, BlockContent::TitleBand {
        text: printable_text(&config.title, 60),
    });
    cursor.place(35, BlockContent::Text {
        text: format!("Generated at: {}", summary.generated_at.format("%d/%m/%Y %H:%M")),
    });
    cursor.place(42, BlockContent::Text {
        text: format!("Period: {}", summary.period_label),
    });
    cursor.place(SUMMARY_TOP, BlockContent::SummaryBox {
        income: money(&summary.totals.income),
        expenses: money(&summary.totals.expenses),
        balance: money(&summary.totals.balance),
        balance_tone: if summary.totals.balance >= BigDecimal::from(0) {
            Tone::Positive
        } else {
            Tone::Negative
        },
    });
    cursor.y = SUMMARY_TOP + 50;

    if filter.include_transactions && !dataset.transactions.is_empty() {
        let rows = dataset
            .transactions
            .iter()
            .take(config.max_transaction_rows)
            .map(|t| {
                (
                    vec![
                        t.date.format("%d/%m/%y").to_string(),
                        printable_text(&t.description, widths.description),
                        printable_label(t.category.as_str(), widths.category),
                        t.kind.label().to_string(),
                        money(&t.amount),
                    ],
                    Some(Tone::of_kind(t.kind)),
                )
            })
            .collect();
        cursor.rows(
            "TRANSACTIONS",
            &["Date", "Description", "Category", "Kind", "Amount"],
            rows,
        );
    }

    if !summary.top_categories.is_empty() {
        cursor.advance(15);
        cursor.break_if_past(CATEGORY_SECTION_LIMIT);
        cursor.put(BlockContent::Heading {
            text: "TOP CATEGORIES".to_string(),
        });
        cursor.advance(10);
        for (index, stats) in summary.top_categories.iter().enumerate() {
            cursor.put(BlockContent::RankedItem {
                rank: index + 1,
                label: printable_label(stats.category.as_str(), usize::MAX),
                amount: money(&stats.net),
            });
            cursor.advance(RANK_HEIGHT);
        }
    }

    if filter.include_clients && !dataset.clients.is_empty() {
        let rows = dataset
            .clients
            .iter()
            .take(config.max_client_rows)
            .map(|c| {
                (
                    vec![
                        printable_text(&c.name, widths.client_name),
                        printable_text(c.email.as_deref().unwrap_or(""), widths.email),
                        printable_text(c.phone.as_deref().unwrap_or(""), widths.phone),
                    ],
                    None,
                )
            })
            .collect();
        cursor.table("CLIENTS", &["Name", "Email", "Phone"], rows);
    }

    if filter.include_projects && !dataset.projects.is_empty() {
        let rows = dataset
            .projects
            .iter()
            .take(config.max_project_rows)
            .map(|p| {
                let client = client_names.get(p.client_id.as_str()).copied().unwrap_or("N/A");
                (
                    vec![
                        printable_text(&p.title, widths.project_title),
                        printable_text(client, widths.project_client),
                        p.status.label().to_uppercase(),
                        money(&p.value),
                    ],
                    None,
                )
            })
            .collect();
        cursor.table("PROJECTS", &["Title", "Client", "Status", "Value"], rows);
    }

    let page_count = cursor.pages.len();
    let footer_title = printable_text(&config.title, 60);
    let pages = cursor
        .pages
        .into_iter()
        .enumerate()
        .map(|(index, blocks)| Page {
            number: index + 1,
            blocks,
            footer: format!("Page {} of {} | {}", index + 1, page_count, footer_title),
            footer_y: FOOTER_Y,
        })
        .collect();

    PrintableDocument {
        file_name: String::new(),
        title: config.title.clone(),
        generated_at: summary.generated_at,
        period_label: summary.period_label.clone(),
        totals: summary.totals.clone(),
        pages,
    }
}
