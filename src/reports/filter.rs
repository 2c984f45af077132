//! Filter surface shared by dashboards and exports, and the period resolver
//! that turns a named date-range mode into a concrete interval.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::*;

/// Named date-range selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodMode {
    #[default]
    All,
    Month,
    #[serde(rename = "last3months")]
    LastThreeMonths,
    Year,
    Custom,
}

impl PeriodMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodMode::All => "all",
            PeriodMode::Month => "month",
            PeriodMode::LastThreeMonths => "last3months",
            PeriodMode::Year => "year",
            PeriodMode::Custom => "custom",
        }
    }
}

impl fmt::Display for PeriodMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodMode {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(PeriodMode::All),
            "month" => Ok(PeriodMode::Month),
            "last3months" => Ok(PeriodMode::LastThreeMonths),
            "year" => Ok(PeriodMode::Year),
            "custom" => Ok(PeriodMode::Custom),
            other => Err(LedgerError::Validation(format!(
                "Unknown period '{}'",
                other
            ))),
        }
    }
}

/// Inclusive instant interval. A `None` bound is open on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateInterval {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl DateInterval {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Interval covering whole calendar days from `first` through `last`
    pub fn from_dates(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            start: Some(start_of_day(first)),
            end: Some(end_of_day(last)),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Whether a calendar date (taken at its first instant) falls inside
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        let instant = start_of_day(date);
        self.start.is_none_or(|start| instant >= start)
            && self.end.is_none_or(|end| instant <= end)
    }

    /// Date bounds suitable for a store query
    pub fn date_bounds(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (self.start.map(|s| s.date()), self.end.map(|e| e.date()))
    }

    /// Human readable description used in report headers
    pub fn describe(&self) -> String {
        let fmt = |instant: NaiveDateTime| instant.format("%d/%m/%Y").to_string();
        match (self.start, self.end) {
            (Some(start), Some(end)) => format!("{} to {}", fmt(start), fmt(end)),
            (Some(start), None) => format!("From {}", fmt(start)),
            (None, Some(end)) => format!("Until {}", fmt(end)),
            (None, None) => "All records".to_string(),
        }
    }
}

/// Resolve a period mode into an interval relative to `now`.
///
/// Custom bounds that are missing or unparseable leave that side open rather
/// than failing.
pub fn resolve_period(
    mode: PeriodMode,
    custom_start: Option<&str>,
    custom_end: Option<&str>,
    now: NaiveDateTime,
) -> DateInterval {
    let today = now.date();
    match mode {
        PeriodMode::All => DateInterval::unbounded(),
        PeriodMode::Month => DateInterval::from_dates(first_of_month(today), last_of_month(today)),
        PeriodMode::LastThreeMonths => {
            DateInterval::from_dates(months_back(today, 2), last_of_month(today))
        }
        PeriodMode::Year => DateInterval::from_dates(
            first_of_year(today),
            first_of_next_year(today) - Duration::days(1),
        ),
        PeriodMode::Custom => DateInterval {
            start: custom_start.and_then(parse_date).map(start_of_day),
            end: custom_end.and_then(parse_date).map(end_of_day),
        },
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(err) => {
            tracing::debug!(input = raw, error = %err, "ignoring unparseable custom date");
            None
        }
    }
}

pub(crate) fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub(crate) fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    start_of_day(date) + Duration::days(1) - Duration::nanoseconds(1)
}

pub(crate) fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

pub(crate) fn first_of_next_month(date: NaiveDate) -> NaiveDate {
    // 32 days past the 1st always lands early in the following month
    let probe = first_of_month(date) + Duration::days(32);
    first_of_month(probe)
}

pub(crate) fn last_of_month(date: NaiveDate) -> NaiveDate {
    first_of_next_month(date) - Duration::days(1)
}

fn first_of_year(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.ordinal0()))
}

fn first_of_next_year(date: NaiveDate) -> NaiveDate {
    let probe = first_of_year(date) + Duration::days(366);
    first_of_year(probe)
}

/// First day of the month `months` before the month of `date`
fn months_back(date: NaiveDate, months: u32) -> NaiveDate {
    let mut cursor = first_of_month(date);
    for _ in 0..months {
        cursor = first_of_month(cursor - Duration::days(1));
    }
    cursor
}

/// Number of days in a calendar month, `None` for an invalid month
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    u32::try_from((first_of_next_month(first) - first).num_days()).ok()
}

/// Transaction-kind filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindFilter {
    #[default]
    All,
    Income,
    Expense,
}

impl KindFilter {
    pub fn matches(&self, kind: TransactionKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Income => kind == TransactionKind::Income,
            KindFilter::Expense => kind == TransactionKind::Expense,
        }
    }
}

impl FromStr for KindFilter {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(KindFilter::All),
            other => other.parse::<TransactionKind>().map(|kind| match kind {
                TransactionKind::Income => KindFilter::Income,
                TransactionKind::Expense => KindFilter::Expense,
            }),
        }
    }
}

/// Everything a report request selects: period, kind and which collections
/// to include
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportFilter {
    pub period: PeriodMode,
    pub custom_start: Option<String>,
    pub custom_end: Option<String>,
    pub kind: KindFilter,
    pub include_transactions: bool,
    pub include_clients: bool,
    pub include_projects: bool,
}

impl Default for ReportFilter {
    fn default() -> Self {
        Self {
            period: PeriodMode::All,
            custom_start: None,
            custom_end: None,
            kind: KindFilter::All,
            include_transactions: true,
            include_clients: true,
            include_projects: true,
        }
    }
}

impl ReportFilter {
    pub fn with_period(mut self, period: PeriodMode) -> Self {
        self.period = period;
        self
    }

    pub fn with_custom_range(mut self, start: Option<&str>, end: Option<&str>) -> Self {
        self.period = PeriodMode::Custom;
        self.custom_start = start.map(str::to_string);
        self.custom_end = end.map(str::to_string);
        self
    }

    pub fn with_kind(mut self, kind: KindFilter) -> Self {
        self.kind = kind;
        self
    }

    pub fn including(mut self, transactions: bool, clients: bool, projects: bool) -> Self {
        self.include_transactions = transactions;
        self.include_clients = clients;
        self.include_projects = projects;
        self
    }

    /// Resolve this filter's period relative to `now`
    pub fn resolve(&self, now: NaiveDateTime) -> DateInterval {
        resolve_period(
            self.period,
            self.custom_start.as_deref(),
            self.custom_end.as_deref(),
            now,
        )
    }

    /// Keep the transactions inside `interval` that match the kind filter,
    /// preserving input order
    pub fn apply(&self, transactions: &[Transaction], interval: &DateInterval) -> Vec<Transaction> {
        transactions
            .iter()
            .filter(|t| interval.contains_date(t.date) && self.kind.matches(t.kind))
            .cloned()
            .collect()
    }

    /// True when at least one included collection has records. Callers use
    /// this to disable export instead of producing an empty document.
    pub fn has_exportable_content(&self, transactions: usize, clients: usize, projects: usize) -> bool {
        (self.include_transactions && transactions > 0)
            || (self.include_clients && clients > 0)
            || (self.include_projects && projects > 0)
    }
}
