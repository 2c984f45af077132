//! Core types and data structures for the ledger engine

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a cash flow. Amounts are always non-negative; the sign of the
/// effect on the balance is carried here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money coming in
    Income,
    /// Money going out
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }

    /// Label used in exported documents
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::Income => "Income",
            TransactionKind::Expense => "Expense",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(LedgerError::Validation(format!(
                "Unknown transaction kind '{}'",
                other
            ))),
        }
    }
}

/// Free-form category label, normalized to uppercase so grouping is
/// case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Category(String);

impl Category {
    /// Create a category, trimming and uppercasing the raw label
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(Self::normalize(raw.as_ref()))
    }

    /// Normalization applied at the point of entry. Idempotent.
    pub fn normalize(raw: &str) -> String {
        raw.trim().to_uppercase()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Category::new(value)
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Category::new(value)
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A customer the business works for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    /// Unique identifier for the client
    pub id: String,
    /// Owning account
    pub owner_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    /// When the client was created
    pub created_at: DateTime<Utc>,
}

impl Client {
    /// Create a new client with a fresh identifier
    pub fn new(owner_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            name: name.into(),
            email: None,
            phone: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Lifecycle of a project. Transitions drive reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    InProgress,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    /// Label used in exported documents
    pub fn label(&self) -> &'static str {
        match self {
            ProjectStatus::InProgress => "In Progress",
            ProjectStatus::Completed => "Completed",
            ProjectStatus::Cancelled => "Cancelled",
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in_progress" => Ok(ProjectStatus::InProgress),
            "completed" => Ok(ProjectStatus::Completed),
            "cancelled" => Ok(ProjectStatus::Cancelled),
            other => Err(LedgerError::Validation(format!(
                "Unknown project status '{}'",
                other
            ))),
        }
    }
}

/// A piece of billable work for a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub owner_id: String,
    /// Client this project is billed to
    pub client_id: String,
    pub title: String,
    pub description: String,
    /// Agreed value, never negative
    pub value: BigDecimal,
    pub status: ProjectStatus,
    pub deadline: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Create a new in-progress project
    pub fn new(
        owner_id: impl Into<String>,
        client_id: impl Into<String>,
        title: impl Into<String>,
        value: BigDecimal,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            client_id: client_id.into(),
            title: title.into(),
            description: String::new(),
            value,
            status: ProjectStatus::InProgress,
            deadline: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = status;
        self
    }
}

/// The kind of state change that synthesizes a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEventKind {
    /// A project moved to `completed`
    ProjectCompleted,
    /// A scheduled transaction was marked `paid`
    ScheduledPaid,
}

impl LedgerEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEventKind::ProjectCompleted => "project_completed",
            LedgerEventKind::ScheduledPaid => "scheduled_paid",
        }
    }
}

/// Back reference from a derived transaction to the entity event that
/// produced it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionOrigin {
    pub event: LedgerEventKind,
    /// Id of the originating project or scheduled transaction
    pub source_id: String,
}

impl TransactionOrigin {
    pub fn project_completed(project_id: impl Into<String>) -> Self {
        Self {
            event: LedgerEventKind::ProjectCompleted,
            source_id: project_id.into(),
        }
    }

    pub fn scheduled_paid(scheduled_id: impl Into<String>) -> Self {
        Self {
            event: LedgerEventKind::ScheduledPaid,
            source_id: scheduled_id.into(),
        }
    }

    /// Deterministic idempotency key for this origin
    pub fn key(&self) -> String {
        format!("{}:{}", self.event.as_str(), self.source_id)
    }
}

/// A realized cash flow in the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier for the transaction
    pub id: String,
    pub owner_id: String,
    pub description: String,
    /// Always >= 0
    pub amount: BigDecimal,
    pub kind: TransactionKind,
    pub category: Category,
    /// Calendar date the cash flow happened
    pub date: NaiveDate,
    /// Set when the transaction was synthesized by reconciliation
    pub origin: Option<TransactionOrigin>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new manually entered transaction
    pub fn new(
        owner_id: impl Into<String>,
        description: impl Into<String>,
        amount: BigDecimal,
        kind: TransactionKind,
        category: impl Into<Category>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            description: description.into(),
            amount,
            kind,
            category: category.into(),
            date,
            origin: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionKind::Income
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Expense
    }
}

/// Persisted state of a scheduled transaction. `overdue` is never stored; it
/// is derived at read time, see [`ScheduledTransaction::display_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduledStatus {
    #[serde(alias = "overdue")]
    Scheduled,
    Paid,
}

impl FromStr for ScheduledStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" | "overdue" => Ok(ScheduledStatus::Scheduled),
            "paid" => Ok(ScheduledStatus::Paid),
            other => Err(LedgerError::Validation(format!(
                "Unknown scheduled status '{}'",
                other
            ))),
        }
    }
}

/// Read-time classification of a scheduled transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    Scheduled,
    Paid,
    Overdue,
}

/// A future-dated financial intention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTransaction {
    pub id: String,
    pub owner_id: String,
    pub description: String,
    pub amount: BigDecimal,
    pub kind: TransactionKind,
    pub category: Category,
    /// UTC midnight of the scheduled calendar date
    pub scheduled_date: DateTime<Utc>,
    pub status: ScheduledStatus,
    pub created_at: DateTime<Utc>,
}

impl ScheduledTransaction {
    /// Create a new scheduled item for the given calendar date
    pub fn new(
        owner_id: impl Into<String>,
        description: impl Into<String>,
        amount: BigDecimal,
        kind: TransactionKind,
        category: impl Into<Category>,
        scheduled_on: NaiveDate,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            description: description.into(),
            amount,
            kind,
            category: category.into(),
            scheduled_date: utc_midnight(scheduled_on),
            status: ScheduledStatus::Scheduled,
            created_at: Utc::now(),
        }
    }

    /// The calendar date this item is scheduled for, read in UTC
    pub fn scheduled_on(&self) -> NaiveDate {
        self.scheduled_date.date_naive()
    }

    pub fn is_paid(&self) -> bool {
        self.status == ScheduledStatus::Paid
    }

    pub fn display_status(&self, now: DateTime<Utc>) -> DisplayStatus {
        match self.status {
            ScheduledStatus::Paid => DisplayStatus::Paid,
            ScheduledStatus::Scheduled if self.scheduled_date < now => DisplayStatus::Overdue,
            ScheduledStatus::Scheduled => DisplayStatus::Scheduled,
        }
    }
}

/// Absolute instant at UTC midnight of `date`
pub fn utc_midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Pending derived-transaction write, keyed by its origin's idempotency key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub owner_id: String,
    pub origin: TransactionOrigin,
    pub description: String,
    pub amount: BigDecimal,
    pub kind: TransactionKind,
    pub category: Category,
    /// Date the synthesized transaction will carry
    pub occurred_on: NaiveDate,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEvent {
    pub fn key(&self) -> String {
        self.origin.key()
    }

    /// The transaction this event synthesizes
    pub fn to_transaction(&self) -> Transaction {
        let mut transaction = Transaction::new(
            self.owner_id.clone(),
            self.description.clone(),
            self.amount.clone(),
            self.kind,
            self.category.clone(),
            self.occurred_on,
        );
        transaction.origin = Some(self.origin.clone());
        transaction.created_at = self.recorded_at;
        transaction
    }
}

/// Errors that can occur in the ledger engine
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Client not found: {0}")]
    ClientNotFound(String),
    #[error("Project not found: {0}")]
    ProjectNotFound(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("Scheduled transaction not found: {0}")]
    ScheduledNotFound(String),
    #[error("{entity} {id} was saved but its ledger entry was not recorded: {reason}")]
    PartialReconciliation {
        entity: &'static str,
        id: String,
        reason: String,
    },
    #[error("Export failed: {0}")]
    Export(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    /// True when the primary write went through but the derived entry did not
    pub fn is_partial(&self) -> bool {
        matches!(self, LedgerError::PartialReconciliation { .. })
    }

    /// Short notification text for the user action that failed
    pub fn user_message(&self) -> String {
        match self {
            LedgerError::Validation(message) => message.clone(),
            LedgerError::PartialReconciliation { entity, .. } => format!(
                "The {} was saved, but its ledger entry could not be recorded. Check the transaction history.",
                entity
            ),
            LedgerError::Export(_) => "The report could not be exported. Try again later.".to_string(),
            LedgerError::Config(message) => format!("Invalid configuration: {}", message),
            LedgerError::ClientNotFound(_)
            | LedgerError::ProjectNotFound(_)
            | LedgerError::TransactionNotFound(_)
            | LedgerError::ScheduledNotFound(_) => "The record no longer exists.".to_string(),
            LedgerError::Storage(_) => "The operation failed. Try again later.".to_string(),
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_normalization_is_idempotent() {
        let once = Category::new("  aluguel ");
        let twice = Category::new(once.as_str());
        assert_eq!(once.as_str(), "ALUGUEL");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_category_deserializes_normalized() {
        let category: Category = serde_json::from_str("\"Projeto\"").unwrap();
        assert_eq!(category.as_str(), "PROJETO");
    }

    #[test]
    fn test_legacy_overdue_status_reads_as_scheduled() {
        let status: ScheduledStatus = serde_json::from_str("\"overdue\"").unwrap();
        assert_eq!(status, ScheduledStatus::Scheduled);
        assert_eq!(
            serde_json::to_string(&ScheduledStatus::Scheduled).unwrap(),
            "\"scheduled\""
        );
    }

    #[test]
    fn test_scheduled_date_is_utc_midnight() {
        let item = ScheduledTransaction::new(
            "owner",
            "Rent",
            BigDecimal::from(500),
            TransactionKind::Expense,
            "aluguel",
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
        );
        assert_eq!(item.scheduled_date.to_rfc3339(), "2024-03-10T00:00:00+00:00");
        assert_eq!(item.category.as_str(), "ALUGUEL");
    }

    #[test]
    fn test_display_status_is_derived() {
        let mut item = ScheduledTransaction::new(
            "owner",
            "Hosting",
            BigDecimal::from(30),
            TransactionKind::Expense,
            "SUBSCRIPTIONS",
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        );
        let now = utc_midnight(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(item.display_status(now), DisplayStatus::Overdue);

        item.status = ScheduledStatus::Paid;
        assert_eq!(item.display_status(now), DisplayStatus::Paid);
    }

    #[test]
    fn test_origin_key_is_deterministic() {
        let origin = TransactionOrigin::project_completed("p-1");
        assert_eq!(origin.key(), "project_completed:p-1");
        assert_eq!(origin.key(), TransactionOrigin::project_completed("p-1").key());
    }

    #[test]
    fn test_partial_error_message() {
        let err = LedgerError::PartialReconciliation {
            entity: "project",
            id: "p-1".to_string(),
            reason: "store offline".to_string(),
        };
        assert!(err.is_partial());
        assert!(err.user_message().contains("transaction history"));
    }
}
