//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::types::*;
use crate::utils::validation;

/// Storage abstraction for the ledger engine
///
/// Every method is scoped by the owning account. Record ids are unique across
/// accounts: a `create_*` whose id is already stored fails with
/// `LedgerError::Storage`, whoever owns the existing record. Implementations
/// hold no business logic; reconciliation and aggregation live above this
/// trait.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Persist a new client and return its id
    async fn create_client(&mut self, client: &Client) -> LedgerResult<String>;

    async fn get_client(&self, owner_id: &str, client_id: &str) -> LedgerResult<Option<Client>>;

    /// List all clients of an owner, ordered by name
    async fn list_clients(&self, owner_id: &str) -> LedgerResult<Vec<Client>>;

    async fn update_client(&mut self, client: &Client) -> LedgerResult<()>;

    /// Delete a client. Projects referencing it are left untouched.
    async fn delete_client(&mut self, owner_id: &str, client_id: &str) -> LedgerResult<()>;

    /// Persist a new project. Fails with `ClientNotFound` if the referenced
    /// client does not belong to the owner.
    async fn create_project(&mut self, project: &Project) -> LedgerResult<String>;

    async fn get_project(&self, owner_id: &str, project_id: &str) -> LedgerResult<Option<Project>>;

    /// List projects, newest first, optionally filtered by status
    async fn list_projects(
        &self,
        owner_id: &str,
        status: Option<ProjectStatus>,
    ) -> LedgerResult<Vec<Project>>;

    async fn update_project(&mut self, project: &Project) -> LedgerResult<()>;

    async fn delete_project(&mut self, owner_id: &str, project_id: &str) -> LedgerResult<()>;

    /// Save a transaction to storage
    async fn create_transaction(&mut self, transaction: &Transaction) -> LedgerResult<String>;

    async fn get_transaction(
        &self,
        owner_id: &str,
        transaction_id: &str,
    ) -> LedgerResult<Option<Transaction>>;

    /// List transactions within an inclusive date range, newest first
    async fn list_transactions(
        &self,
        owner_id: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<Vec<Transaction>>;

    /// Index lookup of the transaction synthesized by a given entity event.
    /// At most one transaction per owner and origin may exist.
    async fn find_transaction_by_origin(
        &self,
        owner_id: &str,
        origin: &TransactionOrigin,
    ) -> LedgerResult<Option<Transaction>>;

    async fn delete_transaction(&mut self, owner_id: &str, transaction_id: &str)
        -> LedgerResult<()>;

    async fn create_scheduled(&mut self, item: &ScheduledTransaction) -> LedgerResult<String>;

    async fn get_scheduled(
        &self,
        owner_id: &str,
        scheduled_id: &str,
    ) -> LedgerResult<Option<ScheduledTransaction>>;

    /// List scheduled items in ascending scheduled-date order
    async fn list_scheduled(&self, owner_id: &str) -> LedgerResult<Vec<ScheduledTransaction>>;

    /// Patch the status of a scheduled item
    async fn update_scheduled_status(
        &mut self,
        owner_id: &str,
        scheduled_id: &str,
        status: ScheduledStatus,
    ) -> LedgerResult<()>;

    async fn delete_scheduled(&mut self, owner_id: &str, scheduled_id: &str) -> LedgerResult<()>;

    /// Append an event to the outbox. Enqueuing an event whose key is already
    /// pending replaces it.
    async fn enqueue_event(&mut self, event: &LedgerEvent) -> LedgerResult<()>;

    /// Events not yet applied, oldest first
    async fn pending_events(&self, owner_id: &str) -> LedgerResult<Vec<LedgerEvent>>;

    /// Remove an event from the outbox. Unknown keys are ignored.
    async fn complete_event(&mut self, owner_id: &str, key: &str) -> LedgerResult<()>;
}

/// Trait for implementing custom record validation rules, run before any
/// store write
pub trait RecordValidator: Send + Sync {
    fn validate_client(&self, client: &Client) -> LedgerResult<()>;

    fn validate_project(&self, project: &Project) -> LedgerResult<()>;

    fn validate_transaction(&self, transaction: &Transaction) -> LedgerResult<()>;

    fn validate_scheduled(&self, item: &ScheduledTransaction) -> LedgerResult<()>;
}

/// Default validator with the basic required-field and amount rules
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRecordValidator;

impl RecordValidator for DefaultRecordValidator {
    fn validate_client(&self, client: &Client) -> LedgerResult<()> {
        validation::validate_required("Client name", &client.name)
    }

    fn validate_project(&self, project: &Project) -> LedgerResult<()> {
        validation::validate_required("Project title", &project.title)?;
        validation::validate_required("Project client", &project.client_id)?;
        validation::validate_non_negative_amount("Project value", &project.value)
    }

    fn validate_transaction(&self, transaction: &Transaction) -> LedgerResult<()> {
        validation::validate_required("Transaction description", &transaction.description)?;
        validation::validate_non_negative_amount("Transaction amount", &transaction.amount)?;
        validation::validate_category(&transaction.category)
    }

    fn validate_scheduled(&self, item: &ScheduledTransaction) -> LedgerResult<()> {
        validation::validate_required("Scheduled description", &item.description)?;
        validation::validate_non_negative_amount("Scheduled amount", &item.amount)?;
        validation::validate_category(&item.category)
    }
}

/// Clock abstracts access to the current instant so services stay
/// deterministic in tests.
pub trait Clock: Send + Sync {
    /// Returns the current UTC timestamp.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the current UTC date. Defaults to `now().date_naive()`.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}
