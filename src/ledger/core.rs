//! Main ledger orchestrator that coordinates clients, transactions,
//! reconciliation and reporting for one account

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::alerts::{compute_alerts_within, ScheduleAlerts};
use crate::config::EngineConfig;
use crate::events::ChangeNotifier;
use crate::ledger::{ClientManager, TransactionManager};
use crate::reconciliation::{ApplyOutcome, ReconciliationOutcome, ReconciliationService};
use crate::reports::aggregation::*;
use crate::reports::export::{ExportBundle, ExportDataset, ExportGenerator};
use crate::reports::filter::ReportFilter;
use crate::reports::search::*;
use crate::session::{quick_stats, LedgerSession, QuickStats};
use crate::traits::*;
use crate::types::*;
use crate::utils::SystemClock;

/// Everything the dashboard shows, computed from one read of the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    /// Totals for the current calendar month
    pub month_totals: PeriodTotals,
    pub pending_scheduled: usize,
    /// Current year, January through December
    pub monthly: Vec<MonthlyBucket>,
    /// Current month, one bucket per day
    pub daily: Vec<DailyBucket>,
    /// Newest first
    pub recent_transactions: Vec<Transaction>,
    /// Unpaid scheduled items, soonest first
    pub next_scheduled: Vec<ScheduledTransaction>,
    pub alerts: ScheduleAlerts,
}

/// Main ledger system scoped to a single account
pub struct Ledger<S: LedgerStorage> {
    owner_id: String,
    storage: S,
    clock: Arc<dyn Clock>,
    notifier: ChangeNotifier,
    config: EngineConfig,
    client_manager: ClientManager<S>,
    transaction_manager: TransactionManager<S>,
    reconciliation: ReconciliationService<S>,
    exporter: ExportGenerator,
}

impl<S: LedgerStorage + Clone> Ledger<S> {
    /// Create a new ledger with the system clock and default configuration
    pub fn new(storage: S, owner_id: impl Into<String>) -> Self {
        Self::with_config(storage, owner_id, Arc::new(SystemClock), EngineConfig::default())
    }

    /// Create a new ledger with an explicit clock and configuration
    pub fn with_config(
        storage: S,
        owner_id: impl Into<String>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self::with_validator(storage, owner_id, clock, config, DefaultRecordValidator)
    }

    /// Create a new ledger with a custom validator used for every write
    pub fn with_validator<V>(
        storage: S,
        owner_id: impl Into<String>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
        validator: V,
    ) -> Self
    where
        V: RecordValidator + Clone + 'static,
    {
        let notifier = ChangeNotifier::new();
        Self {
            owner_id: owner_id.into(),
            client_manager: ClientManager::with_validator(
                storage.clone(),
                clock.clone(),
                notifier.clone(),
                Box::new(validator.clone()),
            ),
            transaction_manager: TransactionManager::with_validator(
                storage.clone(),
                clock.clone(),
                notifier.clone(),
                Box::new(validator.clone()),
            ),
            reconciliation: ReconciliationService::with_validator(
                storage.clone(),
                clock.clone(),
                notifier.clone(),
                config.reconciliation.project_category(),
                Box::new(validator),
            ),
            exporter: ExportGenerator::new(config.export.clone()),
            storage,
            clock,
            notifier,
            config,
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Change notifications published by this ledger's writes
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    // Client operations
    /// Create a new client owned by this account
    pub async fn create_client(&mut self, mut client: Client) -> LedgerResult<Client> {
        client.owner_id = self.owner_id.clone();
        self.client_manager.create_client(&client).await?;
        Ok(client)
    }

    pub async fn get_client(&self, client_id: &str) -> LedgerResult<Option<Client>> {
        self.client_manager.get_client(&self.owner_id, client_id).await
    }

    /// List all clients, ordered by name
    pub async fn list_clients(&self) -> LedgerResult<Vec<Client>> {
        self.client_manager.list_clients(&self.owner_id).await
    }

    pub async fn update_client(&mut self, client: &Client) -> LedgerResult<()> {
        self.ensure_owned(&client.owner_id)?;
        self.client_manager.update_client(client).await
    }

    pub async fn delete_client(&mut self, client_id: &str) -> LedgerResult<()> {
        self.client_manager
            .delete_client(&self.owner_id, client_id)
            .await
    }

    // Transaction operations
    /// Record a manually entered transaction
    pub async fn record_transaction(&mut self, mut transaction: Transaction) -> LedgerResult<Transaction> {
        transaction.owner_id = self.owner_id.clone();
        self.transaction_manager
            .record_transaction(&transaction)
            .await?;
        Ok(transaction)
    }

    pub async fn get_transaction(&self, transaction_id: &str) -> LedgerResult<Option<Transaction>> {
        self.transaction_manager
            .get_transaction(&self.owner_id, transaction_id)
            .await
    }

    /// Get transactions within an inclusive date range, newest first
    pub async fn list_transactions(
        &self,
        start_date: Option<chrono::NaiveDate>,
        end_date: Option<chrono::NaiveDate>,
    ) -> LedgerResult<Vec<Transaction>> {
        self.transaction_manager
            .list_transactions(&self.owner_id, start_date, end_date)
            .await
    }

    /// Transactions matching a report filter's period and kind, newest first
    pub async fn filtered_transactions(&self, filter: &ReportFilter) -> LedgerResult<Vec<Transaction>> {
        let interval = filter.resolve(self.clock.now().naive_utc());
        let (start, end) = interval.date_bounds();
        let transactions = self.list_transactions(start, end).await?;
        Ok(filter.apply(&transactions, &interval))
    }

    pub async fn delete_transaction(&mut self, transaction_id: &str) -> LedgerResult<()> {
        self.reconciliation
            .delete_transaction(&self.owner_id, transaction_id)
            .await
    }

    // Project operations
    /// Create or update a project and reconcile its ledger entry
    pub async fn save_project(&mut self, mut project: Project) -> LedgerResult<ReconciliationOutcome> {
        project.owner_id = self.owner_id.clone();
        let previous = self
            .storage
            .get_project(&self.owner_id, &project.id)
            .await?
            .map(|p| p.status);
        self.reconciliation.on_project_saved(&project, previous).await
    }

    /// Change only the status of a stored project
    pub async fn set_project_status(
        &mut self,
        project_id: &str,
        status: ProjectStatus,
    ) -> LedgerResult<ReconciliationOutcome> {
        let project = self.get_project_required(project_id).await?;
        let previous = project.status;
        let project = project.with_status(status);
        self.reconciliation
            .on_project_saved(&project, Some(previous))
            .await
    }

    pub async fn get_project(&self, project_id: &str) -> LedgerResult<Option<Project>> {
        self.storage.get_project(&self.owner_id, project_id).await
    }

    pub async fn get_project_required(&self, project_id: &str) -> LedgerResult<Project> {
        self.get_project(project_id)
            .await?
            .ok_or_else(|| LedgerError::ProjectNotFound(project_id.to_string()))
    }

    /// List projects, newest first
    pub async fn list_projects(&self, status: Option<ProjectStatus>) -> LedgerResult<Vec<Project>> {
        self.storage.list_projects(&self.owner_id, status).await
    }

    pub async fn delete_project(&mut self, project_id: &str) -> LedgerResult<()> {
        self.reconciliation
            .delete_project(&self.owner_id, project_id)
            .await
    }

    /// Portfolio counts and total value over every project
    pub async fn project_stats(&self) -> LedgerResult<ProjectStats> {
        Ok(project_stats(&self.list_projects(None).await?))
    }

    // Scheduling operations
    /// Schedule a future transaction
    pub async fn schedule(&mut self, mut item: ScheduledTransaction) -> LedgerResult<ScheduledTransaction> {
        item.owner_id = self.owner_id.clone();
        item.status = ScheduledStatus::Scheduled;
        self.transaction_manager.schedule(&item).await?;
        Ok(item)
    }

    /// List scheduled items, soonest first
    pub async fn list_scheduled(&self) -> LedgerResult<Vec<ScheduledTransaction>> {
        self.transaction_manager
            .list_scheduled(&self.owner_id)
            .await
    }

    pub async fn set_scheduled_status(
        &mut self,
        scheduled_id: &str,
        status: ScheduledStatus,
    ) -> LedgerResult<ReconciliationOutcome> {
        let item = self
            .transaction_manager
            .get_scheduled_required(&self.owner_id, scheduled_id)
            .await?;
        self.reconciliation
            .on_scheduled_status_changed(&item, status)
            .await
    }

    /// Mark a scheduled item paid, posting its transaction
    pub async fn mark_paid(&mut self, scheduled_id: &str) -> LedgerResult<ReconciliationOutcome> {
        self.set_scheduled_status(scheduled_id, ScheduledStatus::Paid)
            .await
    }

    pub async fn delete_scheduled(&mut self, scheduled_id: &str) -> LedgerResult<()> {
        self.reconciliation
            .delete_scheduled_transaction(&self.owner_id, scheduled_id)
            .await
    }

    /// Finish derived ledger writes left pending by a partial failure
    pub async fn retry_pending(&mut self) -> LedgerResult<Vec<ApplyOutcome>> {
        self.reconciliation.retry_pending(&self.owner_id).await
    }

    // Reporting operations
    /// Overdue and upcoming scheduled items relative to now
    pub async fn alerts(&self) -> LedgerResult<ScheduleAlerts> {
        let scheduled = self.list_scheduled().await?;
        Ok(compute_alerts_within(
            &scheduled,
            self.clock.now(),
            self.config.alerts.upcoming_window(),
        ))
    }

    pub async fn quick_stats(&self) -> LedgerResult<QuickStats> {
        quick_stats(&self.storage, &self.owner_id, self.clock.today()).await
    }

    // Search operations
    pub async fn search_clients(&self, term: &str) -> LedgerResult<Vec<Client>> {
        Ok(search_clients(&self.list_clients().await?, &SearchQuery::new(term)))
    }

    /// Projects matching on title, client name or status label
    pub async fn search_projects(&self, term: &str) -> LedgerResult<Vec<Project>> {
        let projects = self.list_projects(None).await?;
        let clients = self.list_clients().await?;
        Ok(search_projects(&projects, &clients, &SearchQuery::new(term)))
    }

    pub async fn search_scheduled(&self, term: &str) -> LedgerResult<Vec<ScheduledTransaction>> {
        Ok(search_scheduled(&self.list_scheduled().await?, &SearchQuery::new(term)))
    }

    /// Transactions matching on description or category, newest first
    pub async fn search_transactions(&self, term: &str) -> LedgerResult<Vec<Transaction>> {
        let transactions = self.list_transactions(None, None).await?;
        Ok(search_transactions(&transactions, &SearchQuery::new(term)))
    }

    /// Dashboard figures for the current month and year
    pub async fn dashboard(&self, recent_limit: usize) -> LedgerResult<DashboardSnapshot> {
        let now = self.clock.now();
        let today = now.date_naive();
        let transactions = self.list_transactions(None, None).await?;
        let scheduled = self.list_scheduled().await?;

        let this_month: Vec<Transaction> = transactions
            .iter()
            .filter(|t| t.date.year() == today.year() && t.date.month() == today.month())
            .cloned()
            .collect();
        let unpaid: Vec<ScheduledTransaction> =
            scheduled.iter().filter(|s| !s.is_paid()).cloned().collect();

        Ok(DashboardSnapshot {
            month_totals: period_totals(&this_month),
            pending_scheduled: unpaid.len(),
            monthly: monthly_rollup(&transactions, today.year()),
            daily: daily_rollup(&this_month, today.year(), today.month())?,
            recent_transactions: transactions.iter().take(recent_limit).cloned().collect(),
            alerts: compute_alerts_within(&scheduled, now, self.config.alerts.upcoming_window()),
            next_scheduled: unpaid.into_iter().take(recent_limit).collect(),
        })
    }

    /// Generate both export documents for `filter`.
    ///
    /// Fails with a validation error when none of the included collections
    /// has records, so callers can disable the action instead.
    pub async fn export(&self, filter: &ReportFilter) -> LedgerResult<ExportBundle> {
        let generated_at = self.clock.now();
        let interval = filter.resolve(generated_at.naive_utc());
        let (start, end) = interval.date_bounds();

        let read = async {
            let transactions = self.list_transactions(start, end).await?;
            let clients = self.list_clients().await?;
            let projects = self.list_projects(None).await?;
            Ok::<_, LedgerError>((transactions, clients, projects))
        };
        let (transactions, clients, projects) = read.await.map_err(|err| {
            tracing::warn!(error = %err, "export aborted while reading records");
            LedgerError::Export(err.to_string())
        })?;

        let transactions = filter.apply(&transactions, &interval);
        if !filter.has_exportable_content(transactions.len(), clients.len(), projects.len()) {
            return Err(LedgerError::Validation(
                "There is nothing to export for the selected filters".to_string(),
            ));
        }

        let dataset = ExportDataset {
            transactions,
            clients,
            projects,
        };
        Ok(self.exporter.generate(filter, interval, &dataset, generated_at))
    }

    /// Generate and write both documents into `dir`
    pub async fn export_to(&self, filter: &ReportFilter, dir: impl AsRef<Path>) -> LedgerResult<Vec<PathBuf>> {
        self.export(filter).await?.save_to(dir)
    }

    /// Start a live stats session fed by this ledger's change notifications
    pub fn spawn_session(&self) -> LedgerSession
    where
        S: 'static,
    {
        LedgerSession::spawn(
            self.storage.clone(),
            self.owner_id.clone(),
            self.clock.clone(),
            &self.notifier,
            self.config.session.clone(),
        )
    }

    fn ensure_owned(&self, owner_id: &str) -> LedgerResult<()> {
        if owner_id == self.owner_id {
            Ok(())
        } else {
            Err(LedgerError::Validation(
                "Record belongs to another account".to_string(),
            ))
        }
    }
}
