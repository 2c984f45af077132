//! Reconciliation keeps the transaction ledger consistent with project and
//! scheduled-item state changes.
//!
//! Every derived transaction is described by a [`LedgerEvent`] that is first
//! written to the store's outbox and then applied. Applying is idempotent:
//! the derived transaction carries a [`TransactionOrigin`] and an event whose
//! origin is already in the ledger is only marked complete. A failed apply
//! leaves the event pending so [`ReconciliationService::retry_pending`] can
//! finish it later without duplicating entries.

use std::sync::Arc;

use crate::events::{ChangeNotifier, ChangeSource};
use crate::traits::*;
use crate::types::*;

/// Result of applying a single ledger event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A new transaction was created
    Applied(String),
    /// The origin was already in the ledger; nothing was written
    AlreadyApplied(String),
}

impl ApplyOutcome {
    pub fn transaction_id(&self) -> &str {
        match self {
            ApplyOutcome::Applied(id) | ApplyOutcome::AlreadyApplied(id) => id,
        }
    }
}

/// Ledger effect of a project save or scheduled status change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// The entity was saved with no ledger effect
    Saved,
    /// A derived transaction was posted (or found already posted)
    Posted(ApplyOutcome),
    /// A derived transaction was removed. `None` when nothing was linked.
    Reversed(Option<String>),
}

pub struct ReconciliationService<S: LedgerStorage> {
    storage: S,
    clock: Arc<dyn Clock>,
    notifier: ChangeNotifier,
    project_category: Category,
    validator: Box<dyn RecordValidator>,
}

impl<S: LedgerStorage> ReconciliationService<S> {
    pub fn new(
        storage: S,
        clock: Arc<dyn Clock>,
        notifier: ChangeNotifier,
        project_category: Category,
    ) -> Self {
        Self::with_validator(
            storage,
            clock,
            notifier,
            project_category,
            Box::new(DefaultRecordValidator),
        )
    }

    pub fn with_validator(
        storage: S,
        clock: Arc<dyn Clock>,
        notifier: ChangeNotifier,
        project_category: Category,
        validator: Box<dyn RecordValidator>,
    ) -> Self {
        Self {
            storage,
            clock,
            notifier,
            project_category,
            validator,
        }
    }

    /// Persist a project and reconcile its ledger entry.
    ///
    /// `previous_status` is `None` for a project that does not exist yet.
    /// Completing posts one income transaction dated today; cancelling
    /// removes the transaction linked to the project's completion.
    pub async fn on_project_saved(
        &mut self,
        project: &Project,
        previous_status: Option<ProjectStatus>,
    ) -> LedgerResult<ReconciliationOutcome> {
        self.validator.validate_project(project)?;

        match previous_status {
            None => {
                self.storage.create_project(project).await?;
            }
            Some(_) => self.storage.update_project(project).await?,
        }
        self.publish(&project.owner_id, ChangeSource::Project);
        tracing::debug!(
            project_id = %project.id,
            status = ?project.status,
            ?previous_status,
            "project saved"
        );

        match project.status {
            ProjectStatus::Completed => {
                let event = self.completion_event(project);
                self.post(&event, "project", &project.id).await
            }
            ProjectStatus::Cancelled => self
                .reverse(
                    &project.owner_id,
                    &TransactionOrigin::project_completed(&project.id),
                    "project",
                )
                .await
                .map(ReconciliationOutcome::Reversed),
            ProjectStatus::InProgress => Ok(ReconciliationOutcome::Saved),
        }
    }

    /// Persist a scheduled item's new status. Marking it paid posts one
    /// transaction copying the item, dated today. A paid item cannot go back
    /// to scheduled.
    pub async fn on_scheduled_status_changed(
        &mut self,
        item: &ScheduledTransaction,
        new_status: ScheduledStatus,
    ) -> LedgerResult<ReconciliationOutcome> {
        let current = self
            .storage
            .get_scheduled(&item.owner_id, &item.id)
            .await?
            .ok_or_else(|| LedgerError::ScheduledNotFound(item.id.clone()))?;

        if current.is_paid() && new_status == ScheduledStatus::Scheduled {
            return Err(LedgerError::Validation(
                "A paid scheduled transaction cannot be reopened".to_string(),
            ));
        }

        self.storage
            .update_scheduled_status(&current.owner_id, &current.id, new_status)
            .await?;
        self.publish(&current.owner_id, ChangeSource::Scheduled);

        match new_status {
            ScheduledStatus::Paid => {
                let event = self.payment_event(&current);
                self.post(&event, "scheduled transaction", &current.id).await
            }
            ScheduledStatus::Scheduled => Ok(ReconciliationOutcome::Saved),
        }
    }

    /// Write the transaction described by `event` unless its origin is
    /// already in the ledger, then mark the event complete
    pub async fn apply_ledger_event(&mut self, event: &LedgerEvent) -> LedgerResult<ApplyOutcome> {
        let key = event.key();

        if let Some(existing) = self
            .storage
            .find_transaction_by_origin(&event.owner_id, &event.origin)
            .await?
        {
            self.storage.complete_event(&event.owner_id, &key).await?;
            tracing::debug!(%key, transaction_id = %existing.id, "ledger event already applied");
            return Ok(ApplyOutcome::AlreadyApplied(existing.id));
        }

        let transaction = event.to_transaction();
        self.validator.validate_transaction(&transaction)?;
        let id = self.storage.create_transaction(&transaction).await?;
        self.storage.complete_event(&event.owner_id, &key).await?;
        self.publish(&event.owner_id, ChangeSource::Transaction);

        tracing::info!(%key, transaction_id = %id, amount = %event.amount, "ledger event applied");
        Ok(ApplyOutcome::Applied(id))
    }

    /// Re-apply every pending event of `owner_id`, oldest first. Stops at the
    /// first failure; events not yet applied stay pending.
    pub async fn retry_pending(&mut self, owner_id: &str) -> LedgerResult<Vec<ApplyOutcome>> {
        let pending = self.storage.pending_events(owner_id).await?;
        let mut outcomes = Vec::with_capacity(pending.len());
        for event in &pending {
            outcomes.push(self.apply_ledger_event(event).await?);
        }
        if !outcomes.is_empty() {
            tracing::info!(owner_id, replayed = outcomes.len(), "pending ledger events replayed");
        }
        Ok(outcomes)
    }

    /// Hard delete a project. Its ledger entry is kept; a pending completion
    /// event is discarded.
    pub async fn delete_project(&mut self, owner_id: &str, project_id: &str) -> LedgerResult<()> {
        self.storage.delete_project(owner_id, project_id).await?;
        self.storage
            .complete_event(owner_id, &TransactionOrigin::project_completed(project_id).key())
            .await?;
        self.publish(owner_id, ChangeSource::Project);
        Ok(())
    }

    /// Hard delete a scheduled item. A transaction already posted for it is
    /// kept.
    pub async fn delete_scheduled_transaction(
        &mut self,
        owner_id: &str,
        scheduled_id: &str,
    ) -> LedgerResult<()> {
        self.storage.delete_scheduled(owner_id, scheduled_id).await?;
        self.storage
            .complete_event(owner_id, &TransactionOrigin::scheduled_paid(scheduled_id).key())
            .await?;
        self.publish(owner_id, ChangeSource::Scheduled);
        Ok(())
    }

    pub async fn delete_transaction(
        &mut self,
        owner_id: &str,
        transaction_id: &str,
    ) -> LedgerResult<()> {
        self.storage
            .delete_transaction(owner_id, transaction_id)
            .await?;
        self.publish(owner_id, ChangeSource::Transaction);
        Ok(())
    }

    fn completion_event(&self, project: &Project) -> LedgerEvent {
        LedgerEvent {
            owner_id: project.owner_id.clone(),
            origin: TransactionOrigin::project_completed(&project.id),
            description: project.title.clone(),
            amount: project.value.clone(),
            kind: TransactionKind::Income,
            category: self.project_category.clone(),
            occurred_on: self.clock.today(),
            recorded_at: self.clock.now(),
        }
    }

    fn payment_event(&self, item: &ScheduledTransaction) -> LedgerEvent {
        LedgerEvent {
            owner_id: item.owner_id.clone(),
            origin: TransactionOrigin::scheduled_paid(&item.id),
            description: item.description.clone(),
            amount: item.amount.clone(),
            kind: item.kind,
            category: item.category.clone(),
            occurred_on: self.clock.today(),
            recorded_at: self.clock.now(),
        }
    }

    /// Enqueue then apply. The entity is already saved at this point, so any
    /// failure is reported as partial.
    async fn post(
        &mut self,
        event: &LedgerEvent,
        entity: &'static str,
        entity_id: &str,
    ) -> LedgerResult<ReconciliationOutcome> {
        let result = match self.storage.enqueue_event(event).await {
            Ok(()) => self.apply_ledger_event(event).await,
            Err(err) => Err(err),
        };
        result
            .map(ReconciliationOutcome::Posted)
            .map_err(|err| partial(entity, entity_id, err))
    }

    async fn reverse(
        &mut self,
        owner_id: &str,
        origin: &TransactionOrigin,
        entity: &'static str,
    ) -> LedgerResult<Option<String>> {
        match self.unlink(owner_id, origin).await {
            Ok(Some(id)) => {
                self.publish(owner_id, ChangeSource::Transaction);
                tracing::info!(key = %origin.key(), transaction_id = %id, "ledger entry reversed");
                Ok(Some(id))
            }
            Ok(None) => Ok(None),
            Err(err) => Err(partial(entity, &origin.source_id, err)),
        }
    }

    /// Drop a pending event for `origin` and delete the transaction it
    /// produced, if any
    async fn unlink(
        &mut self,
        owner_id: &str,
        origin: &TransactionOrigin,
    ) -> LedgerResult<Option<String>> {
        self.storage.complete_event(owner_id, &origin.key()).await?;
        match self.storage.find_transaction_by_origin(owner_id, origin).await? {
            Some(linked) => {
                self.storage.delete_transaction(owner_id, &linked.id).await?;
                Ok(Some(linked.id))
            }
            None => Ok(None),
        }
    }

    fn publish(&self, owner_id: &str, source: ChangeSource) {
        self.notifier.publish(owner_id, source, self.clock.now());
    }
}

fn partial(entity: &'static str, id: &str, err: LedgerError) -> LedgerError {
    if err.is_partial() {
        return err;
    }
    tracing::warn!(entity, id, error = %err, "derived ledger write failed");
    LedgerError::PartialReconciliation {
        entity,
        id: id.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{FixedClock, MemoryStorage};
    use bigdecimal::BigDecimal;
    use chrono::{NaiveDate, TimeZone, Utc};

    const OWNER: &str = "owner-1";

    struct Fixture {
        storage: MemoryStorage,
        service: ReconciliationService<MemoryStorage>,
        client: Client,
    }

    async fn fixture() -> Fixture {
        let mut storage = MemoryStorage::new();
        let client = Client::new(OWNER, "Acme");
        storage.create_client(&client).await.unwrap();
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 3, 25, 15, 0, 0).unwrap(),
        ));
        let service = ReconciliationService::new(
            storage.clone(),
            clock,
            ChangeNotifier::new(),
            Category::new("Projects"),
        );
        Fixture {
            storage,
            service,
            client,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 25).unwrap()
    }

    async fn all_transactions(storage: &MemoryStorage) -> Vec<Transaction> {
        storage.list_transactions(OWNER, None, None).await.unwrap()
    }

    #[tokio::test]
    async fn test_completion_posts_one_income_transaction() {
        let mut f = fixture().await;
        let mut project = Project::new(OWNER, f.client.id.clone(), "Website", BigDecimal::from(1500));
        f.service.on_project_saved(&project, None).await.unwrap();
        assert!(all_transactions(&f.storage).await.is_empty());

        project.status = ProjectStatus::Completed;
        let outcome = f
            .service
            .on_project_saved(&project, Some(ProjectStatus::InProgress))
            .await
            .unwrap();
        assert!(matches!(outcome, ReconciliationOutcome::Posted(ApplyOutcome::Applied(_))));

        let transactions = all_transactions(&f.storage).await;
        assert_eq!(transactions.len(), 1);
        let posted = &transactions[0];
        assert_eq!(posted.amount, BigDecimal::from(1500));
        assert_eq!(posted.kind, TransactionKind::Income);
        assert_eq!(posted.category.as_str(), "PROJECTS");
        assert_eq!(posted.description, "Website");
        assert_eq!(posted.date, today());
        assert_eq!(posted.origin, Some(TransactionOrigin::project_completed(&project.id)));
        assert!(f.storage.pending_events(OWNER).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resaving_completed_project_does_not_duplicate() {
        let mut f = fixture().await;
        let project = Project::new(OWNER, f.client.id.clone(), "Website", BigDecimal::from(1500))
            .with_status(ProjectStatus::Completed);
        f.service.on_project_saved(&project, None).await.unwrap();
        let outcome = f
            .service
            .on_project_saved(&project, Some(ProjectStatus::Completed))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            ReconciliationOutcome::Posted(ApplyOutcome::AlreadyApplied(_))
        ));
        assert_eq!(all_transactions(&f.storage).await.len(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_removes_linked_transaction_only() {
        let mut f = fixture().await;
        let logo = Project::new(OWNER, f.client.id.clone(), "Logo Redesign", BigDecimal::from(800))
            .with_status(ProjectStatus::Completed);
        let twin = Project::new(OWNER, f.client.id.clone(), "Logo Redesign", BigDecimal::from(800))
            .with_status(ProjectStatus::Completed);
        f.service.on_project_saved(&logo, None).await.unwrap();
        f.service.on_project_saved(&twin, None).await.unwrap();
        assert_eq!(all_transactions(&f.storage).await.len(), 2);

        let cancelled = logo.clone().with_status(ProjectStatus::Cancelled);
        let outcome = f
            .service
            .on_project_saved(&cancelled, Some(ProjectStatus::Completed))
            .await
            .unwrap();
        assert!(matches!(outcome, ReconciliationOutcome::Reversed(Some(_))));

        let remaining = all_transactions(&f.storage).await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].origin, Some(TransactionOrigin::project_completed(&twin.id)));
    }

    #[tokio::test]
    async fn test_cancel_then_complete_again_posts_fresh_entry() {
        let mut f = fixture().await;
        let project = Project::new(OWNER, f.client.id.clone(), "Site", BigDecimal::from(300))
            .with_status(ProjectStatus::Completed);
        f.service.on_project_saved(&project, None).await.unwrap();
        let cancelled = project.clone().with_status(ProjectStatus::Cancelled);
        f.service
            .on_project_saved(&cancelled, Some(ProjectStatus::Completed))
            .await
            .unwrap();
        assert!(all_transactions(&f.storage).await.is_empty());

        f.service
            .on_project_saved(&project, Some(ProjectStatus::Cancelled))
            .await
            .unwrap();
        assert_eq!(all_transactions(&f.storage).await.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelling_never_completed_project() {
        let mut f = fixture().await;
        let project = Project::new(OWNER, f.client.id.clone(), "Site", BigDecimal::from(300))
            .with_status(ProjectStatus::Cancelled);
        let outcome = f.service.on_project_saved(&project, None).await.unwrap();
        assert_eq!(outcome, ReconciliationOutcome::Reversed(None));
    }

    #[tokio::test]
    async fn test_scheduled_paid_posts_copy() {
        let mut f = fixture().await;
        let rent = ScheduledTransaction::new(
            OWNER,
            "Rent",
            BigDecimal::from(500),
            TransactionKind::Expense,
            "aluguel",
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
        );
        f.storage.create_scheduled(&rent).await.unwrap();

        f.service
            .on_scheduled_status_changed(&rent, ScheduledStatus::Paid)
            .await
            .unwrap();

        let transactions = all_transactions(&f.storage).await;
        assert_eq!(transactions.len(), 1);
        let paid = &transactions[0];
        assert_eq!(paid.description, "Rent");
        assert_eq!(paid.amount, BigDecimal::from(500));
        assert_eq!(paid.kind, TransactionKind::Expense);
        assert_eq!(paid.category.as_str(), "ALUGUEL");
        assert_eq!(paid.date, today());

        let stored = f.storage.get_scheduled(OWNER, &rent.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ScheduledStatus::Paid);

        let reopened = f
            .service
            .on_scheduled_status_changed(&rent, ScheduledStatus::Scheduled)
            .await;
        assert!(matches!(reopened, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_partial_failure_then_retry_has_no_duplicate() {
        let mut f = fixture().await;
        let project = Project::new(OWNER, f.client.id.clone(), "Audit", BigDecimal::from(900))
            .with_status(ProjectStatus::Completed);

        f.storage.set_fail_transaction_writes(true);
        let err = f.service.on_project_saved(&project, None).await.unwrap_err();
        assert!(err.is_partial());
        assert!(f.storage.get_project(OWNER, &project.id).await.unwrap().is_some());
        assert!(all_transactions(&f.storage).await.is_empty());
        assert_eq!(f.storage.pending_events(OWNER).await.unwrap().len(), 1);

        f.storage.set_fail_transaction_writes(false);
        let outcomes = f.service.retry_pending(OWNER).await.unwrap();
        assert!(matches!(outcomes.as_slice(), [ApplyOutcome::Applied(_)]));
        assert!(f.service.retry_pending(OWNER).await.unwrap().is_empty());

        f.service
            .on_project_saved(&project, Some(ProjectStatus::Completed))
            .await
            .unwrap();
        assert_eq!(all_transactions(&f.storage).await.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_ledger_event_is_idempotent() {
        let mut f = fixture().await;
        let event = LedgerEvent {
            owner_id: OWNER.to_string(),
            origin: TransactionOrigin::scheduled_paid("s-1"),
            description: "Internet".to_string(),
            amount: BigDecimal::from(120),
            kind: TransactionKind::Expense,
            category: Category::new("utilities"),
            occurred_on: today(),
            recorded_at: Utc::now(),
        };

        let first = f.service.apply_ledger_event(&event).await.unwrap();
        let second = f.service.apply_ledger_event(&event).await.unwrap();
        assert!(matches!(first, ApplyOutcome::Applied(_)));
        assert_eq!(second, ApplyOutcome::AlreadyApplied(first.transaction_id().to_string()));
    }

    #[tokio::test]
    async fn test_mutations_publish_changes() {
        let mut f = fixture().await;
        let notifier = ChangeNotifier::new();
        let mut events = notifier.subscribe();
        let mut service = ReconciliationService::new(
            f.storage.clone(),
            Arc::new(FixedClock::new(Utc::now())),
            notifier,
            Category::new("Projects"),
        );
        let project = Project::new(OWNER, f.client.id.clone(), "Site", BigDecimal::from(10));
        service.on_project_saved(&project, None).await.unwrap();
        service.delete_project(OWNER, &project.id).await.unwrap();

        assert_eq!(events.recv().await.unwrap().source, ChangeSource::Project);
        assert_eq!(events.recv().await.unwrap().source, ChangeSource::Project);
        assert!(f.service.delete_transaction(OWNER, "missing").await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_project_is_rejected_before_write() {
        let mut f = fixture().await;
        let project = Project::new(OWNER, f.client.id.clone(), "  ", BigDecimal::from(10));
        let err = f.service.on_project_saved(&project, None).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert!(f.storage.list_projects(OWNER, None).await.unwrap().is_empty());
    }
}
