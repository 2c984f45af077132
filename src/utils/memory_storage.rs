//! In-memory storage implementation for testing

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::traits::*;
use crate::types::*;

fn poisoned<T>(_: T) -> LedgerError {
    LedgerError::Storage("storage lock poisoned".to_string())
}

/// Insert a record under a fresh id. Ids are unique across accounts, so an
/// occupied slot is a constraint violation whoever owns it.
fn insert_new<T: Clone>(
    records: &mut HashMap<String, T>,
    id: &str,
    record: &T,
    what: &str,
) -> LedgerResult<()> {
    match records.entry(id.to_string()) {
        Entry::Occupied(_) => Err(LedgerError::Storage(format!(
            "{} {} already exists",
            what, id
        ))),
        Entry::Vacant(slot) => {
            slot.insert(record.clone());
            Ok(())
        }
    }
}

/// In-memory storage implementation for testing and development
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    clients: Arc<RwLock<HashMap<String, Client>>>,
    projects: Arc<RwLock<HashMap<String, Project>>>,
    transactions: Arc<RwLock<HashMap<String, Transaction>>>,
    scheduled: Arc<RwLock<HashMap<String, ScheduledTransaction>>>,
    /// `(owner, origin key)` to the id of the derived transaction
    origins: Arc<RwLock<HashMap<(String, String), String>>>,
    outbox: Arc<RwLock<Vec<LedgerEvent>>>,
    fail_transaction_writes: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent transaction create/delete fail with a storage
    /// error (useful for exercising partial reconciliation)
    pub fn set_fail_transaction_writes(&self, fail: bool) {
        self.fail_transaction_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent list query fail with a storage error
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_transaction_writes(&self) -> LedgerResult<()> {
        if self.fail_transaction_writes.load(Ordering::SeqCst) {
            Err(LedgerError::Storage(
                "transaction store unavailable".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn check_reads(&self) -> LedgerResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(LedgerError::Storage("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }

    fn client_exists(&self, owner_id: &str, client_id: &str) -> LedgerResult<bool> {
        Ok(self
            .clients
            .read()
            .map_err(poisoned)?
            .get(client_id)
            .is_some_and(|c| c.owner_id == owner_id))
    }
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn create_client(&mut self, client: &Client) -> LedgerResult<String> {
        let mut clients = self.clients.write().map_err(poisoned)?;
        insert_new(&mut clients, &client.id, client, "client")?;
        Ok(client.id.clone())
    }

    async fn get_client(&self, owner_id: &str, client_id: &str) -> LedgerResult<Option<Client>> {
        Ok(self
            .clients
            .read()
            .map_err(poisoned)?
            .get(client_id)
            .filter(|c| c.owner_id == owner_id)
            .cloned())
    }

    async fn list_clients(&self, owner_id: &str) -> LedgerResult<Vec<Client>> {
        self.check_reads()?;
        let clients = self.clients.read().map_err(poisoned)?;
        let mut filtered: Vec<Client> = clients
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        filtered.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(filtered)
    }

    async fn update_client(&mut self, client: &Client) -> LedgerResult<()> {
        let mut clients = self.clients.write().map_err(poisoned)?;
        match clients.get_mut(&client.id) {
            Some(existing) if existing.owner_id == client.owner_id => {
                *existing = client.clone();
                Ok(())
            }
            _ => Err(LedgerError::ClientNotFound(client.id.clone())),
        }
    }

    async fn delete_client(&mut self, owner_id: &str, client_id: &str) -> LedgerResult<()> {
        if !self.client_exists(owner_id, client_id)? {
            return Err(LedgerError::ClientNotFound(client_id.to_string()));
        }
        self.clients.write().map_err(poisoned)?.remove(client_id);
        Ok(())
    }

    async fn create_project(&mut self, project: &Project) -> LedgerResult<String> {
        if !self.client_exists(&project.owner_id, &project.client_id)? {
            return Err(LedgerError::ClientNotFound(project.client_id.clone()));
        }
        let mut projects = self.projects.write().map_err(poisoned)?;
        insert_new(&mut projects, &project.id, project, "project")?;
        Ok(project.id.clone())
    }

    async fn get_project(&self, owner_id: &str, project_id: &str) -> LedgerResult<Option<Project>> {
        Ok(self
            .projects
            .read()
            .map_err(poisoned)?
            .get(project_id)
            .filter(|p| p.owner_id == owner_id)
            .cloned())
    }

    async fn list_projects(
        &self,
        owner_id: &str,
        status: Option<ProjectStatus>,
    ) -> LedgerResult<Vec<Project>> {
        self.check_reads()?;
        let projects = self.projects.read().map_err(poisoned)?;
        let mut filtered: Vec<Project> = projects
            .values()
            .filter(|p| p.owner_id == owner_id)
            .filter(|p| status.is_none_or(|s| p.status == s))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(filtered)
    }

    async fn update_project(&mut self, project: &Project) -> LedgerResult<()> {
        if !self.client_exists(&project.owner_id, &project.client_id)? {
            return Err(LedgerError::ClientNotFound(project.client_id.clone()));
        }
        let mut projects = self.projects.write().map_err(poisoned)?;
        match projects.get_mut(&project.id) {
            Some(existing) if existing.owner_id == project.owner_id => {
                *existing = project.clone();
                Ok(())
            }
            _ => Err(LedgerError::ProjectNotFound(project.id.clone())),
        }
    }

    async fn delete_project(&mut self, owner_id: &str, project_id: &str) -> LedgerResult<()> {
        let mut projects = self.projects.write().map_err(poisoned)?;
        if projects.get(project_id).is_some_and(|p| p.owner_id == owner_id) {
            projects.remove(project_id);
            Ok(())
        } else {
            Err(LedgerError::ProjectNotFound(project_id.to_string()))
        }
    }

    async fn create_transaction(&mut self, transaction: &Transaction) -> LedgerResult<String> {
        self.check_transaction_writes()?;
        // lock order: transactions, then origins
        let mut transactions = self.transactions.write().map_err(poisoned)?;
        let mut origins = self.origins.write().map_err(poisoned)?;
        let origin_key = transaction
            .origin
            .as_ref()
            .map(|origin| (transaction.owner_id.clone(), origin.key()));
        if let Some(key) = &origin_key {
            if origins.contains_key(key) {
                return Err(LedgerError::Storage(format!(
                    "a transaction for {} already exists",
                    key.1
                )));
            }
        }
        insert_new(&mut transactions, &transaction.id, transaction, "transaction")?;
        if let Some(key) = origin_key {
            origins.insert(key, transaction.id.clone());
        }
        Ok(transaction.id.clone())
    }

    async fn get_transaction(
        &self,
        owner_id: &str,
        transaction_id: &str,
    ) -> LedgerResult<Option<Transaction>> {
        Ok(self
            .transactions
            .read()
            .map_err(poisoned)?
            .get(transaction_id)
            .filter(|t| t.owner_id == owner_id)
            .cloned())
    }

    async fn list_transactions(
        &self,
        owner_id: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<Vec<Transaction>> {
        self.check_reads()?;
        let transactions = self.transactions.read().map_err(poisoned)?;
        let mut filtered: Vec<Transaction> = transactions
            .values()
            .filter(|txn| {
                if txn.owner_id != owner_id {
                    return false;
                }
                if let Some(start) = start_date {
                    if txn.date < start {
                        return false;
                    }
                }
                if let Some(end) = end_date {
                    if txn.date > end {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        filtered.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(filtered)
    }

    async fn find_transaction_by_origin(
        &self,
        owner_id: &str,
        origin: &TransactionOrigin,
    ) -> LedgerResult<Option<Transaction>> {
        let transactions = self.transactions.read().map_err(poisoned)?;
        let origins = self.origins.read().map_err(poisoned)?;
        Ok(origins
            .get(&(owner_id.to_string(), origin.key()))
            .and_then(|id| transactions.get(id))
            .cloned())
    }

    async fn delete_transaction(
        &mut self,
        owner_id: &str,
        transaction_id: &str,
    ) -> LedgerResult<()> {
        self.check_transaction_writes()?;
        let mut transactions = self.transactions.write().map_err(poisoned)?;
        if transactions
            .get(transaction_id)
            .is_some_and(|t| t.owner_id == owner_id)
        {
            if let Some(origin) = transactions.remove(transaction_id).and_then(|t| t.origin) {
                self.origins
                    .write()
                    .map_err(poisoned)?
                    .remove(&(owner_id.to_string(), origin.key()));
            }
            Ok(())
        } else {
            Err(LedgerError::TransactionNotFound(transaction_id.to_string()))
        }
    }

    async fn create_scheduled(&mut self, item: &ScheduledTransaction) -> LedgerResult<String> {
        let mut scheduled = self.scheduled.write().map_err(poisoned)?;
        insert_new(&mut scheduled, &item.id, item, "scheduled transaction")?;
        Ok(item.id.clone())
    }

    async fn get_scheduled(
        &self,
        owner_id: &str,
        scheduled_id: &str,
    ) -> LedgerResult<Option<ScheduledTransaction>> {
        Ok(self
            .scheduled
            .read()
            .map_err(poisoned)?
            .get(scheduled_id)
            .filter(|s| s.owner_id == owner_id)
            .cloned())
    }

    async fn list_scheduled(&self, owner_id: &str) -> LedgerResult<Vec<ScheduledTransaction>> {
        self.check_reads()?;
        let scheduled = self.scheduled.read().map_err(poisoned)?;
        let mut filtered: Vec<ScheduledTransaction> = scheduled
            .values()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect();
        filtered.sort_by(|a, b| {
            a.scheduled_date
                .cmp(&b.scheduled_date)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(filtered)
    }

    async fn update_scheduled_status(
        &mut self,
        owner_id: &str,
        scheduled_id: &str,
        status: ScheduledStatus,
    ) -> LedgerResult<()> {
        let mut scheduled = self.scheduled.write().map_err(poisoned)?;
        match scheduled.get_mut(scheduled_id) {
            Some(item) if item.owner_id == owner_id => {
                item.status = status;
                Ok(())
            }
            _ => Err(LedgerError::ScheduledNotFound(scheduled_id.to_string())),
        }
    }

    async fn delete_scheduled(&mut self, owner_id: &str, scheduled_id: &str) -> LedgerResult<()> {
        let mut scheduled = self.scheduled.write().map_err(poisoned)?;
        if scheduled
            .get(scheduled_id)
            .is_some_and(|s| s.owner_id == owner_id)
        {
            scheduled.remove(scheduled_id);
            Ok(())
        } else {
            Err(LedgerError::ScheduledNotFound(scheduled_id.to_string()))
        }
    }

    async fn enqueue_event(&mut self, event: &LedgerEvent) -> LedgerResult<()> {
        let mut outbox = self.outbox.write().map_err(poisoned)?;
        let key = event.key();
        match outbox
            .iter_mut()
            .find(|e| e.owner_id == event.owner_id && e.key() == key)
        {
            Some(existing) => *existing = event.clone(),
            None => outbox.push(event.clone()),
        }
        Ok(())
    }

    async fn pending_events(&self, owner_id: &str) -> LedgerResult<Vec<LedgerEvent>> {
        Ok(self
            .outbox
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|e| e.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn complete_event(&mut self, owner_id: &str, key: &str) -> LedgerResult<()> {
        self.outbox
            .write()
            .map_err(poisoned)?
            .retain(|e| !(e.owner_id == owner_id && e.key() == key));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_records_are_scoped_by_owner() {
        let mut storage = MemoryStorage::new();
        let client = Client::new("alice", "Acme");
        storage.create_client(&client).await.unwrap();

        assert!(storage.get_client("bob", &client.id).await.unwrap().is_none());
        assert_eq!(storage.list_clients("alice").await.unwrap().len(), 1);
        assert!(matches!(
            storage.delete_client("bob", &client.id).await,
            Err(LedgerError::ClientNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_project_requires_existing_client() {
        let mut storage = MemoryStorage::new();
        let project = Project::new("alice", "missing", "Website", BigDecimal::from(100));

        assert!(matches!(
            storage.create_project(&project).await,
            Err(LedgerError::ClientNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_transactions_by_date_range() {
        let mut storage = MemoryStorage::new();
        for day in [1, 10, 20] {
            let txn = Transaction::new(
                "alice",
                format!("day {}", day),
                BigDecimal::from(10),
                TransactionKind::Income,
                "misc",
                date(2024, 3, day),
            );
            storage.create_transaction(&txn).await.unwrap();
        }

        let listed = storage
            .list_transactions("alice", Some(date(2024, 3, 5)), Some(date(2024, 3, 20)))
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].date, date(2024, 3, 20));
    }

    #[tokio::test]
    async fn test_outbox_keeps_one_event_per_key() {
        let mut storage = MemoryStorage::new();
        let event = LedgerEvent {
            owner_id: "alice".to_string(),
            origin: TransactionOrigin::scheduled_paid("s-1"),
            description: "Rent".to_string(),
            amount: BigDecimal::from(500),
            kind: TransactionKind::Expense,
            category: Category::new("aluguel"),
            occurred_on: date(2024, 3, 5),
            recorded_at: chrono::Utc::now(),
        };

        storage.enqueue_event(&event).await.unwrap();
        storage.enqueue_event(&event).await.unwrap();
        assert_eq!(storage.pending_events("alice").await.unwrap().len(), 1);

        storage.complete_event("alice", &event.key()).await.unwrap();
        assert!(storage.pending_events("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_ids_taken_by_another_account() {
        let mut storage = MemoryStorage::new();
        let client = Client::new("alice", "Acme");
        storage.create_client(&client).await.unwrap();
        let txn = Transaction::new(
            "alice",
            "Invoice",
            BigDecimal::from(300),
            TransactionKind::Income,
            "sales",
            date(2024, 3, 1),
        );
        storage.create_transaction(&txn).await.unwrap();

        let mut forged_client = Client::new("mallory", "Forged");
        forged_client.id = client.id.clone();
        assert!(matches!(
            storage.create_client(&forged_client).await,
            Err(LedgerError::Storage(_))
        ));
        let mut forged_txn = txn.clone();
        forged_txn.owner_id = "mallory".to_string();
        assert!(matches!(
            storage.create_transaction(&forged_txn).await,
            Err(LedgerError::Storage(_))
        ));

        let kept = storage.get_client("alice", &client.id).await.unwrap().unwrap();
        assert_eq!(kept.name, "Acme");
        assert_eq!(
            storage.list_transactions("alice", None, None).await.unwrap().len(),
            1
        );
        assert!(storage.list_transactions("mallory", None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_origin_index_follows_creates_and_deletes() {
        let mut storage = MemoryStorage::new();
        let origin = TransactionOrigin::project_completed("p-1");
        let mut txn = Transaction::new(
            "alice",
            "Website",
            BigDecimal::from(900),
            TransactionKind::Income,
            "projects",
            date(2024, 3, 1),
        );
        txn.origin = Some(origin.clone());
        storage.create_transaction(&txn).await.unwrap();

        let found = storage.find_transaction_by_origin("alice", &origin).await.unwrap();
        assert_eq!(found.map(|t| t.id), Some(txn.id.clone()));
        assert!(storage.find_transaction_by_origin("bob", &origin).await.unwrap().is_none());

        let mut duplicate = txn.clone();
        duplicate.id = "other-id".to_string();
        assert!(matches!(
            storage.create_transaction(&duplicate).await,
            Err(LedgerError::Storage(_))
        ));

        storage.delete_transaction("alice", &txn.id).await.unwrap();
        assert!(storage.find_transaction_by_origin("alice", &origin).await.unwrap().is_none());
        storage.create_transaction(&duplicate).await.unwrap();
    }

    #[tokio::test]
    async fn test_failing_transaction_writes() {
        let mut storage = MemoryStorage::new();
        storage.set_fail_transaction_writes(true);
        let txn = Transaction::new(
            "alice",
            "Sale",
            BigDecimal::from(1),
            TransactionKind::Income,
            "sales",
            date(2024, 1, 1),
        );
        assert!(matches!(
            storage.create_transaction(&txn).await,
            Err(LedgerError::Storage(_))
        ));
    }
}
