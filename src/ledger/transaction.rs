//! Transaction and scheduling management

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::sync::Arc;

use crate::events::{ChangeNotifier, ChangeSource};
use crate::traits::*;
use crate::types::*;
use crate::utils::validation;

/// Transaction manager for manually entered transactions and scheduled items
pub struct TransactionManager<S: LedgerStorage> {
    storage: S,
    clock: Arc<dyn Clock>,
    notifier: ChangeNotifier,
    validator: Box<dyn RecordValidator>,
}

impl<S: LedgerStorage> TransactionManager<S> {
    /// Create a new transaction manager
    pub fn new(storage: S, clock: Arc<dyn Clock>, notifier: ChangeNotifier) -> Self {
        Self::with_validator(storage, clock, notifier, Box::new(DefaultRecordValidator))
    }

    /// Create a new transaction manager with custom validator
    pub fn with_validator(
        storage: S,
        clock: Arc<dyn Clock>,
        notifier: ChangeNotifier,
        validator: Box<dyn RecordValidator>,
    ) -> Self {
        Self {
            storage,
            clock,
            notifier,
            validator,
        }
    }

    /// Record a new transaction
    pub async fn record_transaction(&mut self, transaction: &Transaction) -> LedgerResult<String> {
        self.validator.validate_transaction(transaction)?;
        let id = self.storage.create_transaction(transaction).await?;
        self.notifier
            .publish(&transaction.owner_id, ChangeSource::Transaction, self.clock.now());
        tracing::debug!(transaction_id = %id, kind = %transaction.kind, "transaction recorded");
        Ok(id)
    }

    /// Get a transaction by ID
    pub async fn get_transaction(
        &self,
        owner_id: &str,
        transaction_id: &str,
    ) -> LedgerResult<Option<Transaction>> {
        self.storage.get_transaction(owner_id, transaction_id).await
    }

    /// Get a transaction by ID, returning an error if not found
    pub async fn get_transaction_required(
        &self,
        owner_id: &str,
        transaction_id: &str,
    ) -> LedgerResult<Transaction> {
        self.storage
            .get_transaction(owner_id, transaction_id)
            .await?
            .ok_or_else(|| LedgerError::TransactionNotFound(transaction_id.to_string()))
    }

    /// Get all transactions within a date range, newest first
    pub async fn list_transactions(
        &self,
        owner_id: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<Vec<Transaction>> {
        self.storage
            .list_transactions(owner_id, start_date, end_date)
            .await
    }

    /// Schedule a future transaction
    pub async fn schedule(&mut self, item: &ScheduledTransaction) -> LedgerResult<String> {
        self.validator.validate_scheduled(item)?;
        let id = self.storage.create_scheduled(item).await?;
        self.notifier
            .publish(&item.owner_id, ChangeSource::Scheduled, self.clock.now());
        tracing::debug!(scheduled_id = %id, on = %item.scheduled_on(), "transaction scheduled");
        Ok(id)
    }

    pub async fn get_scheduled_required(
        &self,
        owner_id: &str,
        scheduled_id: &str,
    ) -> LedgerResult<ScheduledTransaction> {
        self.storage
            .get_scheduled(owner_id, scheduled_id)
            .await?
            .ok_or_else(|| LedgerError::ScheduledNotFound(scheduled_id.to_string()))
    }

    /// List scheduled items by ascending date
    pub async fn list_scheduled(&self, owner_id: &str) -> LedgerResult<Vec<ScheduledTransaction>> {
        self.storage.list_scheduled(owner_id).await
    }
}

/// Transaction builder for assembling a transaction from form input
#[derive(Debug)]
pub struct TransactionBuilder {
    owner_id: String,
    description: String,
    kind: TransactionKind,
    amount: Option<LedgerResult<BigDecimal>>,
    category: Category,
    date: Option<NaiveDate>,
}

impl TransactionBuilder {
    /// Create a new transaction builder
    pub fn new(owner_id: impl Into<String>, description: impl Into<String>, kind: TransactionKind) -> Self {
        Self {
            owner_id: owner_id.into(),
            description: description.into(),
            kind,
            amount: None,
            category: Category::default(),
            date: None,
        }
    }

    pub fn amount(mut self, amount: BigDecimal) -> Self {
        self.amount = Some(Ok(amount));
        self
    }

    /// Set the amount from user text such as `"1500.50"`. A malformed value
    /// is reported by [`build`](Self::build).
    pub fn amount_text(mut self, raw: &str) -> Self {
        self.amount = Some(validation::parse_amount("Amount", raw));
        self
    }

    pub fn category(mut self, category: impl Into<Category>) -> Self {
        self.category = category.into();
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Build the transaction
    pub fn build(self) -> LedgerResult<Transaction> {
        let amount = self
            .amount
            .unwrap_or_else(|| Err(LedgerError::Validation("Amount is required".to_string())))?;
        let date = self
            .date
            .ok_or_else(|| LedgerError::Validation("Date is required".to_string()))?;

        let transaction = Transaction::new(
            self.owner_id,
            self.description,
            amount,
            self.kind,
            self.category,
            date,
        );
        DefaultRecordValidator.validate_transaction(&transaction)?;
        Ok(transaction)
    }
}

/// Common transaction patterns
pub mod patterns {
    use super::*;

    /// Money received, e.g. a one-off sale
    pub fn income(
        owner_id: &str,
        description: &str,
        amount: BigDecimal,
        category: &str,
        date: NaiveDate,
    ) -> LedgerResult<Transaction> {
        TransactionBuilder::new(owner_id, description, TransactionKind::Income)
            .amount(amount)
            .category(category)
            .on(date)
            .build()
    }

    /// Money spent
    pub fn expense(
        owner_id: &str,
        description: &str,
        amount: BigDecimal,
        category: &str,
        date: NaiveDate,
    ) -> LedgerResult<Transaction> {
        TransactionBuilder::new(owner_id, description, TransactionKind::Expense)
            .amount(amount)
            .category(category)
            .on(date)
            .build()
    }

    /// A monthly bill scheduled on the same day of each of the next `months`
    /// months, clamped to the month's last day
    pub fn monthly_bill(
        owner_id: &str,
        description: &str,
        amount: BigDecimal,
        category: &str,
        first: NaiveDate,
        months: u32,
    ) -> Vec<ScheduledTransaction> {
        (0..months)
            .filter_map(|offset| {
                first
                    .checked_add_months(chrono::Months::new(offset))
                    .map(|date| {
                        ScheduledTransaction::new(
                            owner_id,
                            description,
                            amount.clone(),
                            TransactionKind::Expense,
                            category,
                            date,
                        )
                    })
            })
            .collect()
    }
}
