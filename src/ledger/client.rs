//! Client management functionality

use std::sync::Arc;

use crate::events::{ChangeNotifier, ChangeSource};
use crate::traits::*;
use crate::types::*;

/// Client manager for handling client records of one store
pub struct ClientManager<S: LedgerStorage> {
    storage: S,
    clock: Arc<dyn Clock>,
    notifier: ChangeNotifier,
    validator: Box<dyn RecordValidator>,
}

impl<S: LedgerStorage> ClientManager<S> {
    /// Create a new client manager
    pub fn new(storage: S, clock: Arc<dyn Clock>, notifier: ChangeNotifier) -> Self {
        Self::with_validator(storage, clock, notifier, Box::new(DefaultRecordValidator))
    }

    /// Create a new client manager with custom validator
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

    /// Create a new client
    pub async fn create_client(&mut self, client: &Client) -> LedgerResult<String> {
        self.validator.validate_client(client)?;
        let id = self.storage.create_client(client).await?;
        self.notifier
            .publish(&client.owner_id, ChangeSource::Client, self.clock.now());
        tracing::debug!(client_id = %id, "client created");
        Ok(id)
    }

    /// Get a client by ID
    pub async fn get_client(&self, owner_id: &str, client_id: &str) -> LedgerResult<Option<Client>> {
        self.storage.get_client(owner_id, client_id).await
    }

    /// Get a client by ID, returning an error if not found
    pub async fn get_client_required(&self, owner_id: &str, client_id: &str) -> LedgerResult<Client> {
        self.storage
            .get_client(owner_id, client_id)
            .await?
            .ok_or_else(|| LedgerError::ClientNotFound(client_id.to_string()))
    }

    /// List all clients, ordered by name
    pub async fn list_clients(&self, owner_id: &str) -> LedgerResult<Vec<Client>> {
        self.storage.list_clients(owner_id).await
    }

    /// Update a client
    pub async fn update_client(&mut self, client: &Client) -> LedgerResult<()> {
        self.validator.validate_client(client)?;
        self.storage.update_client(client).await?;
        self.notifier
            .publish(&client.owner_id, ChangeSource::Client, self.clock.now());
        Ok(())
    }

    /// Delete a client. Projects that reference it keep the dangling id and
    /// show up as "no client" in reports.
    pub async fn delete_client(&mut self, owner_id: &str, client_id: &str) -> LedgerResult<()> {
        self.storage.delete_client(owner_id, client_id).await?;
        self.notifier
            .publish(owner_id, ChangeSource::Client, self.clock.now());
        Ok(())
    }
}
