// In-memory persistence adapter for accounts and characters.

use crate::domain::PlayerRecord;
use crate::domain::errors::StoreError;
use crate::domain::ports::PlayerStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone)]
struct Account {
    password: String,
    email: String,
    // Last map the character was placed on.
    map: Option<String>,
    record: Option<PlayerRecord>,
}

/// Process-local store; contents are lost on restart.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPlayerStore {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
}

impl InMemoryPlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn account_count(&self) -> usize {
        self.accounts.lock().await.len()
    }

    pub async fn email_of(&self, name: &str) -> Option<String> {
        self.accounts
            .lock()
            .await
            .get(name)
            .map(|account| account.email.clone())
    }

    pub async fn map_of(&self, name: &str) -> Option<String> {
        self.accounts
            .lock()
            .await
            .get(name)
            .and_then(|account| account.map.clone())
    }
}

#[async_trait]
impl PlayerStore for InMemoryPlayerStore {
    async fn account_exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.accounts.lock().await.contains_key(name))
    }

    async fn create_account(
        &self,
        name: &str,
        password: &str,
        email: &str,
    ) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock().await;
        // Creating an existing account keeps the first credentials.
        accounts.entry(name.to_string()).or_insert_with(|| Account {
            password: password.to_string(),
            email: email.to_string(),
            map: None,
            record: None,
        });
        Ok(())
    }

    async fn validate_login(&self, name: &str, password: &str) -> Result<bool, StoreError> {
        Ok(self
            .accounts
            .lock()
            .await
            .get(name)
            .is_some_and(|account| account.password == password))
    }

    async fn load_player(&self, name: &str) -> Result<Option<PlayerRecord>, StoreError> {
        let accounts = self.accounts.lock().await;
        let account = accounts
            .get(name)
            .ok_or_else(|| StoreError::AccountNotFound(name.to_string()))?;
        Ok(account.record.clone())
    }

    async fn save_player(&self, record: &PlayerRecord) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .get_mut(&record.name)
            .ok_or_else(|| StoreError::AccountNotFound(record.name.clone()))?;
        if let Some(stored) = &account.record {
            if record.is_older_than(stored) {
                debug!(
                    name = %record.name,
                    revision = record.revision,
                    stored = stored.revision,
                    "ignoring stale player save"
                );
                return Ok(());
            }
        }
        account.map = Some(record.map.clone());
        account.record = Some(record.clone());
        Ok(())
    }

    async fn save_map_assignment(&self, map: &str, name: &str) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .get_mut(name)
            .ok_or_else(|| StoreError::AccountNotFound(name.to_string()))?;
        account.map = Some(map.to_string());
        Ok(())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        debug!("in-memory store flush is a no-op");
        Ok(())
    }
}
