use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::errors::StoreError;
use crate::domain::ports::PlayerStore;
use crate::domain::state::PlayerRecord;

#[derive(Debug, Clone)]
struct Account {
    password: String,
    email: String,
    map: Option<String>,
    record: Option<PlayerRecord>,
}

#[derive(Default)]
struct Tables {
    accounts: HashMap<String, Account>,
    flushes: usize,
}

#[derive(Clone, Copy, Default)]
pub(crate) struct FailureFlags {
    // Account lookups and login validation.
    pub lookup: bool,
    pub load: bool,
    pub save: bool,
}

// In-memory store that records every write for assertions.
#[derive(Clone)]
pub(crate) struct RecordingStore {
    tables: Arc<Mutex<Tables>>,
    failures: FailureFlags,
}

impl RecordingStore {
    pub(crate) fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            failures: FailureFlags::default(),
        }
    }

    pub(crate) fn with_failures(mut self, failures: FailureFlags) -> Self {
        self.failures = failures;
        self
    }

    pub(crate) fn insert_test_account(&self, name: &str, password: &str) {
        let mut guard = self.tables.lock().expect("tables mutex poisoned");
        guard.accounts.insert(
            name.to_string(),
            Account {
                password: password.to_string(),
                email: "fixture@example.com".to_string(),
                map: None,
                record: None,
            },
        );
    }

    pub(crate) fn insert_test_record(&self, record: PlayerRecord) {
        let mut guard = self.tables.lock().expect("tables mutex poisoned");
        if let Some(account) = guard.accounts.get_mut(&record.name) {
            account.record = Some(record);
        }
    }

    pub(crate) fn email_of(&self, name: &str) -> Option<String> {
        let guard = self.tables.lock().expect("tables mutex poisoned");
        guard.accounts.get(name).map(|a| a.email.clone())
    }

    pub(crate) fn map_of(&self, name: &str) -> Option<String> {
        let guard = self.tables.lock().expect("tables mutex poisoned");
        guard.accounts.get(name).and_then(|a| a.map.clone())
    }

    pub(crate) fn record_of(&self, name: &str) -> Option<PlayerRecord> {
        let guard = self.tables.lock().expect("tables mutex poisoned");
        guard.accounts.get(name).and_then(|a| a.record.clone())
    }

    pub(crate) fn flush_count(&self) -> usize {
        self.tables.lock().expect("tables mutex poisoned").flushes
    }
}

fn unavailable(op: &str) -> StoreError {
    StoreError::Unavailable(format!("{op} failed"))
}

#[async_trait]
impl PlayerStore for RecordingStore {
    async fn account_exists(&self, name: &str) -> Result<bool, StoreError> {
        if self.failures.lookup {
            return Err(unavailable("lookup"));
        }
        let guard = self.tables.lock().expect("tables mutex poisoned");
        Ok(guard.accounts.contains_key(name))
    }

    async fn create_account(
        &self,
        name: &str,
        password: &str,
        email: &str,
    ) -> Result<(), StoreError> {
        let mut guard = self.tables.lock().expect("tables mutex poisoned");
        guard.accounts.insert(
            name.to_string(),
            Account {
                password: password.to_string(),
                email: email.to_string(),
                map: None,
                record: None,
            },
        );
        Ok(())
    }

    async fn validate_login(&self, name: &str, password: &str) -> Result<bool, StoreError> {
        if self.failures.lookup {
            return Err(unavailable("validate"));
        }
        let guard = self.tables.lock().expect("tables mutex poisoned");
        Ok(guard
            .accounts
            .get(name)
            .is_some_and(|a| a.password == password))
    }

    async fn load_player(&self, name: &str) -> Result<Option<PlayerRecord>, StoreError> {
        if self.failures.load {
            return Err(unavailable("load"));
        }
        let guard = self.tables.lock().expect("tables mutex poisoned");
        Ok(guard.accounts.get(name).and_then(|a| a.record.clone()))
    }

    async fn save_player(&self, record: &PlayerRecord) -> Result<(), StoreError> {
        if self.failures.save {
            return Err(unavailable("save"));
        }
        let mut guard = self.tables.lock().expect("tables mutex poisoned");
        let account = guard
            .accounts
            .get_mut(&record.name)
            .ok_or_else(|| StoreError::AccountNotFound(record.name.clone()))?;
        if account
            .record
            .as_ref()
            .is_some_and(|stored| record.is_older_than(stored))
        {
            return Ok(());
        }
        account.record = Some(record.clone());
        Ok(())
    }

    async fn save_map_assignment(&self, map: &str, name: &str) -> Result<(), StoreError> {
        if self.failures.save {
            return Err(unavailable("save map"));
        }
        let mut guard = self.tables.lock().expect("tables mutex poisoned");
        let account = guard
            .accounts
            .get_mut(name)
            .ok_or_else(|| StoreError::AccountNotFound(name.to_string()))?;
        account.map = Some(map.to_string());
        Ok(())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        self.tables.lock().expect("tables mutex poisoned").flushes += 1;
        Ok(())
    }
}
