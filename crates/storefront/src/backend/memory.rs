//! In-process backend for tests.
//!
//! Behaves like the hosted services closely enough for the reconciliation
//! logic: identity columns auto-increment, `created_at` and column defaults
//! are filled in on insert, filters are equality-only, and the auth side
//! reports the same error codes. Individual table operations can be made to
//! fail, or to be acknowledged without taking effect, to exercise error paths.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use pizzeria_core::{Email, UserId};

use super::{AuthBackend, BackendError, EmailChange, Filter, Identity, Table, TableStore};

/// Table operation, for fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

struct Account {
    identity: Identity,
    password: String,
    pending_email: Option<String>,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<Table, Vec<Value>>,
    next_id: i64,
    accounts: Vec<Account>,
    session: Option<UserId>,
    failing: HashSet<(Table, Operation)>,
    losing: HashSet<(Table, Operation)>,
    calls: Vec<(Table, Operation)>,
}

/// In-memory implementation of [`AuthBackend`] and [`TableStore`].
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panicking test may poison the lock; the data is still usable.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Create an account without signing in.
    pub fn register(&self, email: &str, password: &str) -> UserId {
        let id = UserId::new(Uuid::new_v4());
        self.lock().accounts.push(Account {
            identity: Identity {
                id,
                email: Some(email.to_string()),
            },
            password: password.to_string(),
            pending_email: None,
        });
        id
    }

    /// Insert rows directly, bypassing fault injection. Returns stored rows.
    pub fn seed(&self, table: Table, rows: Vec<Value>) -> Vec<Value> {
        let mut state = self.lock();
        rows.into_iter()
            .map(|row| state.store(table, row))
            .collect()
    }

    /// Current contents of a table, in insertion order.
    #[must_use]
    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.lock().tables.get(&table).cloned().unwrap_or_default()
    }

    /// Make every future `op` on `table` fail until [`Self::heal`] is called.
    pub fn fail(&self, table: Table, op: Operation) {
        self.lock().failing.insert((table, op));
    }

    /// Make every future `op` on `table` report success without changing any
    /// rows, like a write the server acknowledged and then dropped. Inserts
    /// still return the rows with their assigned ids.
    pub fn lose(&self, table: Table, op: Operation) {
        self.lock().losing.insert((table, op));
    }

    /// Undo [`Self::fail`] and [`Self::lose`].
    pub fn heal(&self, table: Table, op: Operation) {
        let mut state = self.lock();
        state.failing.remove(&(table, op));
        state.losing.remove(&(table, op));
    }

    /// Table operations performed so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<(Table, Operation)> {
        self.lock().calls.clone()
    }

    /// The email change requested for an account, if any.
    #[must_use]
    pub fn pending_email(&self, user: UserId) -> Option<String> {
        self.lock()
            .accounts
            .iter()
            .find(|a| a.identity.id == user)
            .and_then(|a| a.pending_email.clone())
    }
}

impl MemoryState {
    /// Record the call. `Ok(false)` means the write must be dropped.
    fn begin(&mut self, table: Table, op: Operation) -> Result<bool, BackendError> {
        self.calls.push((table, op));
        if self.failing.contains(&(table, op)) {
            return Err(BackendError::Unavailable(format!("{op:?} on {table} failed")));
        }
        Ok(!self.losing.contains(&(table, op)))
    }

    fn store(&mut self, table: Table, row: Value) -> Value {
        let stored = self.stamp(table, row);
        self.tables.entry(table).or_default().push(stored.clone());
        stored
    }

    /// Fill in the columns the database would.
    fn stamp(&mut self, table: Table, row: Value) -> Value {
        let mut object = match row {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        if !object.contains_key("id") {
            self.next_id += 1;
            object.insert("id".to_string(), json!(self.next_id));
        }
        object
            .entry("created_at")
            .or_insert_with(|| json!(Utc::now().to_rfc3339()));
        if table == Table::Addresses {
            object.entry("main").or_insert(json!(false));
        }

        Value::Object(object)
    }

    fn rows_mut(&mut self, table: Table) -> &mut Vec<Value> {
        self.tables.entry(table).or_default()
    }

    fn account_by_email(&self, email: &str) -> Option<&Account> {
        self.accounts
            .iter()
            .find(|a| a.identity.email.as_deref() == Some(email))
    }
}

fn matches_all(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|f| f.matches(row))
}

fn api_error(status: u16, code: &str, message: &str) -> BackendError {
    BackendError::Api {
        status,
        code: Some(code.to_string()),
        message: message.to_string(),
    }
}

#[async_trait]
impl AuthBackend for MemoryBackend {
    async fn sign_up(&self, email: &Email, password: &SecretString) -> Result<Identity, BackendError> {
        let mut state = self.lock();
        if state.account_by_email(email.as_str()).is_some() {
            return Err(api_error(422, "email_exists", "User already registered"));
        }

        let identity = Identity {
            id: UserId::new(Uuid::new_v4()),
            email: Some(email.as_str().to_string()),
        };
        state.accounts.push(Account {
            identity: identity.clone(),
            password: password.expose_secret().to_string(),
            pending_email: None,
        });
        state.session = Some(identity.id);
        Ok(identity)
    }

    async fn sign_in(&self, email: &Email, password: &SecretString) -> Result<Identity, BackendError> {
        let mut state = self.lock();
        let identity = state
            .account_by_email(email.as_str())
            .filter(|a| a.password == password.expose_secret())
            .map(|a| a.identity.clone())
            .ok_or_else(|| api_error(400, "invalid_credentials", "Invalid login credentials"))?;

        state.session = Some(identity.id);
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.lock().session = None;
        Ok(())
    }

    async fn update_email(&self, email: &Email) -> Result<EmailChange, BackendError> {
        let mut state = self.lock();
        let user = state.session.ok_or(BackendError::NoSession)?;
        let account = state
            .accounts
            .iter_mut()
            .find(|a| a.identity.id == user)
            .ok_or_else(|| api_error(404, "user_not_found", "User not found"))?;

        account.pending_email = Some(email.as_str().to_string());
        Ok(EmailChange {
            confirmation_sent: true,
        })
    }

    async fn current_user(&self) -> Result<Option<Identity>, BackendError> {
        let state = self.lock();
        Ok(state.session.and_then(|id| {
            state
                .accounts
                .iter()
                .find(|a| a.identity.id == id)
                .map(|a| a.identity.clone())
        }))
    }
}

#[async_trait]
impl TableStore for MemoryBackend {
    async fn select(&self, table: Table, filters: &[Filter]) -> Result<Vec<Value>, BackendError> {
        let mut state = self.lock();
        state.begin(table, Operation::Select)?;
        Ok(state
            .rows_mut(table)
            .iter()
            .filter(|row| matches_all(row, filters))
            .cloned()
            .collect())
    }

    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>, BackendError> {
        let mut state = self.lock();
        if !state.begin(table, Operation::Insert)? {
            return Ok(rows.into_iter().map(|row| state.stamp(table, row)).collect());
        }
        Ok(rows.into_iter().map(|row| state.store(table, row)).collect())
    }

    async fn update(&self, table: Table, patch: Value, filters: &[Filter]) -> Result<(), BackendError> {
        let mut state = self.lock();
        if !state.begin(table, Operation::Update)? {
            return Ok(());
        }

        let Value::Object(patch) = patch else {
            return Err(api_error(400, "PGRST102", "patch must be a JSON object"));
        };
        for row in state.rows_mut(table).iter_mut() {
            if !matches_all(row, filters) {
                continue;
            }
            if let Value::Object(object) = row {
                for (key, value) in &patch {
                    object.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<(), BackendError> {
        let mut state = self.lock();
        if state.begin(table, Operation::Delete)? {
            state.rows_mut(table).retain(|row| !matches_all(row, filters));
        }
        Ok(())
    }
}
