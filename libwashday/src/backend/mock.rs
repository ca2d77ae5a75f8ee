//! In-memory backend for tests and offline use
//!
//! Rows live in a map of table name to JSON rows. The backend can be seeded
//! from a JSON fixture, told to fail specific operations, and inspected for
//! the calls it received. When created with [`MockBackend::persist_to`] every
//! mutation is written back to the fixture file, which lets separate CLI
//! invocations share state.
//!
//! Fixture layout: a JSON object whose keys are table names holding arrays
//! of rows, plus an optional `users` array of `{ id, email, password }`
//! accounts for the auth calls.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::backend::{AuthUser, Backend, Query, Session};
use crate::error::{AuthError, BackendError, Result};
use crate::types::tables;

const TOKEN_PREFIX: &str = "mock-token-";
const USERS_KEY: &str = "users";

/// Operation kinds recorded and matched by failure rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOp {
    Select,
    Insert,
    Upsert,
    Update,
    Delete,
    SignIn,
    SignUp,
    SignOut,
    GetUser,
    UpdatePassword,
}

/// A call received by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub op: MockOp,
    /// Table name, or empty for auth calls
    pub table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockAccount {
    pub id: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
struct FailureRule {
    op: MockOp,
    table: Option<String>,
    message: String,
}

#[derive(Debug, Default)]
struct MockState {
    tables: HashMap<String, Vec<Value>>,
    accounts: Vec<MockAccount>,
}

/// In-memory [`Backend`]
pub struct MockBackend {
    state: Mutex<MockState>,
    failures: Mutex<Vec<FailureRule>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    access_token: Mutex<Option<String>>,
    persist_path: Option<PathBuf>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            failures: Mutex::new(Vec::new()),
            calls: Arc::new(Mutex::new(Vec::new())),
            access_token: Mutex::new(None),
            persist_path: None,
        }
    }

    /// Load tables and accounts from a JSON fixture file
    pub fn from_fixture(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BackendError::Fixture(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    /// Load tables and accounts from fixture JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(content)
            .map_err(|e| BackendError::Fixture(format!("invalid JSON: {}", e)))?;
        let Value::Object(root) = root else {
            return Err(BackendError::Fixture("top level must be an object".to_string()).into());
        };

        let mut state = MockState::default();
        for (key, value) in root {
            if key == USERS_KEY {
                state.accounts = serde_json::from_value(value)
                    .map_err(|e| BackendError::Fixture(format!("invalid users: {}", e)))?;
                continue;
            }
            match value {
                Value::Array(rows) => {
                    state.tables.insert(key, rows);
                }
                _ => {
                    return Err(BackendError::Fixture(format!(
                        "table '{}' must be an array of rows",
                        key
                    ))
                    .into())
                }
            }
        }

        let backend = Self::new();
        *lock(&backend.state) = state;
        Ok(backend)
    }

    /// Write every mutation back to `path`
    pub fn persist_to(mut self, path: PathBuf) -> Self {
        self.persist_path = Some(path);
        self
    }

    /// Seed `table` with rows
    pub fn with_rows(self, table: &str, rows: Vec<Value>) -> Self {
        lock(&self.state)
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(rows);
        self
    }

    /// Register an account for the auth calls
    pub fn with_account(self, id: &str, email: &str, password: &str) -> Self {
        lock(&self.state).accounts.push(MockAccount {
            id: id.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        });
        self
    }

    /// Make `op` fail with a server error; `table = None` matches any table
    pub fn fail_on(&self, op: MockOp, table: Option<&str>, message: &str) {
        lock(&self.failures).push(FailureRule {
            op,
            table: table.map(str::to_string),
            message: message.to_string(),
        });
    }

    /// Remove all failure rules
    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// Calls received so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Number of calls of kind `op` against `table`
    pub fn call_count(&self, op: MockOp, table: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.op == op && c.table == table)
            .count()
    }

    /// Snapshot of a table's rows
    pub fn rows(&self, table: &str) -> Vec<Value> {
        lock(&self.state)
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Token currently attached to table requests
    pub fn access_token(&self) -> Option<String> {
        lock(&self.access_token).clone()
    }

    fn record(&self, op: MockOp, table: &str) -> Result<()> {
        lock(&self.calls).push(MockCall {
            op,
            table: table.to_string(),
        });

        let failures = lock(&self.failures);
        let rule = failures
            .iter()
            .find(|r| r.op == op && r.table.as_deref().map_or(true, |t| t == table));
        match rule {
            Some(rule) => Err(BackendError::Status {
                status: 500,
                message: rule.message.clone(),
            }
            .into()),
            None => Ok(()),
        }
    }

    fn flush(&self, state: &MockState) -> Result<()> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };

        let mut root = Map::new();
        for (table, rows) in &state.tables {
            root.insert(table.clone(), Value::Array(rows.clone()));
        }
        let accounts = serde_json::to_value(&state.accounts).map_err(BackendError::Decode)?;
        root.insert(USERS_KEY.to_string(), accounts);

        let text = serde_json::to_string_pretty(&Value::Object(root)).map_err(BackendError::Decode)?;
        std::fs::write(path, text)
            .map_err(|e| BackendError::Fixture(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "memory backend flushed");
        Ok(())
    }

    fn session_for(account: &MockAccount) -> Session {
        Session {
            access_token: format!("{}{}", TOKEN_PREFIX, account.id),
            refresh_token: format!("mock-refresh-{}", account.id),
            expires_at: None,
            user: AuthUser {
                id: account.id.clone(),
                email: Some(account.email.clone()),
            },
        }
    }

    fn account_for_token<'a>(state: &'a mut MockState, token: &str) -> Option<&'a mut MockAccount> {
        let id = token.strip_prefix(TOKEN_PREFIX)?;
        state.accounts.iter_mut().find(|a| a.id == id)
    }
}

/// Fill in server-assigned columns
fn stamp_new_row(table: &str, row: &mut Map<String, Value>, sequence: usize) {
    let now = Value::String(Utc::now().to_rfc3339());
    row.entry("id")
        .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()));
    row.entry("created_at").or_insert_with(|| now.clone());
    row.entry("updated_at").or_insert(now);
    if table == tables::ORDERS {
        row.entry("order_number")
            .or_insert_with(|| Value::String(format!("ORD-{:06}", sequence)));
    }
}

fn merge(target: &mut Value, patch: &Value) {
    if let (Value::Object(target), Value::Object(patch)) = (target, patch) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
        target.insert(
            "updated_at".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn matches(query: &Query, row: &Value) -> bool {
    query.filters.iter().all(|f| f.matches(row))
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>> {
        self.record(MockOp::Select, table)?;
        let state = lock(&self.state);
        let mut rows: Vec<Value> = state
            .tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| matches(query, r)).cloned().collect())
            .unwrap_or_default();

        rows.sort_by(|a, b| {
            query
                .order
                .iter()
                .map(|o| {
                    let ord = compare_values(
                        a.get(&o.column).unwrap_or(&Value::Null),
                        b.get(&o.column).unwrap_or(&Value::Null),
                    );
                    if o.ascending {
                        ord
                    } else {
                        ord.reverse()
                    }
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>> {
        self.record(MockOp::Insert, table)?;
        let mut state = lock(&self.state);
        let stored = state.tables.entry(table.to_string()).or_default();

        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            let Value::Object(mut row) = row else {
                return Err(BackendError::Status {
                    status: 400,
                    message: "row must be a JSON object".to_string(),
                }
                .into());
            };
            stamp_new_row(table, &mut row, stored.len() + 1);
            let row = Value::Object(row);
            stored.push(row.clone());
            inserted.push(row);
        }

        self.flush(&state)?;
        Ok(inserted)
    }

    async fn upsert(&self, table: &str, rows: Vec<Value>, on_conflict: &str) -> Result<Vec<Value>> {
        self.record(MockOp::Upsert, table)?;
        let mut state = lock(&self.state);
        let stored = state.tables.entry(table.to_string()).or_default();

        let mut written = Vec::with_capacity(rows.len());
        for row in rows {
            let key = row.get(on_conflict).cloned().unwrap_or(Value::Null);
            let existing = stored
                .iter_mut()
                .find(|r| !key.is_null() && r.get(on_conflict) == Some(&key));
            match existing {
                Some(existing) => {
                    merge(existing, &row);
                    written.push(existing.clone());
                }
                None => {
                    let Value::Object(mut row) = row else {
                        return Err(BackendError::Status {
                            status: 400,
                            message: "row must be a JSON object".to_string(),
                        }
                        .into());
                    };
                    stamp_new_row(table, &mut row, stored.len() + 1);
                    let row = Value::Object(row);
                    stored.push(row.clone());
                    written.push(row);
                }
            }
        }

        self.flush(&state)?;
        Ok(written)
    }

    async fn update(&self, table: &str, query: &Query, patch: Value) -> Result<Vec<Value>> {
        self.record(MockOp::Update, table)?;
        let mut state = lock(&self.state);
        let mut updated = Vec::new();
        if let Some(rows) = state.tables.get_mut(table) {
            for row in rows.iter_mut().filter(|r| matches(query, r)) {
                merge(row, &patch);
                updated.push(row.clone());
            }
        }
        self.flush(&state)?;
        Ok(updated)
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<()> {
        self.record(MockOp::Delete, table)?;
        let mut state = lock(&self.state);
        if let Some(rows) = state.tables.get_mut(table) {
            rows.retain(|r| !matches(query, r));
        }
        self.flush(&state)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        self.record(MockOp::SignIn, "")?;
        let state = lock(&self.state);
        state
            .accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email) && a.password == password)
            .map(Self::session_for)
            .ok_or_else(|| AuthError::InvalidCredentials.into())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        self.record(MockOp::SignUp, "")?;
        let mut state = lock(&self.state);
        if state.accounts.iter().any(|a| a.email.eq_ignore_ascii_case(email)) {
            return Err(AuthError::Rejected("User already registered".to_string()).into());
        }

        let account = MockAccount {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let session = Self::session_for(&account);
        state.accounts.push(account);
        self.flush(&state)?;
        Ok(session)
    }

    async fn sign_out(&self, _session: &Session) -> Result<()> {
        self.record(MockOp::SignOut, "")
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser> {
        self.record(MockOp::GetUser, "")?;
        let mut state = lock(&self.state);
        Self::account_for_token(&mut state, access_token)
            .map(|a| AuthUser {
                id: a.id.clone(),
                email: Some(a.email.clone()),
            })
            .ok_or_else(|| {
                BackendError::Status {
                    status: 401,
                    message: "invalid JWT".to_string(),
                }
                .into()
            })
    }

    async fn update_password(&self, session: &Session, new_password: &str) -> Result<()> {
        self.record(MockOp::UpdatePassword, "")?;
        let mut state = lock(&self.state);
        let account = Self::account_for_token(&mut state, &session.access_token)
            .ok_or(AuthError::NotSignedIn)?;
        account.password = new_password.to_string();
        self.flush(&state)
    }

    fn set_access_token(&self, token: Option<String>) {
        *lock(&self.access_token) = token;
    }
}
