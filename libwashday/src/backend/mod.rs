//! Hosted backend abstraction
//!
//! The backend is a row-oriented REST database plus an auth endpoint. This
//! module defines the [`Backend`] trait every implementation provides, the
//! [`Query`] builder used to express filters and ordering, and the session
//! types returned by the auth calls.
//!
//! Two implementations ship with the crate:
//!
//! - [`rest::RestBackend`] talks to the hosted service over HTTP
//! - [`mock::MockBackend`] keeps rows in memory for tests and offline demos
//!
//! ```no_run
//! use libwashday::backend::{Backend, Query, rest::RestBackend};
//! use libwashday::config::Config;
//!
//! # async fn example() -> libwashday::Result<()> {
//! let config = Config::load()?;
//! let backend = RestBackend::new(&config.backend)?;
//!
//! let rows = backend
//!     .select("services", &Query::new().eq("status", true).order_asc("sequence"))
//!     .await?;
//! println!("{} active services", rows.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{BackendProvider, Config};
use crate::error::{BackendError, Result};

pub mod mock;
pub mod rest;

/// Comparison applied by a [`Filter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    /// Whether `row` satisfies this filter
    pub fn matches(&self, row: &Value) -> bool {
        let actual = row.get(&self.column).unwrap_or(&Value::Null);
        let equal = actual == &self.value;
        match self.op {
            FilterOp::Eq => equal,
            FilterOp::Neq => !equal,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

/// Filters, ordering and limit for a table request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Vec<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op: FilterOp::Eq,
            value: value.into(),
        });
        self
    }

    pub fn neq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op: FilterOp::Neq,
            value: value.into(),
        });
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order.push(OrderBy {
            column: column.to_string(),
            ascending: true,
        });
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order.push(OrderBy {
            column: column.to_string(),
            ascending: false,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether the query filters on `column`
    pub fn filters_on(&self, column: &str) -> bool {
        self.filters.iter().any(|f| f.column == column)
    }
}

/// Identity returned by the auth endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Signed-in session
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

impl Session {
    /// Whether the access token expired at `now` (unix seconds)
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Unified interface to the hosted database and auth service
///
/// Table operations take and return raw JSON rows; typed decoding happens in
/// the service layer through [`decode_rows`]. Implementations must not retry
/// or cache.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short identifier used in logs (e.g. "rest", "memory")
    fn name(&self) -> &str;

    /// Select rows from `table`
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>>;

    /// Insert one or more rows and return them as stored
    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>>;

    /// Insert or replace rows keyed by `on_conflict`
    async fn upsert(&self, table: &str, rows: Vec<Value>, on_conflict: &str) -> Result<Vec<Value>>;

    /// Patch every row matching `query` and return the updated rows
    async fn update(&self, table: &str, query: &Query, patch: Value) -> Result<Vec<Value>>;

    /// Delete every row matching `query`
    async fn delete(&self, table: &str, query: &Query) -> Result<()>;

    /// Exchange email and password for a session
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    /// Register a new account; returns the new session
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session>;

    /// Revoke the session on the server
    async fn sign_out(&self, session: &Session) -> Result<()>;

    /// Resolve the user behind an access token
    async fn get_user(&self, access_token: &str) -> Result<AuthUser>;

    /// Change the signed-in user's password
    async fn update_password(&self, session: &Session, new_password: &str) -> Result<()>;

    /// Token sent with table requests; `None` falls back to the anon key
    fn set_access_token(&self, token: Option<String>);
}

/// Decode raw rows into typed records
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(|e| BackendError::Decode(e).into()))
        .collect()
}

/// Decode the first row, if any
pub fn decode_first<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Option<T>> {
    match rows.into_iter().next() {
        Some(row) => Ok(Some(serde_json::from_value(row).map_err(BackendError::Decode)?)),
        None => Ok(None),
    }
}

/// Serialize a typed payload into a row
pub fn encode_row<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value).map_err(BackendError::Decode)?)
}

/// Build the backend selected by the configuration
pub fn from_config(config: &Config) -> Result<Arc<dyn Backend>> {
    match config.backend.provider {
        BackendProvider::Rest => Ok(Arc::new(rest::RestBackend::new(&config.backend)?)),
        BackendProvider::Memory => {
            let backend = match config.fixture_path() {
                Some(path) => mock::MockBackend::from_fixture(&path)?.persist_to(path),
                None => mock::MockBackend::new(),
            };
            Ok(Arc::new(backend))
        }
    }
}
