//! Outcome of a remote read
//!
//! Reads never fail outward. They resolve to data, a legitimately empty
//! result, or a failure carrying its reason, so callers can tell "nothing
//! there" apart from "could not fetch".

use serde::Serialize;

use crate::error::{BackendError, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Fetched<T> {
    Data(T),
    Empty,
    Failed(String),
}

impl<T> Fetched<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, Fetched::Failed(_))
    }

    pub fn data(self) -> Option<T> {
        match self {
            Fetched::Data(data) => Some(data),
            Fetched::Empty | Fetched::Failed(_) => None,
        }
    }

    pub fn as_data(&self) -> Option<&T> {
        match self {
            Fetched::Data(data) => Some(data),
            Fetched::Empty | Fetched::Failed(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        match self {
            Fetched::Data(data) => Fetched::Data(f(data)),
            Fetched::Empty => Fetched::Empty,
            Fetched::Failed(reason) => Fetched::Failed(reason),
        }
    }

    /// Back to a `Result`, with `Empty` mapped through `on_empty`
    pub fn into_result(self, on_empty: impl FnOnce() -> crate::error::WashdayError) -> Result<T> {
        match self {
            Fetched::Data(data) => Ok(data),
            Fetched::Empty => Err(on_empty()),
            Fetched::Failed(reason) => Err(BackendError::Unavailable(reason).into()),
        }
    }
}

impl<T> Fetched<Vec<T>> {
    /// Collections: an empty vector is `Empty`
    pub fn from_list(result: Result<Vec<T>>, what: &str) -> Self {
        match result {
            Ok(rows) if rows.is_empty() => Fetched::Empty,
            Ok(rows) => Fetched::Data(rows),
            Err(e) => Self::failed(what, e),
        }
    }

    /// Collections as a plain vector; failures become empty after logging
    pub fn into_vec(self) -> Vec<T> {
        self.data().unwrap_or_default()
    }
}

impl<T> Fetched<T> {
    /// Single rows: `None` is `Empty`
    pub fn from_option(result: Result<Option<T>>, what: &str) -> Self {
        match result {
            Ok(Some(row)) => Fetched::Data(row),
            Ok(None) => Fetched::Empty,
            Err(e) => Self::failed(what, e),
        }
    }

    fn failed(what: &str, error: crate::error::WashdayError) -> Self {
        tracing::error!(error = %error, "failed to fetch {}", what);
        Fetched::Failed(error.to_string())
    }
}
