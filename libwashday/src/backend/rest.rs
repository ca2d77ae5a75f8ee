//! REST implementation of [`Backend`] for the hosted database and auth service
//!
//! Table requests go to `{url}/rest/v1/{table}` using PostgREST query
//! syntax; auth requests go to `{url}/auth/v1/*`.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::backend::{AuthUser, Backend, FilterOp, Query, Session};
use crate::config::BackendConfig;
use crate::error::{AuthError, BackendError, ConfigError, Result};

/// HTTP client for the hosted backend
pub struct RestBackend {
    base_url: String,
    anon_key: String,
    http: Client,
    access_token: RwLock<Option<String>>,
}

impl RestBackend {
    /// Create a client from the backend configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL or key is missing, or if the
    /// HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(ConfigError::MissingField("backend.url".to_string()).into());
        }
        if config.anon_key.trim().is_empty() {
            return Err(ConfigError::MissingField("backend.anon_key".to_string()).into());
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(BackendError::Http)?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            http,
            access_token: RwLock::new(None),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn bearer(&self) -> String {
        let token = self
            .access_token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        token.unwrap_or_else(|| self.anon_key.clone())
    }

    /// Attach the api key and bearer token
    fn authorize(&self, request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        let bearer = token.map(str::to_string).unwrap_or_else(|| self.bearer());
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn send_rows(&self, request: RequestBuilder) -> Result<Vec<Value>> {
        let response = request.send().await.map_err(BackendError::Http)?;
        let response = check_status(response).await?;
        let text = response.text().await.map_err(BackendError::Http)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let body: Value = serde_json::from_str(&text).map_err(BackendError::Decode)?;
        Ok(match body {
            Value::Array(rows) => rows,
            Value::Null => Vec::new(),
            row => vec![row],
        })
    }
}

/// Translate a [`Query`] into PostgREST query parameters
pub fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];

    for filter in &query.filters {
        let expr = match (&filter.value, filter.op) {
            (Value::Null, FilterOp::Eq) => "is.null".to_string(),
            (Value::Null, FilterOp::Neq) => "not.is.null".to_string(),
            (Value::String(s), op) => format!("{}.{}", op.as_str(), s),
            (other, op) => format!("{}.{}", op.as_str(), other),
        };
        params.push((filter.column.clone(), expr));
    }

    if !query.order.is_empty() {
        let order = query
            .order
            .iter()
            .map(|o| format!("{}.{}", o.column, if o.ascending { "asc" } else { "desc" }))
            .collect::<Vec<_>>()
            .join(",");
        params.push(("order".to_string(), order));
    }

    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }

    params
}

/// Map a non-2xx response to [`BackendError::Status`]
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        message: error_message(&text),
    }
    .into())
}

/// Pull a readable message out of an error body
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: String,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<AuthUser>,
}

impl TokenResponse {
    fn into_session(self) -> std::result::Result<Session, AuthError> {
        let access_token = self.access_token.ok_or_else(|| {
            AuthError::Rejected("account created but email confirmation is required".to_string())
        })?;
        let user = self
            .user
            .ok_or_else(|| AuthError::Rejected("auth response carried no user".to_string()))?;
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| chrono::Utc::now().timestamp() + secs));

        Ok(Session {
            access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user,
        })
    }
}

#[async_trait]
impl Backend for RestBackend {
    fn name(&self) -> &str {
        "rest"
    }

    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>> {
        tracing::debug!(table, filters = query.filters.len(), "select");
        let request = self
            .authorize(self.http.get(self.table_url(table)), None)
            .query(&query_params(query));
        self.send_rows(request).await
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>> {
        tracing::debug!(table, count = rows.len(), "insert");
        let request = self
            .authorize(self.http.post(self.table_url(table)), None)
            .header("Prefer", "return=representation")
            .json(&rows);
        self.send_rows(request).await
    }

    async fn upsert(&self, table: &str, rows: Vec<Value>, on_conflict: &str) -> Result<Vec<Value>> {
        tracing::debug!(table, on_conflict, "upsert");
        let request = self
            .authorize(self.http.post(self.table_url(table)), None)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .query(&[("on_conflict", on_conflict)])
            .json(&rows);
        self.send_rows(request).await
    }

    async fn update(&self, table: &str, query: &Query, patch: Value) -> Result<Vec<Value>> {
        tracing::debug!(table, filters = query.filters.len(), "update");
        let request = self
            .authorize(self.http.patch(self.table_url(table)), None)
            .header("Prefer", "return=representation")
            .query(&query_params(query))
            .json(&patch);
        self.send_rows(request).await
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<()> {
        tracing::debug!(table, filters = query.filters.len(), "delete");
        let request = self
            .authorize(self.http.delete(self.table_url(table)), None)
            .query(&query_params(query));
        self.send_rows(request).await?;
        Ok(())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .authorize(self.http.post(self.auth_url("token")), Some(&self.anon_key))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(BackendError::Http)?;

        if response.status().as_u16() == 400 {
            return Err(AuthError::InvalidCredentials.into());
        }

        let response = check_status(response).await?;
        let token: TokenResponse = response.json().await.map_err(BackendError::Http)?;
        Ok(token.into_session()?)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .authorize(self.http.post(self.auth_url("signup")), Some(&self.anon_key))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(BackendError::Http)?;

        let status = response.status();
        if status.is_client_error() {
            let text = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected(error_message(&text)).into());
        }

        let response = check_status(response).await?;
        let token: TokenResponse = response.json().await.map_err(BackendError::Http)?;
        Ok(token.into_session()?)
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        let response = self
            .authorize(self.http.post(self.auth_url("logout")), Some(&session.access_token))
            .send()
            .await
            .map_err(BackendError::Http)?;
        check_status(response).await?;
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser> {
        let response = self
            .authorize(self.http.get(self.auth_url("user")), Some(access_token))
            .send()
            .await
            .map_err(BackendError::Http)?;
        let response = check_status(response).await?;
        Ok(response.json().await.map_err(BackendError::Http)?)
    }

    async fn update_password(&self, session: &Session, new_password: &str) -> Result<()> {
        let response = self
            .authorize(self.http.put(self.auth_url("user")), Some(&session.access_token))
            .json(&json!({ "password": new_password }))
            .send()
            .await
            .map_err(BackendError::Http)?;

        if response.status().is_client_error() {
            let text = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected(error_message(&text)).into());
        }
        check_status(response).await?;
        Ok(())
    }

    fn set_access_token(&self, token: Option<String>) {
        *self
            .access_token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = token;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendProvider, Config};

    fn config() -> BackendConfig {
        let mut config = Config::default_config().backend;
        config.provider = BackendProvider::Rest;
        config.url = "https://demo.supabase.co/".to_string();
        config.anon_key = "anon-key".to_string();
        config
    }

    #[test]
    fn test_query_params_filters_and_order() {
        let query = Query::new()
            .eq("service_id", "s1")
            .eq("status", true)
            .order_asc("sequence")
            .order_desc("created_at")
            .limit(10);

        let params = query_params(&query);
        assert_eq!(
            params,
            vec![
                ("select".to_string(), "*".to_string()),
                ("service_id".to_string(), "eq.s1".to_string()),
                ("status".to_string(), "eq.true".to_string()),
                ("order".to_string(), "sequence.asc,created_at.desc".to_string()),
                ("limit".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_params_neq_and_null() {
        let query = Query::new()
            .neq("status", "cancelled")
            .eq("facility_id", Value::Null);

        let params = query_params(&query);
        assert_eq!(params[1], ("status".to_string(), "neq.cancelled".to_string()));
        assert_eq!(params[2], ("facility_id".to_string(), "is.null".to_string()));
    }

    #[test]
    fn test_urls_trim_trailing_slash() {
        let backend = RestBackend::new(&config()).unwrap();
        assert_eq!(backend.table_url("orders"), "https://demo.supabase.co/rest/v1/orders");
        assert_eq!(backend.auth_url("token"), "https://demo.supabase.co/auth/v1/token");
    }

    #[test]
    fn test_bearer_falls_back_to_anon_key() {
        let backend = RestBackend::new(&config()).unwrap();
        assert_eq!(backend.bearer(), "anon-key");

        backend.set_access_token(Some("user-token".to_string()));
        assert_eq!(backend.bearer(), "user-token");

        backend.set_access_token(None);
        assert_eq!(backend.bearer(), "anon-key");
    }

    #[test]
    fn test_missing_anon_key_is_config_error() {
        let mut config = config();
        config.anon_key = String::new();
        let err = RestBackend::new(&config).err().unwrap();
        assert!(err.to_string().contains("backend.anon_key"));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"message":"permission denied"}"#), "permission denied");
        assert_eq!(error_message(r#"{"msg":"User already registered"}"#), "User already registered");
        assert_eq!(error_message("gateway timeout\n"), "gateway timeout");
    }

    #[test]
    fn test_token_response_without_token_is_rejected() {
        let token: TokenResponse = serde_json::from_value(json!({
            "user": { "id": "u1", "email": "a@b.c" }
        }))
        .unwrap();
        assert!(matches!(token.into_session(), Err(AuthError::Rejected(_))));
    }

    #[test]
    fn test_token_response_computes_expiry() {
        let token: TokenResponse = serde_json::from_value(json!({
            "access_token": "jwt",
            "refresh_token": "r",
            "expires_in": 3600,
            "user": { "id": "u1", "email": "a@b.c" }
        }))
        .unwrap();
        let session = token.into_session().unwrap();
        assert_eq!(session.user.id, "u1");
        assert!(session.expires_at.unwrap() > chrono::Utc::now().timestamp());
    }
}
