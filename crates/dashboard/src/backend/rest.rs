//! HTTP client for a hosted Supabase project.
//!
//! Tables are reached through the PostgREST endpoint and accounts through
//! the GoTrue endpoint, both under the project URL.
//!
//! # API Reference
//!
//! - Tables: `{project}/rest/v1/{table}`, filters as `column=eq.value`
//! - Auth: `{project}/auth/v1/{signup,token,logout,user}`
//! - Every request carries the anon key in the `apikey` header and a bearer
//!   token: the signed-in user's access token, or the anon key

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use restodash_core::Email;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

use super::{AuthError, AuthEvent, AuthProvider, Backend, BackendError, Query, Table};
use crate::config::BackendConfig;
use crate::models::{Identity, UserMetadata};

const EVENT_CAPACITY: usize = 64;

/// Supabase REST + auth client.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    rest_url: String,
    auth_url: String,
    anon_key: SecretString,
    /// Access token of the signed-in user
    session: RwLock<Option<SecretString>>,
    events: broadcast::Sender<AuthEvent>,
}

/// PostgREST error body.
#[derive(Debug, Default, Deserialize)]
struct RestErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// GoTrue error body. Field names vary across versions.
#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Session returned by sign-in and (without email confirmation) sign-up.
#[derive(Deserialize)]
struct SessionResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<Identity>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: &'a UserMetadata,
}

impl SupabaseClient {
    /// Create a new client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns error if the anon key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(config.anon_key.expose_secret())
                .map_err(|e| BackendError::Decode(format!("Invalid anon key format: {e}")))?,
        );
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                client,
                rest_url: config.rest_url(),
                auth_url: config.auth_url(),
                anon_key: config.anon_key.clone(),
                session: RwLock::new(None),
                events,
            }),
        })
    }

    /// Bearer token for the next request.
    async fn bearer(&self) -> String {
        self.inner.session.read().await.as_ref().map_or_else(
            || self.inner.anon_key.expose_secret().to_string(),
            |token| token.expose_secret().to_string(),
        )
    }

    async fn access_token(&self) -> Result<String, AuthError> {
        self.inner
            .session
            .read()
            .await
            .as_ref()
            .map(|token| token.expose_secret().to_string())
            .ok_or(AuthError::SessionMissing)
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    // =========================================================================
    // Tables
    // =========================================================================

    fn table_url(&self, table: Table, params: &[(String, String)]) -> Result<Url, BackendError> {
        let mut url = Url::parse(&format!("{}/{}", self.inner.rest_url, table.name()))
            .map_err(|e| BackendError::Decode(format!("Invalid table URL: {e}")))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    async fn send_rows(&self, request: reqwest::RequestBuilder) -> Result<Vec<Value>, BackendError> {
        let response = request
            .bearer_auth(self.bearer().await)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            if body.trim().is_empty() {
                return Ok(Vec::new());
            }
            return parse_rows(&body);
        }

        Err(parse_rest_error(status.as_u16(), &body))
    }

    // =========================================================================
    // Auth
    // =========================================================================

    fn auth_endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.inner.auth_url)
    }

    async fn send_auth(&self, request: reqwest::RequestBuilder) -> Result<Value, AuthError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| AuthError::Api {
                status: status.as_u16(),
                message: format!("Failed to parse response: {e}"),
            });
        }

        Err(parse_auth_error(status.as_u16(), &body))
    }

    /// Cache the session from a sign-in/sign-up response and announce it.
    async fn establish(&self, body: Value) -> Result<Identity, AuthError> {
        let parsed: SessionResponse = serde_json::from_value(body.clone()).map_err(|e| AuthError::Api {
            status: 200,
            message: format!("Failed to parse session: {e}"),
        })?;

        // Sign-up awaiting email confirmation returns the bare user
        let identity = match parsed.user {
            Some(user) => user,
            None => serde_json::from_value(body).map_err(|e| AuthError::Api {
                status: 200,
                message: format!("Failed to parse user: {e}"),
            })?,
        };

        if let Some(token) = parsed.access_token {
            *self.inner.session.write().await = Some(SecretString::from(token));
            self.emit(AuthEvent::SignedIn(identity.clone()));
        }
        Ok(identity)
    }

    async fn put_user(&self, body: &Value) -> Result<Identity, AuthError> {
        let token = self.access_token().await?;
        let request = self
            .inner
            .client
            .put(self.auth_endpoint("/user"))
            .bearer_auth(token)
            .json(body);
        let user = self.send_auth(request).await?;
        let identity: Identity = serde_json::from_value(user).map_err(|e| AuthError::Api {
            status: 200,
            message: format!("Failed to parse user: {e}"),
        })?;

        self.emit(AuthEvent::UserUpdated(identity.clone()));
        Ok(identity)
    }
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("rest_url", &self.inner.rest_url)
            .field("auth_url", &self.inner.auth_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Backend for SupabaseClient {
    #[instrument(skip_all, fields(table = %query.table))]
    async fn fetch(&self, query: &Query) -> Result<Vec<Value>, BackendError> {
        let url = self.table_url(query.table, &select_params(query))?;
        let rows = self.send_rows(self.inner.client.get(url)).await?;
        debug!(count = rows.len(), "Fetched rows");
        Ok(rows)
    }

    #[instrument(skip_all, fields(table = %query.table))]
    async fn fetch_single(&self, query: &Query) -> Result<Option<Value>, BackendError> {
        let mut params = select_params(query);
        // Two is enough to tell "one" from "many"
        params.push(("limit".to_string(), "2".to_string()));
        let url = self.table_url(query.table, &params)?;
        let rows = self.send_rows(self.inner.client.get(url)).await?;
        single_row(rows)
    }

    #[instrument(skip_all, fields(table = %table))]
    async fn insert(&self, table: Table, row: Value) -> Result<Value, BackendError> {
        let url = self.table_url(table, &[])?;
        let request = self
            .inner
            .client
            .post(url)
            .header("Prefer", "return=representation")
            .json(&row);
        first_row(table, self.send_rows(request).await?)
    }

    #[instrument(skip_all, fields(table = %table, on_conflict = on_conflict))]
    async fn upsert(
        &self,
        table: Table,
        row: Value,
        on_conflict: &'static str,
    ) -> Result<Value, BackendError> {
        let url = self.table_url(table, &[("on_conflict".to_string(), on_conflict.to_string())])?;
        let request = self
            .inner
            .client
            .post(url)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&row);
        first_row(table, self.send_rows(request).await?)
    }

    #[instrument(skip_all, fields(table = %table, id = %id))]
    async fn update(&self, table: Table, id: Uuid, patch: Value) -> Result<Value, BackendError> {
        let url = self.table_url(table, &[id_filter(id)])?;
        let request = self
            .inner
            .client
            .patch(url)
            .header("Prefer", "return=representation")
            .json(&patch);
        let rows = self.send_rows(request).await?;
        rows.into_iter()
            .next()
            .ok_or(BackendError::NotFound { table, id })
    }

    #[instrument(skip_all, fields(table = %table, id = %id))]
    async fn delete(&self, table: Table, id: Uuid) -> Result<(), BackendError> {
        let url = self.table_url(table, &[id_filter(id)])?;
        self.send_rows(self.inner.client.delete(url)).await?;
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for SupabaseClient {
    #[instrument(skip_all, fields(email = %email))]
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        metadata: UserMetadata,
    ) -> Result<Identity, AuthError> {
        let request = self
            .inner
            .client
            .post(self.auth_endpoint("/signup"))
            .bearer_auth(self.inner.anon_key.expose_secret())
            .json(&SignUpRequest {
                email: email.as_str(),
                password: password.expose_secret(),
                data: &metadata,
            });
        let body = self.send_auth(request).await?;
        self.establish(body).await
    }

    #[instrument(skip_all, fields(email = %email))]
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Identity, AuthError> {
        let request = self
            .inner
            .client
            .post(self.auth_endpoint("/token?grant_type=password"))
            .bearer_auth(self.inner.anon_key.expose_secret())
            .json(&Credentials {
                email: email.as_str(),
                password: password.expose_secret(),
            });
        let body = self.send_auth(request).await?;
        self.establish(body).await
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), AuthError> {
        let token = self.access_token().await?;
        let response = self
            .inner
            .client
            .post(self.auth_endpoint("/logout"))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        // An already-expired token still ends the local session
        if !status.is_success() && status.as_u16() != 401 {
            let body = response.text().await.unwrap_or_default();
            return Err(parse_auth_error(status.as_u16(), &body));
        }

        *self.inner.session.write().await = None;
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    async fn current_identity(&self) -> Result<Option<Identity>, AuthError> {
        let Ok(token) = self.access_token().await else {
            return Ok(None);
        };

        let request = self
            .inner
            .client
            .get(self.auth_endpoint("/user"))
            .bearer_auth(token);
        match self.send_auth(request).await {
            Ok(user) => serde_json::from_value(user).map(Some).map_err(|e| AuthError::Api {
                status: 200,
                message: format!("Failed to parse user: {e}"),
            }),
            Err(AuthError::SessionMissing) => {
                warn!("Cached session was rejected; clearing it");
                *self.inner.session.write().await = None;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip_all)]
    async fn update_password(&self, password: &SecretString) -> Result<(), AuthError> {
        let body = serde_json::json!({ "password": password.expose_secret() });
        self.put_user(&body).await.map(|_| ())
    }

    #[instrument(skip_all)]
    async fn update_metadata(&self, metadata: UserMetadata) -> Result<Identity, AuthError> {
        let body = serde_json::json!({ "data": metadata });
        self.put_user(&body).await
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }
}

// =============================================================================
// Request/response helpers
// =============================================================================

/// PostgREST query parameters for a select.
fn select_params(query: &Query) -> Vec<(String, String)> {
    let select = query
        .embed
        .map_or_else(|| "*".to_string(), |embed| format!("*,{}(*)", embed.name()));

    let mut params = vec![("select".to_string(), select)];
    params.extend(
        query
            .filters
            .iter()
            .map(|f| (f.column.to_string(), format!("eq.{}", filter_literal(&f.value)))),
    );
    params
}

/// Filter value as PostgREST expects it: strings bare, everything else as JSON.
fn filter_literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn id_filter(id: Uuid) -> (String, String) {
    ("id".to_string(), format!("eq.{id}"))
}

fn parse_rows(body: &str) -> Result<Vec<Value>, BackendError> {
    match serde_json::from_str(body) {
        Ok(Value::Array(rows)) => Ok(rows),
        Ok(Value::Object(row)) => Ok(vec![Value::Object(row)]),
        Ok(other) => Err(BackendError::Decode(format!("Expected rows, got {other}"))),
        Err(e) => Err(BackendError::Decode(format!("Failed to parse response: {e}"))),
    }
}

fn single_row(mut rows: Vec<Value>) -> Result<Option<Value>, BackendError> {
    match rows.len() {
        0 => Ok(None),
        1 => Ok(rows.pop()),
        _ => Err(BackendError::Api {
            status: 406,
            code: "PGRST116".to_string(),
            message: "JSON object requested, multiple rows returned".to_string(),
        }),
    }
}

fn first_row(table: Table, rows: Vec<Value>) -> Result<Value, BackendError> {
    rows.into_iter().next().ok_or_else(|| {
        BackendError::Decode(format!("{table} write returned no representation"))
    })
}

/// Map a PostgREST error response.
fn parse_rest_error(status: u16, body: &str) -> BackendError {
    let parsed: RestErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed.code.unwrap_or_default();
    let message = parsed
        .message
        .or(parsed.details)
        .unwrap_or_else(|| body.to_string());

    match (status, code.as_str()) {
        // unique_violation, foreign_key_violation
        (409, _) | (_, "23505" | "23503") => BackendError::Conflict(message),
        (502..=504, _) => BackendError::Unavailable(message),
        _ => BackendError::Api {
            status,
            code,
            message,
        },
    }
}

/// Map a GoTrue error response.
fn parse_auth_error(status: u16, body: &str) -> AuthError {
    let parsed: AuthErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed.error_code.unwrap_or_default();
    let message = parsed
        .msg
        .or(parsed.message)
        .or(parsed.error_description)
        .unwrap_or_else(|| body.to_string());

    match code.as_str() {
        "invalid_credentials" => return AuthError::InvalidCredentials,
        "user_already_exists" | "email_exists" => return AuthError::UserAlreadyExists,
        "session_not_found" | "no_authorization" | "bad_jwt" => return AuthError::SessionMissing,
        _ => {}
    }

    if message.contains("Invalid login credentials") {
        AuthError::InvalidCredentials
    } else if message.contains("already registered") {
        AuthError::UserAlreadyExists
    } else if status == 401 || status == 403 {
        AuthError::SessionMissing
    } else {
        AuthError::Api { status, message }
    }
}
