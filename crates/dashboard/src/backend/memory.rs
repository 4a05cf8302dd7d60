//! In-process backend and auth provider.
//!
//! Used by tests and local development. Behaves like the hosted schema:
//! generated IDs and timestamps, foreign keys to the parent row, menu
//! deletion cascading to its items, and restaurant deletion blocked while
//! anything still references it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use restodash_core::{Email, UserId};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{AuthError, AuthEvent, AuthProvider, Backend, BackendError, Query, Table};
use crate::models::{Identity, Plan, UserMetadata};

/// Auth event buffer per subscriber.
const EVENT_CAPACITY: usize = 64;

/// Child-to-parent references enforced on insert and delete.
///
/// `(child, column, parent, cascade)`: with `cascade` the children are
/// deleted along with the parent, otherwise the parent delete is rejected.
const FOREIGN_KEYS: &[(Table, &str, Table, bool)] = &[
    (Table::Menus, "restaurant_id", Table::Restaurants, false),
    (Table::AdCampaigns, "restaurant_id", Table::Restaurants, false),
    (Table::Subscriptions, "restaurant_id", Table::Restaurants, false),
    (Table::Subscriptions, "plan_id", Table::Plans, false),
    (Table::MenuItems, "menu_id", Table::Menus, true),
];

/// Column on the referencing row used to embed `table`.
const fn embed_column(table: Table) -> &'static str {
    match table {
        Table::Restaurants => "restaurant_id",
        Table::Menus => "menu_id",
        Table::MenuItems => "menu_item_id",
        Table::AdCampaigns => "ad_campaign_id",
        Table::Subscriptions => "subscription_id",
        Table::Plans => "plan_id",
    }
}

// =============================================================================
// MemoryBackend
// =============================================================================

/// Tables held in memory.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<MemoryBackendInner>,
}

#[derive(Default)]
struct MemoryBackendInner {
    tables: Mutex<BTreeMap<Table, Vec<Value>>>,
    fail_next: Mutex<Option<String>>,
    fetches: AtomicUsize,
}

impl MemoryBackend {
    /// An empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose `plans` table holds the plan catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if a plan fails to serialize.
    pub async fn with_plan_catalog() -> Result<Self, BackendError> {
        let backend = Self::new();
        for plan in Plan::catalog() {
            let row = serde_json::to_value(&plan).map_err(|e| BackendError::Decode(e.to_string()))?;
            backend.seed(Table::Plans, row).await;
        }
        Ok(backend)
    }

    /// Put a row in place as-is, bypassing constraints.
    pub async fn seed(&self, table: Table, row: Value) {
        self.inner.tables.lock().await.entry(table).or_default().push(row);
    }

    /// Make the next call fail with [`BackendError::Unavailable`].
    pub async fn fail_next(&self, message: impl Into<String>) {
        *self.inner.fail_next.lock().await = Some(message.into());
    }

    /// Rows currently stored in `table`.
    pub async fn rows(&self, table: Table) -> Vec<Value> {
        self.inner
            .tables
            .lock()
            .await
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    /// How many `fetch`/`fetch_single` calls have been served.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    async fn take_failure(&self) -> Result<(), BackendError> {
        match self.inner.fail_next.lock().await.take() {
            Some(message) => Err(BackendError::Unavailable(message)),
            None => Ok(()),
        }
    }

    async fn select(&self, query: &Query) -> Result<Vec<Value>, BackendError> {
        self.take_failure().await?;
        self.inner.fetches.fetch_add(1, Ordering::SeqCst);

        let tables = self.inner.tables.lock().await;
        let rows = tables.get(&query.table).map_or(&[][..], Vec::as_slice);

        let selected = rows
            .iter()
            .filter(|row| query.filters.iter().all(|f| f.matches(row)))
            .map(|row| {
                let mut row = row.clone();
                if let Some(embed) = query.embed {
                    let related = row
                        .get(embed_column(embed))
                        .and_then(|key| find_by_id(tables.get(&embed), key))
                        .cloned()
                        .unwrap_or(Value::Null);
                    if let Value::Object(map) = &mut row {
                        map.insert(embed.name().to_string(), related);
                    }
                }
                row
            })
            .collect();

        Ok(selected)
    }
}

fn find_by_id<'a>(rows: Option<&'a Vec<Value>>, key: &Value) -> Option<&'a Value> {
    rows?.iter().find(|row| row.get("id") == Some(key))
}

fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

fn into_object(table: Table, row: Value) -> Result<Map<String, Value>, BackendError> {
    match row {
        Value::Object(map) => Ok(map),
        other => Err(BackendError::Decode(format!(
            "{table} row must be a JSON object, got {other}"
        ))),
    }
}

/// Reject a row whose parent references point at nothing.
fn check_references(
    tables: &BTreeMap<Table, Vec<Value>>,
    table: Table,
    row: &Map<String, Value>,
) -> Result<(), BackendError> {
    for &(child, column, parent, _) in FOREIGN_KEYS {
        if child != table {
            continue;
        }
        let Some(key) = row.get(column) else {
            return Err(BackendError::Conflict(format!(
                "null value in column \"{column}\" of relation \"{table}\""
            )));
        };
        if find_by_id(tables.get(&parent), key).is_none() {
            return Err(BackendError::Conflict(format!(
                "insert or update on \"{table}\" violates foreign key \"{column}\" to \"{parent}\""
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl Backend for MemoryBackend {
    #[instrument(skip_all, fields(table = %query.table))]
    async fn fetch(&self, query: &Query) -> Result<Vec<Value>, BackendError> {
        let rows = self.select(query).await?;
        debug!(count = rows.len(), "Fetched rows");
        Ok(rows)
    }

    #[instrument(skip_all, fields(table = %query.table))]
    async fn fetch_single(&self, query: &Query) -> Result<Option<Value>, BackendError> {
        let mut rows = self.select(query).await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            n => Err(BackendError::Api {
                status: 406,
                code: "PGRST116".to_string(),
                message: format!("JSON object requested, multiple ({n}) rows returned"),
            }),
        }
    }

    #[instrument(skip_all, fields(table = %table))]
    async fn insert(&self, table: Table, row: Value) -> Result<Value, BackendError> {
        self.take_failure().await?;
        let mut row = into_object(table, row)?;
        row.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        row.entry("created_at")
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));

        let mut tables = self.inner.tables.lock().await;
        check_references(&tables, table, &row)?;

        let rows = tables.entry(table).or_default();
        if rows.iter().any(|r| r.get("id") == row.get("id")) {
            return Err(BackendError::Conflict(format!(
                "duplicate key value violates unique constraint \"{table}_pkey\""
            )));
        }

        let row = Value::Object(row);
        rows.push(row.clone());
        Ok(row)
    }

    #[instrument(skip_all, fields(table = %table))]
    async fn upsert(
        &self,
        table: Table,
        row: Value,
        on_conflict: &'static str,
    ) -> Result<Value, BackendError> {
        self.take_failure().await?;
        let mut row = into_object(table, row)?;
        let key = row.get(on_conflict).cloned().ok_or_else(|| {
            BackendError::Conflict(format!("upsert row has no \"{on_conflict}\" value"))
        })?;

        let mut tables = self.inner.tables.lock().await;
        let existing = tables
            .get(&table)
            .and_then(|rows| rows.iter().position(|r| r.get(on_conflict) == Some(&key)));

        if let Some(index) = existing {
            let rows = tables.entry(table).or_default();
            let Some(Value::Object(stored)) = rows.get_mut(index) else {
                return Err(BackendError::Decode(format!("{table} row is not an object")));
            };
            row.remove("id");
            stored.extend(row);
            return Ok(Value::Object(stored.clone()));
        }

        row.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        row.entry("created_at")
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
        check_references(&tables, table, &row)?;

        let row = Value::Object(row);
        tables.entry(table).or_default().push(row.clone());
        Ok(row)
    }

    #[instrument(skip_all, fields(table = %table, id = %id))]
    async fn update(&self, table: Table, id: Uuid, patch: Value) -> Result<Value, BackendError> {
        self.take_failure().await?;
        let mut patch = into_object(table, patch)?;
        patch.remove("id");

        let mut tables = self.inner.tables.lock().await;
        let key = id.to_string();
        let index = tables
            .get(&table)
            .and_then(|rows| rows.iter().position(|r| row_id(r) == Some(key.as_str())))
            .ok_or(BackendError::NotFound { table, id })?;

        let mut merged = match tables.get(&table).and_then(|rows| rows.get(index)) {
            Some(Value::Object(stored)) => stored.clone(),
            _ => return Err(BackendError::Decode(format!("{table} row is not an object"))),
        };
        merged.extend(patch);
        check_references(&tables, table, &merged)?;

        let merged = Value::Object(merged);
        if let Some(slot) = tables.entry(table).or_default().get_mut(index) {
            *slot = merged.clone();
        }
        Ok(merged)
    }

    #[instrument(skip_all, fields(table = %table, id = %id))]
    async fn delete(&self, table: Table, id: Uuid) -> Result<(), BackendError> {
        self.take_failure().await?;
        let key = Value::String(id.to_string());
        let mut tables = self.inner.tables.lock().await;

        // PostgREST answers a delete that matches nothing with an empty result
        let exists = tables
            .get(&table)
            .is_some_and(|rows| rows.iter().any(|r| r.get("id") == Some(&key)));
        if !exists {
            return Ok(());
        }

        for &(child, column, parent, cascade) in FOREIGN_KEYS {
            if parent != table || cascade {
                continue;
            }
            let referenced = tables
                .get(&child)
                .is_some_and(|rows| rows.iter().any(|r| r.get(column) == Some(&key)));
            if referenced {
                return Err(BackendError::Conflict(format!(
                    "update or delete on \"{table}\" violates foreign key on \"{child}\""
                )));
            }
        }

        for &(child, column, parent, cascade) in FOREIGN_KEYS {
            if parent == table && cascade
                && let Some(rows) = tables.get_mut(&child)
            {
                rows.retain(|r| r.get(column) != Some(&key));
            }
        }

        if let Some(rows) = tables.get_mut(&table) {
            rows.retain(|r| r.get("id") != Some(&key));
        }
        Ok(())
    }
}

// =============================================================================
// MemoryAuth
// =============================================================================

struct Account {
    identity: Identity,
    password: SecretString,
}

/// Accounts held in memory.
#[derive(Clone)]
pub struct MemoryAuth {
    inner: Arc<MemoryAuthInner>,
}

struct MemoryAuthInner {
    accounts: Mutex<HashMap<Email, Account>>,
    current: Mutex<Option<Email>>,
    fail_next: Mutex<Option<String>>,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for MemoryAuth {
    fn default() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(MemoryAuthInner {
                accounts: Mutex::new(HashMap::new()),
                current: Mutex::new(None),
                fail_next: Mutex::new(None),
                events,
            }),
        }
    }
}

impl MemoryAuth {
    /// No accounts, nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account without signing it in or emitting an event.
    pub async fn add_account(&self, email: &Email, password: &str) -> Identity {
        let identity = new_identity(email, UserMetadata::default());
        self.inner.accounts.lock().await.insert(
            email.clone(),
            Account {
                identity: identity.clone(),
                password: SecretString::from(password.to_string()),
            },
        );
        identity
    }

    /// Make the next call fail with an API error.
    pub async fn fail_next(&self, message: impl Into<String>) {
        *self.inner.fail_next.lock().await = Some(message.into());
    }

    /// Emit an event as if it came from the provider.
    pub fn emit(&self, event: AuthEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    async fn take_failure(&self) -> Result<(), AuthError> {
        match self.inner.fail_next.lock().await.take() {
            Some(message) => Err(AuthError::Api {
                status: 503,
                message,
            }),
            None => Ok(()),
        }
    }

    async fn signed_in_email(&self) -> Result<Email, AuthError> {
        self.inner
            .current
            .lock()
            .await
            .clone()
            .ok_or(AuthError::SessionMissing)
    }
}

fn new_identity(email: &Email, metadata: UserMetadata) -> Identity {
    Identity {
        id: UserId::new(),
        email: email.as_str().to_string(),
        created_at: Utc::now(),
        user_metadata: metadata,
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    #[instrument(skip_all, fields(email = %email))]
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        metadata: UserMetadata,
    ) -> Result<Identity, AuthError> {
        self.take_failure().await?;
        let mut accounts = self.inner.accounts.lock().await;
        if accounts.contains_key(email) {
            return Err(AuthError::UserAlreadyExists);
        }

        let identity = new_identity(email, metadata);
        accounts.insert(
            email.clone(),
            Account {
                identity: identity.clone(),
                password: password.clone(),
            },
        );
        drop(accounts);

        *self.inner.current.lock().await = Some(email.clone());
        self.emit(AuthEvent::SignedIn(identity.clone()));
        Ok(identity)
    }

    #[instrument(skip_all, fields(email = %email))]
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Identity, AuthError> {
        self.take_failure().await?;
        let identity = {
            let accounts = self.inner.accounts.lock().await;
            let account = accounts
                .get(email)
                .filter(|a| a.password.expose_secret() == password.expose_secret())
                .ok_or(AuthError::InvalidCredentials)?;
            account.identity.clone()
        };

        *self.inner.current.lock().await = Some(email.clone());
        self.emit(AuthEvent::SignedIn(identity.clone()));
        Ok(identity)
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), AuthError> {
        self.take_failure().await?;
        if self.inner.current.lock().await.take().is_none() {
            return Err(AuthError::SessionMissing);
        }
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    async fn current_identity(&self) -> Result<Option<Identity>, AuthError> {
        self.take_failure().await?;
        let Some(email) = self.inner.current.lock().await.clone() else {
            return Ok(None);
        };
        Ok(self
            .inner
            .accounts
            .lock()
            .await
            .get(&email)
            .map(|a| a.identity.clone()))
    }

    #[instrument(skip(self, password))]
    async fn update_password(&self, password: &SecretString) -> Result<(), AuthError> {
        self.take_failure().await?;
        let email = self.signed_in_email().await?;
        let identity = {
            let mut accounts = self.inner.accounts.lock().await;
            let account = accounts.get_mut(&email).ok_or(AuthError::SessionMissing)?;
            account.password = password.clone();
            account.identity.clone()
        };
        self.emit(AuthEvent::UserUpdated(identity));
        Ok(())
    }

    #[instrument(skip(self, metadata))]
    async fn update_metadata(&self, metadata: UserMetadata) -> Result<Identity, AuthError> {
        self.take_failure().await?;
        let email = self.signed_in_email().await?;
        let identity = {
            let mut accounts = self.inner.accounts.lock().await;
            let account = accounts.get_mut(&email).ok_or(AuthError::SessionMissing)?;
            account.identity.user_metadata = metadata;
            account.identity.clone()
        };
        self.emit(AuthEvent::UserUpdated(identity.clone()));
        Ok(identity)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }
}
