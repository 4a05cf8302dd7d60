//! Backend-as-a-service boundary.
//!
//! Two narrow traits cover everything the dashboard needs from the hosted
//! backend:
//!
//! - [`Backend`]: row access to the tables in [`Table`], filtered by column
//!   equality, with an optional embedded join
//! - [`AuthProvider`]: email/password accounts, user metadata, and a stream
//!   of [`AuthEvent`]s
//!
//! [`MemoryBackend`]/[`MemoryAuth`] keep everything in process.
//! [`SupabaseClient`] talks to a hosted project over HTTP.

mod memory;
mod rest;

pub use memory::{MemoryAuth, MemoryBackend};
pub use rest::SupabaseClient;

use async_trait::async_trait;
use restodash_core::Email;
use secrecy::SecretString;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{Identity, UserMetadata};

/// Tables the dashboard reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Restaurants,
    Menus,
    MenuItems,
    AdCampaigns,
    Subscriptions,
    Plans,
}

impl Table {
    /// Table name on the backend.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Restaurants => "restaurants",
            Self::Menus => "menus",
            Self::MenuItems => "menu_items",
            Self::AdCampaigns => "ad_campaigns",
            Self::Subscriptions => "subscriptions",
            Self::Plans => "plans",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Column equality filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: &'static str,
    pub value: Value,
}

impl Filter {
    /// Rows whose `column` equals `value`.
    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }

    /// Whether `row` passes this filter.
    #[must_use]
    pub fn matches(&self, row: &Value) -> bool {
        row.get(self.column).is_some_and(|v| v == &self.value)
    }
}

/// A select against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: Table,
    pub filters: Vec<Filter>,
    /// Related table to embed under its own name, joined on `<table>_id`.
    pub embed: Option<Table>,
}

impl Query {
    /// Select every row of `table`.
    #[must_use]
    pub const fn from(table: Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
            embed: None,
        }
    }

    /// Add an equality filter.
    #[must_use]
    pub fn eq(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    /// Embed a related table.
    #[must_use]
    pub const fn embed(mut self, table: Table) -> Self {
        self.embed = Some(table);
        self
    }
}

/// Errors from table operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned an error response.
    #[error("API error: {status} {code} - {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// No row with the given ID.
    #[error("Not found: {table} {id}")]
    NotFound { table: Table, id: Uuid },

    /// A constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Backend could not be reached.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Response body was not what we expected.
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Errors from the auth provider.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email/password pair was rejected.
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// Sign-up with an email that already has an account.
    #[error("User already registered")]
    UserAlreadyExists,

    /// The call needs a signed-in user.
    #[error("Auth session missing")]
    SessionMissing,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Change in authentication state.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// A user signed in or signed up.
    SignedIn(Identity),
    /// The current user signed out.
    SignedOut,
    /// The current user's metadata or password changed.
    UserUpdated(Identity),
}

impl AuthEvent {
    /// Identity after this event; `None` means signed out.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::SignedIn(identity) | Self::UserUpdated(identity) => Some(identity),
            Self::SignedOut => None,
        }
    }
}

/// Row access to the hosted backend.
///
/// Rows travel as JSON objects; decoding into models happens in the stores.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Every row matching the query.
    async fn fetch(&self, query: &Query) -> Result<Vec<Value>, BackendError>;

    /// The single row matching the query, `None` if there is none.
    ///
    /// More than one match is an error.
    async fn fetch_single(&self, query: &Query) -> Result<Option<Value>, BackendError>;

    /// Insert a row and return it as stored.
    async fn insert(&self, table: Table, row: Value) -> Result<Value, BackendError>;

    /// Insert a row, or merge it into the row whose `on_conflict` column
    /// has the same value.
    async fn upsert(
        &self,
        table: Table,
        row: Value,
        on_conflict: &'static str,
    ) -> Result<Value, BackendError>;

    /// Merge `patch` into the row with this ID and return the result.
    async fn update(&self, table: Table, id: Uuid, patch: Value) -> Result<Value, BackendError>;

    /// Delete the row with this ID.
    async fn delete(&self, table: Table, id: Uuid) -> Result<(), BackendError>;
}

/// Email/password authentication.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Create an account and sign it in.
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        metadata: UserMetadata,
    ) -> Result<Identity, AuthError>;

    /// Sign in with email and password.
    async fn sign_in(&self, email: &Email, password: &SecretString)
    -> Result<Identity, AuthError>;

    /// End the current session.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// The signed-in user, if any.
    async fn current_identity(&self) -> Result<Option<Identity>, AuthError>;

    /// Replace the signed-in user's password.
    async fn update_password(&self, password: &SecretString) -> Result<(), AuthError>;

    /// Replace the signed-in user's metadata.
    async fn update_metadata(&self, metadata: UserMetadata) -> Result<Identity, AuthError>;

    /// Stream of auth state changes from now on.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}
