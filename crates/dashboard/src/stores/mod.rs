//! Per-resource data stores.
//!
//! A store caches the rows of one table that belong to the signed-in owner
//! (or to one parent menu) and publishes them through a `watch` channel.
//!
//! Every store follows the same contract:
//!
//! - `load()` refetches from the backend and replaces the cache
//! - `create`/`update`/`delete` call the backend, then reload; nothing is
//!   spliced into the cache locally
//! - a failed remote call sets `error`; the next successful one clears it
//! - mutations on one store run one at a time, and a load that finishes
//!   after a newer load started is discarded

mod collection;
mod record;

pub use collection::CollectionStore;
pub use record::RecordStore;

use std::fmt::{Debug, Display};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tracing::warn;
use uuid::Uuid;

use restodash_core::{CampaignId, MenuId, MenuItemId, RestaurantId, SubscriptionId};

use crate::backend::{Backend, Filter, Table};
use crate::error::{DashboardError, Result, ValidationError};
use crate::models::{
    Campaign, CampaignDraft, CampaignPatch, Menu, MenuDraft, MenuItem, MenuItemDraft,
    MenuItemPatch, MenuPatch, Restaurant, RestaurantPatch, Subscription, SubscriptionDraft,
    SubscriptionPatch,
};
use crate::session::SessionStore;

/// Menus of the signed-in owner.
pub type MenuStore = CollectionStore<Menu>;
/// Items of one menu.
pub type MenuItemStore = CollectionStore<MenuItem>;
/// Ad campaigns of the signed-in owner.
pub type CampaignStore = CollectionStore<Campaign>;
/// The signed-in owner's restaurant.
pub type RestaurantStore = RecordStore<Restaurant>;
/// The signed-in owner's active subscription.
pub type SubscriptionStore = RecordStore<Subscription>;

/// A model backed by one table.
pub trait Resource: DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Typed primary key.
    type Id: Copy + Into<Uuid> + Display + Debug + PartialEq + Send + Sync;
    /// Create payload.
    type Draft: Serialize + Send + Sync;
    /// Update payload.
    type Patch: Serialize + Send + Sync;

    /// Backing table.
    const TABLE: Table;
    /// Column tying a row to its scope (owner or parent menu).
    const SCOPE_COLUMN: &'static str;

    /// Primary key of this row.
    fn id(&self) -> Self::Id;

    /// Filters applied on top of the scope filter when loading.
    fn load_filters() -> Vec<Filter> {
        Vec::new()
    }

    /// Table embedded when loading.
    fn embed() -> Option<Table> {
        None
    }

    /// Check a create payload before it is sent.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` describing the first invalid field.
    fn validate(_draft: &Self::Draft) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl Resource for Menu {
    type Id = MenuId;
    type Draft = MenuDraft;
    type Patch = MenuPatch;
    const TABLE: Table = Table::Menus;
    const SCOPE_COLUMN: &'static str = "restaurant_id";

    fn id(&self) -> MenuId {
        self.id
    }

    fn validate(draft: &MenuDraft) -> Result<(), ValidationError> {
        draft.validate()
    }
}

impl Resource for MenuItem {
    type Id = MenuItemId;
    type Draft = MenuItemDraft;
    type Patch = MenuItemPatch;
    const TABLE: Table = Table::MenuItems;
    const SCOPE_COLUMN: &'static str = "menu_id";

    fn id(&self) -> MenuItemId {
        self.id
    }

    fn validate(draft: &MenuItemDraft) -> Result<(), ValidationError> {
        draft.validate()
    }
}

impl Resource for Campaign {
    type Id = CampaignId;
    type Draft = CampaignDraft;
    type Patch = CampaignPatch;
    const TABLE: Table = Table::AdCampaigns;
    const SCOPE_COLUMN: &'static str = "restaurant_id";

    fn id(&self) -> CampaignId {
        self.id
    }

    fn validate(draft: &CampaignDraft) -> Result<(), ValidationError> {
        draft.validate()
    }
}

impl Resource for Restaurant {
    type Id = RestaurantId;
    type Draft = RestaurantPatch;
    type Patch = RestaurantPatch;
    const TABLE: Table = Table::Restaurants;
    // The restaurant row shares its owner's ID
    const SCOPE_COLUMN: &'static str = "id";

    fn id(&self) -> RestaurantId {
        self.id
    }

    fn validate(draft: &RestaurantPatch) -> Result<(), ValidationError> {
        match draft.name.as_deref() {
            Some(name) if !name.trim().is_empty() => Ok(()),
            _ => Err(ValidationError::MissingField("name")),
        }
    }
}

impl Resource for Subscription {
    type Id = SubscriptionId;
    type Draft = SubscriptionDraft;
    type Patch = SubscriptionPatch;
    const TABLE: Table = Table::Subscriptions;
    const SCOPE_COLUMN: &'static str = "restaurant_id";

    fn id(&self) -> SubscriptionId {
        self.id
    }

    fn load_filters() -> Vec<Filter> {
        vec![Filter::eq("status", "active")]
    }

    fn embed() -> Option<Table> {
        Some(Table::Plans)
    }
}

/// What a store's rows are scoped to.
#[derive(Clone, Debug)]
pub enum Scope {
    /// Rows owned by whoever is signed in at call time.
    Owner(SessionStore),
    /// Rows under a fixed parent row.
    Parent(Uuid),
}

impl Scope {
    /// Scope value for the next call.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Unauthenticated` if the scope is the owner
    /// and nobody is signed in.
    pub fn key(&self) -> Result<Uuid> {
        match self {
            Self::Owner(session) => session
                .user_id()
                .map(Into::into)
                .ok_or(DashboardError::Unauthenticated),
            Self::Parent(id) => Ok(*id),
        }
    }
}

/// Observable store state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreState<V> {
    /// Cached rows.
    pub data: V,
    /// True while a load is in flight.
    pub loading: bool,
    /// Message of the last failed remote call, cleared by the next success.
    pub error: Option<String>,
}

impl<V: Default> Default for StoreState<V> {
    fn default() -> Self {
        Self {
            data: V::default(),
            loading: false,
            error: None,
        }
    }
}

/// Machinery shared by collection and record stores.
pub(crate) struct StoreCore<V> {
    backend: Arc<dyn Backend>,
    scope: Scope,
    state: watch::Sender<StoreState<V>>,
    /// Serializes mutations.
    lane: Mutex<()>,
    /// Latest load ticket handed out.
    ticket: AtomicU64,
}

impl<V: Default + Clone + Send + Sync> StoreCore<V> {
    pub(crate) fn new(backend: Arc<dyn Backend>, scope: Scope) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self {
            backend,
            scope,
            state,
            lane: Mutex::new(()),
            ticket: AtomicU64::new(0),
        }
    }

    pub(crate) const fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub(crate) fn scope_key(&self) -> Result<Uuid> {
        self.scope.key()
    }

    pub(crate) async fn lane(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.lane.lock().await
    }

    pub(crate) fn snapshot(&self) -> StoreState<V> {
        self.state.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<StoreState<V>> {
        self.state.subscribe()
    }

    /// Run a ticketed load. Only the newest load may publish its result.
    pub(crate) async fn load_with<F, Fut>(&self, table: Table, fetch: F) -> Result<()>
    where
        F: FnOnce(Uuid) -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let key = self.scope_key()?;
        let ticket = self.ticket.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| s.loading = true);

        let result = fetch(key).await;

        if self.ticket.load(Ordering::SeqCst) != ticket {
            tracing::debug!(%table, ticket, "Discarding stale load");
            return result.map(|_| ());
        }

        match result {
            Ok(data) => {
                self.state.send_modify(|s| {
                    s.data = data;
                    s.loading = false;
                    s.error = None;
                });
                Ok(())
            }
            Err(e) => {
                warn!(%table, error = %e, "Load failed");
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }

    /// Record the outcome of a remote mutation.
    pub(crate) fn settle<T>(&self, table: Table, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.state.send_if_modified(|s| s.error.take().is_some());
                Ok(value)
            }
            Err(e) => {
                warn!(%table, error = %e, "Mutation failed");
                self.state.send_modify(|s| s.error = Some(e.to_string()));
                Err(e)
            }
        }
    }
}

/// Serialize a payload and stamp the scope column on it.
pub(crate) fn scoped_payload(
    payload: &impl Serialize,
    column: &'static str,
    key: Uuid,
) -> Result<Value> {
    let mut value = serde_json::to_value(payload)?;
    if let Value::Object(map) = &mut value {
        map.insert(column.to_string(), Value::String(key.to_string()));
    }
    Ok(value)
}

/// Decode one backend row.
pub(crate) fn decode<T: DeserializeOwned>(row: Value) -> Result<T> {
    Ok(serde_json::from_value(row)?)
}
