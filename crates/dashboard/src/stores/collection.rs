//! Stores holding a list of rows.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, instrument};

use restodash_core::{CampaignId, CampaignStatus, MenuId};

use super::{Resource, Scope, StoreCore, StoreState, decode, scoped_payload};
use crate::backend::{Backend, Query};
use crate::error::{Result, ValidationError};
use crate::models::{Campaign, Menu, MenuFilter, MenuItem};
use crate::session::SessionStore;

/// Cached list of `T` rows in one scope.
pub struct CollectionStore<T: Resource> {
    core: StoreCore<Vec<T>>,
}

impl<T: Resource> CollectionStore<T> {
    /// A store with an empty cache. Nothing is fetched until [`Self::load`].
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, scope: Scope) -> Self {
        Self {
            core: StoreCore::new(backend, scope),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> StoreState<Vec<T>> {
        self.core.snapshot()
    }

    /// Cached rows.
    #[must_use]
    pub fn data(&self) -> Vec<T> {
        self.core.snapshot().data
    }

    /// True while a load is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.core.snapshot().loading
    }

    /// Message of the last failed remote call.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.core.snapshot().error
    }

    /// Cached row with this ID.
    #[must_use]
    pub fn get(&self, id: T::Id) -> Option<T> {
        self.core.snapshot().data.into_iter().find(|row| row.id() == id)
    }

    /// Receive every future state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StoreState<Vec<T>>> {
        self.core.subscribe()
    }

    /// Refetch every row in scope.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` without touching the state when the scope
    /// needs an identity and there is none; otherwise the backend error,
    /// which is also recorded in `error`.
    #[instrument(skip_all, fields(table = %T::TABLE))]
    pub async fn load(&self) -> Result<()> {
        let backend = Arc::clone(self.core.backend());
        self.core
            .load_with(T::TABLE, |key| async move {
                let mut query = Query::from(T::TABLE).eq(T::SCOPE_COLUMN, key.to_string());
                query.filters.extend(T::load_filters());
                if let Some(embed) = T::embed() {
                    query = query.embed(embed);
                }
                let rows = backend.fetch(&query).await?;
                rows.into_iter().map(decode).collect::<Result<Vec<T>>>()
            })
            .await
    }

    /// Insert a row in scope, then reload.
    ///
    /// Returns the row as stored even if the follow-up reload fails; the
    /// reload failure is recorded in `error`.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any remote call, or the backend
    /// error (also recorded in `error`).
    #[instrument(skip_all, fields(table = %T::TABLE))]
    pub async fn create(&self, draft: &T::Draft) -> Result<T> {
        T::validate(draft)?;
        let _lane = self.core.lane().await;
        let key = self.core.scope_key()?;
        let payload = scoped_payload(draft, T::SCOPE_COLUMN, key)?;

        let result = async {
            let row = self.core.backend().insert(T::TABLE, payload).await?;
            decode::<T>(row)
        }
        .await;
        let created = self.core.settle(T::TABLE, result)?;
        info!(id = %created.id(), "Created row");

        let _ = self.load().await;
        Ok(created)
    }

    /// Apply a partial update, then reload.
    ///
    /// # Errors
    ///
    /// Returns the backend error (also recorded in `error`).
    #[instrument(skip_all, fields(table = %T::TABLE, id = %id))]
    pub async fn update(&self, id: T::Id, patch: &T::Patch) -> Result<T> {
        let _lane = self.core.lane().await;

        let result = async {
            let patch = serde_json::to_value(patch)?;
            let row = self.core.backend().update(T::TABLE, id.into(), patch).await?;
            decode::<T>(row)
        }
        .await;
        let updated = self.core.settle(T::TABLE, result)?;
        info!("Updated row");

        let _ = self.load().await;
        Ok(updated)
    }

    /// Delete a row, then reload.
    ///
    /// # Errors
    ///
    /// Returns the backend error (also recorded in `error`).
    #[instrument(skip_all, fields(table = %T::TABLE, id = %id))]
    pub async fn delete(&self, id: T::Id) -> Result<()> {
        let _lane = self.core.lane().await;

        let result = self
            .core
            .backend()
            .delete(T::TABLE, id.into())
            .await
            .map_err(Into::into);
        self.core.settle(T::TABLE, result)?;
        info!("Deleted row");

        let _ = self.load().await;
        Ok(())
    }
}

impl<T: Resource> std::fmt::Debug for CollectionStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionStore")
            .field("table", &T::TABLE)
            .field("state", &self.core.snapshot())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Resource-specific helpers
// =============================================================================

impl CollectionStore<Menu> {
    /// Menus of whoever is signed in.
    #[must_use]
    pub fn for_owner(backend: Arc<dyn Backend>, session: SessionStore) -> Self {
        Self::new(backend, Scope::Owner(session))
    }

    /// Cached menus passing the search/category filter.
    #[must_use]
    pub fn filtered(&self, filter: &MenuFilter) -> Vec<Menu> {
        self.data().into_iter().filter(|m| filter.matches(m)).collect()
    }

    /// Number of cached menus marked active.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.core.snapshot().data.iter().filter(|m| m.is_active).count()
    }
}

impl CollectionStore<MenuItem> {
    /// Items of one menu.
    #[must_use]
    pub fn for_menu(backend: Arc<dyn Backend>, menu_id: MenuId) -> Self {
        Self::new(backend, Scope::Parent(menu_id.into()))
    }
}

impl CollectionStore<Campaign> {
    /// Campaigns of whoever is signed in.
    #[must_use]
    pub fn for_owner(backend: Arc<dyn Backend>, session: SessionStore) -> Self {
        Self::new(backend, Scope::Owner(session))
    }

    /// Flip a cached campaign between active and paused.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the campaign is not in the cache, otherwise
    /// the backend error.
    pub async fn toggle_status(&self, id: CampaignId) -> Result<Campaign> {
        let campaign = self.get(id).ok_or_else(|| {
            ValidationError::InvalidField {
                field: "campaign",
                reason: format!("{id} is not loaded"),
            }
        })?;
        self.update(id, &campaign.toggle_patch()).await
    }

    /// Number of cached campaigns currently running.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.core
            .snapshot()
            .data
            .iter()
            .filter(|c| c.status == CampaignStatus::Active)
            .count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use restodash_core::{MenuCategory, RestaurantId};
    use rust_decimal::Decimal;
    use serde_json::{Value, json};
    use tokio::sync::Notify;
    use uuid::Uuid;

    use crate::backend::{BackendError, MemoryBackend, Table};
    use crate::models::{MenuDraft, MenuPatch};
    use crate::stores::MenuStore;

    async fn menu_store() -> (MenuStore, MemoryBackend, Uuid) {
        let backend = MemoryBackend::new();
        let owner = Uuid::new_v4();
        backend
            .insert(Table::Restaurants, json!({"id": owner.to_string(), "name": "Pizzaria X"}))
            .await
            .unwrap();
        let store = CollectionStore::new(Arc::new(backend.clone()), Scope::Parent(owner));
        (store, backend, owner)
    }

    #[tokio::test]
    async fn test_create_then_load_contains_row() {
        let (store, _, owner) = menu_store().await;
        let menu = store
            .create(&MenuDraft::new("Pizzas", MenuCategory::MainCourse, Decimal::ZERO))
            .await
            .unwrap();
        assert_eq!(menu.restaurant_id, RestaurantId::from_uuid(owner));

        store.load().await.unwrap();
        let data = store.data();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].name, "Pizzas");
        assert!(store.error().is_none());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_every_mutation_reloads() {
        let (store, backend, _) = menu_store().await;
        let menu = store
            .create(&MenuDraft::new("Pizzas", MenuCategory::MainCourse, Decimal::ZERO))
            .await
            .unwrap();
        assert_eq!(backend.fetch_count(), 1);

        let patch = MenuPatch {
            name: Some("Pizzas Doces".into()),
            ..MenuPatch::default()
        };
        let updated = store.update(menu.id, &patch).await.unwrap();
        assert_eq!(updated.name, "Pizzas Doces");
        assert_eq!(store.get(menu.id).unwrap().name, "Pizzas Doces");
        assert_eq!(backend.fetch_count(), 2);

        store.delete(menu.id).await.unwrap();
        assert!(store.get(menu.id).is_none());
        assert_eq!(backend.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_error_set_then_cleared() {
        let (store, backend, _) = menu_store().await;
        backend.fail_next("connection reset").await;
        assert!(store.load().await.is_err());
        assert_eq!(
            store.error().as_deref(),
            Some("Backend error: Unavailable: connection reset")
        );
        assert!(!store.is_loading());

        store.load().await.unwrap();
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_cache() {
        let (store, backend, _) = menu_store().await;
        store
            .create(&MenuDraft::new("Pizzas", MenuCategory::MainCourse, Decimal::ZERO))
            .await
            .unwrap();

        backend.fail_next("timeout").await;
        let result = store
            .create(&MenuDraft::new("Bebidas", MenuCategory::Drink, Decimal::ZERO))
            .await;
        assert!(result.is_err());
        assert_eq!(store.data().len(), 1);
        assert!(store.error().is_some());
    }

    #[tokio::test]
    async fn test_validation_skips_backend() {
        let (store, backend, _) = menu_store().await;
        let result = store
            .create(&MenuDraft::new(" ", MenuCategory::MainCourse, Decimal::ZERO))
            .await;
        assert!(matches!(result, Err(crate::error::DashboardError::Validation(_))));
        assert!(store.error().is_none());
        assert!(backend.rows(Table::Menus).await.is_empty());
    }

    #[tokio::test]
    async fn test_owner_scope_without_identity() {
        let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
        let session = SessionStore::new(Arc::new(crate::backend::MemoryAuth::new()));
        let store = MenuStore::for_owner(backend, session);
        assert!(matches!(
            store.load().await,
            Err(crate::error::DashboardError::Unauthenticated)
        ));
        assert!(store.error().is_none());
    }

    /// Backend whose first fetch blocks until released.
    struct GatedBackend {
        inner: MemoryBackend,
        gate: Notify,
        gated: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl Backend for GatedBackend {
        async fn fetch(&self, query: &Query) -> Result<Vec<Value>, BackendError> {
            // Snapshot before waiting so the gated load returns old data
            let rows = self.inner.fetch(query).await;
            if !self.gated.swap(true, std::sync::atomic::Ordering::SeqCst) {
                self.gate.notified().await;
            }
            rows
        }
        async fn fetch_single(&self, query: &Query) -> Result<Option<Value>, BackendError> {
            self.inner.fetch_single(query).await
        }
        async fn insert(&self, table: Table, row: Value) -> Result<Value, BackendError> {
            self.inner.insert(table, row).await
        }
        async fn upsert(
            &self,
            table: Table,
            row: Value,
            on_conflict: &'static str,
        ) -> Result<Value, BackendError> {
            self.inner.upsert(table, row, on_conflict).await
        }
        async fn update(&self, table: Table, id: Uuid, patch: Value) -> Result<Value, BackendError> {
            self.inner.update(table, id, patch).await
        }
        async fn delete(&self, table: Table, id: Uuid) -> Result<(), BackendError> {
            self.inner.delete(table, id).await
        }
    }

    #[tokio::test]
    async fn test_stale_load_is_discarded() {
        let (_, memory, owner) = menu_store().await;
        let backend = Arc::new(GatedBackend {
            inner: memory.clone(),
            gate: Notify::new(),
            gated: std::sync::atomic::AtomicBool::new(false),
        });
        let store = Arc::new(MenuStore::new(backend.clone(), Scope::Parent(owner)));

        // First load snapshots an empty table and then stalls
        let slow = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.load().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Newer load sees the new row and publishes it
        store
            .create(&MenuDraft::new("Pizzas", MenuCategory::MainCourse, Decimal::ZERO))
            .await
            .unwrap();
        assert_eq!(store.data().len(), 1);

        backend.gate.notify_one();
        slow.await.unwrap().unwrap();
        assert_eq!(store.data().len(), 1, "stale empty result must not win");
    }
}
