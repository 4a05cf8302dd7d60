//! Stores holding at most one row.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, instrument};

use super::{Resource, Scope, StoreCore, StoreState, decode, scoped_payload};
use crate::backend::{Backend, Query};
use crate::error::Result;
use crate::models::{Plan, Restaurant, Subscription};
use crate::session::SessionStore;

/// Cached single `T` row in one scope, `None` until one exists.
pub struct RecordStore<T: Resource> {
    core: StoreCore<Option<T>>,
}

impl<T: Resource> RecordStore<T> {
    /// A store with an empty cache. Nothing is fetched until [`Self::load`].
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, scope: Scope) -> Self {
        Self {
            core: StoreCore::new(backend, scope),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> StoreState<Option<T>> {
        self.core.snapshot()
    }

    /// Cached row.
    #[must_use]
    pub fn data(&self) -> Option<T> {
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

    /// Receive every future state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StoreState<Option<T>>> {
        self.core.subscribe()
    }

    /// Refetch the row in scope. A missing row loads as `None`.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` when nobody is signed in, or the backend
    /// error (also recorded in `error`). More than one matching row is an
    /// error, not a silent pick.
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
                backend
                    .fetch_single(&query)
                    .await?
                    .map(decode::<T>)
                    .transpose()
            })
            .await
    }

    /// Insert the row, then reload.
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

    /// Apply a partial update to a known row, then reload.
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

    /// Insert the row in scope, or merge into it if it already exists,
    /// then reload.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` when nobody is signed in, or the backend
    /// error (also recorded in `error`).
    #[instrument(skip_all, fields(table = %T::TABLE))]
    pub async fn save(&self, patch: &T::Patch) -> Result<T> {
        let _lane = self.core.lane().await;
        let key = self.core.scope_key()?;
        let payload = scoped_payload(patch, T::SCOPE_COLUMN, key)?;

        let result = async {
            let row = self
                .core
                .backend()
                .upsert(T::TABLE, payload, T::SCOPE_COLUMN)
                .await?;
            decode::<T>(row)
        }
        .await;
        let saved = self.core.settle(T::TABLE, result)?;
        info!(id = %saved.id(), "Saved row");

        let _ = self.load().await;
        Ok(saved)
    }

    /// Delete the row, then reload.
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

impl<T: Resource> std::fmt::Debug for RecordStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("table", &T::TABLE)
            .field("state", &self.core.snapshot())
            .finish_non_exhaustive()
    }
}

impl RecordStore<Restaurant> {
    /// Restaurant of whoever is signed in.
    #[must_use]
    pub fn for_owner(backend: Arc<dyn Backend>, session: SessionStore) -> Self {
        Self::new(backend, Scope::Owner(session))
    }
}

impl RecordStore<Subscription> {
    /// Active subscription of whoever is signed in.
    #[must_use]
    pub fn for_owner(backend: Arc<dyn Backend>, session: SessionStore) -> Self {
        Self::new(backend, Scope::Owner(session))
    }

    /// Plan of the cached subscription, or the basic plan when there is none.
    #[must_use]
    pub fn current_plan(&self) -> Plan {
        self.data().map_or_else(
            || Plan::catalog_entry(restodash_core::PlanTier::Basic),
            |sub| sub.resolved_plan(),
        )
    }
}
