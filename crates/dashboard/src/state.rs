//! Application state shared by every screen.

use std::sync::Arc;

use tracing::info;

use restodash_core::MenuId;

use crate::backend::{AuthProvider, Backend, MemoryAuth, MemoryBackend, SupabaseClient};
use crate::config::{BillingConfig, DashboardConfig};
use crate::error::Result;
use crate::guard::RouteGuard;
use crate::onboarding::Onboarding;
use crate::services::ads::{AdsProvider, MockAds};
use crate::services::billing::{BillingProvider, BillingService, MockBilling};
use crate::services::settings::SettingsService;
use crate::session::SessionStore;
use crate::stores::{CampaignStore, MenuItemStore, MenuStore, RestaurantStore, SubscriptionStore};

/// Application state shared across all screens.
///
/// Cheaply cloneable via `Arc`. Holds one session; every store it hands out
/// reads the owner from that session.
#[derive(Clone)]
pub struct DashboardApp {
    inner: Arc<DashboardAppInner>,
}

struct DashboardAppInner {
    backend: Arc<dyn Backend>,
    session: SessionStore,
    billing: BillingService,
    ads: Arc<dyn AdsProvider>,
}

impl DashboardApp {
    /// Wire the providers together. The session is created but not started.
    #[must_use]
    pub fn new(
        backend: Arc<dyn Backend>,
        auth: Arc<dyn AuthProvider>,
        billing: Arc<dyn BillingProvider>,
        ads: Arc<dyn AdsProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(DashboardAppInner {
                backend,
                session: SessionStore::new(auth),
                billing: BillingService::new(billing),
                ads,
            }),
        }
    }

    /// Hosted backend with the mock payment and ad providers.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend client cannot be built.
    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        let client = Arc::new(SupabaseClient::new(&config.backend)?);
        let app = Self::new(
            Arc::clone(&client) as Arc<dyn Backend>,
            client,
            Arc::new(MockBilling::new(&config.billing)),
            Arc::new(MockAds::new(config.ads())),
        );
        info!(
            rest_url = %config.backend.rest_url(),
            ads = config.ads.is_some(),
            "Dashboard wired"
        );
        Ok(app)
    }

    /// Everything in process. The caller keeps its own handles to seed rows
    /// or accounts.
    #[must_use]
    pub fn in_memory(backend: MemoryBackend, auth: MemoryAuth) -> Self {
        Self::new(
            Arc::new(backend),
            Arc::new(auth),
            Arc::new(MockBilling::new(&BillingConfig::default())),
            Arc::new(MockAds::new(None)),
        )
    }

    /// Start the session listener. Must be called inside a tokio runtime.
    pub fn init(&self) {
        self.inner.session.init();
    }

    /// Stop the session listener.
    pub fn dispose(&self) {
        self.inner.session.dispose();
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.inner.backend
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn billing(&self) -> &BillingService {
        &self.inner.billing
    }

    #[must_use]
    pub fn ads(&self) -> &Arc<dyn AdsProvider> {
        &self.inner.ads
    }

    // =========================================================================
    // Stores
    // =========================================================================

    #[must_use]
    pub fn menus(&self) -> MenuStore {
        MenuStore::for_owner(Arc::clone(&self.inner.backend), self.inner.session.clone())
    }

    #[must_use]
    pub fn menu_items(&self, menu_id: MenuId) -> MenuItemStore {
        MenuItemStore::for_menu(Arc::clone(&self.inner.backend), menu_id)
    }

    #[must_use]
    pub fn campaigns(&self) -> CampaignStore {
        CampaignStore::for_owner(Arc::clone(&self.inner.backend), self.inner.session.clone())
    }

    #[must_use]
    pub fn restaurant(&self) -> RestaurantStore {
        RestaurantStore::for_owner(Arc::clone(&self.inner.backend), self.inner.session.clone())
    }

    #[must_use]
    pub fn subscription(&self) -> SubscriptionStore {
        SubscriptionStore::for_owner(Arc::clone(&self.inner.backend), self.inner.session.clone())
    }

    // =========================================================================
    // Screens
    // =========================================================================

    #[must_use]
    pub fn guard(&self) -> RouteGuard {
        RouteGuard::new(self.inner.session.clone())
    }

    #[must_use]
    pub fn settings(&self) -> SettingsService {
        SettingsService::new(self.inner.session.clone())
    }

    /// A fresh onboarding flow prefilled from the current identity.
    #[must_use]
    pub fn onboarding(&self) -> Onboarding {
        Onboarding::new(self.inner.session.current_identity().as_ref())
    }
}

impl std::fmt::Debug for DashboardApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardApp")
            .field("session", &self.inner.session)
            .field("billing", &self.inner.billing)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use restodash_core::{Email, MenuCategory, PlanTier};
    use rust_decimal::Decimal;
    use secrecy::SecretString;

    use crate::error::DashboardError;
    use crate::guard::{GuardDecision, Route};
    use crate::models::{MenuDraft, RestaurantPatch};

    async fn app() -> DashboardApp {
        let backend = MemoryBackend::with_plan_catalog().await.unwrap();
        let auth = MemoryAuth::new();
        auth.add_account(&Email::parse("owner@example.com").unwrap(), "secret123")
            .await;
        let app = DashboardApp::in_memory(backend, auth);
        app.init();
        app
    }

    #[tokio::test]
    async fn test_stores_follow_session() {
        let app = app().await;
        app.session().wait_until_resolved().await.unwrap();

        let menus = app.menus();
        let draft = MenuDraft::new("Pizzas", MenuCategory::MainCourse, Decimal::ZERO);
        assert!(matches!(
            menus.create(&draft).await,
            Err(DashboardError::Unauthenticated)
        ));

        app.session()
            .sign_in("owner@example.com", &SecretString::from("secret123".to_string()))
            .await
            .unwrap();
        app.session().wait_for(|s| s.identity.is_some()).await.unwrap();

        app.restaurant()
            .save(&RestaurantPatch {
                name: Some("Pizzaria X".into()),
                ..RestaurantPatch::default()
            })
            .await
            .unwrap();
        let menu = menus.create(&draft).await.unwrap();
        assert_eq!(menus.data(), vec![menu.clone()]);
        assert!(app.menu_items(menu.id).data().is_empty());
        assert_eq!(app.subscription().current_plan().id, PlanTier::Basic);
    }

    #[tokio::test]
    async fn test_guard_and_onboarding_share_session() {
        let app = app().await;
        app.session().wait_until_resolved().await.unwrap();
        assert_eq!(
            app.guard().check("/menus"),
            GuardDecision::Redirect(Route::Login)
        );

        app.session()
            .sign_in("owner@example.com", &SecretString::from("secret123".to_string()))
            .await
            .unwrap();
        app.session().wait_for(|s| s.identity.is_some()).await.unwrap();
        assert_eq!(app.guard().check("/menus"), GuardDecision::Render(Route::Menus));
        assert_eq!(app.onboarding().form().email, "owner@example.com");
        assert!(app.settings().profile_form().is_some());

        app.dispose();
    }
}
