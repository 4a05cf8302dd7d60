//! Scenario tests for Restodash.
//!
//! Everything runs in process against `MemoryBackend` and `MemoryAuth`, so
//! no hosted project is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p restodash-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `session` - Sign-up, sign-in and sign-out through auth events
//! - `stores` - Resource stores against the in-memory backend
//! - `navigation` - Route guard and onboarding wizard
//! - `services` - Billing, ads, settings, landing pages and overview

#![allow(clippy::unwrap_used)]

use restodash_core::Email;
use restodash_dashboard::backend::{MemoryAuth, MemoryBackend};
use restodash_dashboard::models::{Identity, RestaurantPatch};
use restodash_dashboard::{DashboardApp, SessionState};
use secrecy::SecretString;

/// Account every context starts with.
pub const OWNER_EMAIL: &str = "owner@example.com";
pub const OWNER_PASSWORD: &str = "secret123";

/// Wrap a plain test password.
#[must_use]
pub fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

/// A running app with handles to its in-memory providers.
pub struct TestContext {
    pub app: DashboardApp,
    pub backend: MemoryBackend,
    pub auth: MemoryAuth,
    pub owner: Identity,
}

impl TestContext {
    /// App with the plan catalog seeded and one registered account. The
    /// session is started and resolved, nobody is signed in.
    pub async fn new() -> Self {
        let backend = MemoryBackend::with_plan_catalog().await.unwrap();
        let auth = MemoryAuth::new();
        let owner = auth
            .add_account(&Email::parse(OWNER_EMAIL).unwrap(), OWNER_PASSWORD)
            .await;

        let app = DashboardApp::in_memory(backend.clone(), auth.clone());
        app.init();
        app.session().wait_until_resolved().await.unwrap();

        Self {
            app,
            backend,
            auth,
            owner,
        }
    }

    /// Context with the owner signed in.
    pub async fn signed_in() -> Self {
        let ctx = Self::new().await;
        ctx.sign_in().await;
        ctx
    }

    /// Context with the owner signed in and a restaurant row in place.
    pub async fn with_restaurant() -> Self {
        let ctx = Self::signed_in().await;
        ctx.app
            .restaurant()
            .save(&RestaurantPatch {
                name: Some("Pizzaria X".to_string()),
                cuisine_type: Some("pizza".to_string()),
                ..RestaurantPatch::default()
            })
            .await
            .unwrap();
        ctx
    }

    /// Sign the owner in and wait for the event to land.
    pub async fn sign_in(&self) -> SessionState {
        self.app
            .session()
            .sign_in(OWNER_EMAIL, &secret(OWNER_PASSWORD))
            .await
            .unwrap();
        self.app
            .session()
            .wait_for(|s| s.identity.is_some())
            .await
            .unwrap()
    }
}
