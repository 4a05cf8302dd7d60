//! Account settings: profile, restaurant, notifications and security tabs.
//!
//! Profile fields and notification switches live in the identity's
//! metadata, so saving them goes through the auth provider and comes back
//! as a `UserUpdated` event. The restaurant tab writes through the
//! restaurant store.

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument, warn};

use restodash_core::validate_new_password;

use crate::error::{DashboardError, Result};
use crate::models::{Identity, NotificationPreferences, Profile, Restaurant, RestaurantPatch};
use crate::session::SessionStore;
use crate::stores::RestaurantStore;

/// Tabs of the settings screen, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsTab {
    Profile,
    Restaurant,
    Notifications,
    Security,
}

impl SettingsTab {
    pub const ALL: [Self; 4] = [
        Self::Profile,
        Self::Restaurant,
        Self::Notifications,
        Self::Security,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Profile => "Profile",
            Self::Restaurant => "Restaurant",
            Self::Notifications => "Notifications",
            Self::Security => "Security",
        }
    }
}

/// Profile tab contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileForm {
    pub profile: Profile,
    /// Shown but never sent.
    pub email: String,
}

/// Restaurant tab contents prefilled from the stored row.
///
/// Unlike onboarding, a restaurant without a fee shows zero.
#[must_use]
pub fn restaurant_form(restaurant: Option<&Restaurant>) -> RestaurantPatch {
    let Some(r) = restaurant else {
        return RestaurantPatch {
            delivery_fee: Some(Decimal::ZERO),
            minimum_order: Some(Decimal::ZERO),
            accepts_cards: Some(true),
            accepts_pix: Some(true),
            accepts_cash: Some(true),
            ..RestaurantPatch::default()
        };
    };
    RestaurantPatch {
        name: Some(r.name.clone()),
        description: r.description.clone(),
        cuisine_type: r.cuisine_type.clone(),
        phone: r.phone.clone(),
        email: r.email.clone(),
        website: r.website.clone(),
        address: r.address.clone(),
        city: r.city.clone(),
        state: r.state.clone(),
        zip_code: r.zip_code.clone(),
        opening_hours: Some(r.opening_hours),
        delivery_fee: Some(r.delivery_fee),
        minimum_order: Some(r.minimum_order),
        accepts_cards: Some(r.accepts_cards),
        accepts_pix: Some(r.accepts_pix),
        accepts_cash: Some(r.accepts_cash),
    }
}

/// Settings operations for the signed-in user.
#[derive(Debug, Clone)]
pub struct SettingsService {
    session: SessionStore,
}

impl SettingsService {
    #[must_use]
    pub const fn new(session: SessionStore) -> Self {
        Self { session }
    }

    fn identity(&self) -> Result<Identity> {
        self.session
            .current_identity()
            .ok_or(DashboardError::Unauthenticated)
    }

    /// Profile tab prefilled from the identity, `None` when signed out.
    #[must_use]
    pub fn profile_form(&self) -> Option<ProfileForm> {
        self.session.current_identity().map(|identity| ProfileForm {
            profile: identity.profile(),
            email: identity.email,
        })
    }

    /// Saved notification switches, or the defaults.
    #[must_use]
    pub fn notification_preferences(&self) -> NotificationPreferences {
        self.session
            .current_identity()
            .map(|i| i.notification_preferences())
            .unwrap_or_default()
    }

    /// Save the profile fields. Blank fields are cleared; other metadata is
    /// kept.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` when signed out, otherwise the auth
    /// provider's error.
    #[instrument(skip_all)]
    pub async fn update_profile(&self, profile: &Profile) -> Result<Identity> {
        let mut metadata = self.identity()?.user_metadata;
        metadata.name = non_blank(&profile.name);
        metadata.phone = non_blank(&profile.phone);
        metadata.avatar_url = non_blank(&profile.avatar_url);

        let identity = self
            .session
            .auth()
            .update_metadata(metadata)
            .await
            .inspect_err(|e| warn!(error = %e, "Profile update failed"))?;
        info!(user_id = %identity.id, "Profile updated");
        Ok(identity)
    }

    /// Save the notification switches.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` when signed out, otherwise the auth
    /// provider's error.
    #[instrument(skip_all)]
    pub async fn update_notifications(
        &self,
        preferences: NotificationPreferences,
    ) -> Result<Identity> {
        let mut metadata = self.identity()?.user_metadata;
        metadata.notifications = Some(preferences);

        let identity = self.session.auth().update_metadata(metadata).await?;
        info!(user_id = %identity.id, "Notification preferences updated");
        Ok(identity)
    }

    /// Save the restaurant tab.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub async fn update_restaurant(
        &self,
        store: &RestaurantStore,
        form: &RestaurantPatch,
    ) -> Result<Restaurant> {
        store.save(form).await
    }

    /// Replace the password after checking the confirmation and length.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any remote call, `Unauthenticated`
    /// when signed out, otherwise the auth provider's error.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        new_password: &SecretString,
        confirmation: &SecretString,
    ) -> Result<()> {
        validate_new_password(new_password.expose_secret(), confirmation.expose_secret())?;
        let identity = self.identity()?;

        self.session
            .auth()
            .update_password(new_password)
            .await
            .inspect_err(|e| warn!(error = %e, "Password change failed"))?;
        info!(user_id = %identity.id, "Password changed");
        Ok(())
    }

    /// Sign out through the session.
    ///
    /// # Errors
    ///
    /// Returns the auth provider's error; the session keeps its identity.
    pub async fn sign_out(&self) -> Result<()> {
        self.session.sign_out().await
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use restodash_core::{Email, PasswordError};

    use crate::backend::{AuthProvider, MemoryAuth};
    use crate::error::ValidationError;

    async fn signed_in() -> (SettingsService, MemoryAuth, SessionStore) {
        let auth = MemoryAuth::new();
        let email = Email::parse("owner@example.com").unwrap();
        auth.add_account(&email, "secret123").await;
        let session = SessionStore::new(Arc::new(auth.clone()));
        session.init();
        session
            .sign_in("owner@example.com", &secret("secret123"))
            .await
            .unwrap();
        session.wait_for(|s| s.identity.is_some()).await.unwrap();
        (SettingsService::new(session.clone()), auth, session)
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[tokio::test]
    async fn test_profile_roundtrip_through_metadata() {
        let (settings, _, session) = signed_in().await;
        let form = settings.profile_form().unwrap();
        assert_eq!(form.email, "owner@example.com");
        assert_eq!(form.profile, Profile::default());

        let profile = Profile {
            name: "Ana".into(),
            phone: "(11) 99999-0000".into(),
            avatar_url: String::new(),
        };
        settings.update_profile(&profile).await.unwrap();

        let state = session
            .wait_for(|s| s.identity.as_ref().is_some_and(|i| i.profile().name == "Ana"))
            .await
            .unwrap();
        let identity = state.identity.unwrap();
        assert_eq!(identity.email, "owner@example.com");
        assert!(identity.user_metadata.avatar_url.is_none());
    }

    #[tokio::test]
    async fn test_notifications_persist() {
        let (settings, _, session) = signed_in().await;
        assert_eq!(settings.notification_preferences(), NotificationPreferences::default());

        let prefs = NotificationPreferences {
            sms_campaigns: true,
            ..NotificationPreferences::default()
        };
        settings.update_notifications(prefs).await.unwrap();
        session
            .wait_for(|s| {
                s.identity
                    .as_ref()
                    .is_some_and(|i| i.notification_preferences().sms_campaigns)
            })
            .await
            .unwrap();
        assert!(settings.notification_preferences().sms_campaigns);
    }

    #[tokio::test]
    async fn test_password_rules_before_provider() {
        let (settings, auth, _) = signed_in().await;
        assert!(matches!(
            settings.change_password(&secret("abcdef"), &secret("abcdeg")).await,
            Err(DashboardError::Validation(ValidationError::Password(PasswordError::Mismatch)))
        ));
        assert!(matches!(
            settings.change_password(&secret("abc"), &secret("abc")).await,
            Err(DashboardError::Validation(ValidationError::Password(
                PasswordError::TooShort { min: 6 }
            )))
        ));

        settings
            .change_password(&secret("newsecret"), &secret("newsecret"))
            .await
            .unwrap();
        auth.sign_out().await.unwrap();
        let email = Email::parse("owner@example.com").unwrap();
        assert!(auth.sign_in(&email, &secret("newsecret")).await.is_ok());
    }

    #[tokio::test]
    async fn test_signed_out_is_rejected() {
        let session = SessionStore::new(Arc::new(MemoryAuth::new()));
        let settings = SettingsService::new(session);
        assert!(settings.profile_form().is_none());
        assert!(matches!(
            settings.update_profile(&Profile::default()).await,
            Err(DashboardError::Unauthenticated)
        ));
    }

    #[test]
    fn test_restaurant_form_defaults() {
        let form = restaurant_form(None);
        assert_eq!(form.delivery_fee, Some(Decimal::ZERO));
        assert_eq!(form.accepts_pix, Some(true));
        assert!(form.name.is_none());
    }
}
