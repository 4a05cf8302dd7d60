//! Authenticated identity and the profile data stored in its metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use restodash_core::UserId;

/// The signed-in user as reported by the auth provider.
///
/// Cached read-only for the lifetime of the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque user ID. Also the ID of the user's restaurant.
    pub id: UserId,
    /// Login email.
    pub email: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// Free-form profile data kept by the auth provider.
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl Identity {
    /// Editable profile fields.
    #[must_use]
    pub fn profile(&self) -> Profile {
        Profile {
            name: self.user_metadata.name.clone().unwrap_or_default(),
            phone: self.user_metadata.phone.clone().unwrap_or_default(),
            avatar_url: self.user_metadata.avatar_url.clone().unwrap_or_default(),
        }
    }

    /// Saved notification preferences, or the defaults if none were saved.
    #[must_use]
    pub fn notification_preferences(&self) -> NotificationPreferences {
        self.user_metadata.notifications.unwrap_or_default()
    }
}

/// Metadata attached to a user account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Restaurant name captured at sign-up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<NotificationPreferences>,
    /// Keys this crate does not know about, preserved on write.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Profile form. Email is not part of it; it is read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub phone: String,
    pub avatar_url: String,
}

/// Per-channel notification switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct NotificationPreferences {
    pub email_campaigns: bool,
    pub email_billing: bool,
    pub email_updates: bool,
    pub push_campaigns: bool,
    pub push_orders: bool,
    pub push_billing: bool,
    pub sms_campaigns: bool,
    pub sms_billing: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email_campaigns: true,
            email_billing: true,
            email_updates: false,
            push_campaigns: true,
            push_orders: true,
            push_billing: true,
            sms_campaigns: false,
            sms_billing: true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_from_provider_json() {
        let json = serde_json::json!({
            "id": "7f0c1f52-5f4e-4a53-9d53-4b0f3b1f9a11",
            "email": "owner@pizzaria.com",
            "created_at": "2024-01-15T10:00:00Z",
            "user_metadata": {
                "name": "Ana",
                "restaurant_name": "Pizzaria X",
                "locale": "pt-BR"
            },
            "aud": "authenticated"
        });

        let identity: Identity = serde_json::from_value(json).unwrap();
        assert_eq!(identity.profile().name, "Ana");
        assert_eq!(identity.profile().phone, "");
        assert_eq!(
            identity.user_metadata.restaurant_name.as_deref(),
            Some("Pizzaria X")
        );
        assert_eq!(identity.user_metadata.extra["locale"], "pt-BR");
        assert_eq!(
            identity.notification_preferences(),
            NotificationPreferences::default()
        );
    }

    #[test]
    fn test_missing_metadata_defaults() {
        let json = serde_json::json!({
            "id": "7f0c1f52-5f4e-4a53-9d53-4b0f3b1f9a11",
            "email": "owner@pizzaria.com",
            "created_at": "2024-01-15T10:00:00Z"
        });
        let identity: Identity = serde_json::from_value(json).unwrap();
        assert_eq!(identity.user_metadata, UserMetadata::default());
    }

    #[test]
    fn test_notification_defaults() {
        let prefs = NotificationPreferences::default();
        assert!(prefs.email_campaigns);
        assert!(!prefs.email_updates);
        assert!(!prefs.sms_campaigns);
        assert!(prefs.sms_billing);
    }
}
