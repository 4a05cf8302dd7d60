//! Domain models mirrored from the backend tables.

pub mod campaign;
pub mod identity;
pub mod landing_page;
pub mod menu;
pub mod plan;
pub mod restaurant;
pub mod subscription;

pub use campaign::{Campaign, CampaignDraft, CampaignPatch};
pub use identity::{Identity, NotificationPreferences, Profile, UserMetadata};
pub use landing_page::{LandingPage, LandingPageDraft, LandingPageTemplate, PageContent, slugify};
pub use menu::{Menu, MenuDraft, MenuFilter, MenuItem, MenuItemDraft, MenuItemPatch, MenuPatch};
pub use plan::{Plan, PlanLimits};
pub use restaurant::{DayHours, OpeningHours, Restaurant, RestaurantPatch};
pub use subscription::{Subscription, SubscriptionDraft, SubscriptionPatch};

use serde::{Deserialize, Deserializer};

/// Read an explicit `null` column as the type's default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Read an explicit `null` flag as `true`.
pub(crate) fn null_as_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<bool>::deserialize(deserializer).map(|flag| flag.unwrap_or(true))
}
