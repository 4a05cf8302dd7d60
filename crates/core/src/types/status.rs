//! Status and category enums for dashboard entities.
//!
//! Serialized forms match the values stored in the backend tables, which is
//! why some variants serialize to Portuguese slugs.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a stored string matches no known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct UnknownVariant {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Implements `Display`, `FromStr` and `ALL` from a single variant/slug table.
macro_rules! slug_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $slug:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in display order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The stored slug for this variant.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $slug),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($slug => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

/// Menu category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MenuCategory {
    #[serde(rename = "entrada")]
    Starter,
    #[default]
    #[serde(rename = "prato-principal")]
    MainCourse,
    #[serde(rename = "sobremesa")]
    Dessert,
    #[serde(rename = "bebida")]
    Drink,
    #[serde(rename = "promocao")]
    Promotion,
}

slug_enum!(MenuCategory, "menu category", {
    Starter => "entrada",
    MainCourse => "prato-principal",
    Dessert => "sobremesa",
    Drink => "bebida",
    Promotion => "promocao",
});

impl MenuCategory {
    /// Human label shown in filters.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Starter => "Starters",
            Self::MainCourse => "Main courses",
            Self::Dessert => "Desserts",
            Self::Drink => "Drinks",
            Self::Promotion => "Promotions",
        }
    }
}

/// What an ad campaign optimizes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignObjective {
    #[default]
    Conversions,
    Traffic,
    Reach,
    BrandAwareness,
    LeadGeneration,
}

slug_enum!(CampaignObjective, "campaign objective", {
    Conversions => "CONVERSIONS",
    Traffic => "TRAFFIC",
    Reach => "REACH",
    BrandAwareness => "BRAND_AWARENESS",
    LeadGeneration => "LEAD_GENERATION",
});

/// Lifecycle status of an ad campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Active,
    #[default]
    Paused,
    Completed,
}

slug_enum!(CampaignStatus, "campaign status", {
    Active => "active",
    Paused => "paused",
    Completed => "completed",
});

impl CampaignStatus {
    /// The status the play/pause control switches to.
    ///
    /// Anything that is not running becomes active; completed campaigns are
    /// reactivated like paused ones.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Paused,
            Self::Paused | Self::Completed => Self::Active,
        }
    }
}

/// Subscription plan tier. Also the primary key of the `plans` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    #[default]
    Basic,
    Pro,
    Enterprise,
}

slug_enum!(PlanTier, "plan tier", {
    Basic => "basic",
    Pro => "pro",
    Enterprise => "enterprise",
});

/// Billing status of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Trialing,
    PastDue,
    Canceled,
}

slug_enum!(SubscriptionStatus, "subscription status", {
    Active => "active",
    Trialing => "trialing",
    PastDue => "past_due",
    Canceled => "canceled",
});

/// Publication state of a landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LandingPageStatus {
    #[default]
    Draft,
    Published,
}

slug_enum!(LandingPageStatus, "landing page status", {
    Draft => "draft",
    Published => "published",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_category_wire_values() {
        let json = serde_json::to_string(&MenuCategory::MainCourse).unwrap();
        assert_eq!(json, "\"prato-principal\"");
        let back: MenuCategory = serde_json::from_str("\"sobremesa\"").unwrap();
        assert_eq!(back, MenuCategory::Dessert);
    }

    #[test]
    fn test_serde_and_slug_agree() {
        for category in MenuCategory::ALL {
            let json = serde_json::to_string(category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
        }
        for objective in CampaignObjective::ALL {
            let json = serde_json::to_string(objective).unwrap();
            assert_eq!(json, format!("\"{objective}\""));
        }
        for status in SubscriptionStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!("promocao".parse::<MenuCategory>(), Ok(MenuCategory::Promotion));
        assert_eq!(
            "BRAND_AWARENESS".parse::<CampaignObjective>(),
            Ok(CampaignObjective::BrandAwareness)
        );
        assert_eq!("enterprise".parse::<PlanTier>(), Ok(PlanTier::Enterprise));

        let err = "gold".parse::<PlanTier>().unwrap_err();
        assert_eq!(err.to_string(), "invalid plan tier: gold");
    }

    #[test]
    fn test_campaign_status_toggle() {
        assert_eq!(CampaignStatus::Active.toggled(), CampaignStatus::Paused);
        assert_eq!(CampaignStatus::Paused.toggled(), CampaignStatus::Active);
        assert_eq!(CampaignStatus::Completed.toggled(), CampaignStatus::Active);
    }

    #[test]
    fn test_plan_tiers_are_ordered() {
        assert!(PlanTier::Basic < PlanTier::Pro);
        assert!(PlanTier::Pro < PlanTier::Enterprise);
    }
}
