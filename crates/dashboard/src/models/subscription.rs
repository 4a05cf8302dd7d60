//! A restaurant's subscription, fetched with its plan embedded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use restodash_core::{PlanTier, RestaurantId, SubscriptionId, SubscriptionStatus};

use crate::models::Plan;

/// A row of the `subscriptions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub restaurant_id: RestaurantId,
    pub plan_id: PlanTier,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
    /// Billing provider's subscription reference.
    #[serde(default)]
    pub external_id: Option<String>,
    /// Embedded `plans` row.
    #[serde(default, rename = "plans", skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
}

impl Subscription {
    /// The subscribed plan, preferring the embedded row over the catalog.
    #[must_use]
    pub fn resolved_plan(&self) -> Plan {
        self.plan
            .clone()
            .unwrap_or_else(|| Plan::catalog_entry(self.plan_id))
    }

    /// Whether the period has ended as of `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.current_period_end.is_some_and(|end| end <= now)
    }
}

/// New subscription row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionDraft {
    pub plan_id: PlanTier,
    pub status: SubscriptionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

/// Partial subscription update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<PlanTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SubscriptionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<DateTime<Utc>>,
}
