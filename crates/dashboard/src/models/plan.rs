//! Subscription plans and their limits.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use restodash_core::{Money, PlanTier};

/// Usage limits attached to a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub max_menus: u32,
    pub max_items: u32,
    /// Monthly ad spend ceiling in BRL.
    pub ads_budget_limit: Decimal,
    /// Landing page views per month; `None` is unlimited.
    pub monthly_views: Option<u32>,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Plan::catalog_entry(PlanTier::Basic).limits
    }
}

/// A row of the `plans` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Primary key.
    pub id: PlanTier,
    pub name: String,
    /// Monthly price in BRL.
    pub price: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub limits: PlanLimits,
}

impl Plan {
    /// Every plan offered, cheapest first.
    #[must_use]
    pub fn catalog() -> Vec<Self> {
        PlanTier::ALL.iter().map(|&tier| Self::catalog_entry(tier)).collect()
    }

    /// The catalog definition of a tier.
    #[must_use]
    pub fn catalog_entry(tier: PlanTier) -> Self {
        let (name, price, description, features, limits): (&str, i64, &str, &[&str], PlanLimits) =
            match tier {
                PlanTier::Basic => (
                    "Basic",
                    97,
                    "Ideal to get started",
                    &[
                        "1 menu",
                        "Up to 50 items",
                        "Ads budget: R$ 500",
                        "Email support",
                    ],
                    PlanLimits {
                        max_menus: 1,
                        max_items: 50,
                        ads_budget_limit: Decimal::new(500, 0),
                        monthly_views: Some(1_000),
                    },
                ),
                PlanTier::Pro => (
                    "Pro",
                    197,
                    "For growing restaurants",
                    &[
                        "3 menus",
                        "Up to 150 items",
                        "Ads budget: R$ 1.500",
                        "Advanced analytics",
                        "Priority support",
                    ],
                    PlanLimits {
                        max_menus: 3,
                        max_items: 150,
                        ads_budget_limit: Decimal::new(1_500, 0),
                        monthly_views: Some(10_000),
                    },
                ),
                PlanTier::Enterprise => (
                    "Enterprise",
                    397,
                    "For chains and franchises",
                    &[
                        "10 menus",
                        "Up to 500 items",
                        "Ads budget: R$ 5.000",
                        "White-label",
                        "Custom API",
                        "Dedicated support",
                    ],
                    PlanLimits {
                        max_menus: 10,
                        max_items: 500,
                        ads_budget_limit: Decimal::new(5_000, 0),
                        monthly_views: None,
                    },
                ),
            };

        Self {
            id: tier,
            name: name.to_string(),
            price: Decimal::new(price, 0),
            description: description.to_string(),
            features: features.iter().map(ToString::to_string).collect(),
            limits,
        }
    }

    /// Monthly price as money.
    #[must_use]
    pub const fn monthly_price(&self) -> Money {
        Money::brl(self.price)
    }

    /// Whether one more menu fits when `current` already exist.
    #[must_use]
    pub fn allows_another_menu(&self, current: usize) -> bool {
        u32::try_from(current).is_ok_and(|n| n < self.limits.max_menus)
    }

    /// Whether `budget` fits inside the plan's ad spend ceiling.
    #[must_use]
    pub fn allows_ads_budget(&self, budget: Decimal) -> bool {
        budget <= self.limits.ads_budget_limit
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog() {
        let plans = Plan::catalog();
        assert_eq!(plans.len(), 3);
        assert_eq!(plans[0].monthly_price().to_string(), "R$ 97,00");
        assert_eq!(plans[1].price, Decimal::new(197, 0));
        assert_eq!(plans[2].limits.max_items, 500);
        assert!(plans[2].limits.monthly_views.is_none());
    }

    #[test]
    fn test_limits() {
        let basic = Plan::catalog_entry(PlanTier::Basic);
        assert!(basic.allows_another_menu(0));
        assert!(!basic.allows_another_menu(1));
        assert!(basic.allows_ads_budget(Decimal::new(500, 0)));
        assert!(!basic.allows_ads_budget(Decimal::new(50_001, 2)));
    }

    #[test]
    fn test_sparse_plan_row() {
        let plan: Plan = serde_json::from_value(serde_json::json!({
            "id": "pro",
            "name": "Pro",
            "price": 197
        }))
        .unwrap();
        assert_eq!(plan.id, PlanTier::Pro);
        assert!(plan.features.is_empty());
        assert_eq!(plan.limits.max_menus, 1);
    }
}
