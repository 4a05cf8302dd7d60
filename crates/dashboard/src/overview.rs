//! Dashboard landing screen: resource counts, current plan and performance.
//!
//! Counts and the plan come from the stores. Performance figures are
//! placeholders until campaign insights are wired in.

use rust_decimal::Decimal;
use tracing::instrument;

use restodash_core::CampaignStatus;

use crate::error::Result;
use crate::models::Plan;
use crate::services::ads::CampaignMetrics;
use crate::stores::{CampaignStore, MenuStore, SubscriptionStore};

/// Headline numbers with their change against the previous period, in
/// percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceMetrics {
    pub total_views: u64,
    pub total_clicks: u64,
    pub total_spent: Decimal,
    pub total_conversions: u64,
    pub views_change: f64,
    pub clicks_change: f64,
    pub spent_change: f64,
    pub conversions_change: f64,
}

impl PerformanceMetrics {
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            total_views: 1_247,
            total_clicks: 89,
            total_spent: Decimal::new(12_750, 2),
            total_conversions: 12,
            views_change: 12.5,
            clicks_change: -3.2,
            spent_change: 8.7,
            conversions_change: 15.3,
        }
    }
}

/// One day of the weekly chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyPoint {
    pub day: &'static str,
    pub views: u64,
    pub clicks: u64,
    pub conversions: u64,
}

/// Last seven days, Monday first.
pub const WEEKLY_PLACEHOLDER: [DailyPoint; 7] = [
    DailyPoint { day: "Mon", views: 120, clicks: 8, conversions: 2 },
    DailyPoint { day: "Tue", views: 180, clicks: 12, conversions: 3 },
    DailyPoint { day: "Wed", views: 150, clicks: 10, conversions: 1 },
    DailyPoint { day: "Thu", views: 220, clicks: 15, conversions: 4 },
    DailyPoint { day: "Fri", views: 280, clicks: 18, conversions: 6 },
    DailyPoint { day: "Sat", views: 320, clicks: 22, conversions: 8 },
    DailyPoint { day: "Sun", views: 290, clicks: 20, conversions: 5 },
];

/// A row of the best-performing campaigns table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopCampaign {
    pub name: &'static str,
    pub views: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub spent: Decimal,
}

impl TopCampaign {
    #[must_use]
    pub fn placeholders() -> Vec<Self> {
        vec![
            Self {
                name: "Delivery promo - January",
                views: 450,
                clicks: 32,
                conversions: 8,
                spent: Decimal::new(4_530, 2),
            },
            Self {
                name: "Weekend special menu",
                views: 320,
                clicks: 28,
                conversions: 6,
                spent: Decimal::new(3_820, 2),
            },
            Self {
                name: "Happy hour - Tuesday",
                views: 280,
                clicks: 18,
                conversions: 4,
                spent: Decimal::new(2_580, 2),
            },
        ]
    }
}

/// How many rows a store holds and how many are live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceCount {
    pub total: usize,
    pub active: usize,
}

/// Everything the overview screen shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    /// `None` while the menu store is loading.
    pub menus: Option<ResourceCount>,
    /// `None` while the campaign store is loading.
    pub campaigns: Option<ResourceCount>,
    /// Subscribed plan, basic when there is no subscription.
    pub plan: Plan,
    pub metrics: PerformanceMetrics,
    pub weekly: [DailyPoint; 7],
    pub top_campaigns: Vec<TopCampaign>,
}

impl Overview {
    /// Build from whatever the stores hold right now.
    #[must_use]
    pub fn collect(
        menus: &MenuStore,
        campaigns: &CampaignStore,
        subscription: &SubscriptionStore,
    ) -> Self {
        let menu_count = (!menus.is_loading()).then(|| ResourceCount {
            total: menus.data().len(),
            active: menus.active_count(),
        });
        let campaign_count = (!campaigns.is_loading()).then(|| ResourceCount {
            total: campaigns.data().len(),
            active: campaigns.active_count(),
        });

        Self {
            menus: menu_count,
            campaigns: campaign_count,
            plan: subscription.current_plan(),
            metrics: PerformanceMetrics::placeholder(),
            weekly: WEEKLY_PLACEHOLDER,
            top_campaigns: TopCampaign::placeholders(),
        }
    }

    /// Reload the three stores together, then build.
    ///
    /// # Errors
    ///
    /// Returns the first store error; the other loads still finish.
    #[instrument(skip_all)]
    pub async fn load(
        menus: &MenuStore,
        campaigns: &CampaignStore,
        subscription: &SubscriptionStore,
    ) -> Result<Self> {
        let (m, c, s) = tokio::join!(menus.load(), campaigns.load(), subscription.load());
        m.and(c).and(s)?;
        Ok(Self::collect(menus, campaigns, subscription))
    }
}

/// Summary cards on the campaigns screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CampaignSummary {
    pub active: usize,
    pub total: usize,
    /// Placeholder spend across campaigns.
    pub total_spent: Decimal,
}

impl CampaignSummary {
    #[must_use]
    pub fn collect(campaigns: &CampaignStore) -> Self {
        let data = campaigns.data();
        Self {
            active: data
                .iter()
                .filter(|c| c.status == CampaignStatus::Active)
                .count(),
            total: data.len(),
            total_spent: CampaignMetrics::total_spent(),
        }
    }
}
