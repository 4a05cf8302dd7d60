//! Advertising network integration.
//!
//! Campaign rows the owner edits live in the backend and go through the
//! campaign store. This module covers the ad network side: publishing
//! campaigns, ad sets and ads, and reading insights. [`MockAds`] answers
//! with placeholder data; no request leaves the process.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use restodash_core::CampaignObjective;

use crate::config::AdsConfig;

const MOCK_ACCOUNT_ID: &str = "act_mock_account_id";
const DEFAULT_API_VERSION: &str = "v18.0";

/// Errors from the ad network.
#[derive(Debug, Error)]
pub enum AdsError {
    /// Network rejected the request.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Network could not be reached.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Unknown campaign, ad set or ad.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Delivery state on the ad network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdStatus {
    Active,
    Paused,
}

/// A campaign as the ad network reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdCampaign {
    pub id: String,
    pub name: String,
    pub status: AdStatus,
    pub objective: CampaignObjective,
    pub budget: Decimal,
    #[serde(default)]
    pub spend: Decimal,
    #[serde(default)]
    pub impressions: u64,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub conversions: u64,
    pub created_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

/// New campaign on the ad network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdCampaignSpec {
    pub name: String,
    pub objective: CampaignObjective,
    pub budget: Decimal,
}

/// Partial campaign update on the ad network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdCampaignUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective: Option<CampaignObjective>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AdStatus>,
}

/// Acknowledgement of an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdUpdateAck {
    pub id: String,
    #[serde(flatten)]
    pub applied: AdCampaignUpdate,
    pub updated_time: DateTime<Utc>,
}

/// Reporting window for insights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateRange {
    #[default]
    Last7Days,
    Last30Days,
    Custom { start: NaiveDate, stop: NaiveDate },
}

impl DateRange {
    /// First and last day of the window ending on `today`.
    #[must_use]
    pub fn bounds(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Self::Last7Days => (today - Duration::days(7), today),
            Self::Last30Days => (today - Duration::days(30), today),
            Self::Custom { start, stop } => (start, stop),
        }
    }
}

/// Delivery metrics for one campaign over a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignInsights {
    pub campaign_id: String,
    pub date_start: NaiveDate,
    pub date_stop: NaiveDate,
    pub impressions: u64,
    pub clicks: u64,
    pub spend: Decimal,
    pub conversions: u64,
    pub cpm: Decimal,
    pub cpc: Decimal,
    pub ctr: Decimal,
    pub conversion_rate: Decimal,
    pub cost_per_conversion: Decimal,
}

/// Who an ad set reaches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Targeting {
    pub age_min: u8,
    /// `None` means no upper bound.
    pub age_max: Option<u8>,
    /// IDs from [`TargetingOptions::INTERESTS`].
    pub interests: Vec<String>,
    /// IDs from [`TargetingOptions::PLACEMENTS`].
    pub placements: Vec<String>,
}

/// New ad set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdSetSpec {
    pub name: String,
    pub targeting: Targeting,
    pub daily_budget: Decimal,
}

/// Ad set on the ad network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdSet {
    pub id: String,
    pub campaign_id: String,
    pub name: String,
    pub status: AdStatus,
    pub targeting: Targeting,
    pub daily_budget: Decimal,
    pub created_time: DateTime<Utc>,
}

/// New ad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdSpec {
    pub name: String,
    pub creative: String,
}

/// Ad on the ad network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ad {
    pub id: String,
    pub adset_id: String,
    pub name: String,
    pub status: AdStatus,
    pub creative: String,
    pub created_time: DateTime<Utc>,
}

/// Ad network operations.
#[async_trait]
pub trait AdsProvider: Send + Sync {
    async fn create_campaign(&self, spec: &AdCampaignSpec) -> Result<AdCampaign, AdsError>;

    async fn get_campaigns(&self, account_id: &str) -> Result<Vec<AdCampaign>, AdsError>;

    async fn update_campaign(
        &self,
        campaign_id: &str,
        update: &AdCampaignUpdate,
    ) -> Result<AdUpdateAck, AdsError>;

    async fn update_campaign_status(
        &self,
        campaign_id: &str,
        status: AdStatus,
    ) -> Result<AdUpdateAck, AdsError>;

    async fn get_campaign_insights(
        &self,
        campaign_id: &str,
        range: DateRange,
    ) -> Result<Vec<CampaignInsights>, AdsError>;

    async fn create_ad_set(&self, campaign_id: &str, spec: &AdSetSpec) -> Result<AdSet, AdsError>;

    async fn create_ad(&self, adset_id: &str, spec: &AdSpec) -> Result<Ad, AdsError>;
}

// =============================================================================
// MockAds
// =============================================================================

/// Ad network stand-in returning placeholder data.
#[derive(Clone)]
pub struct MockAds {
    inner: Arc<MockAdsInner>,
}

struct MockAdsInner {
    api_version: String,
    fail_next: Mutex<Option<String>>,
}

impl MockAds {
    #[must_use]
    pub fn new(config: Option<&AdsConfig>) -> Self {
        let api_version = config.map_or_else(
            || DEFAULT_API_VERSION.to_string(),
            |c| c.api_version.clone(),
        );
        Self {
            inner: Arc::new(MockAdsInner {
                api_version,
                fail_next: Mutex::new(None),
            }),
        }
    }

    /// Make the next call fail with [`AdsError::Unavailable`].
    pub async fn fail_next(&self, message: impl Into<String>) {
        *self.inner.fail_next.lock().await = Some(message.into());
    }

    async fn take_failure(&self) -> Result<(), AdsError> {
        match self.inner.fail_next.lock().await.take() {
            Some(message) => Err(AdsError::Unavailable(message)),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for MockAds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockAds")
            .field("api_version", &self.inner.api_version)
            .finish_non_exhaustive()
    }
}

fn mock_id(prefix: &str) -> String {
    format!("{prefix}_{}", Utc::now().timestamp_millis())
}

fn parse_time(raw: &str) -> DateTime<Utc> {
    raw.parse().unwrap_or_default()
}

#[async_trait]
impl AdsProvider for MockAds {
    #[instrument(skip_all, fields(name = %spec.name))]
    async fn create_campaign(&self, spec: &AdCampaignSpec) -> Result<AdCampaign, AdsError> {
        self.take_failure().await?;
        let campaign = AdCampaign {
            id: mock_id("campaign"),
            name: spec.name.clone(),
            status: AdStatus::Paused,
            objective: spec.objective,
            budget: spec.budget,
            spend: Decimal::ZERO,
            impressions: 0,
            clicks: 0,
            conversions: 0,
            created_time: Utc::now(),
            account_id: Some(MOCK_ACCOUNT_ID.to_string()),
        };
        info!(id = %campaign.id, "Created ad campaign");
        Ok(campaign)
    }

    #[instrument(skip(self))]
    async fn get_campaigns(&self, account_id: &str) -> Result<Vec<AdCampaign>, AdsError> {
        self.take_failure().await?;
        Ok(vec![
            AdCampaign {
                id: "campaign_1".to_string(),
                name: "Delivery promo - January".to_string(),
                status: AdStatus::Active,
                objective: CampaignObjective::Conversions,
                budget: Decimal::new(500, 0),
                spend: Decimal::new(12_750, 2),
                impressions: 15_420,
                clicks: 234,
                conversions: 12,
                created_time: parse_time("2024-01-15T10:00:00Z"),
                account_id: Some(account_id.to_string()),
            },
            AdCampaign {
                id: "campaign_2".to_string(),
                name: "Weekend special menu".to_string(),
                status: AdStatus::Paused,
                objective: CampaignObjective::Reach,
                budget: Decimal::new(300, 0),
                spend: Decimal::new(8_930, 2),
                impressions: 8_750,
                clicks: 156,
                conversions: 8,
                created_time: parse_time("2024-01-10T14:30:00Z"),
                account_id: Some(account_id.to_string()),
            },
        ])
    }

    #[instrument(skip(self, update))]
    async fn update_campaign(
        &self,
        campaign_id: &str,
        update: &AdCampaignUpdate,
    ) -> Result<AdUpdateAck, AdsError> {
        self.take_failure().await?;
        Ok(AdUpdateAck {
            id: campaign_id.to_string(),
            applied: update.clone(),
            updated_time: Utc::now(),
        })
    }

    #[instrument(skip(self))]
    async fn update_campaign_status(
        &self,
        campaign_id: &str,
        status: AdStatus,
    ) -> Result<AdUpdateAck, AdsError> {
        let update = AdCampaignUpdate {
            status: Some(status),
            ..AdCampaignUpdate::default()
        };
        self.update_campaign(campaign_id, &update).await
    }

    #[instrument(skip(self))]
    async fn get_campaign_insights(
        &self,
        campaign_id: &str,
        range: DateRange,
    ) -> Result<Vec<CampaignInsights>, AdsError> {
        self.take_failure().await?;
        let (date_start, date_stop) = range.bounds(Utc::now().date_naive());
        Ok(vec![CampaignInsights {
            campaign_id: campaign_id.to_string(),
            date_start,
            date_stop,
            impressions: 15_420,
            clicks: 234,
            spend: Decimal::new(12_750, 2),
            conversions: 12,
            cpm: Decimal::new(827, 2),
            cpc: Decimal::new(54, 2),
            ctr: Decimal::new(152, 2),
            conversion_rate: Decimal::new(513, 2),
            cost_per_conversion: Decimal::new(1_063, 2),
        }])
    }

    #[instrument(skip(self, spec), fields(name = %spec.name))]
    async fn create_ad_set(&self, campaign_id: &str, spec: &AdSetSpec) -> Result<AdSet, AdsError> {
        self.take_failure().await?;
        if campaign_id.is_empty() {
            return Err(AdsError::NotFound("campaign".to_string()));
        }
        Ok(AdSet {
            id: mock_id("adset"),
            campaign_id: campaign_id.to_string(),
            name: spec.name.clone(),
            status: AdStatus::Paused,
            targeting: spec.targeting.clone(),
            daily_budget: spec.daily_budget,
            created_time: Utc::now(),
        })
    }

    #[instrument(skip(self, spec), fields(name = %spec.name))]
    async fn create_ad(&self, adset_id: &str, spec: &AdSpec) -> Result<Ad, AdsError> {
        self.take_failure().await?;
        if adset_id.is_empty() {
            return Err(AdsError::NotFound("ad set".to_string()));
        }
        Ok(Ad {
            id: mock_id("ad"),
            adset_id: adset_id.to_string(),
            name: spec.name.clone(),
            status: AdStatus::Paused,
            creative: spec.creative.clone(),
            created_time: Utc::now(),
        })
    }
}

// =============================================================================
// Targeting catalog
// =============================================================================

/// Selectable age bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeRange {
    pub min: u8,
    pub max: Option<u8>,
    pub label: &'static str,
}

/// Selectable interest or placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetingOption {
    pub id: &'static str,
    pub name: &'static str,
}

/// Choices offered when building an ad set.
#[derive(Debug, Clone, Copy)]
pub struct TargetingOptions;

impl TargetingOptions {
    pub const AGE_RANGES: [AgeRange; 6] = [
        AgeRange { min: 18, max: Some(24), label: "18-24" },
        AgeRange { min: 25, max: Some(34), label: "25-34" },
        AgeRange { min: 35, max: Some(44), label: "35-44" },
        AgeRange { min: 45, max: Some(54), label: "45-54" },
        AgeRange { min: 55, max: Some(64), label: "55-64" },
        AgeRange { min: 65, max: None, label: "65+" },
    ];

    pub const INTERESTS: [TargetingOption; 5] = [
        TargetingOption { id: "food_delivery", name: "Food delivery" },
        TargetingOption { id: "restaurants", name: "Restaurants" },
        TargetingOption { id: "cooking", name: "Cooking" },
        TargetingOption { id: "local_business", name: "Local business" },
        TargetingOption { id: "dining_out", name: "Dining out" },
    ];

    pub const PLACEMENTS: [TargetingOption; 5] = [
        TargetingOption { id: "facebook_feeds", name: "Facebook feed" },
        TargetingOption { id: "instagram_feeds", name: "Instagram feed" },
        TargetingOption { id: "facebook_stories", name: "Facebook stories" },
        TargetingOption { id: "instagram_stories", name: "Instagram stories" },
        TargetingOption { id: "messenger", name: "Messenger" },
    ];

    /// Whether every interest and placement in `targeting` is offered and
    /// the age bounds are ordered.
    #[must_use]
    pub fn accepts(targeting: &Targeting) -> bool {
        let known = |options: &[TargetingOption], id: &String| options.iter().any(|o| o.id == id);
        targeting.age_max.is_none_or(|max| max >= targeting.age_min)
            && targeting.interests.iter().all(|i| known(&Self::INTERESTS, i))
            && targeting.placements.iter().all(|p| known(&Self::PLACEMENTS, p))
    }
}

// =============================================================================
// Placeholder campaign metrics
// =============================================================================

/// Per-campaign numbers shown on the campaigns screen. Placeholder values
/// until insights are wired to real campaigns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CampaignMetrics {
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub spent: Decimal,
    pub ctr: Decimal,
    pub cpc: Decimal,
    pub cpm: Decimal,
}

impl CampaignMetrics {
    /// Placeholder metrics keyed by sample campaign.
    #[must_use]
    pub fn placeholders() -> [(&'static str, Self); 2] {
        [
            (
                "campaign-1",
                Self {
                    impressions: 12_450,
                    clicks: 234,
                    conversions: 18,
                    spent: Decimal::new(12_750, 2),
                    ctr: Decimal::new(188, 2),
                    cpc: Decimal::new(54, 2),
                    cpm: Decimal::new(1_025, 2),
                },
            ),
            (
                "campaign-2",
                Self {
                    impressions: 8_920,
                    clicks: 156,
                    conversions: 12,
                    spent: Decimal::new(8_930, 2),
                    ctr: Decimal::new(175, 2),
                    cpc: Decimal::new(57, 2),
                    cpm: Decimal::new(1_001, 2),
                },
            ),
        ]
    }

    /// Metrics for `key`, zeroed when there are none.
    #[must_use]
    pub fn for_campaign(key: &str) -> Self {
        Self::placeholders()
            .into_iter()
            .find_map(|(k, m)| (k == key).then_some(m))
            .unwrap_or_default()
    }

    /// Spend summed over every placeholder campaign.
    #[must_use]
    pub fn total_spent() -> Decimal {
        Self::placeholders().iter().map(|(_, m)| m.spent).sum()
    }
}
