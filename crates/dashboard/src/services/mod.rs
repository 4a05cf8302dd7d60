//! Services behind the dashboard screens.
//!
//! # Services
//!
//! - `ads` - Ad network provider, targeting catalog and placeholder metrics
//! - `billing` - Payment provider, plan upgrades and billing history
//! - `landing_pages` - In-memory landing page list
//! - `settings` - Profile, notification, restaurant and password settings

pub mod ads;
pub mod billing;
pub mod landing_pages;
pub mod settings;

pub use ads::{AdsError, AdsProvider, CampaignMetrics, MockAds, TargetingOptions};
pub use billing::{BillingError, BillingProvider, BillingService, MockBilling};
pub use landing_pages::LandingPageList;
pub use settings::{SettingsService, SettingsTab};
