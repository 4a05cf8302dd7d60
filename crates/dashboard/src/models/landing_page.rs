//! Promotional landing pages.
//!
//! Pages live only in client memory; nothing here touches the backend.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use restodash_core::{LandingPageId, LandingPageStatus};

use crate::error::ValidationError;

/// Page layout a landing page is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LandingPageTemplate {
    #[default]
    RestaurantPromo,
    FullMenu,
    DeliverySpecial,
}

impl LandingPageTemplate {
    /// Every template, in picker order.
    pub const ALL: &'static [Self] = &[Self::RestaurantPromo, Self::FullMenu, Self::DeliverySpecial];

    /// Stable template ID.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::RestaurantPromo => "restaurant-promo",
            Self::FullMenu => "full-menu",
            Self::DeliverySpecial => "delivery-special",
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RestaurantPromo => "Restaurant promotion",
            Self::FullMenu => "Full menu",
            Self::DeliverySpecial => "Delivery special",
        }
    }

    /// One-line description shown in the picker.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::RestaurantPromo => "Promotions and special offers",
            Self::FullMenu => "Shows the whole restaurant menu",
            Self::DeliverySpecial => "Focused on delivery orders",
        }
    }
}

/// A landing page and its traffic counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandingPage {
    pub id: LandingPageId,
    pub name: String,
    /// URL slug.
    pub url: String,
    pub template: LandingPageTemplate,
    pub status: LandingPageStatus,
    pub views: u64,
    pub conversions: u64,
    pub created_at: NaiveDate,
    /// Builder content, absent until the page is first edited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<PageContent>,
}

impl LandingPage {
    /// Conversions per view, as a percentage. Zero when there are no views.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn conversion_rate(&self) -> f64 {
        if self.views == 0 {
            return 0.0;
        }
        self.conversions as f64 / self.views as f64 * 100.0
    }
}

/// Text and colours placed on a page by the builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub button_text: String,
    pub button_link: String,
    pub background_color: String,
    pub text_color: String,
    pub accent_color: String,
    #[serde(default)]
    pub images: Vec<String>,
}

impl Default for PageContent {
    fn default() -> Self {
        Self {
            title: "Page title".to_string(),
            subtitle: "A catchy subtitle".to_string(),
            description: "Describe the offer or product in detail".to_string(),
            button_text: "Order now".to_string(),
            button_link: "#".to_string(),
            background_color: "#ffffff".to_string(),
            text_color: "#000000".to_string(),
            accent_color: "#3b82f6".to_string(),
            images: Vec::new(),
        }
    }
}

/// Create/edit form for a landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandingPageDraft {
    pub name: String,
    pub url: String,
    pub template: LandingPageTemplate,
    pub status: LandingPageStatus,
}

impl LandingPageDraft {
    /// A draft page; the slug is normalized with [`slugify`].
    #[must_use]
    pub fn new(name: impl Into<String>, url: &str, template: LandingPageTemplate) -> Self {
        Self {
            name: name.into(),
            url: slugify(url),
            template,
            status: LandingPageStatus::Draft,
        }
    }

    /// Check required fields.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the name or slug is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.url.trim_matches('-').is_empty() {
            return Err(ValidationError::MissingField("url"));
        }
        Ok(())
    }
}

/// Lowercase and replace anything outside `[a-z0-9-]` with `-`.
#[must_use]
pub fn slugify(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}
