//! Landing page list. Held in memory only; nothing is persisted.

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use restodash_core::{LandingPageId, LandingPageStatus};

use crate::error::ValidationError;
use crate::models::{LandingPage, LandingPageDraft, LandingPageTemplate, PageContent};

/// Pages the list starts with.
fn seed_pages() -> Vec<LandingPage> {
    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
    vec![
        LandingPage {
            id: LandingPageId::new(),
            name: "Pizza Margherita promo".to_string(),
            url: "pizza-margherita-promo".to_string(),
            template: LandingPageTemplate::RestaurantPromo,
            status: LandingPageStatus::Published,
            views: 1_250,
            conversions: 89,
            created_at: date(2024, 1, 15),
            content: None,
        },
        LandingPage {
            id: LandingPageId::new(),
            name: "Full menu".to_string(),
            url: "menu-completo".to_string(),
            template: LandingPageTemplate::FullMenu,
            status: LandingPageStatus::Draft,
            views: 0,
            conversions: 0,
            created_at: date(2024, 1, 20),
            content: None,
        },
    ]
}

fn not_found(id: LandingPageId) -> ValidationError {
    ValidationError::InvalidField {
        field: "landing_page",
        reason: format!("{id} does not exist"),
    }
}

/// The owner's landing pages, in creation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandingPageList {
    pages: Vec<LandingPage>,
}

impl Default for LandingPageList {
    fn default() -> Self {
        Self { pages: seed_pages() }
    }
}

impl LandingPageList {
    /// The two sample pages.
    #[must_use]
    pub fn seeded() -> Self {
        Self::default()
    }

    /// No pages at all.
    #[must_use]
    pub const fn empty() -> Self {
        Self { pages: Vec::new() }
    }

    #[must_use]
    pub fn pages(&self) -> &[LandingPage] {
        &self.pages
    }

    #[must_use]
    pub fn get(&self, id: LandingPageId) -> Option<&LandingPage> {
        self.pages.iter().find(|p| p.id == id)
    }

    fn get_mut(&mut self, id: LandingPageId) -> Result<&mut LandingPage, ValidationError> {
        self.pages
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found(id))
    }

    /// Add a page dated today with zeroed counters.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the draft is incomplete.
    pub fn create(&mut self, draft: &LandingPageDraft) -> Result<&LandingPage, ValidationError> {
        self.create_on(draft, Utc::now().date_naive())
    }

    /// Add a page dated `today` with zeroed counters.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the draft is incomplete.
    pub fn create_on(
        &mut self,
        draft: &LandingPageDraft,
        today: NaiveDate,
    ) -> Result<&LandingPage, ValidationError> {
        draft.validate()?;
        let page = LandingPage {
            id: LandingPageId::new(),
            name: draft.name.trim().to_string(),
            url: draft.url.clone(),
            template: draft.template,
            status: draft.status,
            views: 0,
            conversions: 0,
            created_at: today,
            content: None,
        };
        let id = page.id;
        info!(%id, url = %page.url, "Landing page created");
        self.pages.push(page);
        self.pages.last().ok_or_else(|| not_found(id))
    }

    /// Replace name, slug, template and status. Counters and date stay.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the draft is incomplete or the page
    /// does not exist.
    pub fn edit(
        &mut self,
        id: LandingPageId,
        draft: &LandingPageDraft,
    ) -> Result<&LandingPage, ValidationError> {
        draft.validate()?;
        let page = self.get_mut(id)?;
        page.name = draft.name.trim().to_string();
        page.url.clone_from(&draft.url);
        page.template = draft.template;
        page.status = draft.status;
        debug!(%id, "Landing page edited");
        Ok(page)
    }

    /// Store builder content on a page.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the page does not exist.
    pub fn save_content(
        &mut self,
        id: LandingPageId,
        content: PageContent,
    ) -> Result<&LandingPage, ValidationError> {
        let page = self.get_mut(id)?;
        page.content = Some(content);
        Ok(page)
    }

    /// Remove a page. Returns whether it existed.
    pub fn delete(&mut self, id: LandingPageId) -> bool {
        let before = self.pages.len();
        self.pages.retain(|p| p.id != id);
        self.pages.len() != before
    }

    /// Copy a page as a new draft dated today.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the page does not exist.
    pub fn duplicate(&mut self, id: LandingPageId) -> Result<&LandingPage, ValidationError> {
        self.duplicate_on(id, Utc::now().date_naive())
    }

    /// Copy a page as a new draft dated `today`: " (Copy)" name suffix,
    /// `-copy` slug suffix, zeroed counters.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the page does not exist.
    pub fn duplicate_on(
        &mut self,
        id: LandingPageId,
        today: NaiveDate,
    ) -> Result<&LandingPage, ValidationError> {
        let source = self.get(id).ok_or_else(|| not_found(id))?;
        let copy = LandingPage {
            id: LandingPageId::new(),
            name: format!("{} (Copy)", source.name),
            url: format!("{}-copy", source.url),
            status: LandingPageStatus::Draft,
            views: 0,
            conversions: 0,
            created_at: today,
            ..source.clone()
        };
        let copy_id = copy.id;
        info!(from = %id, id = %copy_id, "Landing page duplicated");
        self.pages.push(copy);
        self.pages.last().ok_or_else(|| not_found(copy_id))
    }

    #[must_use]
    pub fn total_views(&self) -> u64 {
        self.pages.iter().map(|p| p.views).sum()
    }

    #[must_use]
    pub fn total_conversions(&self) -> u64 {
        self.pages.iter().map(|p| p.conversions).sum()
    }

    /// Conversions per view across all pages, as a percentage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn conversion_rate(&self) -> f64 {
        match self.total_views() {
            0 => 0.0,
            views => self.total_conversions() as f64 / views as f64 * 100.0,
        }
    }

    #[must_use]
    pub fn published_count(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| p.status == LandingPageStatus::Published)
            .count()
    }
}
