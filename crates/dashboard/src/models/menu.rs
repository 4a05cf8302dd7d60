//! Menus and their items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use restodash_core::{MenuCategory, MenuId, MenuItemId, RestaurantId};

use crate::error::ValidationError;

/// A menu belonging to a restaurant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub id: MenuId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub category: MenuCategory,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_true", deserialize_with = "crate::models::null_as_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// New menu form. The owning restaurant is filled in by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: MenuCategory,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub is_active: bool,
}

impl MenuDraft {
    /// An active menu with no description or image.
    #[must_use]
    pub fn new(name: impl Into<String>, category: MenuCategory, price: Decimal) -> Self {
        Self {
            name: name.into(),
            description: None,
            category,
            price,
            image_url: None,
            is_active: true,
        }
    }

    /// Check required fields.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the name is blank or the price negative.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name(&self.name)?;
        require_non_negative("price", self.price)
    }
}

/// Partial menu update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<MenuCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// A dish inside a menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub menu_id: MenuId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_true", deserialize_with = "crate::models::null_as_true")]
    pub is_available: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// New item form. The parent menu is filled in by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItemDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub is_available: bool,
}

impl MenuItemDraft {
    /// An available item with no description or image.
    #[must_use]
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            name: name.into(),
            description: None,
            price,
            image_url: None,
            is_available: true,
        }
    }

    /// Check required fields.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the name is blank or the price negative.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name(&self.name)?;
        require_non_negative("price", self.price)
    }
}

/// Partial item update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
}

/// Search box and category dropdown over the menu list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuFilter {
    /// Case-insensitive substring of name or description.
    pub search: String,
    /// `None` shows every category.
    pub category: Option<MenuCategory>,
}

impl MenuFilter {
    /// Whether a menu passes the filter.
    #[must_use]
    pub fn matches(&self, menu: &Menu) -> bool {
        let term = self.search.trim().to_lowercase();
        let matches_search = term.is_empty()
            || menu.name.to_lowercase().contains(&term)
            || menu
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&term));
        let matches_category = self.category.is_none_or(|c| c == menu.category);
        matches_search && matches_category
    }

    /// Menus passing the filter, in their original order.
    #[must_use]
    pub fn apply<'a>(&self, menus: &'a [Menu]) -> Vec<&'a Menu> {
        menus.iter().filter(|m| self.matches(m)).collect()
    }

    /// True when neither a search term nor a category is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.category.is_none()
    }
}

const fn default_true() -> bool {
    true
}

fn require_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::MissingField("name"));
    }
    Ok(())
}

pub(crate) fn require_non_negative(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::InvalidField {
            field,
            reason: "must not be negative".to_string(),
        });
    }
    Ok(())
}
