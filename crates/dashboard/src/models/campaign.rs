//! Ad campaigns as stored in the `ad_campaigns` table.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use restodash_core::{CampaignId, CampaignObjective, CampaignStatus, RestaurantId};

use crate::error::ValidationError;
use crate::models::menu::require_non_negative;

/// An advertising campaign run for a restaurant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub objective: CampaignObjective,
    /// Daily budget in BRL.
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub budget: Decimal,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub ad_creative: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub status: CampaignStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Campaign {
    /// Patch that flips the play/pause control.
    #[must_use]
    pub fn toggle_patch(&self) -> CampaignPatch {
        CampaignPatch {
            status: Some(self.status.toggled()),
            ..CampaignPatch::default()
        }
    }
}

/// New campaign form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignDraft {
    pub name: String,
    pub objective: CampaignObjective,
    pub budget: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_creative: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub status: CampaignStatus,
}

impl CampaignDraft {
    /// A paused campaign optimizing for conversions.
    #[must_use]
    pub fn new(name: impl Into<String>, budget: Decimal) -> Self {
        Self {
            name: name.into(),
            objective: CampaignObjective::default(),
            budget,
            target_audience: None,
            ad_creative: None,
            start_date: None,
            end_date: None,
            status: CampaignStatus::default(),
        }
    }

    /// Check required fields and the date range.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a blank name, a negative budget or an
    /// end date before the start date.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        require_non_negative("budget", self.budget)?;
        if let (Some(start), Some(end)) = (self.start_date, self.end_date)
            && end < start
        {
            return Err(ValidationError::InvalidField {
                field: "end_date",
                reason: "must not be before start_date".to_string(),
            });
        }
        Ok(())
    }
}

/// Partial campaign update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective: Option<CampaignObjective>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_creative: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CampaignStatus>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_patch_only_sets_status() {
        let campaign: Campaign = serde_json::from_value(serde_json::json!({
            "id": "2b7c5e7c-8f0a-4d6e-9a0b-1c2d3e4f5a6b",
            "restaurant_id": "3c8d6f8d-9a1b-4e7f-8b1c-2d3e4f5a6b7c",
            "name": "Pizza Friday",
            "status": "active"
        }))
        .unwrap();
        assert_eq!(campaign.objective, CampaignObjective::Conversions);

        let json = serde_json::to_value(campaign.toggle_patch()).unwrap();
        assert_eq!(json, serde_json::json!({"status": "paused"}));
    }

    #[test]
    fn test_draft_validation() {
        let mut draft = CampaignDraft::new("Pizza Friday", Decimal::new(50, 0));
        assert!(draft.validate().is_ok());

        draft.start_date = NaiveDate::from_ymd_opt(2024, 1, 22);
        draft.end_date = NaiveDate::from_ymd_opt(2024, 1, 15);
        assert!(matches!(
            draft.validate(),
            Err(ValidationError::InvalidField { field: "end_date", .. })
        ));
    }

    #[test]
    fn test_draft_wire_format() {
        let draft = CampaignDraft {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 15),
            ..CampaignDraft::new("Pizza Friday", Decimal::new(50, 0))
        };
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["objective"], "CONVERSIONS");
        assert_eq!(json["status"], "paused");
        assert_eq!(json["start_date"], "2024-01-15");
    }
}
