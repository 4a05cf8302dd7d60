//! First-run wizard that fills in the restaurant profile.
//!
//! Four linear steps. Moving forward is gated on the fields each step
//! requires; the form is only written once, from the last step, as a single
//! save against the restaurant store.

use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::error::{Result, ValidationError};
use crate::models::{Identity, OpeningHours, Restaurant, RestaurantPatch};
use crate::stores::RestaurantStore;

/// Wizard step, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OnboardingStep {
    BasicInfo,
    Location,
    Settings,
    Review,
}

impl OnboardingStep {
    pub const ALL: [Self; 4] = [Self::BasicInfo, Self::Location, Self::Settings, Self::Review];

    /// One-based position shown in the progress bar.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::BasicInfo => 1,
            Self::Location => 2,
            Self::Settings => 3,
            Self::Review => 4,
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::BasicInfo => "Basic information",
            Self::Location => "Location",
            Self::Settings => "Settings",
            Self::Review => "Review",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::BasicInfo => "Your restaurant's details",
            Self::Location => "Address and contact",
            Self::Settings => "Opening hours and preferences",
            Self::Review => "Review and confirm",
        }
    }

    const fn next(self) -> Option<Self> {
        match self {
            Self::BasicInfo => Some(Self::Location),
            Self::Location => Some(Self::Settings),
            Self::Settings => Some(Self::Review),
            Self::Review => None,
        }
    }

    const fn prev(self) -> Option<Self> {
        match self {
            Self::BasicInfo => None,
            Self::Location => Some(Self::BasicInfo),
            Self::Settings => Some(Self::Location),
            Self::Review => Some(Self::Settings),
        }
    }
}

/// Everything the wizard collects.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct OnboardingForm {
    pub name: String,
    pub description: String,
    pub cuisine_type: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub opening_hours: OpeningHours,
    pub delivery_fee: Decimal,
    pub minimum_order: Decimal,
    pub accepts_cards: bool,
    pub accepts_pix: bool,
    pub accepts_cash: bool,
}

impl Default for OnboardingForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            cuisine_type: String::new(),
            phone: String::new(),
            email: String::new(),
            website: String::new(),
            address: String::new(),
            city: String::new(),
            state: String::new(),
            zip_code: String::new(),
            opening_hours: OpeningHours::default(),
            delivery_fee: Decimal::new(500, 2),
            minimum_order: Decimal::new(2500, 2),
            accepts_cards: true,
            accepts_pix: true,
            accepts_cash: true,
        }
    }
}

impl OnboardingForm {
    /// Defaults with the contact email taken from the signed-in user.
    #[must_use]
    pub fn for_identity(identity: Option<&Identity>) -> Self {
        Self {
            email: identity.map(|i| i.email.clone()).unwrap_or_default(),
            ..Self::default()
        }
    }

    /// First field `step` needs that is still blank.
    #[must_use]
    pub fn missing_for(&self, step: OnboardingStep) -> Option<&'static str> {
        let required = match step {
            OnboardingStep::BasicInfo => vec![
                ("name", self.name.as_str()),
                ("cuisine_type", self.cuisine_type.as_str()),
            ],
            OnboardingStep::Location => vec![
                ("phone", self.phone.as_str()),
                ("address", self.address.as_str()),
                ("city", self.city.as_str()),
            ],
            OnboardingStep::Settings | OnboardingStep::Review => Vec::new(),
        };
        required
            .iter()
            .find(|(_, value)| value.trim().is_empty())
            .map(|&(field, _)| field)
    }

    /// The restaurant row this form describes. Blank optional fields are
    /// left unset.
    #[must_use]
    pub fn to_patch(&self) -> RestaurantPatch {
        RestaurantPatch {
            name: non_blank(&self.name),
            description: non_blank(&self.description),
            cuisine_type: non_blank(&self.cuisine_type),
            phone: non_blank(&self.phone),
            email: non_blank(&self.email),
            website: non_blank(&self.website),
            address: non_blank(&self.address),
            city: non_blank(&self.city),
            state: non_blank(&self.state),
            zip_code: non_blank(&self.zip_code),
            opening_hours: Some(self.opening_hours),
            delivery_fee: Some(self.delivery_fee),
            minimum_order: Some(self.minimum_order),
            accepts_cards: Some(self.accepts_cards),
            accepts_pix: Some(self.accepts_pix),
            accepts_cash: Some(self.accepts_cash),
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Wizard state: the current step and the form being filled.
#[derive(Debug, Clone, PartialEq)]
pub struct Onboarding {
    step: OnboardingStep,
    form: OnboardingForm,
}

impl Onboarding {
    /// Start at the first step with default values.
    #[must_use]
    pub fn new(identity: Option<&Identity>) -> Self {
        Self {
            step: OnboardingStep::BasicInfo,
            form: OnboardingForm::for_identity(identity),
        }
    }

    #[must_use]
    pub const fn step(&self) -> OnboardingStep {
        self.step
    }

    #[must_use]
    pub const fn form(&self) -> &OnboardingForm {
        &self.form
    }

    pub const fn form_mut(&mut self) -> &mut OnboardingForm {
        &mut self.form
    }

    /// Whether the current step has everything it needs.
    #[must_use]
    pub fn is_step_valid(&self) -> bool {
        self.form.missing_for(self.step).is_none()
    }

    /// Advance one step. Does nothing on the last step.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` naming the first blank required field; the
    /// step does not change.
    pub fn next(&mut self) -> Result<OnboardingStep, ValidationError> {
        if let Some(field) = self.form.missing_for(self.step) {
            return Err(ValidationError::MissingField(field));
        }
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        Ok(self.step)
    }

    /// Go back one step. Does nothing on the first step.
    pub fn back(&mut self) -> OnboardingStep {
        if let Some(prev) = self.step.prev() {
            self.step = prev;
        }
        self.step
    }

    /// Save the form as the signed-in owner's restaurant.
    ///
    /// # Errors
    ///
    /// Returns a validation error when called before the review step or
    /// with a required field blank, otherwise the store's error. The wizard
    /// stays on the review step either way.
    #[instrument(skip_all)]
    pub async fn submit(&self, store: &RestaurantStore) -> Result<Restaurant> {
        if self.step != OnboardingStep::Review {
            return Err(ValidationError::InvalidField {
                field: "step",
                reason: format!("cannot submit from step {}", self.step.number()),
            }
            .into());
        }
        if let Some(field) = OnboardingStep::ALL
            .into_iter()
            .find_map(|step| self.form.missing_for(step))
        {
            return Err(ValidationError::MissingField(field).into());
        }

        let restaurant = store.save(&self.form.to_patch()).await?;
        info!(restaurant_id = %restaurant.id, "Onboarding completed");
        Ok(restaurant)
    }
}
