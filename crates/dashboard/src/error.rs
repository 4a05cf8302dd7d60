//! Unified error handling for the dashboard.

use restodash_core::{EmailError, PasswordError};
use thiserror::Error;

use crate::backend::{AuthError, BackendError};
use crate::config::ConfigError;
use crate::services::ads::AdsError;
use crate::services::billing::BillingError;

/// Form input rejected before any remote call was made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required form field was left empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Email address failed parsing.
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    /// New password failed the password rules.
    #[error("Invalid password: {0}")]
    Password(#[from] PasswordError),

    /// A field had a value outside its allowed range.
    #[error("Invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

/// Coarse failure bucket shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Remote call failed or returned an error.
    Network,
    /// Local input was rejected.
    Validation,
    /// Authentication failed or no one is signed in.
    Auth,
}

/// Application-level error type for the dashboard.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Table operation failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Auth provider operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Input rejected locally.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Billing provider call failed.
    #[error("Billing error: {0}")]
    Billing(#[from] BillingError),

    /// Advertising provider call failed.
    #[error("Ads error: {0}")]
    Ads(#[from] AdsError),

    /// The operation needs a signed-in identity.
    #[error("Not signed in")]
    Unauthenticated,

    /// A row could not be decoded into its model.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl From<EmailError> for DashboardError {
    fn from(err: EmailError) -> Self {
        Self::Validation(err.into())
    }
}

impl From<PasswordError> for DashboardError {
    fn from(err: PasswordError) -> Self {
        Self::Validation(err.into())
    }
}

impl DashboardError {
    /// Which bucket this failure belongs to.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::Config(_) => ErrorKind::Validation,
            Self::Auth(AuthError::Http(_) | AuthError::Api { .. }) => ErrorKind::Network,
            Self::Auth(_) | Self::Unauthenticated => ErrorKind::Auth,
            Self::Backend(_) | Self::Billing(_) | Self::Ads(_) | Self::Decode(_) => {
                ErrorKind::Network
            }
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = DashboardError> = std::result::Result<T, E>;
