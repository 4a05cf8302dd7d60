//! Core types for Restodash.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod password;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{CurrencyCode, Money};
pub use password::{MIN_PASSWORD_LENGTH, PasswordError, validate_new_password};
pub use status::*;
