//! Restodash Dashboard library.
//!
//! Everything behind the restaurant owner's dashboard except the pixels:
//! the session, per-table stores kept in sync with the hosted backend, the
//! route guard, the onboarding wizard and the screen view-models.
//!
//! # Modules
//!
//! - [`backend`] - Table and auth provider traits, REST client, in-memory fake
//! - [`session`] - Current identity driven by auth events
//! - [`stores`] - Menu, item, campaign, restaurant and subscription stores
//! - [`guard`] - Route table and auth guard
//! - [`onboarding`] - Four-step restaurant setup wizard
//! - [`overview`] - Dashboard landing screen
//! - [`services`] - Billing, ads, landing pages and settings
//! - [`state`] - Wiring of all of the above

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod guard;
pub mod models;
pub mod onboarding;
pub mod overview;
pub mod services;
pub mod session;
pub mod state;
pub mod stores;
pub mod telemetry;

pub use config::DashboardConfig;
pub use error::{DashboardError, ErrorKind, Result, ValidationError};
pub use guard::{GuardDecision, Route, RouteGuard};
pub use session::{SessionState, SessionStore};
pub use state::DashboardApp;
