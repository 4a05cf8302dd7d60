//! Restodash Core - Shared domain types.
//!
//! This crate provides the types shared by every Restodash component:
//! - `dashboard` - Session, resource stores and view-model logic
//! - `integration-tests` - Scenario tests against the in-memory backend
//!
//! # Architecture
//!
//! The core crate contains only types and validation rules - no I/O, no
//! backend access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe ids, emails, money, status enums and password rules

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
