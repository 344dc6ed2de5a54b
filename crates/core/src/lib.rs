//! ThinkPad Store Core - Shared types library.
//!
//! This crate provides the domain types used by every ThinkPad Store component:
//! - `server` - JSON API (accounts, catalog, cart, assistant, admin)
//! - `cli` - Management commands (migrations, dev server, seeding)
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database access,
//! no HTTP clients. Database encoding is available behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, usernames, prices and discounts

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
