//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Password hashing, registration, login and JWT issuance
//! - `media` - Product image storage under the media root
//! - `pricing` - Cart line totals and promotion discounts

pub mod auth;
pub mod media;
pub mod pricing;
