//! Core types for the ThinkPad Store.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod discount;
pub mod email;
pub mod id;
pub mod price;
pub mod username;

pub use discount::{Discount, DiscountError};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{DecimalFieldError, Price, PriceError, parse_decimal_field, round_money};
pub use username::{Username, UsernameError};
