//! Domain models for the store.
//!
//! These types represent validated domain objects. Repositories decode rows
//! straight into them; routes convert them into response DTOs.

pub mod cart;
pub mod product;
pub mod promotion;
pub mod user;

pub use cart::{CartItem, CartOwner};
pub use product::{Product, ProductDraft, ProductInput};
pub use promotion::{Promotion, PromotionInput};
pub use user::{User, UserFlags};
