//! Core types for the bookstore.
//!
//! Type-safe wrappers for row keys, money, quantities and statuses.

pub mod id;
pub mod price;
pub mod quantity;
pub mod status;

pub use id::*;
pub use price::{DiscountRate, Price, PriceError};
pub use quantity::{Quantity, QuantityError};
pub use status::*;
