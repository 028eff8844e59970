//! Bookstore Core - Shared domain types.
//!
//! Used by the `storefront` binary and the `cli` tools.
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. With the `postgres` feature the id, price and quantity
//! newtypes also bind directly in `sqlx` queries.
//!
//! # Modules
//!
//! - [`types`] - Row ids, prices, quantities, roles
//! - [`cart`] - Cart lines, wishlist items and the session-copy sequence operations
//! - [`discount`] - Discount validity windows
//! - [`order`] - Checkout stock checks and order pricing

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod discount;
pub mod order;
pub mod types;

pub use cart::{CartLine, WishlistItem};
pub use discount::DiscountWindow;
pub use order::{CheckoutLine, OrderLine, StockShortfall};
pub use types::*;
