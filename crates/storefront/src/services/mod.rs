//! Business logic for the storefront.
//!
//! # Services
//!
//! - `local_store` - Anonymous cart and wishlist held in the session
//! - `catalog` - The durable cart/wishlist store port and its `PostgreSQL` implementation
//! - `reconcile` - Merging local data into the account after sign-in
//! - `cart`, `wishlist` - Cart and wishlist operations for both kinds of visitor
//! - `reports` - Top rated, best sellers, new arrivals (cached)
//! - `discounts` - Discount management
//! - `reviews` - Review submission and moderation
//! - `orders` - Checkout and order history
//! - `inventory` - Stock levels (product managers)
//! - `deliveries` - Delivery tracking (product managers)
//! - `after_sale` - Cancellations and returns
//! - `sign_in` - Verifying identity callbacks from the sign-in provider

pub mod after_sale;
pub mod cart;
pub mod catalog;
pub mod deliveries;
pub mod discounts;
pub mod inventory;
pub mod local_store;
pub mod orders;
pub mod reconcile;
pub mod reports;
pub mod reviews;
pub mod sign_in;
pub mod wishlist;

pub use catalog::{CatalogStore, PgCatalogStore};
pub use local_store::{LocalCart, LocalStore, LocalStoreError, LocalWishlist};
pub use reconcile::{
    CartReconciliation, LineFailure, ReconcileError, WishlistReconciliation, reconcile_cart,
    reconcile_wishlist,
};
pub use reports::Reports;
