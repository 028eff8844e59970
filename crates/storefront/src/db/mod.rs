//! Database operations for the bookstore `PostgreSQL` schema.
//!
//! ## Tables
//!
//! - `users` - Accounts and roles (credentials live with the sign-in provider)
//! - `authors`, `genres`, `books` - Catalog
//! - `carts`, `cart_items` - One durable cart per user
//! - `wishlist` - (user, book) pairs
//! - `reviews` - Ratings and comments awaiting or past moderation
//! - `orders`, `order_items` - Placed orders, written at checkout
//! - `delivery_statuses` - One delivery per order
//! - `cancellations`, `returns` - After-sale requests awaiting a sales manager
//! - `discounts`, `book_discounts` - Discount history per book
//! - `tower_sessions.session` - Session storage (anonymous carts live here)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p bookstore-cli -- migrate run
//! ```

pub mod books;
pub mod cancellations;
pub mod carts;
pub mod deliveries;
pub mod discounts;
pub mod inventory;
pub mod orders;
pub mod returns;
pub mod reviews;
pub mod users;
pub mod wishlist;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use books::BookRepository;
pub use cancellations::CancellationRepository;
pub use carts::CartRepository;
pub use deliveries::DeliveryRepository;
pub use discounts::DiscountRepository;
pub use inventory::InventoryRepository;
pub use orders::OrderRepository;
pub use returns::ReturnRepository;
pub use reviews::ReviewRepository;
pub use users::UserRepository;
pub use wishlist::WishlistRepository;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Uniqueness constraint violation (e.g., a second cart for one user).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Referenced row does not exist (e.g., a book removed from the catalog).
    #[error("foreign key violation: {0}")]
    ForeignKey(String),
}

impl RepositoryError {
    /// Classify a sqlx error by the constraint it tripped.
    pub(crate) fn from_write(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::Conflict(format!("{what} already exists"));
            }
            if db_err.is_foreign_key_violation() {
                return Self::ForeignKey(format!("{what} references a missing row"));
            }
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
