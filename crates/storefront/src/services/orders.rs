//! Checkout and order history.
//!
//! Placing an order turns the account cart into an order in one
//! transaction: every line must be in stock, lines are charged the catalog
//! price less the active discount, stock is taken off the shelf, the cart is
//! emptied and the delivery starts in `processing`.

use std::fmt::Write as _;

use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use bookstore_core::order::{order_total, price_lines, stock_shortfalls};
use bookstore_core::{BookId, OrderId, StockShortfall, UserId};

use crate::db::{OrderRepository, RepositoryError};
use crate::models::Order;

/// Longest accepted shipping address.
pub const MAX_ADDRESS_LENGTH: usize = 500;

/// Errors from checkout and order reads.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("shipping address is required")]
    MissingAddress,

    #[error("shipping address is longer than {MAX_ADDRESS_LENGTH} characters")]
    AddressTooLong,

    #[error("insufficient stock: {}", describe_shortfalls(.0))]
    InsufficientStock(Vec<StockShortfall>),

    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn describe_shortfalls(shortfalls: &[StockShortfall]) -> String {
    let mut out = String::new();
    for (i, s) in shortfalls.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(
            out,
            "book {} (requested {}, available {})",
            s.book_id, s.requested, s.available
        );
    }
    out
}

/// Trim and bound a shipping address.
///
/// # Errors
///
/// Returns `OrderError::MissingAddress` or `OrderError::AddressTooLong`.
pub fn validate_address(address: &str) -> Result<&str, OrderError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(OrderError::MissingAddress);
    }
    if address.chars().count() > MAX_ADDRESS_LENGTH {
        return Err(OrderError::AddressTooLong);
    }
    Ok(address)
}

/// Place an order for everything in the user's account cart.
///
/// Nothing is written unless every line can be filled.
///
/// # Errors
///
/// Returns `OrderError::EmptyCart`, an address error,
/// `OrderError::InsufficientStock` listing every short line, or a
/// repository error.
#[instrument(skip_all, fields(%user_id))]
pub async fn place_order(pool: &PgPool, user_id: UserId, shipping_address: &str) -> Result<Order, OrderError> {
    let shipping_address = validate_address(shipping_address)?;
    let repo = OrderRepository::new(pool);

    let mut checkout = repo.begin_checkout().await?;
    let lines = checkout.lock_cart(user_id).await?;
    if lines.is_empty() {
        return Err(OrderError::EmptyCart);
    }

    let shortfalls = stock_shortfalls(&lines);
    if !shortfalls.is_empty() {
        tracing::info!(short_lines = shortfalls.len(), "checkout refused for stock");
        return Err(OrderError::InsufficientStock(shortfalls));
    }

    let book_ids: Vec<BookId> = lines.iter().map(|line| line.book_id).collect();
    let rates = checkout.active_rates(&book_ids, Utc::now()).await?;
    let priced = price_lines(&lines, &rates);
    let total = order_total(&priced);

    let (order_id, _) = checkout
        .create_order(user_id, shipping_address, &priced, total)
        .await?;
    checkout.commit().await?;

    tracing::info!(%order_id, %total, lines = priced.len(), "order placed");
    repo.get(user_id, order_id)
        .await?
        .ok_or(OrderError::NotFound(order_id))
}

/// The user's orders, newest first.
///
/// # Errors
///
/// Returns `OrderError::Repository` if the read fails.
pub async fn list_orders(pool: &PgPool, user_id: UserId) -> Result<Vec<Order>, OrderError> {
    Ok(OrderRepository::new(pool).for_user(user_id).await?)
}

/// One of the user's orders.
///
/// # Errors
///
/// Returns `OrderError::NotFound` if the order doesn't exist or belongs to
/// someone else.
pub async fn get_order(pool: &PgPool, user_id: UserId, order_id: OrderId) -> Result<Order, OrderError> {
    OrderRepository::new(pool)
        .get(user_id, order_id)
        .await?
        .ok_or(OrderError::NotFound(order_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_address() {
        assert_eq!(validate_address("  12 Elm St  ").ok(), Some("12 Elm St"));
        assert!(matches!(validate_address("   "), Err(OrderError::MissingAddress)));
        assert!(matches!(
            validate_address(&"a".repeat(MAX_ADDRESS_LENGTH + 1)),
            Err(OrderError::AddressTooLong)
        ));
    }

    #[test]
    fn test_insufficient_stock_names_every_line() {
        let err = OrderError::InsufficientStock(vec![
            StockShortfall { book_id: BookId::new(2), requested: 3, available: 1 },
            StockShortfall { book_id: BookId::new(5), requested: 1, available: 0 },
        ]);
        assert_eq!(
            err.to_string(),
            "insufficient stock: book 2 (requested 3, available 1), book 5 (requested 1, available 0)"
        );
    }
}
