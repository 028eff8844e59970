//! Stock management for product managers.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use bookstore_core::BookId;

use crate::db::inventory::StockFilter;
use crate::db::{InventoryRepository, RepositoryError};
use crate::models::{Page, StockLevel};

pub const MAX_PAGE_SIZE: i64 = 100;

/// Errors from stock operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("stock must be a non-negative 32-bit count (got {0})")]
    InvalidStock(i64),

    #[error("book {0} not found")]
    BookNotFound(BookId),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Check a shelf count fits the column and is not negative.
///
/// # Errors
///
/// Returns `InventoryError::InvalidStock` otherwise.
pub fn validate_stock(stock: i64) -> Result<i32, InventoryError> {
    i32::try_from(stock)
        .ok()
        .filter(|s| *s >= 0)
        .ok_or(InventoryError::InvalidStock(stock))
}

/// A page of stock levels. Page size is clamped to `1..=MAX_PAGE_SIZE`; a
/// blank search is no search.
///
/// # Errors
///
/// Returns `InventoryError::Repository` if the read fails.
pub async fn stock_levels(pool: &PgPool, mut filter: StockFilter) -> Result<Page<StockLevel>, InventoryError> {
    filter.search = filter
        .search
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    filter.limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
    filter.offset = filter.offset.max(0);

    let (items, total) = InventoryRepository::new(pool).levels(&filter).await?;
    Ok(Page { items, total })
}

/// Set a book's shelf count.
///
/// # Errors
///
/// Returns `InventoryError::InvalidStock`, `InventoryError::BookNotFound`,
/// or a repository error.
#[instrument(skip(pool))]
pub async fn set_stock(pool: &PgPool, book_id: BookId, stock: i64) -> Result<StockLevel, InventoryError> {
    let stock = validate_stock(stock)?;
    let level = InventoryRepository::new(pool)
        .set_stock(book_id, stock)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => InventoryError::BookNotFound(book_id),
            other => other.into(),
        })?;
    tracing::info!(stock, "stock updated");
    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_stock() {
        assert_eq!(validate_stock(0).ok(), Some(0));
        assert_eq!(validate_stock(250).ok(), Some(250));
        assert!(matches!(validate_stock(-1), Err(InventoryError::InvalidStock(-1))));
        assert!(validate_stock(i64::from(i32::MAX) + 1).is_err());
    }
}
