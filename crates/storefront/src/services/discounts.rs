//! Discount management for sales managers.
//!
//! A book has at most one active discount. Applying a new one ends the open
//! ones in the same transaction.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use bookstore_core::discount::select_current;
use bookstore_core::{BookId, DiscountRate};

use crate::db::{BookRepository, DiscountRepository, RepositoryError};
use crate::models::{BookDiscount, Discount};

/// Errors from discount operations.
#[derive(Debug, Error)]
pub enum DiscountError {
    #[error("book {0} not found")]
    BookNotFound(BookId),

    #[error("discount name must not be empty")]
    EmptyName,

    #[error("discount end date is already past")]
    EndsInPast,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Replace the book's active discount with a new one starting now.
///
/// # Errors
///
/// Returns `DiscountError::BookNotFound` for an unknown book,
/// `DiscountError::EmptyName` or `DiscountError::EndsInPast` for bad input,
/// or a repository error.
#[instrument(skip_all, fields(%book_id, rate = %rate.percent()))]
pub async fn apply_discount(
    pool: &PgPool,
    book_id: BookId,
    name: &str,
    rate: DiscountRate,
    ends_at: Option<DateTime<Utc>>,
) -> Result<BookDiscount, DiscountError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DiscountError::EmptyName);
    }
    let now = Utc::now();
    if ends_at.is_some_and(|end| end <= now) {
        return Err(DiscountError::EndsInPast);
    }

    let price = BookRepository::new(pool)
        .price(book_id)
        .await?
        .ok_or(DiscountError::BookNotFound(book_id))?;

    let discount = DiscountRepository::new(pool)
        .replace(book_id, name, rate, now, ends_at)
        .await
        .map_err(|e| match e {
            RepositoryError::ForeignKey(_) => DiscountError::BookNotFound(book_id),
            other => other.into(),
        })?;

    tracing::info!(discount_id = %discount.id, "discount applied");
    Ok(BookDiscount::new(discount, price))
}

/// The discount in effect for a book, if any.
///
/// # Errors
///
/// Returns `DiscountError::BookNotFound` for an unknown book, or a
/// repository error.
pub async fn current_discount(
    pool: &PgPool,
    book_id: BookId,
) -> Result<Option<BookDiscount>, DiscountError> {
    let price = BookRepository::new(pool)
        .price(book_id)
        .await?
        .ok_or(DiscountError::BookNotFound(book_id))?;

    let discounts = DiscountRepository::new(pool).for_book(book_id).await?;
    Ok(select_current(&discounts, Utc::now(), Discount::window)
        .cloned()
        .map(|discount| BookDiscount::new(discount, price)))
}

/// End every open discount on a book. Returns how many were ended.
///
/// # Errors
///
/// Returns `DiscountError::Repository` if the update fails.
#[instrument(skip_all, fields(%book_id))]
pub async fn end_all_discounts(pool: &PgPool, book_id: BookId) -> Result<u64, DiscountError> {
    let ended = DiscountRepository::new(pool)
        .end_all(book_id, Utc::now())
        .await?;
    tracing::info!(ended, "discounts ended");
    Ok(ended)
}
