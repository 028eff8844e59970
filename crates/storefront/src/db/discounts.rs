//! Discount repository.
//!
//! Discounts are never updated in place except to close them: applying a new
//! discount ends the book's open ones and links a fresh row.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bookstore_core::{BookId, DiscountRate};

use super::RepositoryError;
use crate::models::Discount;

/// Repository for discount database operations.
pub struct DiscountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DiscountRepository<'a> {
    /// Create a new discount repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every discount ever linked to a book, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_book(&self, book_id: BookId) -> Result<Vec<Discount>, RepositoryError> {
        let discounts = sqlx::query_as::<_, Discount>(
            r"
            SELECT d.id, d.name, d.rate, d.starts_at, d.ends_at
            FROM discounts d
            JOIN book_discounts bd ON bd.discount_id = d.id
            WHERE bd.book_id = $1
            ORDER BY d.starts_at, d.id
            ",
        )
        .bind(book_id)
        .fetch_all(self.pool)
        .await?;
        Ok(discounts)
    }

    /// End the book's open discounts, then create and link a new one starting
    /// at `now`. Runs in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if the book doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn replace(
        &self,
        book_id: BookId,
        name: &str,
        rate: DiscountRate,
        now: DateTime<Utc>,
        ends_at: Option<DateTime<Utc>>,
    ) -> Result<Discount, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let ended = sqlx::query(
            r"
            UPDATE discounts SET ends_at = $2
            WHERE id IN (SELECT discount_id FROM book_discounts WHERE book_id = $1)
              AND (ends_at IS NULL OR ends_at > $2)
            ",
        )
        .bind(book_id)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let discount = sqlx::query_as::<_, Discount>(
            r"
            INSERT INTO discounts (name, rate, starts_at, ends_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, rate, starts_at, ends_at
            ",
        )
        .bind(name)
        .bind(rate)
        .bind(now)
        .bind(ends_at)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO book_discounts (book_id, discount_id) VALUES ($1, $2)")
            .bind(book_id)
            .bind(discount.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_write(e, "book discount"))?;

        tx.commit().await?;

        tracing::debug!(%book_id, discount_id = %discount.id, ended, "replaced discount");
        Ok(discount)
    }

    /// Close every open discount on a book. Returns how many were ended.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn end_all(&self, book_id: BookId, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE discounts SET ends_at = $2
            WHERE id IN (SELECT discount_id FROM book_discounts WHERE book_id = $1)
              AND (ends_at IS NULL OR ends_at > $2)
            ",
        )
        .bind(book_id)
        .bind(now)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
