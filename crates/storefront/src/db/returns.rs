//! Return request repository.

use sqlx::{PgConnection, PgPool};

use bookstore_core::{BookId, OrderId, Price, Quantity, RequestStatus, ReturnId};

use super::RepositoryError;
use crate::models::ReturnRequest;

/// A new return request. `item_price` is what the customer paid per copy.
#[derive(Debug, Clone, Copy)]
pub struct NewReturn<'r> {
    pub order_id: OrderId,
    pub book_id: BookId,
    pub quantity: Quantity,
    pub item_price: Price,
    pub reason: &'r str,
    pub other_reason: Option<&'r str>,
}

/// Repository for `returns`.
pub struct ReturnRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReturnRepository<'a> {
    /// Create a new return repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a pending request.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if the order or book is missing.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, request: NewReturn<'_>) -> Result<ReturnId, RepositoryError> {
        let id = sqlx::query_scalar::<_, ReturnId>(
            r"
            INSERT INTO returns (order_id, book_id, quantity, item_price, reason, other_reason)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(request.order_id)
        .bind(request.book_id)
        .bind(request.quantity)
        .bind(request.item_price)
        .bind(request.reason)
        .bind(request.other_reason)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "return"))?;
        Ok(id)
    }

    /// Copies of a book already covered by pending or approved returns.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn requested_quantity(&self, order_id: OrderId, book_id: BookId) -> Result<i64, RepositoryError> {
        let quantity = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM returns
            WHERE order_id = $1 AND book_id = $2 AND status <> 'rejected'
            ",
        )
        .bind(order_id)
        .bind(book_id)
        .fetch_one(self.pool)
        .await?;
        Ok(quantity)
    }

    /// Requests, newest first, optionally only those in `status`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, status: Option<RequestStatus>) -> Result<Vec<ReturnRequest>, RepositoryError> {
        let requests = sqlx::query_as::<_, ReturnRequest>(
            r"
            SELECT r.id, r.order_id, r.book_id, b.title AS book_title, u.full_name AS customer,
                   r.quantity, r.item_price, r.reason, r.other_reason, r.status, r.requested_at
            FROM returns r
            JOIN books b ON b.id = r.book_id
            JOIN orders o ON o.id = r.order_id
            JOIN users u ON u.id = o.user_id
            WHERE ($1::request_status IS NULL OR r.status = $1)
            ORDER BY r.requested_at DESC, r.id DESC
            ",
        )
        .bind(status)
        .fetch_all(self.pool)
        .await?;
        Ok(requests)
    }

    /// Approve a pending return and put the copies back on the shelf.
    /// Returns the refund owed. Runs in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown request and
    /// `RepositoryError::Conflict` if it was already decided.
    pub async fn approve(&self, id: ReturnId) -> Result<Price, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let decided = sqlx::query_as::<_, (BookId, Quantity, Price)>(
            r"
            UPDATE returns SET status = 'approved'
            WHERE id = $1 AND status = 'pending'
            RETURNING book_id, quantity, item_price
            ",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((book_id, quantity, item_price)) = decided else {
            return Err(missing_or_decided(&mut *tx, id).await);
        };

        sqlx::query("UPDATE books SET stock = stock + $2 WHERE id = $1")
            .bind(book_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(item_price.times(quantity.as_u32()))
    }

    /// Reject a pending return.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown request and
    /// `RepositoryError::Conflict` if it was already decided.
    pub async fn reject(&self, id: ReturnId) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query("UPDATE returns SET status = 'rejected' WHERE id = $1 AND status = 'pending'")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(missing_or_decided(&mut *conn, id).await);
        }
        Ok(())
    }
}

async fn missing_or_decided(conn: &mut PgConnection, id: ReturnId) -> RepositoryError {
    let status = sqlx::query_scalar::<_, RequestStatus>("SELECT status FROM returns WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await;
    match status {
        Ok(Some(status)) => RepositoryError::Conflict(format!("return {id} is already {status}")),
        Ok(None) => RepositoryError::NotFound,
        Err(e) => RepositoryError::Database(e),
    }
}
