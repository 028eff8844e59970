//! Cancellation request repository.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use bookstore_core::{
    BookId, CancellationId, DeliveryStatus, OrderId, Quantity, RequestStatus,
};

use super::RepositoryError;
use crate::models::CancellationRequest;

const REQUEST_COLUMNS: &str = r"
    c.id, c.order_id, c.book_id, b.title AS book_title, u.full_name AS customer,
    c.quantity, c.reason, c.other_reason, c.status, c.requested_at
";

/// A new cancellation request.
#[derive(Debug, Clone, Copy)]
pub struct NewCancellation<'r> {
    pub order_id: OrderId,
    pub book_id: BookId,
    pub quantity: Quantity,
    pub reason: &'r str,
    pub other_reason: Option<&'r str>,
}

/// Repository for `cancellations`.
pub struct CancellationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CancellationRepository<'a> {
    /// Create a new cancellation repository.
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
    pub async fn create(&self, request: NewCancellation<'_>) -> Result<CancellationId, RepositoryError> {
        let id = sqlx::query_scalar::<_, CancellationId>(
            r"
            INSERT INTO cancellations (order_id, book_id, quantity, reason, other_reason)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(request.order_id)
        .bind(request.book_id)
        .bind(request.quantity)
        .bind(request.reason)
        .bind(request.other_reason)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "cancellation"))?;
        Ok(id)
    }

    /// Copies of a book already covered by pending or approved requests.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn requested_quantity(&self, order_id: OrderId, book_id: BookId) -> Result<i64, RepositoryError> {
        let quantity = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM cancellations
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
    pub async fn list(&self, status: Option<RequestStatus>) -> Result<Vec<CancellationRequest>, RepositoryError> {
        let requests = sqlx::query_as::<_, CancellationRequest>(&format!(
            r"
            SELECT {REQUEST_COLUMNS}
            FROM cancellations c
            JOIN books b ON b.id = c.book_id
            JOIN orders o ON o.id = c.order_id
            JOIN users u ON u.id = o.user_id
            WHERE ($1::request_status IS NULL OR c.status = $1)
            ORDER BY c.requested_at DESC, c.id DESC
            "
        ))
        .bind(status)
        .fetch_all(self.pool)
        .await?;
        Ok(requests)
    }

    /// Approve a pending request: put the copies back on the shelf and mark
    /// the order's delivery cancelled. Runs in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown request and
    /// `RepositoryError::Conflict` if it was already decided or the order has
    /// shipped in the meantime.
    pub async fn approve(&self, id: CancellationId, now: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let decided = sqlx::query_as::<_, (OrderId, BookId, Quantity)>(
            r"
            UPDATE cancellations SET status = 'approved'
            WHERE id = $1 AND status = 'pending'
            RETURNING order_id, book_id, quantity
            ",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((order_id, book_id, quantity)) = decided else {
            return Err(missing_or_decided(&mut *tx, id).await);
        };

        let delivery = sqlx::query_scalar::<_, DeliveryStatus>(
            "SELECT status FROM delivery_statuses WHERE order_id = $1 FOR UPDATE",
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;
        if delivery.is_some_and(|status| !status.is_cancellable()) {
            return Err(RepositoryError::Conflict(format!(
                "order {order_id} has already shipped"
            )));
        }

        sqlx::query("UPDATE books SET stock = stock + $2 WHERE id = $1")
            .bind(book_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE delivery_statuses SET status = 'cancelled', last_updated = $2 WHERE order_id = $1",
        )
        .bind(order_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!(cancellation_id = %id, %order_id, %book_id, %quantity, "cancellation approved");
        Ok(())
    }

    /// Reject a pending request.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown request and
    /// `RepositoryError::Conflict` if it was already decided.
    pub async fn reject(&self, id: CancellationId) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query(
            "UPDATE cancellations SET status = 'rejected' WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 0 {
            return Err(missing_or_decided(&mut *conn, id).await);
        }
        Ok(())
    }
}

async fn missing_or_decided(conn: &mut PgConnection, id: CancellationId) -> RepositoryError {
    let status = sqlx::query_scalar::<_, RequestStatus>("SELECT status FROM cancellations WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await;
    match status {
        Ok(Some(status)) => RepositoryError::Conflict(format!("cancellation {id} is already {status}")),
        Ok(None) => RepositoryError::NotFound,
        Err(e) => RepositoryError::Database(e),
    }
}
