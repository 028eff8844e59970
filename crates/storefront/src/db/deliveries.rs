//! Delivery tracking repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bookstore_core::{DeliveryStatus, OrderId};

use super::RepositoryError;
use crate::models::Delivery;

/// Repository for `delivery_statuses`.
pub struct DeliveryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DeliveryRepository<'a> {
    /// Create a new delivery repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of deliveries, most recently updated first, and the total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<(Vec<Delivery>, i64), RepositoryError> {
        let deliveries = sqlx::query_as::<_, Delivery>(
            r"
            SELECT ds.order_id, u.full_name AS customer, o.shipping_address,
                   ds.status, ds.last_updated
            FROM delivery_statuses ds
            JOIN orders o ON o.id = ds.order_id
            JOIN users u ON u.id = o.user_id
            ORDER BY ds.last_updated DESC, ds.order_id DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM delivery_statuses")
            .fetch_one(self.pool)
            .await?;

        Ok((deliveries, total))
    }

    /// Current status of an order's delivery.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn status(&self, order_id: OrderId) -> Result<Option<DeliveryStatus>, RepositoryError> {
        let status = sqlx::query_scalar::<_, DeliveryStatus>(
            "SELECT status FROM delivery_statuses WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(status)
    }

    /// Move a delivery from `from` to `to`. Returns `false` when the status
    /// was no longer `from`, leaving the row untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn transition(
        &self,
        order_id: OrderId,
        from: DeliveryStatus,
        to: DeliveryStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE delivery_statuses SET status = $3, last_updated = $4
            WHERE order_id = $1 AND status = $2
            ",
        )
        .bind(order_id)
        .bind(from)
        .bind(to)
        .bind(now)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
