//! Delivery tracking for product managers.

use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use bookstore_core::{DeliveryStatus, OrderId};

use crate::db::{DeliveryRepository, RepositoryError};
use crate::models::{Delivery, Page};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Errors from delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("delivery cannot move from {from} to {to}")]
    InvalidTransition {
        from: DeliveryStatus,
        to: DeliveryStatus,
    },

    /// Someone else changed the status between the read and the write.
    #[error("delivery for order {0} changed concurrently")]
    Changed(OrderId),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A page of deliveries, most recently updated first.
///
/// # Errors
///
/// Returns `DeliveryError::Repository` if the read fails.
pub async fn list_deliveries(pool: &PgPool, limit: i64, offset: i64) -> Result<Page<Delivery>, DeliveryError> {
    let (items, total) = DeliveryRepository::new(pool)
        .list(limit.clamp(1, MAX_PAGE_SIZE), offset.max(0))
        .await?;
    Ok(Page { items, total })
}

/// Move an order's delivery forward.
///
/// # Errors
///
/// Returns `DeliveryError::OrderNotFound`, `DeliveryError::InvalidTransition`
/// for a backwards move or one into or out of `cancelled`,
/// `DeliveryError::Changed` if the status moved underneath us, or a
/// repository error.
#[instrument(skip(pool))]
pub async fn update_delivery_status(
    pool: &PgPool,
    order_id: OrderId,
    to: DeliveryStatus,
) -> Result<DeliveryStatus, DeliveryError> {
    let repo = DeliveryRepository::new(pool);
    let from = repo
        .status(order_id)
        .await?
        .ok_or(DeliveryError::OrderNotFound(order_id))?;
    if !from.can_advance_to(to) {
        return Err(DeliveryError::InvalidTransition { from, to });
    }
    if !repo.transition(order_id, from, to, Utc::now()).await? {
        return Err(DeliveryError::Changed(order_id));
    }
    tracing::info!(%from, %to, "delivery status updated");
    Ok(to)
}
