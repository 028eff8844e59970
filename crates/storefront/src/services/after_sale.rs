//! Cancellations and returns.
//!
//! Customers ask to cancel copies of an order that has not shipped, or to
//! return copies of a delivered order within [`RETURN_WINDOW_DAYS`]. Sales
//! managers approve or reject each request; approving one puts the copies
//! back on the shelf, and approving a cancellation also stops the delivery.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use bookstore_core::{
    BookId, CancellationId, DeliveryStatus, OrderId, Price, Quantity, RequestStatus, ReturnId,
    UserId,
};

use crate::db::cancellations::NewCancellation;
use crate::db::orders::OrderedLine;
use crate::db::returns::NewReturn;
use crate::db::{CancellationRepository, OrderRepository, RepositoryError, ReturnRepository};
use crate::models::{CancellationRequest, ReturnRequest};

/// Days after ordering during which delivered copies can be returned.
pub const RETURN_WINDOW_DAYS: i64 = 30;

pub const MAX_REASON_LENGTH: usize = 500;

/// Errors from cancellation and return operations.
#[derive(Debug, Error)]
pub enum AfterSaleError {
    #[error("book {book_id} is not on order {order_id}")]
    NotOnOrder { order_id: OrderId, book_id: BookId },

    #[error("a reason is required")]
    MissingReason,

    #[error("reason is longer than {MAX_REASON_LENGTH} characters")]
    ReasonTooLong,

    #[error("only {remaining} more copies can be requested (asked for {requested})")]
    TooMany { requested: i32, remaining: i64 },

    #[error("order {order_id} can no longer be cancelled ({status})")]
    NotCancellable {
        order_id: OrderId,
        status: DeliveryStatus,
    },

    #[error("order {order_id} cannot be returned ({status})")]
    NotReturnable {
        order_id: OrderId,
        status: DeliveryStatus,
    },

    #[error("the {RETURN_WINDOW_DAYS}-day return window for order {0} has closed")]
    ReturnWindowClosed(OrderId),

    #[error("cancellation {0} not found")]
    CancellationNotFound(CancellationId),

    #[error("return {0} not found")]
    ReturnNotFound(ReturnId),

    /// The request was already approved or rejected, or the order moved on.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// What the customer submits for either kind of request.
#[derive(Debug, Clone, Copy)]
pub struct RequestInput<'r> {
    pub order_id: OrderId,
    pub book_id: BookId,
    pub quantity: Quantity,
    pub reason: &'r str,
    pub other_reason: Option<&'r str>,
}

impl<'r> RequestInput<'r> {
    /// Trim the reasons; `other_reason` is dropped when blank.
    fn normalized(self) -> Result<Self, AfterSaleError> {
        let reason = self.reason.trim();
        if reason.is_empty() {
            return Err(AfterSaleError::MissingReason);
        }
        let other_reason = self.other_reason.map(str::trim).filter(|r| !r.is_empty());
        let too_long = |s: &str| s.chars().count() > MAX_REASON_LENGTH;
        if too_long(reason) || other_reason.is_some_and(too_long) {
            return Err(AfterSaleError::ReasonTooLong);
        }
        Ok(Self {
            reason,
            other_reason,
            ..self
        })
    }
}

/// Check a request fits in what is left of the ordered quantity.
///
/// # Errors
///
/// Returns `AfterSaleError::TooMany` with the copies still available.
pub fn check_remaining(requested: Quantity, ordered: Quantity, already_requested: i64) -> Result<(), AfterSaleError> {
    let remaining = i64::from(ordered.get()) - already_requested;
    if i64::from(requested.get()) > remaining {
        return Err(AfterSaleError::TooMany {
            requested: requested.get(),
            remaining: remaining.max(0),
        });
    }
    Ok(())
}

/// Whether a return filed at `now` is inside the window for an order placed
/// at `ordered_at`.
#[must_use]
pub fn within_return_window(ordered_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - ordered_at <= Duration::days(RETURN_WINDOW_DAYS)
}

async fn ordered_line(
    pool: &PgPool,
    user_id: UserId,
    input: &RequestInput<'_>,
) -> Result<OrderedLine, AfterSaleError> {
    OrderRepository::new(pool)
        .ordered_line(user_id, input.order_id, input.book_id)
        .await?
        .ok_or(AfterSaleError::NotOnOrder {
            order_id: input.order_id,
            book_id: input.book_id,
        })
}

/// File a cancellation for copies on an order that has not shipped.
///
/// # Errors
///
/// Returns a validation error, `AfterSaleError::NotOnOrder`,
/// `AfterSaleError::NotCancellable`, `AfterSaleError::TooMany`, or a
/// repository error.
#[instrument(skip_all, fields(%user_id, order_id = %input.order_id, book_id = %input.book_id))]
pub async fn request_cancellation(
    pool: &PgPool,
    user_id: UserId,
    input: RequestInput<'_>,
) -> Result<CancellationId, AfterSaleError> {
    let input = input.normalized()?;
    let line = ordered_line(pool, user_id, &input).await?;
    if !line.status.is_cancellable() {
        return Err(AfterSaleError::NotCancellable {
            order_id: input.order_id,
            status: line.status,
        });
    }

    let repo = CancellationRepository::new(pool);
    let already = repo.requested_quantity(input.order_id, input.book_id).await?;
    check_remaining(input.quantity, line.quantity, already)?;

    let id = repo
        .create(NewCancellation {
            order_id: input.order_id,
            book_id: input.book_id,
            quantity: input.quantity,
            reason: input.reason,
            other_reason: input.other_reason,
        })
        .await?;
    tracing::info!(cancellation_id = %id, "cancellation requested");
    Ok(id)
}

/// File a return for delivered copies.
///
/// # Errors
///
/// Returns a validation error, `AfterSaleError::NotOnOrder`,
/// `AfterSaleError::NotReturnable`, `AfterSaleError::ReturnWindowClosed`,
/// `AfterSaleError::TooMany`, or a repository error.
#[instrument(skip_all, fields(%user_id, order_id = %input.order_id, book_id = %input.book_id))]
pub async fn request_return(
    pool: &PgPool,
    user_id: UserId,
    input: RequestInput<'_>,
) -> Result<ReturnId, AfterSaleError> {
    let input = input.normalized()?;
    let line = ordered_line(pool, user_id, &input).await?;
    if line.status != DeliveryStatus::Delivered {
        return Err(AfterSaleError::NotReturnable {
            order_id: input.order_id,
            status: line.status,
        });
    }
    if !within_return_window(line.ordered_at, Utc::now()) {
        return Err(AfterSaleError::ReturnWindowClosed(input.order_id));
    }

    let repo = ReturnRepository::new(pool);
    let already = repo.requested_quantity(input.order_id, input.book_id).await?;
    check_remaining(input.quantity, line.quantity, already)?;

    let id = repo
        .create(NewReturn {
            order_id: input.order_id,
            book_id: input.book_id,
            quantity: input.quantity,
            item_price: line.item_price,
            reason: input.reason,
            other_reason: input.other_reason,
        })
        .await?;
    tracing::info!(return_id = %id, "return requested");
    Ok(id)
}

/// Cancellation requests for the sales dashboard.
///
/// # Errors
///
/// Returns `AfterSaleError::Repository` if the read fails.
pub async fn cancellations(
    pool: &PgPool,
    status: Option<RequestStatus>,
) -> Result<Vec<CancellationRequest>, AfterSaleError> {
    Ok(CancellationRepository::new(pool).list(status).await?)
}

/// Return requests for the sales dashboard.
///
/// # Errors
///
/// Returns `AfterSaleError::Repository` if the read fails.
pub async fn returns(pool: &PgPool, status: Option<RequestStatus>) -> Result<Vec<ReturnRequest>, AfterSaleError> {
    Ok(ReturnRepository::new(pool).list(status).await?)
}

/// Approve a cancellation, restocking its copies and stopping the delivery.
///
/// # Errors
///
/// Returns `AfterSaleError::CancellationNotFound`, `AfterSaleError::Conflict`
/// if it was already decided or the order shipped, or a repository error.
#[instrument(skip(pool))]
pub async fn approve_cancellation(pool: &PgPool, id: CancellationId) -> Result<(), AfterSaleError> {
    CancellationRepository::new(pool)
        .approve(id, Utc::now())
        .await
        .map_err(|e| decision_error(e, AfterSaleError::CancellationNotFound(id)))
}

/// Reject a cancellation.
///
/// # Errors
///
/// Returns `AfterSaleError::CancellationNotFound`, `AfterSaleError::Conflict`
/// if it was already decided, or a repository error.
#[instrument(skip(pool))]
pub async fn reject_cancellation(pool: &PgPool, id: CancellationId) -> Result<(), AfterSaleError> {
    CancellationRepository::new(pool)
        .reject(id)
        .await
        .map_err(|e| decision_error(e, AfterSaleError::CancellationNotFound(id)))
}

/// Approve a return, restocking its copies. Returns the refund owed.
///
/// # Errors
///
/// Returns `AfterSaleError::ReturnNotFound`, `AfterSaleError::Conflict` if it
/// was already decided, or a repository error.
#[instrument(skip(pool))]
pub async fn approve_return(pool: &PgPool, id: ReturnId) -> Result<Price, AfterSaleError> {
    let refund = ReturnRepository::new(pool)
        .approve(id)
        .await
        .map_err(|e| decision_error(e, AfterSaleError::ReturnNotFound(id)))?;
    tracing::info!(%refund, "return approved");
    Ok(refund)
}

/// Reject a return.
///
/// # Errors
///
/// Returns `AfterSaleError::ReturnNotFound`, `AfterSaleError::Conflict` if it
/// was already decided, or a repository error.
#[instrument(skip(pool))]
pub async fn reject_return(pool: &PgPool, id: ReturnId) -> Result<(), AfterSaleError> {
    ReturnRepository::new(pool)
        .reject(id)
        .await
        .map_err(|e| decision_error(e, AfterSaleError::ReturnNotFound(id)))
}

fn decision_error(err: RepositoryError, not_found: AfterSaleError) -> AfterSaleError {
    match err {
        RepositoryError::NotFound => not_found,
        RepositoryError::Conflict(message) => AfterSaleError::Conflict(message),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).expect("quantity")
    }

    fn input<'r>(reason: &'r str, other: Option<&'r str>) -> RequestInput<'r> {
        RequestInput {
            order_id: OrderId::new(1),
            book_id: BookId::new(2),
            quantity: qty(1),
            reason,
            other_reason: other,
        }
    }

    #[test]
    fn test_reasons_are_trimmed_and_required() {
        let normalized = input("  damaged ", Some("   ")).normalized().expect("valid");
        assert_eq!(normalized.reason, "damaged");
        assert_eq!(normalized.other_reason, None);

        assert!(matches!(input(" ", None).normalized(), Err(AfterSaleError::MissingReason)));
        let long = "x".repeat(MAX_REASON_LENGTH + 1);
        assert!(matches!(
            input("other", Some(&long)).normalized(),
            Err(AfterSaleError::ReasonTooLong)
        ));
    }

    #[test]
    fn test_requests_cannot_exceed_ordered_copies() {
        assert!(check_remaining(qty(2), qty(3), 1).is_ok());
        assert!(matches!(
            check_remaining(qty(2), qty(3), 2),
            Err(AfterSaleError::TooMany { requested: 2, remaining: 1 })
        ));
        assert!(matches!(
            check_remaining(qty(1), qty(1), 4),
            Err(AfterSaleError::TooMany { remaining: 0, .. })
        ));
    }

    #[test]
    fn test_return_window() {
        let ordered = Utc::now() - Duration::days(RETURN_WINDOW_DAYS);
        assert!(within_return_window(ordered, ordered + Duration::days(RETURN_WINDOW_DAYS)));
        assert!(!within_return_window(
            ordered,
            ordered + Duration::days(RETURN_WINDOW_DAYS) + Duration::seconds(1)
        ));
    }

    #[test]
    fn test_decision_errors_keep_their_kind() {
        let err = decision_error(RepositoryError::NotFound, AfterSaleError::ReturnNotFound(ReturnId::new(3)));
        assert!(matches!(err, AfterSaleError::ReturnNotFound(id) if id == ReturnId::new(3)));

        let err = decision_error(
            RepositoryError::Conflict("return 3 is already approved".into()),
            AfterSaleError::ReturnNotFound(ReturnId::new(3)),
        );
        assert_eq!(err.to_string(), "return 3 is already approved");
    }
}
