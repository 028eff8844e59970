//! Review submission and moderation.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use bookstore_core::{BookId, ReviewId, UserId};

use crate::db::reviews::PendingFilter;
use crate::db::{RepositoryError, ReviewRepository};
use crate::models::PendingReview;

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Errors from review operations.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("rating must be between {MIN_RATING} and {MAX_RATING} (got {0})")]
    InvalidRating(i16),

    #[error("book {0} not found")]
    BookNotFound(BookId),

    #[error("review {0} not found")]
    NotFound(ReviewId),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Check a rating is on the 1 to 5 scale.
///
/// # Errors
///
/// Returns `ReviewError::InvalidRating` otherwise.
pub fn validate_rating(rating: i16) -> Result<i16, ReviewError> {
    if rating < MIN_RATING || rating > MAX_RATING {
        return Err(ReviewError::InvalidRating(rating));
    }
    Ok(rating)
}

/// Blank comments are stored as no comment.
fn normalize_comment(comment: Option<&str>) -> Option<&str> {
    comment.map(str::trim).filter(|c| !c.is_empty())
}

/// Store a review for moderation.
///
/// # Errors
///
/// Returns `ReviewError::InvalidRating`, `ReviewError::BookNotFound`, or a
/// repository error.
#[instrument(skip_all, fields(%user_id, %book_id, rating = rating))]
pub async fn submit_review(
    pool: &PgPool,
    user_id: UserId,
    book_id: BookId,
    rating: i16,
    comment: Option<&str>,
) -> Result<ReviewId, ReviewError> {
    let rating = validate_rating(rating)?;
    let id = ReviewRepository::new(pool)
        .create(book_id, user_id, rating, normalize_comment(comment))
        .await
        .map_err(|e| match e {
            RepositoryError::ForeignKey(_) => ReviewError::BookNotFound(book_id),
            other => other.into(),
        })?;
    tracing::info!(review_id = %id, "review submitted");
    Ok(id)
}

/// Publish a pending review.
///
/// # Errors
///
/// Returns `ReviewError::NotFound` if the review doesn't exist.
#[instrument(skip(pool))]
pub async fn approve_review(pool: &PgPool, id: ReviewId) -> Result<(), ReviewError> {
    ReviewRepository::new(pool)
        .approve(id)
        .await
        .map_err(|e| not_found(e, id))
}

/// Reject a review. Rejected reviews are deleted.
///
/// # Errors
///
/// Returns `ReviewError::NotFound` if the review doesn't exist.
#[instrument(skip(pool))]
pub async fn reject_review(pool: &PgPool, id: ReviewId) -> Result<(), ReviewError> {
    ReviewRepository::new(pool)
        .delete(id)
        .await
        .map_err(|e| not_found(e, id))
}

/// The moderation queue. Page size is clamped to `1..=MAX_PAGE_SIZE`.
///
/// # Errors
///
/// Returns `ReviewError::InvalidRating` for a rating filter off the scale,
/// or a repository error.
pub async fn pending_reviews(
    pool: &PgPool,
    mut filter: PendingFilter,
) -> Result<Vec<PendingReview>, ReviewError> {
    if let Some(rating) = filter.rating {
        validate_rating(rating)?;
    }
    filter.limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
    filter.offset = filter.offset.max(0);
    Ok(ReviewRepository::new(pool).pending(filter).await?)
}

fn not_found(err: RepositoryError, id: ReviewId) -> ReviewError {
    match err {
        RepositoryError::NotFound => ReviewError::NotFound(id),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rating_bounds() {
        assert!(validate_rating(0).is_err());
        assert_eq!(validate_rating(1).ok(), Some(1));
        assert_eq!(validate_rating(5).ok(), Some(5));
        assert!(matches!(validate_rating(6), Err(ReviewError::InvalidRating(6))));
    }

    #[test]
    fn test_normalize_comment() {
        assert_eq!(normalize_comment(Some("  great read ")), Some("great read"));
        assert_eq!(normalize_comment(Some("   ")), None);
        assert_eq!(normalize_comment(None), None);
    }
}
