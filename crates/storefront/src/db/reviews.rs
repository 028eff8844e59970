//! Review repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bookstore_core::{BookId, ReviewId, ReviewStatus, UserId};

use super::RepositoryError;
use crate::models::{PendingReview, Review};

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    book_id: BookId,
    user_id: UserId,
    reviewer: String,
    rating: i16,
    comment: Option<String>,
    approved: bool,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            book_id: row.book_id,
            user_id: row.user_id,
            reviewer: row.reviewer,
            rating: row.rating,
            comment: row.comment,
            status: ReviewStatus::from(row.approved),
            created_at: row.created_at,
        }
    }
}

/// Filters for the moderation queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingFilter {
    pub book_id: Option<BookId>,
    pub rating: Option<i16>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for PendingFilter {
    fn default() -> Self {
        Self {
            book_id: None,
            rating: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new review awaiting moderation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if the book or user is missing.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        book_id: BookId,
        user_id: UserId,
        rating: i16,
        comment: Option<&str>,
    ) -> Result<ReviewId, RepositoryError> {
        let id = sqlx::query_scalar::<_, ReviewId>(
            r"
            INSERT INTO reviews (book_id, user_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(book_id)
        .bind(user_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "review"))?;
        Ok(id)
    }

    /// Mark a review approved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn approve(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE reviews SET approved = TRUE WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Approved reviews for a book, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn approved_for_book(&self, book_id: BookId) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r"
            SELECT r.id, r.book_id, r.user_id, u.full_name AS reviewer,
                   r.rating, r.comment, r.approved, r.created_at
            FROM reviews r
            JOIN users u ON u.id = r.user_id
            WHERE r.book_id = $1 AND r.approved
            ORDER BY r.created_at DESC, r.id DESC
            ",
        )
        .bind(book_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Review::from).collect())
    }

    /// The moderation queue, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn pending(&self, filter: PendingFilter) -> Result<Vec<PendingReview>, RepositoryError> {
        let reviews = sqlx::query_as::<_, PendingReview>(
            r"
            SELECT r.id, r.book_id, b.title AS book_title, b.image_url AS book_image_url,
                   r.user_id, u.full_name AS reviewer, r.rating, r.comment, r.created_at
            FROM reviews r
            JOIN books b ON b.id = r.book_id
            JOIN users u ON u.id = r.user_id
            WHERE NOT r.approved
              AND ($1::INTEGER IS NULL OR r.book_id = $1)
              AND ($2::SMALLINT IS NULL OR r.rating = $2)
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT $3 OFFSET $4
            ",
        )
        .bind(filter.book_id)
        .bind(filter.rating)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(self.pool)
        .await?;
        Ok(reviews)
    }

    /// `(book_id, rating)` for every review, approved or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all_ratings(&self) -> Result<Vec<(BookId, i16)>, RepositoryError> {
        let ratings = sqlx::query_as::<_, (BookId, i16)>("SELECT book_id, rating FROM reviews")
            .fetch_all(self.pool)
            .await?;
        Ok(ratings)
    }
}
