//! Review types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bookstore_core::{BookId, ReviewId, ReviewStatus, UserId};

/// A review with the reviewer's display name.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub book_id: BookId,
    pub user_id: UserId,
    pub reviewer: String,
    pub rating: i16,
    pub comment: Option<String>,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

/// A review in the moderation queue, with enough context to judge it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PendingReview {
    pub id: ReviewId,
    pub book_id: BookId,
    pub book_title: String,
    pub book_image_url: Option<String>,
    pub user_id: UserId,
    pub reviewer: String,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}
