//! Catalog types.

use serde::Serialize;

use bookstore_core::{BookId, Price};

/// A book with its author and genre names resolved.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub price: Price,
    pub stock: i32,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
}

/// The fields a listing card needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct BookSummary {
    pub id: BookId,
    pub title: String,
    pub price: Price,
    pub image_url: Option<String>,
}

/// A book with its average review rating.
#[derive(Debug, Clone, Serialize)]
pub struct RatedBook {
    #[serde(flatten)]
    pub book: BookSummary,
    /// Mean rating, `0.0` when the book has no reviews.
    pub avg_rating: f64,
    pub review_count: u32,
}

/// A book with the number of order lines it appears on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BestSeller {
    #[serde(flatten)]
    pub book: BookSummary,
    pub order_count: u64,
}
