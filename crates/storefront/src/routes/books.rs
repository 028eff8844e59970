//! Catalog route handlers: listing, detail, reports, reviews.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use bookstore_core::BookId;

use crate::db::{BookRepository, ReviewRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{BestSeller, Book, BookDiscount, BookSummary, RatedBook, Review};
use crate::services::{discounts, reviews};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Listing pagination.
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// A book with its published reviews and current discount.
#[derive(Debug, Serialize)]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: Book,
    pub reviews: Vec<Review>,
    pub discount: Option<BookDiscount>,
}

/// Review submission body.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: i16,
    pub comment: Option<String>,
}

/// Paginated catalog listing.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<BookSummary>>> {
    let books = BookRepository::new(state.pool())
        .list(page.limit(), page.offset())
        .await?;
    Ok(Json(books))
}

/// Book detail.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(book_id): Path<BookId>,
) -> Result<Json<BookDetail>> {
    let book = BookRepository::new(state.pool())
        .get(book_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("book {book_id}")))?;
    let reviews = ReviewRepository::new(state.pool())
        .approved_for_book(book_id)
        .await?;
    let discount = discounts::current_discount(state.pool(), book_id).await?;

    Ok(Json(BookDetail {
        book,
        reviews,
        discount,
    }))
}

/// Books ranked by average rating.
pub async fn top_rated(State(state): State<AppState>) -> Result<Json<Arc<Vec<RatedBook>>>> {
    Ok(Json(state.reports().top_rated().await?))
}

/// Most-ordered books.
pub async fn best_sellers(State(state): State<AppState>) -> Result<Json<Arc<Vec<BestSeller>>>> {
    Ok(Json(state.reports().best_sellers().await?))
}

/// Newest additions to the catalog.
pub async fn new_books(State(state): State<AppState>) -> Result<Json<Arc<Vec<BookSummary>>>> {
    Ok(Json(state.reports().new_books().await?))
}

/// The discount in effect for a book, or `null`.
pub async fn discount(
    State(state): State<AppState>,
    Path(book_id): Path<BookId>,
) -> Result<Json<Option<BookDiscount>>> {
    Ok(Json(discounts::current_discount(state.pool(), book_id).await?))
}

/// Submit a review. It stays hidden until a product manager approves it.
#[instrument(skip(state, user, request), fields(user_id = %user.id))]
pub async fn submit_review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(book_id): Path<BookId>,
    Json(request): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let id = reviews::submit_review(
        state.pool(),
        user.id,
        book_id,
        request.rating,
        request.comment.as_deref(),
    )
    .await?;
    // Ratings count toward top rated as soon as they are submitted.
    state.reports().invalidate_all();

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id, "status": "pending" })),
    ))
}
