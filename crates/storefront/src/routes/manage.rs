//! Management handlers.
//!
//! Sales managers run discounts, cancellations and returns; product managers
//! run review moderation, stock and deliveries.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use bookstore_core::{
    BookId, CancellationId, DeliveryStatus, DiscountRate, OrderId, Price, RequestStatus, ReturnId,
    ReviewId,
};

use crate::db::inventory::StockFilter;
use crate::db::reviews::PendingFilter;
use crate::error::{AppError, Result};
use crate::middleware::{RequireProductManager, RequireSalesManager};
use crate::models::{
    BookDiscount, CancellationRequest, Delivery, Page, PendingReview, ReturnRequest, StockLevel,
};
use crate::services::{after_sale, deliveries, discounts, inventory, reviews};
use crate::state::AppState;

/// Discount creation body. `rate` is a percentage.
#[derive(Debug, Deserialize)]
pub struct ApplyDiscountRequest {
    pub book_id: BookId,
    pub name: String,
    pub rate: Decimal,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Moderation queue filters.
#[derive(Debug, Default, Deserialize)]
pub struct PendingQuery {
    pub book_id: Option<BookId>,
    pub rating: Option<i16>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<PendingQuery> for PendingFilter {
    fn from(query: PendingQuery) -> Self {
        let defaults = Self::default();
        Self {
            book_id: query.book_id,
            rating: query.rating,
            limit: query.limit.unwrap_or(defaults.limit),
            offset: query.offset.unwrap_or(defaults.offset),
        }
    }
}

/// Stock dashboard filters.
#[derive(Debug, Default, Deserialize)]
pub struct StockQuery {
    pub search: Option<String>,
    #[serde(default)]
    pub out_of_stock: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<StockQuery> for StockFilter {
    fn from(query: StockQuery) -> Self {
        let defaults = Self::default();
        Self {
            search: query.search,
            out_of_stock_only: query.out_of_stock,
            limit: query.limit.unwrap_or(defaults.limit),
            offset: query.offset.unwrap_or(defaults.offset),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetStockRequest {
    pub stock: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DeliveryUpdate {
    pub status: DeliveryStatus,
}

/// Request queue filter; all statuses when absent.
#[derive(Debug, Default, Deserialize)]
pub struct RequestQuery {
    pub status: Option<RequestStatus>,
}

/// Replace a book's discount.
#[instrument(skip(state, manager, request), fields(manager_id = %manager.id, book_id = %request.book_id))]
pub async fn apply_discount(
    State(state): State<AppState>,
    RequireSalesManager(manager): RequireSalesManager,
    Json(request): Json<ApplyDiscountRequest>,
) -> Result<(StatusCode, Json<BookDiscount>)> {
    let rate = DiscountRate::new(request.rate).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let applied = discounts::apply_discount(
        state.pool(),
        request.book_id,
        &request.name,
        rate,
        request.ends_at,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(applied)))
}

/// End every open discount on a book.
#[instrument(skip(state, manager), fields(manager_id = %manager.id))]
pub async fn end_discounts(
    State(state): State<AppState>,
    RequireSalesManager(manager): RequireSalesManager,
    Path(book_id): Path<BookId>,
) -> Result<Json<Value>> {
    let ended = discounts::end_all_discounts(state.pool(), book_id).await?;
    Ok(Json(json!({ "book_id": book_id, "ended": ended })))
}

/// Reviews awaiting moderation.
#[instrument(skip(state, _manager))]
pub async fn pending_reviews(
    State(state): State<AppState>,
    RequireProductManager(_manager): RequireProductManager,
    Query(query): Query<PendingQuery>,
) -> Result<Json<Vec<PendingReview>>> {
    Ok(Json(reviews::pending_reviews(state.pool(), query.into()).await?))
}

/// Publish a review.
#[instrument(skip(state, manager), fields(manager_id = %manager.id))]
pub async fn approve_review(
    State(state): State<AppState>,
    RequireProductManager(manager): RequireProductManager,
    Path(review_id): Path<ReviewId>,
) -> Result<StatusCode> {
    reviews::approve_review(state.pool(), review_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reject (delete) a review.
#[instrument(skip(state, manager), fields(manager_id = %manager.id))]
pub async fn reject_review(
    State(state): State<AppState>,
    RequireProductManager(manager): RequireProductManager,
    Path(review_id): Path<ReviewId>,
) -> Result<StatusCode> {
    reviews::reject_review(state.pool(), review_id).await?;
    state.reports().invalidate_all();
    Ok(StatusCode::NO_CONTENT)
}

/// Shelf counts, filtered and paged.
pub async fn stock_levels(
    State(state): State<AppState>,
    RequireProductManager(_manager): RequireProductManager,
    Query(query): Query<StockQuery>,
) -> Result<Json<Page<StockLevel>>> {
    Ok(Json(inventory::stock_levels(state.pool(), query.into()).await?))
}

/// Set a book's shelf count.
#[instrument(skip(state, manager, request), fields(manager_id = %manager.id))]
pub async fn set_stock(
    State(state): State<AppState>,
    RequireProductManager(manager): RequireProductManager,
    Path(book_id): Path<BookId>,
    Json(request): Json<SetStockRequest>,
) -> Result<Json<StockLevel>> {
    Ok(Json(inventory::set_stock(state.pool(), book_id, request.stock).await?))
}

/// Deliveries, most recently updated first.
pub async fn deliveries(
    State(state): State<AppState>,
    RequireProductManager(_manager): RequireProductManager,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Delivery>>> {
    let page = deliveries::list_deliveries(
        state.pool(),
        query.limit.unwrap_or(deliveries::DEFAULT_PAGE_SIZE),
        query.offset.unwrap_or(0),
    )
    .await?;
    Ok(Json(page))
}

/// Move an order's delivery forward.
#[instrument(skip(state, manager, request), fields(manager_id = %manager.id, to = %request.status))]
pub async fn update_delivery(
    State(state): State<AppState>,
    RequireProductManager(manager): RequireProductManager,
    Path(order_id): Path<OrderId>,
    Json(request): Json<DeliveryUpdate>,
) -> Result<Json<Value>> {
    let status = deliveries::update_delivery_status(state.pool(), order_id, request.status).await?;
    Ok(Json(json!({ "order_id": order_id, "status": status })))
}

/// Cancellation requests.
pub async fn cancellations(
    State(state): State<AppState>,
    RequireSalesManager(_manager): RequireSalesManager,
    Query(query): Query<RequestQuery>,
) -> Result<Json<Vec<CancellationRequest>>> {
    Ok(Json(after_sale::cancellations(state.pool(), query.status).await?))
}

/// Approve a cancellation; its copies go back on the shelf.
#[instrument(skip(state, manager), fields(manager_id = %manager.id))]
pub async fn approve_cancellation(
    State(state): State<AppState>,
    RequireSalesManager(manager): RequireSalesManager,
    Path(id): Path<CancellationId>,
) -> Result<StatusCode> {
    after_sale::approve_cancellation(state.pool(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, manager), fields(manager_id = %manager.id))]
pub async fn reject_cancellation(
    State(state): State<AppState>,
    RequireSalesManager(manager): RequireSalesManager,
    Path(id): Path<CancellationId>,
) -> Result<StatusCode> {
    after_sale::reject_cancellation(state.pool(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Return requests.
pub async fn returns(
    State(state): State<AppState>,
    RequireSalesManager(_manager): RequireSalesManager,
    Query(query): Query<RequestQuery>,
) -> Result<Json<Vec<ReturnRequest>>> {
    Ok(Json(after_sale::returns(state.pool(), query.status).await?))
}

/// Refund body for an approved return.
#[derive(Debug, Serialize)]
pub struct Refund {
    pub return_id: ReturnId,
    pub refund: Price,
}

/// Approve a return and report the refund owed.
#[instrument(skip(state, manager), fields(manager_id = %manager.id))]
pub async fn approve_return(
    State(state): State<AppState>,
    RequireSalesManager(manager): RequireSalesManager,
    Path(id): Path<ReturnId>,
) -> Result<Json<Refund>> {
    let refund = after_sale::approve_return(state.pool(), id).await?;
    Ok(Json(Refund { return_id: id, refund }))
}

#[instrument(skip(state, manager), fields(manager_id = %manager.id))]
pub async fn reject_return(
    State(state): State<AppState>,
    RequireSalesManager(manager): RequireSalesManager,
    Path(id): Path<ReturnId>,
) -> Result<StatusCode> {
    after_sale::reject_return(state.pool(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
