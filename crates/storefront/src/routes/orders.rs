//! Checkout, order history and after-sale requests.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bookstore_core::{BookId, CancellationId, OrderId, Quantity, ReturnId};

use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::services::after_sale::{self, RequestInput};
use crate::services::orders;
use crate::state::AppState;

/// Checkout body.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub shipping_address: String,
}

/// Cancellation or return body.
#[derive(Debug, Deserialize)]
pub struct AfterSaleRequest {
    pub book_id: BookId,
    pub quantity: Quantity,
    pub reason: String,
    pub other_reason: Option<String>,
}

impl AfterSaleRequest {
    fn input(&self, order_id: OrderId) -> RequestInput<'_> {
        RequestInput {
            order_id,
            book_id: self.book_id,
            quantity: self.quantity,
            reason: &self.reason,
            other_reason: self.other_reason.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CancellationCreated {
    pub id: CancellationId,
}

#[derive(Debug, Serialize)]
pub struct ReturnCreated {
    pub id: ReturnId,
}

/// Turn the account cart into an order.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = orders::place_order(state.pool(), user.id, &request.shipping_address).await?;
    state.reports().invalidate_all();

    let order_id = order.id.to_string();
    add_breadcrumb("checkout", "Order placed", &[("order_id", order_id.as_str())]);
    Ok((StatusCode::CREATED, Json(order)))
}

/// The user's orders, newest first.
pub async fn index(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Result<Json<Vec<Order>>> {
    Ok(Json(orders::list_orders(state.pool(), user.id).await?))
}

/// One order with its lines and delivery status.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(orders::get_order(state.pool(), user.id, order_id).await?))
}

/// Ask to cancel copies of an order that has not shipped.
#[instrument(skip(state, user, request), fields(user_id = %user.id))]
pub async fn request_cancellation(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<OrderId>,
    Json(request): Json<AfterSaleRequest>,
) -> Result<(StatusCode, Json<CancellationCreated>)> {
    let id = after_sale::request_cancellation(state.pool(), user.id, request.input(order_id)).await?;
    Ok((StatusCode::CREATED, Json(CancellationCreated { id })))
}

/// Ask to return delivered copies.
#[instrument(skip(state, user, request), fields(user_id = %user.id))]
pub async fn request_return(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<OrderId>,
    Json(request): Json<AfterSaleRequest>,
) -> Result<(StatusCode, Json<ReturnCreated>)> {
    let id = after_sale::request_return(state.pool(), user.id, request.input(order_id)).await?;
    Ok((StatusCode::CREATED, Json(ReturnCreated { id })))
}
