//! Cart route handlers.
//!
//! Signed-in users work against their durable cart; anonymous visitors
//! against the copy in their session, which is merged on `/account/sync`.

use axum::{Json, extract::State};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bookstore_core::{BookId, Quantity};

use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::models::CartSummary;
use crate::services::cart::{self, CartError};
use crate::state::AppState;

const fn default_quantity() -> i64 {
    1
}

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub book_id: BookId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

/// Update quantity request body.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub book_id: BookId,
    pub quantity: i64,
}

/// Remove from cart request body.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    pub book_id: BookId,
}

/// Display the cart.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Json<CartSummary>> {
    let items = match user {
        Some(user) => cart::cart(state.catalog(), user.id).await?,
        None => cart::local_cart(&session, state.catalog()).await?,
    };
    Ok(Json(items.into()))
}

/// Add a book to the cart.
#[instrument(skip(state, user, session))]
pub async fn add(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<CartSummary>> {
    let quantity = Quantity::new(request.quantity).map_err(CartError::from)?;
    let items = match user {
        Some(user) => cart::add_to_cart(state.catalog(), user.id, request.book_id, quantity).await?,
        None => {
            cart::add_to_local_cart(&session, state.catalog(), request.book_id, quantity).await?
        }
    };
    Ok(Json(items.into()))
}

/// Set a line's quantity. Zero removes the line.
#[instrument(skip(state, user, session))]
pub async fn update(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(request): Json<UpdateCartRequest>,
) -> Result<Json<CartSummary>> {
    let items = match user {
        Some(user) => {
            cart::update_quantity(state.catalog(), user.id, request.book_id, request.quantity)
                .await?
        }
        None => {
            cart::update_local_quantity(
                &session,
                state.catalog(),
                request.book_id,
                request.quantity,
            )
            .await?
        }
    };
    Ok(Json(items.into()))
}

/// Remove a book from the cart.
#[instrument(skip(state, user, session))]
pub async fn remove(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(request): Json<RemoveFromCartRequest>,
) -> Result<Json<CartSummary>> {
    let items = match user {
        Some(user) => cart::remove_from_cart(state.catalog(), user.id, request.book_id).await?,
        None => cart::remove_from_local_cart(&session, state.catalog(), request.book_id).await?,
    };
    Ok(Json(items.into()))
}
