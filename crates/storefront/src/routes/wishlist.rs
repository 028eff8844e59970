//! Wishlist route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bookstore_core::BookId;

use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::models::WishlistItemView;
use crate::services::wishlist;
use crate::state::AppState;

/// Add or remove request body.
#[derive(Debug, Deserialize)]
pub struct WishlistRequest {
    pub book_id: BookId,
}

/// Display the wishlist.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Json<Vec<WishlistItemView>>> {
    let items = match user {
        Some(user) => wishlist::wishlist(state.catalog(), user.id).await?,
        None => wishlist::local_wishlist(&session, state.catalog()).await?,
    };
    Ok(Json(items))
}

/// Add a book to the wishlist.
#[instrument(skip(state, user, session))]
pub async fn add(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(request): Json<WishlistRequest>,
) -> Result<Json<Vec<WishlistItemView>>> {
    let items = match user {
        Some(user) => wishlist::add_to_wishlist(state.catalog(), user.id, request.book_id).await?,
        None => {
            wishlist::add_to_local_wishlist(&session, state.catalog(), request.book_id).await?
        }
    };
    Ok(Json(items))
}

/// Remove a book from the wishlist.
#[instrument(skip(state, user, session))]
pub async fn remove(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(request): Json<WishlistRequest>,
) -> Result<Json<Vec<WishlistItemView>>> {
    let items = match user {
        Some(user) => {
            wishlist::remove_from_wishlist(state.catalog(), user.id, request.book_id).await?
        }
        None => {
            wishlist::remove_from_local_wishlist(&session, state.catalog(), request.book_id)
                .await?
        }
    };
    Ok(Json(items))
}
