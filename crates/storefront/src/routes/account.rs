//! Account handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::{RequireAuth, clear_current_user};
use bookstore_core::UserId;

use crate::models::CurrentUser;
use crate::services::{
    CartReconciliation, WishlistReconciliation, reconcile_cart, reconcile_wishlist,
};
use crate::state::AppState;

/// Result of merging the session's cart and wishlist into the account.
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub cart: CartReconciliation,
    pub wishlist: WishlistReconciliation,
}

/// The signed-in user.
pub async fn me(RequireAuth(user): RequireAuth) -> Json<CurrentUser> {
    Json(user)
}

/// Merge the anonymous cart and wishlist into the signed-in user's account.
///
/// Called once by the client right after sign-in. Calling it again is
/// harmless: the session copies are cleared by the first call.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn sync(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Json<SyncResponse>> {
    Ok(Json(merge_session(&state, &session, user.id).await?))
}

/// Move the session's cart and wishlist into `user_id`'s account.
pub(crate) async fn merge_session(
    state: &AppState,
    session: &Session,
    user_id: UserId,
) -> Result<SyncResponse> {
    let cart = reconcile_cart(session, state.catalog(), user_id).await?;
    let wishlist = reconcile_wishlist(session, state.catalog(), user_id).await?;

    let merged = cart.merged.to_string();
    let added = wishlist.added.to_string();
    add_breadcrumb(
        "account",
        "Synced session cart and wishlist",
        &[("cart_merged", merged.as_str()), ("wishlist_added", added.as_str())],
    );

    Ok(SyncResponse { cart, wishlist })
}

/// Sign out. The durable cart stays with the account.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}
