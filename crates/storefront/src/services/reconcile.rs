//! Merging an anonymous visitor's cart and wishlist into their account.
//!
//! Runs once after sign-in. Local lines are folded, in order, into the
//! remote cart: a book already in the remote cart has its quantity summed
//! (remote price kept), a new book is inserted with the local quantity and
//! price. The local copy is cleared once the loop has run.
//!
//! Reads are all-or-nothing. If the remote cart or its lines cannot be read,
//! nothing is written and local data is kept. Writes are per line: a
//! rejected insert or update becomes a [`LineFailure`] and the loop moves on.
//!
//! There is no locking. Two merges racing for the same user can both see the
//! same remote quantities and double count.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use bookstore_core::{BookId, CartId, CartLine, Quantity, QuantityError, UserId, WishlistItem};

use super::catalog::CatalogStore;
use super::local_store::{LocalCart, LocalStore, LocalStoreError, LocalWishlist};
use crate::db::RepositoryError;
use crate::models::{CartItemView, WishlistItemView};

/// Errors that abort a merge.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("local store: {0}")]
    Local(#[from] LocalStoreError),

    #[error("catalog store: {0}")]
    Remote(#[from] RepositoryError),
}

/// A single line the merge could not write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineFailure {
    pub book_id: BookId,
    pub reason: String,
}

/// Outcome of a cart merge.
#[derive(Debug, Clone, Serialize)]
pub struct CartReconciliation {
    pub cart_id: CartId,
    /// Remote cart as re-read after the merge.
    pub items: Vec<CartItemView>,
    /// Local lines written remotely.
    pub merged: usize,
    pub failures: Vec<LineFailure>,
}

/// Outcome of a wishlist merge.
#[derive(Debug, Clone, Serialize)]
pub struct WishlistReconciliation {
    pub items: Vec<WishlistItemView>,
    /// Entries inserted remotely.
    pub added: usize,
    /// Local entries already on the remote wishlist.
    pub skipped: usize,
    pub failures: Vec<LineFailure>,
}

#[derive(Debug, Error)]
enum LineError {
    #[error(transparent)]
    Quantity(#[from] QuantityError),
    #[error(transparent)]
    Remote(#[from] RepositoryError),
}

/// Merge the local cart into the user's remote cart.
///
/// # Errors
///
/// Returns `ReconcileError` if the local store fails, or if the remote cart
/// cannot be resolved or read. Per-line write failures are reported in
/// [`CartReconciliation::failures`] instead.
#[instrument(skip_all, fields(%user_id))]
pub async fn reconcile_cart<L, C>(
    local: &L,
    remote: &C,
    user_id: UserId,
) -> Result<CartReconciliation, ReconcileError>
where
    L: LocalStore,
    C: CatalogStore,
{
    let local_cart = LocalCart::new(local);
    let lines = local_cart.items().await?;

    let cart_id = remote.get_or_create_cart(user_id).await?;
    let mut remote_items: HashMap<BookId, Quantity> = remote
        .cart_lines(cart_id)
        .await?
        .into_iter()
        .map(|line| (line.book_id, line.quantity))
        .collect();

    let mut merged = 0;
    let mut failures = Vec::new();
    for line in &lines {
        match merge_line(remote, cart_id, &mut remote_items, line).await {
            Ok(()) => merged += 1,
            Err(e) => {
                tracing::warn!(book_id = %line.book_id, error = %e, "cart line not merged");
                failures.push(LineFailure {
                    book_id: line.book_id,
                    reason: e.to_string(),
                });
            }
        }
    }

    local_cart.clear().await?;

    let items = remote.cart_view(cart_id).await?;
    tracing::info!(
        local_lines = lines.len(),
        merged,
        failed = failures.len(),
        "cart reconciled"
    );

    Ok(CartReconciliation {
        cart_id,
        items,
        merged,
        failures,
    })
}

/// Write one local line and record the new remote quantity.
async fn merge_line<C: CatalogStore>(
    remote: &C,
    cart_id: CartId,
    remote_items: &mut HashMap<BookId, Quantity>,
    line: &CartLine,
) -> Result<(), LineError> {
    let quantity = match remote_items.get(&line.book_id) {
        Some(existing) => {
            let summed = existing.checked_add(line.quantity)?;
            remote
                .update_cart_quantity(cart_id, line.book_id, summed)
                .await?;
            summed
        }
        None => {
            remote.insert_cart_line(cart_id, *line).await?;
            line.quantity
        }
    };
    remote_items.insert(line.book_id, quantity);
    Ok(())
}

/// Merge the local wishlist into the user's remote wishlist.
///
/// # Errors
///
/// Returns `ReconcileError` if the local store fails or the remote wishlist
/// cannot be read. Per-entry insert failures are reported in
/// [`WishlistReconciliation::failures`] instead.
#[instrument(skip_all, fields(%user_id))]
pub async fn reconcile_wishlist<L, C>(
    local: &L,
    remote: &C,
    user_id: UserId,
) -> Result<WishlistReconciliation, ReconcileError>
where
    L: LocalStore,
    C: CatalogStore,
{
    let local_wishlist = LocalWishlist::new(local);
    let entries = local_wishlist.items().await?;

    let mut listed: HashSet<BookId> = remote
        .wishlist_book_ids(user_id)
        .await?
        .into_iter()
        .collect();

    let mut added = 0;
    let mut skipped = 0;
    let mut failures = Vec::new();
    for WishlistItem { book_id } in entries {
        if listed.contains(&book_id) {
            skipped += 1;
            continue;
        }
        match remote.insert_wishlist_entry(user_id, book_id).await {
            Ok(()) => {
                listed.insert(book_id);
                added += 1;
            }
            Err(e) => {
                tracing::warn!(%book_id, error = %e, "wishlist entry not merged");
                failures.push(LineFailure {
                    book_id,
                    reason: e.to_string(),
                });
            }
        }
    }

    local_wishlist.clear().await?;

    let items = remote.wishlist_view(user_id).await?;
    tracing::info!(added, skipped, failed = failures.len(), "wishlist reconciled");

    Ok(WishlistReconciliation {
        items,
        added,
        skipped,
        failures,
    })
}
