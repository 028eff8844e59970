//! Wishlist operations for signed-in users and anonymous visitors.

use tracing::instrument;

use bookstore_core::{BookId, UserId, WishlistItem};

use super::cart::CartError;
use super::catalog::CatalogStore;
use super::local_store::{LocalStore, LocalWishlist};
use crate::db::RepositoryError;
use crate::models::WishlistItemView;

/// The user's wishlist.
///
/// # Errors
///
/// Returns `CartError::Repository` if the store fails.
pub async fn wishlist<C: CatalogStore>(
    catalog: &C,
    user_id: UserId,
) -> Result<Vec<WishlistItemView>, CartError> {
    Ok(catalog.wishlist_view(user_id).await?)
}

/// Add a book to the user's wishlist. Adding a listed book is a no-op.
///
/// # Errors
///
/// Returns `CartError::BookNotFound` for an unknown book, or a store error.
#[instrument(skip_all, fields(%user_id, %book_id))]
pub async fn add_to_wishlist<C: CatalogStore>(
    catalog: &C,
    user_id: UserId,
    book_id: BookId,
) -> Result<Vec<WishlistItemView>, CartError> {
    if catalog.book(book_id).await?.is_none() {
        return Err(CartError::BookNotFound(book_id));
    }
    let listed = catalog.wishlist_book_ids(user_id).await?;
    if !listed.contains(&book_id) {
        match catalog.insert_wishlist_entry(user_id, book_id).await {
            // Lost a race with another add for the same book.
            Ok(()) | Err(RepositoryError::Conflict(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(catalog.wishlist_view(user_id).await?)
}

/// Remove a book from the user's wishlist.
///
/// # Errors
///
/// Returns `CartError::Repository` if the store fails.
#[instrument(skip_all, fields(%user_id, %book_id))]
pub async fn remove_from_wishlist<C: CatalogStore>(
    catalog: &C,
    user_id: UserId,
    book_id: BookId,
) -> Result<Vec<WishlistItemView>, CartError> {
    catalog.delete_wishlist_entry(user_id, book_id).await?;
    Ok(catalog.wishlist_view(user_id).await?)
}

/// The anonymous wishlist with titles and covers from the catalog.
///
/// Books that have left the catalog show as "Unknown Title".
///
/// # Errors
///
/// Returns `CartError` if either store fails.
pub async fn local_wishlist<L, C>(local: &L, catalog: &C) -> Result<Vec<WishlistItemView>, CartError>
where
    L: LocalStore,
    C: CatalogStore,
{
    let items = LocalWishlist::new(local).items().await?;
    enrich(catalog, items).await
}

/// Add a book to the anonymous wishlist.
///
/// # Errors
///
/// Returns `CartError::BookNotFound` for an unknown book, or a store error.
pub async fn add_to_local_wishlist<L, C>(
    local: &L,
    catalog: &C,
    book_id: BookId,
) -> Result<Vec<WishlistItemView>, CartError>
where
    L: LocalStore,
    C: CatalogStore,
{
    if catalog.book(book_id).await?.is_none() {
        return Err(CartError::BookNotFound(book_id));
    }
    let items = LocalWishlist::new(local).add(book_id).await?;
    enrich(catalog, items).await
}

/// Remove a book from the anonymous wishlist.
///
/// # Errors
///
/// Returns `CartError` if either store fails.
pub async fn remove_from_local_wishlist<L, C>(
    local: &L,
    catalog: &C,
    book_id: BookId,
) -> Result<Vec<WishlistItemView>, CartError>
where
    L: LocalStore,
    C: CatalogStore,
{
    let items = LocalWishlist::new(local).remove(book_id).await?;
    enrich(catalog, items).await
}

async fn enrich<C: CatalogStore>(
    catalog: &C,
    items: Vec<WishlistItem>,
) -> Result<Vec<WishlistItemView>, CartError> {
    let mut views = Vec::with_capacity(items.len());
    for WishlistItem { book_id } in items {
        let view = match catalog.book(book_id).await? {
            Some(book) => WishlistItemView {
                book_id,
                title: book.title,
                image_url: book.image_url,
            },
            None => WishlistItemView::unknown(book_id),
        };
        views.push(view);
    }
    Ok(views)
}
