//! Cart operations for signed-in users (remote cart) and anonymous visitors
//! (local cart).
//!
//! Both paths keep one line per book and sum quantities on repeated adds.
//! The unit price is captured from the catalog when a book is first added.

use thiserror::Error;
use tracing::instrument;

use bookstore_core::{BookId, CartLine, Quantity, QuantityError, UserId};

use super::catalog::CatalogStore;
use super::local_store::{LocalCart, LocalStore, LocalStoreError};
use crate::db::RepositoryError;
use crate::models::{BookSummary, CartItemView};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("book {0} not found")]
    BookNotFound(BookId),

    #[error("book {0} is not in the cart")]
    NotInCart(BookId),

    #[error(transparent)]
    Quantity(#[from] QuantityError),

    #[error(transparent)]
    Local(#[from] LocalStoreError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

async fn require_book<C: CatalogStore>(catalog: &C, book_id: BookId) -> Result<BookSummary, CartError> {
    catalog
        .book(book_id)
        .await?
        .ok_or(CartError::BookNotFound(book_id))
}

// =============================================================================
// Remote cart
// =============================================================================

/// The user's cart.
///
/// # Errors
///
/// Returns `CartError::Repository` if the store fails.
pub async fn cart<C: CatalogStore>(catalog: &C, user_id: UserId) -> Result<Vec<CartItemView>, CartError> {
    let cart_id = catalog.get_or_create_cart(user_id).await?;
    Ok(catalog.cart_view(cart_id).await?)
}

/// Add a book to the user's cart, summing into an existing line.
///
/// # Errors
///
/// Returns `CartError::BookNotFound` for an unknown book,
/// `CartError::Quantity` if the sum overflows, or a store error.
#[instrument(skip_all, fields(%user_id, %book_id, %quantity))]
pub async fn add_to_cart<C: CatalogStore>(
    catalog: &C,
    user_id: UserId,
    book_id: BookId,
    quantity: Quantity,
) -> Result<Vec<CartItemView>, CartError> {
    let book = require_book(catalog, book_id).await?;
    let cart_id = catalog.get_or_create_cart(user_id).await?;

    let existing = catalog
        .cart_lines(cart_id)
        .await?
        .into_iter()
        .find(|line| line.book_id == book_id);

    match existing {
        Some(line) => {
            let summed = line.quantity.checked_add(quantity)?;
            catalog.update_cart_quantity(cart_id, book_id, summed).await?;
        }
        None => {
            catalog
                .insert_cart_line(cart_id, CartLine::new(book_id, quantity, book.price))
                .await?;
        }
    }

    Ok(catalog.cart_view(cart_id).await?)
}

/// Set a line's quantity. Zero or below removes the line.
///
/// # Errors
///
/// Returns `CartError::NotInCart` if the book has no line,
/// `CartError::Quantity` for an out-of-range quantity, or a store error.
#[instrument(skip_all, fields(%user_id, %book_id, quantity = quantity))]
pub async fn update_quantity<C: CatalogStore>(
    catalog: &C,
    user_id: UserId,
    book_id: BookId,
    quantity: i64,
) -> Result<Vec<CartItemView>, CartError> {
    let cart_id = catalog.get_or_create_cart(user_id).await?;

    if quantity <= 0 {
        catalog.delete_cart_line(cart_id, book_id).await?;
    } else {
        let quantity = Quantity::new(quantity)?;
        catalog
            .update_cart_quantity(cart_id, book_id, quantity)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CartError::NotInCart(book_id),
                other => CartError::Repository(other),
            })?;
    }

    Ok(catalog.cart_view(cart_id).await?)
}

/// Remove a book from the user's cart. Removing an absent book is a no-op.
///
/// # Errors
///
/// Returns `CartError::Repository` if the store fails.
#[instrument(skip_all, fields(%user_id, %book_id))]
pub async fn remove_from_cart<C: CatalogStore>(
    catalog: &C,
    user_id: UserId,
    book_id: BookId,
) -> Result<Vec<CartItemView>, CartError> {
    let cart_id = catalog.get_or_create_cart(user_id).await?;
    catalog.delete_cart_line(cart_id, book_id).await?;
    Ok(catalog.cart_view(cart_id).await?)
}

// =============================================================================
// Local cart
// =============================================================================

/// The anonymous cart with titles and covers filled in from the catalog.
///
/// Lines whose book has left the catalog are omitted.
///
/// # Errors
///
/// Returns `CartError` if either store fails.
pub async fn local_cart<L, C>(local: &L, catalog: &C) -> Result<Vec<CartItemView>, CartError>
where
    L: LocalStore,
    C: CatalogStore,
{
    let lines = LocalCart::new(local).items().await?;
    enrich(catalog, lines).await
}

/// Add a book to the anonymous cart at its current catalog price.
///
/// # Errors
///
/// Returns `CartError::BookNotFound` for an unknown book, or a store error.
#[instrument(skip_all, fields(%book_id, %quantity))]
pub async fn add_to_local_cart<L, C>(
    local: &L,
    catalog: &C,
    book_id: BookId,
    quantity: Quantity,
) -> Result<Vec<CartItemView>, CartError>
where
    L: LocalStore,
    C: CatalogStore,
{
    let book = require_book(catalog, book_id).await?;
    let lines = LocalCart::new(local)
        .add(CartLine::new(book_id, quantity, book.price))
        .await?;
    enrich(catalog, lines).await
}

/// Set a line's quantity in the anonymous cart. Zero or below removes it.
///
/// # Errors
///
/// Returns `CartError` if the quantity is out of range or a store fails.
pub async fn update_local_quantity<L, C>(
    local: &L,
    catalog: &C,
    book_id: BookId,
    quantity: i64,
) -> Result<Vec<CartItemView>, CartError>
where
    L: LocalStore,
    C: CatalogStore,
{
    let lines = LocalCart::new(local).set_quantity(book_id, quantity).await?;
    enrich(catalog, lines).await
}

/// Remove a book from the anonymous cart.
///
/// # Errors
///
/// Returns `CartError` if a store fails.
pub async fn remove_from_local_cart<L, C>(
    local: &L,
    catalog: &C,
    book_id: BookId,
) -> Result<Vec<CartItemView>, CartError>
where
    L: LocalStore,
    C: CatalogStore,
{
    let lines = LocalCart::new(local).remove(book_id).await?;
    enrich(catalog, lines).await
}

async fn enrich<C: CatalogStore>(catalog: &C, lines: Vec<CartLine>) -> Result<Vec<CartItemView>, CartError> {
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let Some(book) = catalog.book(line.book_id).await? else {
            tracing::debug!(book_id = %line.book_id, "local cart line for missing book");
            continue;
        };
        items.push(CartItemView {
            book_id: line.book_id,
            title: book.title,
            image_url: book.image_url,
            quantity: line.quantity,
            unit_price: line.unit_price,
            catalog_price: book.price,
            line_total: line.line_total(),
        });
    }
    Ok(items)
}
