//! The durable store behind carts and wishlists.
//!
//! [`CatalogStore`] is the narrow port the cart, wishlist and reconciliation
//! services need. [`PgCatalogStore`] implements it over the repositories.

use std::future::Future;

use sqlx::PgPool;

use bookstore_core::{BookId, CartId, CartLine, Quantity, UserId};

use crate::db::{BookRepository, CartRepository, RepositoryError, WishlistRepository};
use crate::models::{BookSummary, CartItemView, WishlistItemView};

/// Durable per-user cart and wishlist storage.
pub trait CatalogStore: Send + Sync {
    /// The user's cart, created on first use.
    fn get_or_create_cart(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<CartId, RepositoryError>> + Send;

    fn cart_lines(
        &self,
        cart_id: CartId,
    ) -> impl Future<Output = Result<Vec<CartLine>, RepositoryError>> + Send;

    fn insert_cart_line(
        &self,
        cart_id: CartId,
        line: CartLine,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Overwrite a line's quantity, keeping its stored price.
    fn update_cart_quantity(
        &self,
        cart_id: CartId,
        book_id: BookId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn delete_cart_line(
        &self,
        cart_id: CartId,
        book_id: BookId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Cart lines joined with title, cover and catalog price.
    fn cart_view(
        &self,
        cart_id: CartId,
    ) -> impl Future<Output = Result<Vec<CartItemView>, RepositoryError>> + Send;

    fn wishlist_book_ids(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<BookId>, RepositoryError>> + Send;

    fn insert_wishlist_entry(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn delete_wishlist_entry(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    fn wishlist_view(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<WishlistItemView>, RepositoryError>> + Send;

    /// Look up a book's title, cover and current price.
    fn book(
        &self,
        book_id: BookId,
    ) -> impl Future<Output = Result<Option<BookSummary>, RepositoryError>> + Send;
}

/// [`CatalogStore`] backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CatalogStore for PgCatalogStore {
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<CartId, RepositoryError> {
        CartRepository::new(&self.pool).get_or_create(user_id).await
    }

    async fn cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        CartRepository::new(&self.pool).lines(cart_id).await
    }

    async fn insert_cart_line(&self, cart_id: CartId, line: CartLine) -> Result<(), RepositoryError> {
        CartRepository::new(&self.pool).insert_line(cart_id, &line).await
    }

    async fn update_cart_quantity(
        &self,
        cart_id: CartId,
        book_id: BookId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError> {
        CartRepository::new(&self.pool)
            .update_quantity(cart_id, book_id, quantity)
            .await
    }

    async fn delete_cart_line(&self, cart_id: CartId, book_id: BookId) -> Result<bool, RepositoryError> {
        CartRepository::new(&self.pool).delete_line(cart_id, book_id).await
    }

    async fn cart_view(&self, cart_id: CartId) -> Result<Vec<CartItemView>, RepositoryError> {
        CartRepository::new(&self.pool).view(cart_id).await
    }

    async fn wishlist_book_ids(&self, user_id: UserId) -> Result<Vec<BookId>, RepositoryError> {
        WishlistRepository::new(&self.pool).book_ids(user_id).await
    }

    async fn insert_wishlist_entry(&self, user_id: UserId, book_id: BookId) -> Result<(), RepositoryError> {
        WishlistRepository::new(&self.pool).insert(user_id, book_id).await
    }

    async fn delete_wishlist_entry(&self, user_id: UserId, book_id: BookId) -> Result<bool, RepositoryError> {
        WishlistRepository::new(&self.pool).delete(user_id, book_id).await
    }

    async fn wishlist_view(&self, user_id: UserId) -> Result<Vec<WishlistItemView>, RepositoryError> {
        WishlistRepository::new(&self.pool).view(user_id).await
    }

    async fn book(&self, book_id: BookId) -> Result<Option<BookSummary>, RepositoryError> {
        BookRepository::new(&self.pool).summary(book_id).await
    }
}
