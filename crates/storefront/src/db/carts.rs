//! Cart repository.
//!
//! One cart row per user, created on first use; lines are keyed by
//! `(cart_id, book_id)`.

use sqlx::PgPool;

use bookstore_core::{BookId, CartId, CartLine, Price, Quantity, UserId};

use super::RepositoryError;
use crate::models::CartItemView;

#[derive(sqlx::FromRow)]
struct CartLineRow {
    book_id: BookId,
    quantity: Quantity,
    price: Price,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        Self::new(row.book_id, row.quantity, row.price)
    }
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    book_id: BookId,
    title: String,
    image_url: Option<String>,
    quantity: Quantity,
    price: Price,
    catalog_price: Price,
}

impl From<CartItemRow> for CartItemView {
    fn from(row: CartItemRow) -> Self {
        Self {
            book_id: row.book_id,
            title: row.title,
            image_url: row.image_url,
            quantity: row.quantity,
            unit_price: row.price,
            catalog_price: row.catalog_price,
            line_total: row.price.times(row.quantity.as_u32()),
        }
    }
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find the user's cart, if one was created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_user(&self, user_id: UserId) -> Result<Option<CartId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, CartId>("SELECT id FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(id)
    }

    /// Return the user's cart, creating it on first access.
    ///
    /// Read-then-create: a concurrent create for the same user surfaces as
    /// `RepositoryError::Conflict` from the unique `user_id` constraint and is
    /// not retried.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a lost creation race.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<CartId, RepositoryError> {
        if let Some(id) = self.find_by_user(user_id).await? {
            return Ok(id);
        }

        let id = sqlx::query_scalar::<_, CartId>(
            "INSERT INTO carts (user_id) VALUES ($1) RETURNING id",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "cart"))?;

        tracing::debug!(%user_id, cart_id = %id, "created cart");
        Ok(id)
    }

    /// All lines in a cart, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT book_id, quantity, price
            FROM cart_items
            WHERE cart_id = $1
            ORDER BY added_at, book_id
            ",
        )
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    /// The line for one book, if present.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn line(
        &self,
        cart_id: CartId,
        book_id: BookId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let row = sqlx::query_as::<_, CartLineRow>(
            "SELECT book_id, quantity, price FROM cart_items WHERE cart_id = $1 AND book_id = $2",
        )
        .bind(cart_id)
        .bind(book_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(CartLine::from))
    }

    /// Insert a new line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if the book no longer exists.
    /// Returns `RepositoryError::Conflict` if the book already has a line.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert_line(&self, cart_id: CartId, line: &CartLine) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO cart_items (cart_id, book_id, quantity, price) VALUES ($1, $2, $3, $4)",
        )
        .bind(cart_id)
        .bind(line.book_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "cart line"))?;

        Ok(())
    }

    /// Overwrite a line's quantity. The stored price is left as it was.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_quantity(
        &self,
        cart_id: CartId,
        book_id: BookId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $3 WHERE cart_id = $1 AND book_id = $2",
        )
        .bind(cart_id)
        .bind(book_id)
        .bind(quantity)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a line. Returns `true` if a line was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_line(&self, cart_id: CartId, book_id: BookId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND book_id = $2")
            .bind(cart_id)
            .bind(book_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// The cart's lines joined with title, cover and current catalog price.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn view(&self, cart_id: CartId) -> Result<Vec<CartItemView>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT ci.book_id, b.title, b.image_url, ci.quantity, ci.price,
                   b.price AS catalog_price
            FROM cart_items ci
            JOIN books b ON b.id = ci.book_id
            WHERE ci.cart_id = $1
            ORDER BY ci.added_at, ci.book_id
            ",
        )
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CartItemView::from).collect())
    }
}
