//! Wishlist repository.

use sqlx::PgPool;

use bookstore_core::{BookId, UserId};

use super::RepositoryError;
use crate::models::WishlistItemView;

#[derive(sqlx::FromRow)]
struct WishlistRow {
    book_id: BookId,
    title: Option<String>,
    image_url: Option<String>,
}

impl From<WishlistRow> for WishlistItemView {
    fn from(row: WishlistRow) -> Self {
        match row.title {
            Some(title) => Self {
                book_id: row.book_id,
                title,
                image_url: row.image_url,
            },
            None => Self::unknown(row.book_id),
        }
    }
}

/// Repository for wishlist database operations.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Book ids on the user's wishlist, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn book_ids(&self, user_id: UserId) -> Result<Vec<BookId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, BookId>(
            "SELECT book_id FROM wishlist WHERE user_id = $1 ORDER BY added_at, book_id",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(ids)
    }

    /// Add a book to the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the book is already listed.
    /// Returns `RepositoryError::ForeignKey` if the user or book is missing.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(&self, user_id: UserId, book_id: BookId) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO wishlist (user_id, book_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(book_id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "wishlist entry"))?;
        Ok(())
    }

    /// Remove a book. Returns `true` if it was listed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, user_id: UserId, book_id: BookId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM wishlist WHERE user_id = $1 AND book_id = $2")
            .bind(user_id)
            .bind(book_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The wishlist with titles and covers. Entries whose book is gone show
    /// as "Unknown Title".
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn view(&self, user_id: UserId) -> Result<Vec<WishlistItemView>, RepositoryError> {
        let rows = sqlx::query_as::<_, WishlistRow>(
            r"
            SELECT w.book_id, b.title, b.image_url
            FROM wishlist w
            LEFT JOIN books b ON b.id = w.book_id
            WHERE w.user_id = $1
            ORDER BY w.added_at, w.book_id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(WishlistItemView::from).collect())
    }
}
