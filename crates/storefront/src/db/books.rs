//! Catalog repository.

use sqlx::PgPool;

use bookstore_core::{BookId, Price};

use super::RepositoryError;
use crate::models::{Book, BookSummary};

const BOOK_COLUMNS: &str = r"
    b.id, b.title, b.isbn, b.description, b.publisher, b.price, b.stock, b.image_url,
    a.name AS author, g.name AS genre
";

/// Repository for catalog reads.
pub struct BookRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BookRepository<'a> {
    /// Create a new book repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A page of the catalog ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<BookSummary>, RepositoryError> {
        let books = sqlx::query_as::<_, BookSummary>(
            "SELECT id, title, price, image_url FROM books ORDER BY id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;
        Ok(books)
    }

    /// Every book in the catalog, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all(&self) -> Result<Vec<BookSummary>, RepositoryError> {
        let books = sqlx::query_as::<_, BookSummary>(
            "SELECT id, title, price, image_url FROM books ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(books)
    }

    /// Books with the highest ids, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn newest(&self, limit: i64) -> Result<Vec<BookSummary>, RepositoryError> {
        let books = sqlx::query_as::<_, BookSummary>(
            "SELECT id, title, price, image_url FROM books ORDER BY id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(books)
    }

    /// Summaries for a set of ids. Order is unspecified; missing ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn by_ids(&self, ids: &[BookId]) -> Result<Vec<BookSummary>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i32> = ids.iter().map(BookId::as_i32).collect();
        let books = sqlx::query_as::<_, BookSummary>(
            "SELECT id, title, price, image_url FROM books WHERE id = ANY($1)",
        )
        .bind(raw)
        .fetch_all(self.pool)
        .await?;
        Ok(books)
    }

    /// Full detail for one book.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        let book = sqlx::query_as::<_, Book>(&format!(
            r"
            SELECT {BOOK_COLUMNS}
            FROM books b
            LEFT JOIN authors a ON a.id = b.author_id
            LEFT JOIN genres g ON g.id = b.genre_id
            WHERE b.id = $1
            "
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(book)
    }

    /// Title, cover and price for one book.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary(&self, id: BookId) -> Result<Option<BookSummary>, RepositoryError> {
        let book = sqlx::query_as::<_, BookSummary>(
            "SELECT id, title, price, image_url FROM books WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(book)
    }

    /// Current catalog price.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn price(&self, id: BookId) -> Result<Option<Price>, RepositoryError> {
        let price = sqlx::query_scalar::<_, Price>("SELECT price FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(price)
    }

    /// The book id of every order line ever placed, one entry per row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ordered_book_ids(&self) -> Result<Vec<BookId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, BookId>("SELECT book_id FROM order_items")
            .fetch_all(self.pool)
            .await?;
        Ok(ids)
    }
}
