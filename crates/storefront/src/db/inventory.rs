//! Stock repository.

use sqlx::PgPool;

use bookstore_core::BookId;

use super::RepositoryError;
use crate::models::StockLevel;

/// Filters for the stock dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockFilter {
    /// Matches a title fragment (case-insensitive) or an exact book id.
    pub search: Option<String>,
    pub out_of_stock_only: bool,
    pub limit: i64,
    pub offset: i64,
}

impl Default for StockFilter {
    fn default() -> Self {
        Self {
            search: None,
            out_of_stock_only: false,
            limit: 10,
            offset: 0,
        }
    }
}

const STOCK_WHERE: &str = r"
    WHERE ($1::TEXT IS NULL
           OR b.title ILIKE '%' || $1 || '%'
           OR b.id::TEXT = $1)
      AND (NOT $2 OR b.stock = 0)
";

/// Repository for shelf counts.
pub struct InventoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InventoryRepository<'a> {
    /// Create a new inventory repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of stock levels ordered by id, and how many books match.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn levels(&self, filter: &StockFilter) -> Result<(Vec<StockLevel>, i64), RepositoryError> {
        let books = sqlx::query_as::<_, StockLevel>(&format!(
            "SELECT b.id, b.title, b.stock FROM books b {STOCK_WHERE} ORDER BY b.id LIMIT $3 OFFSET $4"
        ))
        .bind(filter.search.as_deref())
        .bind(filter.out_of_stock_only)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM books b {STOCK_WHERE}"
        ))
        .bind(filter.search.as_deref())
        .bind(filter.out_of_stock_only)
        .fetch_one(self.pool)
        .await?;

        Ok((books, total))
    }

    /// Overwrite a book's shelf count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the book doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_stock(&self, book_id: BookId, stock: i32) -> Result<StockLevel, RepositoryError> {
        sqlx::query_as::<_, StockLevel>(
            "UPDATE books SET stock = $2 WHERE id = $1 RETURNING id, title, stock",
        )
        .bind(book_id)
        .bind(stock)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
