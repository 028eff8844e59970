//! Catalog reports: top rated, best sellers, new arrivals.
//!
//! Rows are fetched and reduced in memory, then cached for
//! `STOREFRONT_REPORT_CACHE_SECS`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, instrument};

use bookstore_core::BookId;

use crate::db::{BookRepository, RepositoryError, ReviewRepository};
use crate::models::{BestSeller, BookSummary, RatedBook};

pub const TOP_RATED_LIMIT: usize = 24;
pub const BEST_SELLER_LIMIT: usize = 4;
pub const NEW_BOOKS_LIMIT: usize = 4;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum ReportKey {
    TopRated,
    BestSellers,
    NewBooks,
}

#[derive(Debug, Clone)]
enum ReportValue {
    TopRated(Arc<Vec<RatedBook>>),
    BestSellers(Arc<Vec<BestSeller>>),
    NewBooks(Arc<Vec<BookSummary>>),
}

/// Average each book's ratings and return the best `limit`.
///
/// Books without reviews average `0.0`. Equal averages keep catalog order.
#[must_use]
pub fn rank_by_rating(
    books: Vec<BookSummary>,
    ratings: &[(BookId, i16)],
    limit: usize,
) -> Vec<RatedBook> {
    let mut totals: HashMap<BookId, (i64, u32)> = HashMap::new();
    for (book_id, rating) in ratings {
        let entry = totals.entry(*book_id).or_default();
        entry.0 += i64::from(*rating);
        entry.1 += 1;
    }

    let mut rated: Vec<RatedBook> = books
        .into_iter()
        .map(|book| {
            let (sum, count) = totals.get(&book.id).copied().unwrap_or_default();
            #[allow(clippy::cast_precision_loss)] // rating sums are small
            let avg_rating = if count == 0 {
                0.0
            } else {
                sum as f64 / f64::from(count)
            };
            RatedBook {
                book,
                avg_rating,
                review_count: count,
            }
        })
        .collect();

    rated.sort_by(|a, b| b.avg_rating.total_cmp(&a.avg_rating));
    rated.truncate(limit);
    rated
}

/// Count order lines per book and return the `limit` most frequent,
/// highest count first. Ties go to the lower book id.
#[must_use]
pub fn count_orders(ordered: &[BookId], limit: usize) -> Vec<(BookId, u64)> {
    let mut counts: HashMap<BookId, u64> = HashMap::new();
    for book_id in ordered {
        *counts.entry(*book_id).or_insert(0) += 1;
    }

    let mut counts: Vec<(BookId, u64)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    counts.truncate(limit);
    counts
}

/// Pair counted ids with their books, keeping the count order.
/// Ids with no matching book are dropped.
#[must_use]
pub fn rank_best_sellers(counts: &[(BookId, u64)], books: Vec<BookSummary>) -> Vec<BestSeller> {
    let mut by_id: HashMap<BookId, BookSummary> =
        books.into_iter().map(|book| (book.id, book)).collect();
    counts
        .iter()
        .filter_map(|(book_id, order_count)| {
            by_id.remove(book_id).map(|book| BestSeller {
                book,
                order_count: *order_count,
            })
        })
        .collect()
}

/// Cached report queries.
#[derive(Clone)]
pub struct Reports {
    pool: PgPool,
    cache: Cache<ReportKey, ReportValue>,
}

impl Reports {
    #[must_use]
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(16).time_to_live(ttl).build();
        Self { pool, cache }
    }

    /// Books ranked by average rating.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the catalog or reviews cannot be read.
    #[instrument(skip(self))]
    pub async fn top_rated(&self) -> Result<Arc<Vec<RatedBook>>, RepositoryError> {
        if let Some(ReportValue::TopRated(books)) = self.cache.get(&ReportKey::TopRated).await {
            debug!("top rated cache hit");
            return Ok(books);
        }

        let books = BookRepository::new(&self.pool).all().await?;
        let ratings = ReviewRepository::new(&self.pool).all_ratings().await?;
        let ranked = Arc::new(rank_by_rating(books, &ratings, TOP_RATED_LIMIT));

        self.cache
            .insert(ReportKey::TopRated, ReportValue::TopRated(Arc::clone(&ranked)))
            .await;
        Ok(ranked)
    }

    /// Books appearing on the most order lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if orders or books cannot be read.
    #[instrument(skip(self))]
    pub async fn best_sellers(&self) -> Result<Arc<Vec<BestSeller>>, RepositoryError> {
        if let Some(ReportValue::BestSellers(books)) = self.cache.get(&ReportKey::BestSellers).await
        {
            debug!("best sellers cache hit");
            return Ok(books);
        }

        let repo = BookRepository::new(&self.pool);
        let counts = count_orders(&repo.ordered_book_ids().await?, BEST_SELLER_LIMIT);
        let ids: Vec<BookId> = counts.iter().map(|(id, _)| *id).collect();
        let ranked = Arc::new(rank_best_sellers(&counts, repo.by_ids(&ids).await?));

        self.cache
            .insert(
                ReportKey::BestSellers,
                ReportValue::BestSellers(Arc::clone(&ranked)),
            )
            .await;
        Ok(ranked)
    }

    /// The most recently added books.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the catalog cannot be read.
    #[instrument(skip(self))]
    pub async fn new_books(&self) -> Result<Arc<Vec<BookSummary>>, RepositoryError> {
        if let Some(ReportValue::NewBooks(books)) = self.cache.get(&ReportKey::NewBooks).await {
            return Ok(books);
        }

        #[allow(clippy::cast_possible_wrap)] // small constant
        let books = BookRepository::new(&self.pool)
            .newest(NEW_BOOKS_LIMIT as i64)
            .await?;
        let books = Arc::new(books);

        self.cache
            .insert(ReportKey::NewBooks, ReportValue::NewBooks(Arc::clone(&books)))
            .await;
        Ok(books)
    }

    /// Drop every cached report.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}
