//! Order repository.
//!
//! Checkout runs in a [`Checkout`] transaction: the cart's book rows are
//! locked first, so the stock check and the stock decrement see the same
//! numbers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use bookstore_core::{
    BookId, CheckoutLine, DeliveryStatus, DiscountRate, OrderId, OrderLine, Price, Quantity,
    UserId,
};

use super::RepositoryError;
use crate::models::{Order, OrderItem};

#[derive(sqlx::FromRow)]
struct CheckoutRow {
    book_id: BookId,
    quantity: Quantity,
    catalog_price: Price,
    stock: i32,
}

impl From<CheckoutRow> for CheckoutLine {
    fn from(row: CheckoutRow) -> Self {
        Self {
            book_id: row.book_id,
            quantity: row.quantity,
            catalog_price: row.catalog_price,
            stock: row.stock,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    total: Price,
    shipping_address: String,
    delivery_status: DeliveryStatus,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn with_items(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            user_id: self.user_id,
            total: self.total,
            shipping_address: self.shipping_address,
            delivery_status: self.delivery_status,
            created_at: self.created_at,
            items,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_id: OrderId,
    #[sqlx(flatten)]
    item: OrderItem,
}

/// One book on one of the customer's orders, as after-sale requests see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderedLine {
    pub quantity: Quantity,
    pub item_price: Price,
    pub status: DeliveryStatus,
    pub ordered_at: DateTime<Utc>,
}

const ORDER_COLUMNS: &str = r"
    o.id, o.user_id, o.total, o.shipping_address, o.created_at,
    COALESCE(ds.status, 'processing'::delivery_status) AS delivery_status
";

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Open a checkout transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if no connection is available.
    pub async fn begin_checkout(&self) -> Result<Checkout, RepositoryError> {
        Ok(Checkout {
            tx: self.pool.begin().await?,
        })
    }

    /// The user's orders, newest first, with their lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM orders o
            LEFT JOIN delivery_statuses ds ON ds.order_id = o.id
            WHERE o.user_id = $1
            ORDER BY o.created_at DESC, o.id DESC
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<i32> = rows.iter().map(|row| row.id.as_i32()).collect();
        let mut items = self.items_for(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                row.with_items(lines)
            })
            .collect())
    }

    /// One of the user's orders. Other users' orders read as missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, user_id: UserId, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM orders o
            LEFT JOIN delivery_statuses ds ON ds.order_id = o.id
            WHERE o.id = $1 AND o.user_id = $2
            "
        ))
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let items = self
            .items_for(&[order_id.as_i32()])
            .await?
            .remove(&order_id)
            .unwrap_or_default();
        Ok(Some(row.with_items(items)))
    }

    /// The line for `book_id` on one of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ordered_line(
        &self,
        user_id: UserId,
        order_id: OrderId,
        book_id: BookId,
    ) -> Result<Option<OrderedLine>, RepositoryError> {
        let line = sqlx::query_as::<_, OrderedLine>(
            r"
            SELECT oi.quantity, oi.price AS item_price, o.created_at AS ordered_at,
                   COALESCE(ds.status, 'processing'::delivery_status) AS status
            FROM orders o
            JOIN order_items oi ON oi.order_id = o.id
            LEFT JOIN delivery_statuses ds ON ds.order_id = o.id
            WHERE o.id = $1 AND o.user_id = $2 AND oi.book_id = $3
            ",
        )
        .bind(order_id)
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(line)
    }

    async fn items_for(&self, order_ids: &[i32]) -> Result<HashMap<OrderId, Vec<OrderItem>>, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT oi.order_id, oi.book_id, b.title, b.image_url, oi.quantity,
                   oi.price AS item_price
            FROM order_items oi
            JOIN books b ON b.id = oi.book_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.order_id, oi.id
            ",
        )
        .bind(order_ids)
        .fetch_all(self.pool)
        .await?;

        let mut grouped: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            grouped.entry(row.order_id).or_default().push(row.item);
        }
        Ok(grouped)
    }
}

/// An open checkout. Dropping it without [`Checkout::commit`] rolls back.
pub struct Checkout {
    tx: Transaction<'static, Postgres>,
}

impl Checkout {
    /// The user's cart lines with current price and stock, locking the books
    /// and cart lines until the transaction ends.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_cart(&mut self, user_id: UserId) -> Result<Vec<CheckoutLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CheckoutRow>(
            r"
            SELECT ci.book_id, ci.quantity, b.price AS catalog_price, b.stock
            FROM carts c
            JOIN cart_items ci ON ci.cart_id = c.id
            JOIN books b ON b.id = ci.book_id
            WHERE c.user_id = $1
            ORDER BY ci.book_id
            FOR UPDATE OF ci, b
            ",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(CheckoutLine::from).collect())
    }

    /// The active discount rate per book. When a book has several, the one
    /// that started last wins.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_rates(
        &mut self,
        book_ids: &[BookId],
        now: DateTime<Utc>,
    ) -> Result<HashMap<BookId, DiscountRate>, RepositoryError> {
        let raw: Vec<i32> = book_ids.iter().map(BookId::as_i32).collect();
        let rates = sqlx::query_as::<_, (BookId, DiscountRate)>(
            r"
            SELECT DISTINCT ON (bd.book_id) bd.book_id, d.rate
            FROM book_discounts bd
            JOIN discounts d ON d.id = bd.discount_id
            WHERE bd.book_id = ANY($1)
              AND d.starts_at <= $2
              AND (d.ends_at IS NULL OR d.ends_at > $2)
            ORDER BY bd.book_id, d.starts_at DESC, d.id
            ",
        )
        .bind(raw)
        .bind(now)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rates.into_iter().collect())
    }

    /// Write the order and its lines, take the copies off the shelf, empty
    /// the cart and start delivery tracking.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a write fails. A stock count
    /// that would go negative trips the `books.stock` check and fails here.
    pub async fn create_order(
        &mut self,
        user_id: UserId,
        shipping_address: &str,
        lines: &[OrderLine],
        total: Price,
    ) -> Result<(OrderId, DateTime<Utc>), RepositoryError> {
        let (order_id, created_at) = sqlx::query_as::<_, (OrderId, DateTime<Utc>)>(
            r"
            INSERT INTO orders (user_id, total, shipping_address)
            VALUES ($1, $2, $3)
            RETURNING id, created_at
            ",
        )
        .bind(user_id)
        .bind(total)
        .bind(shipping_address)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "order"))?;

        for line in lines {
            sqlx::query(
                "INSERT INTO order_items (order_id, book_id, quantity, price) VALUES ($1, $2, $3, $4)",
            )
            .bind(order_id)
            .bind(line.book_id)
            .bind(line.quantity)
            .bind(line.item_price)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| RepositoryError::from_write(e, "order item"))?;

            sqlx::query("UPDATE books SET stock = stock - $2 WHERE id = $1")
                .bind(line.book_id)
                .bind(line.quantity)
                .execute(&mut *self.tx)
                .await?;
        }

        sqlx::query(
            "DELETE FROM cart_items WHERE cart_id IN (SELECT id FROM carts WHERE user_id = $1)",
        )
        .bind(user_id)
        .execute(&mut *self.tx)
        .await?;

        sqlx::query("INSERT INTO delivery_statuses (order_id) VALUES ($1)")
            .bind(order_id)
            .execute(&mut *self.tx)
            .await?;

        Ok((order_id, created_at))
    }

    /// Make the checkout permanent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the commit fails.
    pub async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}
