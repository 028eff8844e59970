//! Seeding and inspection helpers for tests that run against `PostgreSQL`.

use sqlx::PgPool;

use bookstore_core::{BookId, UserId, UserRole};

use crate::price_cents;

/// Insert an account.
pub async fn seed_user(pool: &PgPool, email: &str, role: UserRole) -> UserId {
    sqlx::query_scalar::<_, UserId>(
        "INSERT INTO users (full_name, email, role) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(email.split('@').next().unwrap_or(email))
    .bind(email)
    .bind(role)
    .fetch_one(pool)
    .await
    .expect("seed user")
}

/// Insert a book priced at `cents` with `stock` copies on the shelf.
pub async fn seed_book(pool: &PgPool, title: &str, cents: i64, stock: i32) -> BookId {
    sqlx::query_scalar::<_, BookId>(
        "INSERT INTO books (title, price, stock, image_url) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(title)
    .bind(price_cents(cents))
    .bind(stock)
    .bind(format!("/covers/{}.jpg", title.to_lowercase()))
    .fetch_one(pool)
    .await
    .expect("seed book")
}

/// `(book_id, quantity)` in the user's durable cart, ordered by book.
pub async fn cart_quantities(pool: &PgPool, user_id: UserId) -> Vec<(i32, i32)> {
    sqlx::query_as::<_, (i32, i32)>(
        r"
        SELECT ci.book_id, ci.quantity
        FROM cart_items ci JOIN carts c ON c.id = ci.cart_id
        WHERE c.user_id = $1
        ORDER BY ci.book_id
        ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .expect("cart quantities")
}

/// Book ids on the user's wishlist, ordered by id.
pub async fn wishlist_ids(pool: &PgPool, user_id: UserId) -> Vec<i32> {
    sqlx::query_scalar::<_, i32>("SELECT book_id FROM wishlist WHERE user_id = $1 ORDER BY book_id")
        .bind(user_id)
        .fetch_all(pool)
        .await
        .expect("wishlist ids")
}

/// Copies of a book on the shelf.
pub async fn stock_of(pool: &PgPool, book_id: BookId) -> i32 {
    sqlx::query_scalar::<_, i32>("SELECT stock FROM books WHERE id = $1")
        .bind(book_id)
        .fetch_one(pool)
        .await
        .expect("stock")
}

/// Number of rows in `table`.
pub async fn count_rows(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("count rows")
}
