//! Repository behavior against a real `PostgreSQL` schema.
//!
//! Each test gets a fresh database with the storefront migrations applied.

use std::time::Duration;

use chrono::{Duration as TimeDelta, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use bookstore_core::{BookId, DiscountRate, Quantity, UserRole};
use bookstore_integration_tests::pg::{seed_book, seed_user};
use bookstore_integration_tests::{line, price_cents};
use bookstore_storefront::db::reviews::PendingFilter;
use bookstore_storefront::db::{
    CartRepository, DiscountRepository, RepositoryError, ReviewRepository, WishlistRepository,
};
use bookstore_storefront::models::PendingReview;

fn qty(n: i64) -> Quantity {
    Quantity::new(n).expect("quantity")
}

// =============================================================================
// Carts
// =============================================================================

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_get_or_create_returns_the_same_cart(pool: PgPool) {
    let user = seed_user(&pool, "ann@example.com", UserRole::Customer).await;
    let carts = CartRepository::new(&pool);

    let first = carts.get_or_create(user).await.expect("create");
    let second = carts.get_or_create(user).await.expect("find");

    assert_eq!(first, second);
    assert_eq!(carts.find_by_user(user).await.expect("find"), Some(first));
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_losing_cart_creation_race_is_a_conflict(pool: PgPool) {
    let user = seed_user(&pool, "ben@example.com", UserRole::Customer).await;

    // Hold an uncommitted cart for the user so the repository's read finds
    // nothing and its insert waits on the unique index.
    let mut rival = pool.begin().await.expect("begin");
    sqlx::query("INSERT INTO carts (user_id) VALUES ($1)")
        .bind(user)
        .execute(&mut *rival)
        .await
        .expect("rival cart");

    let racer = {
        let pool = pool.clone();
        tokio::spawn(async move { CartRepository::new(&pool).get_or_create(user).await })
    };

    loop {
        let waiting = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*) FROM pg_stat_activity
            WHERE datname = current_database() AND wait_event_type = 'Lock'
            ",
        )
        .fetch_one(&pool)
        .await
        .expect("lock waiters");
        if waiting > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    rival.commit().await.expect("commit rival");

    let result = racer.await.expect("join");
    assert!(
        matches!(result, Err(RepositoryError::Conflict(ref m)) if m == "cart already exists"),
        "{result:?}"
    );
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_update_quantity_of_missing_line_is_not_found(pool: PgPool) {
    let user = seed_user(&pool, "cy@example.com", UserRole::Customer).await;
    let book = seed_book(&pool, "Dune", 1000, 5).await;
    let carts = CartRepository::new(&pool);
    let cart = carts.get_or_create(user).await.expect("cart");

    let result = carts.update_quantity(cart, book, qty(2)).await;

    assert!(matches!(result, Err(RepositoryError::NotFound)));
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_duplicate_line_is_a_conflict_and_missing_book_a_foreign_key(pool: PgPool) {
    let user = seed_user(&pool, "dee@example.com", UserRole::Customer).await;
    let book = seed_book(&pool, "Emma", 850, 5).await;
    let carts = CartRepository::new(&pool);
    let cart = carts.get_or_create(user).await.expect("cart");

    carts
        .insert_line(cart, &line(book.as_i32(), 1, 850))
        .await
        .expect("first insert");
    let duplicate = carts.insert_line(cart, &line(book.as_i32(), 1, 850)).await;
    let missing = carts.insert_line(cart, &line(9999, 1, 100)).await;

    assert!(matches!(duplicate, Err(RepositoryError::Conflict(_))));
    assert!(matches!(missing, Err(RepositoryError::ForeignKey(_))));
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_cart_view_joins_title_cover_and_catalog_price(pool: PgPool) {
    let user = seed_user(&pool, "eve@example.com", UserRole::Customer).await;
    let book = seed_book(&pool, "Ulysses", 1599, 5).await;
    let carts = CartRepository::new(&pool);
    let cart = carts.get_or_create(user).await.expect("cart");
    carts
        .insert_line(cart, &line(book.as_i32(), 2, 1200))
        .await
        .expect("insert");

    let view = carts.view(cart).await.expect("view");

    assert_eq!(view.len(), 1);
    let item = &view[0];
    assert_eq!(item.title, "Ulysses");
    assert_eq!(item.image_url.as_deref(), Some("/covers/ulysses.jpg"));
    assert_eq!(item.unit_price, price_cents(1200));
    assert_eq!(item.catalog_price, price_cents(1599));
    assert_eq!(item.line_total, price_cents(2400));
}

// =============================================================================
// Wishlist
// =============================================================================

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_wishlist_entry_without_book_shows_unknown_title(pool: PgPool) {
    let user = seed_user(&pool, "fay@example.com", UserRole::Customer).await;
    let book = seed_book(&pool, "Dune", 1000, 5).await;
    let wishlist = WishlistRepository::new(&pool);
    wishlist.insert(user, book).await.expect("insert");

    // Orphan an entry the way a catalog import without cascades would.
    sqlx::query("ALTER TABLE wishlist DROP CONSTRAINT wishlist_book_id_fkey")
        .execute(&pool)
        .await
        .expect("drop fk");
    sqlx::query("INSERT INTO wishlist (user_id, book_id) VALUES ($1, 4242)")
        .bind(user)
        .execute(&pool)
        .await
        .expect("orphan entry");

    let view = wishlist.view(user).await.expect("view");

    assert_eq!(view.len(), 2);
    assert_eq!(view[0].title, "Dune");
    assert_eq!(view[1].book_id, BookId::new(4242));
    assert_eq!(view[1].title, "Unknown Title");
    assert_eq!(view[1].image_url, None);
}

// =============================================================================
// Discounts
// =============================================================================

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_replace_ends_open_discount_and_links_new_one(pool: PgPool) {
    let book = seed_book(&pool, "Emma", 850, 5).await;
    let discounts = DiscountRepository::new(&pool);
    let earlier = Utc::now() - TimeDelta::hours(2);
    let now = Utc::now();
    let rate = |n: i64| DiscountRate::new(Decimal::new(n, 0)).expect("rate");

    discounts
        .replace(book, "Spring", rate(10), earlier, None)
        .await
        .expect("first");
    let second = discounts
        .replace(book, "Summer", rate(25), now, Some(now + TimeDelta::days(7)))
        .await
        .expect("second");

    let history = discounts.for_book(book).await.expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].name, "Spring");
    assert_eq!(
        history[0].ends_at.map(|t| t.timestamp_micros()),
        Some(now.timestamp_micros())
    );
    assert_eq!(history[1].id, second.id);
    assert_eq!(history[1].name, "Summer");
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_replace_for_missing_book_is_a_foreign_key_error(pool: PgPool) {
    let rate = DiscountRate::new(Decimal::new(5, 0)).expect("rate");

    let result = DiscountRepository::new(&pool)
        .replace(BookId::new(77), "Ghost", rate, Utc::now(), None)
        .await;

    assert!(matches!(result, Err(RepositoryError::ForeignKey(_))));
    let discounts = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM discounts")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(discounts, 0, "the transaction rolled back");
}

// =============================================================================
// Reviews
// =============================================================================

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_pending_reviews_filter_and_page_newest_first(pool: PgPool) {
    let user = seed_user(&pool, "gil@example.com", UserRole::Customer).await;
    let dune = seed_book(&pool, "Dune", 1000, 5).await;
    let emma = seed_book(&pool, "Emma", 850, 5).await;
    let reviews = ReviewRepository::new(&pool);

    let r1 = reviews.create(dune, user, 5, Some("classic")).await.expect("r1");
    let r2 = reviews.create(dune, user, 3, None).await.expect("r2");
    let r3 = reviews.create(emma, user, 5, None).await.expect("r3");
    let r4 = reviews.create(dune, user, 5, None).await.expect("r4");
    reviews.approve(r4).await.expect("approve");

    let ids = |page: Vec<PendingReview>| {
        page.into_iter().map(|r| r.id).collect::<Vec<_>>()
    };

    let all = reviews.pending(PendingFilter::default()).await.expect("all");
    assert_eq!(ids(all), vec![r3, r2, r1]);

    let dune_only = PendingFilter {
        book_id: Some(dune),
        ..PendingFilter::default()
    };
    assert_eq!(ids(reviews.pending(dune_only).await.expect("dune")), vec![r2, r1]);

    let fives = PendingFilter {
        rating: Some(5),
        ..PendingFilter::default()
    };
    assert_eq!(ids(reviews.pending(fives).await.expect("fives")), vec![r3, r1]);

    let second_page = PendingFilter {
        limit: 2,
        offset: 2,
        ..PendingFilter::default()
    };
    assert_eq!(ids(reviews.pending(second_page).await.expect("page")), vec![r1]);
}
