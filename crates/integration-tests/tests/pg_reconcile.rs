//! Reconciliation and sign-in against `PostgreSQL`.
//!
//! The local side is a session over `MemoryStore`; the account side is
//! [`PgCatalogStore`] over a fresh, migrated database.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use chrono::Utc;
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::PgPool;
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use url::Url;

use bookstore_core::{BookId, UserRole};
use bookstore_integration_tests::pg::{cart_quantities, seed_book, seed_user, wishlist_ids};
use bookstore_integration_tests::{line, local_session, price_cents};
use bookstore_storefront::config::{SentryConfig, StorefrontConfig};
use bookstore_storefront::db::CartRepository;
use bookstore_storefront::middleware::session;
use bookstore_storefront::routes;
use bookstore_storefront::services::sign_in;
use bookstore_storefront::services::{
    LocalCart, LocalWishlist, PgCatalogStore, reconcile_cart, reconcile_wishlist,
};
use bookstore_storefront::state::AppState;

// =============================================================================
// Cart and wishlist merges
// =============================================================================

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_local_line_lands_in_empty_account_cart(pool: PgPool) {
    let user = seed_user(&pool, "ann@example.com", UserRole::Customer).await;
    let book = seed_book(&pool, "Dune", 1000, 5).await;
    let session = local_session();
    LocalCart::new(&session)
        .replace(&[line(book.as_i32(), 2, 1000)])
        .await
        .expect("seed local cart");

    let outcome = reconcile_cart(&session, &PgCatalogStore::new(pool.clone()), user)
        .await
        .expect("merge");

    assert_eq!(cart_quantities(&pool, user).await, vec![(book.as_i32(), 2)]);
    assert_eq!(outcome.merged, 1);
    assert_eq!(outcome.items[0].title, "Dune");
    assert!(LocalCart::new(&session).items().await.expect("local").is_empty());
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_quantities_sum_and_account_price_is_kept(pool: PgPool) {
    let user = seed_user(&pool, "ben@example.com", UserRole::Customer).await;
    let book = seed_book(&pool, "Emma", 1000, 5).await;
    let carts = CartRepository::new(&pool);
    let cart = carts.get_or_create(user).await.expect("cart");
    carts
        .insert_line(cart, &line(book.as_i32(), 3, 1000))
        .await
        .expect("remote line");

    let session = local_session();
    LocalCart::new(&session)
        .replace(&[line(book.as_i32(), 2, 700)])
        .await
        .expect("seed local cart");

    reconcile_cart(&session, &PgCatalogStore::new(pool.clone()), user)
        .await
        .expect("merge");

    let merged = carts.line(cart, book).await.expect("read").expect("line");
    assert_eq!(merged.quantity.get(), 5);
    assert_eq!(merged.unit_price, price_cents(1000));
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_rejected_write_does_not_block_the_others(pool: PgPool) {
    let user = seed_user(&pool, "cy@example.com", UserRole::Customer).await;
    let dune = seed_book(&pool, "Dune", 1000, 5).await;
    let emma = seed_book(&pool, "Emma", 850, 5).await;
    let session = local_session();
    // Book 9999 is not in the catalog, so its insert trips the foreign key.
    LocalCart::new(&session)
        .replace(&[
            line(dune.as_i32(), 1, 1000),
            line(9999, 1, 500),
            line(emma.as_i32(), 2, 850),
        ])
        .await
        .expect("seed local cart");

    let outcome = reconcile_cart(&session, &PgCatalogStore::new(pool.clone()), user)
        .await
        .expect("merge");

    assert_eq!(outcome.merged, 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].book_id, BookId::new(9999));
    assert_eq!(
        cart_quantities(&pool, user).await,
        vec![(dune.as_i32(), 1), (emma.as_i32(), 2)]
    );
    assert!(LocalCart::new(&session).items().await.expect("local").is_empty());
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_wishlist_entry_already_listed_is_not_inserted_twice(pool: PgPool) {
    let user = seed_user(&pool, "dee@example.com", UserRole::Customer).await;
    let dune = seed_book(&pool, "Dune", 1000, 5).await;
    let emma = seed_book(&pool, "Emma", 850, 5).await;
    sqlx::query("INSERT INTO wishlist (user_id, book_id) VALUES ($1, $2)")
        .bind(user)
        .bind(dune)
        .execute(&pool)
        .await
        .expect("remote entry");

    let session = local_session();
    let local = LocalWishlist::new(&session);
    local.add(dune).await.expect("local dune");
    local.add(emma).await.expect("local emma");

    let outcome = reconcile_wishlist(&session, &PgCatalogStore::new(pool.clone()), user)
        .await
        .expect("merge");

    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(wishlist_ids(&pool, user).await, vec![dune.as_i32(), emma.as_i32()]);
}

// =============================================================================
// Sign-in callback through the router
// =============================================================================

const AUTH_SECRET: &str = "Zq8#Lm2!Tx5@Vb9$Wn4%Hc7^Jd1&Kf6*";

fn app(pool: PgPool) -> Router {
    let config = StorefrontConfig {
        database_url: SecretString::from("postgres://unused"),
        host: [127, 0, 0, 1].into(),
        port: 3000,
        base_url: Url::parse("http://localhost:3000").expect("url"),
        session_secret: SecretString::from("Pr3!sG7@uK1#oW5$eY9%aM2^iQ6&cZ0*"),
        auth_secret: SecretString::from(AUTH_SECRET),
        report_cache_ttl: std::time::Duration::from_secs(60),
        sentry: SentryConfig::default(),
    };
    let layer = session::configure(MemoryStore::default(), &config);
    routes::app(AppState::new(config, pool), layer)
}

fn request(method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request")
}

fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .next()
        .map(str::to_owned)
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_sign_in_callback_binds_account_and_merges_cart(pool: PgPool) {
    let book = seed_book(&pool, "Dune", 1000, 5).await;
    let app = app(pool.clone());

    // Anonymous visitor fills a cart.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/cart/add",
            None,
            Some(json!({ "book_id": book, "quantity": 2 })),
        ))
        .await
        .expect("add");
    assert_eq!(response.status(), StatusCode::OK);
    let anonymous = session_cookie(&response).expect("anonymous cookie");

    // The provider signs them in.
    let timestamp = Utc::now().timestamp();
    let secret = SecretString::from(AUTH_SECRET);
    let identity = json!({
        "email": "Reader@Example.com",
        "full_name": "Avid Reader",
        "timestamp": timestamp,
        "signature": sign_in::sign(&secret, timestamp, "Reader@Example.com"),
    });
    let response = app
        .clone()
        .oneshot(request("POST", "/auth/callback", Some(&anonymous), Some(identity)))
        .await
        .expect("callback");
    assert_eq!(response.status(), StatusCode::OK);
    let signed_in = session_cookie(&response).expect("cycled cookie");
    assert_ne!(signed_in, anonymous, "session id is cycled on sign-in");

    let body = body_json(response).await;
    assert_eq!(body["user"]["name"], "Avid Reader");
    assert_eq!(body["user"]["role"], "customer");
    assert_eq!(body["cart"]["merged"], 1);
    assert_eq!(body["cart"]["items"][0]["quantity"], 2);

    let user_id = sqlx::query_scalar::<_, bookstore_core::UserId>(
        "SELECT id FROM users WHERE email = 'reader@example.com'",
    )
    .fetch_one(&pool)
    .await
    .expect("account created");
    assert_eq!(cart_quantities(&pool, user_id).await, vec![(book.as_i32(), 2)]);

    // The session is now authenticated.
    let response = app
        .clone()
        .oneshot(request("GET", "/account", Some(&signed_in), None))
        .await
        .expect("account");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"], json!(user_id));
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_returning_user_keeps_their_role(pool: PgPool) {
    let manager = seed_user(&pool, "boss@example.com", UserRole::SalesManager).await;
    let timestamp = Utc::now().timestamp();
    let identity = json!({
        "email": "boss@example.com",
        "timestamp": timestamp,
        "signature": sign_in::sign(&SecretString::from(AUTH_SECRET), timestamp, "boss@example.com"),
    });

    let response = app(pool.clone())
        .oneshot(request("POST", "/auth/callback", None, Some(identity)))
        .await
        .expect("callback");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["id"], json!(manager));
    assert_eq!(body["user"]["role"], "sales_manager");
    let users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(users, 1);
}
