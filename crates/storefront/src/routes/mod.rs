//! HTTP route handlers for the storefront.
//!
//! All handlers speak JSON.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (database ping)
//!
//! # Catalog
//! GET  /books                  - Listing (?limit&offset)
//! GET  /books/top-rated        - Top 24 by average rating
//! GET  /books/best-sellers     - Top 4 by order lines
//! GET  /books/new              - Four newest books
//! GET  /books/{id}             - Detail with approved reviews and discount
//! GET  /books/{id}/discount    - Current discount
//! POST /books/{id}/reviews     - Submit a review (requires auth)
//!
//! # Cart and wishlist (session copy when anonymous)
//! GET  /cart                   - Cart with totals
//! POST /cart/add               - { book_id, quantity? }
//! POST /cart/update            - { book_id, quantity }, zero removes
//! POST /cart/remove            - { book_id }
//! GET  /wishlist               - Wishlist
//! POST /wishlist/add           - { book_id }
//! POST /wishlist/remove        - { book_id }
//!
//! # Sign-in
//! POST /auth/callback          - Signed identity from the provider; signs in and syncs
//!
//! # Account (requires auth)
//! GET  /account                - Signed-in user
//! POST /account/sync           - Merge session cart/wishlist into the account
//! POST /account/logout         - Sign out
//!
//! # Orders (requires auth)
//! POST /orders                 - Check out the account cart { shipping_address }
//! GET  /orders                 - Order history
//! GET  /orders/{id}            - One order
//! POST /orders/{id}/cancellations - { book_id, quantity, reason, other_reason? }
//! POST /orders/{id}/returns    - Same body; delivered orders within 30 days
//!
//! # Management
//! POST   /manage/discounts                   - Apply a discount (sales manager)
//! DELETE /manage/discounts/{book_id}         - End a book's discounts (sales manager)
//! GET    /manage/reviews/pending             - Moderation queue (product manager)
//! POST   /manage/reviews/{id}/approve        - Approve (product manager)
//! POST   /manage/reviews/{id}/reject         - Reject (product manager)
//! GET    /manage/stock                       - Stock levels (product manager)
//! PUT    /manage/stock/{book_id}             - Set stock { stock } (product manager)
//! GET    /manage/deliveries                  - Deliveries (product manager)
//! PUT    /manage/deliveries/{order_id}       - Advance { status } (product manager)
//! GET    /manage/cancellations               - Requests ?status (sales manager)
//! POST   /manage/cancellations/{id}/approve  - Approve and restock (sales manager)
//! POST   /manage/cancellations/{id}/reject   - Reject (sales manager)
//! GET    /manage/returns                     - Requests ?status (sales manager)
//! POST   /manage/returns/{id}/approve        - Approve, restock, report refund (sales manager)
//! POST   /manage/returns/{id}/reject         - Reject (sales manager)
//! ```

pub mod account;
pub mod auth;
pub mod books;
pub mod cart;
pub mod health;
pub mod manage;
pub mod orders;
pub mod wishlist;

use std::time::Duration;

use axum::{
    Router,
    http::{Request, Response},
    middleware::from_fn,
    routing::{delete, get, post, put},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::{SessionManagerLayer, SessionStore};
use tower_sessions::service::SignedCookie;
use tracing::Span;

use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Create the catalog routes router.
pub fn book_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(books::index))
        .route("/top-rated", get(books::top_rated))
        .route("/best-sellers", get(books::best_sellers))
        .route("/new", get(books::new_books))
        .route("/{id}", get(books::show))
        .route("/{id}/discount", get(books::discount))
        .route("/{id}/reviews", post(books::submit_review))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::show))
        .route("/add", post(wishlist::add))
        .route("/remove", post(wishlist::remove))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::me))
        .route("/sync", post(account::sync))
        .route("/logout", post(account::logout))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::place))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancellations", post(orders::request_cancellation))
        .route("/{id}/returns", post(orders::request_return))
}

/// Create the management routes router.
pub fn manage_routes() -> Router<AppState> {
    Router::new()
        .route("/discounts", post(manage::apply_discount))
        .route("/discounts/{book_id}", delete(manage::end_discounts))
        .route("/reviews/pending", get(manage::pending_reviews))
        .route("/reviews/{id}/approve", post(manage::approve_review))
        .route("/reviews/{id}/reject", post(manage::reject_review))
        .route("/stock", get(manage::stock_levels))
        .route("/stock/{book_id}", put(manage::set_stock))
        .route("/deliveries", get(manage::deliveries))
        .route("/deliveries/{order_id}", put(manage::update_delivery))
        .route("/cancellations", get(manage::cancellations))
        .route("/cancellations/{id}/approve", post(manage::approve_cancellation))
        .route("/cancellations/{id}/reject", post(manage::reject_cancellation))
        .route("/returns", get(manage::returns))
        .route("/returns/{id}/approve", post(manage::approve_return))
        .route("/returns/{id}/reject", post(manage::reject_return))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/books", book_routes())
        .nest("/cart", cart_routes())
        .nest("/wishlist", wishlist_routes())
        .route("/auth/callback", post(auth::callback))
        .nest("/account", account_routes())
        .nest("/orders", order_routes())
        .nest("/manage", manage_routes())
}

/// The full application: routes, sessions, request ids and tracing.
///
/// Sentry layers are added by the binary around this.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S, SignedCookie>) -> Router
where
    S: SessionStore + Clone,
{
    routes()
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(|response: &Response<_>, latency: Duration, span: &Span| {
                    span.record("status", response.status().as_u16());
                    span.record(
                        "latency_ms",
                        u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    );
                    DefaultOnResponse::default().on_response(response, latency, span);
                }),
        )
        .with_state(state)
}
