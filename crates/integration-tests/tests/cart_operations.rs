//! Cart and wishlist operations for signed-in and anonymous visitors.

use bookstore_core::{BookId, Quantity, UserId};
use bookstore_integration_tests::{MemoryCatalogStore, line, local_session, price_cents};
use bookstore_storefront::models::{CartSummary, WishlistItemView};
use bookstore_storefront::services::cart::{self, CartError};
use bookstore_storefront::services::wishlist;

const USER: UserId = UserId::new(3);

fn catalog() -> MemoryCatalogStore {
    MemoryCatalogStore::new()
        .with_book(1, "Dune", 1000)
        .with_book(2, "Emma", 850)
}

fn qty(n: i64) -> Quantity {
    Quantity::new(n).expect("quantity")
}

// =============================================================================
// Account cart
// =============================================================================

#[tokio::test]
async fn test_add_to_cart_uses_catalog_price_and_sums() {
    let remote = catalog();

    cart::add_to_cart(&remote, USER, BookId::new(1), qty(1)).await.expect("add");
    let items = cart::add_to_cart(&remote, USER, BookId::new(1), qty(2)).await.expect("add");

    assert_eq!(remote.quantities(USER), vec![(1, 3)]);
    let summary = CartSummary::from(items);
    assert_eq!(summary.item_count, 3);
    assert_eq!(summary.subtotal, price_cents(3000));
}

#[tokio::test]
async fn test_add_unknown_book_is_rejected() {
    let err = cart::add_to_cart(&catalog(), USER, BookId::new(404), qty(1))
        .await
        .expect_err("unknown book");
    assert!(matches!(err, CartError::BookNotFound(id) if id == BookId::new(404)));
}

#[tokio::test]
async fn test_update_to_zero_removes_line() {
    let remote = catalog();
    remote.seed_cart_line(USER, line(2, 4, 850));

    let items = cart::update_quantity(&remote, USER, BookId::new(2), 0).await.expect("update");

    assert!(items.is_empty());
    assert!(remote.quantities(USER).is_empty());
}

#[tokio::test]
async fn test_update_missing_line_is_not_in_cart() {
    let err = cart::update_quantity(&catalog(), USER, BookId::new(1), 2)
        .await
        .expect_err("no line");
    assert!(matches!(err, CartError::NotInCart(_)));
}

#[tokio::test]
async fn test_remove_absent_book_is_a_no_op() {
    let remote = catalog();
    remote.seed_cart_line(USER, line(1, 1, 1000));

    let items = cart::remove_from_cart(&remote, USER, BookId::new(2)).await.expect("remove");

    assert_eq!(items.len(), 1);
}

// =============================================================================
// Session cart
// =============================================================================

#[tokio::test]
async fn test_local_cart_round_trip() {
    let session = local_session();
    let remote = catalog();

    cart::add_to_local_cart(&session, &remote, BookId::new(1), qty(2)).await.expect("add");
    cart::add_to_local_cart(&session, &remote, BookId::new(2), qty(1)).await.expect("add");
    cart::add_to_local_cart(&session, &remote, BookId::new(1), qty(1)).await.expect("add");
    let items = cart::update_local_quantity(&session, &remote, BookId::new(2), -1)
        .await
        .expect("update");

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].book_id, BookId::new(1));
    assert_eq!(items[0].quantity.get(), 3);
    assert_eq!(remote.writes(), 0, "anonymous carts never touch the account store");
}

#[tokio::test]
async fn test_local_cart_skips_books_gone_from_catalog() {
    let session = local_session();
    bookstore_storefront::services::LocalCart::new(&session)
        .replace(&[line(1, 1, 1000), line(77, 1, 500)])
        .await
        .expect("seed");

    let items = cart::local_cart(&session, &catalog()).await.expect("view");

    assert_eq!(items.len(), 1);
}

// =============================================================================
// Wishlist
// =============================================================================

#[tokio::test]
async fn test_wishlist_add_is_idempotent() {
    let remote = catalog();

    wishlist::add_to_wishlist(&remote, USER, BookId::new(1)).await.expect("add");
    let items = wishlist::add_to_wishlist(&remote, USER, BookId::new(1)).await.expect("add");

    assert_eq!(items.len(), 1);
    assert_eq!(remote.wishlist(USER), vec![1]);
}

#[tokio::test]
async fn test_local_wishlist_shows_unknown_title_for_missing_book() {
    let session = local_session();
    bookstore_storefront::services::LocalWishlist::new(&session)
        .add(BookId::new(55))
        .await
        .expect("seed");

    let items = wishlist::local_wishlist(&session, &catalog()).await.expect("view");

    assert_eq!(items, vec![WishlistItemView::unknown(BookId::new(55))]);
}

#[tokio::test]
async fn test_remove_from_local_wishlist() {
    let session = local_session();
    let remote = catalog();
    wishlist::add_to_local_wishlist(&session, &remote, BookId::new(1)).await.expect("add");
    wishlist::add_to_local_wishlist(&session, &remote, BookId::new(2)).await.expect("add");

    let items = wishlist::remove_from_local_wishlist(&session, &remote, BookId::new(1))
        .await
        .expect("remove");

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Emma");
}
