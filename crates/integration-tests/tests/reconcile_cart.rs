//! Merging an anonymous cart into the account cart after sign-in.
//!
//! Local carts live in a real session over `MemoryStore`; the account side
//! is the in-memory catalog fake.

use bookstore_core::{BookId, UserId};
use bookstore_integration_tests::{
    FailingLocalStore, MemoryCatalogStore, line, local_session, price_cents,
};
use bookstore_storefront::models::session_keys;
use bookstore_storefront::services::{LocalCart, ReconcileError, reconcile_cart};

const USER: UserId = UserId::new(42);

fn catalog() -> MemoryCatalogStore {
    MemoryCatalogStore::new()
        .with_book(1, "Dune", 1000)
        .with_book(2, "Emma", 850)
        .with_book(3, "Ulysses", 1599)
}

// =============================================================================
// Merge semantics
// =============================================================================

#[tokio::test]
async fn test_local_line_is_created_when_remote_cart_is_empty() {
    let session = local_session();
    LocalCart::new(&session)
        .replace(&[line(1, 2, 1000)])
        .await
        .expect("seed local cart");
    let remote = catalog();

    let outcome = reconcile_cart(&session, &remote, USER).await.expect("merge");

    assert_eq!(remote.quantities(USER), vec![(1, 2)]);
    assert_eq!(outcome.merged, 1);
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.items.len(), 1);
    assert_eq!(outcome.items[0].title, "Dune");
    assert_eq!(outcome.items[0].line_total, price_cents(2000));
}

#[tokio::test]
async fn test_quantities_are_summed_and_remote_price_kept() {
    let session = local_session();
    LocalCart::new(&session)
        .replace(&[line(1, 2, 700)])
        .await
        .expect("seed local cart");
    let remote = catalog();
    remote.seed_cart_line(USER, line(1, 3, 1000));

    reconcile_cart(&session, &remote, USER).await.expect("merge");

    let merged = remote.cart_line(USER, 1).expect("line for book 1");
    assert_eq!(merged.quantity.get(), 5);
    assert_eq!(merged.unit_price, price_cents(1000));
}

#[tokio::test]
async fn test_every_local_book_ends_at_remote_plus_local() {
    let session = local_session();
    LocalCart::new(&session)
        .replace(&[line(1, 1, 1000), line(2, 4, 850), line(3, 2, 1599)])
        .await
        .expect("seed local cart");
    let remote = catalog();
    remote.seed_cart_line(USER, line(2, 1, 850));
    remote.seed_cart_line(USER, line(3, 10, 1599));

    let outcome = reconcile_cart(&session, &remote, USER).await.expect("merge");

    assert_eq!(remote.quantities(USER), vec![(1, 1), (2, 5), (3, 12)]);
    assert_eq!(outcome.merged, 3);
}

#[tokio::test]
async fn test_remote_only_lines_are_left_alone() {
    let session = local_session();
    LocalCart::new(&session)
        .replace(&[line(1, 1, 1000)])
        .await
        .expect("seed local cart");
    let remote = catalog();
    remote.seed_cart_line(USER, line(3, 2, 1599));

    reconcile_cart(&session, &remote, USER).await.expect("merge");

    assert_eq!(remote.quantities(USER), vec![(1, 1), (3, 2)]);
}

#[tokio::test]
async fn test_empty_local_cart_writes_nothing() {
    let session = local_session();
    let remote = catalog();
    remote.seed_cart_line(USER, line(2, 1, 850));

    let outcome = reconcile_cart(&session, &remote, USER).await.expect("merge");

    assert_eq!(remote.writes(), 0);
    assert_eq!(outcome.merged, 0);
    assert_eq!(outcome.items.len(), 1);
    assert_eq!(outcome.items[0].book_id, BookId::new(2));
}

// =============================================================================
// Partial failure
// =============================================================================

#[tokio::test]
async fn test_rejected_line_does_not_stop_the_others() {
    let session = local_session();
    LocalCart::new(&session)
        .replace(&[line(1, 1, 1000), line(99, 1, 500), line(2, 3, 850)])
        .await
        .expect("seed local cart");
    let remote = catalog();
    remote.reject_writes_for(99);

    let outcome = reconcile_cart(&session, &remote, USER).await.expect("merge");

    assert_eq!(remote.quantities(USER), vec![(1, 1), (2, 3)]);
    assert_eq!(outcome.merged, 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].book_id, BookId::new(99));
    assert!(
        LocalCart::new(&session).items().await.expect("read").is_empty(),
        "local cart must be cleared even after a rejected line"
    );
}

#[tokio::test]
async fn test_quantity_overflow_is_a_line_failure() {
    let session = local_session();
    LocalCart::new(&session)
        .replace(&[line(1, 2, 1000), line(2, 1, 850)])
        .await
        .expect("seed local cart");
    let remote = catalog();
    remote.seed_cart_line(USER, line(1, i64::from(i32::MAX), 1000));

    let outcome = reconcile_cart(&session, &remote, USER).await.expect("merge");

    assert_eq!(outcome.merged, 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].book_id, BookId::new(1));
    assert_eq!(remote.cart_line(USER, 1).map(|l| l.quantity.get()), Some(i32::MAX));
}

// =============================================================================
// Clearing and repetition
// =============================================================================

#[tokio::test]
async fn test_local_cart_is_cleared_after_merge() {
    let session = local_session();
    LocalCart::new(&session)
        .replace(&[line(1, 1, 1000)])
        .await
        .expect("seed local cart");

    reconcile_cart(&session, &catalog(), USER).await.expect("merge");

    let raw = session
        .get_value(session_keys::LOCAL_CART)
        .await
        .expect("session read");
    assert!(raw.is_none());
}

#[tokio::test]
async fn test_second_sync_is_a_no_op() {
    let session = local_session();
    LocalCart::new(&session)
        .replace(&[line(1, 2, 1000)])
        .await
        .expect("seed local cart");
    let remote = catalog();

    reconcile_cart(&session, &remote, USER).await.expect("first merge");
    let writes = remote.writes();
    let outcome = reconcile_cart(&session, &remote, USER).await.expect("second merge");

    assert_eq!(remote.writes(), writes);
    assert_eq!(outcome.merged, 0);
    assert_eq!(remote.quantities(USER), vec![(1, 2)]);
}

#[tokio::test]
async fn test_same_snapshot_merged_twice_double_counts() {
    let session = local_session();
    let remote = catalog();
    let snapshot = [line(1, 2, 1000)];

    for _ in 0..2 {
        LocalCart::new(&session)
            .replace(&snapshot)
            .await
            .expect("seed local cart");
        reconcile_cart(&session, &remote, USER).await.expect("merge");
    }

    assert_eq!(remote.quantities(USER), vec![(1, 4)]);
}

#[tokio::test]
async fn test_malformed_local_cart_is_treated_as_empty() {
    let session = local_session();
    session
        .insert_value(session_keys::LOCAL_CART, serde_json::json!({ "book_id": "nope" }))
        .await
        .expect("session write");
    let remote = catalog();

    let outcome = reconcile_cart(&session, &remote, USER).await.expect("merge");

    assert_eq!(outcome.merged, 0);
    assert_eq!(remote.writes(), 0);
}

#[tokio::test]
async fn test_invalid_local_line_does_not_lose_valid_ones() {
    let session = local_session();
    session
        .insert_value(
            session_keys::LOCAL_CART,
            serde_json::json!([
                { "book_id": 1, "quantity": 2, "price": "10.00" },
                { "book_id": 2, "quantity": 0, "price": "5.00" }
            ]),
        )
        .await
        .expect("session write");
    let remote = catalog();

    let outcome = reconcile_cart(&session, &remote, USER).await.expect("merge");

    assert_eq!(outcome.merged, 1);
    assert!(outcome.failures.is_empty());
    assert_eq!(remote.quantities(USER), vec![(1, 2)]);
    assert!(
        session
            .get_value(session_keys::LOCAL_CART)
            .await
            .expect("session read")
            .is_none()
    );
}

// =============================================================================
// Fatal errors
// =============================================================================

#[tokio::test]
async fn test_remote_read_failure_keeps_local_cart() {
    let session = local_session();
    LocalCart::new(&session)
        .replace(&[line(1, 2, 1000)])
        .await
        .expect("seed local cart");
    let remote = catalog();
    remote.fail_reads(true);

    let err = reconcile_cart(&session, &remote, USER)
        .await
        .expect_err("read failure aborts the merge");

    assert!(matches!(err, ReconcileError::Remote(_)));
    assert_eq!(remote.writes(), 0);
    assert_eq!(
        LocalCart::new(&session).items().await.expect("read"),
        vec![line(1, 2, 1000)]
    );

    remote.fail_reads(false);
    reconcile_cart(&session, &remote, USER).await.expect("retry merges");
    assert_eq!(remote.quantities(USER), vec![(1, 2)]);
}

#[tokio::test]
async fn test_local_store_failure_aborts_before_remote_work() {
    let remote = catalog();

    let err = reconcile_cart(&FailingLocalStore, &remote, USER)
        .await
        .expect_err("local failure aborts the merge");

    assert!(matches!(err, ReconcileError::Local(_)));
    assert!(remote.quantities(USER).is_empty());
}
