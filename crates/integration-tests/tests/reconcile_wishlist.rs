//! Merging an anonymous wishlist into the account wishlist.

use bookstore_core::{BookId, UserId};
use bookstore_integration_tests::{MemoryCatalogStore, local_session};
use bookstore_storefront::services::{LocalWishlist, ReconcileError, reconcile_wishlist};

const USER: UserId = UserId::new(7);

fn catalog() -> MemoryCatalogStore {
    MemoryCatalogStore::new()
        .with_book(5, "Middlemarch", 1200)
        .with_book(7, "Beloved", 999)
        .with_book(9, "Solaris", 1450)
}

async fn seed_local(session: &tower_sessions::Session, books: &[i32]) {
    let wishlist = LocalWishlist::new(session);
    for book in books {
        wishlist.add(BookId::new(*book)).await.expect("seed local wishlist");
    }
}

#[tokio::test]
async fn test_already_listed_book_is_not_inserted_again() {
    let session = local_session();
    seed_local(&session, &[7]).await;
    let remote = catalog();
    remote.seed_wishlist(USER, 7);

    let outcome = reconcile_wishlist(&session, &remote, USER).await.expect("merge");

    assert_eq!(remote.wishlist(USER), vec![7]);
    assert_eq!(remote.writes(), 0);
    assert_eq!(outcome.added, 0);
    assert_eq!(outcome.skipped, 1);
}

#[tokio::test]
async fn test_new_books_are_appended() {
    let session = local_session();
    seed_local(&session, &[9, 5]).await;
    let remote = catalog();
    remote.seed_wishlist(USER, 7);

    let outcome = reconcile_wishlist(&session, &remote, USER).await.expect("merge");

    assert_eq!(remote.wishlist(USER), vec![7, 9, 5]);
    assert_eq!(outcome.added, 2);
    let titles: Vec<&str> = outcome.items.iter().map(|item| item.title.as_str()).collect();
    assert_eq!(titles, ["Beloved", "Solaris", "Middlemarch"]);
}

#[tokio::test]
async fn test_duplicate_local_entries_insert_once() {
    let session = local_session();
    // Bypass the deduplicating accessor to store a repeated entry.
    session
        .insert_value(
            bookstore_storefront::models::session_keys::LOCAL_WISHLIST,
            serde_json::json!([{ "book_id": 5 }, { "book_id": 5 }]),
        )
        .await
        .expect("session write");
    let remote = catalog();

    let outcome = reconcile_wishlist(&session, &remote, USER).await.expect("merge");

    assert_eq!(remote.wishlist(USER), vec![5]);
    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.skipped, 1);
    assert!(outcome.failures.is_empty());
}

#[tokio::test]
async fn test_rejected_entry_is_reported_and_local_cleared() {
    let session = local_session();
    seed_local(&session, &[5, 404, 9]).await;
    let remote = catalog();
    remote.reject_writes_for(404);

    let outcome = reconcile_wishlist(&session, &remote, USER).await.expect("merge");

    assert_eq!(remote.wishlist(USER), vec![5, 9]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].book_id, BookId::new(404));
    assert!(LocalWishlist::new(&session).items().await.expect("read").is_empty());
}

#[tokio::test]
async fn test_rerun_with_merged_set_adds_nothing() {
    let session = local_session();
    let remote = catalog();

    seed_local(&session, &[5, 9]).await;
    reconcile_wishlist(&session, &remote, USER).await.expect("first merge");
    seed_local(&session, &[5, 9]).await;
    let outcome = reconcile_wishlist(&session, &remote, USER).await.expect("second merge");

    assert_eq!(remote.wishlist(USER), vec![5, 9]);
    assert_eq!(outcome.added, 0);
    assert_eq!(outcome.skipped, 2);
}

#[tokio::test]
async fn test_remote_read_failure_keeps_local_wishlist() {
    let session = local_session();
    seed_local(&session, &[5]).await;
    let remote = catalog();
    remote.fail_reads(true);

    let err = reconcile_wishlist(&session, &remote, USER)
        .await
        .expect_err("read failure aborts the merge");

    assert!(matches!(err, ReconcileError::Remote(_)));
    assert_eq!(LocalWishlist::new(&session).items().await.expect("read").len(), 1);
}
