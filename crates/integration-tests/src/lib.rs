//! Test doubles for the storefront's storage ports.
//!
//! [`MemoryCatalogStore`] stands in for `PostgreSQL` behind the
//! [`CatalogStore`] port, with switches for rejecting writes on chosen books
//! and failing reads outright. [`FailingLocalStore`] is a local store whose
//! backend is down. Local data otherwise lives in a real
//! [`tower_sessions::Session`] over a `MemoryStore`, see [`local_session`].
//!
//! Tests named `pg_*` run against `PostgreSQL` under `#[sqlx::test]`, which
//! creates a throwaway database per test and applies the storefront
//! migrations; [`pg`] seeds it.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bookstore-integration-tests
//! DATABASE_URL=postgres://localhost/postgres cargo test -p bookstore-integration-tests --test 'pg_*'
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc)]

pub mod pg;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use rust_decimal::Decimal;
use serde_json::Value;
use tower_sessions::{MemoryStore, Session};

use bookstore_core::{BookId, CartId, CartLine, Price, Quantity, UserId};
use bookstore_storefront::db::RepositoryError;
use bookstore_storefront::models::{BookSummary, CartItemView, WishlistItemView};
use bookstore_storefront::services::{CatalogStore, LocalStore, LocalStoreError};

/// A fresh session backed by an in-memory store.
#[must_use]
pub fn local_session() -> Session {
    Session::new(None, Arc::new(MemoryStore::default()), None)
}

/// Price from a whole number of cents.
#[must_use]
pub fn price_cents(cents: i64) -> Price {
    Price::new(Decimal::new(cents, 2)).expect("non-negative price")
}

/// A cart line for `book` at `cents`.
#[must_use]
pub fn line(book: i32, quantity: i64, cents: i64) -> CartLine {
    CartLine::new(
        BookId::new(book),
        Quantity::new(quantity).expect("positive quantity"),
        price_cents(cents),
    )
}

#[derive(Default)]
struct State {
    books: HashMap<BookId, BookSummary>,
    carts: HashMap<UserId, CartId>,
    lines: HashMap<CartId, Vec<CartLine>>,
    wishlists: HashMap<UserId, Vec<BookId>>,
    rejected: HashSet<BookId>,
    fail_reads: bool,
    writes: usize,
}

/// In-memory [`CatalogStore`].
#[derive(Default)]
pub struct MemoryCatalogStore {
    state: Mutex<State>,
}

impl MemoryCatalogStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("catalog state poisoned")
    }

    /// Add a book to the catalog.
    #[must_use]
    pub fn with_book(self, id: i32, title: &str, cents: i64) -> Self {
        let book_id = BookId::new(id);
        self.state().books.insert(
            book_id,
            BookSummary {
                id: book_id,
                title: title.to_string(),
                price: price_cents(cents),
                image_url: None,
            },
        );
        self
    }

    /// Make every cart or wishlist write for `book` fail.
    pub fn reject_writes_for(&self, book: i32) {
        self.state().rejected.insert(BookId::new(book));
    }

    /// Make cart and wishlist reads fail.
    pub fn fail_reads(&self, fail: bool) {
        self.state().fail_reads = fail;
    }

    /// Put a line straight into the user's cart, bypassing write accounting.
    pub fn seed_cart_line(&self, user_id: UserId, line: CartLine) {
        let mut state = self.state();
        let cart_id = cart_for(&mut state, user_id);
        state.lines.entry(cart_id).or_default().push(line);
    }

    /// Put a book straight onto the user's wishlist.
    pub fn seed_wishlist(&self, user_id: UserId, book: i32) {
        self.state()
            .wishlists
            .entry(user_id)
            .or_default()
            .push(BookId::new(book));
    }

    /// The user's cart lines as `(book, quantity)`, sorted by book.
    #[must_use]
    pub fn quantities(&self, user_id: UserId) -> Vec<(i32, i32)> {
        let state = self.state();
        let mut quantities: Vec<(i32, i32)> = state
            .carts
            .get(&user_id)
            .and_then(|cart_id| state.lines.get(cart_id))
            .map(|lines| {
                lines
                    .iter()
                    .map(|line| (line.book_id.as_i32(), line.quantity.get()))
                    .collect()
            })
            .unwrap_or_default();
        quantities.sort_unstable();
        quantities
    }

    /// The user's cart line for `book`.
    #[must_use]
    pub fn cart_line(&self, user_id: UserId, book: i32) -> Option<CartLine> {
        let state = self.state();
        let cart_id = state.carts.get(&user_id)?;
        state
            .lines
            .get(cart_id)?
            .iter()
            .find(|line| line.book_id == BookId::new(book))
            .copied()
    }

    /// The user's wishlist, in insertion order.
    #[must_use]
    pub fn wishlist(&self, user_id: UserId) -> Vec<i32> {
        self.state()
            .wishlists
            .get(&user_id)
            .map(|ids| ids.iter().map(BookId::as_i32).collect())
            .unwrap_or_default()
    }

    /// Successful inserts, updates and deletes so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.state().writes
    }
}

fn cart_for(state: &mut State, user_id: UserId) -> CartId {
    let next = CartId::new(i32::try_from(state.carts.len()).unwrap_or(i32::MAX) + 1);
    *state.carts.entry(user_id).or_insert(next)
}

fn read_guard(state: &State) -> Result<(), RepositoryError> {
    if state.fail_reads {
        return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
    }
    Ok(())
}

fn write_guard(state: &State, book_id: BookId) -> Result<(), RepositoryError> {
    if state.rejected.contains(&book_id) {
        return Err(RepositoryError::ForeignKey(format!(
            "book {book_id} references a missing row"
        )));
    }
    Ok(())
}

impl CatalogStore for MemoryCatalogStore {
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<CartId, RepositoryError> {
        let mut state = self.state();
        read_guard(&state)?;
        Ok(cart_for(&mut state, user_id))
    }

    async fn cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let state = self.state();
        read_guard(&state)?;
        Ok(state.lines.get(&cart_id).cloned().unwrap_or_default())
    }

    async fn insert_cart_line(&self, cart_id: CartId, line: CartLine) -> Result<(), RepositoryError> {
        let mut state = self.state();
        write_guard(&state, line.book_id)?;
        let lines = state.lines.entry(cart_id).or_default();
        if lines.iter().any(|existing| existing.book_id == line.book_id) {
            return Err(RepositoryError::Conflict("cart item already exists".to_string()));
        }
        lines.push(line);
        state.writes += 1;
        Ok(())
    }

    async fn update_cart_quantity(
        &self,
        cart_id: CartId,
        book_id: BookId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state();
        write_guard(&state, book_id)?;
        let line = state
            .lines
            .get_mut(&cart_id)
            .and_then(|lines| lines.iter_mut().find(|line| line.book_id == book_id))
            .ok_or(RepositoryError::NotFound)?;
        line.quantity = quantity;
        state.writes += 1;
        Ok(())
    }

    async fn delete_cart_line(&self, cart_id: CartId, book_id: BookId) -> Result<bool, RepositoryError> {
        let mut state = self.state();
        write_guard(&state, book_id)?;
        let Some(lines) = state.lines.get_mut(&cart_id) else {
            return Ok(false);
        };
        let before = lines.len();
        lines.retain(|line| line.book_id != book_id);
        let removed = lines.len() < before;
        if removed {
            state.writes += 1;
        }
        Ok(removed)
    }

    async fn cart_view(&self, cart_id: CartId) -> Result<Vec<CartItemView>, RepositoryError> {
        let state = self.state();
        read_guard(&state)?;
        let lines = state.lines.get(&cart_id).map_or(&[][..], Vec::as_slice);
        Ok(lines
            .iter()
            .filter_map(|line| {
                let book = state.books.get(&line.book_id)?;
                Some(CartItemView {
                    book_id: line.book_id,
                    title: book.title.clone(),
                    image_url: book.image_url.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    catalog_price: book.price,
                    line_total: line.line_total(),
                })
            })
            .collect())
    }

    async fn wishlist_book_ids(&self, user_id: UserId) -> Result<Vec<BookId>, RepositoryError> {
        let state = self.state();
        read_guard(&state)?;
        Ok(state.wishlists.get(&user_id).cloned().unwrap_or_default())
    }

    async fn insert_wishlist_entry(&self, user_id: UserId, book_id: BookId) -> Result<(), RepositoryError> {
        let mut state = self.state();
        write_guard(&state, book_id)?;
        let ids = state.wishlists.entry(user_id).or_default();
        if ids.contains(&book_id) {
            return Err(RepositoryError::Conflict("wishlist entry already exists".to_string()));
        }
        ids.push(book_id);
        state.writes += 1;
        Ok(())
    }

    async fn delete_wishlist_entry(&self, user_id: UserId, book_id: BookId) -> Result<bool, RepositoryError> {
        let mut state = self.state();
        let Some(ids) = state.wishlists.get_mut(&user_id) else {
            return Ok(false);
        };
        let before = ids.len();
        ids.retain(|id| *id != book_id);
        let removed = ids.len() < before;
        if removed {
            state.writes += 1;
        }
        Ok(removed)
    }

    async fn wishlist_view(&self, user_id: UserId) -> Result<Vec<WishlistItemView>, RepositoryError> {
        let state = self.state();
        read_guard(&state)?;
        let ids = state.wishlists.get(&user_id).map_or(&[][..], Vec::as_slice);
        Ok(ids
            .iter()
            .map(|id| {
                state.books.get(id).map_or_else(
                    || WishlistItemView::unknown(*id),
                    |book| WishlistItemView {
                        book_id: *id,
                        title: book.title.clone(),
                        image_url: book.image_url.clone(),
                    },
                )
            })
            .collect())
    }

    async fn book(&self, book_id: BookId) -> Result<Option<BookSummary>, RepositoryError> {
        Ok(self.state().books.get(&book_id).cloned())
    }
}

/// A local store whose backend is unreachable.
pub struct FailingLocalStore;

impl LocalStore for FailingLocalStore {
    async fn get(&self, _key: &str) -> Result<Option<Value>, LocalStoreError> {
        Err(LocalStoreError::Unavailable("session backend down".to_string()))
    }

    async fn set(&self, _key: &str, _value: Value) -> Result<(), LocalStoreError> {
        Err(LocalStoreError::Unavailable("session backend down".to_string()))
    }

    async fn clear(&self, _key: &str) -> Result<(), LocalStoreError> {
        Err(LocalStoreError::Unavailable("session backend down".to_string()))
    }
}
