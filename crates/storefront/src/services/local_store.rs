//! The visitor's local store: anonymous carts and wishlists held in the
//! session.
//!
//! [`LocalStore`] is the key/value port; [`LocalCart`] and [`LocalWishlist`]
//! read and write typed sequences through it. A stored value that is not an
//! array is logged and treated as empty; within an array, each entry that
//! fails to decode is logged and skipped, so one corrupt line never costs the
//! visitor the rest of their cart.

use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tower_sessions::Session;

use bookstore_core::cart::{
    add_line, add_wishlist_item, remove_line, remove_wishlist_item, set_line_quantity,
};
use bookstore_core::{BookId, CartLine, QuantityError, WishlistItem};

use crate::models::session_keys;

/// Errors from the local store.
#[derive(Debug, Error)]
pub enum LocalStoreError {
    /// The session backend failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// A non-session backend failed.
    #[error("local store unavailable: {0}")]
    Unavailable(String),

    /// A sequence could not be encoded for storage.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// A quantity update produced an invalid quantity.
    #[error(transparent)]
    Quantity(#[from] QuantityError),
}

/// Per-visitor key/value storage.
pub trait LocalStore: Send + Sync {
    /// Read the raw value stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>, LocalStoreError>> + Send;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: Value) -> impl Future<Output = Result<(), LocalStoreError>> + Send;

    /// Remove `key`.
    fn clear(&self, key: &str) -> impl Future<Output = Result<(), LocalStoreError>> + Send;
}

impl LocalStore for Session {
    async fn get(&self, key: &str) -> Result<Option<Value>, LocalStoreError> {
        Ok(Self::get_value(self, key).await?)
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), LocalStoreError> {
        Self::insert_value(self, key, value).await?;
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), LocalStoreError> {
        Self::remove_value(self, key).await?;
        Ok(())
    }
}

/// Decode a stored sequence. Absent data or a value that is not an array
/// reads as empty; an element that fails to decode is dropped on its own.
async fn read_sequence<S, T>(store: &S, key: &str) -> Result<Vec<T>, LocalStoreError>
where
    S: LocalStore,
    T: DeserializeOwned,
{
    let Some(raw) = store.get(key).await? else {
        return Ok(Vec::new());
    };
    let elements = match serde_json::from_value::<Vec<Value>>(raw) {
        Ok(elements) => elements,
        Err(e) => {
            tracing::warn!(key, error = %e, "discarding malformed local data");
            return Ok(Vec::new());
        }
    };
    Ok(elements
        .into_iter()
        .enumerate()
        .filter_map(|(index, element)| match serde_json::from_value(element) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(key, index, error = %e, "dropping malformed local entry");
                None
            }
        })
        .collect())
}

async fn write_sequence<S, T>(store: &S, key: &str, items: &[T]) -> Result<(), LocalStoreError>
where
    S: LocalStore,
    T: Serialize,
{
    store.set(key, serde_json::to_value(items)?).await
}

/// The anonymous cart.
pub struct LocalCart<'a, S> {
    store: &'a S,
}

impl<'a, S: LocalStore> LocalCart<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Current lines, in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns `LocalStoreError` if the backend fails. Malformed data is not
    /// an error.
    pub async fn items(&self) -> Result<Vec<CartLine>, LocalStoreError> {
        read_sequence(self.store, session_keys::LOCAL_CART).await
    }

    /// Overwrite the whole cart.
    ///
    /// # Errors
    ///
    /// Returns `LocalStoreError` if the backend fails.
    pub async fn replace(&self, lines: &[CartLine]) -> Result<(), LocalStoreError> {
        write_sequence(self.store, session_keys::LOCAL_CART, lines).await
    }

    /// Add a line, summing into an existing line for the same book.
    ///
    /// # Errors
    ///
    /// Returns `LocalStoreError::Quantity` if the sum overflows, or a backend
    /// error.
    pub async fn add(&self, line: CartLine) -> Result<Vec<CartLine>, LocalStoreError> {
        let mut lines = self.items().await?;
        add_line(&mut lines, line)?;
        self.replace(&lines).await?;
        Ok(lines)
    }

    /// Set a line's quantity; zero or below removes it. Unknown books are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns `LocalStoreError::Quantity` for an out-of-range quantity, or a
    /// backend error.
    pub async fn set_quantity(
        &self,
        book_id: BookId,
        quantity: i64,
    ) -> Result<Vec<CartLine>, LocalStoreError> {
        let mut lines = self.items().await?;
        if set_line_quantity(&mut lines, book_id, quantity)? {
            self.replace(&lines).await?;
        }
        Ok(lines)
    }

    /// Remove the line for `book_id`.
    ///
    /// # Errors
    ///
    /// Returns `LocalStoreError` if the backend fails.
    pub async fn remove(&self, book_id: BookId) -> Result<Vec<CartLine>, LocalStoreError> {
        let mut lines = self.items().await?;
        if remove_line(&mut lines, book_id) {
            self.replace(&lines).await?;
        }
        Ok(lines)
    }

    /// Drop the cart entirely.
    ///
    /// # Errors
    ///
    /// Returns `LocalStoreError` if the backend fails.
    pub async fn clear(&self) -> Result<(), LocalStoreError> {
        self.store.clear(session_keys::LOCAL_CART).await
    }
}

/// The anonymous wishlist.
pub struct LocalWishlist<'a, S> {
    store: &'a S,
}

impl<'a, S: LocalStore> LocalWishlist<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Current entries, in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns `LocalStoreError` if the backend fails.
    pub async fn items(&self) -> Result<Vec<WishlistItem>, LocalStoreError> {
        read_sequence(self.store, session_keys::LOCAL_WISHLIST).await
    }

    /// Add a book. Already-listed books are left alone.
    ///
    /// # Errors
    ///
    /// Returns `LocalStoreError` if the backend fails.
    pub async fn add(&self, book_id: BookId) -> Result<Vec<WishlistItem>, LocalStoreError> {
        let mut items = self.items().await?;
        if add_wishlist_item(&mut items, book_id) {
            write_sequence(self.store, session_keys::LOCAL_WISHLIST, &items).await?;
        }
        Ok(items)
    }

    /// Remove a book.
    ///
    /// # Errors
    ///
    /// Returns `LocalStoreError` if the backend fails.
    pub async fn remove(&self, book_id: BookId) -> Result<Vec<WishlistItem>, LocalStoreError> {
        let mut items = self.items().await?;
        if remove_wishlist_item(&mut items, book_id) {
            write_sequence(self.store, session_keys::LOCAL_WISHLIST, &items).await?;
        }
        Ok(items)
    }

    /// Drop the wishlist entirely.
    ///
    /// # Errors
    ///
    /// Returns `LocalStoreError` if the backend fails.
    pub async fn clear(&self) -> Result<(), LocalStoreError> {
        self.store.clear(session_keys::LOCAL_WISHLIST).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use serde_json::json;
    use tower_sessions::MemoryStore;

    use bookstore_core::{Price, Quantity};

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn line(book: i32, qty: i64, price: i64) -> CartLine {
        CartLine::new(
            BookId::new(book),
            Quantity::new(qty).unwrap(),
            Price::new(Decimal::from(price)).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_empty_session_reads_empty() {
        let session = session();
        assert!(LocalCart::new(&session).items().await.unwrap().is_empty());
        assert!(LocalWishlist::new(&session).items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_cart_reads_empty() {
        let session = session();
        LocalStore::set(&session, session_keys::LOCAL_CART, json!({"not": "a list"}))
            .await
            .unwrap();
        assert!(LocalCart::new(&session).items().await.unwrap().is_empty());

        LocalStore::set(&session, session_keys::LOCAL_CART, json!([{"book_id": 1, "quantity": 0, "price": "1.00"}]))
            .await
            .unwrap();
        assert!(LocalCart::new(&session).items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_entry_does_not_drop_its_neighbours() {
        let session = session();
        LocalStore::set(
            &session,
            session_keys::LOCAL_CART,
            json!([
                {"book_id": 1, "quantity": 2, "price": "10.00"},
                {"book_id": 2, "quantity": 0, "price": "5.00"},
                {"book_id": 3, "quantity": 1, "price": "-4.00"},
                "garbage",
                {"book_id": 4, "quantity": 1, "price": "4.00"}
            ]),
        )
        .await
        .unwrap();
        assert_eq!(
            LocalCart::new(&session).items().await.unwrap(),
            vec![line(1, 2, 10), line(4, 1, 4)]
        );

        LocalStore::set(&session, session_keys::LOCAL_WISHLIST, json!([{"book_id": 9}, {"isbn": "x"}]))
            .await
            .unwrap();
        assert_eq!(
            LocalWishlist::new(&session).items().await.unwrap(),
            vec![WishlistItem { book_id: BookId::new(9) }]
        );
    }

    #[tokio::test]
    async fn test_add_sums_existing_line() {
        let session = session();
        let cart = LocalCart::new(&session);
        cart.add(line(1, 2, 10)).await.unwrap();
        cart.add(line(2, 1, 4)).await.unwrap();
        let lines = cart.add(line(1, 3, 12)).await.unwrap();

        assert_eq!(lines, vec![line(1, 5, 10), line(2, 1, 4)]);
        assert_eq!(cart.items().await.unwrap(), lines);
    }

    #[tokio::test]
    async fn test_set_quantity_zero_drops_line() {
        let session = session();
        let cart = LocalCart::new(&session);
        cart.replace(&[line(1, 2, 10), line(2, 1, 4)]).await.unwrap();

        let lines = cart.set_quantity(BookId::new(1), 6).await.unwrap();
        assert_eq!(lines.first().map(|l| l.quantity.get()), Some(6));

        let lines = cart.set_quantity(BookId::new(2), 0).await.unwrap();
        assert_eq!(lines, vec![line(1, 6, 10)]);
        assert_eq!(cart.items().await.unwrap(), lines);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let session = session();
        let cart = LocalCart::new(&session);
        cart.replace(&[line(1, 2, 10), line(2, 1, 4)]).await.unwrap();

        assert_eq!(cart.remove(BookId::new(1)).await.unwrap(), vec![line(2, 1, 4)]);
        cart.clear().await.unwrap();
        assert!(cart.items().await.unwrap().is_empty());
        assert!(LocalStore::get(&session, session_keys::LOCAL_CART).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wishlist_add_ignores_duplicates() {
        let session = session();
        let wishlist = LocalWishlist::new(&session);
        wishlist.add(BookId::new(7)).await.unwrap();
        let items = wishlist.add(BookId::new(7)).await.unwrap();
        assert_eq!(items, vec![WishlistItem { book_id: BookId::new(7) }]);

        assert!(wishlist.remove(BookId::new(7)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stored_cart_uses_price_key() {
        let session = session();
        LocalCart::new(&session).replace(&[line(3, 1, 8)]).await.unwrap();
        let raw = LocalStore::get(&session, session_keys::LOCAL_CART)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(raw[0]["book_id"], json!(3));
        assert!(raw[0].get("price").is_some());
    }
}
