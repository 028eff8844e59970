//! Cart and wishlist views returned to clients.

use rust_decimal::Decimal;
use serde::Serialize;

use bookstore_core::{BookId, Price, Quantity};

/// A cart line joined with its book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItemView {
    pub book_id: BookId,
    pub title: String,
    pub image_url: Option<String>,
    pub quantity: Quantity,
    /// Price captured on the line.
    pub unit_price: Price,
    /// Current catalog price, which may have moved since the line was added.
    pub catalog_price: Price,
    pub line_total: Price,
}

/// A wishlist entry joined with its book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WishlistItemView {
    pub book_id: BookId,
    pub title: String,
    pub image_url: Option<String>,
}

impl WishlistItemView {
    /// Title shown for an entry whose book has left the catalog.
    pub const UNKNOWN_TITLE: &'static str = "Unknown Title";

    /// View for an entry whose book could not be found.
    #[must_use]
    pub fn unknown(book_id: BookId) -> Self {
        Self {
            book_id,
            title: Self::UNKNOWN_TITLE.to_string(),
            image_url: None,
        }
    }
}

/// A cart with its running totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    pub items: Vec<CartItemView>,
    pub subtotal: Price,
    pub item_count: u32,
}

impl From<Vec<CartItemView>> for CartSummary {
    fn from(items: Vec<CartItemView>) -> Self {
        let subtotal: Decimal = items.iter().map(|item| item.line_total.amount()).sum();
        let item_count = items
            .iter()
            .fold(0_u32, |count, item| count.saturating_add(item.quantity.as_u32()));
        Self {
            subtotal: Price::new(subtotal).unwrap_or(Price::ZERO),
            item_count,
            items,
        }
    }
}
