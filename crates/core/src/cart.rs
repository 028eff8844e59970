//! Cart and wishlist line items, and the sequence operations shared by the
//! session-held (anonymous) copies.
//!
//! The session copy of a cart is an ordered `Vec<CartLine>`. These functions
//! keep the "one line per book" rule for that vector; the database copy is
//! kept to the same rule by the reconciliation fold.

use serde::{Deserialize, Serialize};

use crate::types::{BookId, Price, Quantity, QuantityError};

/// One book in a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub book_id: BookId,
    pub quantity: Quantity,
    /// Price captured when the line was added.
    #[serde(rename = "price", alias = "unit_price")]
    pub unit_price: Price,
}

impl CartLine {
    #[must_use]
    pub const fn new(book_id: BookId, quantity: Quantity, unit_price: Price) -> Self {
        Self {
            book_id,
            quantity,
            unit_price,
        }
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity.as_u32())
    }
}

/// One book in an anonymous wishlist.
///
/// Extra fields written alongside `book_id` (title, cover) are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WishlistItem {
    pub book_id: BookId,
}

/// Add a line, summing quantities if the book is already present.
///
/// The existing line keeps its original price.
///
/// # Errors
///
/// Returns [`QuantityError::Overflow`] if the summed quantity does not fit.
pub fn add_line(lines: &mut Vec<CartLine>, line: CartLine) -> Result<(), QuantityError> {
    match lines.iter_mut().find(|l| l.book_id == line.book_id) {
        Some(existing) => {
            existing.quantity = existing.quantity.checked_add(line.quantity)?;
        }
        None => lines.push(line),
    }
    Ok(())
}

/// Set a line's quantity. Zero or negative drops the line.
///
/// Returns `false` if the book was not in the cart.
///
/// # Errors
///
/// Returns [`QuantityError::Overflow`] for quantities past the column limit.
pub fn set_line_quantity(
    lines: &mut Vec<CartLine>,
    book_id: BookId,
    quantity: i64,
) -> Result<bool, QuantityError> {
    if quantity <= 0 {
        return Ok(remove_line(lines, book_id));
    }
    let quantity = Quantity::new(quantity)?;
    Ok(lines
        .iter_mut()
        .find(|l| l.book_id == book_id)
        .map(|line| line.quantity = quantity)
        .is_some())
}

/// Drop the line for `book_id`. Returns `true` if a line was removed.
pub fn remove_line(lines: &mut Vec<CartLine>, book_id: BookId) -> bool {
    let before = lines.len();
    lines.retain(|l| l.book_id != book_id);
    lines.len() != before
}

/// Add a book to a wishlist. Returns `false` if it was already there.
pub fn add_wishlist_item(items: &mut Vec<WishlistItem>, book_id: BookId) -> bool {
    if items.iter().any(|i| i.book_id == book_id) {
        return false;
    }
    items.push(WishlistItem { book_id });
    true
}

/// Remove a book from a wishlist. Returns `true` if it was present.
pub fn remove_wishlist_item(items: &mut Vec<WishlistItem>, book_id: BookId) -> bool {
    let before = items.len();
    items.retain(|i| i.book_id != book_id);
    items.len() != before
}
