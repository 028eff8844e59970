//! Domain models for the storefront.
//!
//! These are the shapes handlers serialize and services pass around; raw
//! database rows stay private to the `db` modules.

pub mod book;
pub mod cart;
pub mod discount;
pub mod order;
pub mod review;
pub mod session;

pub use book::{BestSeller, Book, BookSummary, RatedBook};
pub use cart::{CartItemView, CartSummary, WishlistItemView};
pub use discount::{BookDiscount, Discount};
pub use order::{
    CancellationRequest, Delivery, Order, OrderItem, Page, ReturnRequest, StockLevel,
};
pub use review::{PendingReview, Review};
pub use session::{CurrentUser, keys as session_keys};
