//! Order, delivery and after-sale types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bookstore_core::{
    BookId, CancellationId, DeliveryStatus, OrderId, Price, Quantity, RequestStatus, ReturnId,
    UserId,
};

/// A placed order with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total: Price,
    pub shipping_address: String,
    pub delivery_status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// One book on an order, charged at `item_price` per copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub book_id: BookId,
    pub title: String,
    pub image_url: Option<String>,
    pub quantity: Quantity,
    pub item_price: Price,
}

/// A book's shelf count, for the stock dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct StockLevel {
    pub id: BookId,
    pub title: String,
    pub stock: i32,
}

/// An order's delivery, with who it is going to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Delivery {
    pub order_id: OrderId,
    pub customer: String,
    pub shipping_address: String,
    pub status: DeliveryStatus,
    pub last_updated: DateTime<Utc>,
}

/// A customer's request to cancel copies of a book before it ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CancellationRequest {
    pub id: CancellationId,
    pub order_id: OrderId,
    pub book_id: BookId,
    pub book_title: String,
    pub customer: String,
    pub quantity: Quantity,
    pub reason: String,
    pub other_reason: Option<String>,
    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
}

/// A customer's request to send back delivered copies for a refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ReturnRequest {
    pub id: ReturnId,
    pub order_id: OrderId,
    pub book_id: BookId,
    pub book_title: String,
    pub customer: String,
    pub quantity: Quantity,
    pub item_price: Price,
    pub reason: String,
    pub other_reason: Option<String>,
    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
}

impl ReturnRequest {
    /// What the customer gets back if the return is approved.
    #[must_use]
    pub fn refund(&self) -> Price {
        self.item_price.times(self.quantity.as_u32())
    }
}

/// One page of a listing plus the total across all pages.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}
