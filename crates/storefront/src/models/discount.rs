//! Discount types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bookstore_core::{DiscountId, DiscountRate, DiscountWindow, Price};

/// A discount row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Discount {
    pub id: DiscountId,
    pub name: String,
    pub rate: DiscountRate,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl Discount {
    #[must_use]
    pub const fn window(&self) -> DiscountWindow {
        DiscountWindow {
            starts_at: self.starts_at,
            ends_at: self.ends_at,
        }
    }
}

/// The discount currently applied to a book and the resulting price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookDiscount {
    pub discount: Discount,
    pub list_price: Price,
    pub discounted_price: Price,
}

impl BookDiscount {
    #[must_use]
    pub fn new(discount: Discount, list_price: Price) -> Self {
        let discounted_price = discount.rate.apply(list_price);
        Self {
            discount,
            list_price,
            discounted_price,
        }
    }
}
