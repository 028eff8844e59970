//! Role, moderation, delivery and request status enums.

use serde::{Deserialize, Serialize};

/// Account role, which decides the management endpoints a user may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Shopper. Cart, wishlist and reviews only.
    #[default]
    Customer,
    /// Catalog owner: moderates reviews.
    ProductManager,
    /// Pricing owner: manages discounts.
    SalesManager,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::ProductManager => write!(f, "product_manager"),
            Self::SalesManager => write!(f, "sales_manager"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "product_manager" => Ok(Self::ProductManager),
            "sales_manager" => Ok(Self::SalesManager),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

/// Moderation state of a review.
///
/// Stored as the boolean `approved` column; new reviews start pending and a
/// rejected review is deleted rather than kept with a third state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
}

impl ReviewStatus {
    /// Whether the review is visible on the book page.
    #[must_use]
    pub const fn is_approved(self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl From<bool> for ReviewStatus {
    fn from(approved: bool) -> Self {
        if approved {
            Self::Approved
        } else {
            Self::Pending
        }
    }
}

/// Where an order is on its way to the customer.
///
/// Product managers move an order forward one or more steps; only an
/// approved cancellation moves it to `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "delivery_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    Processing,
    InTransit,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    const fn step(self) -> Option<u8> {
        match self {
            Self::Processing => Some(0),
            Self::InTransit => Some(1),
            Self::Delivered => Some(2),
            Self::Cancelled => None,
        }
    }

    /// Whether a manager may move an order from `self` to `next`.
    ///
    /// Deliveries only move forward, and never into or out of `Cancelled`.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        matches!((self.step(), next.step()), (Some(from), Some(to)) if to > from)
    }

    /// Whether the order can still be cancelled.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::Processing)
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Processing => "processing",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// State of a customer's cancellation or return request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "request_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}
