//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use bookstore_core::UserId;

use crate::db::RepositoryError;
use crate::services::after_sale::AfterSaleError;
use crate::services::cart::CartError;
use crate::services::deliveries::DeliveryError;
use crate::services::discounts::DiscountError;
use crate::services::inventory::InventoryError;
use crate::services::local_store::LocalStoreError;
use crate::services::orders::OrderError;
use crate::services::reconcile::ReconcileError;
use crate::services::reviews::ReviewError;
use crate::services::sign_in::SignInError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Cart or wishlist operation failed.
    #[error("{0}")]
    Cart(#[from] CartError),

    /// Merging local data into the account failed.
    #[error("Sync error: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("{0}")]
    Discount(#[from] DiscountError),

    #[error("{0}")]
    Review(#[from] ReviewError),

    /// Checkout or order lookup failed.
    #[error("{0}")]
    Order(#[from] OrderError),

    #[error("{0}")]
    Inventory(#[from] InventoryError),

    #[error("{0}")]
    Delivery(#[from] DeliveryError),

    /// Cancellation or return failed.
    #[error("{0}")]
    AfterSale(#[from] AfterSaleError),

    /// Sign-in callback was refused.
    #[error("{0}")]
    SignIn(#[from] SignInError),

    /// Session could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound | RepositoryError::ForeignKey(_) => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

const fn local_status(err: &LocalStoreError) -> StatusCode {
    match err {
        LocalStoreError::Quantity(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Cart(err) => match err {
                CartError::BookNotFound(_) | CartError::NotInCart(_) => StatusCode::NOT_FOUND,
                CartError::Quantity(_) => StatusCode::BAD_REQUEST,
                CartError::Local(err) => local_status(err),
                CartError::Repository(err) => repository_status(err),
            },
            Self::Reconcile(err) => match err {
                ReconcileError::Local(err) => local_status(err),
                ReconcileError::Remote(err) => repository_status(err),
            },
            Self::Discount(err) => match err {
                DiscountError::BookNotFound(_) => StatusCode::NOT_FOUND,
                DiscountError::EmptyName | DiscountError::EndsInPast => StatusCode::BAD_REQUEST,
                DiscountError::Repository(err) => repository_status(err),
            },
            Self::Review(err) => match err {
                ReviewError::InvalidRating(_) => StatusCode::BAD_REQUEST,
                ReviewError::BookNotFound(_) | ReviewError::NotFound(_) => StatusCode::NOT_FOUND,
                ReviewError::Repository(err) => repository_status(err),
            },
            Self::Order(err) => match err {
                OrderError::EmptyCart | OrderError::MissingAddress | OrderError::AddressTooLong => {
                    StatusCode::BAD_REQUEST
                }
                OrderError::InsufficientStock(_) => StatusCode::CONFLICT,
                OrderError::NotFound(_) => StatusCode::NOT_FOUND,
                OrderError::Repository(err) => repository_status(err),
            },
            Self::Inventory(err) => match err {
                InventoryError::InvalidStock(_) => StatusCode::BAD_REQUEST,
                InventoryError::BookNotFound(_) => StatusCode::NOT_FOUND,
                InventoryError::Repository(err) => repository_status(err),
            },
            Self::Delivery(err) => match err {
                DeliveryError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                DeliveryError::InvalidTransition { .. } | DeliveryError::Changed(_) => {
                    StatusCode::CONFLICT
                }
                DeliveryError::Repository(err) => repository_status(err),
            },
            Self::AfterSale(err) => match err {
                AfterSaleError::MissingReason
                | AfterSaleError::ReasonTooLong
                | AfterSaleError::TooMany { .. } => StatusCode::BAD_REQUEST,
                AfterSaleError::NotOnOrder { .. }
                | AfterSaleError::CancellationNotFound(_)
                | AfterSaleError::ReturnNotFound(_) => StatusCode::NOT_FOUND,
                AfterSaleError::NotCancellable { .. }
                | AfterSaleError::NotReturnable { .. }
                | AfterSaleError::ReturnWindowClosed(_)
                | AfterSaleError::Conflict(_) => StatusCode::CONFLICT,
                AfterSaleError::Repository(err) => repository_status(err),
            },
            Self::SignIn(err) => match err {
                SignInError::Stale | SignInError::BadSignature => StatusCode::UNAUTHORIZED,
                SignInError::MissingEmail => StatusCode::BAD_REQUEST,
                SignInError::Repository(err) => repository_status(err),
            },
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Attach the signed-in user to subsequent Sentry events.
pub fn set_sentry_user(user_id: UserId, name: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(name.to_owned()),
            ..Default::default()
        }));
    });
}

/// Detach the user after sign-out.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| scope.set_user(None));
}

/// Record a step in the trail attached to the next Sentry event.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    sentry::add_breadcrumb(sentry::Breadcrumb {
        category: Some(category.to_owned()),
        message: Some(message.to_owned()),
        level: sentry::Level::Info,
        data: data
            .iter()
            .map(|(key, value)| ((*key).to_owned(), serde_json::Value::from(*value)))
            .collect(),
        ..Default::default()
    });
}
