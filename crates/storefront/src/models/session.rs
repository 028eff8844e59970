//! Session-related types.
//!
//! The session holds two kinds of data: the signed-in identity, written by
//! the authentication integration, and the anonymous visitor's cart and
//! wishlist, which are merged into the database on the first sync after
//! sign-in.

use serde::{Deserialize, Serialize};

use bookstore_core::{UserId, UserRole};

/// Session-stored user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Role, checked by the management extractors.
    pub role: UserRole,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the anonymous cart (a JSON array of cart lines).
    pub const LOCAL_CART: &str = "cart";

    /// Key for the anonymous wishlist (a JSON array of `{ book_id }`).
    pub const LOCAL_WISHLIST: &str = "wishlist";
}
