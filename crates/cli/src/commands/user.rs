//! Staff role management.
//!
//! Accounts sign up as customers; promoting one to product or sales manager
//! happens here rather than over HTTP.
//!
//! # Usage
//!
//! ```bash
//! bs-cli user role -e manager@example.com -r sales_manager
//! ```

use secrecy::ExposeSecret;
use sqlx::PgPool;

use bookstore_core::{UserId, UserRole};

use super::{CommandError, database_url};

/// Set the role of the account registered under `email`.
///
/// # Errors
///
/// Returns `InvalidRole` for an unknown role name and `UnknownUser` when no
/// account has that email.
pub async fn set_role(email: &str, role: &str) -> Result<UserId, CommandError> {
    let role: UserRole = role.parse().map_err(CommandError::InvalidRole)?;
    let email = email.trim().to_lowercase();

    let url = database_url()?;
    let pool = PgPool::connect(url.expose_secret()).await?;

    let user_id = sqlx::query_scalar::<_, UserId>(
        "UPDATE users SET role = $1 WHERE lower(email) = $2 RETURNING id",
    )
    .bind(role)
    .bind(&email)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| CommandError::UnknownUser(email.clone()))?;

    tracing::info!(user_id = %user_id, email = %email, role = %role, "Role updated");
    Ok(user_id)
}
