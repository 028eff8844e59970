//! User repository.
//!
//! Credentials live with the sign-in provider; this table holds the account
//! row that carts, wishlists, orders and roles hang off.

use sqlx::PgPool;

use bookstore_core::{UserId, UserRole};

use super::RepositoryError;
use crate::models::CurrentUser;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    full_name: String,
    role: UserRole,
}

impl From<UserRow> for CurrentUser {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.full_name,
            role: row.role,
        }
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look a user up by email (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<CurrentUser>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, full_name, role FROM users WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(CurrentUser::from))
    }

    /// Create a customer account for a first-time sign-in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email was registered
    /// concurrently. Returns `RepositoryError::Database` for other errors.
    pub async fn create_customer(&self, email: &str, full_name: &str) -> Result<CurrentUser, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users (email, full_name)
            VALUES (lower($1), $2)
            RETURNING id, full_name, role
            ",
        )
        .bind(email)
        .bind(full_name)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "user"))?;
        Ok(row.into())
    }
}
