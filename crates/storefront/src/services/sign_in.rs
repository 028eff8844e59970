//! Sign-in callbacks from the identity provider.
//!
//! The provider checks credentials and then posts the verified identity
//! back, signed with the shared `STOREFRONT_AUTH_SECRET`:
//!
//! ```text
//! signature = hex(HMAC-SHA256(secret, "v1:{timestamp}:{email}"))
//! ```
//!
//! Callbacks older or newer than [`MAX_CLOCK_SKEW_SECS`] are refused so a
//! captured callback cannot be replayed later.

use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use crate::db::{RepositoryError, UserRepository};
use crate::models::CurrentUser;

type HmacSha256 = Hmac<Sha256>;

/// Largest accepted distance between the callback timestamp and our clock.
pub const MAX_CLOCK_SKEW_SECS: i64 = 300;

/// Errors from a sign-in callback.
#[derive(Debug, Error)]
pub enum SignInError {
    #[error("sign-in callback is expired or from the future")]
    Stale,

    #[error("sign-in callback signature does not match")]
    BadSignature,

    #[error("email is required")]
    MissingEmail,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// The identity the provider vouches for.
#[derive(Debug, Clone, Deserialize)]
pub struct SignedIdentity {
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    /// Unix seconds when the provider signed the callback.
    pub timestamp: i64,
    /// Lowercase hex HMAC.
    pub signature: String,
}

fn mac(secret: &SecretString, timestamp: i64, email: &str) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC takes any key length"));
    mac.update(format!("v1:{timestamp}:{email}").as_bytes());
    mac
}

/// Signature the provider is expected to send for `email` at `timestamp`.
#[must_use]
pub fn sign(secret: &SecretString, timestamp: i64, email: &str) -> String {
    hex::encode(mac(secret, timestamp, email).finalize().into_bytes())
}

/// Check a callback's freshness and signature against `now` (unix seconds).
///
/// # Errors
///
/// Returns `SignInError::Stale` or `SignInError::BadSignature`.
pub fn verify(secret: &SecretString, identity: &SignedIdentity, now: i64) -> Result<(), SignInError> {
    if now.abs_diff(identity.timestamp) > MAX_CLOCK_SKEW_SECS.unsigned_abs() {
        return Err(SignInError::Stale);
    }
    let provided = hex::decode(&identity.signature).map_err(|_| SignInError::BadSignature)?;
    // verify_slice compares in constant time
    mac(secret, identity.timestamp, &identity.email)
        .verify_slice(&provided)
        .map_err(|_| SignInError::BadSignature)
}

/// Verify a callback and find or create the account it names.
///
/// # Errors
///
/// Returns `SignInError::Stale`, `SignInError::BadSignature`,
/// `SignInError::MissingEmail`, or a repository error.
#[instrument(skip_all)]
pub async fn authenticate(
    pool: &PgPool,
    secret: &SecretString,
    identity: &SignedIdentity,
) -> Result<CurrentUser, SignInError> {
    verify(secret, identity, Utc::now().timestamp())?;

    let email = identity.email.trim();
    if email.is_empty() {
        return Err(SignInError::MissingEmail);
    }

    let users = UserRepository::new(pool);
    if let Some(user) = users.find_by_email(email).await? {
        tracing::info!(user_id = %user.id, "returning user signed in");
        return Ok(user);
    }

    let full_name = match identity.full_name.trim() {
        "" => email,
        name => name,
    };
    let user = match users.create_customer(email, full_name).await {
        Ok(user) => user,
        // Two first sign-ins raced; the other one created the row.
        Err(RepositoryError::Conflict(_)) => users
            .find_by_email(email)
            .await?
            .ok_or(RepositoryError::NotFound)?,
        Err(e) => return Err(e.into()),
    };
    tracing::info!(user_id = %user.id, "new customer signed in");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000;

    fn secret() -> SecretString {
        SecretString::from("k9$Pq2!vX7@mZ4#tR8&wL1*yN6^bC3%h")
    }

    fn identity(timestamp: i64, signature: String) -> SignedIdentity {
        SignedIdentity {
            email: "reader@example.com".into(),
            full_name: "Avid Reader".into(),
            timestamp,
            signature,
        }
    }

    #[test]
    fn test_valid_signature_verifies() {
        let signed = identity(NOW, sign(&secret(), NOW, "reader@example.com"));
        assert!(verify(&secret(), &signed, NOW + 10).is_ok());
    }

    #[test]
    fn test_signature_binds_email_and_secret() {
        let mut signed = identity(NOW, sign(&secret(), NOW, "reader@example.com"));
        signed.email = "admin@example.com".into();
        assert!(matches!(verify(&secret(), &signed, NOW), Err(SignInError::BadSignature)));

        let signed = identity(NOW, sign(&SecretString::from("another"), NOW, "reader@example.com"));
        assert!(matches!(verify(&secret(), &signed, NOW), Err(SignInError::BadSignature)));

        let signed = identity(NOW, "not hex".into());
        assert!(matches!(verify(&secret(), &signed, NOW), Err(SignInError::BadSignature)));
    }

    #[test]
    fn test_stale_callbacks_are_refused() {
        let old = NOW - MAX_CLOCK_SKEW_SECS - 1;
        let signed = identity(old, sign(&secret(), old, "reader@example.com"));
        assert!(matches!(verify(&secret(), &signed, NOW), Err(SignInError::Stale)));

        let future = NOW + MAX_CLOCK_SKEW_SECS + 1;
        let signed = identity(future, sign(&secret(), future, "reader@example.com"));
        assert!(matches!(verify(&secret(), &signed, NOW), Err(SignInError::Stale)));

        let edge = NOW - MAX_CLOCK_SKEW_SECS;
        let signed = identity(edge, sign(&secret(), edge, "reader@example.com"));
        assert!(verify(&secret(), &signed, NOW).is_ok());
    }
}
