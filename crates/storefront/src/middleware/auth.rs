//! Authentication extractors.
//!
//! Credentials are checked by an external provider; once it has verified a
//! visitor it stores a [`CurrentUser`] in the session with
//! [`set_current_user`]. These extractors only read that record.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use bookstore_core::UserRole;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Why an authenticated extractor refused the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No signed-in user.
    Unauthorized,
    /// Signed in, but without the required role.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Sign in required"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Insufficient permissions"),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

async fn current_user(parts: &Parts) -> Option<CurrentUser> {
    // Session is set by SessionManagerLayer
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_user(parts)
            .await
            .map(Self)
            .ok_or(AuthRejection::Unauthorized)
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject anonymous visitors.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_user(parts).await))
    }
}

async fn require_role(parts: &Parts, role: UserRole) -> Result<CurrentUser, AuthRejection> {
    let user = current_user(parts)
        .await
        .ok_or(AuthRejection::Unauthorized)?;
    if user.role != role {
        tracing::warn!(user_id = %user.id, role = %user.role, required = %role, "role check failed");
        return Err(AuthRejection::Forbidden);
    }
    Ok(user)
}

/// Extractor for product-manager routes (review moderation).
pub struct RequireProductManager(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireProductManager
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, UserRole::ProductManager).await.map(Self)
    }
}

/// Extractor for sales-manager routes (discounts).
pub struct RequireSalesManager(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireSalesManager
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, UserRole::SalesManager).await.map(Self)
    }
}

/// Helper to set the current user in the session.
///
/// Cycles the session id to prevent fixation. The anonymous cart and
/// wishlist survive the cycle and are merged on the next sync.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await?;
    set_sentry_user(user.id, &user.name);
    Ok(())
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    clear_sentry_user();
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::Request;
    use tower_sessions::MemoryStore;

    use bookstore_core::UserId;

    use super::*;

    fn parts_with(session: Option<Session>) -> Parts {
        let (mut parts, ()) = Request::builder()
            .uri("/manage/reviews/pending")
            .body(())
            .expect("request")
            .into_parts();
        if let Some(session) = session {
            parts.extensions.insert(session);
        }
        parts
    }

    async fn signed_in(role: UserRole) -> Session {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let user = CurrentUser {
            id: UserId::new(11),
            name: "Ada".to_string(),
            role,
        };
        set_current_user(&session, &user).await.expect("set user");
        session
    }

    #[tokio::test]
    async fn test_require_auth_rejects_anonymous() {
        let mut parts = parts_with(Some(Session::new(
            None,
            Arc::new(MemoryStore::default()),
            None,
        )));
        let result = RequireAuth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthRejection::Unauthorized)));

        let mut parts = parts_with(None);
        let OptionalAuth(user) = OptionalAuth::from_request_parts(&mut parts, &())
            .await
            .expect("infallible");
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn test_require_auth_reads_session_user() {
        let mut parts = parts_with(Some(signed_in(UserRole::Customer).await));
        let RequireAuth(user) = RequireAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap_or_else(|_| panic!("expected user"));
        assert_eq!(user.id, UserId::new(11));
    }

    #[tokio::test]
    async fn test_role_extractors() {
        let mut parts = parts_with(Some(signed_in(UserRole::Customer).await));
        let result = RequireProductManager::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthRejection::Forbidden)));

        let mut parts = parts_with(Some(signed_in(UserRole::SalesManager).await));
        assert!(
            RequireSalesManager::from_request_parts(&mut parts, &())
                .await
                .is_ok()
        );
        assert!(matches!(
            RequireProductManager::from_request_parts(&mut parts, &()).await,
            Err(AuthRejection::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_clear_current_user() {
        let session = signed_in(UserRole::Customer).await;
        clear_current_user(&session).await.expect("clear");
        let mut parts = parts_with(Some(session));
        assert!(matches!(
            RequireAuth::from_request_parts(&mut parts, &()).await,
            Err(AuthRejection::Unauthorized)
        ));
    }
}
