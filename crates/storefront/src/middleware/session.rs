//! Session layer.
//!
//! Sessions carry the signed-in identity and, for anonymous visitors, the
//! local cart and wishlist. They are stored in `PostgreSQL` so a visitor's
//! cart survives restarts. The cookie is signed with a key derived from
//! `STOREFRONT_SESSION_SECRET`; a cookie whose signature does not verify is
//! treated as no cookie at all.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha512};
use sqlx::PgPool;
use tower_sessions::cookie::time::Duration;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions::service::SignedCookie;
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "bookstore_session";

/// Idle time before a session (and an anonymous cart) expires: 30 days.
const SESSION_EXPIRY_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Create the session layer with the `PostgreSQL` store.
///
/// The `tower_sessions.session` table is created by the migrations.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore, SignedCookie> {
    configure(PostgresStore::new(pool.clone()), config)
}

/// Cookie signing key. `Key` needs 64 bytes; SHA-512 of the secret gives
/// exactly that for any secret length.
#[must_use]
pub fn signing_key(secret: &SecretString) -> Key {
    Key::from(Sha512::digest(secret.expose_secret().as_bytes()).as_slice())
}

/// Apply the storefront's cookie settings to any session store.
pub fn configure<S: SessionStore + Clone>(
    store: S,
    config: &StorefrontConfig,
) -> SessionManagerLayer<S, SignedCookie> {
    SessionManagerLayer::new(store)
        .with_signed(signing_key(&config.session_secret))
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(SESSION_EXPIRY_SECONDS)))
        .with_secure(config.is_https())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, header};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, Session};

    use super::*;
    use crate::config::test_config;

    fn counter_app() -> Router {
        Router::new()
            .route(
                "/",
                get(|session: Session| async move {
                    let seen: u32 = session.get("seen").await.ok().flatten().unwrap_or_default();
                    session.insert("seen", seen + 1).await.ok();
                    seen.to_string()
                }),
            )
            .layer(configure(MemoryStore::default(), &test_config()))
    }

    async fn visit(app: &Router, cookie: Option<&str>) -> (String, Option<String>) {
        let mut request = Request::builder().uri("/");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let response = app
            .clone()
            .oneshot(request.body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_owned);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (String::from_utf8(body.to_vec()).expect("utf8"), set_cookie)
    }

    #[tokio::test]
    async fn test_signed_cookie_round_trips() {
        let app = counter_app();
        let (first, cookie) = visit(&app, None).await;
        let cookie = cookie.expect("session cookie");
        assert_eq!(first, "0");
        assert!(cookie.starts_with(SESSION_COOKIE_NAME));

        let (second, _) = visit(&app, Some(&cookie)).await;
        assert_eq!(second, "1");
    }

    #[tokio::test]
    async fn test_tampered_cookie_starts_a_fresh_session() {
        let app = counter_app();
        let (_, cookie) = visit(&app, None).await;
        let cookie = cookie.expect("session cookie");

        let (name, value) = cookie.split_once('=').expect("name=value");
        let mut tampered: Vec<char> = value.chars().collect();
        if let Some(last) = tampered.last_mut() {
            *last = if *last == 'A' { 'B' } else { 'A' };
        }
        let tampered = format!("{name}={}", tampered.into_iter().collect::<String>());

        let (seen, _) = visit(&app, Some(&tampered)).await;
        assert_eq!(seen, "0");
    }

    #[test]
    fn test_signing_key_is_stable_per_secret() {
        let a = SecretString::from("first-secret-value-0123456789abcdef");
        let b = SecretString::from("other-secret-value-0123456789abcdef");
        assert_eq!(signing_key(&a).signing(), signing_key(&a).signing());
        assert_ne!(signing_key(&a).signing(), signing_key(&b).signing());
    }
}
