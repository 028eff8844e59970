//! Sign-in callback.
//!
//! The identity provider posts here once it has verified a visitor. The
//! handler checks the provider's signature, binds the account to the session
//! and merges the anonymous cart and wishlist into it in the same request.

use axum::{Json, extract::State};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::set_current_user;
use crate::models::CurrentUser;
use crate::routes::account::{SyncResponse, merge_session};
use crate::services::sign_in::{self, SignedIdentity};
use crate::state::AppState;

/// The signed-in user and what was merged into their account.
#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub user: CurrentUser,
    #[serde(flatten)]
    pub sync: SyncResponse,
}

/// Accept a signed identity from the provider.
#[instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Json(identity): Json<SignedIdentity>,
) -> Result<Json<SignInResponse>> {
    let user = sign_in::authenticate(state.pool(), &state.config().auth_secret, &identity).await?;
    set_current_user(&session, &user).await?;

    let user_id = user.id.to_string();
    add_breadcrumb("auth", "Signed in", &[("user_id", user_id.as_str())]);

    let sync = merge_session(&state, &session, user.id).await?;
    Ok(Json(SignInResponse { user, sync }))
}
