//! Current user profile.

use axum::{Json, extract::State};

use crate::AuthResult;
use crate::error::AuthError;
use crate::http::types::PublicUser;
use crate::middleware::{AuthState, BearerAuth};

/// `GET /users/me`
pub async fn me_handler(
    State(state): State<AuthState>,
    BearerAuth(user_id): BearerAuth,
) -> AuthResult<Json<PublicUser>> {
    let user = state
        .users()
        .find_by_id(&user_id)
        .await
        .map_err(|e| AuthError::server_error(e.to_string()))?
        .ok_or(AuthError::UserNotFound)?;

    Ok(Json(PublicUser::from(&user)))
}
