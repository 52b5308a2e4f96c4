//! Refresh and logout handlers.
//!
//! Both redeem the presented refresh token. Any failure, replay included,
//! is a 400 with the same body. An unreadable body counts as a missing token.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::AuthResult;
use crate::http::types::{RefreshTokenRequest, StatusResponse};
use crate::middleware::AuthState;
use crate::session::SessionTokens;

/// `POST /auth/refresh`
pub async fn refresh_handler(
    State(state): State<AuthState>,
    body: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> AuthResult<Json<SessionTokens>> {
    let token = presented_token(body);
    let session = state
        .authenticator
        .refresh_session(token.as_deref())
        .await?;
    Ok(Json(session))
}

/// `POST /auth/logout`
pub async fn logout_handler(
    State(state): State<AuthState>,
    body: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> AuthResult<Json<StatusResponse>> {
    let token = presented_token(body);
    state.authenticator.logout(token.as_deref()).await?;
    Ok(Json(StatusResponse::SUCCESS))
}

fn presented_token(body: Result<Json<RefreshTokenRequest>, JsonRejection>) -> Option<String> {
    match body {
        Ok(Json(body)) => body.refresh_token,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "Unreadable refresh request body");
            None
        }
    }
}
