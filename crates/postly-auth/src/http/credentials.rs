//! Password registration and login handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::AuthResult;
use crate::http::request_body;
use crate::http::types::{LoginRequest, PublicUser, RegisterRequest, RegisterResponse};
use crate::middleware::AuthState;
use crate::session::{Registration, SessionTokens};

/// `POST /auth/register`
pub async fn register_handler(
    State(state): State<AuthState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> AuthResult<Json<RegisterResponse>> {
    let body = request_body(body)?;
    let registered = state
        .authenticator
        .register(Registration {
            email: body.email,
            password: body.password,
            username: body.username,
        })
        .await?;

    Ok(Json(RegisterResponse {
        user: PublicUser::from(&registered.user),
        access_token: registered.tokens.access_token,
        refresh_token: registered.tokens.refresh_token,
    }))
}

/// `POST /auth/login`
pub async fn login_handler(
    State(state): State<AuthState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> AuthResult<Json<SessionTokens>> {
    let body = request_body(body)?;
    let session = state
        .authenticator
        .login(&body.email, &body.password)
        .await?;
    Ok(Json(session))
}
