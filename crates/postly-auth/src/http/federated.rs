//! Google sign-in handlers.
//!
//! The client posts the ID token it received from Google. It is verified by
//! the configured [`IdentityVerifier`](crate::federation::IdentityVerifier)
//! before the authenticator sees the identity.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::AuthResult;
use crate::error::AuthError;
use crate::federation::ExternalIdentity;
use crate::http::request_body;
use crate::http::types::IdTokenRequest;
use crate::middleware::AuthState;
use crate::session::SessionTokens;

async fn verified_identity(
    state: &AuthState,
    body: Result<Json<IdTokenRequest>, JsonRejection>,
) -> AuthResult<ExternalIdentity> {
    let verifier = state.identity_verifier.as_ref().ok_or_else(|| {
        AuthError::server_misconfigured(
            "Google sign-in is not configured (auth.google.client_id)",
        )
    })?;
    let body = request_body(body)?;

    let token = body
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::invalid_request("token is required"))?;

    verifier.verify(&token).await
}

/// `POST /auth/google-login`
pub async fn google_login_handler(
    State(state): State<AuthState>,
    body: Result<Json<IdTokenRequest>, JsonRejection>,
) -> AuthResult<Json<SessionTokens>> {
    let identity = verified_identity(&state, body).await?;
    let session = state.authenticator.federated_login(identity).await?;
    Ok(Json(session))
}

/// `POST /auth/google-signup`
pub async fn google_signup_handler(
    State(state): State<AuthState>,
    body: Result<Json<IdTokenRequest>, JsonRejection>,
) -> AuthResult<Json<SessionTokens>> {
    let identity = verified_identity(&state, body).await?;
    let session = state.authenticator.federated_sign_up(identity).await?;
    Ok(Json(session))
}
