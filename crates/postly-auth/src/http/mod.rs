//! HTTP handlers for the session endpoints.
//!
//! # Available Handlers
//!
//! - [`credentials`] - Password registration and login
//! - [`session`] - Refresh-token rotation and logout
//! - [`federated`] - Google sign-in and sign-up
//! - [`profile`] - Current user profile

pub mod credentials;
pub mod federated;
pub mod profile;
pub mod session;
pub mod types;

use axum::{
    Json, Router,
    extract::rejection::JsonRejection,
    routing::{get, post},
};

use crate::AuthResult;
use crate::error::AuthError;
use crate::middleware::AuthState;

pub use credentials::{login_handler, register_handler};
pub use federated::{google_login_handler, google_signup_handler};
pub use profile::me_handler;
pub use session::{logout_handler, refresh_handler};

/// Unwraps a JSON request body, reporting any rejection (missing or wrong
/// content type, malformed JSON, wrong field types) as `InvalidRequest`.
pub(crate) fn request_body<T>(body: Result<Json<T>, JsonRejection>) -> AuthResult<T> {
    body.map(|Json(body)| body).map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "Rejected request body");
        AuthError::invalid_request(rejection.body_text())
    })
}

/// Builds the router for every session endpoint.
pub fn auth_router(state: AuthState) -> Router {
    Router::new()
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/refresh", post(refresh_handler))
        .route("/auth/google-login", post(google_login_handler))
        .route("/auth/google-signup", post(google_signup_handler))
        .route("/users/me", get(me_handler))
        .with_state(state)
}
