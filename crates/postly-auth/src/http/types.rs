//! Request and response bodies for the auth endpoints.
//!
//! Field names are camelCase on the wire. Request fields are optional at the
//! serde level so that missing fields reach the handlers and produce the
//! session errors. Bodies that fail to parse at all are mapped by the
//! handlers too (see [`request_body`](super::request_body)).

use serde::{Deserialize, Serialize};

use crate::storage::User;

/// `POST /auth/register` body.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Email address.
    pub email: String,
    /// Plaintext password.
    pub password: String,
    /// Optional display name.
    pub username: Option<String>,
}

/// `POST /auth/login` body.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginRequest {
    /// Email address.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// `POST /auth/refresh` and `POST /auth/logout` body.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    /// The refresh token to redeem.
    pub refresh_token: Option<String>,
}

/// `POST /auth/google-login` and `POST /auth/google-signup` body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IdTokenRequest {
    /// Provider-issued ID token.
    pub token: Option<String>,
}

/// User fields safe to return to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    /// User id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Email address.
    pub email: String,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Profile image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            image: user.image.clone(),
        }
    }
}

/// `POST /auth/register` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    /// The new account.
    pub user: PublicUser,
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
}

/// Plain acknowledgement body.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Always `"success"`.
    pub status: &'static str,
}

impl StatusResponse {
    /// The success acknowledgement.
    pub const SUCCESS: Self = Self { status: "success" };
}
