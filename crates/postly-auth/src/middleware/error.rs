//! Error response handling for authentication handlers.
//!
//! Every [`AuthError`] renders as `{"error": <code>, "message": <text>}` with
//! the status from [`status_for`]. Server-side failures are logged and their
//! details withheld from the body.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let code = self.error_code();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, category = %self.category(), "Request failed");
            "Internal server error".to_string()
        } else {
            tracing::debug!(error = %self, category = %self.category(), "Request rejected");
            public_message(&self)
        };

        let mut response =
            (status, Json(json!({ "error": code, "message": message }))).into_response();

        if status == StatusCode::UNAUTHORIZED {
            let challenge = build_www_authenticate_header(code, &message);
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, value);
            }
        }

        response
    }
}

/// Returns the HTTP status for an error.
#[must_use]
pub fn status_for(error: &AuthError) -> StatusCode {
    match error {
        AuthError::Invalid
        | AuthError::InvalidCredential
        | AuthError::InvalidRequest { .. }
        | AuthError::IdentityProvider { .. } => StatusCode::BAD_REQUEST,
        AuthError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        AuthError::EmailTaken => StatusCode::CONFLICT,
        AuthError::UserNotFound => StatusCode::NOT_FOUND,
        AuthError::ConfigMissing { .. }
        | AuthError::ServerMisconfigured { .. }
        | AuthError::ServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn public_message(error: &AuthError) -> String {
    match error {
        AuthError::Unauthorized { .. } => "Invalid or missing access token".to_string(),
        AuthError::IdentityProvider { provider, .. } => {
            format!("Identity token rejected by {provider}")
        }
        other => other.to_string(),
    }
}

/// Builds the WWW-Authenticate header value for 401 responses.
fn build_www_authenticate_header(error: &str, description: &str) -> String {
    let escaped = description.replace('"', "\\\"");
    format!("Bearer realm=\"postly\", error=\"{error}\", error_description=\"{escaped}\"")
}
