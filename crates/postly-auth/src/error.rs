//! Authentication error types.
//!
//! This module defines the error taxonomy shared by every session operation.
//! Each variant maps to exactly one HTTP status in [`crate::middleware::error`].

use std::fmt;

/// Errors that can occur during session authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A required configuration value (signing secret, token lifetime) is absent.
    #[error("Missing configuration: {name}")]
    ConfigMissing {
        /// Name of the missing configuration key.
        name: String,
    },

    /// The request lacks a valid access token.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Description of why the request is unauthorized.
        message: String,
    },

    /// The server cannot verify access tokens because it is not configured to.
    #[error("Server misconfigured: {message}")]
    ServerMisconfigured {
        /// Description of the misconfiguration.
        message: String,
    },

    /// A refresh token could not be redeemed.
    ///
    /// Expired, forged, unknown and replayed tokens all produce this same
    /// variant so callers cannot tell them apart.
    #[error("Invalid refresh token")]
    Invalid,

    /// The email/password combination was rejected.
    ///
    /// Unknown email and wrong password are deliberately the same variant.
    #[error("Wrong email or password")]
    InvalidCredential,

    /// The request body is missing required fields.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// An account with this email already exists.
    #[error("User with this email already exists")]
    EmailTaken,

    /// The authenticated user no longer exists.
    #[error("User not found")]
    UserNotFound,

    /// The external identity provider rejected the presented identity token.
    #[error("Identity provider error: {provider} - {message}")]
    IdentityProvider {
        /// The identity provider name.
        provider: String,
        /// Description of the error.
        message: String,
    },

    /// An unexpected persistence or signing failure.
    #[error("Server error: {message}")]
    ServerError {
        /// Description of the failure.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `ConfigMissing` error.
    #[must_use]
    pub fn config_missing(name: impl Into<String>) -> Self {
        Self::ConfigMissing { name: name.into() }
    }

    /// Creates a new `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a new `ServerMisconfigured` error.
    #[must_use]
    pub fn server_misconfigured(message: impl Into<String>) -> Self {
        Self::ServerMisconfigured {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `IdentityProvider` error.
    #[must_use]
    pub fn identity_provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::IdentityProvider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ServerError` error.
    #[must_use]
    pub fn server_error(message: impl Into<String>) -> Self {
        Self::ServerError {
            message: message.into(),
        }
    }

    /// Returns `true` if the caller is at fault (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. }
                | Self::Invalid
                | Self::InvalidCredential
                | Self::InvalidRequest { .. }
                | Self::EmailTaken
                | Self::UserNotFound
                | Self::IdentityProvider { .. }
        )
    }

    /// Returns `true` if the server is at fault (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigMissing { .. } | Self::ServerMisconfigured { .. } | Self::ServerError { .. }
        )
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigMissing { .. } => ErrorCategory::Configuration,
            Self::ServerMisconfigured { .. } => ErrorCategory::Configuration,
            Self::Unauthorized { .. } => ErrorCategory::Token,
            Self::Invalid => ErrorCategory::Token,
            Self::InvalidCredential => ErrorCategory::Authentication,
            Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::EmailTaken => ErrorCategory::Validation,
            Self::UserNotFound => ErrorCategory::Authentication,
            Self::IdentityProvider { .. } => ErrorCategory::Federation,
            Self::ServerError { .. } => ErrorCategory::Infrastructure,
        }
    }

    /// Returns the stable machine-readable code used in error bodies.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigMissing { .. } => "server_error",
            Self::ServerMisconfigured { .. } => "server_error",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Invalid => "invalid_grant",
            Self::InvalidCredential => "invalid_credentials",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::EmailTaken => "email_taken",
            Self::UserNotFound => "not_found",
            Self::IdentityProvider { .. } => "identity_provider_error",
            Self::ServerError { .. } => "server_error",
        }
    }
}

/// Categories of authentication errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Identity verification failed.
    Authentication,
    /// Token validation or redemption failed.
    Token,
    /// Request validation errors.
    Validation,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Identity provider federation errors.
    Federation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Token => write!(f, "token"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Federation => write!(f, "federation"),
        }
    }
}
