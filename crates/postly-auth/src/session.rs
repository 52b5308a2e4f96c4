//! Session authenticator.
//!
//! Issues, verifies and rotates access/refresh token pairs. All session state
//! lives in the [`UserStore`]: a refresh token is redeemable exactly while it
//! is in its owner's `refresh_tokens` set, and redeeming it removes it.
//!
//! Presenting a refresh token that verifies but is not in the set is treated
//! as replay. The owner's whole set is cleared, which revokes every session
//! they have, and the caller sees the same `Invalid` as for any other failure.
//!
//! # Example
//!
//! ```ignore
//! use postly_auth::session::SessionAuthenticator;
//!
//! let auth = SessionAuthenticator::new(&config.token, store);
//! let session = auth.login("ann@example.com", "hunter22").await?;
//! let next = auth.refresh_session(Some(&session.refresh_token)).await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::config::TokenConfig;
use crate::error::AuthError;
use crate::federation::ExternalIdentity;
use crate::password;
use crate::storage::{NewUser, StoreError, User, UserStore};
use crate::token::{SessionClaims, TokenKind, TokenPair, TokenService};

/// Authorization scheme expected in the `Authorization` header.
const BEARER_PREFIX: &str = "Bearer ";

/// A freshly issued pair together with its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    /// Short-lived access token.
    pub access_token: String,
    /// Single-use refresh token, already in the owner's active set.
    pub refresh_token: String,
    /// Id of the user the pair was issued to.
    #[serde(rename = "_id")]
    pub user_id: String,
}

impl SessionTokens {
    fn new(pair: TokenPair, user_id: String) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            user_id,
        }
    }
}

/// Password registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Email address.
    pub email: String,
    /// Plaintext password, hashed before it reaches the store.
    pub password: String,
    /// Optional display name.
    pub username: Option<String>,
}

/// Result of a successful registration.
#[derive(Debug, Clone)]
pub struct RegisteredUser {
    /// The stored user, including the new refresh token in its active set.
    pub user: User,
    /// The issued pair.
    pub tokens: TokenPair,
}

/// Mints, validates and rotates session tokens.
///
/// Holds no mutable state of its own, so one instance can be shared across
/// tasks behind an `Arc` and several instances can run against one store.
pub struct SessionAuthenticator {
    tokens: TokenService,
    users: Arc<dyn UserStore>,
}

impl SessionAuthenticator {
    /// Creates an authenticator from token configuration and a user store.
    #[must_use]
    pub fn new(config: &TokenConfig, users: Arc<dyn UserStore>) -> Self {
        Self {
            tokens: TokenService::new(config),
            users,
        }
    }

    /// Returns the user store.
    #[must_use]
    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    /// Issues a new access/refresh pair for `user_id`.
    ///
    /// Does not persist anything. The caller adds the refresh token to the
    /// user's active set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` if the secret or a lifetime is not configured.
    pub fn issue_token_pair(&self, user_id: &str) -> AuthResult<TokenPair> {
        self.tokens.issue_pair(user_id)
    }

    /// Authenticates a request from its `Authorization` header value.
    ///
    /// Returns the user id carried by a valid access token. Never touches the
    /// store.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the header is missing or malformed, or the token
    ///   fails verification
    /// - `ServerMisconfigured` if no signing secret is configured
    pub fn authenticate_request(&self, authorization: Option<&str>) -> AuthResult<String> {
        let token = authorization
            .and_then(extract_bearer_token)
            .ok_or_else(|| AuthError::unauthorized("Missing or malformed bearer token"))?;

        if !self.tokens.has_secret() {
            return Err(AuthError::server_misconfigured(
                "token signing secret is not configured",
            ));
        }

        let claims = self
            .tokens
            .verify(token, TokenKind::Access)
            .map_err(|e| match e {
                AuthError::ConfigMissing { name } => {
                    AuthError::server_misconfigured(format!("missing {name}"))
                }
                other => other,
            })?;

        Ok(claims.sub)
    }

    /// Redeems a refresh token, removing it from its owner's active set.
    ///
    /// Returns the user as stored after the removal.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` for every failure, including replay (which first
    /// clears the owner's whole set).
    pub async fn redeem_refresh_token(&self, token: Option<&str>) -> AuthResult<User> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            tracing::debug!("Refresh token redemption without a token");
            return Err(AuthError::Invalid);
        };

        let claims = self.verify_refresh(token)?;

        let mut user = match self.users.find_by_id(&claims.sub).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::debug!(user_id = %claims.sub, "Refresh token for unknown user");
                return Err(AuthError::Invalid);
            }
            Err(e) => {
                tracing::warn!(error = %e, "User lookup failed during redemption");
                return Err(AuthError::Invalid);
            }
        };

        if !user.remove_refresh_token(token) {
            tracing::warn!(
                user_id = %user.id,
                revoked = user.refresh_tokens.len(),
                "Refresh token reuse detected, revoking all sessions"
            );
            user.clear_refresh_tokens();
            if let Err(e) = self.users.save(&user).await {
                tracing::error!(
                    user_id = %user.id,
                    error = %e,
                    "Failed to persist session revocation"
                );
            }
            return Err(AuthError::Invalid);
        }

        self.users.save(&user).await.map_err(|e| {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to persist redemption");
            AuthError::Invalid
        })?;

        Ok(user)
    }

    fn verify_refresh(&self, token: &str) -> AuthResult<SessionClaims> {
        self.tokens
            .verify(token, TokenKind::Refresh)
            .map_err(|e| {
                tracing::debug!(error = %e, "Refresh token failed verification");
                AuthError::Invalid
            })
    }

    /// Exchanges a refresh token for a new pair.
    ///
    /// The old token is removed and the new one added in two separate writes.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` if redemption fails and `ServerError` if issuing or
    /// persisting the new pair fails.
    pub async fn refresh_session(&self, token: Option<&str>) -> AuthResult<SessionTokens> {
        let user = self.redeem_refresh_token(token).await?;
        let session = self.start_session(user).await?;
        tracing::debug!(user_id = %session.user_id, "Session refreshed");
        Ok(session)
    }

    /// Logs in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredential` for an unknown email or a wrong password
    /// alike, and `ServerError` for store or signing failures.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<SessionTokens> {
        let found = self
            .users
            .find_by_email(&normalize_email(email))
            .await
            .map_err(store_failure)?;

        let Some(user) = found else {
            password::verify_against_dummy(password.to_string()).await?;
            tracing::debug!("Login for unknown email");
            return Err(AuthError::InvalidCredential);
        };

        let matches =
            password::verify_password(password.to_string(), user.password_hash.clone()).await?;
        if !matches {
            tracing::debug!(user_id = %user.id, "Login with wrong password");
            return Err(AuthError::InvalidCredential);
        }

        let session = self.start_session(user).await?;
        tracing::info!(user_id = %session.user_id, "User logged in");
        Ok(session)
    }

    /// Logs out by redeeming the refresh token.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` unless the token was active. Already-used and
    /// never-issued tokens are not told apart.
    pub async fn logout(&self, token: Option<&str>) -> AuthResult<()> {
        let user = self.redeem_refresh_token(token).await?;
        tracing::info!(user_id = %user.id, "User logged out");
        Ok(())
    }

    /// Logs in with an identity already verified by an external provider.
    ///
    /// Creates the account on first sight, with a random credential nobody
    /// knows.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` for store or signing failures.
    pub async fn federated_login(&self, identity: ExternalIdentity) -> AuthResult<SessionTokens> {
        let identity = normalize_identity(identity);
        let existing = self
            .users
            .find_by_email(&identity.email)
            .await
            .map_err(store_failure)?;

        let user = match existing {
            Some(user) => user,
            None => match self.create_federated_user(&identity).await {
                Ok(user) => user,
                Err(AuthError::EmailTaken) => self
                    .users
                    .find_by_email(&identity.email)
                    .await
                    .map_err(store_failure)?
                    .ok_or_else(|| AuthError::server_error("user vanished after conflict"))?,
                Err(e) => return Err(e),
            },
        };

        let session = self.start_session(user).await?;
        tracing::info!(user_id = %session.user_id, "Federated login");
        Ok(session)
    }

    /// Creates an account from an externally verified identity and logs in.
    ///
    /// # Errors
    ///
    /// Returns `EmailTaken` if an account with the email already exists, and
    /// `ServerError` for store or signing failures.
    pub async fn federated_sign_up(
        &self,
        identity: ExternalIdentity,
    ) -> AuthResult<SessionTokens> {
        let identity = normalize_identity(identity);
        let existing = self
            .users
            .find_by_email(&identity.email)
            .await
            .map_err(store_failure)?;
        if existing.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let user = self.create_federated_user(&identity).await?;
        let session = self.start_session(user).await?;
        tracing::info!(user_id = %session.user_id, "Federated sign-up");
        Ok(session)
    }

    async fn create_federated_user(&self, identity: &ExternalIdentity) -> AuthResult<User> {
        let password_hash = password::hash_password(password::generate_random_secret()).await?;
        self.users
            .create(NewUser {
                email: identity.email.clone(),
                password_hash,
                username: identity.name.clone(),
            })
            .await
            .map_err(create_failure)
    }

    /// Registers a password account and logs it in.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if the email or password is empty
    /// - `EmailTaken` if the email is already registered
    /// - `ServerError` for store, hashing or signing failures
    pub async fn register(&self, registration: Registration) -> AuthResult<RegisteredUser> {
        let email = normalize_email(&registration.email);
        if email.is_empty() || registration.password.is_empty() {
            return Err(AuthError::invalid_request("email and password are required"));
        }
        let username = registration
            .username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        if self
            .users
            .find_by_email(&email)
            .await
            .map_err(store_failure)?
            .is_some()
        {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = password::hash_password(registration.password).await?;
        let mut user = self
            .users
            .create(NewUser {
                email,
                password_hash,
                username,
            })
            .await
            .map_err(create_failure)?;

        let tokens = self.issue_token_pair(&user.id).map_err(issue_failure)?;
        user.add_refresh_token(tokens.refresh_token.clone());
        self.users.save(&user).await.map_err(store_failure)?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(RegisteredUser { user, tokens })
    }

    /// Issues a pair for `user`, adds the refresh token to its set and persists.
    async fn start_session(&self, mut user: User) -> AuthResult<SessionTokens> {
        let pair = self.issue_token_pair(&user.id).map_err(issue_failure)?;
        user.add_refresh_token(pair.refresh_token.clone());
        self.users.save(&user).await.map_err(store_failure)?;
        Ok(SessionTokens::new(pair, user.id))
    }
}

/// Canonical form of an email for storage and lookup.
fn normalize_email(email: &str) -> String {
    email.trim().to_string()
}

fn normalize_identity(identity: ExternalIdentity) -> ExternalIdentity {
    ExternalIdentity {
        email: normalize_email(&identity.email),
        ..identity
    }
}

/// Extracts the token from a `Bearer <token>` header value.
///
/// The scheme is matched case-insensitively.
#[must_use]
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let header = header.trim();
    if header.len() <= BEARER_PREFIX.len()
        || !header.is_char_boundary(BEARER_PREFIX.len())
        || !header[..BEARER_PREFIX.len()].eq_ignore_ascii_case(BEARER_PREFIX)
    {
        return None;
    }
    let token = header[BEARER_PREFIX.len()..].trim();
    (!token.is_empty()).then_some(token)
}

fn store_failure(err: StoreError) -> AuthError {
    tracing::error!(error = %err, "User store failure");
    AuthError::server_error(err.to_string())
}

fn create_failure(err: StoreError) -> AuthError {
    match err {
        StoreError::Duplicate { .. } => AuthError::EmailTaken,
        other => store_failure(other),
    }
}

fn issue_failure(err: AuthError) -> AuthError {
    match err {
        AuthError::ConfigMissing { name } => {
            tracing::error!(setting = %name, "Cannot issue tokens, configuration missing");
            AuthError::server_error(format!("missing configuration: {name}"))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::MockUserStore;
    use crate::token::JwtService;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn token_config() -> TokenConfig {
        TokenConfig {
            secret: Some(SECRET.to_string()),
            access_token_lifetime: Some(Duration::from_secs(900)),
            refresh_token_lifetime: Some(Duration::from_secs(86400)),
        }
    }

    fn setup() -> (SessionAuthenticator, Arc<MockUserStore>) {
        let store = Arc::new(MockUserStore::default());
        let auth = SessionAuthenticator::new(&token_config(), store.clone());
        (auth, store)
    }

    async fn registered(auth: &SessionAuthenticator) -> RegisteredUser {
        auth.register(Registration {
            email: "ann@example.com".to_string(),
            password: "correct horse".to_string(),
            username: Some("ann".to_string()),
        })
        .await
        .unwrap()
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    // ------------------------------------------------------------------
    // Issuance and request authentication
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_login_tokens_differ_and_carry_user_id() {
        let (auth, _) = setup();
        let reg = registered(&auth).await;

        let session = auth.login("ann@example.com", "correct horse").await.unwrap();
        assert_ne!(session.access_token, session.refresh_token);
        assert_eq!(session.user_id, reg.user.id);

        let jwt = JwtService::from_secret(SECRET.as_bytes());
        assert_eq!(jwt.decode(&session.access_token).unwrap().sub, reg.user.id);
        assert_eq!(jwt.decode(&session.refresh_token).unwrap().sub, reg.user.id);
    }

    #[test]
    fn test_consecutive_pairs_differ() {
        let (auth, _) = setup();
        let a = auth.issue_token_pair("u1").unwrap();
        let b = auth.issue_token_pair("u1").unwrap();
        assert_ne!(a.access_token, b.access_token);
        assert_ne!(a.refresh_token, b.refresh_token);
    }

    #[test]
    fn test_issue_without_config_is_config_missing() {
        let auth = SessionAuthenticator::new(
            &TokenConfig::default(),
            Arc::new(MockUserStore::default()),
        );
        assert!(matches!(
            auth.issue_token_pair("u1"),
            Err(AuthError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn test_authenticate_request() {
        let (auth, _) = setup();
        let pair = auth.issue_token_pair("u1").unwrap();

        assert_eq!(
            auth.authenticate_request(Some(&bearer(&pair.access_token)))
                .unwrap(),
            "u1"
        );
        assert!(matches!(
            auth.authenticate_request(None),
            Err(AuthError::Unauthorized { .. })
        ));
        assert!(matches!(
            auth.authenticate_request(Some(&pair.access_token)),
            Err(AuthError::Unauthorized { .. })
        ));
        assert!(matches!(
            auth.authenticate_request(Some("Bearer garbage")),
            Err(AuthError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_authenticate_request_rejects_expired_token() {
        let (auth, _) = setup();
        let jwt = JwtService::from_secret(SECRET.as_bytes());
        let expired = jwt
            .encode(&SessionClaims::new("u1", "n", TokenKind::Access, -60))
            .unwrap();
        assert!(matches!(
            auth.authenticate_request(Some(&bearer(&expired))),
            Err(AuthError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_authenticate_request_rejects_refresh_token() {
        let (auth, _) = setup();
        let pair = auth.issue_token_pair("u1").unwrap();
        assert!(matches!(
            auth.authenticate_request(Some(&bearer(&pair.refresh_token))),
            Err(AuthError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_authenticate_request_without_secret_is_misconfigured() {
        let auth = SessionAuthenticator::new(
            &TokenConfig::default(),
            Arc::new(MockUserStore::default()),
        );
        assert!(matches!(
            auth.authenticate_request(Some("Bearer something")),
            Err(AuthError::ServerMisconfigured { .. })
        ));
        assert!(matches!(
            auth.authenticate_request(None),
            Err(AuthError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("abc"), None);
        assert_eq!(extract_bearer_token(""), None);
    }

    // ------------------------------------------------------------------
    // Redemption and rotation
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_redeem_twice_fails_second_time() {
        let (auth, _) = setup();
        let reg = registered(&auth).await;
        let token = reg.tokens.refresh_token;

        let user = auth.redeem_refresh_token(Some(&token)).await.unwrap();
        assert!(!user.has_refresh_token(&token));

        assert!(matches!(
            auth.redeem_refresh_token(Some(&token)).await,
            Err(AuthError::Invalid)
        ));
    }

    #[tokio::test]
    async fn test_replay_revokes_every_session() {
        let (auth, store) = setup();
        registered(&auth).await;

        let a = auth.login("ann@example.com", "correct horse").await.unwrap();
        let b = auth.refresh_session(Some(&a.refresh_token)).await.unwrap();
        assert_ne!(a.refresh_token, b.refresh_token);

        assert!(matches!(
            auth.refresh_session(Some(&a.refresh_token)).await,
            Err(AuthError::Invalid)
        ));
        assert!(matches!(
            auth.refresh_session(Some(&b.refresh_token)).await,
            Err(AuthError::Invalid)
        ));

        let stored = store.get(&a.user_id).unwrap();
        assert!(stored.refresh_tokens.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_rotates_token_in_store() {
        let (auth, store) = setup();
        let reg = registered(&auth).await;
        let old = reg.tokens.refresh_token;

        let next = auth.refresh_session(Some(&old)).await.unwrap();
        assert_eq!(next.user_id, reg.user.id);

        let stored = store.get(&reg.user.id).unwrap();
        assert!(!stored.has_refresh_token(&old));
        assert!(stored.has_refresh_token(&next.refresh_token));
        assert_eq!(
            auth.authenticate_request(Some(&bearer(&next.access_token)))
                .unwrap(),
            reg.user.id
        );
    }

    #[tokio::test]
    async fn test_redeem_missing_or_forged_token_is_invalid() {
        let (auth, store) = setup();
        let reg = registered(&auth).await;

        assert!(matches!(
            auth.redeem_refresh_token(None).await,
            Err(AuthError::Invalid)
        ));
        assert!(matches!(
            auth.redeem_refresh_token(Some("")).await,
            Err(AuthError::Invalid)
        ));

        let forged = JwtService::from_secret(b"another-secret-another-secret-xx")
            .encode(&SessionClaims::new(
                reg.user.id.clone(),
                "n",
                TokenKind::Refresh,
                600,
            ))
            .unwrap();
        assert!(matches!(
            auth.redeem_refresh_token(Some(&forged)).await,
            Err(AuthError::Invalid)
        ));

        // Failed verification leaves the set untouched.
        let stored = store.get(&reg.user.id).unwrap();
        assert!(stored.has_refresh_token(&reg.tokens.refresh_token));
    }

    #[tokio::test]
    async fn test_access_token_at_refresh_is_invalid_without_revocation() {
        let (auth, store) = setup();
        let reg = registered(&auth).await;

        assert!(matches!(
            auth.refresh_session(Some(&reg.tokens.access_token)).await,
            Err(AuthError::Invalid)
        ));
        let stored = store.get(&reg.user.id).unwrap();
        assert!(stored.has_refresh_token(&reg.tokens.refresh_token));
    }

    #[tokio::test]
    async fn test_redeem_for_unknown_user_is_invalid() {
        let (auth, _) = setup();
        let pair = auth.issue_token_pair("ghost").unwrap();
        assert!(matches!(
            auth.redeem_refresh_token(Some(&pair.refresh_token)).await,
            Err(AuthError::Invalid)
        ));
    }

    #[tokio::test]
    async fn test_redeem_without_secret_is_invalid() {
        let auth = SessionAuthenticator::new(
            &TokenConfig::default(),
            Arc::new(MockUserStore::default()),
        );
        assert!(matches!(
            auth.redeem_refresh_token(Some("anything")).await,
            Err(AuthError::Invalid)
        ));
    }

    #[tokio::test]
    async fn test_persistence_failure_during_redeem_is_invalid() {
        let (auth, store) = setup();
        let reg = registered(&auth).await;

        store.fail_saves_after(0);
        assert!(matches!(
            auth.redeem_refresh_token(Some(&reg.tokens.refresh_token)).await,
            Err(AuthError::Invalid)
        ));
    }

    #[tokio::test]
    async fn test_lookup_failure_during_redeem_is_invalid() {
        let (auth, store) = setup();
        let reg = registered(&auth).await;

        store.fail_reads(true);
        assert!(matches!(
            auth.redeem_refresh_token(Some(&reg.tokens.refresh_token)).await,
            Err(AuthError::Invalid)
        ));
    }

    #[tokio::test]
    async fn test_refresh_second_write_failure_is_server_error() {
        let (auth, store) = setup();
        let reg = registered(&auth).await;

        store.fail_saves_after(1);
        assert!(matches!(
            auth.refresh_session(Some(&reg.tokens.refresh_token)).await,
            Err(AuthError::ServerError { .. })
        ));

        // The first write went through: the old token is spent.
        let stored = store.get(&reg.user.id).unwrap();
        assert!(!stored.has_refresh_token(&reg.tokens.refresh_token));
    }

    // ------------------------------------------------------------------
    // Login and logout
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_are_indistinguishable() {
        let (auth, _) = setup();
        registered(&auth).await;

        let wrong_password = auth.login("ann@example.com", "nope").await.unwrap_err();
        let unknown_email = auth
            .login("bob@example.com", "correct horse")
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredential));
        assert!(matches!(unknown_email, AuthError::InvalidCredential));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert_eq!(wrong_password.error_code(), unknown_email.error_code());
    }

    #[tokio::test]
    async fn test_login_persists_refresh_token() {
        let (auth, store) = setup();
        registered(&auth).await;

        let session = auth.login("ann@example.com", "correct horse").await.unwrap();
        let stored = store.get(&session.user_id).unwrap();
        assert!(stored.has_refresh_token(&session.refresh_token));
        assert_eq!(stored.refresh_tokens.len(), 2);
    }

    #[tokio::test]
    async fn test_login_store_failure_is_server_error() {
        let (auth, store) = setup();
        registered(&auth).await;
        store.fail_reads(true);
        assert!(matches!(
            auth.login("ann@example.com", "correct horse").await,
            Err(AuthError::ServerError { .. })
        ));
    }

    #[tokio::test]
    async fn test_logout_spends_token() {
        let (auth, _) = setup();
        let reg = registered(&auth).await;
        let token = reg.tokens.refresh_token;

        auth.logout(Some(&token)).await.unwrap();

        assert!(matches!(
            auth.logout(Some(&token)).await,
            Err(AuthError::Invalid)
        ));
        assert!(matches!(
            auth.refresh_session(Some(&token)).await,
            Err(AuthError::Invalid)
        ));
    }

    #[tokio::test]
    async fn test_logout_with_never_issued_token_fails() {
        let (auth, _) = setup();
        assert!(matches!(
            auth.logout(Some("never-issued")).await,
            Err(AuthError::Invalid)
        ));
    }

    #[tokio::test]
    async fn test_logout_keeps_other_sessions() {
        let (auth, _) = setup();
        registered(&auth).await;
        let phone = auth.login("ann@example.com", "correct horse").await.unwrap();
        let laptop = auth.login("ann@example.com", "correct horse").await.unwrap();

        auth.logout(Some(&phone.refresh_token)).await.unwrap();
        assert!(auth.refresh_session(Some(&laptop.refresh_token)).await.is_ok());
    }

    // ------------------------------------------------------------------
    // Registration and federation
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_register_persists_refresh_token() {
        let (auth, store) = setup();
        let reg = registered(&auth).await;

        assert!(reg.user.has_refresh_token(&reg.tokens.refresh_token));
        let stored = store.get(&reg.user.id).unwrap();
        assert!(stored.has_refresh_token(&reg.tokens.refresh_token));
        assert!(stored.password_hash.starts_with("$argon2id$"));
        assert_eq!(stored.username.as_deref(), Some("ann"));
    }

    #[tokio::test]
    async fn test_register_duplicate_email_is_taken() {
        let (auth, _) = setup();
        registered(&auth).await;
        let err = auth
            .register(Registration {
                email: "ann@example.com".to_string(),
                password: "other".to_string(),
                username: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn test_padded_email_is_one_account_everywhere() {
        let (auth, store) = setup();
        let reg = auth
            .register(Registration {
                email: " ann@example.com ".to_string(),
                password: "pw".to_string(),
                username: None,
            })
            .await
            .unwrap();
        assert_eq!(store.get(&reg.user.id).unwrap().email, "ann@example.com");

        let session = auth.login(" ann@example.com ", "pw").await.unwrap();
        assert_eq!(session.user_id, reg.user.id);
        let session = auth.login("ann@example.com", "pw").await.unwrap();
        assert_eq!(session.user_id, reg.user.id);

        let session = auth
            .federated_login(ExternalIdentity::new("ann@example.com  "))
            .await
            .unwrap();
        assert_eq!(session.user_id, reg.user.id);
        assert!(matches!(
            auth.federated_sign_up(ExternalIdentity::new("\tann@example.com"))
                .await,
            Err(AuthError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn test_register_requires_email_and_password() {
        let (auth, _) = setup();
        for (email, password) in [("", "pw"), ("  ", "pw"), ("a@b.c", "")] {
            let err = auth
                .register(Registration {
                    email: email.to_string(),
                    password: password.to_string(),
                    username: None,
                })
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::InvalidRequest { .. }));
        }
    }

    #[tokio::test]
    async fn test_federated_login_creates_then_reuses_account() {
        let (auth, store) = setup();
        let identity = ExternalIdentity::new("gail@gmail.com").with_name("Gail");

        let first = auth.federated_login(identity.clone()).await.unwrap();
        let second = auth.federated_login(identity).await.unwrap();
        assert_eq!(first.user_id, second.user_id);

        let stored = store.get(&first.user_id).unwrap();
        assert_eq!(stored.username.as_deref(), Some("Gail"));
        assert!(stored.password_hash.starts_with("$argon2id$"));
        assert!(stored.has_refresh_token(&first.refresh_token));
        assert!(stored.has_refresh_token(&second.refresh_token));
    }

    #[tokio::test]
    async fn test_federated_login_links_existing_password_account() {
        let (auth, _) = setup();
        let reg = registered(&auth).await;
        let session = auth
            .federated_login(ExternalIdentity::new("ann@example.com"))
            .await
            .unwrap();
        assert_eq!(session.user_id, reg.user.id);
    }

    #[tokio::test]
    async fn test_federated_account_has_no_password_login() {
        let (auth, _) = setup();
        auth.federated_login(ExternalIdentity::new("gail@gmail.com"))
            .await
            .unwrap();
        assert!(matches!(
            auth.login("gail@gmail.com", "").await,
            Err(AuthError::InvalidCredential)
        ));
    }

    #[tokio::test]
    async fn test_federated_sign_up_rejects_existing_email() {
        let (auth, _) = setup();
        registered(&auth).await;
        assert!(matches!(
            auth.federated_sign_up(ExternalIdentity::new("ann@example.com"))
                .await,
            Err(AuthError::EmailTaken)
        ));

        let session = auth
            .federated_sign_up(ExternalIdentity::new("new@gmail.com"))
            .await
            .unwrap();
        assert!(!session.user_id.is_empty());
    }

    #[test]
    fn test_session_tokens_serialize_with_id_field() {
        let tokens = SessionTokens {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            user_id: "u".to_string(),
        };
        let json = serde_json::to_value(&tokens).unwrap();
        assert_eq!(json["accessToken"], "a");
        assert_eq!(json["refreshToken"], "r");
        assert_eq!(json["_id"], "u");
    }
}
