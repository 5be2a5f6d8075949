//! Issuing user bearer tokens from the command line.
//!
//! Reads the same environment as the server (`LINKBRAIN_TOKEN_SECRET` and
//! friends), so issued tokens verify against the running service.

use chrono::{DateTime, Utc};
use thiserror::Error;

use linkbrain_core::UserId;
use linkbrain_server::config::{ConfigError, ServerConfig};
use linkbrain_server::db::{self, RepositoryError, UserRepository};
use linkbrain_server::services::auth::{AuthError, TokenSigner};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid user ID: {0}")]
    InvalidUserId(String),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Signing key error: {0}")]
    Auth(#[from] AuthError),
}

#[derive(Debug)]
pub struct IssuedToken {
    pub token: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// Issue a token for an existing user.
///
/// # Errors
///
/// Returns `TokenError` if the ID is malformed, the user does not exist or
/// the server configuration is incomplete.
pub async fn issue(raw_user_id: &str) -> Result<IssuedToken, TokenError> {
    let user_id: UserId = raw_user_id
        .trim()
        .parse()
        .map_err(|_| TokenError::InvalidUserId(raw_user_id.to_owned()))?;

    let config = ServerConfig::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;

    let user = UserRepository::new(&pool)
        .get_by_id(user_id)
        .await?
        .ok_or(TokenError::UserNotFound(user_id))?;

    let signer = TokenSigner::new(&config.auth.token_secret, config.auth.token_ttl_days)?;
    let now = Utc::now();
    tracing::info!(user_id = %user.id, "Issuing token");

    Ok(IssuedToken {
        token: signer.issue(user.id, now),
        email: user.email.into_inner(),
        expires_at: signer.expires_at(now),
    })
}
