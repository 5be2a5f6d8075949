//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use chrono::FixedOffset;
use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::services::ai::AiClients;
use crate::services::analytics::AnalyticsService;
use crate::services::auth::{AdminCredential, AuthError, TokenSigner};

const AI_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("auth setup failed: {0}")]
    Auth(#[from] AuthError),
    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    tokens: TokenSigner,
    admin: AdminCredential,
    analytics: AnalyticsService,
    ai: AiClients,
}

impl AppState {
    /// # Errors
    ///
    /// Returns an error if the signing keys or the HTTP client cannot be set up.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, StateError> {
        let tokens = TokenSigner::new(&config.auth.token_secret, config.auth.token_ttl_days)?;
        let admin = AdminCredential::new(&config.auth.admin_token, &config.auth.token_secret)?;
        let analytics = AnalyticsService::new(config.utc_offset);

        let http = reqwest::Client::builder()
            .timeout(AI_REQUEST_TIMEOUT)
            .user_agent(concat!("linkbrain/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let ai = AiClients::new(&http, &config.ai);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                admin,
                analytics,
                ai,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenSigner {
        &self.inner.tokens
    }

    #[must_use]
    pub fn admin(&self) -> &AdminCredential {
        &self.inner.admin
    }

    #[must_use]
    pub fn analytics(&self) -> &AnalyticsService {
        &self.inner.analytics
    }

    #[must_use]
    pub fn ai(&self) -> &AiClients {
        &self.inner.ai
    }

    /// Offset used to interpret naive legacy timestamps.
    #[must_use]
    pub fn utc_offset(&self) -> FixedOffset {
        self.inner.config.utc_offset
    }
}
