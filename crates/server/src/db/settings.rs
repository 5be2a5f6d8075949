//! JSONB-backed settings: per-user preferences and the global admin document.

use serde_json::Value as JsonValue;
use sqlx::PgPool;

use linkbrain_core::UserId;

use super::RepositoryError;
use crate::models::settings::ADMIN_SETTINGS_KEY;
use crate::models::{AdminSettings, Preferences};

pub struct SettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SettingsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's preferences, or the defaults if none were saved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored document is not an object.
    pub async fn preferences(&self, user_id: UserId) -> Result<Preferences, RepositoryError> {
        let value: Option<JsonValue> =
            sqlx::query_scalar("SELECT value FROM user_preferences WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .fetch_optional(self.pool)
                .await?;

        value.map_or_else(|| Ok(Preferences::default()), decode)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_preferences(
        &self,
        user_id: UserId,
        preferences: &Preferences,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO user_preferences (user_id, value)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET value = $2, updated_at = NOW()
            ",
        )
        .bind(user_id.as_uuid())
        .bind(encode(preferences)?)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// The admin settings document, or the defaults if it was never written.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn admin_settings(&self) -> Result<AdminSettings, RepositoryError> {
        let value: Option<JsonValue> =
            sqlx::query_scalar("SELECT value FROM admin_settings WHERE key = $1")
                .bind(ADMIN_SETTINGS_KEY)
                .fetch_optional(self.pool)
                .await?;

        value.map_or_else(|| Ok(AdminSettings::default()), decode)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_admin_settings(&self, settings: &AdminSettings) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO admin_settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()
            ",
        )
        .bind(ADMIN_SETTINGS_KEY)
        .bind(encode(settings)?)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: JsonValue) -> Result<T, RepositoryError> {
    serde_json::from_value(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid settings document: {e}")))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<JsonValue, RepositoryError> {
    serde_json::to_value(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("unserializable settings: {e}")))
}
