//! Preferences and credit balance.

use axum::{Json, extract::State};
use chrono::Utc;

use super::extract::ApiJson;
use crate::db::{CategoryRepository, SettingsRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::{Credits, Preferences};
use crate::state::AppState;

const SUPPORTED_LANGUAGES: &[&str] = &["ko", "en", "ja"];
const SUPPORTED_THEMES: &[&str] = &["system", "light", "dark"];

pub async fn preferences(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<Preferences>> {
    let preferences = SettingsRepository::new(state.pool())
        .preferences(user_id)
        .await?;
    Ok(Json(preferences))
}

/// Replace the caller's preferences. Omitted fields take their defaults.
pub async fn update_preferences(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    ApiJson(preferences): ApiJson<Preferences>,
) -> Result<Json<Preferences>> {
    validate(&preferences)?;
    if let Some(category_id) = preferences.default_category_id
        && CategoryRepository::new(state.pool())
            .get(user_id, category_id)
            .await?
            .is_none()
    {
        return Err(AppError::BadRequest("Unknown default category".to_string()));
    }

    SettingsRepository::new(state.pool())
        .set_preferences(user_id, &preferences)
        .await?;
    Ok(Json(preferences))
}

/// Credit balance. Accounts predating credits read as an empty balance.
pub async fn credits(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<Credits>> {
    let credits = UserRepository::new(state.pool())
        .credits(user_id)
        .await?
        .unwrap_or(Credits {
            balance: 0,
            lifetime_earned: 0,
            updated_at: Utc::now(),
        });
    Ok(Json(credits))
}

fn validate(preferences: &Preferences) -> Result<()> {
    if !SUPPORTED_LANGUAGES.contains(&preferences.language.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Unsupported language: {}",
            preferences.language
        )));
    }
    if !SUPPORTED_THEMES.contains(&preferences.theme.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Unsupported theme: {}",
            preferences.theme
        )));
    }
    Ok(())
}
