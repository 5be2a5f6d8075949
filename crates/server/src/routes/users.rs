//! Signup and the caller's own profile.

use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use linkbrain_core::Email;
use linkbrain_core::referral::ReferralBonus;

use super::extract::ApiJson;
use crate::db::{SettingsRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::UserProfile;
use crate::services::referral;
use crate::state::AppState;

const MAX_DISPLAY_NAME_LEN: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub display_name: Option<String>,
    /// Redeemed right after the account exists; failures don't block signup.
    pub referral_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub success: bool,
    pub user: UserProfile,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_bonuses: Option<ReferralBonus>,
}

/// Create an account. The trial starts now.
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>)> {
    let pool = state.pool();

    if !SettingsRepository::new(pool).admin_settings().await?.signups_enabled {
        return Err(AppError::Forbidden("Signups are currently disabled".to_string()));
    }

    let email = Email::parse(&body.email).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let display_name = body
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());
    if display_name.is_some_and(|name| name.chars().count() > MAX_DISPLAY_NAME_LEN) {
        return Err(AppError::BadRequest(format!(
            "Display name must be at most {MAX_DISPLAY_NAME_LEN} characters"
        )));
    }

    let now = Utc::now();
    let users = UserRepository::new(pool);
    let user = users.create(&email, display_name, now).await?;
    tracing::info!(user_id = %user.id, "User signed up");

    let referral_bonuses = match body.referral_code.as_deref() {
        Some(code) => {
            let user_id = user.id.to_string();
            match referral::apply(pool, Some(code), Some(&user_id)).await {
                Ok(applied) => Some(applied.bonuses),
                Err(e) => {
                    tracing::warn!(user_id = %user.id, error = %e, "Referral at signup not applied");
                    None
                }
            }
        }
        None => None,
    };

    // Re-read so credits and referral fields reflect a redeemed code.
    let user = users.get_by_id(user.id).await?.unwrap_or(user);
    let credits = users.credits(user.id).await?;
    let token = state.tokens().issue(user.id, now);

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            success: true,
            expires_at: state.tokens().expires_at(now),
            user: UserProfile::new(user, credits, now),
            token,
            referral_bonuses,
        }),
    ))
}

/// The caller's profile. Records the login.
pub async fn me(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<UserProfile>> {
    let now = Utc::now();
    let users = UserRepository::new(state.pool());
    let user = users.touch_login(user_id, now).await?;
    let credits = users.credits(user_id).await?;
    Ok(Json(UserProfile::new(user, credits, now)))
}
