//! Referral redemption and the caller's referral summary.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use linkbrain_core::UserId;
use linkbrain_core::referral::ReferralBonus;

use super::extract::ApiJson;
use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::Credits;
use crate::services::referral;
use crate::state::AppState;

/// Both fields are optional so a missing one is reported as a 400 naming it
/// rather than as a deserialization failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReferralRequest {
    pub referral_code: Option<String>,
    pub new_user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReferralResponse {
    pub success: bool,
    pub message: &'static str,
    pub bonuses: ReferralBonus,
}

/// Redeem a referral code for a newly registered user.
pub async fn apply(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ApplyReferralRequest>,
) -> Result<Json<ApplyReferralResponse>> {
    let applied = referral::apply(
        state.pool(),
        body.referral_code.as_deref(),
        body.new_user_id.as_deref(),
    )
    .await?;

    Ok(Json(ApplyReferralResponse {
        success: true,
        message: "Referral code applied successfully",
        bonuses: applied.bonuses,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralSummary {
    pub referral_code: String,
    pub referral_count: i32,
    pub referred_by: Option<UserId>,
    /// What the caller's next referral earns.
    pub bonus_per_referral: ReferralBonus,
    pub credits: Option<Credits>,
}

pub async fn show(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<ReferralSummary>> {
    let users = UserRepository::new(state.pool());
    let user = users
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let credits = users.credits(user_id).await?;

    Ok(Json(ReferralSummary {
        bonus_per_referral: ReferralBonus::for_tier(user.tier),
        referral_code: user.referral_code,
        referral_count: user.referral_count,
        referred_by: user.referred_by,
        credits,
    }))
}
