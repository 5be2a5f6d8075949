//! Account administration.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use linkbrain_core::{SubscriptionStatus, SubscriptionTier, UserId};

use crate::db::UserRepository;
use crate::db::users::SubscriptionUpdate;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::UserProfile;
use crate::routes::extract::{ApiJson, ApiPath, ApiQuery, PageParams, nullable};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Serialize)]
pub struct UserPage {
    pub users: Vec<UserProfile>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Accounts, newest first, with their effective subscription state.
pub async fn list(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<Json<UserPage>> {
    let (limit, offset) = page.resolve(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    let repo = UserRepository::new(state.pool());
    let now = Utc::now();

    let users = repo
        .list(limit, offset)
        .await?
        .into_iter()
        .map(|user| UserProfile::new(user, None, now))
        .collect();

    Ok(Json(UserPage {
        users,
        total: repo.count().await?,
        limit,
        offset,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    pub tier: Option<SubscriptionTier>,
    pub status: Option<SubscriptionStatus>,
    #[serde(default, deserialize_with = "nullable")]
    pub trial_start_date: Option<Option<DateTime<Utc>>>,
}

pub async fn update_subscription(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(body): ApiJson<SubscriptionRequest>,
) -> Result<Json<UserProfile>> {
    if body.tier.is_none() && body.status.is_none() && body.trial_start_date.is_none() {
        return Err(AppError::BadRequest("No changes given".to_string()));
    }

    let repo = UserRepository::new(state.pool());
    let user = repo
        .update_subscription(
            id,
            &SubscriptionUpdate {
                tier: body.tier,
                status: body.status,
                trial_start_date: body.trial_start_date,
            },
        )
        .await?;
    tracing::info!(
        user_id = %id,
        tier = %user.tier,
        status = %user.subscription_status,
        "Subscription updated by admin"
    );

    let credits = repo.credits(id).await?;
    Ok(Json(UserProfile::new(user, credits, Utc::now())))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub user_id: UserId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Mint a bearer token for a user, for support and client setup.
pub async fn issue_token(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<IssuedToken>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let now = Utc::now();
    tracing::info!(user_id = %user.id, "Token issued by admin");
    Ok(Json(IssuedToken {
        user_id: user.id,
        token: state.tokens().issue(user.id, now),
        expires_at: state.tokens().expires_at(now),
    }))
}
