//! Applying a referral code to a newly signed-up user.
//!
//! One conditional read (both users, eligibility) followed by one atomic
//! write ([`crate::db::apply_referral`]).

use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use linkbrain_core::UserId;
use linkbrain_core::referral::{ReferralBonus, ReferralCode, ReferralError, check_eligibility};

use crate::db::{ReferralWrite, RepositoryError, SettingsRepository, UserRepository, apply_referral};
use crate::error::AppError;

/// Why a referral was not applied.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("Missing {0}")]
    MissingField(&'static str),

    #[error("The referral program is currently disabled")]
    Disabled,

    #[error("Invalid referral code")]
    InvalidCode,

    #[error("User not found")]
    UserNotFound,

    #[error("You cannot use your own referral code")]
    SelfReferral,

    #[error("A referral code has already been applied to this account")]
    AlreadyApplied,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<ReferralError> for ApplyError {
    fn from(err: ReferralError) -> Self {
        match err {
            ReferralError::SelfReferral => Self::SelfReferral,
            ReferralError::AlreadyApplied => Self::AlreadyApplied,
        }
    }
}

impl From<ApplyError> for AppError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::MissingField(_)
            | ApplyError::Disabled
            | ApplyError::SelfReferral
            | ApplyError::AlreadyApplied => Self::BadRequest(err.to_string()),
            ApplyError::InvalidCode | ApplyError::UserNotFound => Self::NotFound(err.to_string()),
            ApplyError::Repository(e) => Self::Database(e),
        }
    }
}

/// A successful application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedReferral {
    pub referrer_id: UserId,
    pub bonuses: ReferralBonus,
}

/// Apply `raw_code` on behalf of `raw_user_id`.
///
/// Inputs arrive unvalidated so that each kind of bad input maps to its own
/// error: absent fields are `MissingField`, an unknown or malformed code is
/// `InvalidCode`, an unknown or malformed user ID is `UserNotFound`.
///
/// # Errors
///
/// Returns `ApplyError` describing why the referral was not applied.
#[instrument(skip(pool))]
pub async fn apply(
    pool: &PgPool,
    raw_code: Option<&str>,
    raw_user_id: Option<&str>,
) -> Result<AppliedReferral, ApplyError> {
    let raw_code = non_blank(raw_code).ok_or(ApplyError::MissingField("referralCode"))?;
    let raw_user_id = non_blank(raw_user_id).ok_or(ApplyError::MissingField("newUserId"))?;

    if !SettingsRepository::new(pool).admin_settings().await?.referrals_enabled {
        return Err(ApplyError::Disabled);
    }

    let code = ReferralCode::parse(raw_code).map_err(|_| ApplyError::InvalidCode)?;
    let invitee_id: UserId = raw_user_id.parse().map_err(|_| ApplyError::UserNotFound)?;

    let users = UserRepository::new(pool);
    let referrer = users
        .get_by_referral_code(&code)
        .await?
        .ok_or(ApplyError::InvalidCode)?;
    let invitee = users
        .get_by_id(invitee_id)
        .await?
        .ok_or(ApplyError::UserNotFound)?;

    let bonuses = check_eligibility(&referrer.referral_party(), &invitee.referral_party())?;

    match apply_referral(pool, referrer.id, invitee.id, &code, bonuses).await? {
        ReferralWrite::Applied => {
            tracing::info!(
                referrer_id = %referrer.id,
                invitee_id = %invitee.id,
                referrer_bonus = bonuses.referrer,
                new_user_bonus = bonuses.new_user,
                "Referral applied"
            );
            Ok(AppliedReferral {
                referrer_id: referrer.id,
                bonuses,
            })
        }
        ReferralWrite::AlreadyApplied => Err(ApplyError::AlreadyApplied),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let status = |err: ApplyError| AppError::from(err).status();
        assert_eq!(status(ApplyError::MissingField("referralCode")), StatusCode::BAD_REQUEST);
        assert_eq!(status(ApplyError::Disabled), StatusCode::BAD_REQUEST);
        assert_eq!(status(ApplyError::SelfReferral), StatusCode::BAD_REQUEST);
        assert_eq!(status(ApplyError::AlreadyApplied), StatusCode::BAD_REQUEST);
        assert_eq!(status(ApplyError::InvalidCode), StatusCode::NOT_FOUND);
        assert_eq!(status(ApplyError::UserNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status(ApplyError::Repository(RepositoryError::DataCorruption("x".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_missing_field_message() {
        assert_eq!(
            ApplyError::MissingField("newUserId").to_string(),
            "Missing newUserId"
        );
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some(" AB12 ")), Some("AB12"));
    }
}
