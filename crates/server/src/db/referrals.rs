//! The referral write: one transaction covering both users and both balances.

use sqlx::PgPool;

use linkbrain_core::UserId;
use linkbrain_core::referral::{ReferralBonus, ReferralCode};

use super::RepositoryError;

/// Outcome of the referral transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferralWrite {
    Applied,
    /// The invitee gained a referrer between the eligibility read and the
    /// write; nothing was changed.
    AlreadyApplied,
}

/// Link `invitee` to `referrer` and credit both.
///
/// The invitee update is conditional on `referred_by IS NULL`, so of two
/// concurrent redemptions exactly one commits.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if any statement fails; the
/// transaction is rolled back.
pub async fn apply_referral(
    pool: &PgPool,
    referrer: UserId,
    invitee: UserId,
    code: &ReferralCode,
    bonus: ReferralBonus,
) -> Result<ReferralWrite, RepositoryError> {
    let mut tx = pool.begin().await?;

    let linked = sqlx::query(
        r"
        UPDATE users
        SET referred_by = $2, referral_code_used = $3, updated_at = NOW()
        WHERE id = $1 AND referred_by IS NULL
        ",
    )
    .bind(invitee.as_uuid())
    .bind(referrer.as_uuid())
    .bind(code.as_str())
    .execute(&mut *tx)
    .await?;

    if linked.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(ReferralWrite::AlreadyApplied);
    }

    sqlx::query(
        "UPDATE users SET referral_count = referral_count + 1, updated_at = NOW() WHERE id = $1",
    )
    .bind(referrer.as_uuid())
    .execute(&mut *tx)
    .await?;

    for (user, amount) in [(referrer, bonus.referrer), (invitee, bonus.new_user)] {
        sqlx::query(
            r"
            INSERT INTO user_credits (user_id, balance, lifetime_earned)
            VALUES ($1, $2, $2)
            ON CONFLICT (user_id) DO UPDATE SET
                balance = user_credits.balance + EXCLUDED.balance,
                lifetime_earned = user_credits.lifetime_earned + EXCLUDED.lifetime_earned,
                updated_at = NOW()
            ",
        )
        .bind(user.as_uuid())
        .bind(amount)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(ReferralWrite::Applied)
}
