//! User repository: accounts, subscription state and credit balances.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use linkbrain_core::referral::ReferralCode;
use linkbrain_core::{Email, SubscriptionStatus, SubscriptionTier, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Credits, User};

/// Attempts at drawing an unused referral code before giving up.
const REFERRAL_CODE_ATTEMPTS: usize = 5;
const REFERRAL_CODE_TAKEN: &str = "referral code already taken";

const USER_COLUMNS: &str = "id, email, display_name, tier, subscription_status, \
     trial_start_date, referral_code, referred_by, referral_code_used, \
     referral_count, created_at, last_login_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    display_name: Option<String>,
    tier: SubscriptionTier,
    subscription_status: SubscriptionStatus,
    trial_start_date: Option<DateTime<Utc>>,
    referral_code: String,
    referred_by: Option<Uuid>,
    referral_code_used: Option<String>,
    referral_count: i32,
    created_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            display_name: row.display_name,
            tier: row.tier,
            subscription_status: row.subscription_status,
            trial_start_date: row.trial_start_date,
            referral_code: row.referral_code,
            referred_by: row.referred_by.map(UserId::new),
            referral_code_used: row.referral_code_used,
            referral_count: row.referral_count,
            created_at: row.created_at,
            last_login_at: row.last_login_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CreditsRow {
    balance: i32,
    lifetime_earned: i32,
    updated_at: DateTime<Utc>,
}

impl From<CreditsRow> for Credits {
    fn from(row: CreditsRow) -> Self {
        Self {
            balance: row.balance,
            lifetime_earned: row.lifetime_earned,
            updated_at: row.updated_at,
        }
    }
}

/// Subscription fields an admin may overwrite. `None` leaves a field as is;
/// `trial_start_date: Some(None)` clears the trial anchor.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionUpdate {
    pub tier: Option<SubscriptionTier>,
    pub status: Option<SubscriptionStatus>,
    pub trial_start_date: Option<Option<DateTime<Utc>>>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a user on a fresh trial, with a newly drawn referral code and a
    /// zero credit balance.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        email: &Email,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<User, RepositoryError> {
        for _ in 0..REFERRAL_CODE_ATTEMPTS {
            let code = ReferralCode::generate();
            match self.insert(email, display_name, code.as_str(), now).await {
                Err(RepositoryError::Conflict(ref what)) if what == REFERRAL_CODE_TAKEN => {
                    tracing::debug!(code = %code, "Referral code collision, drawing again");
                }
                result => return result,
            }
        }
        Err(RepositoryError::Conflict(
            "could not allocate a unique referral code".to_owned(),
        ))
    }

    async fn insert(
        &self,
        email: &Email,
        display_name: Option<&str>,
        referral_code: &str,
        now: DateTime<Utc>,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            INSERT INTO users (id, email, display_name, tier, subscription_status,
                               trial_start_date, referral_code, created_at, updated_at)
            VALUES ($1, $2, $3, 'free', 'trial', $4, $5, $4, $4)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(Uuid::new_v4())
        .bind(email.as_str())
        .bind(display_name)
        .bind(now)
        .bind(referral_code)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("users_referral_code_key")
            {
                return RepositoryError::Conflict(REFERRAL_CODE_TAKEN.to_owned());
            }
            conflict_on_unique(e, "An account with this email already exists")
        })?;

        sqlx::query("INSERT INTO user_credits (user_id, balance, lifetime_earned) VALUES ($1, 0, 0)")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        row.try_into()
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Find the owner of a referral code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE referral_code = $1"
        ))
        .bind(code.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// List users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Every user, for analytics.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users"))
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Record a login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn touch_login(&self, id: UserId, now: DateTime<Utc>) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET last_login_at = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(now)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Overwrite subscription fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update_subscription(
        &self,
        id: UserId,
        update: &SubscriptionUpdate,
    ) -> Result<User, RepositoryError> {
        let (set_trial, trial_start) = match update.trial_start_date {
            Some(value) => (true, value),
            None => (false, None),
        };

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE users SET
                tier = COALESCE($2, tier),
                subscription_status = COALESCE($3, subscription_status),
                trial_start_date = CASE WHEN $4 THEN $5 ELSE trial_start_date END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(update.tier)
        .bind(update.status)
        .bind(set_trial)
        .bind(trial_start)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Credit balance for a user, if a credits row exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn credits(&self, id: UserId) -> Result<Option<Credits>, RepositoryError> {
        let row = sqlx::query_as::<_, CreditsRow>(
            "SELECT balance, lifetime_earned, updated_at FROM user_credits WHERE user_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}
