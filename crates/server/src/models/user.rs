//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use linkbrain_core::analytics::UserSnapshot;
use linkbrain_core::referral::ReferralParty;
use linkbrain_core::subscription::SubscriptionState;
use linkbrain_core::{Email, SubscriptionStatus, SubscriptionTier, UserId};

use super::Credits;

/// A LinkBrain account.
///
/// `subscription_status` is the stored value; use [`User::subscription`] for
/// the status the user actually has now.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub display_name: Option<String>,
    pub tier: SubscriptionTier,
    pub subscription_status: SubscriptionStatus,
    pub trial_start_date: Option<DateTime<Utc>>,
    pub referral_code: String,
    pub referred_by: Option<UserId>,
    pub referral_code_used: Option<String>,
    pub referral_count: i32,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Subscription view as of `now`.
    #[must_use]
    pub fn subscription(&self, now: DateTime<Utc>) -> SubscriptionState {
        SubscriptionState::compute(
            self.tier,
            self.subscription_status,
            self.trial_start_date,
            self.created_at,
            now,
        )
    }

    #[must_use]
    pub const fn referral_party(&self) -> ReferralParty {
        ReferralParty {
            id: self.id,
            tier: self.tier,
            referred_by: self.referred_by,
        }
    }

    #[must_use]
    pub const fn snapshot(&self) -> UserSnapshot {
        UserSnapshot {
            id: self.id,
            created_at: self.created_at,
            last_login_at: self.last_login_at,
            tier: self.tier,
            status: self.subscription_status,
            trial_start_date: self.trial_start_date,
        }
    }
}

/// What a user (or an admin) sees about an account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub email: Email,
    pub display_name: Option<String>,
    pub referral_code: String,
    pub referral_count: i32,
    pub referred_by: Option<UserId>,
    pub subscription: SubscriptionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<Credits>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    #[must_use]
    pub fn new(user: User, credits: Option<Credits>, now: DateTime<Utc>) -> Self {
        let subscription = user.subscription(now);
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            referral_code: user.referral_code,
            referral_count: user.referral_count,
            referred_by: user.referred_by,
            subscription,
            credits,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn user(created_at: DateTime<Utc>) -> User {
        User {
            id: UserId::new_v4(),
            email: Email::parse("minji@linkbrain.io").unwrap(),
            display_name: Some("Minji".to_string()),
            tier: SubscriptionTier::Free,
            subscription_status: SubscriptionStatus::Trial,
            trial_start_date: None,
            referral_code: "ABCD2345".to_string(),
            referred_by: None,
            referral_code_used: None,
            referral_count: 0,
            created_at,
            last_login_at: None,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_profile_reports_effective_status() {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let profile = UserProfile::new(user(created), None, created + Duration::days(20));

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["subscription"]["status"], "expired");
        assert_eq!(json["subscription"]["hasPremiumAccess"], false);
        assert_eq!(json["referralCode"], "ABCD2345");
        assert!(json.get("credits").is_none());
    }
}
