//! Trial and subscription state.
//!
//! A user's stored status is only half the answer: a stored `trial` lapses on
//! its own once [`TRIAL_PERIOD_DAYS`] have passed since the trial anchor. The
//! anchor is `trial_start_date` when present, otherwise the account's
//! `created_at`.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::types::{SubscriptionStatus, SubscriptionTier};

/// Length of the free trial.
pub const TRIAL_PERIOD_DAYS: i64 = 15;

/// Instant at which a trial anchored at `anchor` ends.
#[must_use]
pub fn trial_ends_at(anchor: DateTime<Utc>) -> DateTime<Utc> {
    anchor + Duration::days(TRIAL_PERIOD_DAYS)
}

/// The status a user actually has at `now`.
///
/// `Trial` becomes `Expired` exactly at `anchor + 15 days`; every other stored
/// status is returned unchanged.
#[must_use]
pub fn effective_status(
    stored: SubscriptionStatus,
    trial_start: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> SubscriptionStatus {
    match stored {
        SubscriptionStatus::Trial => {
            let anchor = trial_start.unwrap_or(created_at);
            if now < trial_ends_at(anchor) {
                SubscriptionStatus::Trial
            } else {
                SubscriptionStatus::Expired
            }
        }
        other => other,
    }
}

/// Computed subscription view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionState {
    pub tier: SubscriptionTier,
    pub status: SubscriptionStatus,
    /// Set while the stored status is `trial`, even after it lapsed.
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// Whole days left in the trial, rounded up; zero once lapsed.
    pub trial_days_remaining: Option<i64>,
    pub has_premium_access: bool,
}

impl SubscriptionState {
    #[must_use]
    pub fn compute(
        tier: SubscriptionTier,
        stored: SubscriptionStatus,
        trial_start: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        let status = effective_status(stored, trial_start, created_at, now);

        let trial_ends = (stored == SubscriptionStatus::Trial)
            .then(|| trial_ends_at(trial_start.unwrap_or(created_at)));
        let trial_days_remaining = trial_ends.map(|ends| days_remaining(now, ends));

        let has_premium_access = match status {
            SubscriptionStatus::Trial => true,
            SubscriptionStatus::Active => tier.is_paid(),
            SubscriptionStatus::Expired | SubscriptionStatus::Canceled => false,
        };

        Self {
            tier,
            status,
            trial_ends_at: trial_ends,
            trial_days_remaining,
            has_premium_access,
        }
    }
}

fn days_remaining(now: DateTime<Utc>, ends: DateTime<Utc>) -> i64 {
    let left = ends - now;
    if left <= Duration::zero() {
        return 0;
    }
    let whole = left.num_days();
    if left > Duration::days(whole) {
        whole + 1
    } else {
        whole
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_trial_flips_exactly_at_day_fifteen() {
        let boundary = start() + Duration::days(15);

        let just_before = boundary - Duration::seconds(1);
        assert_eq!(
            effective_status(SubscriptionStatus::Trial, Some(start()), start(), just_before),
            SubscriptionStatus::Trial
        );
        assert_eq!(
            effective_status(SubscriptionStatus::Trial, Some(start()), start(), boundary),
            SubscriptionStatus::Expired
        );
    }

    #[test]
    fn test_trial_anchor_falls_back_to_created_at() {
        let created = start();
        let now = created + Duration::days(16);
        assert_eq!(
            effective_status(SubscriptionStatus::Trial, None, created, now),
            SubscriptionStatus::Expired
        );
        assert_eq!(
            effective_status(SubscriptionStatus::Trial, None, created, created + Duration::days(3)),
            SubscriptionStatus::Trial
        );
    }

    #[test]
    fn test_trial_start_takes_precedence_over_created_at() {
        let created = start();
        let restarted = created + Duration::days(20);
        let now = created + Duration::days(25);
        assert_eq!(
            effective_status(SubscriptionStatus::Trial, Some(restarted), created, now),
            SubscriptionStatus::Trial
        );
    }

    #[test]
    fn test_non_trial_status_passes_through() {
        let late = start() + Duration::days(400);
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::Expired,
            SubscriptionStatus::Canceled,
        ] {
            assert_eq!(effective_status(status, None, start(), late), status);
        }
    }

    #[test]
    fn test_state_days_remaining_rounds_up() {
        let now = start() + Duration::days(14) + Duration::hours(1);
        let state = SubscriptionState::compute(
            SubscriptionTier::Free,
            SubscriptionStatus::Trial,
            Some(start()),
            start(),
            now,
        );
        assert_eq!(state.status, SubscriptionStatus::Trial);
        assert_eq!(state.trial_days_remaining, Some(1));
        assert_eq!(state.trial_ends_at, Some(start() + Duration::days(15)));
        assert!(state.has_premium_access);
    }

    #[test]
    fn test_state_after_expiry() {
        let state = SubscriptionState::compute(
            SubscriptionTier::Free,
            SubscriptionStatus::Trial,
            Some(start()),
            start(),
            start() + Duration::days(30),
        );
        assert_eq!(state.status, SubscriptionStatus::Expired);
        assert_eq!(state.trial_days_remaining, Some(0));
        assert!(!state.has_premium_access);
    }

    #[test]
    fn test_active_free_tier_has_no_premium_access() {
        let now = start() + Duration::days(1);
        let free = SubscriptionState::compute(
            SubscriptionTier::Free,
            SubscriptionStatus::Active,
            None,
            start(),
            now,
        );
        let pro = SubscriptionState::compute(
            SubscriptionTier::Pro,
            SubscriptionStatus::Active,
            None,
            start(),
            now,
        );
        assert!(!free.has_premium_access);
        assert!(pro.has_premium_access);
        assert_eq!(pro.trial_ends_at, None);
        assert_eq!(pro.trial_days_remaining, None);
    }
}
