//! Admin dashboard aggregation.
//!
//! Takes a full snapshot of users and clips and reduces it to the numbers the
//! admin dashboard shows. All bucketing by hour, weekday and calendar day is
//! done in the service's local offset, not UTC.
//!
//! # Window
//!
//! The rolling window is the 30 days ending at `now`. The daily series covers
//! the 30 local calendar days ending with today, oldest first.
//!
//! # Retention
//!
//! The cohort is every user created before the window started. A cohort
//! member is retained if they were active inside the window, meaning they
//! logged in or saved a clip. Retention is retained / cohort, or 0 for an
//! empty cohort.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Timelike, Utc};
use serde::Serialize;

use crate::subscription::effective_status;
use crate::types::{Platform, SubscriptionStatus, SubscriptionTier, UserId};

/// Length of the rolling window in days.
pub const WINDOW_DAYS: i64 = 30;

/// Number of platforms listed in the report.
pub const TOP_PLATFORMS: usize = 5;

/// The user fields the aggregation needs.
#[derive(Debug, Clone)]
pub struct UserSnapshot {
    pub id: UserId,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub tier: SubscriptionTier,
    pub status: SubscriptionStatus,
    pub trial_start_date: Option<DateTime<Utc>>,
}

/// The clip fields the aggregation needs.
#[derive(Debug, Clone)]
pub struct ClipSnapshot {
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub platform: Platform,
}

/// One day of the daily series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub signups: u64,
    pub clips: u64,
}

/// Users counted by effective subscription status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub trial: u64,
    pub active: u64,
    pub expired: u64,
    pub canceled: u64,
}

/// Users counted by tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierBreakdown {
    pub free: u64,
    pub pro: u64,
    pub premium: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformCount {
    pub platform: Platform,
    pub clips: u64,
}

/// Everything the admin dashboard shows.
///
/// `Default` is the zeroed report served when the snapshot cannot be read.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub generated_at: Option<DateTime<Utc>>,
    pub total_users: u64,
    pub total_clips: u64,
    pub new_users_30d: u64,
    pub clips_30d: u64,
    pub active_users_30d: u64,
    pub retention_rate: f64,
    pub conversion_rate: f64,
    pub avg_clips_per_user: f64,
    /// Clips saved per local hour of day, index 0 is 00:00-00:59.
    pub hourly_clips: [u64; 24],
    /// Clips saved per local weekday, index 0 is Monday.
    pub weekday_clips: [u64; 7],
    pub daily: Vec<DailyActivity>,
    pub subscriptions: StatusBreakdown,
    pub tiers: TierBreakdown,
    pub top_platforms: Vec<PlatformCount>,
}

/// Reduce a snapshot to an [`AnalyticsReport`].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn aggregate(
    users: &[UserSnapshot],
    clips: &[ClipSnapshot],
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> AnalyticsReport {
    let window_start = now - Duration::days(WINDOW_DAYS);
    let in_window = |t: DateTime<Utc>| t >= window_start && t <= now;

    let today = now.with_timezone(&offset).date_naive();
    let first_day = today - Duration::days(WINDOW_DAYS - 1);
    let mut daily: Vec<DailyActivity> = (0..WINDOW_DAYS)
        .map(|i| DailyActivity {
            date: first_day + Duration::days(i),
            signups: 0,
            clips: 0,
        })
        .collect();
    let day_slot = |t: DateTime<Utc>| -> Option<usize> {
        let day = t.with_timezone(&offset).date_naive();
        usize::try_from((day - first_day).num_days())
            .ok()
            .filter(|i| *i < daily_len())
    };

    let mut report = AnalyticsReport {
        generated_at: Some(now),
        total_users: users.len() as u64,
        total_clips: clips.len() as u64,
        ..AnalyticsReport::default()
    };

    let mut active: HashSet<UserId> = HashSet::new();
    let mut platforms: HashMap<Platform, u64> = HashMap::new();

    for clip in clips {
        let local = clip.created_at.with_timezone(&offset);
        if let Some(slot) = report.hourly_clips.get_mut(local.hour() as usize) {
            *slot += 1;
        }
        if let Some(slot) = report
            .weekday_clips
            .get_mut(local.weekday().num_days_from_monday() as usize)
        {
            *slot += 1;
        }
        *platforms.entry(clip.platform).or_insert(0) += 1;

        if in_window(clip.created_at) {
            report.clips_30d += 1;
            active.insert(clip.user_id);
        }
        if let Some(day) = day_slot(clip.created_at).and_then(|i| daily.get_mut(i)) {
            day.clips += 1;
        }
    }

    let mut cohort = 0_u64;
    let mut retained = 0_u64;
    let mut paid_active = 0_u64;

    for user in users {
        if user.last_login_at.is_some_and(in_window) {
            active.insert(user.id);
        }
        if in_window(user.created_at) {
            report.new_users_30d += 1;
        }
        if let Some(day) = day_slot(user.created_at).and_then(|i| daily.get_mut(i)) {
            day.signups += 1;
        }

        let status = effective_status(user.status, user.trial_start_date, user.created_at, now);
        match status {
            SubscriptionStatus::Trial => report.subscriptions.trial += 1,
            SubscriptionStatus::Active => report.subscriptions.active += 1,
            SubscriptionStatus::Expired => report.subscriptions.expired += 1,
            SubscriptionStatus::Canceled => report.subscriptions.canceled += 1,
        }
        match user.tier {
            SubscriptionTier::Free => report.tiers.free += 1,
            SubscriptionTier::Pro => report.tiers.pro += 1,
            SubscriptionTier::Premium => report.tiers.premium += 1,
        }
        if status == SubscriptionStatus::Active && user.tier.is_paid() {
            paid_active += 1;
        }
    }

    for user in users.iter().filter(|u| u.created_at < window_start) {
        cohort += 1;
        if active.contains(&user.id) {
            retained += 1;
        }
    }

    // Clips from deleted accounts still count as activity but not as users.
    let known: HashSet<UserId> = users.iter().map(|u| u.id).collect();
    report.active_users_30d = active.iter().filter(|id| known.contains(id)).count() as u64;

    report.retention_rate = ratio(retained, cohort);
    report.conversion_rate = ratio(paid_active, report.total_users);
    report.avg_clips_per_user = ratio(report.total_clips, report.total_users);

    let mut top: Vec<PlatformCount> = platforms
        .into_iter()
        .map(|(platform, clips)| PlatformCount { platform, clips })
        .collect();
    top.sort_by(|a, b| b.clips.cmp(&a.clips).then(a.platform.cmp(&b.platform)));
    top.truncate(TOP_PLATFORMS);
    report.top_platforms = top;

    report.daily = daily;
    report
}

#[allow(clippy::cast_possible_truncation)]
const fn daily_len() -> usize {
    WINDOW_DAYS as usize
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::timestamp::offset_from_hours;

    fn kst() -> FixedOffset {
        offset_from_hours(9).unwrap()
    }

    fn now() -> DateTime<Utc> {
        // Wednesday 2025-06-18 12:00 KST
        Utc.with_ymd_and_hms(2025, 6, 18, 3, 0, 0).unwrap()
    }

    fn user(created_days_ago: i64, last_login_days_ago: Option<i64>) -> UserSnapshot {
        UserSnapshot {
            id: UserId::new_v4(),
            created_at: now() - Duration::days(created_days_ago),
            last_login_at: last_login_days_ago.map(|d| now() - Duration::days(d)),
            tier: SubscriptionTier::Free,
            status: SubscriptionStatus::Trial,
            trial_start_date: None,
        }
    }

    fn clip(user_id: UserId, at: DateTime<Utc>, platform: Platform) -> ClipSnapshot {
        ClipSnapshot {
            user_id,
            created_at: at,
            platform,
        }
    }

    #[test]
    fn test_empty_snapshot_is_zeroed_except_daily() {
        let report = aggregate(&[], &[], now(), kst());
        assert_eq!(report.total_users, 0);
        assert!(report.retention_rate.abs() < f64::EPSILON);
        assert_eq!(report.daily.len(), 30);
        assert!(report.daily.iter().all(|d| d.signups == 0 && d.clips == 0));
    }

    #[test]
    fn test_default_report_is_zeroed() {
        let report = AnalyticsReport::default();
        assert_eq!(report.generated_at, None);
        assert_eq!(report.hourly_clips, [0; 24]);
        assert!(report.daily.is_empty());
    }

    #[test]
    fn test_hourly_and_weekday_use_local_offset() {
        let owner = user(100, None);
        // 2025-06-15 23:30 UTC is Monday 2025-06-16 08:30 KST
        let at = Utc.with_ymd_and_hms(2025, 6, 15, 23, 30, 0).unwrap();
        let report = aggregate(
            std::slice::from_ref(&owner),
            &[clip(owner.id, at, Platform::Youtube)],
            now(),
            kst(),
        );
        assert_eq!(report.hourly_clips[8], 1);
        assert_eq!(report.hourly_clips.iter().sum::<u64>(), 1);
        assert_eq!(report.weekday_clips[0], 1);
    }

    #[test]
    fn test_retention_counts_cohort_activity() {
        let login_recent = user(60, Some(2));
        let clip_recent = user(90, Some(45));
        let dormant = user(45, Some(40));
        let newcomer = user(3, Some(1));

        let clips = vec![clip(clip_recent.id, now() - Duration::days(5), Platform::Web)];
        let users = vec![login_recent, clip_recent, dormant, newcomer];
        let report = aggregate(&users, &clips, now(), kst());

        // cohort = 3 users created before the window, 2 of them active
        assert!((report.retention_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.active_users_30d, 3);
        assert_eq!(report.new_users_30d, 1);
    }

    #[test]
    fn test_daily_series_buckets_by_local_day() {
        let owner = user(100, None);
        // 2025-06-17 16:00 UTC is 2025-06-18 01:00 KST, i.e. today
        let late = Utc.with_ymd_and_hms(2025, 6, 17, 16, 0, 0).unwrap();
        let report = aggregate(
            std::slice::from_ref(&owner),
            &[clip(owner.id, late, Platform::Web)],
            now(),
            kst(),
        );
        let last = report.daily.last().unwrap();
        assert_eq!(last.date, NaiveDate::from_ymd_opt(2025, 6, 18).unwrap());
        assert_eq!(last.clips, 1);
        assert_eq!(report.daily[0].date, NaiveDate::from_ymd_opt(2025, 5, 20).unwrap());
    }

    #[test]
    fn test_subscription_breakdown_uses_effective_status() {
        let fresh_trial = user(3, None);
        let lapsed_trial = user(20, None);
        let mut paying = user(200, None);
        paying.tier = SubscriptionTier::Pro;
        paying.status = SubscriptionStatus::Active;

        let report = aggregate(&[fresh_trial, lapsed_trial, paying], &[], now(), kst());
        assert_eq!(report.subscriptions.trial, 1);
        assert_eq!(report.subscriptions.expired, 1);
        assert_eq!(report.subscriptions.active, 1);
        assert_eq!(report.tiers.pro, 1);
        assert!((report.conversion_rate - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_platforms_sorted_and_truncated() {
        let owner = user(100, None);
        let at = now() - Duration::days(1);
        let mut clips = Vec::new();
        for (platform, n) in [
            (Platform::Youtube, 5),
            (Platform::Github, 3),
            (Platform::Web, 3),
            (Platform::Medium, 2),
            (Platform::Brunch, 1),
            (Platform::Tiktok, 1),
        ] {
            for _ in 0..n {
                clips.push(clip(owner.id, at, platform));
            }
        }

        let report = aggregate(std::slice::from_ref(&owner), &clips, now(), kst());
        let order: Vec<Platform> = report.top_platforms.iter().map(|p| p.platform).collect();
        assert_eq!(
            order,
            vec![
                Platform::Youtube,
                Platform::Github,
                Platform::Web,
                Platform::Medium,
                Platform::Tiktok,
            ]
        );
        assert!((report.avg_clips_per_user - 15.0).abs() < 1e-9);
    }
}
