//! Status enums for users and support inquiries.

use serde::{Deserialize, Serialize};

/// Paid plan a user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "subscription_tier", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Pro,
    Premium,
}

impl SubscriptionTier {
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        !matches!(self, Self::Free)
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Pro => write!(f, "pro"),
            Self::Premium => write!(f, "premium"),
        }
    }
}

impl std::str::FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "pro" => Ok(Self::Pro),
            "premium" => Ok(Self::Premium),
            _ => Err(format!("invalid subscription tier: {s}")),
        }
    }
}

/// Lifecycle state of a user's subscription.
///
/// The stored value for a trial user stays `Trial`; whether it has lapsed is
/// computed on read by [`crate::subscription::effective_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "subscription_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Trial,
    Active,
    Expired,
    #[serde(alias = "cancelled")]
    Canceled,
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trial => write!(f, "trial"),
            Self::Active => write!(f, "active"),
            Self::Expired => write!(f, "expired"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trial" => Ok(Self::Trial),
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "canceled" | "cancelled" => Ok(Self::Canceled),
            _ => Err(format!("invalid subscription status: {s}")),
        }
    }
}

/// Support inquiry state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "inquiry_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum InquiryStatus {
    #[default]
    Pending,
    Replied,
    Closed,
}

impl InquiryStatus {
    /// Whether an admin action may move an inquiry from `self` to `next`.
    ///
    /// Replies may be edited (`Replied -> Replied`); `Closed` is terminal.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending | Self::Replied, Self::Replied | Self::Closed)
        )
    }
}

impl std::fmt::Display for InquiryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Replied => write!(f, "replied"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

impl std::str::FromStr for InquiryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "replied" => Ok(Self::Replied),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("invalid inquiry status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inquiry_transitions() {
        use InquiryStatus::{Closed, Pending, Replied};

        assert!(Pending.can_transition_to(Replied));
        assert!(Pending.can_transition_to(Closed));
        assert!(Replied.can_transition_to(Replied));
        assert!(Replied.can_transition_to(Closed));

        assert!(!Closed.can_transition_to(Replied));
        assert!(!Closed.can_transition_to(Pending));
        assert!(!Replied.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_status_parse_accepts_british_spelling() {
        assert_eq!(
            "cancelled".parse::<SubscriptionStatus>(),
            Ok(SubscriptionStatus::Canceled)
        );
        assert!("gold".parse::<SubscriptionTier>().is_err());
    }

    #[test]
    fn test_tier_display_round_trips_through_from_str() {
        for tier in [
            SubscriptionTier::Free,
            SubscriptionTier::Pro,
            SubscriptionTier::Premium,
        ] {
            assert_eq!(tier.to_string().parse::<SubscriptionTier>(), Ok(tier));
        }
    }
}
