//! Referral codes and bonus rules.
//!
//! Every user owns one referral code. A new user may redeem exactly one code;
//! redeeming credits both sides according to the referrer's tier.

use core::fmt;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::types::{SubscriptionTier, UserId};

/// Characters used in generated codes (no 0/O or 1/I).
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const GENERATED_LENGTH: usize = 8;
const MIN_LENGTH: usize = 4;
const MAX_LENGTH: usize = 16;

/// Errors that can occur when parsing a [`ReferralCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferralCodeError {
    #[error("referral code must be {MIN_LENGTH}-{MAX_LENGTH} characters")]
    Length,
    #[error("referral code may only contain letters and digits")]
    InvalidCharacter,
}

/// A normalized referral code (upper-case ASCII alphanumerics).
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ReferralCode(String);

impl ReferralCode {
    /// Parse user input, trimming and upper-casing it.
    ///
    /// # Errors
    ///
    /// Returns `ReferralCodeError` if the code has the wrong length or
    /// contains anything other than ASCII letters and digits.
    pub fn parse(s: &str) -> Result<Self, ReferralCodeError> {
        let code = s.trim().to_ascii_uppercase();
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&code.len()) {
            return Err(ReferralCodeError::Length);
        }
        if !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ReferralCodeError::InvalidCharacter);
        }
        Ok(Self(code))
    }

    /// Generate a fresh random code.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::rng())
    }

    /// Generate a code from the given RNG.
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..GENERATED_LENGTH)
            .filter_map(|_| CODE_ALPHABET.choose(rng).copied().map(char::from))
            .collect();
        Self(code)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferralCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ReferralCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Credits granted when a referral is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralBonus {
    pub referrer: i32,
    pub new_user: i32,
}

impl ReferralBonus {
    /// Fixed bonus table keyed by the referrer's tier.
    #[must_use]
    pub const fn for_tier(referrer_tier: SubscriptionTier) -> Self {
        match referrer_tier {
            SubscriptionTier::Free => Self {
                referrer: 10,
                new_user: 5,
            },
            SubscriptionTier::Pro => Self {
                referrer: 20,
                new_user: 10,
            },
            SubscriptionTier::Premium => Self {
                referrer: 30,
                new_user: 10,
            },
        }
    }
}

/// The facts about one side of a referral needed to decide it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferralParty {
    pub id: UserId,
    pub tier: SubscriptionTier,
    pub referred_by: Option<UserId>,
}

/// Why a referral cannot be applied.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferralError {
    #[error("users cannot apply their own referral code")]
    SelfReferral,
    #[error("a referral code has already been applied to this account")]
    AlreadyApplied,
}

/// Decide whether `invitee` may redeem `referrer`'s code.
///
/// # Errors
///
/// Returns [`ReferralError::SelfReferral`] when both parties are the same user
/// and [`ReferralError::AlreadyApplied`] when the invitee already redeemed a code.
pub fn check_eligibility(
    referrer: &ReferralParty,
    invitee: &ReferralParty,
) -> Result<ReferralBonus, ReferralError> {
    if invitee.referred_by.is_some() {
        return Err(ReferralError::AlreadyApplied);
    }
    if referrer.id == invitee.id {
        return Err(ReferralError::SelfReferral);
    }
    Ok(ReferralBonus::for_tier(referrer.tier))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn party(tier: SubscriptionTier, referred_by: Option<UserId>) -> ReferralParty {
        ReferralParty {
            id: UserId::new_v4(),
            tier,
            referred_by,
        }
    }

    #[test]
    fn test_bonus_table() {
        assert_eq!(
            ReferralBonus::for_tier(SubscriptionTier::Free),
            ReferralBonus {
                referrer: 10,
                new_user: 5
            }
        );
        assert_eq!(
            ReferralBonus::for_tier(SubscriptionTier::Pro),
            ReferralBonus {
                referrer: 20,
                new_user: 10
            }
        );
        assert_eq!(
            ReferralBonus::for_tier(SubscriptionTier::Premium),
            ReferralBonus {
                referrer: 30,
                new_user: 10
            }
        );
    }

    #[test]
    fn test_eligibility_uses_referrer_tier() {
        let referrer = party(SubscriptionTier::Pro, None);
        let invitee = party(SubscriptionTier::Premium, None);
        assert_eq!(
            check_eligibility(&referrer, &invitee),
            Ok(ReferralBonus::for_tier(SubscriptionTier::Pro))
        );
    }

    #[test]
    fn test_second_redemption_is_rejected() {
        let referrer = party(SubscriptionTier::Free, None);
        let other = party(SubscriptionTier::Free, None);
        let invitee = party(SubscriptionTier::Free, Some(other.id));
        assert_eq!(
            check_eligibility(&referrer, &invitee),
            Err(ReferralError::AlreadyApplied)
        );
    }

    #[test]
    fn test_self_referral_is_rejected() {
        let user = party(SubscriptionTier::Free, None);
        assert_eq!(
            check_eligibility(&user, &user),
            Err(ReferralError::SelfReferral)
        );
    }

    #[test]
    fn test_code_parse_normalizes() {
        assert_eq!(ReferralCode::parse(" ab12cd34 ").unwrap().as_str(), "AB12CD34");
        assert_eq!(ReferralCode::parse("abc"), Err(ReferralCodeError::Length));
        assert_eq!(
            ReferralCode::parse("AB-12CD"),
            Err(ReferralCodeError::InvalidCharacter)
        );
    }

    #[test]
    fn test_generated_codes_are_valid() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let code = ReferralCode::generate_with(&mut rng);
            assert_eq!(code.as_str().len(), GENERATED_LENGTH);
            assert!(!code.as_str().contains(['0', 'O', '1', 'I']));
            assert_eq!(ReferralCode::parse(code.as_str()).unwrap(), code);
        }
    }
}
