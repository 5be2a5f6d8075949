//! Bearer tokens for users and the admin credential check.
//!
//! A user token is `"{user_id}.{issued_at}.{signature}"` where `issued_at` is
//! a Unix timestamp in seconds and `signature` is the URL-safe base64
//! (unpadded) HMAC-SHA256 of `"{user_id}.{issued_at}"`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

use linkbrain_core::UserId;

type HmacSha256 = Hmac<Sha256>;

/// Tolerated clock skew for tokens issued by another instance.
const MAX_CLOCK_SKEW_SECS: i64 = 300;

/// Errors that can occur while issuing or verifying tokens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("malformed token")]
    Malformed,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("signing key rejected")]
    InvalidKey,
}

/// Issues and verifies user bearer tokens.
#[derive(Clone)]
pub struct TokenSigner {
    mac: HmacSha256,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("mac", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenSigner {
    /// # Errors
    ///
    /// Returns `AuthError::InvalidKey` if the key cannot initialize HMAC.
    pub fn new(secret: &SecretString, ttl_days: i64) -> Result<Self, AuthError> {
        let mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
            .map_err(|_| AuthError::InvalidKey)?;
        Ok(Self {
            mac,
            ttl: Duration::days(ttl_days),
        })
    }

    /// Issue a token for `user_id` valid from `now`.
    #[must_use]
    pub fn issue(&self, user_id: UserId, now: DateTime<Utc>) -> String {
        let payload = format!("{user_id}.{}", now.timestamp());
        let signature = URL_SAFE_NO_PAD.encode(self.sign(&payload));
        format!("{payload}.{signature}")
    }

    /// Instant at which a token issued at `issued_at` stops being accepted.
    #[must_use]
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> DateTime<Utc> {
        issued_at + self.ttl
    }

    /// Check a token's signature and age and return the user it names.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Malformed` if the token does not have three
    /// well-formed parts, `AuthError::InvalidSignature` if it was not signed
    /// with this key and `AuthError::Expired` if it is older than the TTL.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, AuthError> {
        let (payload, signature) = token.trim().rsplit_once('.').ok_or(AuthError::Malformed)?;
        let (user_part, issued_part) = payload.split_once('.').ok_or(AuthError::Malformed)?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::Malformed)?;

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidSignature)?;

        let user_id: UserId = user_part.parse().map_err(|_| AuthError::Malformed)?;
        let issued_secs: i64 = issued_part.parse().map_err(|_| AuthError::Malformed)?;
        let issued_at = DateTime::from_timestamp(issued_secs, 0).ok_or(AuthError::Malformed)?;

        if issued_at > now + Duration::seconds(MAX_CLOCK_SKEW_SECS) {
            return Err(AuthError::Malformed);
        }
        if now >= self.expires_at(issued_at) {
            return Err(AuthError::Expired);
        }

        Ok(user_id)
    }

    fn sign(&self, payload: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// Constant-time check of the configured admin bearer token.
///
/// Both sides are run through HMAC so the comparison cost does not depend on
/// where the candidate first differs.
#[derive(Clone)]
pub struct AdminCredential {
    mac: HmacSha256,
    expected: Vec<u8>,
}

impl std::fmt::Debug for AdminCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AdminCredential([REDACTED])")
    }
}

impl AdminCredential {
    /// # Errors
    ///
    /// Returns `AuthError::InvalidKey` if the key cannot initialize HMAC.
    pub fn new(admin_token: &SecretString, key: &SecretString) -> Result<Self, AuthError> {
        let mac = HmacSha256::new_from_slice(key.expose_secret().as_bytes())
            .map_err(|_| AuthError::InvalidKey)?;
        let mut expected_mac = mac.clone();
        expected_mac.update(admin_token.expose_secret().as_bytes());
        let expected = expected_mac.finalize().into_bytes().to_vec();
        Ok(Self { mac, expected })
    }

    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        let mut mac = self.mac.clone();
        mac.update(candidate.as_bytes());
        mac.verify_slice(&self.expected).is_ok()
    }
}
