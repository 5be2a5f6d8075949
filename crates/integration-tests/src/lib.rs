//! Integration tests for LinkBrain.
//!
//! The tests in `tests/` drive a running server over HTTP and are ignored by
//! default.
//!
//! # Running Tests
//!
//! ```bash
//! cargo run -p linkbrain-cli -- migrate
//! cargo run -p linkbrain-server &
//! LINKBRAIN_ADMIN_TOKEN=... cargo test -p linkbrain-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `LINKBRAIN_BASE_URL` - Server under test (default: `http://localhost:3000`)
//! - `LINKBRAIN_ADMIN_TOKEN` - Admin token the server was started with

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL for the API (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("LINKBRAIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Admin token the server under test was configured with.
///
/// # Panics
///
/// Panics if `LINKBRAIN_ADMIN_TOKEN` is unset.
#[must_use]
pub fn admin_token() -> String {
    std::env::var("LINKBRAIN_ADMIN_TOKEN").expect("LINKBRAIN_ADMIN_TOKEN must be set")
}

/// An account created through the public signup endpoint.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: String,
    pub email: String,
    pub token: String,
    pub referral_code: String,
}

/// Unique throwaway address so test runs never collide.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}+{}@test.linkbrain.app", Uuid::new_v4().simple())
}

/// Sign up a fresh user.
///
/// # Panics
///
/// Panics if the request fails or the server does not answer 201.
pub async fn signup(client: &Client, prefix: &str) -> TestUser {
    let email = unique_email(prefix);
    let resp = client
        .post(format!("{}/api/users", base_url()))
        .json(&json!({ "email": email, "displayName": prefix }))
        .send()
        .await
        .expect("Failed to call signup");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = resp.json().await.expect("Failed to parse signup response");
    TestUser {
        id: body["user"]["id"].as_str().expect("user id").to_string(),
        email,
        token: body["token"].as_str().expect("token").to_string(),
        referral_code: body["user"]["referralCode"]
            .as_str()
            .expect("referral code")
            .to_string(),
    }
}
