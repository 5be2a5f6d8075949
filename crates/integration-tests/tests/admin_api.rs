//! Admin API against a running server.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The server running with `LINKBRAIN_ADMIN_TOKEN` exported here too
//!
//! Run with: cargo test -p linkbrain-integration-tests -- --ignored

use linkbrain_integration_tests::{admin_token, base_url, signup};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_admin_analytics_requires_token() {
    let client = Client::new();
    let resp = client
        .get(format!("{}/admin/analytics", base_url()))
        .send()
        .await
        .expect("Failed to get analytics");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .get(format!("{}/admin/analytics", base_url()))
        .bearer_auth("definitely-not-the-admin-token")
        .send()
        .await
        .expect("Failed to get analytics");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_admin_analytics_report_shape() {
    let client = Client::new();
    let resp = client
        .get(format!("{}/admin/analytics?refresh=true", base_url()))
        .bearer_auth(admin_token())
        .send()
        .await
        .expect("Failed to get analytics");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("Failed to parse analytics");
    assert!(body["totalUsers"].is_number());
    assert_eq!(body["hourlyClips"].as_array().map(Vec::len), Some(24));
    assert_eq!(body["weekdayClips"].as_array().map(Vec::len), Some(7));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_admin_subscription_update() {
    let client = Client::new();
    let user = signup(&client, "upgrade").await;

    let resp = client
        .patch(format!("{}/admin/users/{}/subscription", base_url(), user.id))
        .bearer_auth(admin_token())
        .json(&json!({ "tier": "pro", "status": "active" }))
        .send()
        .await
        .expect("Failed to update subscription");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("Failed to parse profile");
    assert_eq!(body["subscription"]["tier"], "pro");
    assert_eq!(body["subscription"]["status"], "active");
    assert_eq!(body["subscription"]["hasPremiumAccess"], true);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_inquiry_reply_then_close() {
    let client = Client::new();
    let user = signup(&client, "inquiry").await;

    let resp = client
        .post(format!("{}/api/inquiries", base_url()))
        .bearer_auth(&user.token)
        .json(&json!({ "subject": "Import question", "message": "Where are my clips?" }))
        .send()
        .await
        .expect("Failed to submit inquiry");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let inquiry: Value = resp.json().await.expect("Failed to parse inquiry");
    let id = inquiry["id"].as_str().expect("inquiry id").to_string();
    assert_eq!(inquiry["status"], "pending");

    let close = |id: String| {
        let client = client.clone();
        async move {
            client
                .post(format!("{}/admin/inquiries/{id}/close", base_url()))
                .bearer_auth(admin_token())
                .send()
                .await
                .expect("Failed to close inquiry")
        }
    };

    let resp = client
        .post(format!("{}/admin/inquiries/{id}/reply", base_url()))
        .bearer_auth(admin_token())
        .json(&json!({ "reply": "Check the import page." }))
        .send()
        .await
        .expect("Failed to reply");
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(close(id.clone()).await.status(), StatusCode::OK);
    // Closed is terminal
    assert_eq!(close(id).await.status(), StatusCode::BAD_REQUEST);
}
