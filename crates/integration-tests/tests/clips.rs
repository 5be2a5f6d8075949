//! Clip endpoints against a running server.
//!
//! Run with: cargo test -p linkbrain-integration-tests -- --ignored

use linkbrain_integration_tests::{admin_token, base_url, signup};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_clip_crud_and_search() {
    let client = Client::new();
    let user = signup(&client, "clips").await;

    let resp = client
        .post(format!("{}/api/categories", base_url()))
        .bearer_auth(&user.token)
        .json(&json!({ "name": "Reading", "color": "#10b981" }))
        .send()
        .await
        .expect("Failed to create category");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let category: Value = resp.json().await.expect("Failed to parse category");
    assert_eq!(category["color"], "#10B981");

    let resp = client
        .post(format!("{}/api/clips", base_url()))
        .bearer_auth(&user.token)
        .json(&json!({
            "url": "https://www.youtube.com/watch?v=rustconf",
            "keywords": ["rust", "Rust", "talks"],
            "categoryId": category["id"],
        }))
        .send()
        .await
        .expect("Failed to create clip");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let clip: Value = resp.json().await.expect("Failed to parse clip");
    assert_eq!(clip["platform"], "youtube");
    assert_eq!(clip["keywords"], json!(["rust", "talks"]));
    let clip_id = clip["id"].as_str().expect("clip id").to_string();

    let list: Value = client
        .get(format!("{}/api/clips?q=TALKS", base_url()))
        .bearer_auth(&user.token)
        .send()
        .await
        .expect("Failed to list clips")
        .json()
        .await
        .expect("Failed to parse clip list");
    assert_eq!(list["clips"].as_array().map(Vec::len), Some(1));

    let resp = client
        .delete(format!("{}/api/clips/{clip_id}", base_url()))
        .bearer_auth(&user.token)
        .send()
        .await
        .expect("Failed to delete clip");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .get(format!("{}/api/clips/{clip_id}", base_url()))
        .bearer_auth(&user.token)
        .send()
        .await
        .expect("Failed to get clip");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_legacy_import() {
    let client = Client::new();
    let user = signup(&client, "import").await;

    let resp = client
        .post(format!("{}/api/clips/import", base_url()))
        .bearer_auth(&user.token)
        .json(&json!({ "clips": [
            { "url": "https://example.com/a", "createdAt": { "_seconds": 1_710_485_112, "_nanoseconds": 0 } },
            { "url": "https://example.com/b", "createdAt": "2024. 3. 15. 오후 3:45:12", "category": "Old" },
            { "url": "https://example.com/c", "createdAt": "3/15/2024, 3:45:12 PM" },
            { "title": "no url" },
        ]}))
        .send()
        .await
        .expect("Failed to import");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("Failed to parse outcome");
    assert_eq!(body["imported"], 3);
    assert_eq!(body["createdCategories"], 1);
    assert_eq!(body["skipped"][0]["index"], 3);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_default_category_applies_without_category_id() {
    let client = Client::new();
    let user = signup(&client, "defaultcat").await;

    let category: Value = client
        .post(format!("{}/api/categories", base_url()))
        .bearer_auth(&user.token)
        .json(&json!({ "name": "Inbox" }))
        .send()
        .await
        .expect("Failed to create category")
        .json()
        .await
        .expect("Failed to parse category");

    let resp = client
        .put(format!("{}/api/settings/preferences", base_url()))
        .bearer_auth(&user.token)
        .json(&json!({ "defaultCategoryId": category["id"] }))
        .send()
        .await
        .expect("Failed to save preferences");
    assert_eq!(resp.status(), StatusCode::OK);

    let clip: Value = client
        .post(format!("{}/api/clips", base_url()))
        .bearer_auth(&user.token)
        .json(&json!({ "url": "https://example.com/inbox" }))
        .send()
        .await
        .expect("Failed to create clip")
        .json()
        .await
        .expect("Failed to parse clip");
    assert_eq!(clip["categoryId"], category["id"]);
}

#[tokio::test]
#[ignore = "Requires running server and database; changes global admin settings"]
async fn test_import_respects_free_clip_limit() {
    let client = Client::new();
    let settings_url = format!("{}/admin/settings", base_url());

    let original: Value = client
        .get(&settings_url)
        .bearer_auth(admin_token())
        .send()
        .await
        .expect("Failed to read admin settings")
        .json()
        .await
        .expect("Failed to parse admin settings");

    let user = signup(&client, "limit").await;
    let resp = client
        .patch(format!("{}/admin/users/{}/subscription", base_url(), user.id))
        .bearer_auth(admin_token())
        .json(&json!({ "tier": "free", "status": "expired" }))
        .send()
        .await
        .expect("Failed to expire trial");
    assert_eq!(resp.status(), StatusCode::OK);

    let mut limited = original.clone();
    limited["freeClipLimit"] = json!(1);
    let resp = client
        .put(&settings_url)
        .bearer_auth(admin_token())
        .json(&limited)
        .send()
        .await
        .expect("Failed to set clip limit");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!("{}/api/clips/import", base_url()))
        .bearer_auth(&user.token)
        .json(&json!({ "clips": [
            { "url": "https://example.com/one" },
            { "url": "https://example.com/two" },
        ]}))
        .send()
        .await
        .expect("Failed to import");
    let status = resp.status();

    let single = client
        .post(format!("{}/api/clips/import", base_url()))
        .bearer_auth(&user.token)
        .json(&json!({ "clips": [{ "url": "https://example.com/one" }] }))
        .send()
        .await
        .expect("Failed to import")
        .status();

    client
        .put(&settings_url)
        .bearer_auth(admin_token())
        .json(&original)
        .send()
        .await
        .expect("Failed to restore admin settings");

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(single, StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_failed_import_leaves_no_categories() {
    let client = Client::new();
    let user = signup(&client, "rollback").await;

    // PostgreSQL rejects NUL in text, so the second insert fails.
    let resp = client
        .post(format!("{}/api/clips/import", base_url()))
        .bearer_auth(&user.token)
        .json(&json!({ "clips": [
            { "url": "https://example.com/kept", "category": "Archive" },
            { "url": "https://example.com/broken", "title": "bad\u{0}title" },
        ]}))
        .send()
        .await
        .expect("Failed to import");
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let categories: Value = client
        .get(format!("{}/api/categories", base_url()))
        .bearer_auth(&user.token)
        .send()
        .await
        .expect("Failed to list categories")
        .json()
        .await
        .expect("Failed to parse categories");
    assert_eq!(categories["categories"], json!([]));

    let clips: Value = client
        .get(format!("{}/api/clips", base_url()))
        .bearer_auth(&user.token)
        .send()
        .await
        .expect("Failed to list clips")
        .json()
        .await
        .expect("Failed to parse clips");
    assert_eq!(clips["clips"], json!([]));
}
